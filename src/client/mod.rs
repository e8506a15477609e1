//! The `client` module provides the two sides a broker talks to.
//!
//! `Publisher` connects to the frontend and sends messages; `Subscriber`
//! connects to the backend and receives what the broker relays. Both are
//! thin wrappers over a WebSocket connection, used by the CLI and by tests.

pub mod pubsub_client;
pub use pubsub_client::{Publisher, Subscriber};
