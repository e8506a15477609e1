//! # pubrelay
//!
//! `pubrelay` is a minimal publish/subscribe relay. Publishers connect to a
//! frontend endpoint, subscribers connect to a backend endpoint, and every
//! message arriving on the frontend is forwarded byte-for-byte to every
//! subscriber connected at that moment. There are no topics, no storage and
//! no replay; delivery is at-most-once and ordered per publisher.
//!
//! ## Core Modules
//!
//! - `broker`: the relay itself, its endpoints, messages and lifecycle.
//! - `client`: `Publisher` and `Subscriber` connections to a running broker.
//! - `config`: loading and layering of settings.
//! - `transport`: the WebSocket listeners and per-connection tasks.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;

pub use broker::{Broker, BrokerState, Message, ShutdownHandle};
pub use config::BrokerSettings;
pub use utils::error::BrokerError;
