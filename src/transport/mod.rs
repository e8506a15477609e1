//! The `transport` module is responsible for network communication with
//! publishers and subscribers over WebSockets.
//!
//! It binds the broker's endpoints and runs one task per connection: intake
//! connections feed frames into the relay loop, distribution connections
//! write relayed frames back out.

pub mod websocket;

pub use websocket::{
    AcceptFailure, AcceptGate, bind_endpoint, classify_accept_error, serve_publisher,
    serve_subscriber,
};
