pub mod endpoint;
pub mod engine;
pub mod message;
pub mod state;

pub use endpoint::{Endpoint, Role};
pub use engine::{Broker, ShutdownHandle};
pub use message::Message;
pub use state::BrokerState;

#[cfg(test)]
mod tests;
