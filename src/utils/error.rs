//! The `error` module defines the error types used within `pubrelay`.
//!
//! Cooperative shutdown is not an error: `Broker::relay` returns `Ok(())`
//! in that case. Everything here is fatal to the broker that produced it.

use std::io;

use thiserror::Error;

use crate::broker::endpoint::Role;
use crate::broker::state::BrokerState;

#[derive(Error, Debug)]
pub enum BrokerError {
    /// An endpoint could not be bound: address in use, malformed or not permitted.
    #[error("failed to bind {role} endpoint '{address}': {source}")]
    Bind {
        role: Role,
        address: String,
        #[source]
        source: BindFailure,
    },

    /// The transport reported an unrecoverable fault while relaying.
    #[error("relay failed: {0}")]
    Relay(#[source] io::Error),

    #[error("broker is {actual}, expected {expected}")]
    InvalidState {
        expected: BrokerState,
        actual: BrokerState,
    },
}

/// Why a bind attempt failed.
#[derive(Error, Debug)]
pub enum BindFailure {
    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,

    #[error("unsupported scheme '{0}', expected tcp or ws")]
    UnsupportedScheme(String),

    #[error("missing port in '{0}'")]
    MissingPort(String),

    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("missing host in '{0}'")]
    MissingHost(String),
}

impl BrokerError {
    pub fn is_bind(&self) -> bool {
        matches!(self, BrokerError::Bind { .. })
    }

    pub fn is_relay(&self) -> bool {
        matches!(self, BrokerError::Relay(_))
    }
}

/// Errors raised by the `Publisher`/`Subscriber` helpers.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid address: {0}")]
    Address(#[from] AddressError),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}
