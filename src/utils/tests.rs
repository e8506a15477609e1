use std::io;

use super::error::{AddressError, BindFailure, BrokerError};
use super::logging;
use crate::broker::endpoint::Role;
use crate::broker::state::BrokerState;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("warn");
}

#[test]
fn parse_level_falls_back_to_info() {
    assert_eq!(logging::parse_level("ERROR"), tracing::Level::ERROR);
    assert_eq!(logging::parse_level("warning"), tracing::Level::WARN);
    assert_eq!(logging::parse_level(" trace "), tracing::Level::TRACE);
    assert_eq!(logging::parse_level("loud"), tracing::Level::INFO);
}

#[test]
fn bind_error_names_role_and_address() {
    let err = BrokerError::Bind {
        role: Role::Intake,
        address: "tcp://*:5555".to_string(),
        source: BindFailure::Io(io::Error::from(io::ErrorKind::AddrInUse)),
    };
    let text = err.to_string();
    assert!(text.contains("intake"));
    assert!(text.contains("tcp://*:5555"));
    assert!(err.is_bind());
    assert!(!err.is_relay());
}

#[test]
fn address_error_is_bind_source() {
    let err = BrokerError::Bind {
        role: Role::Distribution,
        address: "tcp://host".to_string(),
        source: AddressError::MissingPort("tcp://host".to_string()).into(),
    };
    let source = std::error::Error::source(&err).expect("source");
    assert!(source.to_string().contains("missing port"));
}

#[test]
fn invalid_state_message() {
    let err = BrokerError::InvalidState {
        expected: BrokerState::Unstarted,
        actual: BrokerState::Stopped,
    };
    assert_eq!(err.to_string(), "broker is stopped, expected unstarted");
}
