use std::time::Duration;

use super::endpoint::{Endpoint, Role, connect_url, parse_address};
use super::message::Message;
use super::state::BrokerState;
use super::{Broker, ShutdownHandle};
use crate::config::BrokerSettings;
use crate::utils::error::{AddressError, BindFailure, BrokerError};

fn loopback_broker() -> Broker {
    Broker::with_addresses("tcp://127.0.0.1:0", "tcp://127.0.0.1:0")
}

#[test]
fn test_parse_address_with_scheme() {
    assert_eq!(
        parse_address("tcp://127.0.0.1:5555").unwrap(),
        ("127.0.0.1".to_string(), 5555)
    );
    assert_eq!(
        parse_address("ws://localhost:8080/").unwrap(),
        ("localhost".to_string(), 8080)
    );
}

#[test]
fn test_parse_address_wildcard_and_bare() {
    assert_eq!(
        parse_address("tcp://*:5556").unwrap(),
        ("0.0.0.0".to_string(), 5556)
    );
    assert_eq!(
        parse_address("example.org:1").unwrap(),
        ("example.org".to_string(), 1)
    );
}

#[test]
fn test_parse_address_ipv6() {
    assert_eq!(
        parse_address("tcp://[::1]:5555").unwrap(),
        ("::1".to_string(), 5555)
    );
    let endpoint = Endpoint::new(Role::Intake, "tcp://[::1]:5555");
    assert_eq!(endpoint.bind_target().unwrap(), "[::1]:5555");
}

#[test]
fn test_parse_address_errors() {
    assert_eq!(parse_address("  "), Err(AddressError::Empty));
    assert_eq!(
        parse_address("udp://host:1"),
        Err(AddressError::UnsupportedScheme("udp".to_string()))
    );
    assert!(matches!(
        parse_address("tcp://host"),
        Err(AddressError::MissingPort(_))
    ));
    assert!(matches!(
        parse_address("tcp://host:"),
        Err(AddressError::MissingPort(_))
    ));
    assert_eq!(
        parse_address("tcp://host:99999"),
        Err(AddressError::InvalidPort("99999".to_string()))
    );
    assert!(matches!(
        parse_address("tcp://:5555"),
        Err(AddressError::MissingHost(_))
    ));
}

#[test]
fn test_connect_url_maps_wildcard_to_loopback() {
    assert_eq!(connect_url("tcp://*:5556").unwrap(), "ws://127.0.0.1:5556");
    assert_eq!(
        connect_url("tcp://localhost:5556").unwrap(),
        "ws://localhost:5556"
    );
}

#[test]
fn test_state_display_and_terminal() {
    assert_eq!(BrokerState::Relaying.to_string(), "relaying");
    assert!(BrokerState::Stopped.is_terminal());
    assert!(!BrokerState::Bound.is_terminal());
}

#[test]
fn test_message_kinds() {
    let text = Message::text("hello");
    assert!(text.is_text());
    assert_eq!(text.len(), 5);

    let binary = Message::binary(vec![0xdeu8, 0xad]);
    assert!(!binary.is_text());
    assert_eq!(&binary.clone().into_bytes()[..], &[0xdeu8, 0xad][..]);
    assert!(Message::binary(Vec::<u8>::new()).is_empty());
}

#[test]
fn test_control_frames_are_not_messages() {
    use tungstenite::protocol::Message as WsMessage;
    assert!(Message::from_frame(WsMessage::Ping(Default::default())).is_none());
    assert!(Message::from_frame(WsMessage::Close(None)).is_none());
    assert!(Message::from_frame(WsMessage::text("x")).is_some());
}

#[test]
fn test_broker_new_has_no_side_effects() {
    let broker = Broker::new(BrokerSettings::default());
    assert_eq!(broker.state(), BrokerState::Unstarted);
    assert!(broker.local_addrs().is_none());
    assert_eq!(broker.settings().frontend, "tcp://127.0.0.1:5555");
}

#[test]
fn test_shutdown_handle_is_shared() {
    let broker = loopback_broker();
    let a: ShutdownHandle = broker.shutdown_handle();
    let b = broker.shutdown_handle();
    assert!(!b.is_shutdown());
    a.shutdown();
    assert!(b.is_shutdown());
}

#[tokio::test]
async fn test_bind_transitions_to_bound() {
    let mut broker = loopback_broker();
    broker.bind().await.unwrap();
    assert_eq!(broker.state(), BrokerState::Bound);

    let (intake, distribution) = broker.local_addrs().unwrap();
    assert_ne!(intake.port(), 0);
    assert_ne!(distribution.port(), 0);
    assert_ne!(intake, distribution);
}

#[tokio::test]
async fn test_bind_twice_is_invalid() {
    let mut broker = loopback_broker();
    broker.bind().await.unwrap();
    let err = broker.bind().await.unwrap_err();
    assert!(matches!(
        err,
        BrokerError::InvalidState {
            expected: BrokerState::Unstarted,
            actual: BrokerState::Bound,
        }
    ));
}

#[tokio::test]
async fn test_relay_requires_bind() {
    let mut broker = loopback_broker();
    let err = broker.relay().await.unwrap_err();
    assert!(matches!(err, BrokerError::InvalidState { .. }));
    assert_eq!(broker.state(), BrokerState::Unstarted);
}

#[tokio::test]
async fn test_malformed_frontend_fails_with_bind_error() {
    let mut broker = Broker::with_addresses("tcp://nowhere", "tcp://127.0.0.1:0");
    let err = broker.start().await.unwrap_err();
    assert!(matches!(
        err,
        BrokerError::Bind {
            role: Role::Intake,
            source: BindFailure::Address(AddressError::MissingPort(_)),
            ..
        }
    ));
    assert_eq!(broker.state(), BrokerState::Stopped);
}

#[tokio::test]
async fn test_backend_bind_failure_releases_frontend() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let taken_addr = taken.local_addr().unwrap();

    let free = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let frontend_addr = free.local_addr().unwrap();
    drop(free);

    let mut broker = Broker::with_addresses(
        format!("tcp://{frontend_addr}"),
        format!("tcp://{taken_addr}"),
    );
    let err = broker.bind().await.unwrap_err();
    assert!(matches!(
        err,
        BrokerError::Bind {
            role: Role::Distribution,
            ..
        }
    ));
    assert_eq!(broker.state(), BrokerState::Stopped);

    // the intake listener was dropped with the failure
    tokio::net::TcpListener::bind(frontend_addr)
        .await
        .expect("frontend address still held");
}

#[tokio::test]
async fn test_stopped_broker_cannot_restart() {
    let mut broker = loopback_broker();
    broker.shutdown_handle().shutdown();
    broker.start().await.unwrap();
    assert_eq!(broker.state(), BrokerState::Stopped);

    let err = broker.start().await.unwrap_err();
    assert!(matches!(
        err,
        BrokerError::InvalidState {
            actual: BrokerState::Stopped,
            ..
        }
    ));
}

#[tokio::test]
async fn test_shutdown_returns_ok_and_releases_endpoints() {
    let mut broker = loopback_broker();
    broker.bind().await.unwrap();
    let (intake, distribution) = broker.local_addrs().unwrap();
    let shutdown = broker.shutdown_handle();

    let task = tokio::spawn(async move {
        let result = broker.relay().await;
        (result, broker.state())
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.shutdown();

    let (result, state) = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("relay did not stop")
        .unwrap();
    assert!(result.is_ok(), "shutdown reported as error: {result:?}");
    assert_eq!(state, BrokerState::Stopped);

    tokio::net::TcpListener::bind(intake)
        .await
        .expect("intake endpoint not released");
    tokio::net::TcpListener::bind(distribution)
        .await
        .expect("distribution endpoint not released");
}
