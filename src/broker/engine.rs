//! Broker engine
//!
//! The broker owns two listening endpoints and one relay loop:
//! - the intake endpoint accepts publishers, whose frames land on a bounded
//!   intake queue
//! - the relay loop takes each message off that queue and hands it to the
//!   distribution fan-out, one at a time and in queue order
//! - the distribution endpoint accepts subscribers, each of which receives
//!   every message relayed after it was accepted
//!
//! Concurrency notes:
//! - The relay loop is a single task and the only code that touches the
//!   listeners and the intake queue receiver, so the broker needs no locks.
//! - Connection tasks are children of the broker's cancellation token and
//!   are awaited before `relay` returns, so both endpoints and every
//!   connection are released together.
//! - Messages are never stored. With no subscriber connected a relayed
//!   message is simply gone.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use crate::broker::endpoint::{Endpoint, Role};
use crate::broker::message::Message;
use crate::broker::state::BrokerState;
use crate::config::BrokerSettings;
use crate::transport::websocket::{
    AcceptFailure, AcceptGate, bind_endpoint, classify_accept_error, serve_publisher,
    serve_subscriber,
};
use crate::utils::error::BrokerError;

/// Requests cooperative shutdown of a running broker.
///
/// Cheap to clone and safe to use from any task or thread. A shutdown
/// requested before the broker starts relaying makes `relay` return as soon
/// as it begins.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    token: CancellationToken,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }
}

struct Listeners {
    intake: TcpListener,
    distribution: TcpListener,
}

pub struct Broker {
    settings: BrokerSettings,
    state: BrokerState,
    shutdown: CancellationToken,
    listeners: Option<Listeners>,
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("frontend", &self.settings.frontend)
            .field("backend", &self.settings.backend)
            .field("state", &self.state)
            .finish()
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(BrokerSettings::default())
    }
}

impl Broker {
    /// Creates a broker in the `Unstarted` state. No sockets are opened.
    pub fn new(settings: BrokerSettings) -> Self {
        Self {
            settings,
            state: BrokerState::Unstarted,
            shutdown: CancellationToken::new(),
            listeners: None,
        }
    }

    pub fn with_addresses(frontend: impl Into<String>, backend: impl Into<String>) -> Self {
        Self::new(BrokerSettings::with_addresses(frontend, backend))
    }

    pub fn state(&self) -> BrokerState {
        self.state
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            token: self.shutdown.clone(),
        }
    }

    /// Actual `(intake, distribution)` socket addresses while the endpoints
    /// are bound and not yet handed to the relay loop.
    pub fn local_addrs(&self) -> Option<(SocketAddr, SocketAddr)> {
        let listeners = self.listeners.as_ref()?;
        let intake = listeners.intake.local_addr().ok()?;
        let distribution = listeners.distribution.local_addr().ok()?;
        Some((intake, distribution))
    }

    fn expect_state(&self, expected: BrokerState) -> Result<(), BrokerError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(BrokerError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    /// Binds the intake endpoint, then the distribution endpoint.
    ///
    /// If either fails the broker is `Stopped` and anything already bound is
    /// released before the error is returned.
    pub async fn bind(&mut self) -> Result<(), BrokerError> {
        self.expect_state(BrokerState::Unstarted)?;

        let frontend = Endpoint::new(Role::Intake, &self.settings.frontend);
        let backend = Endpoint::new(Role::Distribution, &self.settings.backend);

        let intake = match bind_endpoint(&frontend).await {
            Ok(listener) => listener,
            Err(e) => {
                self.state = BrokerState::Stopped;
                return Err(e);
            }
        };

        let distribution = match bind_endpoint(&backend).await {
            Ok(listener) => listener,
            Err(e) => {
                drop(intake);
                self.state = BrokerState::Stopped;
                return Err(e);
            }
        };

        info!(
            frontend = %frontend.address,
            backend = %backend.address,
            "Broker endpoints bound"
        );

        self.listeners = Some(Listeners {
            intake,
            distribution,
        });
        self.state = BrokerState::Bound;
        Ok(())
    }

    /// Runs the relay loop on the bound endpoints.
    ///
    /// Returns `Ok(())` after a cooperative shutdown and `BrokerError::Relay`
    /// on an unrecoverable transport fault. Either way the broker ends up
    /// `Stopped` with both endpoints released.
    pub async fn relay(&mut self) -> Result<(), BrokerError> {
        self.expect_state(BrokerState::Bound)?;
        let Some(listeners) = self.listeners.take() else {
            self.state = BrokerState::Stopped;
            return Err(BrokerError::InvalidState {
                expected: BrokerState::Bound,
                actual: BrokerState::Stopped,
            });
        };

        self.state = BrokerState::Relaying;
        let result = self.run_relay_loop(listeners).await;
        self.state = BrokerState::Stopped;

        match &result {
            Ok(()) => info!("Broker stopped"),
            Err(e) => error!("Broker stopped: {e}"),
        }
        result
    }

    /// Binds both endpoints and relays until shutdown or failure.
    pub async fn start(&mut self) -> Result<(), BrokerError> {
        self.bind().await?;
        self.relay().await
    }

    async fn run_relay_loop(&self, listeners: Listeners) -> Result<(), BrokerError> {
        let Listeners {
            intake,
            distribution,
        } = listeners;

        let (intake_tx, mut intake_rx) =
            mpsc::channel::<Message>(self.settings.intake_capacity.max(1));
        let (fanout, _) = broadcast::channel::<Message>(self.settings.send_capacity.max(1));

        let max_connections = self.settings.max_connections.max(1);
        let publisher_slots = Arc::new(Semaphore::new(max_connections));
        let subscriber_slots = Arc::new(Semaphore::new(max_connections));

        let connections = TaskTracker::new();
        let cancel = self.shutdown.child_token();
        let mut relayed: u64 = 0;
        let mut accept_gate = AcceptGate::default();

        let result = loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break Ok(()),

                Some(msg) = intake_rx.recv() => {
                    let bytes = msg.len();
                    match fanout.send(msg) {
                        Ok(subscribers) => trace!(bytes, subscribers, "Relayed message"),
                        Err(_) => trace!(bytes, "No subscribers, message dropped"),
                    }
                    relayed += 1;
                }

                _ = accept_gate.reopened(), if !accept_gate.is_open() => {
                    debug!("Accepting connections again");
                }

                accepted = intake.accept(), if accept_gate.is_open() => match accepted {
                    Ok((stream, peer)) => match publisher_slots.clone().try_acquire_owned() {
                        Ok(permit) => {
                            connections.spawn(serve_publisher(
                                stream,
                                peer,
                                intake_tx.clone(),
                                cancel.clone(),
                                permit,
                            ));
                        }
                        Err(_) => warn!(%peer, max_connections, "Refusing publisher, connection limit reached"),
                    },
                    Err(e) => match classify_accept_error(&e) {
                        AcceptFailure::Connection => warn!("Intake accept failed: {e}"),
                        AcceptFailure::Exhausted => {
                            warn!("Intake accept failed, pausing accepts: {e}");
                            accept_gate.pause();
                        }
                        AcceptFailure::Fatal => break Err(BrokerError::Relay(e)),
                    },
                },

                accepted = distribution.accept(), if accept_gate.is_open() => match accepted {
                    Ok((stream, peer)) => match subscriber_slots.clone().try_acquire_owned() {
                        Ok(permit) => {
                            // subscribe before the handshake so nothing relayed after accept is missed
                            let receiver = fanout.subscribe();
                            connections.spawn(serve_subscriber(
                                stream,
                                peer,
                                receiver,
                                cancel.clone(),
                                permit,
                            ));
                        }
                        Err(_) => warn!(%peer, max_connections, "Refusing subscriber, connection limit reached"),
                    },
                    Err(e) => match classify_accept_error(&e) {
                        AcceptFailure::Connection => warn!("Distribution accept failed: {e}"),
                        AcceptFailure::Exhausted => {
                            warn!("Distribution accept failed, pausing accepts: {e}");
                            accept_gate.pause();
                        }
                        AcceptFailure::Fatal => break Err(BrokerError::Relay(e)),
                    },
                },
            }
        };

        cancel.cancel();
        connections.close();
        connections.wait().await;
        drop(intake);
        drop(distribution);

        debug!(relayed, "Relay loop finished");
        result
    }
}
