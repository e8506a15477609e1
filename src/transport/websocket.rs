//! WebSocket transport
//!
//! Each accepted TCP connection is upgraded to a WebSocket and served by its
//! own task. Publishers only send; every text or binary frame they send
//! becomes one `Message` on the intake queue. Subscribers only receive; they
//! are handed a fan-out receiver by the relay loop at accept time and any
//! data frames they send are ignored.
//!
//! Tasks exit on close, on transport error, or when the broker's
//! cancellation token fires. None of these affect the broker itself.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{OwnedSemaphorePermit, broadcast, mpsc};
use tokio::time::{Instant, sleep_until, timeout};
use tokio_tungstenite::{WebSocketStream, accept_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::broker::endpoint::Endpoint;
use crate::broker::message::Message;
use crate::utils::error::{BindFailure, BrokerError};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Binds a listening socket for `endpoint`.
///
/// Address parsing happens here, so a malformed address surfaces as a bind
/// failure just like an address already in use.
pub async fn bind_endpoint(endpoint: &Endpoint) -> Result<TcpListener, BrokerError> {
    let bind_error = |source: BindFailure| BrokerError::Bind {
        role: endpoint.role,
        address: endpoint.address.clone(),
        source,
    };

    let target = endpoint
        .bind_target()
        .map_err(|e| bind_error(e.into()))?;

    TcpListener::bind(target.as_str())
        .await
        .map_err(|e| bind_error(e.into()))
}

/// How the relay loop should react to a failed `accept()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptFailure {
    /// Only the connection being accepted is affected; accept again.
    Connection,
    /// Out of file descriptors. The connection stays in the backlog, so
    /// accepting again right away fails again; wait for `ACCEPT_BACKOFF`.
    Exhausted,
    /// The listener itself is broken.
    Fatal,
}

pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub fn classify_accept_error(err: &io::Error) -> AcceptFailure {
    // EMFILE / ENFILE
    if matches!(err.raw_os_error(), Some(23) | Some(24)) {
        return AcceptFailure::Exhausted;
    }
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock
        | io::ErrorKind::TimedOut => AcceptFailure::Connection,
        _ => AcceptFailure::Fatal,
    }
}

/// Holds off accepting on both endpoints after descriptor exhaustion.
#[derive(Debug, Default)]
pub struct AcceptGate {
    paused_until: Option<Instant>,
}

impl AcceptGate {
    pub fn is_open(&self) -> bool {
        self.paused_until.is_none()
    }

    pub fn pause(&mut self) {
        self.paused_until = Some(Instant::now() + ACCEPT_BACKOFF);
    }

    /// Completes once the pause has elapsed and reopens the gate.
    pub async fn reopened(&mut self) {
        if let Some(deadline) = self.paused_until {
            sleep_until(deadline).await;
        }
        self.paused_until = None;
    }
}

pub fn connection_id() -> String {
    format!("conn-{}", Uuid::new_v4())
}

async fn handshake(
    stream: TcpStream,
    conn_id: &str,
    cancel: &CancellationToken,
) -> Option<WebSocketStream<TcpStream>> {
    tokio::select! {
        _ = cancel.cancelled() => None,
        res = accept_async(stream) => match res {
            Ok(ws) => Some(ws),
            Err(e) => {
                debug!(conn = %conn_id, "WebSocket handshake error: {e}");
                None
            }
        },
    }
}

/// Serves one publisher connection until it closes or the broker stops.
///
/// Frames are pushed onto `intake` in arrival order. When the intake queue
/// is full this task waits, which in turn stops reading from the socket.
pub async fn serve_publisher(
    stream: TcpStream,
    peer: SocketAddr,
    intake: mpsc::Sender<Message>,
    cancel: CancellationToken,
    _permit: OwnedSemaphorePermit,
) {
    let conn_id = connection_id();
    let Some(mut ws_stream) = handshake(stream, &conn_id, &cancel).await else {
        return;
    };
    debug!(conn = %conn_id, %peer, "publisher connected");

    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = timeout(CLOSE_TIMEOUT, ws_stream.close(None)).await;
                break;
            }
            frame = ws_stream.next() => frame,
        };

        match frame {
            Some(Ok(frame)) => {
                let Some(msg) = Message::from_frame(frame) else {
                    continue;
                };
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = intake.send(msg) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            Some(Err(e)) => {
                debug!(conn = %conn_id, "publisher read error: {e}");
                break;
            }
            None => break,
        }
    }

    debug!(conn = %conn_id, %peer, "publisher disconnected");
}

/// Serves one subscriber connection until it closes or the broker stops.
///
/// `relayed` must have been created before the handshake so the subscriber
/// sees every message relayed from the moment it was accepted.
pub async fn serve_subscriber(
    stream: TcpStream,
    peer: SocketAddr,
    mut relayed: broadcast::Receiver<Message>,
    cancel: CancellationToken,
    _permit: OwnedSemaphorePermit,
) {
    let conn_id = connection_id();
    let Some(ws_stream) = handshake(stream, &conn_id, &cancel).await else {
        return;
    };
    debug!(conn = %conn_id, %peer, "subscriber connected");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = timeout(CLOSE_TIMEOUT, ws_sender.send(WsMessage::Close(None))).await;
                break;
            }
            incoming = ws_receiver.next() => match incoming {
                // subscribers have nothing to say; pings are answered by the transport
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(conn = %conn_id, "subscriber read error: {e}");
                    break;
                }
                None => break,
            },
            msg = relayed.recv() => match msg {
                Ok(msg) => {
                    // a stalled socket must not hold up shutdown
                    let sent = tokio::select! {
                        _ = cancel.cancelled() => break,
                        sent = ws_sender.send(msg.into_frame()) => sent,
                    };
                    if let Err(e) = sent {
                        debug!(conn = %conn_id, "Failed to send message: {e}");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(conn = %conn_id, skipped, "subscriber fell behind, messages dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    debug!(conn = %conn_id, %peer, "subscriber disconnected");
}
