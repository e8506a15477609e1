//! Client connections
//!
//! Addresses may be given either as `ws://` URLs or in the broker's own
//! `tcp://host:port` form; the latter is converted with `connect_url`.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tungstenite::Bytes;

use crate::broker::endpoint::connect_url;
use crate::broker::message::Message;
use crate::utils::error::ClientError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub(crate) fn resolve_url(address: &str) -> Result<String, ClientError> {
    let address = address.trim();
    if address.starts_with("ws://") || address.starts_with("wss://") {
        Ok(address.to_string())
    } else {
        Ok(connect_url(address)?)
    }
}

async fn open(address: &str) -> Result<WsStream, ClientError> {
    let url = resolve_url(address)?;
    let (ws_stream, _response) = connect_async(url.as_str()).await?;
    Ok(ws_stream)
}

async fn close_stream(stream: &mut WsStream) -> Result<(), ClientError> {
    match stream.close(None).await {
        Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Sends messages into a broker's frontend.
pub struct Publisher {
    stream: WsStream,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher").finish_non_exhaustive()
    }
}

impl Publisher {
    pub async fn connect(address: &str) -> Result<Self, ClientError> {
        Ok(Self {
            stream: open(address).await?,
        })
    }

    /// Sends one message; it arrives at subscribers as exactly one frame.
    pub async fn send(&mut self, msg: Message) -> Result<(), ClientError> {
        self.stream.send(msg.into_frame()).await?;
        Ok(())
    }

    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), ClientError> {
        self.send(Message::text(text)).await
    }

    pub async fn send_binary(&mut self, data: impl Into<Bytes>) -> Result<(), ClientError> {
        self.send(Message::binary(data)).await
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        close_stream(&mut self.stream).await
    }
}

/// Receives messages relayed by a broker's backend.
pub struct Subscriber {
    stream: WsStream,
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber").finish_non_exhaustive()
    }
}

impl Subscriber {
    pub async fn connect(address: &str) -> Result<Self, ClientError> {
        Ok(Self {
            stream: open(address).await?,
        })
    }

    /// Waits for the next relayed message.
    ///
    /// Control frames are skipped. Returns `Ok(None)` once the broker has
    /// closed the connection.
    pub async fn recv(&mut self) -> Result<Option<Message>, ClientError> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(frame) => {
                    if let Some(msg) = Message::from_frame(frame) {
                        return Ok(Some(msg));
                    }
                }
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        close_stream(&mut self.stream).await
    }
}

