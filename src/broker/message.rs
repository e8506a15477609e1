use tungstenite::Bytes;
use tungstenite::protocol::Message as WsMessage;

/// An opaque message travelling through the relay.
///
/// Wraps exactly one WebSocket data frame. The broker never looks inside;
/// the frame kind (text or binary) and its bytes leave the distribution
/// endpoint exactly as they entered the intake endpoint.
///
/// Cloning is cheap: the payload is reference counted, which is what makes
/// fan-out to many subscribers affordable.
///
/// # Example
///
/// ```rust
/// use pubrelay::broker::message::Message;
///
/// let msg = Message::text("hello");
/// assert_eq!(msg.as_bytes(), b"hello");
/// assert!(msg.is_text());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    frame: WsMessage,
}

impl Message {
    pub fn text(payload: impl Into<String>) -> Self {
        Self {
            frame: WsMessage::text(payload.into()),
        }
    }

    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self {
            frame: WsMessage::binary(payload),
        }
    }

    /// Wraps an incoming frame. Control frames are not messages and yield `None`.
    pub fn from_frame(frame: WsMessage) -> Option<Self> {
        match frame {
            WsMessage::Text(_) | WsMessage::Binary(_) => Some(Self { frame }),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        self.frame.is_text()
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.frame {
            WsMessage::Text(text) => text.as_bytes(),
            WsMessage::Binary(data) => &data[..],
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_bytes(self) -> Bytes {
        self.frame.into_data()
    }

    pub fn into_frame(self) -> WsMessage {
        self.frame
    }
}
