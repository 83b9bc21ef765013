use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Message;

/// JSON frames exchanged over the user WebSocket channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeFrame {
    /// Handshake acknowledgement after connecting.
    UserChannelConnected {
        /// The channel owner.
        user_id: Uuid,
    },
    /// A message was generated out-of-band for some conversation.
    MessageGenerate {
        /// The generated message.
        message: Message,
    },
    /// An existing message was regenerated.
    MessageRegenerate {
        /// The regenerated message.
        message: Message,
    },
    /// Keepalive request.
    Ping,
    /// Keepalive response.
    Pong,
    /// Server-side error notification.
    Error {
        /// Machine-readable error code.
        code: String,
        /// Human-readable description.
        message: String,
    },
}
