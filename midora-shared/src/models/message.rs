use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

use super::Timestamp;

/// The role of a message author within a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Message from the authenticated user.
    User,
    /// Message from the AI assistant.
    Assistant,
    /// System message (notices, status updates).
    System,
}

impl MessageRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl Display for MessageRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for MessageRole {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            _ => Err("invalid message role"),
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique identifier for the message.
    pub id: Uuid,

    /// Conversation this message belongs to.
    pub conversation_id: Uuid,

    /// Author of the message; absent for assistant and system messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<Uuid>,

    /// The author's role.
    pub role: MessageRole,

    /// The message content.
    pub content: String,

    /// When the message was created.
    pub created_at: Timestamp,

    /// When the message was last updated.
    pub updated_at: Timestamp,
}

/// Request body for sending a message into a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendMessageRequest {
    /// The message content.
    pub content: String,

    /// Optional model override for the assistant response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_message() -> Message {
        let ts = Timestamp(Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap());
        Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: Some(Uuid::new_v4()),
            role: MessageRole::User,
            content: "Hello, world!".to_string(),
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn message_round_trip() {
        let message = sample_message();
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();

        assert_eq!(back, message);
    }

    #[test]
    fn assistant_message_omits_sender() {
        let mut message = sample_message();
        message.sender_id = None;
        message.role = MessageRole::Assistant;

        let json = serde_json::to_string(&message).unwrap();
        assert!(!json.contains("sender_id"));

        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sender_id, None);
    }

    #[test]
    fn role_round_trip() {
        for (text, role) in [
            ("user", MessageRole::User),
            ("assistant", MessageRole::Assistant),
            ("system", MessageRole::System),
        ] {
            assert_eq!(role.as_str(), text);
            assert_eq!(MessageRole::try_from(text).unwrap(), role);
        }
        assert!(MessageRole::try_from("tool").is_err());
    }

    #[test]
    fn send_request_omits_absent_model() {
        let request = SendMessageRequest {
            content: "hi".into(),
            model_id: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("model_id"));
    }
}
