use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Message;

/// Side-channel metadata emitted during a response stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StreamMetadata {
    /// Topic category inferred by the server for the exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// The model the server routed this response to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelSelection {
    /// Identifier of the selected model.
    pub model_id: Uuid,
    /// Display name of the selected model.
    pub model_name: String,
}

/// Authoritative identifiers delivered at the start of a stream.
///
/// `user_message` replaces the client's optimistic placeholder; when the
/// server declines to materialize one it is `None` and the placeholder is
/// removed instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InitialMetadata {
    /// Conversation the response belongs to.
    pub conversation_id: Uuid,
    /// Server-assigned user message, when materialized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<Message>,
    /// Identifier reserved for the assistant message under construction.
    pub assistant_message_id: Uuid,
}

/// Terminal stream payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinalPayload {
    /// The finalized assistant message; when absent, the client assembles
    /// it from the accumulated content buffer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

/// One frame of the incrementally-delivered assistant response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A fragment of assistant text, applied in arrival order.
    Content {
        /// The text fragment.
        text: String,
    },
    /// Side-channel metadata; never touches the content buffer.
    Metadata {
        /// The metadata payload.
        payload: StreamMetadata,
    },
    /// Model routing decision; never touches the content buffer.
    ModelSelection {
        /// The selection payload.
        payload: ModelSelection,
    },
    /// Authoritative message identifiers, delivered once per stream.
    InitialMetadata {
        /// The identifier payload.
        payload: InitialMetadata,
    },
    /// Terminal event; flushes and finalizes the assistant message.
    Final {
        /// The terminal payload.
        payload: FinalPayload,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_frame_round_trip() {
        let event = StreamEvent::Content {
            text: "He".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains(r#""type":"content""#));
        let back: StreamEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn tags_use_snake_case() {
        let event = StreamEvent::InitialMetadata {
            payload: InitialMetadata {
                conversation_id: Uuid::nil(),
                user_message: None,
                assistant_message_id: Uuid::nil(),
            },
        };
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains(r#""type":"initial_metadata""#));
    }

    #[test]
    fn final_frame_may_omit_message() {
        let json = r#"{"type":"final","payload":{}}"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();

        match event {
            StreamEvent::Final { payload } => assert!(payload.message.is_none()),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn model_selection_frame_parses() {
        let json = format!(
            r#"{{"type":"model_selection","payload":{{"model_id":"{}","model_name":"midora-swift"}}}}"#,
            Uuid::nil()
        );
        let event: StreamEvent = serde_json::from_str(&json).unwrap();

        match event {
            StreamEvent::ModelSelection { payload } => {
                assert_eq!(payload.model_name, "midora-swift");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
