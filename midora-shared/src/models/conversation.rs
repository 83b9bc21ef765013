use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Message, PageInfo, Timestamp};

/// A named thread of messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    /// Unique identifier for the conversation.
    pub id: Uuid,

    /// Display name; synthesized from the first message when not provided.
    pub name: String,

    /// When the conversation was created.
    pub created_at: Timestamp,

    /// When the conversation last changed.
    pub updated_at: Timestamp,

    /// Whether the conversation has been archived.
    #[serde(default)]
    pub archived: bool,
}

/// Request body for creating a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationCreateRequest {
    /// Display name for the new conversation.
    pub name: String,
}

/// Response for conversation creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationCreateResponse {
    /// The newly created conversation.
    pub conversation: Conversation,
}

/// Request body for renaming or archiving a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationUpdateRequest {
    /// New display name, when renaming.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// New archived flag, when archiving or restoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

/// One page of the conversation list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationListResponse {
    /// Conversations in this page.
    pub conversations: Vec<Conversation>,

    /// Cursor state after this page.
    pub page: PageInfo,
}

/// One page of a conversation's messages, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessagePageResponse {
    /// Messages in this page, ordered by `created_at` ascending.
    pub messages: Vec<Message>,

    /// Cursor state after this page.
    pub page: PageInfo,
}
