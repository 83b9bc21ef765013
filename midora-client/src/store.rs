//! Client-side conversation state.
//!
//! All mutation goes through the methods here; controllers hold the store
//! behind a mutex and keep critical sections synchronous, which preserves
//! single-writer semantics without locking across await points.

use midora_shared::models::{Conversation, Message, ModelSelection, PageInfo, Timestamp};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::ClientError;

/// A message as held by the store: either a client-synthesized placeholder
/// awaiting server confirmation, or an authoritative server message.
///
/// Replacement is keyed by `client_id`, never by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageEntry {
    /// Optimistic placeholder shown before the server responds.
    Pending {
        /// Client-generated correlation id (`user-<millis>`).
        client_id: String,
        /// The locally synthesized message.
        message: Message,
    },
    /// Server-confirmed message.
    Confirmed {
        /// The authoritative message.
        message: Message,
    },
}

impl MessageEntry {
    /// The message payload regardless of confirmation state.
    #[must_use]
    pub const fn message(&self) -> &Message {
        match self {
            Self::Pending { message, .. } | Self::Confirmed { message } => message,
        }
    }

    /// Sort key for the per-conversation sequence.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.message().created_at
    }
}

/// Ephemeral state for the single in-flight response stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingSession {
    /// Conversation the stream belongs to.
    pub conversation_id: Uuid,
    /// Identifier reserved for the assistant message, once known.
    pub assistant_message_id: Option<Uuid>,
    /// Content received so far, in arrival order.
    pub accumulated: String,
    /// Model routing decision, when announced.
    pub model: Option<ModelSelection>,
    /// Topic category, when announced.
    pub category: Option<String>,
}

/// Holds conversations, per-conversation message sequences, pagination
/// cursors, and the streaming buffer.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: HashMap<Uuid, Conversation>,
    /// Conversation list order as delivered by the server, page by page.
    order: Vec<Uuid>,
    messages: HashMap<Uuid, Vec<MessageEntry>>,
    message_pages: HashMap<Uuid, PageInfo>,
    conversation_page: Option<PageInfo>,
    active: Option<Uuid>,
    streaming: Option<StreamingSession>,
    error: Option<String>,
}

impl ConversationStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ---- conversation list ----

    /// Appends one fetched page of the conversation list.
    /// Already-known conversations are updated in place.
    pub fn apply_conversation_page(&mut self, conversations: Vec<Conversation>, page: PageInfo) {
        for conversation in conversations {
            if !self.conversations.contains_key(&conversation.id) {
                self.order.push(conversation.id);
            }
            self.conversations.insert(conversation.id, conversation);
        }
        self.conversation_page = Some(page);
    }

    /// Inserts or updates a single conversation.
    pub fn upsert_conversation(&mut self, conversation: Conversation) {
        if !self.conversations.contains_key(&conversation.id) {
            self.order.insert(0, conversation.id);
        }
        self.conversations.insert(conversation.id, conversation);
    }

    /// Removes a conversation and everything cached under it.
    pub fn remove_conversation(&mut self, id: Uuid) {
        self.conversations.remove(&id);
        self.order.retain(|known| *known != id);
        self.messages.remove(&id);
        self.message_pages.remove(&id);
        if self.active == Some(id) {
            self.active = None;
        }
    }

    /// The conversation list in server order.
    #[must_use]
    pub fn conversations(&self) -> Vec<&Conversation> {
        self.order
            .iter()
            .filter_map(|id| self.conversations.get(id))
            .collect()
    }

    /// Looks up a conversation by id.
    #[must_use]
    pub fn conversation(&self, id: Uuid) -> Option<&Conversation> {
        self.conversations.get(&id)
    }

    /// Cursor for the conversation list, if any page was fetched.
    #[must_use]
    pub const fn conversation_page(&self) -> Option<PageInfo> {
        self.conversation_page
    }

    // ---- active selection ----

    /// Marks a conversation as the one currently open.
    pub fn set_active(&mut self, id: Option<Uuid>) {
        self.active = id;
    }

    /// The currently open conversation.
    #[must_use]
    pub const fn active(&self) -> Option<Uuid> {
        self.active
    }

    // ---- messages ----

    /// Whether messages for this conversation are already cached.
    #[must_use]
    pub fn has_messages(&self, id: Uuid) -> bool {
        self.messages.contains_key(&id)
    }

    /// Replaces the cached sequence with the first fetched page.
    pub fn apply_first_message_page(
        &mut self,
        id: Uuid,
        messages: Vec<Message>,
        page: PageInfo,
    ) {
        let mut entries: Vec<MessageEntry> = messages
            .into_iter()
            .map(|message| MessageEntry::Confirmed { message })
            .collect();
        entries.sort_by_key(MessageEntry::created_at);
        self.messages.insert(id, entries);
        self.message_pages.insert(id, page);
    }

    /// Prepends one older page; history pages arrive newest-cursor-first
    /// and scroll upward.
    pub fn prepend_message_page(&mut self, id: Uuid, messages: Vec<Message>, page: PageInfo) {
        let entries = self.messages.entry(id).or_default();
        let mut merged: Vec<MessageEntry> = messages
            .into_iter()
            .map(|message| MessageEntry::Confirmed { message })
            .collect();
        merged.append(entries);
        merged.sort_by_key(MessageEntry::created_at);
        *entries = merged;
        self.message_pages.insert(id, page);
    }

    /// Appends an optimistic placeholder for a just-sent user message.
    pub fn append_pending(&mut self, id: Uuid, client_id: String, message: Message) {
        self.messages
            .entry(id)
            .or_default()
            .push(MessageEntry::Pending { client_id, message });
    }

    /// Replaces the placeholder identified by `client_id` with the
    /// authoritative message, or removes it when the server declined to
    /// materialize one.
    pub fn confirm_pending(&mut self, id: Uuid, client_id: &str, message: Option<Message>) {
        let Some(entries) = self.messages.get_mut(&id) else {
            return;
        };
        let Some(index) = entries.iter().position(|entry| {
            matches!(entry, MessageEntry::Pending { client_id: pending, .. } if pending == client_id)
        }) else {
            return;
        };
        match message {
            Some(message) => entries[index] = MessageEntry::Confirmed { message },
            None => {
                entries.remove(index);
            }
        }
    }

    /// Inserts a confirmed message, or updates it in place when the id is
    /// already known. Interleavings of a page fetch and a realtime push
    /// therefore converge to the same state.
    pub fn upsert_message(&mut self, id: Uuid, message: Message) {
        let entries = self.messages.entry(id).or_default();
        if let Some(existing) = entries.iter_mut().find(|entry| entry.message().id == message.id)
        {
            *existing = MessageEntry::Confirmed { message };
            return;
        }
        let entry = MessageEntry::Confirmed { message };
        let position = entries
            .iter()
            .rposition(|known| known.created_at() <= entry.created_at())
            .map_or(0, |index| index + 1);
        entries.insert(position, entry);
    }

    /// The cached message sequence, oldest first.
    #[must_use]
    pub fn messages(&self, id: Uuid) -> &[MessageEntry] {
        self.messages.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Cursor for a conversation's messages, if any page was fetched.
    #[must_use]
    pub fn message_page(&self, id: Uuid) -> Option<PageInfo> {
        self.message_pages.get(&id).copied()
    }

    // ---- streaming ----

    /// Claims the single streaming slot.
    ///
    /// # Errors
    /// Returns [`ClientError::StreamBusy`] when a stream is already active.
    pub fn begin_stream(&mut self, conversation_id: Uuid) -> Result<(), ClientError> {
        if self.streaming.is_some() {
            return Err(ClientError::StreamBusy);
        }
        self.streaming = Some(StreamingSession {
            conversation_id,
            ..StreamingSession::default()
        });
        self.error = None;
        Ok(())
    }

    /// Whether a response stream is active.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    /// The active streaming session, if any.
    #[must_use]
    pub const fn streaming(&self) -> Option<&StreamingSession> {
        self.streaming.as_ref()
    }

    /// Appends a content fragment in arrival order.
    pub fn push_stream_content(&mut self, text: &str) {
        if let Some(session) = self.streaming.as_mut() {
            session.accumulated.push_str(text);
        }
    }

    /// Records the model routing decision.
    pub fn set_stream_model(&mut self, model: ModelSelection) {
        if let Some(session) = self.streaming.as_mut() {
            session.model = Some(model);
        }
    }

    /// Records the topic category.
    pub fn set_stream_category(&mut self, category: Option<String>) {
        if let Some(session) = self.streaming.as_mut() {
            session.category = category;
        }
    }

    /// Records the reserved assistant message id.
    pub fn set_stream_assistant_id(&mut self, message_id: Uuid) {
        if let Some(session) = self.streaming.as_mut() {
            session.assistant_message_id = Some(message_id);
        }
    }

    /// Completes the stream, returning its final state.
    pub fn finish_stream(&mut self) -> Option<StreamingSession> {
        self.streaming.take()
    }

    /// Aborts the stream, discarding partial state and recording the
    /// user-facing error. Content already rendered stays rendered; only
    /// the streaming flag and buffer are cleared.
    pub fn fail_stream(&mut self, message: &str) -> Option<StreamingSession> {
        self.error = Some(message.to_string());
        self.streaming.take()
    }

    // ---- error slice ----

    /// The store's single user-facing error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Sets the user-facing error.
    pub fn set_error(&mut self, message: Option<String>) {
        self.error = message;
    }

    /// Drops all session-scoped state (logout teardown).
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
