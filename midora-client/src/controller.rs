//! Conversation operations: listing, selection, pagination, and the
//! streaming send path.

use chrono::Utc;
use futures_util::StreamExt;
use midora_shared::{
    config::ClientConfig,
    models::{
        Conversation, ConversationCreateRequest, ConversationCreateResponse,
        ConversationListResponse, ConversationUpdateRequest, FinalPayload, Message,
        MessagePageResponse, MessageRole, SendMessageRequest, StreamEvent, Timestamp,
    },
};
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::{ClientError, normalize_error},
    http::HttpClient,
    store::ConversationStore,
    stream::{FlushGate, STREAM_DONE, SseParser, decode_event},
};

/// Notifications pushed to the presentation layer.
///
/// Delta frequency is bounded by the flush gate, not by chunk arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A response stream opened.
    StreamStarted {
        /// Conversation receiving the response.
        conversation_id: Uuid,
    },
    /// Accumulated response content, emitted at most once per flush
    /// interval.
    StreamDelta {
        /// Conversation receiving the response.
        conversation_id: Uuid,
        /// Everything received so far.
        content: String,
    },
    /// The response finished and was committed to the store.
    StreamCompleted {
        /// Conversation that received the response.
        conversation_id: Uuid,
        /// The finalized assistant message.
        message: Message,
    },
    /// The response failed; partial content stays rendered.
    StreamFailed {
        /// Conversation the stream belonged to.
        conversation_id: Uuid,
        /// Normalized user-facing message.
        message: String,
    },
}

/// Drives the [`ConversationStore`] through the HTTP wrapper and the
/// chunked streaming reader.
#[derive(Debug)]
pub struct ChatController {
    http: Arc<HttpClient>,
    store: Arc<Mutex<ConversationStore>>,
    events: UnboundedSender<ChatEvent>,
    page_size: u32,
    flush_interval: Duration,
}

impl ChatController {
    /// Wires the controller against shared state.
    #[must_use]
    pub fn new(
        config: &ClientConfig,
        http: Arc<HttpClient>,
        store: Arc<Mutex<ConversationStore>>,
        events: UnboundedSender<ChatEvent>,
    ) -> Self {
        Self {
            http,
            store,
            events,
            page_size: config.page_size,
            flush_interval: config.stream_flush_interval(),
        }
    }

    /// Fetches the first page of the conversation list.
    ///
    /// # Errors
    /// Returns the classified error.
    pub async fn load_conversations(&self) -> Result<(), ClientError> {
        self.fetch_conversation_page(1).await
    }

    /// Fetches the next page of the conversation list; a no-op at the
    /// last page.
    ///
    /// # Errors
    /// Returns the classified error.
    pub async fn load_more_conversations(&self) -> Result<(), ClientError> {
        let cursor = self.lock_store().conversation_page();
        match cursor {
            None => self.load_conversations().await,
            Some(cursor) => match cursor.next_page() {
                Some(page) => self.fetch_conversation_page(page).await,
                None => Ok(()),
            },
        }
    }

    /// Creates a conversation with an explicit name.
    ///
    /// # Errors
    /// Returns the classified error.
    pub async fn create_conversation(&self, name: &str) -> Result<Conversation, ClientError> {
        let request = ConversationCreateRequest {
            name: name.to_string(),
        };
        let response: ConversationCreateResponse =
            self.http.post_json("conversations", &request).await?;
        self.lock_store()
            .upsert_conversation(response.conversation.clone());
        Ok(response.conversation)
    }

    /// Opens a conversation. Cached messages make this a pure store
    /// operation; otherwise metadata plus the first message page are
    /// fetched.
    ///
    /// # Errors
    /// Returns the classified error.
    pub async fn select_conversation(&self, id: Uuid) -> Result<(), ClientError> {
        {
            let mut store = self.lock_store();
            if store.has_messages(id) {
                store.set_active(Some(id));
                return Ok(());
            }
        }

        let conversation: Conversation =
            self.http.get_json(&format!("conversations/{id}"), &[]).await?;
        let page: MessagePageResponse = self
            .http
            .get_json(
                &format!("conversations/{id}/messages"),
                &self.page_query(1),
            )
            .await?;

        let mut store = self.lock_store();
        store.upsert_conversation(conversation);
        store.apply_first_message_page(id, page.messages, page.page);
        store.set_active(Some(id));
        Ok(())
    }

    /// Fetches the next (older) page of a conversation's history; a
    /// no-op at the last page or before the first fetch.
    ///
    /// # Errors
    /// Returns the classified error.
    pub async fn load_more_messages(&self, id: Uuid) -> Result<(), ClientError> {
        let cursor = self.lock_store().message_page(id);
        let Some(next) = cursor.and_then(|cursor| cursor.next_page()) else {
            return Ok(());
        };

        let page: MessagePageResponse = self
            .http
            .get_json(
                &format!("conversations/{id}/messages"),
                &self.page_query(next),
            )
            .await?;
        self.lock_store()
            .prepend_message_page(id, page.messages, page.page);
        Ok(())
    }

    /// Renames or archives a conversation.
    ///
    /// # Errors
    /// Returns the classified error.
    pub async fn update_conversation(
        &self,
        id: Uuid,
        request: &ConversationUpdateRequest,
    ) -> Result<Conversation, ClientError> {
        let conversation: Conversation = self
            .http
            .patch_json(&format!("conversations/{id}"), request)
            .await?;
        self.lock_store().upsert_conversation(conversation.clone());
        Ok(conversation)
    }

    /// Deletes a conversation and its cached state.
    ///
    /// # Errors
    /// Returns the classified error.
    pub async fn delete_conversation(&self, id: Uuid) -> Result<(), ClientError> {
        self.http.delete(&format!("conversations/{id}")).await?;
        self.lock_store().remove_conversation(id);
        Ok(())
    }

    /// Clears the active selection so the next send starts a fresh
    /// conversation.
    pub fn start_new_chat(&self) {
        self.lock_store().set_active(None);
    }

    /// Sends a message and consumes the streamed assistant response.
    ///
    /// Without a target conversation one is created first, named from the
    /// message prefix. An optimistic placeholder is appended immediately
    /// and later replaced by the server-confirmed message.
    ///
    /// # Errors
    /// [`ClientError::StreamBusy`] while a stream is active; otherwise
    /// the classified transport or stream error.
    pub async fn send_message(
        &self,
        content: &str,
        model_id: Option<Uuid>,
        conversation_id: Option<Uuid>,
    ) -> Result<Message, ClientError> {
        let target = conversation_id.or_else(|| self.lock_store().active());
        let conversation_id = match target {
            Some(id) => id,
            None => {
                let conversation = self
                    .create_conversation(&derive_conversation_name(content))
                    .await?;
                self.lock_store().set_active(Some(conversation.id));
                conversation.id
            }
        };

        self.lock_store().begin_stream(conversation_id)?;

        let client_id = format!("user-{}", Utc::now().timestamp_millis());
        let now = Timestamp::now();
        let placeholder = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: None,
            role: MessageRole::User,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.lock_store()
            .append_pending(conversation_id, client_id.clone(), placeholder);

        let request = SendMessageRequest {
            content: content.to_string(),
            model_id,
        };
        let response = match self
            .http
            .post_stream(&format!("conversations/{conversation_id}/stream"), &request)
            .await
        {
            Ok(response) => response,
            Err(err) => return Err(self.fail_stream(conversation_id, err)),
        };

        self.consume_stream(conversation_id, &client_id, response)
            .await
    }

    async fn consume_stream(
        &self,
        conversation_id: Uuid,
        client_id: &str,
        response: reqwest::Response,
    ) -> Result<Message, ClientError> {
        let mut body = response.bytes_stream();
        let mut parser = SseParser::new();
        let mut gate = FlushGate::new(self.flush_interval);
        let mut finalized: Option<Message> = None;

        let _ = self.events.send(ChatEvent::StreamStarted { conversation_id });

        'receive: while let Some(chunk) = body.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(err) => {
                    return Err(
                        self.fail_stream(conversation_id, ClientError::from_reqwest(&err))
                    );
                }
            };

            for frame in parser.feed(&bytes) {
                if frame.data == STREAM_DONE {
                    break 'receive;
                }
                let event = match decode_event(&frame) {
                    Ok(event) => event,
                    Err(err) => return Err(self.fail_stream(conversation_id, err)),
                };
                match event {
                    StreamEvent::Content { text } => {
                        let accumulated = {
                            let mut store = self.lock_store();
                            store.push_stream_content(&text);
                            store.streaming().map(|session| session.accumulated.clone())
                        };
                        if let Some(content) = accumulated {
                            if gate.ready() {
                                let _ = self.events.send(ChatEvent::StreamDelta {
                                    conversation_id,
                                    content,
                                });
                            }
                        }
                    }
                    StreamEvent::Metadata { payload } => {
                        self.lock_store().set_stream_category(payload.category);
                    }
                    StreamEvent::ModelSelection { payload } => {
                        debug!(model = %payload.model_name, "stream routed");
                        self.lock_store().set_stream_model(payload);
                    }
                    StreamEvent::InitialMetadata { payload } => {
                        let mut store = self.lock_store();
                        store.set_stream_assistant_id(payload.assistant_message_id);
                        store.confirm_pending(conversation_id, client_id, payload.user_message);
                    }
                    StreamEvent::Final { payload } => {
                        match self.finalize(conversation_id, payload) {
                            Ok(message) => finalized = Some(message),
                            Err(err) => return Err(self.fail_stream(conversation_id, err)),
                        }
                        break 'receive;
                    }
                }
            }
        }

        match finalized {
            Some(message) => {
                // Terminal flush bypasses the gate.
                let _ = self.events.send(ChatEvent::StreamDelta {
                    conversation_id,
                    content: message.content.clone(),
                });
                let _ = self.events.send(ChatEvent::StreamCompleted {
                    conversation_id,
                    message: message.clone(),
                });
                Ok(message)
            }
            None => Err(self.fail_stream(
                conversation_id,
                ClientError::Stream("stream ended before completion".to_string()),
            )),
        }
    }

    fn finalize(
        &self,
        conversation_id: Uuid,
        payload: FinalPayload,
    ) -> Result<Message, ClientError> {
        let mut store = self.lock_store();
        let session = store
            .finish_stream()
            .ok_or_else(|| ClientError::Stream("no active stream to finalize".to_string()))?;

        let now = Timestamp::now();
        let message = payload.message.unwrap_or_else(|| Message {
            id: session.assistant_message_id.unwrap_or_else(Uuid::new_v4),
            conversation_id,
            sender_id: None,
            role: MessageRole::Assistant,
            content: session.accumulated,
            created_at: now,
            updated_at: now,
        });
        store.upsert_message(conversation_id, message.clone());
        Ok(message)
    }

    fn fail_stream(&self, conversation_id: Uuid, err: ClientError) -> ClientError {
        let message = normalize_error(&err).to_string();
        self.lock_store().fail_stream(&message);
        let _ = self.events.send(ChatEvent::StreamFailed {
            conversation_id,
            message,
        });
        err
    }

    async fn fetch_conversation_page(&self, page: u32) -> Result<(), ClientError> {
        let response: ConversationListResponse =
            self.http.get_json("conversations", &self.page_query(page)).await?;
        self.lock_store()
            .apply_conversation_page(response.conversations, response.page);
        Ok(())
    }

    fn page_query(&self, page: u32) -> [(&'static str, String); 2] {
        [
            ("page", page.to_string()),
            ("per_page", self.page_size.to_string()),
        ]
    }

    fn lock_store(&self) -> MutexGuard<'_, ConversationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Synthesizes a conversation name from the first message.
fn derive_conversation_name(content: &str) -> String {
    const MAX_CHARS: usize = 40;

    let trimmed = content.trim();
    if trimmed.is_empty() {
        return "New chat".to_string();
    }

    let mut name: String = trimmed.chars().take(MAX_CHARS).collect();
    if trimmed.chars().count() > MAX_CHARS {
        name = name.trim_end().to_string();
        name.push('…');
    }
    name
}
