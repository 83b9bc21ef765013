#![cfg_attr(not(test), forbid(unsafe_code))]

//! Headless client core for the Midora chat service.
//!
//! The [`AppContext`] is constructed once at process start and owns the
//! shared plumbing: configuration, token store, HTTP wrapper, session
//! manager, and conversation state. Controllers are created from it and
//! injected with exactly what they need; there is no module-level global
//! state.

pub mod account;
pub mod auth;
pub mod controller;
pub mod error;
pub mod http;
pub mod realtime;
pub mod store;
pub mod stream;
pub mod token;

use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

pub use account::AccountClient;
pub use auth::{AuthManager, Session};
pub use controller::{ChatController, ChatEvent};
pub use error::{ClientError, normalize_error};
pub use http::HttpClient;
pub use midora_shared::config::ClientConfig;
pub use realtime::{RealtimeEvent, RealtimeNotifier};
pub use store::{ConversationStore, MessageEntry, StreamingSession};
pub use token::TokenStore;

/// Owns the process-wide client state with an explicit lifecycle:
/// constructed at startup, session-scoped slices torn down on logout.
#[derive(Debug)]
pub struct AppContext {
    /// The frozen configuration.
    pub config: ClientConfig,
    /// Authoritative token persistence.
    pub tokens: Arc<TokenStore>,
    /// Shared HTTP wrapper.
    pub http: Arc<HttpClient>,
    /// Session manager.
    pub auth: Arc<AuthManager>,
    /// Conversation state.
    pub store: Arc<Mutex<ConversationStore>>,
}

impl AppContext {
    /// Builds the context with tokens at the platform default location.
    ///
    /// # Errors
    /// Returns a configuration error when the HTTP clients cannot be
    /// built.
    pub fn initialize(config: ClientConfig) -> Result<Self, ClientError> {
        Self::initialize_at(config, TokenStore::default_path())
    }

    /// Builds the context with tokens at an explicit location.
    ///
    /// # Errors
    /// Returns a configuration error when the HTTP clients cannot be
    /// built.
    pub fn initialize_at(config: ClientConfig, token_path: PathBuf) -> Result<Self, ClientError> {
        let tokens = Arc::new(TokenStore::open(token_path));
        let http = Arc::new(HttpClient::new(&config, tokens.clone())?);
        let auth = Arc::new(AuthManager::new(&config, http.clone(), tokens.clone()));
        Ok(Self {
            config,
            tokens,
            http,
            auth,
            store: Arc::new(Mutex::new(ConversationStore::new())),
        })
    }

    /// Creates a conversation controller feeding the given event channel.
    #[must_use]
    pub fn controller(&self, events: UnboundedSender<ChatEvent>) -> ChatController {
        ChatController::new(&self.config, self.http.clone(), self.store.clone(), events)
    }

    /// Creates a realtime notifier feeding the given event channel.
    #[must_use]
    pub fn notifier(&self, events: UnboundedSender<RealtimeEvent>) -> RealtimeNotifier {
        RealtimeNotifier::new(&self.config, self.store.clone(), events)
    }

    /// The account/billing API surface.
    #[must_use]
    pub fn account(&self) -> AccountClient {
        AccountClient::new(self.http.clone())
    }

    /// The realtime channel endpoint for the signed-in user.
    ///
    /// # Errors
    /// Returns [`ClientError::SessionExpired`] without a signed-in user
    /// or live access token.
    pub fn realtime_endpoint(&self) -> Result<Url, ClientError> {
        let session = self.auth.session();
        let user = session.user.ok_or(ClientError::SessionExpired)?;
        let token = self
            .tokens
            .access_token()
            .ok_or(ClientError::SessionExpired)?;
        self.config
            .ws_endpoint(user.id, &token)
            .map_err(|err| ClientError::Config(err.to_string()))
    }

    /// Ends the session and tears down every session-scoped slice.
    pub async fn logout(&self) {
        self.auth.logout().await;
        self.lock_store().clear();
    }

    fn lock_store(&self) -> MutexGuard<'_, ConversationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
