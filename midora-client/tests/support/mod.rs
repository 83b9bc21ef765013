//! In-process mock backend for integration tests.
#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{TimeZone, Utc};
use midora_client::{AppContext, ClientConfig};
use midora_shared::models::{
    AuthTokens, Conversation, ConversationCreateRequest, ConversationCreateResponse,
    ConversationListResponse, ErrorBody, LoginResponse, MeResponse, Message, MessagePageResponse,
    MessageRole, PageInfo, RefreshRequest, SsoExchangeResponse, Timestamp, User,
};
use std::{
    collections::HashMap,
    path::Path as FsPath,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use url::Url;
use uuid::Uuid;

/// Deterministic identifiers shared between handlers and assertions.
pub const USER_ID: Uuid = Uuid::from_u128(1);
pub const CONVERSATION_ID: Uuid = Uuid::from_u128(2);
pub const USER_MESSAGE_ID: Uuid = Uuid::from_u128(3);
pub const ASSISTANT_MESSAGE_ID: Uuid = Uuid::from_u128(4);

/// Request counters, one per endpoint the tests care about.
#[derive(Debug, Default)]
pub struct MockState {
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub sso_exchange_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub list_fetches: AtomicUsize,
    pub conversation_fetches: AtomicUsize,
    pub message_page_fetches: AtomicUsize,
    pub stream_calls: AtomicUsize,
}

pub struct MockServer {
    pub base_url: Url,
    pub state: Arc<MockState>,
}

fn ts(offset_secs: i64) -> Timestamp {
    Timestamp(
        Utc.with_ymd_and_hms(2025, 3, 8, 12, 0, 0).unwrap() + chrono::Duration::seconds(offset_secs),
    )
}

fn sample_user() -> User {
    User {
        id: USER_ID,
        email: "user@example.com".to_string(),
        display_name: Some("Test User".to_string()),
        avatar_url: None,
        onboarded: true,
        created_at: ts(0),
    }
}

fn sample_conversation(id: Uuid, name: &str) -> Conversation {
    Conversation {
        id,
        name: name.to_string(),
        created_at: ts(0),
        updated_at: ts(0),
        archived: false,
    }
}

fn history_message(offset_secs: i64, content: &str) -> Message {
    Message {
        id: Uuid::new_v4(),
        conversation_id: CONVERSATION_ID,
        sender_id: Some(USER_ID),
        role: MessageRole::User,
        content: content.to_string(),
        created_at: ts(offset_secs),
        updated_at: ts(offset_secs),
    }
}

fn tokens(generation: u32) -> AuthTokens {
    AuthTokens {
        access_token: format!("acc-{generation}"),
        refresh_token: format!("ref-{generation}"),
        access_expires_in: Some(3600),
        refresh_expires_in: Some(86_400),
    }
}

async fn login(State(state): State<Arc<MockState>>) -> Json<LoginResponse> {
    state.login_calls.fetch_add(1, Ordering::SeqCst);
    Json(LoginResponse { tokens: tokens(1) })
}

async fn me() -> Json<MeResponse> {
    Json(MeResponse {
        user: sample_user(),
    })
}

async fn refresh(
    State(state): State<Arc<MockState>>,
    Json(request): Json<RefreshRequest>,
) -> impl IntoResponse {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if request.refresh_token.starts_with("ref-") {
        Json(LoginResponse { tokens: tokens(2) }).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody::typed("invalid_credentials", "refresh rejected")),
        )
            .into_response()
    }
}

async fn logout(State(state): State<Arc<MockState>>) -> StatusCode {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn sso_callback(State(state): State<Arc<MockState>>) -> Json<SsoExchangeResponse> {
    state.sso_exchange_calls.fetch_add(1, Ordering::SeqCst);
    Json(SsoExchangeResponse {
        tokens: tokens(1),
        requires_onboarding: false,
    })
}

async fn list_conversations(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<ConversationListResponse> {
    state.list_fetches.fetch_add(1, Ordering::SeqCst);
    let page: u32 = query.get("page").and_then(|raw| raw.parse().ok()).unwrap_or(1);
    let conversation = if page == 1 {
        sample_conversation(CONVERSATION_ID, "First chat")
    } else {
        sample_conversation(Uuid::from_u128(20 + u128::from(page)), "Older chat")
    };
    Json(ConversationListResponse {
        conversations: vec![conversation],
        page: PageInfo {
            page,
            per_page: 1,
            total: 2,
            total_pages: 2,
        },
    })
}

async fn create_conversation(
    State(state): State<Arc<MockState>>,
    Json(request): Json<ConversationCreateRequest>,
) -> Json<ConversationCreateResponse> {
    state.create_calls.fetch_add(1, Ordering::SeqCst);
    Json(ConversationCreateResponse {
        conversation: sample_conversation(CONVERSATION_ID, &request.name),
    })
}

async fn get_conversation(
    State(state): State<Arc<MockState>>,
    Path(id): Path<Uuid>,
) -> Json<Conversation> {
    state.conversation_fetches.fetch_add(1, Ordering::SeqCst);
    Json(sample_conversation(id, "First chat"))
}

async fn get_messages(
    State(state): State<Arc<MockState>>,
    Path(_id): Path<Uuid>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<MessagePageResponse> {
    state.message_page_fetches.fetch_add(1, Ordering::SeqCst);
    let page: u32 = query.get("page").and_then(|raw| raw.parse().ok()).unwrap_or(1);
    // Page 1 is the newest slice; page 2 holds the older history.
    let messages = if page == 1 {
        vec![history_message(30, "c"), history_message(40, "d")]
    } else {
        vec![history_message(10, "a"), history_message(20, "b")]
    };
    Json(MessagePageResponse {
        messages,
        page: PageInfo {
            page,
            per_page: 2,
            total: 4,
            total_pages: 2,
        },
    })
}

async fn stream_message(
    State(state): State<Arc<MockState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    state.stream_calls.fetch_add(1, Ordering::SeqCst);

    let user_message = Message {
        id: USER_MESSAGE_ID,
        conversation_id: id,
        sender_id: Some(USER_ID),
        role: MessageRole::User,
        content: "Hello".to_string(),
        created_at: ts(100),
        updated_at: ts(100),
    };
    let assistant_message = Message {
        id: ASSISTANT_MESSAGE_ID,
        conversation_id: id,
        sender_id: None,
        role: MessageRole::Assistant,
        content: "Hello world".to_string(),
        created_at: ts(101),
        updated_at: ts(101),
    };

    let initial = serde_json::json!({
        "type": "initial_metadata",
        "payload": {
            "conversation_id": id,
            "user_message": user_message,
            "assistant_message_id": ASSISTANT_MESSAGE_ID,
        }
    });
    let fin = serde_json::json!({
        "type": "final",
        "payload": { "message": assistant_message }
    });

    let body = format!(
        "data: {initial}\n\n\
         data: {{\"type\":\"content\",\"text\":\"He\"}}\n\n\
         data: {{\"type\":\"content\",\"text\":\"llo\"}}\n\n\
         data: {{\"type\":\"content\",\"text\":\" world\"}}\n\n\
         data: {fin}\n\n\
         data: [DONE]\n\n"
    );

    ([(header::CONTENT_TYPE, "text/event-stream")], body)
}

/// Starts the mock backend on an ephemeral port.
pub async fn spawn() -> MockServer {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/sso/callback", post(sso_callback))
        .route("/api/conversations", get(list_conversations).post(create_conversation))
        .route("/api/conversations/{id}", get(get_conversation))
        .route("/api/conversations/{id}/messages", get(get_messages))
        .route("/api/conversations/{id}/stream", post(stream_message))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockServer {
        base_url: Url::parse(&format!("http://{addr}/")).unwrap(),
        state,
    }
}

/// Builds an [`AppContext`] aimed at the mock backend, with tokens stored
/// under the given temp directory.
pub fn context_for(server: &MockServer, dir: &FsPath) -> AppContext {
    let mut config = ClientConfig::with_defaults();
    config.base_url = server.base_url.clone();
    config.page_size = 2;
    config.max_retries = 0;
    config.stream_flush_interval_ms = 0;
    AppContext::initialize_at(config, dir.join("tokens.json")).unwrap()
}
