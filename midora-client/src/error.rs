use midora_shared::models::{ErrorBody, ErrorKind};
use thiserror::Error;

/// Errors produced by the client core.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection-level failure before a response arrived.
    #[error("network error: {0}")]
    Transport(String),

    /// The bounded request timeout elapsed.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status.
    #[error("http {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Classification from the structured error body.
        kind: ErrorKind,
        /// Server-provided message.
        message: String,
    },

    /// The response stream broke or carried an undecodable frame.
    #[error("stream error: {0}")]
    Stream(String),

    /// WebSocket transport failure.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Reconnection attempts are exhausted; a reload is required.
    #[error("realtime channel closed after {attempts} reconnect attempts")]
    RealtimeExhausted {
        /// How many reconnects were tried.
        attempts: u32,
    },

    /// No usable refresh token; the user must sign in again.
    #[error("session expired")]
    SessionExpired,

    /// A response stream is already active for this controller.
    #[error("a response stream is already in progress")]
    StreamBusy,

    /// The SSO callback `state` did not match the stored nonce.
    #[error("sso state mismatch")]
    SsoStateMismatch,

    /// No SSO flow was started before the callback arrived.
    #[error("no sso flow in progress")]
    SsoFlowMissing,

    /// Local persistence failure (token store).
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Configuration or URL construction failure.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Maps a transport-layer error, distinguishing timeouts.
    #[must_use]
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }

    /// Builds an HTTP error from a status code and optional structured body.
    #[must_use]
    pub fn from_response(status: u16, body: Option<ErrorBody>) -> Self {
        match body {
            Some(body) => Self::Http {
                status,
                kind: body.kind(),
                message: body.message,
            },
            None => Self::Http {
                status,
                kind: ErrorKind::Unknown,
                message: format!("request failed with status {status}"),
            },
        }
    }

    /// Whether a retry could plausibly succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Collapses any client error into the single user-facing message the
/// presentation layer renders. Raw error objects never cross this line.
#[must_use]
pub fn normalize_error(err: &ClientError) -> &'static str {
    match err {
        ClientError::Transport(_) => "Network error. Check your connection and try again.",
        ClientError::Timeout => "The request timed out. Check your connection and try again.",
        ClientError::Http { kind, .. } => match kind {
            ErrorKind::Credential => "Invalid credentials. Check your details and try again.",
            ErrorKind::Quota => "You have reached your usage limit. Please try again later.",
            ErrorKind::Provider => "The assistant is temporarily unavailable. Please try again.",
            ErrorKind::Validation => "Some fields are invalid. Review your input and try again.",
            ErrorKind::Unknown => "Something went wrong. Please try again.",
        },
        ClientError::Stream(_) => "The response was interrupted. Please try again.",
        ClientError::WebSocket(_) => "Realtime updates are unavailable right now.",
        ClientError::RealtimeExhausted { .. } => {
            "Realtime updates stopped. Reload the app to reconnect."
        }
        ClientError::SessionExpired => "Your session has expired. Please sign in again.",
        ClientError::StreamBusy => "A response is still in progress. Wait for it to finish.",
        ClientError::SsoStateMismatch | ClientError::SsoFlowMissing => {
            "Sign-in could not be verified. Please start over."
        }
        ClientError::Storage(_) | ClientError::Config(_) => {
            "Something went wrong. Please try again."
        }
    }
}
