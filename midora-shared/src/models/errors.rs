use serde::{Deserialize, Serialize};

/// Coarse classification of the server's `error_type` taxonomy.
///
/// The presentation layer only ever sees one normalized message per kind;
/// the raw `error_type` string is preserved for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong credentials, locked or unverified accounts.
    Credential,
    /// Plan or rate limits.
    Quota,
    /// Upstream AI provider failures.
    Provider,
    /// Request payload rejected by server-side validation.
    Validation,
    /// Anything the taxonomy does not cover.
    Unknown,
}

impl ErrorKind {
    /// Classify a raw `error_type` value.
    #[must_use]
    pub fn from_error_type(value: &str) -> Self {
        match value {
            "invalid_credentials" | "account_locked" | "account_unverified" | "otp_invalid"
            | "otp_expired" | "reset_token_invalid" => Self::Credential,
            "quota_exceeded" | "rate_limited" | "subscription_required" => Self::Quota,
            "provider_error" | "provider_timeout" | "provider_overloaded" => Self::Provider,
            "validation_error" | "invalid_request" => Self::Validation,
            _ => Self::Unknown,
        }
    }
}

/// Structured error payload returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Machine-readable error discriminator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,

    /// Human-readable error message.
    pub message: String,

    /// Optional additional details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    /// Creates an error body with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error_type: None,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an error body carrying a machine-readable discriminator.
    pub fn typed(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: Some(error_type.into()),
            message: message.into(),
            details: None,
        }
    }

    /// The coarse classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.error_type
            .as_deref()
            .map_or(ErrorKind::Unknown, ErrorKind::from_error_type)
    }
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{}: {}", self.message, details),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ErrorBody {}
