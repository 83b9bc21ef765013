use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

use super::Timestamp;

/// How the current session was established.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Password,
    Otp,
    Google,
    Microsoft,
    #[serde(rename = "github")]
    GitHub,
}

/// Single-sign-on providers supported by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SsoProvider {
    Google,
    Microsoft,
    #[serde(rename = "github")]
    GitHub,
}

impl SsoProvider {
    /// Path segment used by the backend's SSO endpoints.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Microsoft => "microsoft",
            Self::GitHub => "github",
        }
    }

    /// The auth method recorded when this provider completes.
    #[must_use]
    pub const fn auth_method(self) -> AuthMethod {
        match self {
            Self::Google => AuthMethod::Google,
            Self::Microsoft => AuthMethod::Microsoft,
            Self::GitHub => AuthMethod::GitHub,
        }
    }
}

impl Display for SsoProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// The authenticated user's profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique identifier for the user.
    pub id: Uuid,

    /// The user's email address.
    pub email: String,

    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Optional avatar location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Whether the account has completed onboarding.
    #[serde(default)]
    pub onboarded: bool,

    /// When the account was created.
    pub created_at: Timestamp,
}

/// Access/refresh token pair issued by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthTokens {
    /// Short-lived bearer token.
    pub access_token: String,

    /// Long-lived rotation token.
    pub refresh_token: String,

    /// Access token lifetime in seconds; server may omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_expires_in: Option<u64>,

    /// Refresh token lifetime in seconds; server may omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_expires_in: Option<u64>,
}

/// Credentials for password login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful login or OTP verification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    /// The issued token pair.
    pub tokens: AuthTokens,
}

/// Request body for rotating the token pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Request body for account registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Registration outcome; the account stays unverified until OTP completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterResponse {
    /// Identifier of the new account.
    pub user_id: Uuid,

    /// Whether a verification code was emailed.
    #[serde(default)]
    pub otp_sent: bool,
}

/// Current-user profile response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MeResponse {
    /// The authenticated user.
    pub user: User,
}

/// Request body for a password-reset email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Request body for completing a password reset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResetPasswordRequest {
    /// Opaque token from the reset email.
    pub token: String,
    pub new_password: String,
}

/// Request body for verifying an emailed one-time code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

/// Request body for re-sending a one-time code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegenerateOtpRequest {
    pub email: String,
}

/// Request body for completing an SSO flow server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SsoExchangeRequest {
    /// Authorization code from the provider callback.
    pub code: String,
    /// The provider the flow started with.
    pub provider: SsoProvider,
}

/// Outcome of the server-side SSO code exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SsoExchangeResponse {
    /// The issued token pair.
    pub tokens: AuthTokens,

    /// Whether the account still needs the signup flow.
    #[serde(default)]
    pub requires_onboarding: bool,
}

/// Request body for profile updates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Response for avatar or file uploads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    /// Location of the stored file.
    pub url: String,
}

/// Request body for starting a subscription checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Identifier of the plan being purchased.
    pub plan_id: String,
}

/// Response carrying the hosted checkout location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutResponse {
    /// URL the user completes payment at.
    pub checkout_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn user_round_trip() {
        let user = User {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            display_name: Some("Test".into()),
            avatar_url: None,
            onboarded: true,
            created_at: Timestamp(Utc::now()),
        };

        let json = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();

        assert_eq!(back, user);
    }

    #[test]
    fn sso_provider_paths() {
        assert_eq!(SsoProvider::Google.as_str(), "google");
        assert_eq!(SsoProvider::Microsoft.as_str(), "microsoft");
        assert_eq!(SsoProvider::GitHub.as_str(), "github");
    }

    #[test]
    fn provider_maps_to_auth_method() {
        assert_eq!(SsoProvider::GitHub.auth_method(), AuthMethod::GitHub);
    }

    #[test]
    fn tokens_parse_without_expiries() {
        let json = r#"{"access_token":"a","refresh_token":"r"}"#;
        let tokens: AuthTokens = serde_json::from_str(json).unwrap();

        assert_eq!(tokens.access_expires_in, None);
        assert_eq!(tokens.refresh_expires_in, None);
    }

    #[test]
    fn exchange_response_defaults_onboarding() {
        let json = r#"{"tokens":{"access_token":"a","refresh_token":"r"}}"#;
        let response: SsoExchangeResponse = serde_json::from_str(json).unwrap();

        assert!(!response.requires_onboarding);
    }
}
