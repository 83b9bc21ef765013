//! Session lifecycle: credentials, token rotation, OTP, and SSO.

use midora_shared::{
    config::ClientConfig,
    models::{
        AuthMethod, AuthTokens, ForgotPasswordRequest, LoginRequest, LoginResponse, MeResponse,
        ProfileUpdateRequest, RefreshRequest, RegenerateOtpRequest, RegisterRequest,
        RegisterResponse, ResetPasswordRequest, SsoExchangeRequest, SsoExchangeResponse,
        SsoProvider, User, VerifyOtpRequest,
    },
};
use rand::{Rng, distr::Alphanumeric};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;
use url::Url;

use crate::{
    error::{ClientError, normalize_error},
    http::HttpClient,
    token::TokenStore,
};

/// The authenticated user's credential and profile state.
///
/// Token copies here are a cache; the [`TokenStore`] is authoritative.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Profile of the signed-in user, once fetched.
    pub user: Option<User>,
    /// Cached access token.
    pub access_token: Option<String>,
    /// Cached refresh token.
    pub refresh_token: Option<String>,
    /// How the session was established.
    pub auth_method: Option<AuthMethod>,
    /// Whether a user is signed in.
    pub is_authenticated: bool,
    /// Whether an auth operation is in flight.
    pub is_loading: bool,
    /// Normalized message of the last failed operation.
    pub error: Option<String>,
}

#[derive(Debug)]
struct SsoFlow {
    provider: SsoProvider,
    state: String,
}

/// Orchestrates the Token Store, the HTTP wrapper, and the session slice.
#[derive(Debug)]
pub struct AuthManager {
    http: Arc<HttpClient>,
    tokens: Arc<TokenStore>,
    session: Mutex<Session>,
    sso_flow: Mutex<Option<SsoFlow>>,
    default_route: String,
    onboarding_route: String,
    sso_enabled: bool,
}

impl AuthManager {
    /// Wires the manager against the shared HTTP and token plumbing.
    #[must_use]
    pub fn new(config: &ClientConfig, http: Arc<HttpClient>, tokens: Arc<TokenStore>) -> Self {
        let mut session = Session::default();
        // A surviving refresh token restores the signed-in state lazily;
        // the profile is fetched on the next refresh.
        if let Some(refresh_token) = tokens.refresh_token() {
            session.refresh_token = Some(refresh_token);
            session.access_token = tokens.access_token();
        }
        Self {
            http,
            tokens,
            session: Mutex::new(session),
            sso_flow: Mutex::new(None),
            default_route: config.default_route.clone(),
            onboarding_route: config.onboarding_route.clone(),
            sso_enabled: config.features.sso,
        }
    }

    /// A snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.lock_session().clone()
    }

    /// Signs in with email/password and returns the client-side
    /// destination route, honoring a sanitized `return_url`.
    ///
    /// # Errors
    /// Returns the classified error; the session records its normalized
    /// message. Never retried.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        return_url: Option<&str>,
    ) -> Result<String, ClientError> {
        self.begin_op();
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let result: Result<LoginResponse, ClientError> =
            self.http.post_json("auth/login", &request).await;
        match result {
            Ok(response) => {
                self.install_tokens(&response.tokens, AuthMethod::Password)
                    .await?;
                self.end_op();
                Ok(resolve_destination(return_url, &self.default_route))
            }
            Err(err) => Err(self.fail_op(err)),
        }
    }

    /// Creates an account; verification continues over OTP.
    ///
    /// # Errors
    /// Returns the classified error; the session records its normalized
    /// message.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ClientError> {
        self.begin_op();
        let result = self.http.post_json("auth/register", request).await;
        self.settle_op(result)
    }

    /// Ends the session: best-effort server notification, then local
    /// teardown. Local state is cleared even when the request fails.
    pub async fn logout(&self) {
        if let Err(err) = self.http.post_unit("auth/logout", &serde_json::json!({})).await {
            warn!("logout request failed: {err}");
        }
        if let Err(err) = self.tokens.clear() {
            warn!("failed to clear persisted tokens: {err}");
        }
        *self.lock_session() = Session::default();
        *self.lock_flow() = None;
    }

    /// Rotates the token pair using the stored refresh token.
    ///
    /// Fails fast into [`logout`](Self::logout) when the refresh token is
    /// absent, locally expired, or rejected by the server.
    ///
    /// # Errors
    /// [`ClientError::SessionExpired`] after teardown, or the classified
    /// transport error when the server was unreachable.
    pub async fn refresh_access_token(&self) -> Result<(), ClientError> {
        let Some(refresh_token) = self.tokens.refresh_token() else {
            self.logout().await;
            return Err(self.fail_op(ClientError::SessionExpired));
        };

        let request = RefreshRequest { refresh_token };
        let result: Result<LoginResponse, ClientError> =
            self.http.post_json("auth/refresh", &request).await;
        match result {
            Ok(response) => {
                self.tokens.set(&response.tokens)?;
                let mut session = self.lock_session();
                session.access_token = Some(response.tokens.access_token.clone());
                session.refresh_token = Some(response.tokens.refresh_token.clone());
                session.is_authenticated = true;
                Ok(())
            }
            Err(ClientError::Http { status: 401, .. }) => {
                self.logout().await;
                Err(self.fail_op(ClientError::SessionExpired))
            }
            Err(err) => Err(self.fail_op(err)),
        }
    }

    /// Fetches the current-user profile and mirrors it into the session.
    /// Used to restore a session in a fresh process from persisted tokens.
    ///
    /// # Errors
    /// Returns the classified error.
    pub async fn me(&self) -> Result<User, ClientError> {
        let result: Result<MeResponse, ClientError> = self.http.get_json("auth/me", &[]).await;
        match result {
            Ok(response) => {
                let mut session = self.lock_session();
                session.user = Some(response.user.clone());
                session.is_authenticated = true;
                Ok(response.user)
            }
            Err(err) => Err(self.fail_op(err)),
        }
    }

    /// Requests a password-reset email.
    ///
    /// # Errors
    /// Returns the classified error.
    pub async fn forgot_password(&self, email: &str) -> Result<(), ClientError> {
        self.begin_op();
        let request = ForgotPasswordRequest {
            email: email.to_string(),
        };
        let result = self.http.post_unit("auth/forgot-password", &request).await;
        self.settle_op(result)
    }

    /// Completes a password reset with the emailed token.
    ///
    /// # Errors
    /// Returns the classified error.
    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<(), ClientError> {
        self.begin_op();
        let result = self.http.post_unit("auth/reset-password", request).await;
        self.settle_op(result)
    }

    /// Verifies an emailed one-time code and signs the user in.
    ///
    /// # Errors
    /// Returns the classified error.
    pub async fn verify_otp(&self, request: &VerifyOtpRequest) -> Result<String, ClientError> {
        self.begin_op();
        let result: Result<LoginResponse, ClientError> =
            self.http.post_json("auth/otp/verify", request).await;
        match result {
            Ok(response) => {
                self.install_tokens(&response.tokens, AuthMethod::Otp).await?;
                self.end_op();
                Ok(self.default_route.clone())
            }
            Err(err) => Err(self.fail_op(err)),
        }
    }

    /// Re-sends the one-time code.
    ///
    /// # Errors
    /// Returns the classified error.
    pub async fn regenerate_otp(&self, email: &str) -> Result<(), ClientError> {
        self.begin_op();
        let request = RegenerateOtpRequest {
            email: email.to_string(),
        };
        let result = self.http.post_unit("auth/otp/regenerate", &request).await;
        self.settle_op(result)
    }

    /// Starts an SSO flow: generates and stores the anti-forgery `state`
    /// nonce and returns the provider authorization URL.
    ///
    /// # Errors
    /// Returns a configuration error when SSO is disabled or the URL
    /// cannot be built.
    pub fn begin_sso(&self, provider: SsoProvider) -> Result<Url, ClientError> {
        if !self.sso_enabled {
            return Err(ClientError::Config("sso is disabled".to_string()));
        }
        let state: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        let mut url = self.http.api_url(&format!("auth/sso/{provider}"))?;
        url.query_pairs_mut().append_pair("state", &state);
        *self.lock_flow() = Some(SsoFlow { provider, state });
        Ok(url)
    }

    /// Completes an SSO flow after the provider redirect.
    ///
    /// The `state` echo must match the stored nonce; a mismatch is a hard
    /// failure and no token exchange is attempted. Returns the post-login
    /// destination, branching on onboarding.
    ///
    /// # Errors
    /// [`ClientError::SsoStateMismatch`], [`ClientError::SsoFlowMissing`],
    /// or the classified exchange error.
    pub async fn handle_sso_callback(
        &self,
        code: &str,
        state: &str,
    ) -> Result<String, ClientError> {
        let Some(flow) = self.lock_flow().take() else {
            return Err(self.fail_op(ClientError::SsoFlowMissing));
        };
        if flow.state != state {
            return Err(self.fail_op(ClientError::SsoStateMismatch));
        }

        self.begin_op();
        let request = SsoExchangeRequest {
            code: code.to_string(),
            provider: flow.provider,
        };
        let result: Result<SsoExchangeResponse, ClientError> =
            self.http.post_json("auth/sso/callback", &request).await;
        match result {
            Ok(response) => {
                self.install_tokens(&response.tokens, flow.provider.auth_method())
                    .await?;
                self.end_op();
                Ok(if response.requires_onboarding {
                    self.onboarding_route.clone()
                } else {
                    self.default_route.clone()
                })
            }
            Err(err) => Err(self.fail_op(err)),
        }
    }

    /// Updates the profile and mirrors the result into the session.
    ///
    /// # Errors
    /// Returns the classified error.
    pub async fn update_profile(&self, request: &ProfileUpdateRequest) -> Result<User, ClientError> {
        self.begin_op();
        let result: Result<MeResponse, ClientError> =
            self.http.patch_json("account/profile", request).await;
        match result {
            Ok(response) => {
                self.lock_session().user = Some(response.user.clone());
                self.end_op();
                Ok(response.user)
            }
            Err(err) => Err(self.fail_op(err)),
        }
    }

    async fn install_tokens(
        &self,
        tokens: &AuthTokens,
        method: AuthMethod,
    ) -> Result<(), ClientError> {
        if let Err(err) = self.tokens.set(tokens) {
            return Err(self.fail_op(err));
        }
        let profile: MeResponse = match self.http.get_json("auth/me", &[]).await {
            Ok(profile) => profile,
            Err(err) => return Err(self.fail_op(err)),
        };

        let mut session = self.lock_session();
        session.user = Some(profile.user);
        session.access_token = Some(tokens.access_token.clone());
        session.refresh_token = Some(tokens.refresh_token.clone());
        session.auth_method = Some(method);
        session.is_authenticated = true;
        session.error = None;
        Ok(())
    }

    fn begin_op(&self) {
        let mut session = self.lock_session();
        session.is_loading = true;
        session.error = None;
    }

    fn end_op(&self) {
        self.lock_session().is_loading = false;
    }

    fn fail_op(&self, err: ClientError) -> ClientError {
        let mut session = self.lock_session();
        session.is_loading = false;
        session.error = Some(normalize_error(&err).to_string());
        err
    }

    fn settle_op<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        match result {
            Ok(value) => {
                self.end_op();
                Ok(value)
            }
            Err(err) => Err(self.fail_op(err)),
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_flow(&self) -> MutexGuard<'_, Option<SsoFlow>> {
        self.sso_flow.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolves the post-login route. Only same-app absolute paths are
/// honored; anything else falls back to the default route.
fn resolve_destination(return_url: Option<&str>, default_route: &str) -> String {
    match return_url {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => default_route.to_string(),
    }
}
