//! Session lifecycle against the mock backend.

use midora_client::ClientError;
use midora_shared::models::{AuthTokens, SsoProvider};
use std::sync::atomic::Ordering;

mod support;

#[tokio::test]
async fn login_stores_tokens_and_fetches_profile() {
    let server = support::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = support::context_for(&server, dir.path());

    let destination = ctx
        .auth
        .login("user@example.com", "hunter2", None)
        .await
        .unwrap();

    assert_eq!(destination, "/chat");
    assert_eq!(server.state.login_calls.load(Ordering::SeqCst), 1);

    let session = ctx.auth.session();
    assert!(session.is_authenticated);
    assert!(!session.is_loading);
    assert_eq!(session.user.unwrap().id, support::USER_ID);
    assert_eq!(session.access_token.as_deref(), Some("acc-1"));
    assert_eq!(ctx.tokens.access_token().as_deref(), Some("acc-1"));
}

#[tokio::test]
async fn login_honors_app_local_return_url() {
    let server = support::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = support::context_for(&server, dir.path());

    let destination = ctx
        .auth
        .login("user@example.com", "hunter2", Some("/settings"))
        .await
        .unwrap();
    assert_eq!(destination, "/settings");

    let destination = ctx
        .auth
        .login("user@example.com", "hunter2", Some("https://evil.test/x"))
        .await
        .unwrap();
    assert_eq!(destination, "/chat");
}

#[tokio::test]
async fn refresh_rotates_both_tokens() {
    let server = support::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = support::context_for(&server, dir.path());

    ctx.auth
        .login("user@example.com", "hunter2", None)
        .await
        .unwrap();
    ctx.auth.refresh_access_token().await.unwrap();

    assert_eq!(server.state.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.tokens.access_token().as_deref(), Some("acc-2"));
    assert_eq!(ctx.tokens.refresh_token().as_deref(), Some("ref-2"));
    assert_eq!(ctx.auth.session().access_token.as_deref(), Some("acc-2"));
}

#[tokio::test]
async fn refresh_without_token_logs_out_without_network() {
    let server = support::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = support::context_for(&server, dir.path());

    let err = ctx.auth.refresh_access_token().await.unwrap_err();

    assert!(matches!(err, ClientError::SessionExpired));
    assert_eq!(server.state.refresh_calls.load(Ordering::SeqCst), 0);
    let session = ctx.auth.session();
    assert!(!session.is_authenticated);
    assert_eq!(
        session.error.as_deref(),
        Some("Your session has expired. Please sign in again.")
    );
}

#[tokio::test]
async fn rejected_refresh_tears_the_session_down() {
    let server = support::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = support::context_for(&server, dir.path());

    // A stale pair the server will reject.
    ctx.tokens
        .set(&AuthTokens {
            access_token: "stale".to_string(),
            refresh_token: "revoked".to_string(),
            access_expires_in: Some(3600),
            refresh_expires_in: Some(86_400),
        })
        .unwrap();

    let err = ctx.auth.refresh_access_token().await.unwrap_err();

    assert!(matches!(err, ClientError::SessionExpired));
    assert_eq!(server.state.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(server.state.logout_calls.load(Ordering::SeqCst), 1);
    assert!(ctx.tokens.access_token().is_none());
    assert!(!ctx.auth.session().is_authenticated);
}

#[tokio::test]
async fn sso_state_mismatch_never_reaches_the_exchange() {
    let server = support::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = support::context_for(&server, dir.path());

    ctx.auth.begin_sso(SsoProvider::Google).unwrap();
    let err = ctx
        .auth
        .handle_sso_callback("auth-code", "forged-state")
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::SsoStateMismatch));
    assert_eq!(server.state.sso_exchange_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sso_round_trip_signs_the_user_in() {
    let server = support::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = support::context_for(&server, dir.path());

    let authorize_url = ctx.auth.begin_sso(SsoProvider::GitHub).unwrap();
    let state = authorize_url
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.to_string())
        .unwrap();

    let destination = ctx
        .auth
        .handle_sso_callback("auth-code", &state)
        .await
        .unwrap();

    assert_eq!(destination, "/chat");
    assert_eq!(server.state.sso_exchange_calls.load(Ordering::SeqCst), 1);
    assert!(ctx.auth.session().is_authenticated);
}

#[tokio::test]
async fn logout_clears_every_session_scoped_slice() {
    let server = support::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = support::context_for(&server, dir.path());

    ctx.auth
        .login("user@example.com", "hunter2", None)
        .await
        .unwrap();
    ctx.logout().await;

    assert_eq!(server.state.logout_calls.load(Ordering::SeqCst), 1);
    assert!(ctx.tokens.access_token().is_none());
    let session = ctx.auth.session();
    assert!(!session.is_authenticated);
    assert!(session.user.is_none());
}
