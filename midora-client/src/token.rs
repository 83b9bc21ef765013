//! File-backed token persistence.
//!
//! One authoritative store for both tokens; the cookie names below are the
//! wire names the backend sets alongside the JSON token body.

use chrono::{DateTime, Duration, Utc};
use directories::BaseDirs;
use midora_shared::models::AuthTokens;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::error::ClientError;

/// Cookie carrying the access token on the wire.
pub const ACCESS_COOKIE: &str = "midora_access_token";
/// Cookie carrying the refresh token on the wire.
pub const REFRESH_COOKIE: &str = "midora_refresh_token";

/// Fallback access token lifetime when the server omits one (1 day).
const DEFAULT_ACCESS_TTL_SECS: i64 = 60 * 60 * 24;
/// Fallback refresh token lifetime when the server omits one (7 days).
const DEFAULT_REFRESH_TTL_SECS: i64 = 60 * 60 * 24 * 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedTokens {
    access_token: String,
    refresh_token: String,
    access_expires_at: DateTime<Utc>,
    refresh_expires_at: DateTime<Utc>,
}

/// Persists the access/refresh token pair under the platform config dir.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    inner: Mutex<Option<PersistedTokens>>,
}

impl TokenStore {
    /// Opens the store at `path`, loading any previously persisted tokens.
    /// An unreadable or corrupt file is treated as an empty store.
    #[must_use]
    pub fn open(path: PathBuf) -> Self {
        let inner = fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok());
        Self {
            path,
            inner: Mutex::new(inner),
        }
    }

    /// The default token file location.
    #[must_use]
    pub fn default_path() -> PathBuf {
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("midora").join("tokens.json"))
            .unwrap_or_else(|| PathBuf::from("./tokens.json"))
    }

    /// Stores a freshly issued token pair and persists it to disk.
    ///
    /// # Errors
    /// Returns a storage error when the file cannot be written.
    pub fn set(&self, tokens: &AuthTokens) -> Result<(), ClientError> {
        let now = Utc::now();
        let access_ttl = tokens
            .access_expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .unwrap_or(DEFAULT_ACCESS_TTL_SECS);
        let refresh_ttl = tokens
            .refresh_expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .unwrap_or(DEFAULT_REFRESH_TTL_SECS);

        let persisted = PersistedTokens {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            access_expires_at: now + Duration::seconds(access_ttl),
            refresh_expires_at: now + Duration::seconds(refresh_ttl),
        };

        self.write_file(&persisted)?;
        *self.lock() = Some(persisted);
        Ok(())
    }

    /// Updates only the access token, keeping the refresh token as-is.
    /// Used when the server rotates the access cookie mid-session.
    ///
    /// # Errors
    /// Returns a storage error when the file cannot be written.
    pub fn set_access_token(&self, access_token: &str) -> Result<(), ClientError> {
        let updated = {
            let mut guard = self.lock();
            let Some(tokens) = guard.as_mut() else {
                return Ok(());
            };
            tokens.access_token = access_token.to_string();
            tokens.access_expires_at = Utc::now() + Duration::seconds(DEFAULT_ACCESS_TTL_SECS);
            tokens.clone()
        };
        self.write_file(&updated)
    }

    /// The access token, unless absent or expired.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        let guard = self.lock();
        let tokens = guard.as_ref()?;
        if tokens.access_expires_at <= Utc::now() {
            return None;
        }
        Some(tokens.access_token.clone())
    }

    /// The refresh token, unless absent or expired.
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        let guard = self.lock();
        let tokens = guard.as_ref()?;
        if tokens.refresh_expires_at <= Utc::now() {
            return None;
        }
        Some(tokens.refresh_token.clone())
    }

    /// Whether the stored access token is missing or past its expiry.
    #[must_use]
    pub fn is_access_expired(&self) -> bool {
        self.access_token().is_none()
    }

    /// Whether the stored refresh token is missing or past its expiry.
    #[must_use]
    pub fn is_refresh_expired(&self) -> bool {
        self.refresh_token().is_none()
    }

    /// Removes tokens from memory and disk.
    ///
    /// # Errors
    /// Returns a storage error when the file exists but cannot be removed.
    pub fn clear(&self) -> Result<(), ClientError> {
        *self.lock() = None;
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn write_file(&self, tokens: &PersistedTokens) -> Result<(), ClientError> {
        ensure_parent(&self.path)?;
        let contents = serde_json::to_string_pretty(tokens)
            .map_err(|err| ClientError::Config(format!("token serialization failed: {err}")))?;
        fs::write(&self.path, contents)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<PersistedTokens>> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn ensure_parent(path: &Path) -> Result<(), ClientError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
