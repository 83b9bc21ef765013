//! Client configuration, loaded once at process start and frozen.

use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf, time::Duration};
use url::Url;
use uuid::Uuid;

/// Feature toggles read at startup.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FeatureFlags {
    /// Whether SSO sign-in entries are offered.
    pub sso: bool,
    /// Whether billing/checkout operations are offered.
    pub billing: bool,
    /// Whether the realtime WebSocket channel is opened.
    pub realtime: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            sso: true,
            billing: true,
            realtime: true,
        }
    }
}

/// The frozen configuration for the Midora client.
///
/// Values resolve in order: built-in defaults, then the optional TOML
/// file, then `MIDORA_*` environment variables.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend origin, e.g. `https://api.midora.ai/`.
    pub base_url: Url,

    /// WebSocket origin; derived from `base_url` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<Url>,

    /// Total timeout for non-streaming requests, in milliseconds.
    pub request_timeout_ms: u64,

    /// Retry ceiling for idempotent requests.
    pub max_retries: u32,

    /// Base delay for exponential retry backoff, in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Minimum interval between streaming buffer flushes, in milliseconds.
    pub stream_flush_interval_ms: u64,

    /// Interval between WebSocket keepalive pings, in milliseconds.
    pub ws_ping_interval_ms: u64,

    /// Fixed delay between WebSocket reconnection attempts, in milliseconds.
    pub ws_reconnect_delay_ms: u64,

    /// Reconnection attempt ceiling before the channel goes terminal.
    pub ws_max_reconnects: u32,

    /// Page size for conversation and message listings.
    pub page_size: u32,

    /// Route users land on after signing in.
    pub default_route: String,

    /// Route for accounts that still require onboarding.
    pub onboarding_route: String,

    /// Default UI language.
    pub default_language: String,

    /// Languages the client offers.
    pub supported_languages: Vec<String>,

    /// Feature toggles.
    pub features: FeatureFlags,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://localhost:8080/").expect("default base url"),
            ws_url: None,
            request_timeout_ms: 30_000,
            max_retries: 3,
            retry_base_delay_ms: 250,
            stream_flush_interval_ms: 50,
            ws_ping_interval_ms: 30_000,
            ws_reconnect_delay_ms: 2_000,
            ws_max_reconnects: 5,
            page_size: 20,
            default_route: "/chat".to_string(),
            onboarding_route: "/signup".to_string(),
            default_language: "en".to_string(),
            supported_languages: vec!["en".to_string(), "de".to_string(), "fr".to_string()],
            features: FeatureFlags::default(),
        }
    }
}

impl ClientConfig {
    /// Generates the built-in default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Loads the configuration from an optional TOML file and `MIDORA_*`
    /// environment variables.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or parsed, an
    /// environment override is malformed, or validation fails.
    pub fn load_config(config_path: Option<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Self::with_defaults();

        if let Some(path) = config_path {
            let content = fs::read_to_string(&path)?;
            config = toml::from_str(&content)?;
        }

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Ok(value) = env::var("MIDORA_BASE_URL") {
            self.base_url = Url::parse(&value)
                .map_err(|err| format!("Invalid MIDORA_BASE_URL value: {err}"))?;
        }
        if let Ok(value) = env::var("MIDORA_WS_URL") {
            self.ws_url = Some(
                Url::parse(&value).map_err(|err| format!("Invalid MIDORA_WS_URL value: {err}"))?,
            );
        }
        if let Ok(value) = env::var("MIDORA_API_TIMEOUT_MS") {
            self.request_timeout_ms = value
                .parse()
                .map_err(|_| "Invalid MIDORA_API_TIMEOUT_MS value: must be milliseconds")?;
        }
        if let Ok(value) = env::var("MIDORA_STREAM_FLUSH_INTERVAL_MS") {
            self.stream_flush_interval_ms = value.parse().map_err(|_| {
                "Invalid MIDORA_STREAM_FLUSH_INTERVAL_MS value: must be milliseconds"
            })?;
        }
        if let Ok(value) = env::var("MIDORA_DEFAULT_LANGUAGE") {
            self.default_language = value;
        }
        Ok(())
    }

    /// Validates the resolved configuration.
    ///
    /// # Errors
    /// Returns every violated constraint at once.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        let mut errors = Vec::new();

        if self.base_url.cannot_be_a_base() {
            errors.push("base_url must be an absolute http(s) URL".to_string());
        }
        if !matches!(self.base_url.scheme(), "http" | "https") {
            errors.push(format!(
                "base_url scheme must be http or https, got {}",
                self.base_url.scheme()
            ));
        }
        if self.request_timeout_ms == 0 {
            errors.push("request_timeout_ms must be greater than 0".to_string());
        }
        if self.page_size == 0 {
            errors.push("page_size must be greater than 0".to_string());
        }
        if !self
            .supported_languages
            .iter()
            .any(|lang| lang == &self.default_language)
        {
            errors.push(format!(
                "default_language {} is not in supported_languages",
                self.default_language
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("; ").into())
        }
    }

    /// Total timeout for non-streaming requests.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Base delay for exponential retry backoff.
    #[must_use]
    pub const fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Minimum interval between streaming buffer flushes.
    #[must_use]
    pub const fn stream_flush_interval(&self) -> Duration {
        Duration::from_millis(self.stream_flush_interval_ms)
    }

    /// Interval between WebSocket keepalive pings.
    #[must_use]
    pub const fn ws_ping_interval(&self) -> Duration {
        Duration::from_millis(self.ws_ping_interval_ms)
    }

    /// Fixed delay between WebSocket reconnection attempts.
    #[must_use]
    pub const fn ws_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.ws_reconnect_delay_ms)
    }

    /// The per-user realtime channel endpoint.
    ///
    /// Derived from `ws_url` when configured, otherwise from `base_url`
    /// with the scheme switched to `ws(s)`.
    ///
    /// # Errors
    /// Returns an error when the resolved URL cannot carry a `ws` scheme.
    pub fn ws_endpoint(
        &self,
        user_id: Uuid,
        access_token: &str,
    ) -> Result<Url, Box<dyn std::error::Error>> {
        let mut url = self.ws_url.clone().unwrap_or_else(|| self.base_url.clone());
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|()| "cannot set websocket scheme")?;
        let mut url = url.join(&format!("ws/user/{user_id}"))?;
        url.query_pairs_mut().append_pair("token", access_token);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        for key in [
            "MIDORA_BASE_URL",
            "MIDORA_WS_URL",
            "MIDORA_API_TIMEOUT_MS",
            "MIDORA_STREAM_FLUSH_INTERVAL_MS",
            "MIDORA_DEFAULT_LANGUAGE",
        ] {
            // Safety: config tests are serialized.
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn defaults_validate() {
        clear_env();
        let config = ClientConfig::with_defaults();
        assert!(config.validate().is_ok());
        assert_eq!(config.stream_flush_interval(), Duration::from_millis(50));
    }

    #[test]
    #[serial]
    fn file_overrides_defaults() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "base_url = \"https://api.example.com/\"\nrequest_timeout_ms = 5000"
        )
        .unwrap();

        let config = ClientConfig::load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.base_url.as_str(), "https://api.example.com/");
        assert_eq!(config.request_timeout_ms, 5000);
        // Untouched fields keep their defaults.
        assert_eq!(config.page_size, 20);
    }

    #[test]
    #[serial]
    fn env_overrides_file() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_url = \"https://file.example.com/\"").unwrap();

        // Safety: config tests are serialized.
        unsafe { env::set_var("MIDORA_BASE_URL", "https://env.example.com/") };
        let config = ClientConfig::load_config(Some(file.path().to_path_buf())).unwrap();
        clear_env();

        assert_eq!(config.base_url.as_str(), "https://env.example.com/");
    }

    #[test]
    #[serial]
    fn rejects_unknown_default_language() {
        clear_env();
        let mut config = ClientConfig::with_defaults();
        config.default_language = "xx".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn ws_endpoint_swaps_scheme_and_appends_token() {
        clear_env();
        let mut config = ClientConfig::with_defaults();
        config.base_url = Url::parse("https://api.example.com/").unwrap();

        let user_id = Uuid::nil();
        let url = config.ws_endpoint(user_id, "tok-123").unwrap();

        assert_eq!(url.scheme(), "wss");
        assert!(url.path().ends_with(&format!("ws/user/{user_id}")));
        assert_eq!(url.query(), Some("token=tok-123"));
    }
}
