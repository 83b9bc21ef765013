//! HTTP plumbing shared by every client subsystem.
//!
//! Requests to the backend origin get a bearer header when an access token
//! is available and always carry cookies; anything aimed at a foreign
//! origin passes through untouched.

use midora_shared::{config::ClientConfig, models::ErrorBody};
use reqwest::{
    Client, RequestBuilder, Response,
    cookie::Jar,
    header::{self, SET_COOKIE},
};
use serde::{Serialize, de::DeserializeOwned};
use std::{sync::Arc, time::Duration};
use tracing::warn;
use url::Url;

use crate::{
    error::ClientError,
    token::{ACCESS_COOKIE, TokenStore},
};

const USER_AGENT: &str = concat!("midora-client/", env!("CARGO_PKG_VERSION"));

/// Thin wrapper over [`reqwest::Client`] implementing the platform's
/// request policy: auth injection, error typing, bounded retries.
#[derive(Debug)]
pub struct HttpClient {
    base_url: Url,
    client: Client,
    /// Separate client without a total timeout; response streams outlive
    /// any sensible request deadline.
    stream_client: Client,
    tokens: Arc<TokenStore>,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl HttpClient {
    /// Builds the wrapper from the frozen configuration.
    ///
    /// # Errors
    /// Returns a configuration error when the underlying clients cannot be
    /// constructed.
    pub fn new(config: &ClientConfig, tokens: Arc<TokenStore>) -> Result<Self, ClientError> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| ClientError::Config(format!("failed to build http client: {err}")))?;
        let stream_client = Client::builder()
            .cookie_provider(jar)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| ClientError::Config(format!("failed to build stream client: {err}")))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            client,
            stream_client,
            tokens,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay(),
        })
    }

    /// Resolves an API path against the backend origin.
    ///
    /// # Errors
    /// Returns a configuration error when the path does not join cleanly.
    pub fn api_url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join("api/")
            .and_then(|base| base.join(path.trim_start_matches('/')))
            .map_err(|err| ClientError::Config(format!("invalid api path {path}: {err}")))
    }

    /// GET with bounded exponential-backoff retries (idempotent calls only).
    ///
    /// # Errors
    /// Returns the final classified error once the retry budget is spent.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = self.api_url(path)?;
        let mut attempt: u32 = 0;
        loop {
            let mut builder = self.client.get(url.clone());
            if !query.is_empty() {
                builder = builder.query(query);
            }
            let result = self.execute(self.authorize(builder, &url)).await;
            match result {
                Ok(response) => {
                    return response
                        .json()
                        .await
                        .map_err(|err| ClientError::from_reqwest(&err));
                }
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.retry_base_delay * 2_u32.saturating_pow(attempt - 1);
                    warn!(path, attempt, "retrying idempotent request: {err}");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// POST a JSON body and decode a JSON response. Never retried.
    ///
    /// # Errors
    /// Returns the classified transport or HTTP error.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.api_url(path)?;
        let builder = self.authorize(self.client.post(url.clone()).json(body), &url);
        let response = self.execute(builder).await?;
        response
            .json()
            .await
            .map_err(|err| ClientError::from_reqwest(&err))
    }

    /// POST a JSON body, discarding any response payload. Never retried.
    ///
    /// # Errors
    /// Returns the classified transport or HTTP error.
    pub async fn post_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ClientError> {
        let url = self.api_url(path)?;
        let builder = self.authorize(self.client.post(url.clone()).json(body), &url);
        self.execute(builder).await?;
        Ok(())
    }

    /// PATCH a JSON body and decode a JSON response.
    ///
    /// # Errors
    /// Returns the classified transport or HTTP error.
    pub async fn patch_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.api_url(path)?;
        let builder = self.authorize(self.client.patch(url.clone()).json(body), &url);
        let response = self.execute(builder).await?;
        response
            .json()
            .await
            .map_err(|err| ClientError::from_reqwest(&err))
    }

    /// DELETE a resource.
    ///
    /// # Errors
    /// Returns the classified transport or HTTP error.
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let url = self.api_url(path)?;
        let builder = self.authorize(self.client.delete(url.clone()), &url);
        self.execute(builder).await?;
        Ok(())
    }

    /// POST a multipart form (file uploads) and decode a JSON response.
    ///
    /// # Errors
    /// Returns the classified transport or HTTP error.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ClientError> {
        let url = self.api_url(path)?;
        let builder = self.authorize(self.client.post(url.clone()).multipart(form), &url);
        let response = self.execute(builder).await?;
        response
            .json()
            .await
            .map_err(|err| ClientError::from_reqwest(&err))
    }

    /// Opens a streaming POST without the bounded request timeout.
    ///
    /// # Errors
    /// Returns the classified transport or HTTP error from the response
    /// head; body errors surface while consuming the stream.
    pub async fn post_stream<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, ClientError> {
        let url = self.api_url(path)?;
        let builder = self
            .stream_client
            .post(url.clone())
            .header(header::ACCEPT, "text/event-stream")
            .json(body);
        self.execute(self.authorize(builder, &url)).await
    }

    fn authorize(&self, builder: RequestBuilder, url: &Url) -> RequestBuilder {
        if url.origin() != self.base_url.origin() {
            return builder;
        }
        match self.tokens.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder
            .send()
            .await
            .map_err(|err| ClientError::from_reqwest(&err))?;
        self.capture_rotation(&response);

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .bytes()
            .await
            .ok()
            .and_then(|bytes| serde_json::from_slice::<ErrorBody>(&bytes).ok());
        Err(ClientError::from_response(status.as_u16(), body))
    }

    /// Picks up server-rotated access tokens from `Set-Cookie` headers.
    fn capture_rotation(&self, response: &Response) {
        for value in response.headers().get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let Some(pair) = raw.split(';').next() else {
                continue;
            };
            let Some((name, token)) = pair.split_once('=') else {
                continue;
            };
            // The refresh cookie only rotates through the refresh endpoint,
            // whose JSON body is authoritative.
            if name.trim() == ACCESS_COOKIE && !token.is_empty() {
                if let Err(err) = self.tokens.set_access_token(token.trim()) {
                    warn!("failed to persist rotated access token: {err}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midora_shared::models::AuthTokens;

    fn store_with_token(dir: &std::path::Path) -> Arc<TokenStore> {
        let store = Arc::new(TokenStore::open(dir.join("tokens.json")));
        store
            .set(&AuthTokens {
                access_token: "tok-abc".to_string(),
                refresh_token: "ref-abc".to_string(),
                access_expires_in: Some(3600),
                refresh_expires_in: Some(86_400),
            })
            .unwrap();
        store
    }

    fn client_at(base: &str, tokens: Arc<TokenStore>) -> HttpClient {
        let mut config = ClientConfig::with_defaults();
        config.base_url = Url::parse(base).unwrap();
        HttpClient::new(&config, tokens).unwrap()
    }

    #[test]
    fn backend_requests_carry_bearer() {
        let dir = tempfile::tempdir().unwrap();
        let http = client_at("https://api.midora.test/", store_with_token(dir.path()));

        let url = http.api_url("conversations").unwrap();
        let request = http
            .authorize(http.client.get(url.clone()), &url)
            .build()
            .unwrap();

        let auth = request.headers().get(header::AUTHORIZATION).unwrap();
        assert_eq!(auth.to_str().unwrap(), "Bearer tok-abc");
    }

    #[test]
    fn foreign_requests_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let http = client_at("https://api.midora.test/", store_with_token(dir.path()));

        let foreign = Url::parse("https://cdn.example.com/asset.png").unwrap();
        let request = http
            .authorize(http.client.get(foreign.clone()), &foreign)
            .build()
            .unwrap();

        assert!(request.headers().get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn missing_token_sends_no_bearer() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = Arc::new(TokenStore::open(dir.path().join("tokens.json")));
        let http = client_at("https://api.midora.test/", tokens);

        let url = http.api_url("conversations").unwrap();
        let request = http
            .authorize(http.client.get(url.clone()), &url)
            .build()
            .unwrap();

        assert!(request.headers().get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn api_url_joins_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = Arc::new(TokenStore::open(dir.path().join("tokens.json")));
        let http = client_at("https://api.midora.test/", tokens);

        let url = http.api_url("/auth/login").unwrap();
        assert_eq!(url.as_str(), "https://api.midora.test/api/auth/login");
    }
}
