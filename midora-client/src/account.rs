//! Thin typed wrappers for the account and billing endpoints.

use midora_shared::models::{CheckoutRequest, CheckoutResponse, UploadResponse};
use reqwest::multipart::{Form, Part};
use std::sync::Arc;

use crate::{error::ClientError, http::HttpClient};

/// Account-scoped API surface with no local state of its own.
#[derive(Debug, Clone)]
pub struct AccountClient {
    http: Arc<HttpClient>,
}

impl AccountClient {
    /// Wires the client against the shared HTTP wrapper.
    #[must_use]
    pub const fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Uploads an avatar image and returns its stored location.
    ///
    /// # Errors
    /// Returns the classified error, or a configuration error for an
    /// invalid content type.
    pub async fn upload_avatar(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadResponse, ClientError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|err| ClientError::Config(format!("invalid content type: {err}")))?;
        let form = Form::new().part("file", part);
        self.http.post_multipart("account/avatar", form).await
    }

    /// Starts a subscription checkout and returns the hosted payment URL.
    ///
    /// # Errors
    /// Returns the classified error.
    pub async fn create_checkout(&self, plan_id: &str) -> Result<CheckoutResponse, ClientError> {
        let request = CheckoutRequest {
            plan_id: plan_id.to_string(),
        };
        self.http.post_json("billing/checkout", &request).await
    }
}
