//! Remote background removal client
//!
//! Sends one image per request as multipart form data and reads the response
//! body as raw bytes. Every failure (transport, authentication, rate limiting,
//! server error, empty body) is reported as [`BgRemovalError::RemovalFailed`].

use crate::config::RemovalConfig;
use crate::error::{BgRemovalError, Result};
use crate::picker::SelectedImage;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, instrument};

/// Longest slice of an error body kept for diagnostics
const ERROR_BODY_PREVIEW: usize = 512;

/// A service that turns an image into its background-free PNG
#[async_trait]
pub trait RemovalService: Send + Sync {
    /// Remove the background of `image`, returning the result bytes unmodified
    ///
    /// # Errors
    /// Implementations return [`BgRemovalError::RemovalFailed`] for any failure.
    async fn remove_background(&self, image: &SelectedImage) -> Result<Vec<u8>>;
}

/// HTTP client for remove.bg compatible endpoints
#[derive(Debug, Clone)]
pub struct RemoveBgClient {
    client: Client,
    config: RemovalConfig,
}

impl RemoveBgClient {
    /// Create a client for a validated configuration
    ///
    /// # Errors
    /// - Configuration fails validation
    /// - HTTP client cannot be constructed
    pub fn new(config: RemovalConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .user_agent(concat!("bgremove-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BgRemovalError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &RemovalConfig {
        &self.config
    }

    /// Build the single-file multipart form for `image`
    fn build_form(&self, image: &SelectedImage) -> Result<Form> {
        let part = Part::bytes(image.blob().data().to_vec())
            .file_name(image.file_name().to_string())
            .mime_str(image.mime())
            .map_err(|e| {
                BgRemovalError::removal_failed(format!(
                    "invalid MIME type '{}': {}",
                    image.mime(),
                    e
                ))
            })?;

        Ok(Form::new().part(self.config.image_field.clone(), part))
    }
}

#[async_trait]
impl RemovalService for RemoveBgClient {
    #[instrument(
        name = "removal_request",
        skip(self, image),
        fields(endpoint = %self.config.endpoint, file_name = %image.file_name(), bytes = image.blob().len())
    )]
    async fn remove_background(&self, image: &SelectedImage) -> Result<Vec<u8>> {
        let form = self.build_form(image)?;

        debug!("Sending removal request");
        let response = self
            .client
            .post(self.config.endpoint.as_str())
            .header(
                self.config.api_key_header.as_str(),
                self.config.api_key.expose(),
            )
            .multipart(form)
            .send()
            .await
            .map_err(|e| BgRemovalError::removal_failed(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            // The body is read for diagnostics only; it never changes the outcome
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            debug!(status = %status, body = %preview, "Removal API rejected request");
            return Err(BgRemovalError::removal_failed(format!(
                "API responded with status {}",
                status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BgRemovalError::removal_failed(format!("failed to read response body: {}", e)))?;

        if bytes.is_empty() {
            return Err(BgRemovalError::removal_failed("API returned an empty body"));
        }

        debug!(status = %status, result_bytes = bytes.len(), "Removal API responded");
        Ok(bytes.to_vec())
    }
}
