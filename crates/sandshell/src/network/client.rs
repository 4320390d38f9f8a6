//! HTTP client backing `curl` and URL mounts.
//!
//! - Response bodies are capped at `max_response_bytes` (10 MB default)
//! - Separate connect (10s) and overall request timeouts
//! - Redirects are not followed

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use std::time::Duration;

use super::Fetcher;
use crate::error::{Error, Result};

/// Default maximum response body size (10 MB)
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

/// Default request timeout (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// reqwest-based [`Fetcher`].
pub struct HttpClient {
    client: Client,
    /// Maximum response body size in bytes
    max_response_bytes: usize,
}

impl HttpClient {
    /// Create a client with the default timeout and size limit.
    pub fn new() -> Result<Self> {
        Self::with_config(
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            DEFAULT_MAX_RESPONSE_BYTES,
        )
    }

    /// Create a client with a custom timeout and response size limit.
    pub fn with_config(timeout: Duration, max_response_bytes: usize) -> Result<Self> {
        // reqwest is built without a bundled provider; an already installed
        // provider is fine
        let _ = rustls::crypto::ring::default_provider().install_default();

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("sandshell/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_response_bytes,
        })
    }

    /// Get the maximum response size in bytes.
    pub fn max_response_bytes(&self) -> usize {
        self.max_response_bytes
    }

    async fn read_body_with_limit(&self, response: reqwest::Response) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result
                .map_err(|e| Error::Network(format!("failed to read response chunk: {}", e)))?;

            if body.len() + chunk.len() > self.max_response_bytes {
                return Err(Error::Network(format!(
                    "response too large: exceeded {} bytes limit",
                    self.max_response_bytes
                )));
            }

            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(url = %crate::logging::redact_url(url), "fetching");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("{}: HTTP {}", url, status.as_u16())));
        }

        // Fail fast when the server announces an oversized body
        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_response_bytes {
                return Err(Error::Network(format!(
                    "response too large: {} bytes (max: {} bytes)",
                    content_length, self.max_response_bytes
                )));
            }
        }

        self.read_body_with_limit(response).await
    }
}
