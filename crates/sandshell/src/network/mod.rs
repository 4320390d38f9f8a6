//! Network layer for Sandshell
//!
//! `curl` and URL mounts go through the [`Fetcher`] trait. Without a fetcher
//! the session has no network access at all.

#[cfg(feature = "http_client")]
mod client;

#[cfg(feature = "http_client")]
pub use client::HttpClient;

use async_trait::async_trait;

use crate::error::Result;

/// Fetches the body of a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` and return the response body.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Last non-empty path segment of a URL, used as a download file name.
pub fn file_name_from_url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    parsed
        .path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}
