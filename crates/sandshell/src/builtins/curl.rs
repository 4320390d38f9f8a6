//! curl builtin - fetch a URL through the session's fetcher

use async_trait::async_trait;

use super::{Builtin, Context, path_error};
use crate::error::{Error, Result};
use crate::fs::write_text;
use crate::logging::redact_url;
use crate::network::file_name_from_url;

/// The curl builtin.
///
/// Usage: curl URL [-o FILE | -O]
///
/// Prints the response body, or writes it to FILE (`-o`) or to the URL's
/// last path segment (`-O`).
pub struct Curl;

#[async_trait]
impl Builtin for Curl {
    async fn execute(&self, ctx: Context<'_>) -> Result<String> {
        let url = ctx
            .args
            .first()
            .ok_or_else(|| Error::execution("curl: no URL specified"))?;
        let fetcher = ctx
            .fetcher
            .ok_or_else(|| Error::Network("network access is not configured".into()))?;

        let output = if ctx.args.flag("O") {
            let name = file_name_from_url(url)
                .ok_or_else(|| Error::execution("curl: remote file name has no length"))?;
            Some(name)
        } else if ctx.args.flag("o") {
            let name = ctx
                .args
                .value("o")
                .ok_or_else(|| Error::execution("curl: option -o requires a file name"))?;
            Some(name.to_string())
        } else {
            None
        };

        tracing::debug!(url = %redact_url(url), "fetching");
        let body = fetcher.fetch(url).await?;
        let body = String::from_utf8_lossy(&body);

        match output {
            Some(file) => {
                let fs = ctx.fs();
                write_text(fs.as_ref(), &ctx.resolve(&file), &body)
                    .await
                    .map_err(|e| path_error(&file, e))?;
                Ok(String::new())
            }
            None => Ok(body.into_owned()),
        }
    }

    fn boolean_flags(&self) -> &'static [&'static str] {
        &["O", "s", "L", "f"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::test_support::Fixture;
    use crate::fs::read_text;
    use crate::network::Fetcher;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    /// Serves a fixed body and remembers requested URLs.
    struct StubFetcher {
        body: &'static str,
        requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.requests.lock().unwrap().push(url.to_string());
            Ok(self.body.as_bytes().to_vec())
        }
    }

    fn fixture() -> (Fixture, Arc<StubFetcher>) {
        let stub = Arc::new(StubFetcher {
            body: "ACGT\n",
            requests: Mutex::new(Vec::new()),
        });
        let mut fx = Fixture::new();
        fx.fetcher = Some(stub.clone() as Arc<dyn Fetcher>);
        (fx, stub)
    }

    #[tokio::test]
    async fn test_prints_body() {
        let (fx, stub) = fixture();
        let out = fx.run(&Curl, &["https://example.com/seq.fa"]).await.unwrap();
        assert_eq!(out, "ACGT\n");
        assert_eq!(
            *stub.requests.lock().unwrap(),
            ["https://example.com/seq.fa"]
        );
    }

    #[tokio::test]
    async fn test_output_file() {
        let (fx, _) = fixture();
        let out = fx
            .run(&Curl, &["-s", "https://example.com/seq.fa", "-o", "out.fa"])
            .await
            .unwrap();
        assert_eq!(out, "");
        let fs = fx.fs();
        let text = read_text(fs.as_ref(), Path::new("/home/user/out.fa"))
            .await
            .unwrap();
        assert_eq!(text, "ACGT\n");
    }

    #[tokio::test]
    async fn test_remote_name() {
        let (fx, _) = fixture();
        fx.run(&Curl, &["-O", "https://example.com/data/seq.fa"])
            .await
            .unwrap();
        assert!(
            fx.fs()
                .exists(Path::new("/home/user/seq.fa"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_without_fetcher() {
        let fx = Fixture::new();
        let err = fx.run(&Curl, &["https://example.com"]).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn test_missing_url() {
        let (fx, _) = fixture();
        let err = fx.run(&Curl, &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "curl: no URL specified");
    }
}
