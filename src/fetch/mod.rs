//! HTTP retrieval of raw feed bytes.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::FetchError;

/// Fetches feed bodies through an [`HttpClient`], bounding each exchange by a
/// fixed timeout. Never retries.
pub struct FeedClient<C> {
    http: C,
    timeout: Duration,
}

impl<C: HttpClient> FeedClient<C> {
    pub fn new(http: C, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// GETs `url` and returns the response body.
    ///
    /// The timeout covers both the request and reading the body.
    #[tracing::instrument(skip(self), fields(timeout_ms = self.timeout.as_millis() as u64))]
    pub async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let req = reqwest::Request::new(reqwest::Method::GET, parsed);

        debug!("Fetching feed");
        let result = match tokio::time::timeout(self.timeout, self.exchange(req, url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }),
        };

        match &result {
            Ok(bytes) => debug!(bytes = bytes.len(), "Feed bytes received"),
            Err(e) => warn!(error = %e, "Feed fetch failed"),
        }
        result
    }

    async fn exchange(&self, req: reqwest::Request, url: &str) -> Result<Bytes, FetchError> {
        let transport = |source: reqwest::Error| {
            if source.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    timeout: self.timeout,
                }
            } else {
                FetchError::Request {
                    url: url.to_string(),
                    source,
                }
            }
        };

        let resp = self.http.execute(req).await.map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        resp.bytes().await.map_err(transport)
    }
}
