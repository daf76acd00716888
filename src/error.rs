//! Error types for a single fetch-decode-resolve cycle.
//!
//! Fetch failures are transient and worth retrying on the next cycle. Decode
//! failures point at upstream schema drift and are kept distinct so callers
//! can tell "the feed is down" apart from "the feed changed shape".

use std::time::Duration;

use thiserror::Error;

use crate::models::FeedKind;

/// Failure to retrieve the raw bytes of a feed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid feed url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("{url} did not respond within {timeout:?}")]
    Timeout { url: String, timeout: Duration },
}

/// Bytes that do not decode as a GTFS-Realtime `FeedMessage`.
#[derive(Debug, Error)]
#[error("failed to decode {feed} feed")]
pub struct DecodeError {
    pub feed: FeedKind,
    #[source]
    pub source: prost::DecodeError,
}

/// Aborts a pipeline cycle. No partial result accompanies it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{feed} feed unavailable")]
    Fetch {
        feed: FeedKind,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl PipelineError {
    /// Which feed caused the cycle to abort.
    pub fn feed(&self) -> FeedKind {
        match self {
            PipelineError::Fetch { feed, .. } => *feed,
            PipelineError::Decode(e) => e.feed,
        }
    }

    /// Fetch failures may clear up by the next cycle; decode failures won't.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::Fetch { .. })
    }
}
