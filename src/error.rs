//! Typed errors for each boundary of the pipeline.
//!
//! Failures are recovered at the smallest scope that can absorb them:
//! a [`FetchError`] costs one entry its content, a [`PipelineError`] costs one
//! cycle or handshake, and a [`PublishError`] costs one subscriber.

use std::time::Duration;
use thiserror::Error;

/// A single document retrieval failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, DNS, TLS, or transport failure.
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request did not settle before its deadline.
    #[error("timed out after {after:?} fetching {url}")]
    Timeout { url: String, after: Duration },

    /// The server answered, but not with a usable document.
    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },
}

/// A cycle or handshake could not produce a batch at all.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The listing page itself could not be retrieved.
    #[error("listing fetch failed: {0}")]
    Listing(#[from] FetchError),
}

/// The store could not service a request.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("could not serialize content: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Delivery to one subscriber failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PublishError {
    #[error("subscriber {0} is not connected")]
    UnknownSubscriber(u64),

    #[error("subscriber {0} hung up")]
    Disconnected(u64),
}
