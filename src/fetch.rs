//! Document retrieval with a bounded deadline.
//!
//! [`FetchDocument`] is the seam between the pipeline and the network. The
//! production implementation is [`HttpFetcher`]; tests substitute fakes with
//! scripted bodies, failures, and delays.

use crate::error::FetchError;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Something that can retrieve a document body for a URL.
pub trait FetchDocument: Send + Sync {
    /// Retrieve the body at `url`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Largest body [`HttpFetcher`] will read by default.
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// `reqwest`-backed fetcher. Every request carries the client-level timeout.
///
/// Only textual responses are read, and never more than `max_body_bytes` of
/// them; links to PDFs, images and other binaries fail fast instead.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            timeout,
            max_body_bytes: MAX_BODY_BYTES,
        })
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    fn classify(&self, url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                after: self.timeout,
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                source: e,
            }
        }
    }
}

impl FetchDocument for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let malformed = |reason: String| FetchError::Malformed {
            url: url.to_string(),
            reason,
        };
        let mut response = self.client.get(url).send().await.map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "Non-success status");
            return Err(malformed(format!("HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        if !is_textual(content_type) {
            let content_type = content_type.unwrap_or_default().to_string();
            debug!(%url, %content_type, "Skipping non-text document");
            return Err(malformed(format!("unsupported content type {content_type}")));
        }

        let too_large = || malformed(format!("body exceeds {} bytes", self.max_body_bytes));
        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes as u64)
        {
            return Err(too_large());
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                self.classify(url, e)
            } else {
                malformed(e.to_string())
            }
        })? {
            if bytes.len() + chunk.len() > self.max_body_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }
        let body = String::from_utf8_lossy(&bytes).into_owned();

        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched document"
        );
        Ok(body)
    }
}

/// Whether a `Content-Type` names something worth scanning for paragraphs.
/// A missing header is given the benefit of the doubt.
fn is_textual(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("text/") || essence == "application/xhtml+xml"
}

/// Run `fetcher` against `url`, giving up after `deadline`.
///
/// The outer deadline holds even for fetchers that never time out on their
/// own; expiry is reported as [`FetchError::Timeout`].
pub async fn fetch_with_deadline<F: FetchDocument>(
    fetcher: &F,
    url: &str,
    deadline: Duration,
) -> Result<String, FetchError> {
    match tokio::time::timeout(deadline, fetcher.fetch(url)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
            after: deadline,
        }),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted fetchers shared by the pipeline tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// What a scripted URL does when fetched.
    #[derive(Debug, Clone)]
    pub enum Script {
        Ok { body: String, delay: Duration },
        Fail { delay: Duration },
        Hang,
    }

    impl Script {
        pub fn ok(body: impl Into<String>) -> Self {
            Script::Ok {
                body: body.into(),
                delay: Duration::ZERO,
            }
        }

        pub fn ok_after(body: impl Into<String>, delay: Duration) -> Self {
            Script::Ok {
                body: body.into(),
                delay,
            }
        }

        pub fn fail() -> Self {
            Script::Fail {
                delay: Duration::ZERO,
            }
        }
    }

    /// A fetcher that answers from a URL → [`Script`] table and counts calls.
    /// Unknown URLs fail.
    #[derive(Debug, Default)]
    pub struct ScriptedFetcher {
        scripts: HashMap<String, Script>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, url: &str, script: Script) -> Self {
            self.scripts.insert(url.to_string(), script);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FetchDocument for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let malformed = || FetchError::Malformed {
                url: url.to_string(),
                reason: "scripted failure".to_string(),
            };
            match self.scripts.get(url).cloned() {
                Some(Script::Ok { body, delay }) => {
                    tokio::time::sleep(delay).await;
                    Ok(body)
                }
                Some(Script::Fail { delay }) => {
                    tokio::time::sleep(delay).await;
                    Err(malformed())
                }
                Some(Script::Hang) => {
                    futures::future::pending::<()>().await;
                    unreachable!()
                }
                None => Err(malformed()),
            }
        }
    }
}
