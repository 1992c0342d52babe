//! Fan-out enrichment of listing entries.
//!
//! [`aggregate`] launches one content fetch per entry with a usable link,
//! waits for every one of them to settle, and assembles the [`Batch`] by
//! input index. Completion order never affects the result.

use crate::fetch::{FetchDocument, fetch_with_deadline};
use crate::models::{Batch, Entry};
use crate::scrapers::hackernews::extract_paragraphs;
use futures::stream::{self, StreamExt};
use std::pin::pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Knobs for one aggregation.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Deadline applied to every secondary fetch.
    pub deadline: Duration,
    /// Cap on concurrent fetches. `None` launches every fetch at once.
    pub max_in_flight: Option<usize>,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(10),
            max_in_flight: None,
        }
    }
}

/// Progress shared by the fetches of one aggregation.
struct Settlement {
    settled: AtomicUsize,
    total: usize,
}

impl Settlement {
    /// Record one settled entry. Returns true for exactly one caller: the one
    /// that brings the count to `total`.
    fn settle(&self) -> bool {
        self.settled.fetch_add(1, Ordering::AcqRel) + 1 == self.total
    }
}

/// Enrich `entries` with the paragraphs of the pages they link to.
///
/// Entries without a fetchable link settle immediately with empty content.
/// A failed or timed-out fetch is logged and leaves that entry's content
/// empty; the batch always has as many entries as the input.
#[instrument(level = "info", skip_all, fields(entries = entries.len()))]
pub async fn aggregate<F: FetchDocument>(
    fetcher: &F,
    mut entries: Vec<Entry>,
    options: &AggregateOptions,
) -> Batch {
    if entries.is_empty() {
        debug!("Nothing to aggregate");
        return Batch::default();
    }

    let launched: Vec<(usize, Url)> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| entry.fetchable_url().map(|url| (index, url)))
        .collect();

    let skipped = entries.len() - launched.len();
    let settlement = Settlement {
        settled: AtomicUsize::new(skipped),
        total: entries.len(),
    };
    if skipped > 0 {
        debug!(skipped, "Entries without a fetchable link settled immediately");
    }
    if launched.is_empty() {
        return Batch { entries };
    }

    let limit = options.max_in_flight.unwrap_or(launched.len()).max(1);
    let tasks: Vec<_> = launched
        .into_iter()
        .map(|(index, url)| enrich_one(fetcher, index, url, options.deadline, &settlement))
        .collect();

    // Each fetch settles in the same poll that yields its result, so results
    // arrive in settlement order and the last one closes the batch.
    let mut settled = pin!(stream::iter(tasks).buffer_unordered(limit));
    while let Some(Settled { index, content, last }) = settled.next().await {
        entries[index].content = content;
        if last {
            debug!(index, total = settlement.total, "Last fetch settled");
            break;
        }
    }

    let batch = Batch { entries };
    info!(
        total = batch.len(),
        enriched = batch.enriched_count(),
        "Aggregation complete"
    );
    batch
}

/// One entry's enrichment result.
struct Settled {
    index: usize,
    content: Vec<String>,
    /// Whether this was the final entry of the aggregation to settle.
    last: bool,
}

async fn enrich_one<F: FetchDocument>(
    fetcher: &F,
    index: usize,
    url: Url,
    deadline: Duration,
    settlement: &Settlement,
) -> Settled {
    let content = match fetch_with_deadline(fetcher, url.as_str(), deadline).await {
        Ok(body) => extract_paragraphs(&body),
        Err(e) => {
            warn!(index, %url, error = %e, "Enrichment failed; keeping entry with empty content");
            Vec::new()
        }
    };

    Settled {
        index,
        content,
        last: settlement.settle(),
    }
}
