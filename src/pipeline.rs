//! One harvest: fetch the listing, extract entries, enrich them.
//!
//! Shared by the scheduler, the per-subscriber handshake, and the one-shot
//! `scrape` command. Each call owns the batch it returns.

use crate::aggregate::{AggregateOptions, aggregate};
use crate::error::PipelineError;
use crate::fetch::{FetchDocument, fetch_with_deadline};
use crate::models::Batch;
use crate::scrapers::hackernews::extract_entries;
use tracing::{info, instrument};
use url::Url;

/// Where to harvest from and how to enrich.
#[derive(Debug, Clone)]
pub struct Harvest {
    pub listing_url: Url,
    pub options: AggregateOptions,
}

impl Harvest {
    /// Fetch the listing page and aggregate its entries into a batch.
    ///
    /// Only a failed listing fetch is an error. An empty listing produces an
    /// empty batch.
    #[instrument(level = "info", skip_all, fields(listing = %self.listing_url))]
    pub async fn run<F: FetchDocument>(&self, fetcher: &F) -> Result<Batch, PipelineError> {
        let html =
            fetch_with_deadline(fetcher, self.listing_url.as_str(), self.options.deadline).await?;

        let entries = extract_entries(&html, &self.listing_url);
        info!(count = entries.len(), "Found stories to process");

        Ok(aggregate(fetcher, entries, &self.options).await)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::time::Duration;

    pub const LISTING: &str = "https://news.ycombinator.com/newest";

    pub fn harvest() -> Harvest {
        Harvest {
            listing_url: Url::parse(LISTING).unwrap(),
            options: AggregateOptions {
                deadline: Duration::from_secs(5),
                max_in_flight: None,
            },
        }
    }

    /// A listing page with one row per `(title, href)`.
    pub fn listing_html(stories: &[(&str, &str)]) -> String {
        let rows: String = stories
            .iter()
            .map(|(title, href)| {
                format!(
                    r#"<tr class="athing"><td class="title"><span class="titleline"><a href="{href}">{title}</a></span></td></tr>
                       <tr><td class="subtext"><span class="score">1 point</span> by <a class="hnuser">u</a></td></tr>"#
                )
            })
            .collect();
        format!("<html><body><table>{rows}</table></body></html>")
    }
}
