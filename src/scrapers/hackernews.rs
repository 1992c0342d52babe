//! Hacker News listing and article extraction.
//!
//! The `/newest` page lays each story out as two table rows: a title row
//! (`td.title`) holding the headline link and the referring site, followed by
//! a subtext row (`td.subtext`) holding score and submitter. Selecting each
//! field across the whole document gives four index-aligned lists; the i-th
//! element of each belongs to the i-th story.
//!
//! Job postings have no score and no submitter, so those lists can run short.
//! A missing element falls back to the [`Entry`] default for that field.

use crate::models::Entry;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

/// Default listing source.
pub const LISTING_URL: &str = "https://news.ycombinator.com/newest";

static TITLE_LINKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td.title span.titleline > a").expect("static selector"));
static SCORES: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td.subtext span.score").expect("static selector"));
static AUTHORS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td.subtext a.hnuser").expect("static selector"));
static SITES: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td.title span.sitestr").expect("static selector"));
static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("static selector"));

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn texts(document: &Html, selector: &Selector) -> Vec<String> {
    document.select(selector).map(|e| element_text(&e)).collect()
}

/// Extract un-enriched entries from a listing document.
///
/// Relative links (e.g. `item?id=123` for Ask HN posts) are resolved against
/// `base`. A page with no title links yields an empty vector.
#[instrument(level = "debug", skip_all, fields(base = %base))]
pub fn extract_entries(html: &str, base: &Url) -> Vec<Entry> {
    let document = Html::parse_document(html);

    let titles: Vec<ElementRef<'_>> = document.select(&TITLE_LINKS).collect();
    let mut points = texts(&document, &SCORES).into_iter();
    let mut authors = texts(&document, &AUTHORS).into_iter();
    let mut sites = texts(&document, &SITES).into_iter();

    let entries: Vec<Entry> = titles
        .iter()
        .map(|link| {
            let url = link.value().attr("href").map(|href| {
                base.join(href)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| href.to_string())
            });
            Entry::new(
                element_text(link),
                points.next(),
                authors.next(),
                sites.next(),
                url,
            )
        })
        .collect();

    debug!(count = entries.len(), "Extracted listing entries");
    entries
}

/// Extract every non-empty paragraph from a document, in document order.
pub fn extract_paragraphs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&PARAGRAPHS)
        .map(|p| element_text(&p))
        .filter(|text| !text.is_empty())
        .collect()
}
