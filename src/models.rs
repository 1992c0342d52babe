//! Data models for harvested stories and the events pushed to subscribers.
//!
//! - [`Entry`]: one story row from the listing page, later enriched with the
//!   paragraph text of the page it links to
//! - [`Batch`]: the ordered entries produced by one cycle or one handshake
//! - [`ServerEvent`]: what a subscriber receives over its socket

use serde::{Deserialize, Serialize};

/// A single story extracted from the listing page.
///
/// Fields that the listing does not carry for a row take the same defaults
/// the stories table uses, so an `Entry` can be persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Entry {
    /// The story headline.
    pub title: String,
    /// Score text as displayed, e.g. `"42 points"`. `"0"` when absent.
    pub points: String,
    /// Submitter handle. `"unknown"` when absent.
    pub author: String,
    /// The referring domain shown next to the title. Empty when absent.
    pub website: String,
    /// Outbound link, resolved against the listing URL when relative.
    pub url: Option<String>,
    /// Non-empty paragraphs from the linked page, in document order.
    pub content: Vec<String>,
}

impl Entry {
    /// Build an un-enriched entry, applying the listing defaults.
    pub fn new(
        title: impl Into<String>,
        points: Option<String>,
        author: Option<String>,
        website: Option<String>,
        url: Option<String>,
    ) -> Self {
        Self {
            title: title.into(),
            points: points.filter(|p| !p.is_empty()).unwrap_or_else(|| "0".to_string()),
            author: author
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
            website: website.unwrap_or_default(),
            url,
            content: Vec::new(),
        }
    }

    /// The outbound link if it is an absolute `http`/`https` URL.
    pub fn fetchable_url(&self) -> Option<url::Url> {
        let parsed = url::Url::parse(self.url.as_deref()?).ok()?;
        matches!(parsed.scheme(), "http" | "https").then_some(parsed)
    }
}

/// The complete, ordered set of entries from one cycle or handshake.
///
/// Order is listing order. The batch never shrinks when enrichment fails;
/// those entries just keep empty `content`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Batch {
    pub entries: Vec<Entry>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries whose enrichment produced at least one paragraph.
    pub fn enriched_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.content.is_empty()).count()
    }
}

/// Events delivered to subscribers, serialized as
/// `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Stories stored within the recent-activity window.
    InitialCount { count: i64 },
    /// A freshly aggregated batch.
    NewStories { stories: Batch },
    /// Something went wrong serving this subscriber.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_defaults() {
        let entry = Entry::new("Show HN: a thing", None, None, None, None);
        assert_eq!(entry.points, "0");
        assert_eq!(entry.author, "unknown");
        assert_eq!(entry.website, "");
        assert!(entry.url.is_none());
        assert!(entry.content.is_empty());
    }

    #[test]
    fn test_entry_empty_strings_take_defaults() {
        let entry = Entry::new("t", Some(String::new()), Some(String::new()), None, None);
        assert_eq!(entry.points, "0");
        assert_eq!(entry.author, "unknown");
    }

    #[test]
    fn test_fetchable_url() {
        let mut entry = Entry::new("t", None, None, None, Some("https://example.com/a".into()));
        assert_eq!(
            entry.fetchable_url().map(|u| u.to_string()),
            Some("https://example.com/a".to_string())
        );

        entry.url = Some("item?id=1".into());
        assert!(entry.fetchable_url().is_none());

        entry.url = Some("mailto:someone@example.com".into());
        assert!(entry.fetchable_url().is_none());

        entry.url = None;
        assert!(entry.fetchable_url().is_none());
    }

    #[test]
    fn test_server_event_wire_format() {
        let json = serde_json::to_value(ServerEvent::InitialCount { count: 7 }).unwrap();
        assert_eq!(json, serde_json::json!({"event": "initial_count", "data": {"count": 7}}));

        let json = serde_json::to_value(ServerEvent::Error {
            message: "boom".into(),
        })
        .unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["data"]["message"], "boom");
    }

    #[test]
    fn test_new_stories_carries_entry_array() {
        let mut entry =
            Entry::new("X", Some("5 points".into()), None, None, Some("http://a".into()));
        entry.content = vec!["p1".into()];
        let event = ServerEvent::NewStories {
            stories: Batch {
                entries: vec![entry],
            },
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "new_stories");
        assert_eq!(json["data"]["stories"][0]["title"], "X");
        assert_eq!(json["data"]["stories"][0]["content"][0], "p1");
    }

    #[test]
    fn test_enriched_count() {
        let mut a = Entry::new("a", None, None, None, None);
        a.content = vec!["x".into()];
        let b = Entry::new("b", None, None, None, None);
        let batch = Batch {
            entries: vec![a, b],
        };
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.enriched_count(), 1);
    }
}
