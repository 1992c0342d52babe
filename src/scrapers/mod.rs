//! Listing and article scrapers.
//!
//! Extraction is split from retrieval: functions here take a document that
//! has already been fetched and return typed records, with no I/O. Fetching
//! lives in [`crate::fetch`].
//!
//! # Supported Sources
//!
//! | Source | Module | Layout |
//! |--------|--------|--------|
//! | Hacker News `/newest` | [`hackernews`] | Row-grouped title/subtext table |

pub mod hackernews;
