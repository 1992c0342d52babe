//! CSV output for one-shot harvests.
//!
//! One row per story with a header row. Paragraphs are flattened into a
//! single `Content` column joined by `" | "`:
//! ```text
//! csv_output_dir/
//! └── hackernews_articles.csv
//! ```

use crate::models::{Batch, Entry};
use crate::utils::ensure_writable_dir;
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

pub const OUTPUT_FILENAME: &str = "hackernews_articles.csv";

/// Separator placed between paragraphs in the `Content` column.
pub const CONTENT_SEPARATOR: &str = " | ";

#[derive(Serialize)]
struct Row<'a> {
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Points")]
    points: &'a str,
    #[serde(rename = "Author")]
    author: &'a str,
    #[serde(rename = "Website")]
    website: &'a str,
    #[serde(rename = "URL")]
    url: &'a str,
    #[serde(rename = "Content")]
    content: String,
}

impl<'a> From<&'a Entry> for Row<'a> {
    fn from(entry: &'a Entry) -> Self {
        Row {
            title: &entry.title,
            points: &entry.points,
            author: &entry.author,
            website: &entry.website,
            url: entry.url.as_deref().unwrap_or(""),
            content: entry.content.join(CONTENT_SEPARATOR),
        }
    }
}

/// Render `batch` as CSV bytes, header row first.
fn render(batch: &Batch) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for entry in &batch.entries {
        writer.serialize(Row::from(entry))?;
    }
    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

/// Write `batch` to `{csv_output_dir}/hackernews_articles.csv`.
///
/// Creates the directory if needed and returns the path written.
#[instrument(level = "info", skip_all, fields(csv_output_dir = %csv_output_dir))]
pub async fn write_batch(batch: &Batch, csv_output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    ensure_writable_dir(csv_output_dir).await?;

    let bytes = render(batch)?;
    let path = PathBuf::from(csv_output_dir).join(OUTPUT_FILENAME);

    fs::write(&path, bytes).await?;
    info!(path = %path.display(), stories = batch.len(), "CSV file has been saved");
    Ok(path)
}
