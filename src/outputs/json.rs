//! JSON output for one-shot harvests.
//!
//! The batch is written as a pretty-printed array of entries:
//! ```text
//! json_output_dir/
//! └── hackernews_articles.json
//! ```

use crate::models::Batch;
use crate::utils::ensure_writable_dir;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

pub const OUTPUT_FILENAME: &str = "hackernews_articles.json";

/// Write `batch` to `{json_output_dir}/hackernews_articles.json`.
///
/// Creates the directory if needed and returns the path written.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_batch(batch: &Batch, json_output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    ensure_writable_dir(json_output_dir).await?;

    let json = serde_json::to_string_pretty(batch)?;
    let path = PathBuf::from(json_output_dir).join(OUTPUT_FILENAME);

    fs::write(&path, json).await?;
    info!(path = %path.display(), stories = batch.len(), "JSON file has been saved");
    Ok(path)
}
