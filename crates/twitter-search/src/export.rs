//! Harvest files: one-off search dumps and their reduced form.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::twitter::{format_timestamp, Tweet};

/// Text and engagement of one tweet, without identifiers or timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetSummary {
    /// Full text.
    pub text: String,
    /// Retweet count.
    pub retweets: u64,
    /// Like count.
    pub likes: u64,
}

/// File name for a harvest taken at `at`, e.g. `tweets_2025-01-17T06-21-18.624Z.json`.
#[must_use]
pub fn harvest_file_name(at: DateTime<Utc>) -> String {
    format!("tweets_{}.json", format_timestamp(&at).replace(':', "-"))
}

/// Write tweets as pretty JSON into a timestamped file under `dir`.
pub fn write_harvest(dir: &Path, tweets: &[Tweet]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let path = dir.join(harvest_file_name(Utc::now()));
    let content = serde_json::to_string_pretty(tweets)?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write harvest file {}", path.display()))?;

    tracing::info!(path = %path.display(), count = tweets.len(), "Wrote harvest file");
    Ok(path)
}

/// Reduce a harvest file to summaries and write them to `output`.
///
/// Failures are logged and produce an empty list.
pub fn process_harvest(input: &Path, output: &Path) -> Vec<TweetSummary> {
    match try_process_harvest(input, output) {
        Ok(summaries) => {
            tracing::info!(
                input = %input.display(),
                output = %output.display(),
                count = summaries.len(),
                "Processed harvest file"
            );
            summaries
        }
        Err(e) => {
            tracing::error!(input = %input.display(), error = %e, "Error processing tweets");
            Vec::new()
        }
    }
}

/// One harvest record as read back from disk. Only the summarized fields
/// are read; missing or null values fall back to empty text and zero counts.
#[derive(Debug, Deserialize)]
struct HarvestRecord {
    text: Option<String>,
    retweets: Option<u64>,
    likes: Option<u64>,
}

impl From<HarvestRecord> for TweetSummary {
    fn from(record: HarvestRecord) -> Self {
        Self {
            text: record.text.unwrap_or_default(),
            retweets: record.retweets.unwrap_or_default(),
            likes: record.likes.unwrap_or_default(),
        }
    }
}

fn try_process_harvest(input: &Path, output: &Path) -> Result<Vec<TweetSummary>> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let records: Vec<HarvestRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", input.display()))?;

    let summaries: Vec<TweetSummary> = records.into_iter().map(TweetSummary::from).collect();
    std::fs::write(output, serde_json::to_string_pretty(&summaries)?)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(summaries)
}
