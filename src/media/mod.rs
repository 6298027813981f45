//! External media source: search, duration probe and audio fetch.

/// yt-dlp backed media source
pub mod ytdlp;

pub use ytdlp::YtdlpSource;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a media source
#[derive(Error, Debug)]
pub enum MediaError {
    /// Media identifier is not safe to pass to the fetcher
    #[error("invalid media id: {0:?}")]
    InvalidId(String),
    /// The fetcher process could not be started or awaited
    #[error("failed to run fetcher: {0}")]
    Io(#[from] std::io::Error),
    /// The fetcher did not finish in time
    #[error("fetcher timed out after {0:?}")]
    Timeout(Duration),
    /// The fetcher exited with a non-zero status
    /// (captured stderr, or stdout when stderr is empty)
    #[error("fetcher failed: {0}")]
    Failed(String),
    /// The fetcher succeeded but the expected file is missing
    #[error("fetcher produced no output at {}", .0.display())]
    MissingOutput(PathBuf),
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchResult {
    /// Stable media identifier
    pub id: String,
    /// Human-readable title
    #[serde(default)]
    pub title: String,
    /// Duration in seconds, `0` when unknown
    #[serde(
        rename = "duration",
        default,
        deserialize_with = "deserialize_duration"
    )]
    pub duration_secs: u32,
}

// yt-dlp reports durations as integers, floats or null depending on the extractor.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.map_or(0, seconds_from_f64))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn seconds_from_f64(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Interface to the external media tool.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Search for tracks, returning at most `limit` results in source order.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, MediaError>;

    /// Probe the duration of a track; `Ok(None)` when the source cannot tell.
    async fn probe_duration(&self, media_id: &str) -> Result<Option<u32>, MediaError>;

    /// Fetch and transcode a track into `dest_dir/{file_stem}.mp3`, returning its path.
    async fn fetch_audio(
        &self,
        media_id: &str,
        dest_dir: &Path,
        file_stem: &str,
    ) -> Result<PathBuf, MediaError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_result_duration_shapes() {
        let int: SearchResult =
            serde_json::from_str(r#"{"id":"a","title":"A","duration":215}"#).expect("int");
        assert_eq!(int.duration_secs, 215);

        let float: SearchResult =
            serde_json::from_str(r#"{"id":"b","title":"B","duration":215.9}"#).expect("float");
        assert_eq!(float.duration_secs, 215);

        let null: SearchResult =
            serde_json::from_str(r#"{"id":"c","title":"C","duration":null}"#).expect("null");
        assert_eq!(null.duration_secs, 0);

        let missing: SearchResult =
            serde_json::from_str(r#"{"id":"d","title":"D"}"#).expect("missing");
        assert_eq!(missing.duration_secs, 0);
    }
}
