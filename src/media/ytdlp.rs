//! YT-DLP media source
//!
//! Runs the `yt-dlp` binary directly (no shell) for search, duration probes
//! and audio extraction. Every invocation is bounded by an optional timeout
//! and the child is killed if the call is abandoned.

// lazy_regex! uses once_cell internally
#![allow(clippy::non_std_lazy_statics)]

use super::{seconds_from_f64, MediaError, MediaSource, SearchResult};
use async_trait::async_trait;
use lazy_regex::lazy_regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Media identifiers accepted on the command line
static RE_MEDIA_ID: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"^[A-Za-z0-9_-]{1,64}$");

/// Patterns indicating the media itself can never be fetched
const FATAL_ERROR_PATTERNS: &[&str] = &[
    "Video unavailable",
    "Private video",
    "This video is not available",
    "Sign in to confirm your age",
    "age-restricted",
    "members-only",
    "This video is private",
    "removed by the uploader",
    "no longer available",
    "blocked it in your country",
    "geo-restricted",
    "copyright claim",
    "This video has been removed",
    "Premieres in",
    "This live event will begin",
    "Join this channel to get access",
    "HTTP Error 403",
    "HTTP Error 404",
];

/// Patterns indicating a transient failure (network, throttling)
const TRANSIENT_ERROR_PATTERNS: &[&str] = &[
    "Connection reset",
    "Connection timed out",
    "Unable to download webpage",
    "HTTP Error 429",
    "HTTP Error 503",
    "Read timed out",
    "network is unreachable",
    "Temporary failure in name resolution",
];

fn is_fatal_ytdlp_error(error_msg: &str) -> bool {
    FATAL_ERROR_PATTERNS
        .iter()
        .any(|pattern| error_msg.contains(pattern))
}

fn is_transient_ytdlp_error(error_msg: &str) -> bool {
    TRANSIENT_ERROR_PATTERNS
        .iter()
        .any(|pattern| error_msg.contains(pattern))
}

/// Whether a string is safe to use as a media identifier.
#[must_use]
pub fn is_valid_media_id(media_id: &str) -> bool {
    RE_MEDIA_ID.is_match(media_id)
}

fn watch_url(media_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={media_id}")
}

/// Output template for `-o`; literal `%` in the stem must be doubled.
fn output_template(dest_dir: &Path, file_stem: &str) -> PathBuf {
    dest_dir.join(format!("{}.%(ext)s", file_stem.replace('%', "%%")))
}

/// Parse NDJSON output of `yt-dlp -j --flat-playlist`.
///
/// Malformed lines and entries without an ID are skipped.
#[must_use]
pub fn parse_search_output(output: &str) -> Vec<SearchResult> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<SearchResult>(line) {
            Ok(result) if !result.id.is_empty() => Some(result),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "Skipping malformed yt-dlp search line");
                None
            }
        })
        .collect()
}

/// Parse the output of `yt-dlp --print duration`.
#[must_use]
pub fn parse_duration(output: &str) -> Option<u32> {
    let raw = output.lines().next()?.trim();
    if let Ok(secs) = raw.parse::<u32>() {
        return Some(secs);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(seconds_from_f64)
}

/// [`MediaSource`] backed by the yt-dlp command line tool
#[derive(Debug, Clone)]
pub struct YtdlpSource {
    binary: String,
    timeout: Option<Duration>,
}

impl YtdlpSource {
    /// Create a source that runs `binary` with an optional per-call timeout.
    #[must_use]
    pub fn new(binary: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Log the binary version once at startup.
    pub async fn log_version(&self) {
        let mut cmd = self.command();
        cmd.arg("--version");
        match self.execute(cmd).await {
            Ok(version) => info!(binary = %self.binary, version = %version.trim(), "yt-dlp available"),
            Err(e) => warn!(binary = %self.binary, error = %e, "yt-dlp is not usable"),
        }
    }

    /// Run a prepared command and return its stdout.
    async fn execute(&self, mut cmd: Command) -> Result<String, MediaError> {
        debug!(cmd = ?cmd.as_std(), "Executing yt-dlp command");

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| MediaError::Timeout(limit))??,
            None => cmd.output().await?,
        };

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr
        };

        if is_fatal_ytdlp_error(&message) {
            warn!(error = %message, "Fatal yt-dlp error detected");
        } else if is_transient_ytdlp_error(&message) {
            warn!(error = %message, "Transient yt-dlp error detected");
        } else {
            warn!(status = ?output.status, error = %message, "yt-dlp exited with failure");
        }
        Err(MediaError::Failed(message))
    }

    fn checked_id(media_id: &str) -> Result<&str, MediaError> {
        if is_valid_media_id(media_id) {
            Ok(media_id)
        } else {
            Err(MediaError::InvalidId(media_id.to_string()))
        }
    }
}

#[async_trait]
impl MediaSource for YtdlpSource {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, MediaError> {
        info!(query = %query, limit, "Searching");
        let mut cmd = self.command();
        cmd.args(["-j", "--flat-playlist", "--no-warnings"])
            .arg(format!("ytsearch{limit}:{query}"));

        let output = self.execute(cmd).await?;
        let mut results = parse_search_output(&output);
        results.truncate(limit);
        debug!(count = results.len(), "Search finished");
        Ok(results)
    }

    async fn probe_duration(&self, media_id: &str) -> Result<Option<u32>, MediaError> {
        let media_id = Self::checked_id(media_id)?;
        let mut cmd = self.command();
        cmd.args(["--print", "duration", "--no-warnings", "--no-playlist"])
            .arg(watch_url(media_id));

        let output = self.execute(cmd).await?;
        Ok(parse_duration(&output))
    }

    async fn fetch_audio(
        &self,
        media_id: &str,
        dest_dir: &Path,
        file_stem: &str,
    ) -> Result<PathBuf, MediaError> {
        let media_id = Self::checked_id(media_id)?;
        tokio::fs::create_dir_all(dest_dir).await?;

        let template = output_template(dest_dir, file_stem);
        let expected = dest_dir.join(format!("{file_stem}.mp3"));

        let mut cmd = self.command();
        cmd.args(["-x", "--audio-format", "mp3", "--no-playlist", "--no-warnings"])
            .arg("-o")
            .arg(&template)
            .arg(watch_url(media_id));

        self.execute(cmd).await?;

        if tokio::fs::try_exists(&expected).await? {
            Ok(expected)
        } else {
            Err(MediaError::MissingOutput(expected))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_output_skips_garbage() {
        let output = concat!(
            r#"{"id":"dQw4w9WgXcQ","title":"Never Gonna","duration":213}"#,
            "\n\nnot json at all\n",
            r#"{"id":"","title":"No id"}"#,
            "\n",
            r#"{"id":"abc123","title":"Imagine","duration":183.0}"#,
            "\n"
        );

        let results = parse_search_output(output);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "dQw4w9WgXcQ");
        assert_eq!(results[0].duration_secs, 213);
        assert_eq!(results[1].title, "Imagine");
        assert_eq!(results[1].duration_secs, 183);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("245\n"), Some(245));
        assert_eq!(parse_duration("245.5"), Some(245));
        assert_eq!(parse_duration("NA"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("-3"), None);
    }

    #[test]
    fn test_media_id_validation() {
        assert!(is_valid_media_id("dQw4w9WgXcQ"));
        assert!(is_valid_media_id("a-b_c"));
        assert!(!is_valid_media_id(""));
        assert!(!is_valid_media_id("--exec rm"));
        assert!(!is_valid_media_id("id;ls"));
        assert!(!is_valid_media_id(&"x".repeat(65)));
    }

    #[test]
    fn test_output_template_escapes_percent() {
        let dir = Path::new("/tmp/melody");
        assert_eq!(
            output_template(dir, "100% Pure Love-abc"),
            dir.join("100%% Pure Love-abc.%(ext)s")
        );
        assert_eq!(
            output_template(dir, "%(title)s-abc"),
            dir.join("%%(title)s-abc.%(ext)s")
        );
        assert_eq!(output_template(dir, "Imagine-abc"), dir.join("Imagine-abc.%(ext)s"));
    }

    #[test]
    fn test_error_classification() {
        assert!(is_fatal_ytdlp_error("ERROR: [youtube] x: Private video"));
        assert!(!is_fatal_ytdlp_error("HTTP Error 429: Too Many Requests"));
        assert!(is_transient_ytdlp_error("HTTP Error 429: Too Many Requests"));
    }

    #[tokio::test]
    async fn test_invalid_id_rejected_before_spawn() {
        let source = YtdlpSource::new("definitely-not-a-real-binary", None);
        let err = source
            .probe_duration("bad id")
            .await
            .expect_err("invalid id must fail");
        assert!(matches!(err, MediaError::InvalidId(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let source = YtdlpSource::new("definitely-not-a-real-binary", None);
        let err = source
            .search("imagine", 5)
            .await
            .expect_err("missing binary must fail");
        assert!(matches!(err, MediaError::Io(_)));
    }
}
