//! Error taxonomy shared by the download engine and the bot layer.

use thiserror::Error;

/// Failure of a single `request_audio` call.
///
/// Cloneable because one outcome is shared with every caller waiting on
/// the same media identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DownloadError {
    /// Probed duration is above the configured limit; nothing was fetched
    #[error("track is too long ({seconds}s)")]
    DurationExceeded {
        /// Probed duration in seconds
        seconds: u32,
    },
    /// External fetch failed, timed out, or produced no artifact
    #[error("fetch failed: {0}")]
    FetchFailed(String),
    /// Upload of the fetched artifact failed
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Errors surfaced while handling a single inbound event.
#[derive(Error, Debug)]
pub enum BotError {
    /// The chat is banned
    #[error("chat {0} is banned")]
    Authorization(i64),
    /// Admin input that should have been a numeric chat ID
    #[error("invalid chat id: {0:?}")]
    InputFormat(String),
    /// Selection refers to an identifier the bot no longer knows
    #[error("unknown media id: {0}")]
    NotFound(String),
    /// Attempt to ban the administrator
    #[error("the administrator cannot be banned")]
    AdminSelfBan,
    /// Download pipeline failure
    #[error(transparent)]
    Download(#[from] DownloadError),
    /// Messaging transport failure
    #[error("gateway error: {0}")]
    Gateway(#[from] anyhow::Error),
}
