//! Download coordinator
//!
//! Turns a media ID into a reusable delivery reference. Guarantees that at
//! most one fetch per media ID runs at a time: the first caller claims the
//! ID (atomically with the cache lookup) and the work runs on a detached
//! task; every caller, including the first, waits for that task's outcome.
//! Concurrent callers therefore all see the same reference or the same
//! failure.

/// Transient artifact naming and cleanup
pub mod artifact;

pub use artifact::{artifact_stem, sanitize_file_name, TempArtifact};

use crate::bot::i18n::audio_caption;
use crate::config::MAX_TRACK_DURATION_SECS;
use crate::error::DownloadError;
use crate::gateway::{AudioSource, MessagingGateway};
use crate::media::MediaSource;
use crate::state::{BotState, Claim, OutcomeReceiver, OutcomeSender};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Delivery reference produced by a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioReference {
    /// Reusable delivery reference (Telegram `file_id`)
    pub file_id: String,
    /// Chat that already received the audio during upload, if any.
    ///
    /// Set only when no storage channel is configured and the artifact was
    /// uploaded straight to the requesting chat.
    pub delivered_to: Option<i64>,
}

impl AudioReference {
    /// Whether the audio still has to be sent to `chat_id`.
    #[must_use]
    pub fn needs_delivery_to(&self, chat_id: i64) -> bool {
        self.delivered_to != Some(chat_id)
    }
}

/// Outcome shared by every caller of one download.
pub type DownloadOutcome = Result<AudioReference, DownloadError>;

/// Deduplicating fetch-and-upload engine
#[derive(Clone)]
pub struct DownloadCoordinator {
    state: Arc<BotState>,
    source: Arc<dyn MediaSource>,
    gateway: Arc<dyn MessagingGateway>,
    download_dir: PathBuf,
    storage_channel: Option<i64>,
    max_duration_secs: u32,
}

impl DownloadCoordinator {
    /// Create a coordinator without a storage channel.
    #[must_use]
    pub fn new(
        state: Arc<BotState>,
        source: Arc<dyn MediaSource>,
        gateway: Arc<dyn MessagingGateway>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            state,
            source,
            gateway,
            download_dir: download_dir.into(),
            storage_channel: None,
            max_duration_secs: MAX_TRACK_DURATION_SECS,
        }
    }

    /// Set the channel that uploads go to; without it nothing is cached.
    #[must_use]
    pub const fn with_storage_channel(mut self, channel: Option<i64>) -> Self {
        self.storage_channel = channel;
        self
    }

    /// Whether successful downloads are cached.
    #[must_use]
    pub const fn caches_downloads(&self) -> bool {
        self.storage_channel.is_some()
    }

    /// Duration limit in seconds.
    #[must_use]
    pub const fn max_duration_secs(&self) -> u32 {
        self.max_duration_secs
    }

    /// Resolve a media ID to a delivery reference, fetching it at most once.
    ///
    /// `requester` is the chat the audio is meant for; it is used as upload
    /// target when no storage channel is configured. Background callers
    /// pass `None`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] when the track is too long, the fetch fails,
    /// or the upload fails. Joined callers receive the owner's error.
    pub async fn request_audio(
        &self,
        media_id: &str,
        title: &str,
        requester: Option<i64>,
    ) -> DownloadOutcome {
        // A background request with nowhere to upload must not occupy the
        // in-flight slot a foreground request could use.
        if requester.is_none() && !self.caches_downloads() {
            return Err(DownloadError::DeliveryFailed(
                "no storage channel configured".to_string(),
            ));
        }

        let mut rx = match self.state.claim_download(media_id).await {
            Claim::Cached(file_id) => {
                debug!(media_id, "Audio cache hit");
                return Ok(AudioReference {
                    file_id,
                    delivered_to: None,
                });
            }
            Claim::Joined(rx) => rx,
            Claim::Started(tx) => {
                let rx = tx.subscribe();
                self.spawn_worker(tx, media_id.to_string(), title.to_string(), requester);
                rx
            }
        };
        wait_for_outcome(&mut rx).await
    }

    /// Run the fetch on its own task so an abandoned caller can never leave
    /// the ID marked in-flight.
    fn spawn_worker(
        &self,
        tx: OutcomeSender,
        media_id: String,
        title: String,
        requester: Option<i64>,
    ) {
        let this = self.clone();
        tokio::spawn(async move {
            let work = {
                let this = this.clone();
                let media_id = media_id.clone();
                let title = title.clone();
                tokio::spawn(async move { this.fetch_and_upload(&media_id, &title, requester).await })
            };

            let outcome = match work.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(media_id = %media_id, error = %e, "Download task crashed");
                    Err(DownloadError::FetchFailed(format!("download task failed: {e}")))
                }
            };

            this.state
                .finish_download(&media_id, &title, &outcome, this.caches_downloads())
                .await;
            tx.send_replace(Some(outcome));
        });
    }

    async fn fetch_and_upload(
        &self,
        media_id: &str,
        title: &str,
        requester: Option<i64>,
    ) -> DownloadOutcome {
        let Some(target) = self.storage_channel.or(requester) else {
            return Err(DownloadError::DeliveryFailed(
                "no storage channel configured".to_string(),
            ));
        };

        match self.source.probe_duration(media_id).await {
            Ok(Some(seconds)) => {
                self.state.record_duration(media_id, seconds).await;
                if seconds > self.max_duration_secs {
                    info!(media_id, seconds, "Track exceeds duration limit, not fetching");
                    return Err(DownloadError::DurationExceeded { seconds });
                }
            }
            Ok(None) => debug!(media_id, "Duration unavailable, fetching anyway"),
            Err(e) => warn!(media_id, error = %e, "Duration probe failed, fetching anyway"),
        }

        let stem = artifact_stem(title, media_id);
        info!(media_id, title, "Fetching audio");
        let path = match self
            .source
            .fetch_audio(media_id, &self.download_dir, &stem)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                warn!(media_id, error = %e, "Audio fetch failed");
                artifact::remove_leftovers(&self.download_dir, &stem).await;
                return Err(DownloadError::FetchFailed(e.to_string()));
            }
        };
        let artifact = TempArtifact::new(path);

        let caption = audio_caption(title);
        let file_id = self
            .gateway
            .send_audio(
                target,
                AudioSource::Local(artifact.path().to_path_buf()),
                &caption,
                title,
            )
            .await
            .map_err(|e| {
                warn!(media_id, target, error = %e, "Audio upload failed");
                DownloadError::DeliveryFailed(e.to_string())
            })?;

        info!(media_id, target, "Audio uploaded");
        Ok(AudioReference {
            file_id,
            delivered_to: self.storage_channel.is_none().then_some(target),
        })
    }
}

async fn wait_for_outcome(rx: &mut OutcomeReceiver) -> DownloadOutcome {
    match rx.wait_for(Option::is_some).await {
        Ok(published) => published.clone().unwrap_or_else(|| {
            Err(DownloadError::FetchFailed(
                "download finished without an outcome".to_string(),
            ))
        }),
        Err(_) => Err(DownloadError::FetchFailed(
            "download worker stopped unexpectedly".to_string(),
        )),
    }
}
