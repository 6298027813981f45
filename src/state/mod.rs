//! Process-wide shared state.
//!
//! Sessions, the result index, the audio cache and the in-flight download
//! set all live behind one lock. Callers only get atomic operations; the
//! lock is never held across an await on anything external.

/// Media ID to delivery reference cache
pub mod cache;
/// Search result index
pub mod index;
/// Per-chat sessions and bans
pub mod session;

pub use cache::{AudioCache, CacheEntry};
pub use index::{IndexedTrack, ResultIndex};
pub use session::{Language, Mode, Session, SessionSnapshot, SessionStore};

use crate::download::DownloadOutcome;
use crate::media::SearchResult;
use std::collections::HashMap;
use tokio::sync::{watch, Mutex};
use tracing::debug;

/// Receiving side of an in-flight download; resolves to `Some(outcome)` once done.
pub type OutcomeReceiver = watch::Receiver<Option<DownloadOutcome>>;
/// Publishing side of an in-flight download.
pub type OutcomeSender = watch::Sender<Option<DownloadOutcome>>;

/// Result of the atomic cache-lookup-and-mark step.
#[derive(Debug)]
pub enum Claim {
    /// Track is cached; the delivery reference is ready
    Cached(String),
    /// Another caller is already downloading this ID
    Joined(OutcomeReceiver),
    /// The caller now owns the download and must publish its outcome
    Started(OutcomeSender),
}

/// Counters shown in the admin panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Known chats
    pub users: usize,
    /// Banned IDs
    pub banned: usize,
    /// Cached tracks
    pub cached_tracks: usize,
}

#[derive(Default)]
struct Inner {
    sessions: SessionStore,
    results: ResultIndex,
    audio: AudioCache,
    in_flight: HashMap<String, OutcomeReceiver>,
}

/// Owner of all shared mutable state.
#[derive(Default)]
pub struct BotState {
    inner: Mutex<Inner>,
}

impl BotState {
    /// Create empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a chat (creating its session on first contact) and return its state.
    pub async fn observe(&self, chat_id: i64) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        inner.sessions.touch(chat_id);
        inner.sessions.snapshot(chat_id)
    }

    /// State of a chat without registering it.
    pub async fn snapshot(&self, chat_id: i64) -> SessionSnapshot {
        self.inner.lock().await.sessions.snapshot(chat_id)
    }

    /// Whether a chat is banned.
    pub async fn is_banned(&self, chat_id: i64) -> bool {
        self.inner.lock().await.sessions.is_banned(chat_id)
    }

    /// Set the chat language.
    pub async fn set_language(&self, chat_id: i64, language: Language) {
        self.inner.lock().await.sessions.touch(chat_id).language = Some(language);
    }

    /// Arm an admin input mode for the chat.
    pub async fn arm_mode(&self, chat_id: i64, mode: Mode) {
        self.inner.lock().await.sessions.touch(chat_id).arm(mode);
    }

    /// Take the armed mode, resetting it to idle.
    pub async fn consume_mode(&self, chat_id: i64) -> Mode {
        self.inner.lock().await.sessions.touch(chat_id).consume_text()
    }

    /// Ban an ID. Returns `false` if it was already banned.
    pub async fn ban(&self, chat_id: i64) -> bool {
        self.inner.lock().await.sessions.ban(chat_id)
    }

    /// Unban an ID. Returns `false` if it was not banned.
    pub async fn unban(&self, chat_id: i64) -> bool {
        self.inner.lock().await.sessions.unban(chat_id)
    }

    /// Known chats, minus an optional excluded one.
    pub async fn known_chats_except(&self, excluded: Option<i64>) -> Vec<i64> {
        let inner = self.inner.lock().await;
        let mut chats: Vec<i64> = inner
            .sessions
            .known_chats()
            .into_iter()
            .filter(|id| Some(*id) != excluded)
            .collect();
        chats.sort_unstable();
        chats
    }

    /// Admin panel counters.
    pub async fn stats(&self) -> Stats {
        let inner = self.inner.lock().await;
        Stats {
            users: inner.sessions.user_count(),
            banned: inner.sessions.banned_count(),
            cached_tracks: inner.audio.len(),
        }
    }

    /// Index a batch of search results.
    pub async fn record_search(&self, results: &[SearchResult]) {
        self.inner.lock().await.results.record_search(results);
    }

    /// Remember a probed duration for an indexed track.
    pub async fn record_duration(&self, media_id: &str, duration_secs: u32) {
        self.inner
            .lock()
            .await
            .results
            .record_duration(media_id, duration_secs);
    }

    /// Look up an indexed track.
    pub async fn lookup_track(&self, media_id: &str) -> Option<IndexedTrack> {
        self.inner.lock().await.results.lookup(media_id).cloned()
    }

    /// Best known title for a media ID: the search index first, then the cache.
    pub async fn track_title(&self, media_id: &str) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .results
            .lookup(media_id)
            .map(|track| track.title.clone())
            .or_else(|| inner.audio.get(media_id).map(|entry| entry.title.clone()))
    }

    /// Cached delivery reference for a media ID.
    pub async fn cached_reference(&self, media_id: &str) -> Option<String> {
        self.inner
            .lock()
            .await
            .audio
            .get(media_id)
            .map(|entry| entry.reference.clone())
    }

    /// Drop every cached track. In-flight downloads and the index are untouched.
    pub async fn clear_cache(&self) -> usize {
        self.inner.lock().await.audio.clear()
    }

    /// Atomically check the cache and the in-flight set, marking the ID
    /// in-flight when neither has it.
    pub async fn claim_download(&self, media_id: &str) -> Claim {
        let mut inner = self.inner.lock().await;
        if let Some(entry) = inner.audio.get(media_id) {
            return Claim::Cached(entry.reference.clone());
        }
        if let Some(rx) = inner.in_flight.get(media_id) {
            debug!(media_id, "Joining in-flight download");
            return Claim::Joined(rx.clone());
        }
        let (tx, rx) = watch::channel(None);
        inner.in_flight.insert(media_id.to_string(), rx);
        Claim::Started(tx)
    }

    /// Record the outcome of an owned download: cache it when allowed and
    /// release the in-flight mark.
    pub async fn finish_download(
        &self,
        media_id: &str,
        title: &str,
        outcome: &DownloadOutcome,
        cacheable: bool,
    ) {
        let mut inner = self.inner.lock().await;
        if let (Ok(reference), true) = (outcome, cacheable) {
            inner.audio.insert(
                media_id,
                CacheEntry {
                    reference: reference.file_id.clone(),
                    title: title.to_string(),
                },
            );
        }
        inner.in_flight.remove(media_id);
    }

    /// Whether a download for the ID is in progress.
    pub async fn is_in_flight(&self, media_id: &str) -> bool {
        self.inner.lock().await.in_flight.contains_key(media_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::AudioReference;
    use crate::error::DownloadError;

    fn reference(file_id: &str) -> AudioReference {
        AudioReference {
            file_id: file_id.to_string(),
            delivered_to: None,
        }
    }

    #[tokio::test]
    async fn test_claim_marks_in_flight_once() {
        let state = BotState::new();

        let first = state.claim_download("abc").await;
        assert!(matches!(first, Claim::Started(_)));
        assert!(state.is_in_flight("abc").await);

        let second = state.claim_download("abc").await;
        assert!(matches!(second, Claim::Joined(_)));
    }

    #[tokio::test]
    async fn test_finish_caches_success_and_releases() {
        let state = BotState::new();
        let Claim::Started(_tx) = state.claim_download("abc").await else {
            panic!("expected to own the download");
        };

        state
            .finish_download("abc", "Song", &Ok(reference("file-1")), true)
            .await;

        assert!(!state.is_in_flight("abc").await);
        assert_eq!(state.cached_reference("abc").await.as_deref(), Some("file-1"));
        assert!(matches!(
            state.claim_download("abc").await,
            Claim::Cached(r) if r == "file-1"
        ));
    }

    #[tokio::test]
    async fn test_finish_failure_leaves_no_trace() {
        let state = BotState::new();
        let _claim = state.claim_download("abc").await;

        state
            .finish_download(
                "abc",
                "Song",
                &Err(DownloadError::FetchFailed("boom".into())),
                true,
            )
            .await;

        assert!(!state.is_in_flight("abc").await);
        assert!(state.cached_reference("abc").await.is_none());
        assert!(matches!(state.claim_download("abc").await, Claim::Started(_)));
    }

    #[tokio::test]
    async fn test_uncacheable_success_is_not_cached() {
        let state = BotState::new();
        let _claim = state.claim_download("abc").await;

        state
            .finish_download("abc", "Song", &Ok(reference("file-1")), false)
            .await;

        assert!(state.cached_reference("abc").await.is_none());
        assert_eq!(state.stats().await.cached_tracks, 0);
    }

    #[tokio::test]
    async fn test_clear_cache_keeps_in_flight() {
        let state = BotState::new();
        let _a = state.claim_download("a").await;
        state
            .finish_download("a", "A", &Ok(reference("ref-a")), true)
            .await;
        let _b = state.claim_download("b").await;

        assert_eq!(state.clear_cache().await, 1);
        assert!(state.is_in_flight("b").await);

        state
            .finish_download("b", "B", &Ok(reference("ref-b")), true)
            .await;
        assert_eq!(state.cached_reference("b").await.as_deref(), Some("ref-b"));
        assert!(state.cached_reference("a").await.is_none());
    }

    #[tokio::test]
    async fn test_stats_and_broadcast_targets() {
        let state = BotState::new();
        state.observe(1).await;
        state.observe(2).await;
        state.observe(3).await;
        state.ban(500).await;

        assert_eq!(
            state.stats().await,
            Stats {
                users: 3,
                banned: 1,
                cached_tracks: 0
            }
        );
        assert_eq!(state.known_chats_except(Some(2)).await, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_track_title_falls_back_to_cache() {
        let state = BotState::new();
        assert_eq!(state.track_title("abc").await, None);

        let _claim = state.claim_download("abc").await;
        state
            .finish_download("abc", "From cache", &Ok(reference("ref")), true)
            .await;
        assert_eq!(state.track_title("abc").await.as_deref(), Some("From cache"));

        state
            .record_search(&[crate::media::SearchResult {
                id: "abc".into(),
                title: "From search".into(),
                duration_secs: 100,
            }])
            .await;
        assert_eq!(state.track_title("abc").await.as_deref(), Some("From search"));
    }

    #[tokio::test]
    async fn test_consume_mode_resets() {
        let state = BotState::new();
        state.arm_mode(9, Mode::AwaitingBroadcast).await;

        assert_eq!(state.snapshot(9).await.mode, Mode::AwaitingBroadcast);
        assert_eq!(state.consume_mode(9).await, Mode::AwaitingBroadcast);
        assert_eq!(state.consume_mode(9).await, Mode::Idle);
    }
}
