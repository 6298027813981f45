//! Testing helpers: scripted media source and recording gateway fakes.
//!
//! The mockall mocks are handy for "must never be called" checks; these
//! fakes cover the concurrency scenarios where calls need real side effects
//! (files on disk, delays, counters).

use crate::gateway::{AudioSource, InlineAnswer, Keyboard, MessagingGateway};
use crate::media::{MediaError, MediaSource, SearchResult};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Build a search result.
#[must_use]
pub fn track(id: &str, title: &str, duration_secs: u32) -> SearchResult {
    SearchResult {
        id: id.to_string(),
        title: title.to_string(),
        duration_secs,
    }
}

/// Fresh temporary directory path (not created).
#[must_use]
pub fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("melody-test-{}", uuid::Uuid::new_v4()))
}

/// Media source with scripted answers and call counters.
#[derive(Default)]
pub struct ScriptedSource {
    results: Vec<SearchResult>,
    duration: Option<u32>,
    fetch_fails: bool,
    fetch_delay: Duration,
    /// Number of `search` calls
    pub search_calls: AtomicUsize,
    /// Number of `probe_duration` calls
    pub probe_calls: AtomicUsize,
    /// Number of `fetch_audio` calls
    pub fetch_calls: AtomicUsize,
}

impl ScriptedSource {
    /// Source that finds nothing, reports no duration and fetches instantly.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Results returned by every search.
    #[must_use]
    pub fn with_results(mut self, results: Vec<SearchResult>) -> Self {
        self.results = results;
        self
    }

    /// Duration reported by every probe.
    #[must_use]
    pub const fn with_duration(mut self, secs: u32) -> Self {
        self.duration = Some(secs);
        self
    }

    /// Delay before a fetch completes.
    #[must_use]
    pub const fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Make every fetch fail.
    #[must_use]
    pub const fn failing_fetch(mut self) -> Self {
        self.fetch_fails = true;
        self
    }

    /// Fetch calls so far.
    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSource for ScriptedSource {
    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchResult>, MediaError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.results.iter().take(limit).cloned().collect())
    }

    async fn probe_duration(&self, _media_id: &str) -> Result<Option<u32>, MediaError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.duration)
    }

    async fn fetch_audio(
        &self,
        _media_id: &str,
        dest_dir: &Path,
        file_stem: &str,
    ) -> Result<PathBuf, MediaError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.fetch_delay).await;
        if self.fetch_fails {
            return Err(MediaError::Failed(
                "ERROR: Video unavailable".to_string(),
            ));
        }
        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join(format!("{file_stem}.mp3"));
        tokio::fs::write(&path, b"ID3").await?;
        Ok(path)
    }
}

/// Everything the bot sent through the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    /// `send_text`
    Text {
        /// Chat
        chat_id: i64,
        /// Text
        text: String,
        /// Keyboard
        keyboard: Option<Keyboard>,
    },
    /// `edit_text`
    Edit {
        /// Chat
        chat_id: i64,
        /// Edited message
        message_id: i32,
        /// New text
        text: String,
        /// New keyboard
        keyboard: Option<Keyboard>,
    },
    /// `delete_message`
    Delete {
        /// Chat
        chat_id: i64,
        /// Deleted message
        message_id: i32,
    },
    /// `send_audio`
    Audio {
        /// Chat
        chat_id: i64,
        /// Payload source
        source: AudioSource,
        /// Track title
        title: String,
        /// Whether a local payload existed on disk at upload time
        file_present: bool,
    },
    /// `answer_callback`
    CallbackAnswer(String),
    /// `answer_inline_query`
    Inline {
        /// Query
        query_id: String,
        /// Results
        results: Vec<InlineAnswer>,
    },
}

/// Gateway that records every call and hands out sequential IDs.
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<Sent>>,
    next_id: AtomicI32,
    fail_audio: bool,
    unreachable: HashSet<i64>,
}

impl RecordingGateway {
    /// Gateway where every call succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every audio upload fail.
    #[must_use]
    pub fn failing_audio(mut self) -> Self {
        self.fail_audio = true;
        self
    }

    /// Make text messages to `chat_id` fail.
    #[must_use]
    pub fn with_unreachable(mut self, chat_id: i64) -> Self {
        self.unreachable.insert(chat_id);
        self
    }

    fn record(&self, sent: Sent) {
        self.sent.lock().expect("gateway log poisoned").push(sent);
    }

    fn next_id(&self) -> i32 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Snapshot of all recorded calls.
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().expect("gateway log poisoned").clone()
    }

    /// Texts sent to a chat, in order.
    pub fn texts_to(&self, chat: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { chat_id, text, .. } if chat_id == chat => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Edits made in a chat, in order.
    pub fn edits_in(&self, chat: i64) -> Vec<(String, Option<Keyboard>)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Edit {
                    chat_id,
                    text,
                    keyboard,
                    ..
                } if chat_id == chat => Some((text, keyboard)),
                _ => None,
            })
            .collect()
    }

    /// Audio payloads sent to a chat, in order.
    pub fn audio_to(&self, chat: i64) -> Vec<AudioSource> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Audio {
                    chat_id, source, ..
                } if chat_id == chat => Some(source),
                _ => None,
            })
            .collect()
    }

    /// Number of local-file uploads across all chats.
    pub fn uploads(&self) -> usize {
        self.sent()
            .iter()
            .filter(|s| {
                matches!(
                    s,
                    Sent::Audio {
                        source: AudioSource::Local(_),
                        ..
                    }
                )
            })
            .count()
    }

    /// Inline answers, in order.
    pub fn inline_answers(&self) -> Vec<Vec<InlineAnswer>> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Inline { results, .. } => Some(results),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> Result<i32> {
        if self.unreachable.contains(&chat_id) {
            return Err(anyhow!("Forbidden: bot was blocked by the user"));
        }
        self.record(Sent::Text {
            chat_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(self.next_id())
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        self.record(Sent::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.record(Sent::Delete {
            chat_id,
            message_id,
        });
        Ok(())
    }

    async fn send_audio(
        &self,
        chat_id: i64,
        source: AudioSource,
        _caption: &str,
        title: &str,
    ) -> Result<String> {
        let file_present = match &source {
            AudioSource::Local(path) => path.exists(),
            AudioSource::Reference(_) => false,
        };
        let reference = match &source {
            AudioSource::Reference(reference) => reference.clone(),
            AudioSource::Local(_) => format!("file-{}", self.next_id()),
        };
        self.record(Sent::Audio {
            chat_id,
            source,
            title: title.to_string(),
            file_present,
        });
        if self.fail_audio {
            return Err(anyhow!("Bad Request: file is too big"));
        }
        Ok(reference)
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.record(Sent::CallbackAnswer(callback_id.to_string()));
        Ok(())
    }

    async fn answer_inline_query(&self, query_id: &str, results: Vec<InlineAnswer>) -> Result<()> {
        self.record(Sent::Inline {
            query_id: query_id.to_string(),
            results,
        });
        Ok(())
    }
}
