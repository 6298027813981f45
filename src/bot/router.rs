//! Inbound event router
//!
//! Classifies platform events and drives the session state machine, the
//! search flow and the download coordinator. Every handler swallows its
//! own errors after reporting them to the originating chat, so nothing
//! propagates across chats.
//!
//! Long-running work (searches, downloads, pre-caching) runs on tracked
//! tasks; everything that reads or mutates a chat's session happens before
//! such a task is spawned, which keeps per-chat ordering intact.

use crate::bot::actions::{CallbackAction, Command};
use crate::bot::admin::AdminPanel;
use crate::bot::i18n::{self, Text, DEFAULT_LANGUAGE};
use crate::bot::views;
use crate::config::{RESULT_PAGE_SIZE, UNKNOWN_TRACK_TITLE};
use crate::download::DownloadCoordinator;
use crate::error::{BotError, DownloadError};
use crate::gateway::{AudioSource, InlineAnswer, MessagingGateway};
use crate::media::{MediaSource, SearchResult};
use crate::state::{BotState, Language, Mode};
use std::future::Future;
use std::sync::Arc;
use teloxide::utils::command::BotCommands;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Platform-neutral inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Inline search typed in any chat
    InlineQuery {
        /// Query ID to answer
        query_id: String,
        /// User who typed the query
        user_id: i64,
        /// Query text
        query: String,
    },
    /// User picked one of our inline results
    ChosenInlineResult {
        /// User who picked it
        user_id: i64,
        /// Result ID (media ID)
        result_id: String,
    },
    /// Message in a private chat
    Message {
        /// Chat
        chat_id: i64,
        /// Text, `None` for non-text messages
        text: Option<String>,
    },
    /// Inline keyboard button press
    Callback {
        /// Callback ID to acknowledge
        callback_id: String,
        /// Chat the button belongs to
        chat_id: i64,
        /// Callback payload
        data: Option<String>,
    },
}

/// Event dispatcher shared by every update handler
#[derive(Clone)]
pub struct Router {
    state: Arc<BotState>,
    source: Arc<dyn MediaSource>,
    gateway: Arc<dyn MessagingGateway>,
    coordinator: DownloadCoordinator,
    admin: AdminPanel,
    bot_username: String,
    tasks: TaskTracker,
}

impl Router {
    /// Create a router.
    #[must_use]
    pub fn new(
        state: Arc<BotState>,
        source: Arc<dyn MediaSource>,
        gateway: Arc<dyn MessagingGateway>,
        coordinator: DownloadCoordinator,
        admin_id: Option<i64>,
        bot_username: impl Into<String>,
    ) -> Self {
        let admin = AdminPanel::new(Arc::clone(&state), Arc::clone(&gateway), admin_id);
        Self {
            state,
            source,
            gateway,
            coordinator,
            admin,
            bot_username: bot_username.into(),
            tasks: TaskTracker::new(),
        }
    }

    /// Handle one inbound event. Never fails: errors are reported to the
    /// originating chat and logged.
    pub async fn handle(&self, event: InboundEvent) {
        match event {
            InboundEvent::InlineQuery {
                query_id,
                user_id,
                query,
            } => self.on_inline_query(query_id, user_id, query).await,
            InboundEvent::ChosenInlineResult { user_id, result_id } => {
                self.on_chosen_result(user_id, result_id).await;
            }
            InboundEvent::Message { chat_id, text } => {
                if let Err(e) = self.on_message(chat_id, text).await {
                    self.report(chat_id, e).await;
                }
            }
            InboundEvent::Callback {
                callback_id,
                chat_id,
                data,
            } => {
                if let Err(e) = self.on_callback(&callback_id, chat_id, data.as_deref()).await {
                    self.report(chat_id, e).await;
                }
            }
        }
    }

    /// Wait until every spawned task has finished.
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    fn is_refused(&self, chat_id: i64, banned: bool) -> bool {
        banned && !self.admin.is_admin(chat_id)
    }

    async fn language_of(&self, chat_id: i64) -> Language {
        self.state
            .snapshot(chat_id)
            .await
            .language
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    async fn report(&self, chat_id: i64, err: BotError) {
        match &err {
            BotError::Authorization(_) => info!(chat_id, "Refusing banned chat"),
            BotError::Gateway(e) => warn!(chat_id, error = %e, "Gateway call failed"),
            other => debug!(chat_id, error = %other, "Event failed"),
        }
        let lang = self.language_of(chat_id).await;
        if let Some(text) = i18n::error_text(lang, &err) {
            if let Err(e) = self.gateway.send_text(chat_id, &text, None).await {
                warn!(chat_id, error = %e, "Failed to report error to chat");
            }
        }
    }

    /// Run `work` on a tracked task, reporting its error to `chat_id`.
    fn spawn_for_chat<F>(&self, chat_id: i64, work: F)
    where
        F: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        let this = self.clone();
        self.tasks.spawn(async move {
            if let Err(e) = work.await {
                this.report(chat_id, e).await;
            }
        });
    }

    async fn on_message(&self, chat_id: i64, text: Option<String>) -> Result<(), BotError> {
        let session = self.state.observe(chat_id).await;
        if self.is_refused(chat_id, session.banned) {
            return Err(BotError::Authorization(chat_id));
        }
        let Some(text) = text else {
            return Ok(());
        };

        let mode = self.state.consume_mode(chat_id).await;
        if mode != Mode::Idle {
            debug!(chat_id, ?mode, "Consuming armed mode");
            if self.admin.is_admin(chat_id) {
                return self.admin.handle_input(chat_id, mode, &text).await;
            }
            return Ok(());
        }

        let lang = session.language.unwrap_or(DEFAULT_LANGUAGE);
        if text.starts_with('/') {
            return match Command::parse(&text, &self.bot_username) {
                Ok(command) => self.on_command(chat_id, lang, command).await,
                Err(e) => {
                    debug!(chat_id, error = %e, "Ignoring unknown command");
                    Ok(())
                }
            };
        }

        if session.language.is_none() {
            self.gateway
                .send_text(chat_id, i18n::LANGUAGE_REQUIRED, None)
                .await?;
            return Ok(());
        }

        let this = self.clone();
        self.spawn_for_chat(chat_id, async move { this.search(chat_id, lang, &text).await });
        Ok(())
    }

    async fn on_command(&self, chat_id: i64, lang: Language, command: Command) -> Result<(), BotError> {
        match command {
            Command::Start(arg) => {
                let media_id = arg.trim().to_string();
                if media_id.is_empty() {
                    self.gateway
                        .send_text(
                            chat_id,
                            i18n::LANGUAGE_PROMPT,
                            Some(views::language_keyboard()),
                        )
                        .await?;
                    return Ok(());
                }
                info!(chat_id, media_id = %media_id, "Deep link download");
                let title = self
                    .state
                    .track_title(&media_id)
                    .await
                    .unwrap_or_else(|| UNKNOWN_TRACK_TITLE.to_string());
                let this = self.clone();
                self.spawn_for_chat(chat_id, async move {
                    this.deliver(chat_id, lang, &media_id, &title).await
                });
            }
            Command::Help => {
                self.gateway
                    .send_text(chat_id, &Text::Help.render(lang), None)
                    .await?;
            }
            Command::Admin => {
                if self.admin.is_admin(chat_id) {
                    self.admin.show_panel(chat_id).await?;
                } else {
                    debug!(chat_id, "Ignoring /admin from non-admin chat");
                }
            }
        }
        Ok(())
    }

    async fn on_callback(
        &self,
        callback_id: &str,
        chat_id: i64,
        data: Option<&str>,
    ) -> Result<(), BotError> {
        if let Err(e) = self.gateway.answer_callback(callback_id).await {
            warn!(chat_id, error = %e, "Failed to answer callback");
        }

        let session = self.state.observe(chat_id).await;
        if self.is_refused(chat_id, session.banned) {
            return Err(BotError::Authorization(chat_id));
        }
        let Some(action) = data.and_then(CallbackAction::parse) else {
            debug!(chat_id, ?data, "Ignoring unknown callback payload");
            return Ok(());
        };
        let lang = session.language.unwrap_or(DEFAULT_LANGUAGE);

        match action {
            CallbackAction::Download(media_id) => {
                let title = self
                    .state
                    .track_title(&media_id)
                    .await
                    .ok_or_else(|| BotError::NotFound(media_id.clone()))?;
                let this = self.clone();
                self.spawn_for_chat(chat_id, async move {
                    this.deliver(chat_id, lang, &media_id, &title).await
                });
            }
            CallbackAction::Language(lang) => {
                self.state.set_language(chat_id, lang).await;
                info!(chat_id, lang = lang.code(), "Language selected");
                self.gateway
                    .send_text(chat_id, &Text::Welcome.render(lang), None)
                    .await?;
            }
            CallbackAction::Admin(action) => {
                if self.admin.is_admin(chat_id) {
                    self.admin.handle_action(chat_id, action).await?;
                } else {
                    warn!(chat_id, ?action, "Admin action from non-admin chat ignored");
                }
            }
        }
        Ok(())
    }

    async fn on_inline_query(&self, query_id: String, user_id: i64, query: String) {
        if self.is_refused(user_id, self.state.is_banned(user_id).await) {
            info!(user_id, "Refusing inline query from banned user");
            let refusal = InlineAnswer::Article {
                id: "banned".to_string(),
                title: i18n::BANNED_INLINE_TITLE.to_string(),
                description: String::new(),
                text: i18n::BANNED.to_string(),
                keyboard: None,
            };
            if let Err(e) = self.gateway.answer_inline_query(&query_id, vec![refusal]).await {
                warn!(user_id, error = %e, "Failed to answer inline query");
            }
            return;
        }

        let query = query.trim().to_string();
        if query.is_empty() {
            return;
        }

        let lang = self.language_of(user_id).await;
        let this = self.clone();
        self.tasks.spawn(async move {
            let results = this.search_source(&query).await;
            let mut answers = Vec::new();
            for result in views::offerable(
                &results,
                this.coordinator.max_duration_secs(),
                RESULT_PAGE_SIZE,
            ) {
                let cached = this.state.cached_reference(&result.id).await;
                answers.push(views::inline_entry(&result, cached, &this.bot_username, lang));
            }
            debug!(
                user_id,
                ids = ?answers.iter().map(InlineAnswer::id).collect::<Vec<_>>(),
                "Answering inline query"
            );
            if let Err(e) = this.gateway.answer_inline_query(&query_id, answers).await {
                warn!(user_id, error = %e, "Failed to answer inline query");
            }
        });
    }

    async fn on_chosen_result(&self, user_id: i64, result_id: String) {
        if self.is_refused(user_id, self.state.is_banned(user_id).await) {
            self.report(user_id, BotError::Authorization(user_id)).await;
            return;
        }
        if !self.coordinator.caches_downloads() {
            debug!(media_id = %result_id, "No storage channel, skipping pre-cache");
            return;
        }
        if self.state.cached_reference(&result_id).await.is_some() {
            debug!(media_id = %result_id, "Chosen result already cached");
            return;
        }

        let title = self
            .state
            .track_title(&result_id)
            .await
            .unwrap_or_else(|| UNKNOWN_TRACK_TITLE.to_string());
        let coordinator = self.coordinator.clone();
        self.tasks.spawn(async move {
            match coordinator.request_audio(&result_id, &title, None).await {
                Ok(_) => info!(media_id = %result_id, "Pre-cached chosen inline result"),
                Err(e) => debug!(media_id = %result_id, error = %e, "Pre-caching failed"),
            }
        });
    }

    /// Search, index the results and return them; a failing source counts
    /// as no results.
    async fn search_source(&self, query: &str) -> Vec<SearchResult> {
        match self.source.search(query, RESULT_PAGE_SIZE).await {
            Ok(results) => {
                self.state.record_search(&results).await;
                results
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Search failed");
                Vec::new()
            }
        }
    }

    async fn search(&self, chat_id: i64, lang: Language, query: &str) -> Result<(), BotError> {
        let status = self
            .gateway
            .send_text(chat_id, &Text::Searching(query).render(lang), None)
            .await?;

        let results = self.search_source(query).await;
        let offered = views::offerable(
            &results,
            self.coordinator.max_duration_secs(),
            RESULT_PAGE_SIZE,
        );
        debug!(chat_id, found = results.len(), offered = offered.len(), "Search finished");

        let (text, keyboard) = if results.is_empty() {
            (Text::NothingFound.render(lang), None)
        } else if offered.is_empty() {
            (Text::AllTooLong.render(lang), None)
        } else {
            (
                Text::SelectTrack.render(lang),
                Some(views::results_keyboard(&offered)),
            )
        };
        self.gateway
            .edit_text(chat_id, status, &text, keyboard)
            .await?;
        Ok(())
    }

    /// Foreground download: resolve the track and send it to the chat.
    async fn deliver(
        &self,
        chat_id: i64,
        lang: Language,
        media_id: &str,
        title: &str,
    ) -> Result<(), BotError> {
        if let Some(track) = self.state.lookup_track(media_id).await {
            if track.duration_secs > self.coordinator.max_duration_secs() {
                return Err(DownloadError::DurationExceeded {
                    seconds: track.duration_secs,
                }
                .into());
            }
        }

        let caption = i18n::audio_caption(title);
        if let Some(reference) = self.state.cached_reference(media_id).await {
            debug!(chat_id, media_id, "Serving cached audio");
            self.gateway
                .send_audio(chat_id, AudioSource::Reference(reference), &caption, title)
                .await?;
            return Ok(());
        }

        let status = self
            .gateway
            .send_text(chat_id, &Text::Downloading(title).render(lang), None)
            .await?;

        match self
            .coordinator
            .request_audio(media_id, title, Some(chat_id))
            .await
        {
            Ok(reference) => {
                if reference.needs_delivery_to(chat_id) {
                    self.gateway
                        .send_audio(
                            chat_id,
                            AudioSource::Reference(reference.file_id),
                            &caption,
                            title,
                        )
                        .await?;
                }
                if let Err(e) = self.gateway.delete_message(chat_id, status).await {
                    debug!(chat_id, error = %e, "Failed to delete status message");
                }
            }
            Err(e) => {
                info!(chat_id, media_id, error = %e, "Download failed");
                self.gateway
                    .edit_text(chat_id, status, &i18n::download_error_text(lang, &e), None)
                    .await?;
            }
        }
        Ok(())
    }
}
