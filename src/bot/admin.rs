//! Admin panel: stats, broadcast, bans and cache clearing.
//!
//! Only reachable from the configured admin chat. Broadcast, ban and unban
//! are two-step: the button arms a [`Mode`], the next text message is the
//! payload (see [`AdminPanel::handle_input`]).

use crate::bot::actions::AdminAction;
use crate::bot::i18n::{self, BROADCAST_PREFIX};
use crate::bot::views;
use crate::error::BotError;
use crate::gateway::MessagingGateway;
use crate::state::{BotState, Mode, Stats};
use html_escape::encode_text;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    /// Chats that received the message
    pub delivered: usize,
    /// Chats the message could not be sent to
    pub failed: usize,
}

/// Admin operations over the shared state
#[derive(Clone)]
pub struct AdminPanel {
    state: Arc<BotState>,
    gateway: Arc<dyn MessagingGateway>,
    admin_id: Option<i64>,
}

impl AdminPanel {
    /// Create a panel; without an admin ID every admin feature is disabled.
    #[must_use]
    pub fn new(
        state: Arc<BotState>,
        gateway: Arc<dyn MessagingGateway>,
        admin_id: Option<i64>,
    ) -> Self {
        Self {
            state,
            gateway,
            admin_id,
        }
    }

    /// Whether `chat_id` is the admin chat.
    #[must_use]
    pub fn is_admin(&self, chat_id: i64) -> bool {
        self.admin_id == Some(chat_id)
    }

    /// Current counters.
    pub async fn stats(&self) -> Stats {
        self.state.stats().await
    }

    /// Send `text` to every known chat except the admin.
    pub async fn broadcast(&self, text: &str) -> BroadcastReport {
        let message = format!("{BROADCAST_PREFIX}\n\n{}", encode_text(text));
        let mut report = BroadcastReport::default();

        for chat_id in self.state.known_chats_except(self.admin_id).await {
            match self.gateway.send_text(chat_id, &message, None).await {
                Ok(_) => report.delivered += 1,
                Err(e) => {
                    warn!(chat_id, error = %e, "Broadcast delivery failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            delivered = report.delivered,
            failed = report.failed,
            "Broadcast finished"
        );
        report
    }

    /// Ban the chat ID typed by the admin.
    ///
    /// # Errors
    ///
    /// [`BotError::InputFormat`] for non-numeric input and
    /// [`BotError::AdminSelfBan`] for the admin's own ID. Neither mutates state.
    pub async fn ban(&self, input: &str) -> Result<i64, BotError> {
        let chat_id = parse_chat_id(input)?;
        if self.is_admin(chat_id) {
            return Err(BotError::AdminSelfBan);
        }
        if self.state.ban(chat_id).await {
            info!(chat_id, "Chat banned");
        }
        Ok(chat_id)
    }

    /// Unban the chat ID typed by the admin; unbanning a chat that is not
    /// banned is a no-op.
    ///
    /// # Errors
    ///
    /// [`BotError::InputFormat`] for non-numeric input.
    pub async fn unban(&self, input: &str) -> Result<i64, BotError> {
        let chat_id = parse_chat_id(input)?;
        if self.state.unban(chat_id).await {
            info!(chat_id, "Chat unbanned");
        }
        Ok(chat_id)
    }

    /// Drop every cached track, returning how many were removed.
    pub async fn clear_cache(&self) -> usize {
        let removed = self.state.clear_cache().await;
        info!(removed, "Audio cache cleared");
        removed
    }

    /// Send the admin panel.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::Gateway`] if the panel cannot be sent.
    pub async fn show_panel(&self, chat_id: i64) -> Result<(), BotError> {
        self.gateway
            .send_text(chat_id, i18n::ADMIN_PANEL, Some(views::admin_keyboard()))
            .await?;
        Ok(())
    }

    /// Apply an admin panel button.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::Gateway`] if the reply cannot be sent.
    pub async fn handle_action(&self, chat_id: i64, action: AdminAction) -> Result<(), BotError> {
        let reply = match action {
            AdminAction::Stats => views::stats_text(self.stats().await),
            AdminAction::Broadcast => {
                self.state.arm_mode(chat_id, Mode::AwaitingBroadcast).await;
                i18n::ENTER_BROADCAST.to_string()
            }
            AdminAction::Ban => {
                self.state.arm_mode(chat_id, Mode::AwaitingBan).await;
                i18n::ENTER_BAN.to_string()
            }
            AdminAction::Unban => {
                self.state.arm_mode(chat_id, Mode::AwaitingUnban).await;
                i18n::ENTER_UNBAN.to_string()
            }
            AdminAction::ClearCache => {
                let removed = self.clear_cache().await;
                format!("🧹 Cache cleared ({removed} tracks)")
            }
        };
        self.gateway.send_text(chat_id, &reply, None).await?;
        Ok(())
    }

    /// Apply the text message consumed by an armed mode.
    ///
    /// # Errors
    ///
    /// Returns the ban/unban input errors, or [`BotError::Gateway`] if the
    /// confirmation cannot be sent.
    pub async fn handle_input(&self, chat_id: i64, mode: Mode, text: &str) -> Result<(), BotError> {
        let reply = match mode {
            Mode::Idle => return Ok(()),
            Mode::AwaitingBroadcast => {
                let report = self.broadcast(text).await;
                format!(
                    "✅ Broadcast sent: {} delivered, {} failed.",
                    report.delivered, report.failed
                )
            }
            Mode::AwaitingBan => format!("✅ User {} banned.", self.ban(text).await?),
            Mode::AwaitingUnban => format!("✅ User {} unbanned.", self.unban(text).await?),
        };
        self.gateway.send_text(chat_id, &reply, None).await?;
        Ok(())
    }
}

fn parse_chat_id(input: &str) -> Result<i64, BotError> {
    input
        .trim()
        .parse::<i64>()
        .map_err(|_| BotError::InputFormat(input.to_string()))
}
