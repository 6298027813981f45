//! Messaging gateway: the outbound side of the bot.
//!
//! The router and the download coordinator talk to the messaging platform
//! only through [`MessagingGateway`], so they can be driven by fakes in tests.

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    /// Button that sends a callback payload back to the bot
    Callback {
        /// Button label
        label: String,
        /// Callback payload
        data: String,
    },
    /// Button that opens a URL
    Url {
        /// Button label
        label: String,
        /// Target URL
        url: String,
    },
}

impl Button {
    /// Callback button.
    #[must_use]
    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Callback {
            label: label.into(),
            data: data.into(),
        }
    }

    /// URL button.
    #[must_use]
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Url {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Rows of inline buttons.
pub type Keyboard = Vec<Vec<Button>>;

/// Where the audio payload comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Local file to upload
    Local(PathBuf),
    /// Delivery reference of an earlier upload
    Reference(String),
}

/// One entry of an inline query answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineAnswer {
    /// Already uploaded audio, playable directly from the result list
    CachedAudio {
        /// Result ID (the media ID)
        id: String,
        /// Delivery reference
        reference: String,
        /// Caption shown with the audio
        caption: String,
    },
    /// Text card, optionally with a button
    Article {
        /// Result ID
        id: String,
        /// Title shown in the result list
        title: String,
        /// Short description shown under the title
        description: String,
        /// HTML text posted when the card is chosen
        text: String,
        /// Optional keyboard attached to the posted message
        keyboard: Option<Keyboard>,
    },
}

impl InlineAnswer {
    /// Result ID of the entry.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::CachedAudio { id, .. } | Self::Article { id, .. } => id,
        }
    }
}

/// Outbound messaging operations used by the bot.
///
/// Texts are HTML formatted. Message IDs are scoped to their chat.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Send a text message, returning its message ID.
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> Result<i32>;

    /// Replace the text (and keyboard) of an earlier message.
    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()>;

    /// Delete a message.
    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()>;

    /// Send audio and return the delivery reference of the sent file.
    async fn send_audio(
        &self,
        chat_id: i64,
        source: AudioSource,
        caption: &str,
        title: &str,
    ) -> Result<String>;

    /// Acknowledge a callback query.
    async fn answer_callback(&self, callback_id: &str) -> Result<()>;

    /// Answer an inline query.
    async fn answer_inline_query(&self, query_id: &str, results: Vec<InlineAnswer>) -> Result<()>;
}
