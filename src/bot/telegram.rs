//! Telegram implementation of [`MessagingGateway`].

use crate::gateway::{AudioSource, Button, InlineAnswer, Keyboard, MessagingGateway};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, ChatId, FileId, InlineKeyboardButton, InlineKeyboardMarkup,
    InlineQueryId, InlineQueryResult, InlineQueryResultArticle, InlineQueryResultCachedAudio,
    InputFile, InputMessageContent, InputMessageContentText, MessageId, ParseMode,
};
use tracing::{debug, warn};
use url::Url;

/// Gateway backed by a teloxide [`Bot`]
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    /// Wrap a bot.
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn to_markup(keyboard: Keyboard) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
        .into_iter()
        .map(|row| row.into_iter().filter_map(to_button).collect())
        .collect();
    InlineKeyboardMarkup::new(rows)
}

fn to_button(button: Button) -> Option<InlineKeyboardButton> {
    match button {
        Button::Callback { label, data } => Some(InlineKeyboardButton::callback(label, data)),
        Button::Url { label, url } => match Url::parse(&url) {
            Ok(url) => Some(InlineKeyboardButton::url(label, url)),
            Err(e) => {
                warn!(url = %url, error = %e, "Dropping button with invalid URL");
                None
            }
        },
    }
}

fn to_inline_result(answer: InlineAnswer) -> InlineQueryResult {
    match answer {
        InlineAnswer::CachedAudio {
            id,
            reference,
            caption,
        } => {
            let mut result = InlineQueryResultCachedAudio::new(id, FileId(reference));
            result.caption = Some(caption);
            InlineQueryResult::CachedAudio(result)
        }
        InlineAnswer::Article {
            id,
            title,
            description,
            text,
            keyboard,
        } => {
            let content = InputMessageContent::Text(
                InputMessageContentText::new(text).parse_mode(ParseMode::Html),
            );
            let mut result = InlineQueryResultArticle::new(id, title, content);
            if !description.is_empty() {
                result.description = Some(description);
            }
            result.reply_markup = keyboard.map(to_markup);
            InlineQueryResult::Article(result)
        }
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> Result<i32> {
        let mut req = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            req = req.reply_markup(to_markup(keyboard));
        }
        let msg = req
            .await
            .map_err(|e| anyhow!("Telegram send error: {e}"))?;
        Ok(msg.id.0)
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        const ERROR_NOT_MODIFIED: &str = "message is not modified";

        let mut req = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id), text)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            req = req.reply_markup(to_markup(keyboard));
        }
        match req.await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains(ERROR_NOT_MODIFIED) => {
                debug!("Message update skipped: {e}");
                Ok(())
            }
            Err(e) => Err(anyhow!("Telegram edit error: {e}")),
        }
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(|e| anyhow!("Telegram delete error: {e}"))?;
        Ok(())
    }

    async fn send_audio(
        &self,
        chat_id: i64,
        source: AudioSource,
        caption: &str,
        title: &str,
    ) -> Result<String> {
        let file = match source {
            AudioSource::Local(path) => InputFile::file(path),
            AudioSource::Reference(reference) => InputFile::file_id(FileId(reference)),
        };
        let msg = self
            .bot
            .send_audio(ChatId(chat_id), file)
            .caption(caption)
            .title(title)
            .await
            .map_err(|e| anyhow!("Telegram audio error: {e}"))?;

        msg.audio()
            .map(|audio| audio.file.id.to_string())
            .ok_or_else(|| anyhow!("Telegram returned no audio for message {}", msg.id.0))
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()))
            .await
            .map_err(|e| anyhow!("Telegram callback error: {e}"))?;
        Ok(())
    }

    async fn answer_inline_query(&self, query_id: &str, results: Vec<InlineAnswer>) -> Result<()> {
        let results: Vec<InlineQueryResult> = results.into_iter().map(to_inline_result).collect();
        self.bot
            .answer_inline_query(InlineQueryId(query_id.to_string()), results)
            .is_personal(true)
            .cache_time(1)
            .await
            .map_err(|e| anyhow!("Telegram inline answer error: {e}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_conversion_drops_invalid_urls() {
        let markup = to_markup(vec![
            vec![Button::callback("A", "dl_a"), Button::url("bad", "not a url")],
            vec![Button::url("Open", "https://t.me/melody_bot?start=a")],
        ]);
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0].len(), 1);
        assert_eq!(markup.inline_keyboard[1][0].text, "Open");
    }

    #[test]
    fn test_cached_audio_conversion_keeps_file_id() {
        let result = to_inline_result(InlineAnswer::CachedAudio {
            id: "abc".into(),
            reference: "file-1".into(),
            caption: "🎶 Imagine".into(),
        });
        let InlineQueryResult::CachedAudio(audio) = result else {
            panic!("expected cached audio");
        };
        assert_eq!(audio.id, "abc");
        assert_eq!(audio.audio_file_id, FileId("file-1".to_string()));
        assert_eq!(audio.caption.as_deref(), Some("🎶 Imagine"));
    }

    #[test]
    fn test_article_conversion() {
        let result = to_inline_result(InlineAnswer::Article {
            id: "abc".into(),
            title: "Imagine".into(),
            description: String::new(),
            text: "🎵 <b>Imagine</b>".into(),
            keyboard: None,
        });
        let InlineQueryResult::Article(article) = result else {
            panic!("expected an article");
        };
        assert_eq!(article.title, "Imagine");
        assert!(article.description.is_none());
        assert!(article.reply_markup.is_none());
    }
}
