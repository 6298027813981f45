//! Per-chat conversational state.

use std::collections::{HashMap, HashSet};

/// Interface language chosen by a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// Armenian
    Hy,
    /// Russian
    Ru,
    /// English
    En,
}

impl Language {
    /// All selectable languages, in the order they are offered.
    pub const ALL: [Self; 3] = [Self::Hy, Self::Ru, Self::En];

    /// Short code used in callback payloads.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Hy => "hy",
            Self::Ru => "ru",
            Self::En => "en",
        }
    }

    /// Parse a language code, `None` for unsupported codes.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| lang.code() == code)
    }
}

/// Pending admin input mode.
///
/// While a mode other than [`Mode::Idle`] is armed, the next text message
/// from the chat is consumed as the payload of that action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Messages are routed normally
    #[default]
    Idle,
    /// Next message is broadcast to every known chat
    AwaitingBroadcast,
    /// Next message is a chat ID to ban
    AwaitingBan,
    /// Next message is a chat ID to unban
    AwaitingUnban,
}

/// Mutable state of one chat.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Selected language, `None` until the chat picks one
    pub language: Option<Language>,
    mode: Mode,
}

impl Session {
    /// Currently armed mode.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Arm a mode for the next text message.
    pub fn arm(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Transition applied to every text message: hands out the armed mode
    /// and resets it to [`Mode::Idle`], whatever the message turns out to be.
    pub fn consume_text(&mut self) -> Mode {
        std::mem::take(&mut self.mode)
    }
}

/// Read-only view of a chat's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Chat identifier
    pub chat_id: i64,
    /// Selected language
    pub language: Option<Language>,
    /// Armed mode
    pub mode: Mode,
    /// Whether the chat is banned
    pub banned: bool,
}

/// All sessions plus the ban list.
///
/// Bans are kept apart from sessions so that banning an ID the bot has
/// never seen does not turn it into a known chat (and a broadcast target).
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<i64, Session>,
    banned: HashSet<i64>,
}

impl SessionStore {
    /// Get the session for a chat, creating it on first contact.
    pub fn touch(&mut self, chat_id: i64) -> &mut Session {
        self.sessions.entry(chat_id).or_default()
    }

    /// Session of a chat, if the chat has been seen.
    #[must_use]
    pub fn get(&self, chat_id: i64) -> Option<&Session> {
        self.sessions.get(&chat_id)
    }

    /// Snapshot of a chat's state; unknown chats report the initial state.
    #[must_use]
    pub fn snapshot(&self, chat_id: i64) -> SessionSnapshot {
        let session = self.sessions.get(&chat_id);
        SessionSnapshot {
            chat_id,
            language: session.and_then(|s| s.language),
            mode: session.map_or(Mode::Idle, Session::mode),
            banned: self.banned.contains(&chat_id),
        }
    }

    /// Whether a chat is banned.
    #[must_use]
    pub fn is_banned(&self, chat_id: i64) -> bool {
        self.banned.contains(&chat_id)
    }

    /// Ban a chat. Returns `false` if it was already banned.
    pub fn ban(&mut self, chat_id: i64) -> bool {
        self.banned.insert(chat_id)
    }

    /// Lift a ban. Returns `false` if the chat was not banned.
    pub fn unban(&mut self, chat_id: i64) -> bool {
        self.banned.remove(&chat_id)
    }

    /// Every chat that has interacted with the bot.
    #[must_use]
    pub fn known_chats(&self) -> Vec<i64> {
        self.sessions.keys().copied().collect()
    }

    /// Number of known chats.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of banned IDs.
    #[must_use]
    pub fn banned_count(&self) -> usize {
        self.banned.len()
    }
}
