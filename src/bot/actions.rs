//! Callback payloads and slash commands.

use crate::state::Language;
use teloxide::utils::command::BotCommands;

const DOWNLOAD_PREFIX: &str = "dl_";
const LANGUAGE_PREFIX: &str = "lang_";
const ADMIN_PREFIX: &str = "admin_";

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Choose a language, or download a track when a media ID is given
    #[command(description = "Start the bot.")]
    Start(String),
    /// Show usage instructions
    #[command(description = "How to use the bot.")]
    Help,
    /// Open the admin panel
    #[command(hide)]
    Admin,
}

/// Admin panel button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    /// Show counters
    Stats,
    /// Arm broadcast input
    Broadcast,
    /// Arm ban input
    Ban,
    /// Arm unban input
    Unban,
    /// Drop every cached track
    ClearCache,
}

impl AdminAction {
    const ALL: [Self; 5] = [
        Self::Stats,
        Self::Broadcast,
        Self::Ban,
        Self::Unban,
        Self::ClearCache,
    ];

    const fn suffix(self) -> &'static str {
        match self {
            Self::Stats => "stats",
            Self::Broadcast => "broadcast",
            Self::Ban => "ban",
            Self::Unban => "unban",
            Self::ClearCache => "clearcache",
        }
    }
}

/// Decoded callback payload.
///
/// Wire format: `dl_<media id>`, `lang_<code>`, `admin_<action>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Download and deliver a track
    Download(String),
    /// Pick the interface language
    Language(Language),
    /// Admin panel action
    Admin(AdminAction),
}

impl CallbackAction {
    /// Decode a payload, `None` for anything unrecognized.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(media_id) = data.strip_prefix(DOWNLOAD_PREFIX) {
            return (!media_id.is_empty()).then(|| Self::Download(media_id.to_string()));
        }
        if let Some(code) = data.strip_prefix(LANGUAGE_PREFIX) {
            return Language::from_code(code).map(Self::Language);
        }
        if let Some(suffix) = data.strip_prefix(ADMIN_PREFIX) {
            return AdminAction::ALL
                .into_iter()
                .find(|action| action.suffix() == suffix)
                .map(Self::Admin);
        }
        None
    }

    /// Encode into a callback payload.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Download(media_id) => format!("{DOWNLOAD_PREFIX}{media_id}"),
            Self::Language(lang) => format!("{LANGUAGE_PREFIX}{}", lang.code()),
            Self::Admin(action) => format!("{ADMIN_PREFIX}{}", action.suffix()),
        }
    }
}
