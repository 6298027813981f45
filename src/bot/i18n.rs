//! User-facing texts
//!
//! Chat-facing messages are localized for every [`Language`]; admin panel and
//! system texts are fixed. All texts are HTML, dynamic parts are escaped here.

use crate::error::{BotError, DownloadError};
use crate::state::Language;
use html_escape::encode_text;

/// Language used when a chat has not picked one.
pub const DEFAULT_LANGUAGE: Language = Language::Ru;

/// Prompt shown with the language keyboard.
pub const LANGUAGE_PROMPT: &str = "🌍 Select language / Выберите язык / Ընտրեք լեզուն";
/// Reply to plain text before a language is chosen.
pub const LANGUAGE_REQUIRED: &str = "🌐 Please select language using /start";
/// Refusal sent to banned chats.
pub const BANNED: &str = "🚫 Вы заблокированы.";
/// Title of the refusal entry answered to banned inline queries.
pub const BANNED_INLINE_TITLE: &str = "🚫 Access denied";

/// Admin panel header.
pub const ADMIN_PANEL: &str = "🛠 Admin Panel";
/// Prompt armed by the broadcast button.
pub const ENTER_BROADCAST: &str = "✉️ Enter broadcast message:";
/// Prompt armed by the ban button.
pub const ENTER_BAN: &str = "👤 Enter user ID to ban:";
/// Prompt armed by the unban button.
pub const ENTER_UNBAN: &str = "👤 Enter user ID to unban:";
/// Prefix of every broadcast message.
pub const BROADCAST_PREFIX: &str = "📣 Message from admin:";

/// Caption attached to delivered audio.
#[must_use]
pub fn audio_caption(title: &str) -> String {
    format!("🎶 {title}")
}

/// Localized chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text<'a> {
    /// Greeting after a language is picked
    Welcome,
    /// Usage instructions
    Help,
    /// Search status
    Searching(&'a str),
    /// Search returned nothing
    NothingFound,
    /// Every result is over the duration limit
    AllTooLong,
    /// Header of the result keyboard
    SelectTrack,
    /// Download status
    Downloading(&'a str),
    /// Fetch or delivery failed
    DownloadError,
    /// Track is over the duration limit
    TooLong {
        /// Track duration in seconds
        seconds: u32,
    },
    /// Selected track is unknown
    NotFound,
    /// Admin typed something that is not a chat ID
    InvalidUserId,
    /// Admin tried to ban themselves
    SelfBan,
    /// Inline card description
    InlineDescription,
    /// Inline card deep-link button
    InlineButton,
    /// Inline card body
    InlineCard(&'a str),
}

impl Text<'_> {
    /// Render the text in a language.
    #[must_use]
    pub fn render(self, lang: Language) -> String {
        match self {
            Self::Welcome => pick(
                lang,
                "👋 Բարի գալուստ!\n🎵 Ես կարող եմ գտնել երգեր YouTube-ում և ուղարկել MP3 ֆորմատով։",
                "👋 Добро пожаловать!\n🎵 Я могу найти песни на YouTube и отправить их в формате MP3.",
                "👋 Welcome!\n🎵 I can find songs on YouTube and send them in MP3 format.",
            )
            .to_string(),
            Self::Help => help(lang).to_string(),
            Self::Searching(query) => {
                let label = pick(lang, "🔍 Որոնում եմ", "🔍 Ищу", "🔍 Searching");
                format!("{label}: {}", encode_text(query))
            }
            Self::NothingFound => {
                pick(lang, "❌ Ոչինչ չի գտնվել", "❌ Ничего не найдено", "❌ Nothing found")
                    .to_string()
            }
            Self::AllTooLong => pick(
                lang,
                "❌ Բոլոր երգերը գերազանցում են առավելագույն տևողությունը (10 րոպե)",
                "❌ Все треки превышают максимальную продолжительность (10 минут)",
                "❌ All tracks exceed the maximum duration (10 minutes)",
            )
            .to_string(),
            Self::SelectTrack => {
                pick(lang, "🎶 Ընտրեք երգը:", "🎶 Выберите трек:", "🎶 Select a track:").to_string()
            }
            Self::Downloading(title) => {
                let label = pick(lang, "🎧 Ներբեռնում եմ", "🎧 Скачиваю", "🎧 Downloading");
                format!("{label}: {}", encode_text(title))
            }
            Self::DownloadError => {
                pick(lang, "❌ Ներբեռնման սխալ", "❌ Ошибка скачивания", "❌ Download error")
                    .to_string()
            }
            Self::TooLong { seconds } => {
                let minutes = f64::from(seconds) / 60.0;
                match lang {
                    Language::Hy => format!(
                        "❌ Երգը շատ երկար է ({minutes:.2} րոպե). Առավելագույն տևողությունը 10 րոպե է:"
                    ),
                    Language::Ru => format!(
                        "❌ Трек слишком длинный ({minutes:.2} мин). Максимальная продолжительность - 10 минут."
                    ),
                    Language::En => format!(
                        "❌ Track is too long ({minutes:.2} min). Maximum duration is 10 minutes."
                    ),
                }
            }
            Self::NotFound => pick(
                lang,
                "❌ Երգը չի գտնվել, փորձեք նորից որոնել",
                "❌ Трек не найден, попробуйте поискать заново",
                "❌ Track not found, please search again",
            )
            .to_string(),
            Self::InvalidUserId => pick(
                lang,
                "❌ Օգտատիրոջ ID-ի սխալ ձևաչափ",
                "❌ Неверный формат ID пользователя.",
                "❌ Invalid user ID format.",
            )
            .to_string(),
            Self::SelfBan => pick(
                lang,
                "❌ Չեք կարող արգելափակել ինքներդ ձեզ",
                "❌ Нельзя заблокировать самого себя.",
                "❌ You cannot ban yourself.",
            )
            .to_string(),
            Self::InlineDescription => pick(
                lang,
                "Սեղմեք ներբեռնելու համար",
                "Нажмите для скачивания",
                "Tap to download",
            )
            .to_string(),
            Self::InlineButton => {
                pick(lang, "🎧 Ներբեռնել բոտում", "🎧 Скачать в боте", "🎧 Download in bot")
                    .to_string()
            }
            Self::InlineCard(title) => {
                let hint = pick(
                    lang,
                    "Սեղմեք ստորև կոճակը՝ երգը ներբեռնելու համար։",
                    "Нажмите кнопку ниже, чтобы скачать трек.",
                    "Press the button below to download the track.",
                );
                format!("🎵 <b>{}</b>\n\n{hint}", encode_text(title))
            }
        }
    }
}

const fn pick(
    lang: Language,
    hy: &'static str,
    ru: &'static str,
    en: &'static str,
) -> &'static str {
    match lang {
        Language::Hy => hy,
        Language::Ru => ru,
        Language::En => en,
    }
}

const fn help(lang: Language) -> &'static str {
    pick(
        lang,
        "✨ ━━━━━━━━━━━━━━━━ ✨\n🔊 Ինչպես օգտվել Melody Bot-ից\n✨ ━━━━━━━━━━━━━━━━ ✨\n🎧 Երաժշտություն որոնելու համար:\n1️⃣ Ուղարկեք երգի/արտիստի անունը\n2️⃣ Ընտրեք առաջարկվող արդյունքներից\n3️⃣ Սպասեք MP3 ձևափոխման ավարտին\n4️⃣ Ստացեք երգը և վայելեք այն!\n✨ ━━━━━━━━━━━━━━━━ ✨",
        "✨ ━━━━━━━━━━━━━━━━ ✨\n🔊 Как пользоваться Melody Bot\n✨ ━━━━━━━━━━━━━━━━ ✨\n🎧 Для поиска музыки:\n1️⃣ Отправьте название песни/исполнителя\n2️⃣ Выберите из предложенных результатов\n3️⃣ Дождитесь конвертации в MP3\n4️⃣ Получите песню и наслаждайтесь!\n✨ ━━━━━━━━━━━━━━━━ ✨",
        "✨ ━━━━━━━━━━━━━━━━ ✨\n🔊 How to use Melody Bot\n✨ ━━━━━━━━━━━━━━━━ ✨\n🎧 To find music:\n1️⃣ Send the song/artist name\n2️⃣ Choose from suggested results\n3️⃣ Wait for MP3 conversion\n4️⃣ Get your song and enjoy!\n✨ ━━━━━━━━━━━━━━━━ ✨",
    )
}

/// User-facing message for an error, `None` when the error is not worth
/// telling the user about.
#[must_use]
pub fn error_text(lang: Language, err: &BotError) -> Option<String> {
    let text = match err {
        BotError::Authorization(_) => BANNED.to_string(),
        BotError::InputFormat(_) => Text::InvalidUserId.render(lang),
        BotError::NotFound(_) => Text::NotFound.render(lang),
        BotError::AdminSelfBan => Text::SelfBan.render(lang),
        BotError::Download(e) => download_error_text(lang, e),
        BotError::Gateway(_) => return None,
    };
    Some(text)
}

/// User-facing message for a failed download.
#[must_use]
pub fn download_error_text(lang: Language, err: &DownloadError) -> String {
    match err {
        DownloadError::DurationExceeded { seconds } => Text::TooLong { seconds: *seconds }.render(lang),
        DownloadError::FetchFailed(_) | DownloadError::DeliveryFailed(_) => {
            Text::DownloadError.render(lang)
        }
    }
}
