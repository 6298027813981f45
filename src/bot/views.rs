//! Keyboards and formatters
//!
//! Pure functions turning domain values into gateway keyboards and texts.

use crate::bot::actions::{AdminAction, CallbackAction};
use crate::bot::i18n::Text;
use crate::gateway::{Button, InlineAnswer, Keyboard};
use crate::media::SearchResult;
use crate::state::{Language, Stats};
use url::Url;

/// Language picker shown by `/start`.
#[must_use]
pub fn language_keyboard() -> Keyboard {
    let label = |lang: Language| match lang {
        Language::Hy => "🇦🇲 Հայերեն",
        Language::Ru => "🇷🇺 Русский",
        Language::En => "🇺🇸 English",
    };
    vec![Language::ALL
        .into_iter()
        .map(|lang| Button::callback(label(lang), CallbackAction::Language(lang).encode()))
        .collect()]
}

/// Admin panel keyboard
#[must_use]
pub fn admin_keyboard() -> Keyboard {
    let button = |label: &str, action: AdminAction| {
        Button::callback(label, CallbackAction::Admin(action).encode())
    };
    vec![
        vec![
            button("📊 Stats", AdminAction::Stats),
            button("📣 Broadcast", AdminAction::Broadcast),
        ],
        vec![
            button("🚫 Ban", AdminAction::Ban),
            button("✅ Unban", AdminAction::Unban),
        ],
        vec![button("🧹 Clear cache", AdminAction::ClearCache)],
    ]
}

/// Format seconds as `m:ss`.
///
/// # Examples
///
/// ```
/// use melody_bot::bot::views::format_duration;
///
/// assert_eq!(format_duration(183), "3:03");
/// ```
#[must_use]
pub fn format_duration(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Results that may be offered: at most `limit` of them, none above `max_duration_secs`.
///
/// Tracks with an unknown duration (`0`) are kept.
#[must_use]
pub fn offerable(results: &[SearchResult], max_duration_secs: u32, limit: usize) -> Vec<SearchResult> {
    results
        .iter()
        .filter(|r| r.duration_secs <= max_duration_secs)
        .take(limit)
        .cloned()
        .collect()
}

/// One `title (m:ss)` button per result.
#[must_use]
pub fn results_keyboard(results: &[SearchResult]) -> Keyboard {
    results
        .iter()
        .map(|r| {
            let label = format!("{} ({})", r.title, format_duration(r.duration_secs));
            vec![Button::callback(
                label,
                CallbackAction::Download(r.id.clone()).encode(),
            )]
        })
        .collect()
}

/// `https://t.me/<bot>?start=<media id>`
///
/// # Errors
///
/// Returns an error if the username does not form a valid URL.
pub fn deep_link(bot_username: &str, media_id: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse("https://t.me/")?.join(bot_username)?;
    url.query_pairs_mut().append_pair("start", media_id);
    Ok(url.into())
}

/// Inline answer entry for a search result.
///
/// Cached tracks are playable right away; the rest become a card whose
/// button opens the bot with the media ID as start parameter.
#[must_use]
pub fn inline_entry(
    result: &SearchResult,
    cached_reference: Option<String>,
    bot_username: &str,
    lang: Language,
) -> InlineAnswer {
    if let Some(reference) = cached_reference {
        return InlineAnswer::CachedAudio {
            id: result.id.clone(),
            reference,
            caption: crate::bot::i18n::audio_caption(&result.title),
        };
    }

    let keyboard = deep_link(bot_username, &result.id)
        .ok()
        .map(|url| vec![vec![Button::url(Text::InlineButton.render(lang), url)]]);
    InlineAnswer::Article {
        id: result.id.clone(),
        title: result.title.clone(),
        description: Text::InlineDescription.render(lang),
        text: Text::InlineCard(&result.title).render(lang),
        keyboard,
    }
}

/// Admin counters.
#[must_use]
pub fn stats_text(stats: Stats) -> String {
    format!(
        "👥 Users: {}\n🚫 Banned: {}\n🎵 Cached songs: {}",
        stats.users, stats.banned, stats.cached_tracks
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::track;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(600), "10:00");
    }

    #[test]
    fn test_offerable_drops_long_tracks() {
        let results = vec![
            track("a", "A", 200),
            track("b", "B", 650),
            track("c", "C", 600),
            track("d", "D", 0),
            track("e", "E", 100),
        ];

        let offered = offerable(&results, 600, 5);
        let ids: Vec<&str> = offered.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d", "e"]);

        assert_eq!(offerable(&results, 600, 2).len(), 2);
    }

    #[test]
    fn test_results_keyboard_labels() {
        let keyboard = results_keyboard(&[track("abc", "Imagine", 183)]);
        assert_eq!(
            keyboard,
            vec![vec![Button::callback("Imagine (3:03)", "dl_abc")]]
        );
    }

    #[test]
    fn test_deep_link() {
        assert_eq!(
            deep_link("melody_bot", "dQw4w9WgXcQ").as_deref(),
            Ok("https://t.me/melody_bot?start=dQw4w9WgXcQ")
        );
    }

    #[test]
    fn test_inline_entry_shapes() {
        let result = track("abc", "Imagine", 183);

        let cached = inline_entry(&result, Some("file-1".into()), "melody_bot", Language::En);
        assert_eq!(
            cached,
            InlineAnswer::CachedAudio {
                id: "abc".into(),
                reference: "file-1".into(),
                caption: "🎶 Imagine".into(),
            }
        );

        let InlineAnswer::Article { keyboard, .. } =
            inline_entry(&result, None, "melody_bot", Language::En)
        else {
            panic!("uncached results become cards");
        };
        assert_eq!(
            keyboard,
            Some(vec![vec![Button::url(
                "🎧 Download in bot",
                "https://t.me/melody_bot?start=abc"
            )]])
        );
    }

    #[test]
    fn test_admin_keyboard_payloads() {
        let payloads: Vec<String> = admin_keyboard()
            .into_iter()
            .flatten()
            .filter_map(|b| match b {
                Button::Callback { data, .. } => Some(data),
                Button::Url { .. } => None,
            })
            .collect();
        assert_eq!(
            payloads,
            vec![
                "admin_stats",
                "admin_broadcast",
                "admin_ban",
                "admin_unban",
                "admin_clearcache"
            ]
        );
    }
}
