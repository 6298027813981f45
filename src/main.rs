use dotenvy::dotenv;
use melody_bot::bot::runner::run_bot;
use melody_bot::config::Settings;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "melody_bot=info,teloxide=warn,hyper=warn,reqwest=warn";

/// Token shapes scrubbed from every log line, with their replacements
const TOKEN_RULES: &[(&str, &str)] = &[
    // Bot API URLs: keep host and method, hide the token
    (
        r"(https?://[^/]+/bot)[0-9]+:[A-Za-z0-9_-]+(/)",
        "$1[TELEGRAM_TOKEN]$2",
    ),
    (r"bot[0-9]{8,10}:[A-Za-z0-9_-]+", "bot[TELEGRAM_TOKEN]"),
    (r"[0-9]{8,10}:[A-Za-z0-9_-]{35}", "[TELEGRAM_TOKEN]"),
];

/// Compiled [`TOKEN_RULES`]
struct TokenScrubber {
    rules: Vec<(Regex, &'static str)>,
}

impl TokenScrubber {
    fn new() -> Result<Self, regex::Error> {
        let rules = TOKEN_RULES
            .iter()
            .map(|&(pattern, replacement)| Regex::new(pattern).map(|re| (re, replacement)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    fn scrub(&self, line: &str) -> String {
        self.rules
            .iter()
            .fold(line.to_string(), |acc, (re, replacement)| {
                re.replace_all(&acc, *replacement).into_owned()
            })
    }
}

/// Writer handed to `tracing_subscriber` for each event
struct ScrubbedStderr {
    scrubber: Arc<TokenScrubber>,
}

impl Write for ScrubbedStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let line = self.scrubber.scrub(&String::from_utf8_lossy(buf));
        io::stderr().lock().write_all(line.as_bytes())?;
        // Report the caller's length; the scrubbed text may differ.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for ScrubbedStderr {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        Self {
            scrubber: Arc::clone(&self.scrubber),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    // Scrubbing must be ready before the first log line
    let scrubber = Arc::new(TokenScrubber::new().map_err(|e| {
        eprintln!("Failed to compile token patterns: {e}");
        e
    })?);

    init_logging(scrubber);

    info!("Starting Melody bot...");

    let settings = init_settings();

    if let Err(e) = run_bot(settings).await {
        error!("Bot stopped with error: {e:#}");
        std::process::exit(1);
    }

    info!("Bot stopped.");
    Ok(())
}

fn init_logging(scrubber: Arc<TokenScrubber>) {
    let writer = ScrubbedStderr { scrubber };
    let debug_mode = std::env::var("DEBUG_MODE").is_ok_and(|v| v.eq_ignore_ascii_case("true"));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug_mode {
            EnvFilter::new("melody_bot=debug,teloxide=info")
        } else {
            EnvFilter::new(DEFAULT_LOG_FILTER)
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "123456789:AAEhBOweik6ad6PsVMRxjeQKm1rGbNyCfKq";

    #[test]
    fn test_bot_api_url_keeps_method() {
        let scrubber = TokenScrubber::new().expect("patterns compile");
        let line = format!("GET https://api.telegram.org/bot{TOKEN}/getMe failed");
        assert_eq!(
            scrubber.scrub(&line),
            "GET https://api.telegram.org/bot[TELEGRAM_TOKEN]/getMe failed"
        );
    }

    #[test]
    fn test_bare_token_is_hidden() {
        let scrubber = TokenScrubber::new().expect("patterns compile");
        assert_eq!(
            scrubber.scrub(&format!("token={TOKEN}")),
            "token=[TELEGRAM_TOKEN]"
        );
        assert_eq!(
            scrubber.scrub(&format!("bot{TOKEN} rejected")),
            "bot[TELEGRAM_TOKEN] rejected"
        );
    }

    #[test]
    fn test_plain_text_is_untouched() {
        let scrubber = TokenScrubber::new().expect("patterns compile");
        assert_eq!(scrubber.scrub("Searching: imagine"), "Searching: imagine");
    }
}
