//! Telegram-facing layer: routing, admin panel, texts and the teloxide glue.

/// Callback payloads and commands
pub mod actions;
/// Admin panel operations
pub mod admin;
/// Localized texts
pub mod i18n;
/// Inbound event routing
pub mod router;
/// Dispatcher setup
pub mod runner;
/// teloxide messaging gateway
pub mod telegram;
/// Keyboards and formatters
pub mod views;

pub use admin::{AdminPanel, BroadcastReport};
pub use router::{InboundEvent, Router};
pub use telegram::TelegramGateway;
