#![deny(missing_docs)]
//! Melody bot library.
//!
//! Telegram music bot: search tracks through yt-dlp, fetch each track at
//! most once and serve it afterwards from a cache of Telegram file IDs.

/// Telegram-facing layer.
pub mod bot;
/// Configuration management.
pub mod config;
/// Deduplicating download coordinator.
pub mod download;
/// Error taxonomy.
pub mod error;
/// Outbound messaging interface.
pub mod gateway;
/// External media source.
pub mod media;
/// Shared in-memory state.
pub mod state;

#[cfg(test)]
pub mod testing;
