//! Telegram runtime: wires settings, state and collaborators into a
//! teloxide dispatcher that feeds the [`Router`].

use crate::bot::actions::Command;
use crate::bot::router::{InboundEvent, Router};
use crate::bot::telegram::TelegramGateway;
use crate::config::Settings;
use crate::download::DownloadCoordinator;
use crate::gateway::MessagingGateway;
use crate::media::{MediaSource, YtdlpSource};
use crate::state::BotState;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChosenInlineResult, InlineQuery};
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

/// How long shutdown waits for in-progress searches and downloads
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Run the bot until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the bot identity cannot be fetched from Telegram
/// or the download directory cannot be created.
pub async fn run_bot(settings: Arc<Settings>) -> anyhow::Result<()> {
    let bot = Bot::new(settings.bot_token.clone());

    let me = bot.get_me().await?;
    let bot_username = me.username.clone().unwrap_or_default();
    info!(username = %bot_username, "Authorized on Telegram");

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    tokio::fs::create_dir_all(&settings.download_dir).await?;

    let ytdlp = YtdlpSource::new(settings.ytdlp_path.clone(), settings.fetch_timeout());
    ytdlp.log_version().await;

    let admin_id = settings.admin_id();
    let storage_channel = settings.cache_channel_id();
    match admin_id {
        Some(id) => info!(admin_id = id, "Admin features enabled"),
        None => warn!("ADMIN_ID not set or invalid, admin features disabled"),
    }
    match storage_channel {
        Some(id) => info!(channel = id, "Durable audio cache enabled"),
        None => warn!("CACHE_CHANNEL_ID not set or invalid, downloads will not be cached"),
    }

    let state = Arc::new(BotState::new());
    let source: Arc<dyn MediaSource> = Arc::new(ytdlp);
    let gateway: Arc<dyn MessagingGateway> = Arc::new(TelegramGateway::new(bot.clone()));
    let coordinator = DownloadCoordinator::new(
        Arc::clone(&state),
        Arc::clone(&source),
        Arc::clone(&gateway),
        settings.download_dir.clone(),
    )
    .with_storage_channel(storage_channel);
    let router = Router::new(state, source, gateway, coordinator, admin_id, bot_username);

    info!("Bot is running...");

    Dispatcher::builder(bot, setup_handler())
        .dependencies(dptree::deps![router.clone()])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped, waiting for running tasks");
    if tokio::time::timeout(SHUTDOWN_GRACE, router.wait_idle())
        .await
        .is_err()
    {
        warn!("Shutdown grace period elapsed with tasks still running");
    }
    Ok(())
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_inline_query().endpoint(handle_inline_query))
        .branch(Update::filter_chosen_inline_result().endpoint(handle_chosen_result))
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(Update::filter_message().endpoint(handle_message))
}

async fn handle_inline_query(q: InlineQuery, router: Router) -> Result<(), teloxide::RequestError> {
    router
        .handle(InboundEvent::InlineQuery {
            query_id: q.id.to_string(),
            user_id: q.from.id.0.cast_signed(),
            query: q.query,
        })
        .await;
    respond(())
}

async fn handle_chosen_result(
    r: ChosenInlineResult,
    router: Router,
) -> Result<(), teloxide::RequestError> {
    router
        .handle(InboundEvent::ChosenInlineResult {
            user_id: r.from.id.0.cast_signed(),
            result_id: r.result_id,
        })
        .await;
    respond(())
}

async fn handle_callback(q: CallbackQuery, router: Router) -> Result<(), teloxide::RequestError> {
    let user_id = q.from.id.0.cast_signed();
    // Inline-mode messages carry no chat; answer in the user's private chat
    let chat_id = q.message.as_ref().map_or(user_id, |m| m.chat().id.0);
    router
        .handle(InboundEvent::Callback {
            callback_id: q.id.to_string(),
            chat_id,
            data: q.data,
        })
        .await;
    respond(())
}

async fn handle_message(msg: Message, router: Router) -> Result<(), teloxide::RequestError> {
    let text = msg.text().map(ToOwned::to_owned);
    if text.is_none() {
        debug!(chat_id = msg.chat.id.0, "Non-text message");
    }
    router
        .handle(InboundEvent::Message {
            chat_id: msg.chat.id.0,
            text,
        })
        .await;
    respond(())
}
