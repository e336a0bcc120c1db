use std::sync::Arc;

use anyhow::{anyhow, bail};
use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tracing::{debug, info};

use tgrelay_core::{
    backfill,
    config::{Config, RelaySettings},
    dispatch::Relay,
    domain::ChatId,
    messaging::{
        port::RelayPort,
        throttled::{ThrottleConfig, ThrottledRelay},
    },
};

use crate::TelegramRelay;

/// Resolve chats, run the backfill, then relay new posts until the bot stops.
pub async fn run(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let me = bot.get_me().await?;
    info!(username = %me.username(), mode = ?cfg.mode, "tgrelay started");

    // The throttling decorator sits on top of the raw adapter; the adapter
    // itself still retries once on a 429 RetryAfter.
    let telegram = Arc::new(TelegramRelay::new(bot.clone(), cfg.native_copy));
    let port: Arc<dyn RelayPort> = Arc::new(ThrottledRelay::new(
        telegram.clone(),
        ThrottleConfig::default(),
    ));

    let target = port
        .resolve(&cfg.target)
        .await
        .map_err(|e| anyhow!("cannot resolve TARGET_CHANNEL {}: {e}", cfg.target))?;
    info!(chat_id = %target.id, title = ?target.title, "target chat");

    let mut sources = Vec::with_capacity(cfg.sources.len());
    for source in &cfg.sources {
        let chat = port
            .resolve(source)
            .await
            .map_err(|e| anyhow!("cannot resolve SOURCE_CHANNEL {source}: {e}"))?;
        info!(chat_id = %chat.id, title = ?chat.title, "source chat");
        sources.push(chat.id);
    }
    if sources.contains(&target.id) {
        bail!("target chat {} is also a source; refusing to relay in a loop", target.id);
    }

    let settings = cfg.relay_settings(target.id, sources)?;
    let relay = Arc::new(Relay::new(port, settings));

    backfill::ensure_supported(&relay)?;
    backfill::run(&relay).await;
    info!("listening for new messages");

    let handler = dptree::entry()
        .branch(Update::filter_channel_post().endpoint(handle_post))
        .branch(Update::filter_message().endpoint(handle_post));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![relay, telegram])
        .default_handler(|upd| async move {
            debug!(update_id = ?upd.id, "ignored update");
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_post(
    msg: Message,
    relay: Arc<Relay>,
    telegram: Arc<TelegramRelay>,
) -> ResponseResult<()> {
    if !should_relay(relay.settings(), &msg) {
        return Ok(());
    }

    let outcome = relay.dispatch(&telegram.to_core(&msg)).await;
    debug!(chat_id = msg.chat.id.0, message_id = msg.id.0, ?outcome, "dispatched");
    Ok(())
}

/// Only posts from a configured source are relayed.
fn should_relay(settings: &RelaySettings, msg: &Message) -> bool {
    settings.is_source(ChatId(msg.chat.id.0))
}
