//! Chat lookup used to fill in `SOURCE_CHANNEL` / `TARGET_CHANNEL`.

use anyhow::anyhow;
use teloxide::Bot;

use tgrelay_core::{
    domain::{ChannelRef, ResolvedChat},
    messaging::port::RelayPort,
};

use crate::TelegramRelay;

pub async fn lookup(token: &str, query: &str) -> anyhow::Result<ResolvedChat> {
    let chat = ChannelRef::parse(query)
        .ok_or_else(|| anyhow!("not a chat id, @handle or t.me link: {query}"))?;
    let relay = TelegramRelay::new(Bot::new(token), false);
    Ok(relay.resolve(&chat).await?)
}

/// Human-readable summary printed by the lookup tool.
pub fn render_summary(chat: &ResolvedChat) -> String {
    format!(
        "Title: {}\nChat ID for .env: {}",
        chat.title.as_deref().unwrap_or("N/A"),
        chat.id
    )
}
