//! The three ways of reproducing a message in the target chat.
//!
//! Strategies only report what happened; choosing between them and reacting to
//! rejections is the dispatch controller's job.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::{
    config::RelaySettings,
    dispatch::{Outcome, SkipReason, Strategy},
    errors::Error,
    links::message_link,
    messaging::{
        port::RelayPort,
        types::{Attribution, Message},
    },
    Result,
};

/// Label of the attribution link appended to rewritten posts.
pub const ATTRIBUTION_LABEL: &str = "original message";

/// Native forward, keeping provenance.
pub async fn forward(
    port: &dyn RelayPort,
    settings: &RelaySettings,
    msg: &Message,
) -> Result<Outcome> {
    port.forward(settings.target, msg).await?;
    info!(chat_id = %msg.chat_id, message_id = %msg.id, "forwarded");
    Ok(Outcome::Delivered(Strategy::Forward))
}

/// Re-create the message as an independent post.
///
/// Uses the platform copy primitive when the message supports it. Otherwise the
/// media (if any) is downloaded and re-uploaded with the cleaned caption; if that
/// fails for any reason the message is reposted as text instead.
pub async fn copy(
    port: &dyn RelayPort,
    settings: &RelaySettings,
    msg: &Message,
) -> Result<Outcome> {
    if msg.native_copy {
        port.copy_native(settings.target, msg).await?;
        info!(chat_id = %msg.chat_id, message_id = %msg.id, "copied");
        return Ok(Outcome::Delivered(Strategy::NativeCopy));
    }

    let text = settings.sanitizer.clean(msg.body());

    if msg.media.is_some() {
        return match copy_media(port, settings, msg, &text).await {
            Ok(()) => {
                info!(chat_id = %msg.chat_id, message_id = %msg.id, "copied media");
                Ok(Outcome::Delivered(Strategy::MediaCopy))
            }
            Err(e) => {
                warn!(
                    chat_id = %msg.chat_id,
                    message_id = %msg.id,
                    error = %e,
                    "media copy failed, reposting as text"
                );
                // Single hop: a rejection here must not trigger another fallback.
                text_only_repost(port, settings, msg)
                    .await
                    .map_err(demote_restriction)
            }
        };
    }

    if text.is_empty() {
        info!(chat_id = %msg.chat_id, message_id = %msg.id, "empty message, nothing to copy");
        return Ok(Outcome::Skipped(SkipReason::Empty));
    }

    port.send_text(settings.target, &text, None, true).await?;
    info!(chat_id = %msg.chat_id, message_id = %msg.id, "copied text");
    Ok(Outcome::Delivered(Strategy::TextCopy))
}

/// Repost the cleaned text with an attribution link, for chats that forbid
/// forwarding. Media cannot be carried over here.
pub async fn text_only_repost(
    port: &dyn RelayPort,
    settings: &RelaySettings,
    msg: &Message,
) -> Result<Outcome> {
    let text = settings.sanitizer.clean(msg.body());
    if text.is_empty() {
        info!(
            chat_id = %msg.chat_id,
            message_id = %msg.id,
            "media-only message in a protected chat, cannot repost"
        );
        return Ok(Outcome::Skipped(SkipReason::MediaOnly));
    }

    let link = attribution(msg);
    port.send_text(settings.target, &text, link.as_ref(), true).await?;
    info!(chat_id = %msg.chat_id, message_id = %msg.id, "reposted as text");
    Ok(Outcome::Delivered(Strategy::TextOnlyRepost))
}

fn attribution(msg: &Message) -> Option<Attribution> {
    message_link(msg.chat_id, msg.id).map(|url| Attribution {
        label: ATTRIBUTION_LABEL.to_string(),
        url,
    })
}

async fn copy_media(
    port: &dyn RelayPort,
    settings: &RelaySettings,
    msg: &Message,
    caption: &str,
) -> Result<()> {
    let path = port.download_media(msg, &settings.temp_dir).await?;
    let caption = (!caption.is_empty()).then_some(caption);
    let sent = port.send_file(settings.target, &path, caption).await;
    remove_transient(&path).await;
    sent.map(|_| ())
}

/// Best-effort removal of a downloaded file; failures are only logged.
async fn remove_transient(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed transient media"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "transient media already gone")
        }
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove transient media"),
    }
}

fn demote_restriction(e: Error) -> Error {
    match e {
        Error::ForwardingRestricted(detail) => {
            Error::External(format!("text repost rejected after media fallback: {detail}"))
        }
        other => other,
    }
}
