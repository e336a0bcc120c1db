//! Telegram adapter (teloxide).
//!
//! This crate implements the `tgrelay-core` RelayPort over the Telegram Bot API
//! and runs the live listener.

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;

use teloxide::{
    net::Download,
    prelude::*,
    types::{InputFile, MessageKind, ParseMode, Recipient},
};

use tokio::time::sleep;

pub mod lookup;
pub mod router;

use tgrelay_core::{
    domain::{ChannelRef, ChatId, MessageId, MessageRef, ResolvedChat},
    errors::Error,
    formatting::render_html,
    messaging::{
        port::RelayPort,
        types::{Attribution, MediaKind, MediaRef, Message, RelayCapabilities},
    },
    Result,
};

static DOWNLOAD_COUNTER: AtomicUsize = AtomicUsize::new(1);

#[derive(Clone)]
pub struct TelegramRelay {
    bot: Bot,
    native_copy: bool,
}

impl TelegramRelay {
    pub fn new(bot: Bot, native_copy: bool) -> Self {
        Self { bot, native_copy }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        match &e {
            teloxide::RequestError::Api(_) => classify_api_error(&e.to_string()),
            _ => Error::External(format!("telegram error: {e}")),
        }
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(wait) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(wait).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }

    /// Convert a teloxide message into the core model.
    pub fn to_core(&self, msg: &teloxide::types::Message) -> Message {
        Message {
            id: MessageId(msg.id.0),
            chat_id: ChatId(msg.chat.id.0),
            text: msg.text().unwrap_or_default().to_string(),
            caption: msg.caption().map(str::to_string),
            media: media_of(msg),
            is_service: !matches!(msg.kind, MessageKind::Common(_)),
            native_copy: self.native_copy,
        }
    }
}

fn media(file_id: &str, kind: MediaKind, file_name: Option<&String>) -> MediaRef {
    MediaRef {
        file_id: file_id.to_string(),
        kind,
        file_name: file_name.cloned(),
    }
}

fn media_of(msg: &teloxide::types::Message) -> Option<MediaRef> {
    if let Some(best) = msg.photo().and_then(|p| p.last()) {
        return Some(media(&best.file.id, MediaKind::Photo, None));
    }
    // Animations also carry a document; check them first.
    if let Some(a) = msg.animation() {
        return Some(media(&a.file.id, MediaKind::Animation, a.file_name.as_ref()));
    }
    if let Some(v) = msg.video() {
        return Some(media(&v.file.id, MediaKind::Video, v.file_name.as_ref()));
    }
    if let Some(a) = msg.audio() {
        return Some(media(&a.file.id, MediaKind::Audio, a.file_name.as_ref()));
    }
    if let Some(v) = msg.voice() {
        return Some(media(&v.file.id, MediaKind::Voice, None));
    }
    if let Some(d) = msg.document() {
        return Some(media(&d.file.id, MediaKind::Document, d.file_name.as_ref()));
    }
    if let Some(s) = msg.sticker() {
        return Some(media(&s.file.id, MediaKind::Sticker, None));
    }
    None
}

/// Map a Telegram API error description to the rejection kinds the relay
/// reacts to.
pub(crate) fn classify_api_error(detail: &str) -> Error {
    const RESTRICTED: &[&str] = &[
        "can't be forwarded",
        "can't be copied",
        "chat_forwards_restricted",
        "protected",
    ];
    const FORBIDDEN: &[&str] = &[
        "chat_write_forbidden",
        "not enough rights",
        "have no rights to send",
        "bot is not a member",
        "bot was kicked",
        "need administrator rights",
        "chat_admin_required",
    ];

    let lower = detail.to_lowercase();
    if RESTRICTED.iter().any(|m| lower.contains(m)) {
        return Error::ForwardingRestricted(detail.to_string());
    }
    if FORBIDDEN.iter().any(|m| lower.contains(m)) {
        return Error::WriteForbidden(detail.to_string());
    }
    Error::External(format!("telegram error: {detail}"))
}

fn extension_for(media: &MediaRef) -> String {
    if let Some(ext) = media
        .file_name
        .as_deref()
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
    {
        return ext.to_lowercase();
    }
    match media.kind {
        MediaKind::Photo => "jpg",
        MediaKind::Video | MediaKind::Animation => "mp4",
        MediaKind::Audio => "mp3",
        MediaKind::Voice => "ogg",
        MediaKind::Sticker => "webp",
        MediaKind::Document => "bin",
    }
    .to_string()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Upload {
    Photo,
    Video,
    Audio,
    Voice,
    Document,
}

fn upload_kind(path: &Path) -> Upload {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" | "png" => Upload::Photo,
        "mp4" | "mov" => Upload::Video,
        "mp3" | "m4a" => Upload::Audio,
        "ogg" | "oga" => Upload::Voice,
        _ => Upload::Document,
    }
}

#[async_trait]
impl RelayPort for TelegramRelay {
    fn capabilities(&self) -> RelayCapabilities {
        // The Bot API has no history endpoint.
        RelayCapabilities {
            reads_history: false,
        }
    }

    async fn resolve(&self, chat: &ChannelRef) -> Result<ResolvedChat> {
        let recipient = match chat {
            ChannelRef::Id(id) => Recipient::Id(Self::tg_chat(*id)),
            ChannelRef::Handle(h) => Recipient::ChannelUsername(h.clone()),
        };
        let found = self
            .with_retry(|| self.bot.get_chat(recipient.clone()))
            .await?;

        Ok(ResolvedChat {
            id: ChatId(found.id.0),
            title: found.title().map(str::to_string),
        })
    }

    async fn send_text(
        &self,
        target: ChatId,
        text: &str,
        attribution: Option<&Attribution>,
        disable_link_preview: bool,
    ) -> Result<MessageRef> {
        let html = render_html(text, attribution);
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(target), html.clone())
                    .parse_mode(ParseMode::Html)
                    .disable_web_page_preview(disable_link_preview)
            })
            .await?;

        Ok(MessageRef {
            chat_id: target,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn send_file(
        &self,
        target: ChatId,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<MessageRef> {
        let chat = Self::tg_chat(target);
        let caption = caption.map(str::to_string);
        let input = || InputFile::file(path.to_path_buf());

        let msg = match upload_kind(path) {
            Upload::Photo => {
                self.with_retry(|| {
                    let mut req = self.bot.send_photo(chat, input());
                    if let Some(c) = &caption {
                        req = req.caption(c.clone());
                    }
                    req
                })
                .await?
            }
            Upload::Video => {
                self.with_retry(|| {
                    let mut req = self.bot.send_video(chat, input());
                    if let Some(c) = &caption {
                        req = req.caption(c.clone());
                    }
                    req
                })
                .await?
            }
            Upload::Audio => {
                self.with_retry(|| {
                    let mut req = self.bot.send_audio(chat, input());
                    if let Some(c) = &caption {
                        req = req.caption(c.clone());
                    }
                    req
                })
                .await?
            }
            Upload::Voice => {
                self.with_retry(|| {
                    let mut req = self.bot.send_voice(chat, input());
                    if let Some(c) = &caption {
                        req = req.caption(c.clone());
                    }
                    req
                })
                .await?
            }
            Upload::Document => {
                self.with_retry(|| {
                    let mut req = self.bot.send_document(chat, input());
                    if let Some(c) = &caption {
                        req = req.caption(c.clone());
                    }
                    req
                })
                .await?
            }
        };

        Ok(MessageRef {
            chat_id: target,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn forward(&self, target: ChatId, msg: &Message) -> Result<MessageRef> {
        let sent = self
            .with_retry(|| {
                self.bot.forward_message(
                    Self::tg_chat(target),
                    Self::tg_chat(msg.chat_id),
                    Self::tg_msg_id(msg.id),
                )
            })
            .await?;

        Ok(MessageRef {
            chat_id: target,
            message_id: MessageId(sent.id.0),
        })
    }

    async fn copy_native(&self, target: ChatId, msg: &Message) -> Result<MessageRef> {
        let id = self
            .with_retry(|| {
                self.bot.copy_message(
                    Self::tg_chat(target),
                    Self::tg_chat(msg.chat_id),
                    Self::tg_msg_id(msg.id),
                )
            })
            .await?;

        Ok(MessageRef {
            chat_id: target,
            message_id: MessageId(id.0),
        })
    }

    async fn download_media(&self, msg: &Message, dir: &Path) -> Result<PathBuf> {
        let media = msg.media.as_ref().ok_or_else(|| Error::InvalidPath {
            path: dir.to_path_buf(),
            reason: format!("message {} has no media", msg.id),
        })?;

        let file = self
            .with_retry(|| self.bot.get_file(media.file_id.clone()))
            .await?;

        tokio::fs::create_dir_all(dir).await?;
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let n = DOWNLOAD_COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = dir.join(format!("media_{ts}_{n}.{}", extension_for(media)));

        let mut dst = tokio::fs::File::create(&path).await?;
        if let Err(e) = self.bot.download_file(&file.path, &mut dst).await {
            drop(dst);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(Error::External(format!("telegram download failed: {e}")));
        }

        Ok(path)
    }

    async fn history_page(
        &self,
        _source: ChatId,
        _after: Option<MessageId>,
        _limit: usize,
    ) -> Result<Vec<Message>> {
        Err(Error::Unsupported(
            "the Bot API does not expose chat history".to_string(),
        ))
    }
}
