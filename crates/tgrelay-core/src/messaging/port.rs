use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{
    domain::{ChannelRef, ChatId, MessageId, MessageRef, ResolvedChat},
    messaging::types::{Attribution, Message, RelayCapabilities},
    Result,
};

/// Hexagonal port over the messaging platform.
///
/// Rejections the relay reacts to are reported as tagged errors:
/// `Error::ForwardingRestricted` when the source chat disallows forwarding or
/// copying, `Error::WriteForbidden` when the target refuses our posts. Any other
/// error is treated as a generic platform failure.
#[async_trait]
pub trait RelayPort: Send + Sync {
    fn capabilities(&self) -> RelayCapabilities;

    async fn resolve(&self, chat: &ChannelRef) -> Result<ResolvedChat>;

    /// Send `text` verbatim (no markup is interpreted), followed by the
    /// attribution link when one is given.
    async fn send_text(
        &self,
        target: ChatId,
        text: &str,
        attribution: Option<&Attribution>,
        disable_link_preview: bool,
    ) -> Result<MessageRef>;

    async fn send_file(
        &self,
        target: ChatId,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<MessageRef>;

    /// Native forward, keeping the "forwarded from" marker.
    async fn forward(&self, target: ChatId, msg: &Message) -> Result<MessageRef>;

    /// Native copy as a new post. Only called when `msg.native_copy` is set.
    async fn copy_native(&self, target: ChatId, msg: &Message) -> Result<MessageRef>;

    /// Download the message media into `dir` and return the local path.
    async fn download_media(&self, msg: &Message, dir: &Path) -> Result<PathBuf>;

    /// One page of chat history in chronological order: up to `limit` messages
    /// with an id greater than `after` (from the very first message when `None`).
    /// An empty page means the history is exhausted.
    async fn history_page(
        &self,
        source: ChatId,
        after: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<Message>>;
}
