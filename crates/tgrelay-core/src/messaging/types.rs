use crate::domain::{ChatId, MessageId};

/// Kind of media attached to a message; decides how a copy is re-sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Animation,
    Audio,
    Voice,
    Document,
    Sticker,
}

/// Opaque reference to a platform-hosted file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaRef {
    pub file_id: String,
    pub kind: MediaKind,
    pub file_name: Option<String>,
}

/// A message observed in a source chat (live update or history item).
///
/// Built once by the platform adapter and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub text: String,
    pub caption: Option<String>,
    pub media: Option<MediaRef>,
    /// Join/leave/pin/title-change and similar events rather than content.
    pub is_service: bool,
    /// The platform can copy this message natively as a new post.
    pub native_copy: bool,
}

impl Message {
    /// Text body, or the media caption when there is no text.
    pub fn body(&self) -> &str {
        if !self.text.is_empty() {
            return &self.text;
        }
        self.caption.as_deref().unwrap_or("")
    }
}

/// Link back to the original post, rendered by the adapter after the body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribution {
    pub label: String,
    pub url: String,
}

/// What a platform adapter can do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelayCapabilities {
    /// `history_page` returns real history (required for backfill).
    pub reads_history: bool,
}
