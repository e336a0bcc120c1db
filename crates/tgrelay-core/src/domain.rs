use std::fmt;

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric, unique within a chat).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chat as written in configuration: numeric id or public handle.
///
/// Handles are normalized to the `@name` form the Bot API expects.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChannelRef {
    Id(ChatId),
    Handle(String),
}

impl ChannelRef {
    /// Parse `-100123`, `@name`, `name`, `t.me/name` or `https://t.me/name`.
    pub fn parse(raw: &str) -> Option<Self> {
        let v = raw.trim();
        if v.is_empty() {
            return None;
        }
        if let Ok(id) = v.parse::<i64>() {
            return Some(Self::Id(ChatId(id)));
        }

        let name = v
            .strip_prefix("https://")
            .or_else(|| v.strip_prefix("http://"))
            .unwrap_or(v);
        let name = name
            .strip_prefix("t.me/")
            .or_else(|| name.strip_prefix("telegram.me/"))
            .unwrap_or(name);
        let name = name.trim_start_matches('@').trim_end_matches('/');

        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return None;
        }
        Some(Self::Handle(format!("@{name}")))
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Handle(h) => f.write_str(h),
        }
    }
}

/// A chat reference resolved by the platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedChat {
    pub id: ChatId,
    pub title: Option<String>,
}
