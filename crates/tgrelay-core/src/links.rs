//! Deep links back to the original message (`t.me/c/...`).

use crate::domain::{ChatId, MessageId};

/// Bot API ids of supergroups and channels carry this decimal prefix.
const SUPERGROUP_PREFIX: &str = "-100";

/// Link to a message in a supergroup/channel, e.g. `https://t.me/c/123456/42`.
///
/// Returns `None` for any other chat id shape (users, basic groups), in which
/// case callers simply omit the attribution. Handles never reach this point:
/// messages always carry the numeric id of the chat they came from.
pub fn message_link(chat_id: ChatId, message_id: MessageId) -> Option<String> {
    let raw = chat_id.0.to_string();
    let internal = raw.strip_prefix(SUPERGROUP_PREFIX)?;
    if internal.is_empty() || !internal.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("https://t.me/c/{internal}/{}", message_id.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_link_for_supergroup_ids() {
        assert_eq!(
            message_link(ChatId(-1001234567890), MessageId(42)).as_deref(),
            Some("https://t.me/c/1234567890/42")
        );
    }

    #[test]
    fn no_link_for_other_id_shapes() {
        assert_eq!(message_link(ChatId(-123456), MessageId(1)), None);
        assert_eq!(message_link(ChatId(1001234), MessageId(1)), None);
        assert_eq!(message_link(ChatId(-100), MessageId(1)), None);
        assert_eq!(message_link(ChatId(0), MessageId(1)), None);
    }
}
