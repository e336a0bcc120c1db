//! Per-message decision logic: pick a strategy by mode, run it, and react to
//! platform rejections with at most one fallback hop.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::{
    config::{RelaySettings, RepostMode},
    errors::Error,
    messaging::{port::RelayPort, types::Message},
    strategies,
};

/// How a message ended up in the target chat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Forward,
    NativeCopy,
    MediaCopy,
    TextCopy,
    TextOnlyRepost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Join/leave/pin and other service events.
    Service,
    /// No media and no text left after cleanup.
    Empty,
    /// Only media, but the source forbids forwarding it.
    MediaOnly,
}

/// Terminal state of one dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Delivered(Strategy),
    Skipped(SkipReason),
    /// The target refused the write; needs operator action.
    WriteForbidden,
    /// Any other failure; the message is not retried.
    Dropped,
}

/// Dispatch controller shared by live updates and backfill.
#[derive(Clone)]
pub struct Relay {
    port: Arc<dyn RelayPort>,
    settings: Arc<RelaySettings>,
}

impl Relay {
    pub fn new(port: Arc<dyn RelayPort>, settings: Arc<RelaySettings>) -> Self {
        Self { port, settings }
    }

    pub fn port(&self) -> &dyn RelayPort {
        self.port.as_ref()
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Reproduce `msg` in the target chat. Never fails: every error is logged
    /// and folded into the returned [`Outcome`].
    pub async fn dispatch(&self, msg: &Message) -> Outcome {
        if msg.is_service {
            debug!(chat_id = %msg.chat_id, message_id = %msg.id, "service message, skipping");
            return Outcome::Skipped(SkipReason::Service);
        }

        let port = self.port.as_ref();
        let settings = self.settings.as_ref();

        let primary = match settings.mode {
            RepostMode::Forward => strategies::forward(port, settings, msg).await,
            RepostMode::Copy => strategies::copy(port, settings, msg).await,
        };

        match primary {
            Ok(outcome) => outcome,
            Err(Error::ForwardingRestricted(detail)) => {
                info!(
                    chat_id = %msg.chat_id,
                    message_id = %msg.id,
                    %detail,
                    "source forbids forwarding, reposting as text"
                );
                match strategies::text_only_repost(port, settings, msg).await {
                    Ok(outcome) => outcome,
                    Err(e) => self.settle(msg, e),
                }
            }
            Err(e) => self.settle(msg, e),
        }
    }

    fn settle(&self, msg: &Message, err: Error) -> Outcome {
        match err {
            Error::WriteForbidden(detail) => {
                error!(
                    target_chat = %self.settings.target,
                    message_id = %msg.id,
                    %detail,
                    "cannot post in the target chat; make the bot an admin with posting rights"
                );
                Outcome::WriteForbidden
            }
            other => {
                error!(
                    chat_id = %msg.chat_id,
                    message_id = %msg.id,
                    error = %other,
                    "failed to relay message"
                );
                Outcome::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::BackfillSettings,
        domain::ChatId,
        sanitize::Sanitizer,
        testing::{photo_message, service_message, text_message, Call, Failure, FakePort, Op},
    };
    use std::{path::PathBuf, time::Duration};

    const SOURCE: i64 = -1005550001;
    const TARGET: ChatId = ChatId(-1005550002);

    fn relay(mode: RepostMode) -> (Arc<FakePort>, Relay) {
        let port = Arc::new(FakePort::default());
        let settings = Arc::new(RelaySettings {
            target: TARGET,
            sources: vec![ChatId(SOURCE)],
            mode,
            sanitizer: Sanitizer::default(),
            temp_dir: PathBuf::from(format!("/tmp/tgrelay-dispatch-{}", std::process::id())),
            backfill: BackfillSettings {
                limit: 0,
                delay: Duration::ZERO,
            },
        });
        (port.clone(), Relay::new(port, settings))
    }

    fn sent_texts(port: &FakePort) -> Vec<(String, Option<String>)> {
        port.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SendText { text, link, .. } => Some((text, link)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn forward_mode_forwards() {
        let (port, relay) = relay(RepostMode::Forward);
        let msg = text_message(SOURCE, 1, "hi");
        assert_eq!(
            relay.dispatch(&msg).await,
            Outcome::Delivered(Strategy::Forward)
        );
        assert_eq!(port.calls(), vec![Call::Forward(msg.id)]);
    }

    #[tokio::test]
    async fn restricted_forward_falls_back_to_text_once() {
        let (port, relay) = relay(RepostMode::Forward);
        port.fail_once(Op::Forward, Failure::Restricted);
        let msg = text_message(SOURCE, 8, "Forwarded message\nNews");

        assert_eq!(
            relay.dispatch(&msg).await,
            Outcome::Delivered(Strategy::TextOnlyRepost)
        );
        assert_eq!(
            sent_texts(&port),
            vec![(
                "News".to_string(),
                Some("https://t.me/c/5550001/8".to_string())
            )]
        );
    }

    #[tokio::test]
    async fn failed_fallback_is_not_retried() {
        let (port, relay) = relay(RepostMode::Forward);
        port.fail_once(Op::Forward, Failure::Restricted);
        port.fail_once(Op::SendText, Failure::Restricted);
        let msg = text_message(SOURCE, 9, "News");

        assert_eq!(relay.dispatch(&msg).await, Outcome::Dropped);
        assert_eq!(port.calls().len(), 2, "forward + one text attempt");
    }

    #[tokio::test]
    async fn restricted_media_only_message_is_skipped() {
        let (port, relay) = relay(RepostMode::Forward);
        port.fail_once(Op::Forward, Failure::Restricted);
        let msg = photo_message(SOURCE, 10, None);

        assert_eq!(
            relay.dispatch(&msg).await,
            Outcome::Skipped(SkipReason::MediaOnly)
        );
        assert_eq!(port.calls(), vec![Call::Forward(msg.id)]);
    }

    #[tokio::test]
    async fn write_forbidden_stops_without_fallback() {
        let (port, relay) = relay(RepostMode::Forward);
        port.fail_once(Op::Forward, Failure::Forbidden);

        let first = text_message(SOURCE, 1, "a");
        let second = text_message(SOURCE, 2, "b");
        assert_eq!(relay.dispatch(&first).await, Outcome::WriteForbidden);
        assert_eq!(
            relay.dispatch(&second).await,
            Outcome::Delivered(Strategy::Forward)
        );
        assert_eq!(
            port.calls(),
            vec![Call::Forward(first.id), Call::Forward(second.id)]
        );
    }

    #[tokio::test]
    async fn generic_errors_drop_the_message() {
        let (port, relay) = relay(RepostMode::Forward);
        port.fail_once(Op::Forward, Failure::Generic);
        assert_eq!(
            relay.dispatch(&text_message(SOURCE, 1, "a")).await,
            Outcome::Dropped
        );
        assert_eq!(port.calls().len(), 1);
    }

    #[tokio::test]
    async fn copy_mode_applies_the_same_rejection_handling() {
        let (port, relay) = relay(RepostMode::Copy);
        let native = Message {
            native_copy: true,
            ..text_message(SOURCE, 3, "text")
        };

        port.fail_once(Op::CopyNative, Failure::Restricted);
        assert_eq!(
            relay.dispatch(&native).await,
            Outcome::Delivered(Strategy::TextOnlyRepost)
        );

        port.fail_once(Op::CopyNative, Failure::Forbidden);
        assert_eq!(relay.dispatch(&native).await, Outcome::WriteForbidden);

        port.fail_once(Op::SendText, Failure::Generic);
        assert_eq!(
            relay.dispatch(&text_message(SOURCE, 4, "plain")).await,
            Outcome::Dropped
        );
    }

    #[tokio::test]
    async fn service_messages_are_skipped() {
        let (port, relay) = relay(RepostMode::Forward);
        assert_eq!(
            relay.dispatch(&service_message(SOURCE, 1)).await,
            Outcome::Skipped(SkipReason::Service)
        );
        assert!(port.calls().is_empty());
    }

    #[tokio::test]
    async fn blank_text_after_cleanup_counts_as_absent() {
        let (port, relay) = relay(RepostMode::Copy);
        let msg = text_message(SOURCE, 5, "📢 Forwarded message\n   ");
        assert_eq!(
            relay.dispatch(&msg).await,
            Outcome::Skipped(SkipReason::Empty)
        );
        assert!(port.calls().is_empty());
    }
}
