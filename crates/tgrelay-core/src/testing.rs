//! In-memory `RelayPort` used by unit tests.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{
    domain::{ChannelRef, ChatId, MessageId, MessageRef, ResolvedChat},
    errors::Error,
    messaging::{
        port::RelayPort,
        types::{Attribution, MediaKind, MediaRef, Message, RelayCapabilities},
    },
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    SendText,
    SendFile,
    Forward,
    CopyNative,
    Download,
    History,
}

#[derive(Clone, Copy, Debug)]
pub enum Failure {
    Restricted,
    Forbidden,
    Generic,
}

impl Failure {
    fn into_error(self) -> Error {
        match self {
            Failure::Restricted => Error::ForwardingRestricted("protected chat".to_string()),
            Failure::Forbidden => Error::WriteForbidden("not enough rights".to_string()),
            Failure::Generic => Error::External("boom".to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    SendText {
        target: ChatId,
        text: String,
        link: Option<String>,
        disable_link_preview: bool,
    },
    SendFile {
        target: ChatId,
        path: PathBuf,
        caption: Option<String>,
        existed: bool,
    },
    Forward(MessageId),
    CopyNative(MessageId),
    Download(MessageId),
    History(ChatId, Option<MessageId>, usize),
}

#[derive(Default)]
pub struct FakePort {
    calls: Mutex<Vec<(Instant, Call)>>,
    failures: Mutex<Vec<(Op, Failure)>>,
    history: Mutex<HashMap<i64, Vec<Message>>>,
    phantom_downloads: bool,
    no_history: bool,
    next_id: Mutex<i32>,
}

impl FakePort {
    /// Downloads return paths that were never written, so removal fails.
    pub fn with_phantom_downloads() -> Self {
        Self {
            phantom_downloads: true,
            ..Default::default()
        }
    }

    /// An adapter that cannot read chat history.
    pub fn without_history() -> Self {
        Self {
            no_history: true,
            ..Default::default()
        }
    }

    /// Fail the next call of `op` once.
    pub fn fail_once(&self, op: Op, failure: Failure) {
        self.failures.lock().unwrap().push((op, failure));
    }

    pub fn set_history(&self, chat: ChatId, messages: Vec<Message>) {
        self.history.lock().unwrap().insert(chat.0, messages);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, Call)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: Op, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push((Instant::now(), call));
        let mut failures = self.failures.lock().unwrap();
        if let Some(pos) = failures.iter().position(|(o, _)| *o == op) {
            let (_, failure) = failures.remove(pos);
            return Err(failure.into_error());
        }
        Ok(())
    }

    fn sent(&self, target: ChatId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        MessageRef {
            chat_id: target,
            message_id: MessageId(*guard),
        }
    }
}

#[async_trait]
impl RelayPort for FakePort {
    fn capabilities(&self) -> RelayCapabilities {
        RelayCapabilities {
            reads_history: !self.no_history,
        }
    }

    async fn resolve(&self, chat: &ChannelRef) -> Result<ResolvedChat> {
        match chat {
            ChannelRef::Id(id) => Ok(ResolvedChat {
                id: *id,
                title: None,
            }),
            ChannelRef::Handle(h) => Err(Error::External(format!("unknown chat {h}"))),
        }
    }

    async fn send_text(
        &self,
        target: ChatId,
        text: &str,
        attribution: Option<&Attribution>,
        disable_link_preview: bool,
    ) -> Result<MessageRef> {
        self.record(
            Op::SendText,
            Call::SendText {
                target,
                text: text.to_string(),
                link: attribution.map(|a| a.url.clone()),
                disable_link_preview,
            },
        )?;
        Ok(self.sent(target))
    }

    async fn send_file(
        &self,
        target: ChatId,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<MessageRef> {
        self.record(
            Op::SendFile,
            Call::SendFile {
                target,
                path: path.to_path_buf(),
                caption: caption.map(str::to_string),
                existed: path.exists(),
            },
        )?;
        Ok(self.sent(target))
    }

    async fn forward(&self, target: ChatId, msg: &Message) -> Result<MessageRef> {
        self.record(Op::Forward, Call::Forward(msg.id))?;
        Ok(self.sent(target))
    }

    async fn copy_native(&self, target: ChatId, msg: &Message) -> Result<MessageRef> {
        self.record(Op::CopyNative, Call::CopyNative(msg.id))?;
        Ok(self.sent(target))
    }

    async fn download_media(&self, msg: &Message, dir: &Path) -> Result<PathBuf> {
        self.record(Op::Download, Call::Download(msg.id))?;
        let path = dir.join(format!("fake_{}_{}.bin", msg.chat_id.0.unsigned_abs(), msg.id.0));
        if !self.phantom_downloads {
            std::fs::create_dir_all(dir)?;
            std::fs::write(&path, b"media")?;
        }
        Ok(path)
    }

    async fn history_page(
        &self,
        source: ChatId,
        after: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<Message>> {
        self.record(Op::History, Call::History(source, after, limit))?;
        let all = self
            .history
            .lock()
            .unwrap()
            .get(&source.0)
            .cloned()
            .ok_or_else(|| Error::Unsupported("no history".to_string()))?;
        Ok(all
            .into_iter()
            .filter(|m| after.map_or(true, |a| m.id > a))
            .take(limit)
            .collect())
    }
}

pub fn text_message(chat: i64, id: i32, text: &str) -> Message {
    Message {
        id: MessageId(id),
        chat_id: ChatId(chat),
        text: text.to_string(),
        caption: None,
        media: None,
        is_service: false,
        native_copy: false,
    }
}

pub fn photo_message(chat: i64, id: i32, caption: Option<&str>) -> Message {
    Message {
        caption: caption.map(str::to_string),
        media: Some(MediaRef {
            file_id: format!("file-{id}"),
            kind: MediaKind::Photo,
            file_name: None,
        }),
        ..text_message(chat, id, "")
    }
}

pub fn service_message(chat: i64, id: i32) -> Message {
    Message {
        is_service: true,
        ..text_message(chat, id, "")
    }
}
