use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChannelRef, ChatId, MessageId, MessageRef, ResolvedChat},
    messaging::{
        port::RelayPort,
        types::{Attribution, Message, RelayCapabilities},
    },
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* Telegram API calls (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between posts into the same chat.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40), // ~25/sec
            per_chat_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

/// Next free instant, globally and per target chat.
#[derive(Debug)]
struct Schedule {
    cfg: ThrottleConfig,
    global: Instant,
    chats: HashMap<ChatId, Instant>,
}

impl Schedule {
    fn new(cfg: ThrottleConfig) -> Self {
        Self {
            cfg,
            global: Instant::now(),
            chats: HashMap::new(),
        }
    }

    /// Book the earliest slot that respects both spacings and return how long
    /// the caller has to wait for it. `chat` is `None` for calls that do not
    /// post anything.
    fn book(&mut self, chat: Option<ChatId>) -> Duration {
        let now = Instant::now();
        let mut start = self.global.max(now);
        if let Some(chat) = chat {
            if let Some(&free) = self.chats.get(&chat) {
                start = start.max(free);
            }
            self.chats.insert(chat, start + self.cfg.per_chat_min_interval);
        }
        self.global = start + self.cfg.global_min_interval;
        start - now
    }
}

/// RelayPort decorator that spaces out outbound calls.
///
/// Posting calls are limited per target chat and globally; lookups, downloads
/// and history reads only take a global slot. This reduces 429 answers, it
/// does not rule them out.
pub struct ThrottledRelay {
    inner: Arc<dyn RelayPort>,
    schedule: Mutex<Schedule>,
}

impl ThrottledRelay {
    pub fn new(inner: Arc<dyn RelayPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            schedule: Mutex::new(Schedule::new(cfg)),
        }
    }

    async fn wait_for_slot(&self, chat: Option<ChatId>) {
        let wait = self.schedule.lock().await.book(chat);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }

    async fn throttle_chat(&self, chat: ChatId) {
        self.wait_for_slot(Some(chat)).await;
    }

    async fn throttle_global(&self) {
        self.wait_for_slot(None).await;
    }
}

#[async_trait::async_trait]
impl RelayPort for ThrottledRelay {
    fn capabilities(&self) -> RelayCapabilities {
        self.inner.capabilities()
    }

    async fn resolve(&self, chat: &ChannelRef) -> Result<ResolvedChat> {
        self.throttle_global().await;
        self.inner.resolve(chat).await
    }

    async fn send_text(
        &self,
        target: ChatId,
        text: &str,
        attribution: Option<&Attribution>,
        disable_link_preview: bool,
    ) -> Result<MessageRef> {
        self.throttle_chat(target).await;
        self.inner
            .send_text(target, text, attribution, disable_link_preview)
            .await
    }

    async fn send_file(
        &self,
        target: ChatId,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<MessageRef> {
        self.throttle_chat(target).await;
        self.inner.send_file(target, path, caption).await
    }

    async fn forward(&self, target: ChatId, msg: &Message) -> Result<MessageRef> {
        self.throttle_chat(target).await;
        self.inner.forward(target, msg).await
    }

    async fn copy_native(&self, target: ChatId, msg: &Message) -> Result<MessageRef> {
        self.throttle_chat(target).await;
        self.inner.copy_native(target, msg).await
    }

    async fn download_media(&self, msg: &Message, dir: &Path) -> Result<PathBuf> {
        self.throttle_global().await;
        self.inner.download_media(msg, dir).await
    }

    async fn history_page(
        &self,
        source: ChatId,
        after: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<Message>> {
        self.throttle_global().await;
        self.inner.history_page(source, after, limit).await
    }
}
