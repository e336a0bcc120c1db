use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use crate::{
    domain::{ChannelRef, ChatId},
    errors::Error,
    sanitize::Sanitizer,
    Result,
};

/// Primary strategy family for reproducing a message in the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RepostMode {
    /// Native forward with the "forwarded from" marker.
    #[default]
    Forward,
    /// Re-create the content as an independent post.
    Copy,
}

impl FromStr for RepostMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "forward" => Ok(Self::Forward),
            "copy" => Ok(Self::Copy),
            other => Err(Error::Config(format!(
                "FORWARD_MODE must be 'forward' or 'copy', got '{other}'"
            ))),
        }
    }
}

/// Typed configuration, read from the environment (and an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,

    // Routing
    pub sources: Vec<ChannelRef>,
    pub target: ChannelRef,
    pub mode: RepostMode,
    pub native_copy: bool,

    // Backfill
    pub backfill_last: usize,
    pub backfill_delay: Duration,

    // Text cleanup
    pub strip_prefixes: Vec<String>,

    // Transient media downloads
    pub temp_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let cfg = Self::from_lookup(env_str)?;

        // Downloads land here during manual copies.
        fs::create_dir_all(&cfg.temp_dir)?;

        Ok(cfg)
    }

    /// Build the config from an arbitrary variable lookup (env in production).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = required_token(&get)?;

        let sources = parse_channel_list(get("SOURCE_CHANNEL"))?;
        if sources.is_empty() {
            return Err(Error::Config(
                "SOURCE_CHANNEL environment variable is required".to_string(),
            ));
        }

        let target_raw = get("TARGET_CHANNEL").and_then(non_empty).ok_or_else(|| {
            Error::Config("TARGET_CHANNEL environment variable is required".to_string())
        })?;
        let target = ChannelRef::parse(&target_raw)
            .ok_or_else(|| Error::Config(format!("invalid TARGET_CHANNEL '{target_raw}'")))?;

        let mode = get("FORWARD_MODE")
            .map(|v| v.parse::<RepostMode>())
            .transpose()?
            .unwrap_or_default();
        let native_copy = parse_bool(get("NATIVE_COPY")).unwrap_or(true);

        let backfill_last = parse_num::<usize>("BACKFILL_LAST", get("BACKFILL_LAST"))?.unwrap_or(0);
        let backfill_delay = Duration::from_millis(
            parse_num::<u64>("BACKFILL_DELAY_MS", get("BACKFILL_DELAY_MS"))?.unwrap_or(250),
        );

        let strip_prefixes = get("STRIP_PREFIXES")
            .unwrap_or_default()
            .split('|')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let temp_dir = get("TEMP_DIR")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("tgrelay"));

        Ok(Self {
            telegram_bot_token,
            sources,
            target,
            mode,
            native_copy,
            backfill_last,
            backfill_delay,
            strip_prefixes,
            temp_dir,
        })
    }

    /// Credentials only; used by the chat lookup tool.
    pub fn load_bot_token() -> Result<String> {
        load_dotenv_if_present(Path::new(".env"));
        required_token(&env_str)
    }

    /// Freeze the runtime settings once chat references are resolved.
    pub fn relay_settings(&self, target: ChatId, sources: Vec<ChatId>) -> Result<Arc<RelaySettings>> {
        Ok(Arc::new(RelaySettings {
            target,
            sources,
            mode: self.mode,
            sanitizer: Sanitizer::new(&self.strip_prefixes)?,
            temp_dir: self.temp_dir.clone(),
            backfill: BackfillSettings {
                limit: self.backfill_last,
                delay: self.backfill_delay,
            },
        }))
    }
}

/// Immutable runtime settings shared by the dispatch controller and backfill.
#[derive(Clone, Debug)]
pub struct RelaySettings {
    pub target: ChatId,
    pub sources: Vec<ChatId>,
    pub mode: RepostMode,
    pub sanitizer: Sanitizer,
    pub temp_dir: PathBuf,
    pub backfill: BackfillSettings,
}

impl RelaySettings {
    pub fn is_source(&self, chat: ChatId) -> bool {
        self.sources.contains(&chat)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BackfillSettings {
    /// Messages replayed per source; 0 disables backfill.
    pub limit: usize,
    /// Pause after each replayed message.
    pub delay: Duration,
}

fn required_token(get: &impl Fn(&str) -> Option<String>) -> Result<String> {
    get("TELEGRAM_BOT_TOKEN").and_then(non_empty).ok_or_else(|| {
        Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
    })
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Fill unset variables from a `.env` file; the process environment wins.
fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };
    for (key, value) in parse_dotenv(&contents) {
        if env::var_os(&key).is_none() {
            env::set_var(key, value);
        }
    }
}

/// `KEY=value` pairs of a dotenv file, in order. Comments, blank lines and
/// lines without `=` are skipped; an `export ` prefix and one layer of
/// matching quotes are dropped.
fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| {
            let l = l.strip_prefix("export ").unwrap_or(l);
            let (k, v) = l.split_once('=')?;
            let key = k.trim();
            (!key.is_empty()).then(|| (key.to_string(), unquote(v.trim()).to_string()))
        })
        .collect()
}

fn unquote(v: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|&q| v.strip_prefix(q)?.strip_suffix(q))
        .unwrap_or(v)
}

fn parse_bool(v: Option<String>) -> Option<bool> {
    v.and_then(non_empty).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn parse_num<T: FromStr>(key: &str, v: Option<String>) -> Result<Option<T>> {
    let Some(raw) = v.and_then(non_empty) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got '{raw}'")))
}

fn parse_channel_list(v: Option<String>) -> Result<Vec<ChannelRef>> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            ChannelRef::parse(s)
                .ok_or_else(|| Error::Config(format!("invalid SOURCE_CHANNEL entry '{s}'")))
        })
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
