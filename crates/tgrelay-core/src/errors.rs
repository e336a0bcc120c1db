use std::path::PathBuf;

/// Core error type for the relay.
///
/// Adapter crates map platform failures into this type. The dispatch controller
/// pattern-matches the two rejection kinds (`ForwardingRestricted`,
/// `WriteForbidden`); every other variant is handled as a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    /// The source chat does not allow its content to be forwarded or copied.
    #[error("forwarding restricted by source chat: {0}")]
    ForwardingRestricted(String),

    /// The target chat rejects our writes (missing membership or rights).
    #[error("no write permission in target chat: {0}")]
    WriteForbidden(String),

    #[error("unsupported by platform: {0}")]
    Unsupported(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
