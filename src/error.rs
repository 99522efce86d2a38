use crate::shared::SlotKey;

/// Why a file could not be bound to a key. Reported per file (or once per
/// batch for capacity) and never fatal.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ClipError {
    #[error("\"{name}\" is not an audio file ({media_type})")]
    InvalidMediaType { name: String, media_type: String },

    #[error("key {key} holds at most 10 clips, {remaining} more can be added")]
    CapacityExceeded { key: SlotKey, remaining: usize },

    #[error("could not read \"{name}\": {reason}")]
    Unreadable { name: String, reason: String },
}

/// Typed error for snapshot loading so callers can tell a missing file
/// apart from a bad one.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("stored bindings are corrupt: {0}")]
    Corrupt(String),

    #[error("could not read stored bindings: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for PersistError {
    fn from(e: serde_json::Error) -> Self {
        PersistError::Corrupt(e.to_string())
    }
}
