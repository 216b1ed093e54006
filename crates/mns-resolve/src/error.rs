use mns_record::RecordError;
use mns_store::StoreError;
use thiserror::Error;

/// Errors from name resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("resolution depth must be at least 1")]
    InvalidDepth,

    #[error("no resolver accepts {0}")]
    NoResolver(String),

    #[error("record error: {0}")]
    Record(#[from] RecordError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("dns lookup for {domain} failed: {reason}")]
    Dns { domain: String, reason: String },

    #[error("nothing published at {0}")]
    NotFound(String),

    #[error("resolution cycle through {0}")]
    Cycle(String),

    #[error("resolution cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),
}

impl ResolveError {
    pub(crate) fn name(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Record(e) => e.is_transient(),
            Self::Store(_) | Self::Dns { .. } | Self::NotFound(_) => true,
            _ => false,
        }
    }
}

pub type ResolveResult<T> = std::result::Result<T, ResolveError>;
