use std::time::Duration;

use mns_crypto::CertificateError;

/// Errors from value store and manager operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No value exists under the key.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation did not complete within its deadline.
    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    /// The backend refused the operation.
    #[error("store rejected {key}: {reason}")]
    Rejected { key: String, reason: String },

    /// Fetched bytes do not hash to the requested content hash.
    #[error("hash mismatch for {key}: computed {computed}")]
    HashMismatch { key: String, computed: String },

    /// Fetched bytes could not be decoded.
    #[error("decode error for {key}: {reason}")]
    Decode { key: String, reason: String },

    /// Block carries a kind tag this version does not know.
    #[error("unknown block kind tag {0:#04x}")]
    UnknownBlockKind(u8),

    /// Object could not be encoded for storage.
    #[error("encode error: {0}")]
    Encode(#[from] CertificateError),
}

impl StoreError {
    /// Returns `true` for fetch-side failures (missing or slow data), as
    /// opposed to data that was fetched but is unusable.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Timeout { .. } | Self::Rejected { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
