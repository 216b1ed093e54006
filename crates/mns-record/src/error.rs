//! Error types for record operations.

use mns_store::StoreError;
use mns_types::TypeError;
use thiserror::Error;

/// Coarse classification of a [`RecordError`].
///
/// Callers use this to treat "exists but stale" differently from garbage,
/// and trust failures differently from a flaky network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad path, bad payload, unknown type. Never worth retrying.
    Malformed,
    /// Expired or not yet valid.
    Stale,
    /// Signature, chain-of-trust, or missing key/certificate failure.
    Trust,
    /// Network or store failure, including not-found-on-network.
    Io,
    /// Candidates were returned but none of them could be used.
    NoRecords,
}

/// Errors that can occur while building, publishing, or checking records.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The path could not be parsed or built.
    #[error("invalid path: {0}")]
    Path(#[from] TypeError),

    /// The record entry could not be decoded.
    #[error("malformed record: {0}")]
    Malformed(String),

    /// The validity payload could not be parsed for its type.
    #[error("malformed {validity_type} validity: {reason}")]
    MalformedValidity {
        validity_type: &'static str,
        reason: String,
    },

    /// The validity type tag is not known to this version.
    #[error("unknown validity type {0}")]
    UnknownValidityType(u32),

    /// The validity and verification policies cannot be combined.
    #[error("unsupported record: {0}")]
    Unsupported(String),

    /// The signer's certificate chain is inconsistent.
    #[error("malformed certificate chain: {0}")]
    MalformedChain(String),

    /// The record's trust anchor does not match the path it is published at.
    #[error("record root {record} does not match path {path}")]
    PathMismatch { record: String, path: String },

    /// The record's end of life has passed.
    #[error("record for {path} expired at {at}")]
    Expired { path: String, at: String },

    /// The record's validity range has not started.
    #[error("record for {path} is not valid until {at}")]
    Pending { path: String, at: String },

    /// The signature does not verify, or the signing key is unavailable.
    #[error("invalid signature on record for {path}: {reason}")]
    SignatureInvalid { path: String, reason: String },

    /// The certificate chain does not establish trust.
    #[error("untrusted certificate chain for {path}: {reason}")]
    ChainInvalid { path: String, reason: String },

    /// The network returned no record for the path.
    #[error("no record found for {0}")]
    NotFound(String),

    /// Candidates were returned but none were usable.
    #[error("no usable records among {count} candidates")]
    NoUsableRecords { count: usize },

    /// Store or network failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl RecordError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Path(_)
            | Self::Malformed(_)
            | Self::MalformedValidity { .. }
            | Self::UnknownValidityType(_)
            | Self::Unsupported(_)
            | Self::MalformedChain(_)
            | Self::PathMismatch { .. } => ErrorKind::Malformed,
            Self::Expired { .. } | Self::Pending { .. } => ErrorKind::Stale,
            Self::SignatureInvalid { .. } | Self::ChainInvalid { .. } => ErrorKind::Trust,
            Self::NotFound(_) | Self::Store(_) => ErrorKind::Io,
            Self::NoUsableRecords { .. } => ErrorKind::NoRecords,
        }
    }

    /// Returns `true` if the same call may succeed later without any change
    /// to the published data.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Io
    }
}

/// Convenience type alias for record operations.
pub type RecordResult<T> = std::result::Result<T, RecordError>;
