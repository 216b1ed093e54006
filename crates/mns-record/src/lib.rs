//! Record model for the mutable naming system.
//!
//! A record is a signed, versioned, expiring pointer published at a
//! [`RecordPath`](mns_types::RecordPath). This crate builds, signs and
//! publishes records, and decides whether a fetched record is trustworthy,
//! fresh, and the best among its competitors.
//!
//! # Architecture
//!
//! - **Validity** is the freshness policy: a fixed end-of-life or a time
//!   range with optional bounds.
//! - **Verification** is the trust policy: the path's root-id is either the
//!   hash of the signing key, or the hash of a CA certificate that issued the
//!   signing leaf certificate.
//! - **Selection** is a deterministic total order (sequence, then validity
//!   end/start, then raw bytes) so independent readers agree on one winner.
//! - **Sequencing** recovers the last published version from the local
//!   replica or the network so every publish strictly increases it.
//!
//! # Modules
//!
//! - [`entry`]: Wire struct [`RecordEntry`] and the signable payload
//! - [`validity`]: [`Validity`] and the certificate validity payload
//! - [`verification`]: [`Verification`] and the [`Signer`] capability
//! - [`record`]: [`Record`] construction and publishing
//! - [`checker`]: Freshness checks and best-record selection
//! - [`verifier`]: Key and certificate-chain signature checks, batched per path
//! - [`sequence`]: [`SequenceManager`]
//! - [`publisher`]: [`Publisher`] tying the above together

pub mod checker;
pub mod config;
pub mod entry;
pub mod error;
pub mod publisher;
pub mod record;
pub mod sequence;
pub mod validity;
pub mod verification;
pub mod verifier;

pub use checker::RecordChecker;
pub use config::RecordConfig;
pub use entry::{signable_payload, RecordEntry, ValidityType};
pub use error::{ErrorKind, RecordError, RecordResult};
pub use publisher::{PublishedRecord, Publisher};
pub use record::Record;
pub use sequence::SequenceManager;
pub use validity::{CertValidity, Validity};
pub use verification::{Signer, TrustWindow, Verification};
pub use verifier::{CandidateVerification, RecordVerifier, TrustAnchor};
