//! Cryptographic primitives for the mutable naming system.
//!
//! Provides domain-separated BLAKE3 hashing, Ed25519 signing/verification,
//! and one-hop certificates binding a subject name to an Ed25519 key.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod cert;
pub mod hasher;
pub mod signer;

pub use cert::{Certificate, CertificateBuilder, CertificateError};
pub use hasher::ContentHasher;
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey, PUBLIC_KEY_LEN, SIGNATURE_LEN};
