//! One-hop certificates binding a subject name to an Ed25519 key.
//!
//! A certificate is an immutable statement by an issuer: "`subject` holds
//! `public_key` between `not_before` and `not_after`". Root (issuing)
//! certificates are self-signed CAs; leaf certificates are signed by a root.
//! The canonical encoding is bincode with a fixed field order, so the same
//! certificate always encodes to the same bytes and content hash.

use serde::{Deserialize, Serialize};

use crate::signer::{SignatureError, SigningKey, VerifyingKey};

/// An issued certificate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Issuer-assigned serial number.
    pub serial: u64,
    /// Name of the key holder.
    pub subject: String,
    /// Subject name of the issuing certificate.
    pub issuer: String,
    /// Ed25519 public key of the subject.
    pub public_key: [u8; 32],
    /// Whether this certificate may issue other certificates.
    pub is_ca: bool,
    /// Start of validity, unix seconds.
    pub not_before: i64,
    /// End of validity, unix seconds.
    pub not_after: i64,
    /// Issuer signature over [`Certificate::tbs_bytes`].
    pub signature: Vec<u8>,
}

/// The signed portion of a certificate, borrowed for encoding.
#[derive(Serialize)]
struct TbsCertificate<'a> {
    serial: u64,
    subject: &'a str,
    issuer: &'a str,
    public_key: &'a [u8; 32],
    is_ca: bool,
    not_before: i64,
    not_after: i64,
}

impl Certificate {
    /// Canonical to-be-signed bytes (every field except the signature).
    pub fn tbs_bytes(&self) -> Result<Vec<u8>, CertificateError> {
        let tbs = TbsCertificate {
            serial: self.serial,
            subject: &self.subject,
            issuer: &self.issuer,
            public_key: &self.public_key,
            is_ca: self.is_ca,
            not_before: self.not_before,
            not_after: self.not_after,
        };
        bincode::serialize(&tbs).map_err(|e| CertificateError::Encoding(e.to_string()))
    }

    /// Canonical encoding of the whole certificate.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CertificateError> {
        bincode::serialize(self).map_err(|e| CertificateError::Encoding(e.to_string()))
    }

    /// Decode a certificate from its canonical encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CertificateError> {
        bincode::deserialize(bytes).map_err(|e| CertificateError::Encoding(e.to_string()))
    }

    /// The subject's verifying key.
    pub fn verifying_key(&self) -> Result<VerifyingKey, CertificateError> {
        VerifyingKey::from_bytes(self.public_key).map_err(CertificateError::Key)
    }

    /// Returns `true` if `unix_secs` falls inside the validity window.
    pub fn is_valid_at(&self, unix_secs: i64) -> bool {
        self.not_before <= unix_secs && unix_secs <= self.not_after
    }

    /// Check that `issuer` signed this certificate.
    ///
    /// The issuer must be a CA whose subject matches this certificate's
    /// issuer name, and its key must verify the signature over the
    /// to-be-signed bytes.
    pub fn check_signed_by(&self, issuer: &Certificate) -> Result<(), CertificateError> {
        if !issuer.is_ca {
            return Err(CertificateError::NotCa {
                subject: issuer.subject.clone(),
            });
        }
        if issuer.subject != self.issuer {
            return Err(CertificateError::IssuerMismatch {
                expected: self.issuer.clone(),
                actual: issuer.subject.clone(),
            });
        }
        let tbs = self.tbs_bytes()?;
        issuer
            .verifying_key()?
            .verify_bytes(&tbs, &self.signature)
            .map_err(|_| CertificateError::BadSignature {
                subject: self.subject.clone(),
            })
    }
}

/// Builder for self-signed and issued certificates.
#[derive(Clone, Debug)]
pub struct CertificateBuilder {
    serial: u64,
    subject: String,
    is_ca: bool,
    not_before: i64,
    not_after: i64,
}

impl CertificateBuilder {
    /// Start a certificate for `subject`, valid from the epoch to `i64::MAX`.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            serial: 1,
            subject: subject.into(),
            is_ca: false,
            not_before: 0,
            not_after: i64::MAX,
        }
    }

    pub fn serial(mut self, serial: u64) -> Self {
        self.serial = serial;
        self
    }

    pub fn ca(mut self, is_ca: bool) -> Self {
        self.is_ca = is_ca;
        self
    }

    /// Validity window in unix seconds (inclusive).
    pub fn validity(mut self, not_before: i64, not_after: i64) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    /// Issue a self-signed certificate for `key`.
    pub fn self_signed(self, key: &SigningKey) -> Result<Certificate, CertificateError> {
        let issuer = self.subject.clone();
        self.sign(key.verifying_key(), issuer, key)
    }

    /// Issue a certificate for `subject_key`, signed by `issuer`.
    pub fn issued_by(
        self,
        subject_key: &VerifyingKey,
        issuer: &Certificate,
        issuer_key: &SigningKey,
    ) -> Result<Certificate, CertificateError> {
        if issuer.public_key != issuer_key.verifying_key().to_bytes() {
            return Err(CertificateError::Key(SignatureError::InvalidKey));
        }
        self.sign(*subject_key, issuer.subject.clone(), issuer_key)
    }

    fn sign(
        self,
        subject_key: VerifyingKey,
        issuer: String,
        issuer_key: &SigningKey,
    ) -> Result<Certificate, CertificateError> {
        let mut cert = Certificate {
            serial: self.serial,
            subject: self.subject,
            issuer,
            public_key: subject_key.to_bytes(),
            is_ca: self.is_ca,
            not_before: self.not_before,
            not_after: self.not_after,
            signature: Vec::new(),
        };
        cert.signature = issuer_key.sign(&cert.tbs_bytes()?).to_vec();
        Ok(cert)
    }
}

/// Errors from certificate handling.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CertificateError {
    #[error("certificate encoding error: {0}")]
    Encoding(String),

    #[error("certificate key error: {0}")]
    Key(#[from] SignatureError),

    #[error("issuer {subject:?} is not a CA")]
    NotCa { subject: String },

    #[error("issuer mismatch: certificate names {expected:?}, got {actual:?}")]
    IssuerMismatch { expected: String, actual: String },

    #[error("bad issuer signature on certificate {subject:?}")]
    BadSignature { subject: String },
}
