use chrono::{DateTime, Utc};
use mns_crypto::{Certificate, Signature, SigningKey, VerifyingKey};
use mns_store::{Block, KeyManager};
use mns_types::{ContentHash, RecordPath};

use crate::entry::{RecordEntry, ValidityType};
use crate::error::{RecordError, RecordResult};
use crate::validity::CertValidity;

/// Trust policy of a record: who may sign for its path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verification {
    /// The path root is the hash of the signing key.
    Key { key: ContentHash },
    /// The path root is the hash of `issuer`, which issued `leaf`, whose key
    /// signed the record.
    Certificate {
        leaf: ContentHash,
        issuer: ContentHash,
    },
}

impl Verification {
    /// The hash a path published under this policy must have as root-id.
    pub fn root(&self) -> ContentHash {
        match self {
            Self::Key { key } => *key,
            Self::Certificate { issuer, .. } => *issuer,
        }
    }

    /// The policy an entry found at `path` claims.
    pub fn from_entry(path: &RecordPath, entry: &RecordEntry) -> RecordResult<Self> {
        match entry.validity_type {
            ValidityType::Eol | ValidityType::TimeRange => Ok(Self::Key { key: *path.root() }),
            ValidityType::Cert => Ok(Self::Certificate {
                leaf: CertValidity::decode(&entry.validity)?.leaf,
                issuer: *path.root(),
            }),
        }
    }
}

/// Interval in which a record's signing credentials are valid.
///
/// Key-verified records are unbounded. Certificate-verified records are
/// bounded by the intersection of the leaf and issuer validity windows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrustWindow {
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
}

impl TrustWindow {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn of_chain(leaf: &Certificate, issuer: &Certificate) -> Self {
        Self {
            not_before: instant(leaf.not_before.max(issuer.not_before)),
            not_after: instant(leaf.not_after.min(issuer.not_after)),
        }
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.not_before.map_or(true, |t| t <= now) && self.not_after.map_or(true, |t| now <= t)
    }

    /// The earlier of `deadline` and the end of this window.
    pub fn cap(&self, deadline: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        match (deadline, self.not_after) {
            (Some(d), Some(t)) => Some(d.min(t)),
            (d, t) => d.or(t),
        }
    }
}

/// Unix seconds outside chrono's range are treated as unbounded.
fn instant(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// The capability to sign records, plus the trust material a reader needs
/// to check the signature.
#[derive(Clone, Debug)]
pub enum Signer {
    Key(SigningKey),
    Certificate(CertificateSigner),
}

/// A leaf key with its certificate and the issuing CA certificate.
#[derive(Clone)]
pub struct CertificateSigner {
    key: SigningKey,
    leaf: Certificate,
    issuer: Certificate,
    leaf_block: Block,
    issuer_block: Block,
}

impl CertificateSigner {
    pub fn leaf(&self) -> &Certificate {
        &self.leaf
    }

    pub fn issuer(&self) -> &Certificate {
        &self.issuer
    }

    pub fn leaf_hash(&self) -> ContentHash {
        self.leaf_block.id()
    }

    pub fn issuer_hash(&self) -> ContentHash {
        self.issuer_block.id()
    }
}

impl std::fmt::Debug for CertificateSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateSigner")
            .field("leaf", &self.leaf.subject)
            .field("issuer", &self.issuer.subject)
            .finish()
    }
}

impl Signer {
    pub fn key(key: SigningKey) -> Self {
        Self::Key(key)
    }

    /// A certificate signer. The leaf must certify `key` and be signed by
    /// `issuer`.
    pub fn certificate(
        key: SigningKey,
        leaf: Certificate,
        issuer: Certificate,
    ) -> RecordResult<Self> {
        if leaf.public_key != key.verifying_key().to_bytes() {
            return Err(RecordError::MalformedChain(format!(
                "leaf certificate {} does not certify the signing key",
                leaf.subject
            )));
        }
        leaf.check_signed_by(&issuer)
            .map_err(|e| RecordError::MalformedChain(e.to_string()))?;
        let block = |cert: &Certificate| {
            Block::certificate(cert).map_err(|e| RecordError::MalformedChain(e.to_string()))
        };
        let leaf_block = block(&leaf)?;
        let issuer_block = block(&issuer)?;
        Ok(Self::Certificate(CertificateSigner {
            key,
            leaf,
            issuer,
            leaf_block,
            issuer_block,
        }))
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        match self {
            Self::Key(key) => key.verifying_key(),
            Self::Certificate(c) => c.key.verifying_key(),
        }
    }

    pub fn verification(&self) -> Verification {
        match self {
            Self::Key(key) => Verification::Key {
                key: KeyManager::key_hash(&key.verifying_key()),
            },
            Self::Certificate(c) => Verification::Certificate {
                leaf: c.leaf_hash(),
                issuer: c.issuer_hash(),
            },
        }
    }

    /// Root-id of the paths this signer may publish under.
    pub fn root(&self) -> ContentHash {
        self.verification().root()
    }

    /// Base path this signer publishes under.
    pub fn path(&self) -> RecordPath {
        RecordPath::new(self.root())
    }

    /// Validity window of the credentials behind this signer.
    pub fn trust_window(&self) -> TrustWindow {
        match self {
            Self::Key(_) => TrustWindow::unbounded(),
            Self::Certificate(c) => TrustWindow::of_chain(&c.leaf, &c.issuer),
        }
    }

    /// Blocks a reader must be able to fetch to verify records by this signer.
    pub fn dependencies(&self) -> Vec<Block> {
        match self {
            Self::Key(key) => vec![Block::public_key(&key.verifying_key())],
            Self::Certificate(c) => vec![c.leaf_block.clone(), c.issuer_block.clone()],
        }
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        match self {
            Self::Key(key) => key.sign(message),
            Self::Certificate(c) => c.key.sign(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mns_crypto::CertificateBuilder;
    use mns_store::BlockKind;

    fn chain() -> (SigningKey, Certificate, Certificate, SigningKey) {
        let ca_key = SigningKey::generate();
        let ca = CertificateBuilder::new("ca")
            .ca(true)
            .self_signed(&ca_key)
            .unwrap();
        let leaf_key = SigningKey::generate();
        let leaf = CertificateBuilder::new("leaf")
            .issued_by(&leaf_key.verifying_key(), &ca, &ca_key)
            .unwrap();
        (leaf_key, leaf, ca, ca_key)
    }

    #[test]
    fn key_signer_root_is_key_hash() {
        let key = SigningKey::generate();
        let signer = Signer::key(key.clone());
        let expected = KeyManager::key_hash(&key.verifying_key());
        assert_eq!(signer.root(), expected);
        assert_eq!(signer.path(), RecordPath::new(expected));
        let deps = signer.dependencies();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].kind, BlockKind::PublicKey);
        assert_eq!(deps[0].id(), expected);
    }

    #[test]
    fn certificate_signer_root_is_issuer_hash() {
        let (key, leaf, ca, _) = chain();
        let signer = Signer::certificate(key, leaf.clone(), ca.clone()).unwrap();
        let issuer = Block::certificate(&ca).unwrap().id();
        let leaf_hash = Block::certificate(&leaf).unwrap().id();
        assert_eq!(signer.root(), issuer);
        assert_eq!(
            signer.verification(),
            Verification::Certificate {
                leaf: leaf_hash,
                issuer
            }
        );
        let ids: Vec<_> = signer.dependencies().iter().map(Block::id).collect();
        assert_eq!(ids, vec![leaf_hash, issuer]);
    }

    #[test]
    fn certificate_signer_rejects_foreign_key() {
        let (_, leaf, ca, _) = chain();
        assert!(matches!(
            Signer::certificate(SigningKey::generate(), leaf, ca),
            Err(RecordError::MalformedChain(_))
        ));
    }

    #[test]
    fn certificate_signer_rejects_unrelated_issuer() {
        let (key, leaf, _, _) = chain();
        let (_, _, other_ca, _) = chain();
        assert!(matches!(
            Signer::certificate(key, leaf, other_ca),
            Err(RecordError::MalformedChain(_))
        ));
    }

    #[test]
    fn trust_window_is_chain_intersection() {
        let ca_key = SigningKey::generate();
        let ca = CertificateBuilder::new("ca")
            .ca(true)
            .validity(100, 10_000)
            .self_signed(&ca_key)
            .unwrap();
        let key = SigningKey::generate();
        let leaf = CertificateBuilder::new("leaf")
            .validity(500, 20_000)
            .issued_by(&key.verifying_key(), &ca, &ca_key)
            .unwrap();
        let window = Signer::certificate(key, leaf, ca).unwrap().trust_window();
        assert_eq!(window.not_before, DateTime::from_timestamp(500, 0));
        assert_eq!(window.not_after, DateTime::from_timestamp(10_000, 0));
        assert!(!window.contains(DateTime::from_timestamp(499, 0).unwrap()));
        assert!(window.contains(DateTime::from_timestamp(10_000, 0).unwrap()));
        assert!(!window.contains(DateTime::from_timestamp(10_001, 0).unwrap()));

        let eol = DateTime::from_timestamp(50_000, 0);
        assert_eq!(window.cap(eol), window.not_after);
        assert_eq!(window.cap(None), window.not_after);
    }

    #[test]
    fn key_signer_window_is_unbounded() {
        let window = Signer::key(SigningKey::generate()).trust_window();
        assert_eq!(window, TrustWindow::unbounded());
        assert!(window.contains(Utc::now()));
        let eol = Some(Utc::now());
        assert_eq!(window.cap(eol), eol);
    }

    #[test]
    fn default_certificate_validity_is_unbounded_after_epoch() {
        let (key, leaf, ca, _) = chain();
        let window = Signer::certificate(key, leaf, ca).unwrap().trust_window();
        assert_eq!(window.not_after, None);
        assert!(window.contains(Utc::now()));
    }

    #[test]
    fn verification_from_entry() {
        let root = ContentHash::digest(b"root");
        let path = RecordPath::new(root);
        let leaf = ContentHash::digest(b"leaf");
        let mut entry = RecordEntry {
            value: Vec::new(),
            signature: Vec::new(),
            validity_type: ValidityType::Eol,
            validity: Vec::new(),
            sequence: 0,
            ttl: None,
        };
        assert_eq!(
            Verification::from_entry(&path, &entry).unwrap(),
            Verification::Key { key: root }
        );

        entry.validity_type = ValidityType::Cert;
        entry.validity = CertValidity {
            eol: chrono::Utc::now(),
            leaf,
        }
        .encode();
        assert_eq!(
            Verification::from_entry(&path, &entry).unwrap(),
            Verification::Certificate { leaf, issuer: root }
        );
    }
}
