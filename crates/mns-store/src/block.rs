use mns_crypto::{Certificate, ContentHasher, VerifyingKey};
use mns_types::{ContentHash, NAMESPACE};

use crate::error::{StoreError, StoreResult};

/// The kind of payload a block carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Raw 32-byte Ed25519 public key.
    PublicKey,
    /// Canonically encoded [`Certificate`].
    Certificate,
    /// Encoded record entry.
    Record,
}

impl BlockKind {
    /// One-byte wire tag.
    pub fn tag(&self) -> u8 {
        match self {
            Self::PublicKey => 0x01,
            Self::Certificate => 0x02,
            Self::Record => 0x03,
        }
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: u8) -> StoreResult<Self> {
        match tag {
            0x01 => Ok(Self::PublicKey),
            0x02 => Ok(Self::Certificate),
            0x03 => Ok(Self::Record),
            other => Err(StoreError::UnknownBlockKind(other)),
        }
    }

    /// Routing namespace under which blocks of this kind are published.
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::PublicKey => "pk",
            Self::Certificate => "cert",
            Self::Record => NAMESPACE,
        }
    }

    fn hasher(&self) -> &'static ContentHasher {
        match self {
            Self::PublicKey => &ContentHasher::PUBLIC_KEY,
            Self::Certificate => &ContentHasher::CERTIFICATE,
            Self::Record => &ContentHasher::RECORD,
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PublicKey => write!(f, "public-key"),
            Self::Certificate => write!(f, "certificate"),
            Self::Record => write!(f, "record"),
        }
    }
}

/// Routing key `/{namespace}/{hash}` for a block kind.
///
/// Public keys and certificates live at their own content hash. Records live
/// at the record path, whose root-id is the hash of the trust anchor.
pub fn routing_key(kind: BlockKind, hash: &ContentHash) -> String {
    format!("/{}/{}", kind.namespace(), hash)
}

/// A kind tag plus payload bytes.
///
/// Wire form is `[1 byte kind tag][payload]`, letting a generic decoder
/// dispatch on the tag before interpreting the payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub data: Vec<u8>,
}

impl Block {
    pub fn new(kind: BlockKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// Block holding a public key.
    pub fn public_key(key: &VerifyingKey) -> Self {
        Self::new(BlockKind::PublicKey, key.to_bytes().to_vec())
    }

    /// Block holding a certificate.
    pub fn certificate(cert: &Certificate) -> StoreResult<Self> {
        Ok(Self::new(BlockKind::Certificate, cert.to_bytes()?))
    }

    /// Domain-separated content hash of the payload.
    pub fn id(&self) -> ContentHash {
        self.kind.hasher().hash(&self.data)
    }

    /// Routing key this block is published under when content addressed.
    pub fn routing_key(&self) -> String {
        routing_key(self.kind, &self.id())
    }

    /// Encode to wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.data.len());
        out.push(self.kind.tag());
        out.extend_from_slice(&self.data);
        out
    }

    /// Decode from wire form.
    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        let (&tag, data) = bytes.split_first().ok_or_else(|| StoreError::Decode {
            key: String::new(),
            reason: "empty block".into(),
        })?;
        Ok(Self::new(BlockKind::from_tag(tag)?, data.to_vec()))
    }

    /// Decode and require a specific kind.
    pub fn decode_kind(bytes: &[u8], kind: BlockKind) -> StoreResult<Self> {
        let block = Self::decode(bytes)?;
        if block.kind != kind {
            return Err(StoreError::Decode {
                key: String::new(),
                reason: format!("expected {kind} block, got {}", block.kind),
            });
        }
        Ok(block)
    }

    /// Interpret a public key block.
    pub fn to_public_key(&self) -> StoreResult<VerifyingKey> {
        self.expect_kind(BlockKind::PublicKey)?;
        VerifyingKey::from_slice(&self.data).map_err(|e| StoreError::Decode {
            key: self.routing_key(),
            reason: e.to_string(),
        })
    }

    /// Interpret a certificate block.
    pub fn to_certificate(&self) -> StoreResult<Certificate> {
        self.expect_kind(BlockKind::Certificate)?;
        Certificate::from_bytes(&self.data).map_err(|e| StoreError::Decode {
            key: self.routing_key(),
            reason: e.to_string(),
        })
    }

    fn expect_kind(&self, kind: BlockKind) -> StoreResult<()> {
        if self.kind != kind {
            return Err(StoreError::Decode {
                key: self.routing_key(),
                reason: format!("expected {kind} block, got {}", self.kind),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mns_crypto::{CertificateBuilder, SigningKey};

    #[test]
    fn encode_decode_roundtrip() {
        let block = Block::new(BlockKind::Record, b"entry bytes".to_vec());
        let decoded = Block::decode(&block.encode()).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(matches!(
            Block::decode(&[0x7f, 1, 2]),
            Err(StoreError::UnknownBlockKind(0x7f))
        ));
        assert!(matches!(Block::decode(&[]), Err(StoreError::Decode { .. })));
    }

    #[test]
    fn decode_kind_enforces_kind() {
        let block = Block::new(BlockKind::Certificate, vec![1, 2, 3]);
        assert!(Block::decode_kind(&block.encode(), BlockKind::PublicKey).is_err());
        assert!(Block::decode_kind(&block.encode(), BlockKind::Certificate).is_ok());
    }

    #[test]
    fn same_bytes_different_kinds_have_different_ids() {
        let a = Block::new(BlockKind::PublicKey, vec![9; 32]);
        let b = Block::new(BlockKind::Certificate, vec![9; 32]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn public_key_block_roundtrip() {
        let key = SigningKey::generate().verifying_key();
        let block = Block::public_key(&key);
        assert_eq!(block.to_public_key().unwrap(), key);
        assert!(block.routing_key().starts_with("/pk/"));
        assert!(block.to_certificate().is_err());
    }

    #[test]
    fn certificate_block_roundtrip() {
        let key = SigningKey::generate();
        let cert = CertificateBuilder::new("root")
            .ca(true)
            .self_signed(&key)
            .unwrap();
        let block = Block::certificate(&cert).unwrap();
        assert_eq!(block.to_certificate().unwrap(), cert);
        assert_eq!(block.routing_key(), format!("/cert/{}", block.id()));
    }

    #[test]
    fn record_routing_key_uses_record_namespace() {
        let hash = ContentHash::digest(b"anchor");
        assert_eq!(
            routing_key(BlockKind::Record, &hash),
            format!("/ipns/{hash}")
        );
    }
}
