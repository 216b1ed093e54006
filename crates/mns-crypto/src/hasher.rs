use mns_types::ContentHash;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g., `"mns-pubkey-v1"`) that is
/// prepended to every hash computation, so a public key and a certificate
/// with identical bytes can never share an address.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for encoded public keys.
    pub const PUBLIC_KEY: Self = Self {
        domain: "mns-pubkey-v1",
    };
    /// Hasher for encoded certificates.
    pub const CERTIFICATE: Self = Self {
        domain: "mns-cert-v1",
    };
    /// Hasher for encoded record entries.
    pub const RECORD: Self = Self {
        domain: "mns-record-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ContentHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ContentHash::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected hash.
    pub fn verify(&self, data: &[u8], expected: &ContentHash) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
