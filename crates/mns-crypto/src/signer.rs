//! Ed25519 keys for signing record payloads.
//!
//! Records carry their signature as raw bytes, so verification works on
//! byte slices and reports a wrong length separately from a bad signature.

/// Length of an encoded Ed25519 signature.
pub const SIGNATURE_LEN: usize = 64;

/// Length of an encoded Ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Private half of a record-signing key pair.
#[derive(Clone)]
pub struct SigningKey(ed25519_dalek::SigningKey);

/// Public half of a record-signing key pair.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

/// A detached signature over a record payload.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl SigningKey {
    pub fn generate() -> Self {
        Self(ed25519_dalek::SigningKey::generate(&mut rand::thread_rng()))
    }

    /// Rebuild a key from its 32-byte seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&seed))
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    /// Sign `payload`. Ed25519 is deterministic: the same key and payload
    /// always give the same signature.
    pub fn sign(&self, payload: &[u8]) -> Signature {
        use ed25519_dalek::Signer;
        Signature(self.0.sign(payload).to_bytes())
    }
}

impl VerifyingKey {
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Result<Self, SignatureError> {
        ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|_| SignatureError::InvalidKey)
    }

    /// Parse a key as stored in a public-key block.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SignatureError> {
        let bytes: [u8; PUBLIC_KEY_LEN] =
            bytes.try_into().map_err(|_| SignatureError::InvalidKey)?;
        Self::from_bytes(bytes)
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.0.to_bytes()
    }

    pub fn verify(&self, payload: &[u8], signature: &Signature) -> Result<(), SignatureError> {
        use ed25519_dalek::Verifier;
        let signature = ed25519_dalek::Signature::from_bytes(&signature.0);
        self.0
            .verify(payload, &signature)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    /// Verify a signature as carried in a record entry.
    pub fn verify_bytes(&self, payload: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
        self.verify(payload, &Signature::from_slice(signature)?)
    }
}

impl Signature {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SignatureError> {
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| SignatureError::InvalidLength(bytes.len()))
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifyingKey({})", hex::encode(self.to_bytes()))
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}..)", hex::encode(&self.0[..8]))
    }
}

/// Errors from key parsing and signature checks.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature does not match payload")]
    InvalidSignature,
    #[error("signature must be {SIGNATURE_LEN} bytes, got {0}")]
    InvalidLength(usize),
    #[error("not a valid ed25519 public key")]
    InvalidKey,
}
