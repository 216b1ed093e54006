use std::sync::Arc;
use std::time::Duration;

use mns_crypto::VerifyingKey;
use mns_types::ContentHash;
use tracing::debug;

use crate::block::{routing_key, Block, BlockKind};
use crate::error::{StoreError, StoreResult};
use crate::timeout::{with_timeout, DEFAULT_PUT_TIMEOUT};
use crate::traits::ValueStore;

/// Publishes and fetches public keys by content hash.
#[derive(Clone)]
pub struct KeyManager {
    store: Arc<dyn ValueStore>,
    timeout: Duration,
}

impl KeyManager {
    pub fn new(store: Arc<dyn ValueStore>) -> Self {
        Self {
            store,
            timeout: DEFAULT_PUT_TIMEOUT,
        }
    }

    /// Override the per-operation deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Content hash of a public key, i.e. the root-id of key-verified paths.
    pub fn key_hash(key: &VerifyingKey) -> ContentHash {
        Block::public_key(key).id()
    }

    /// Publish a key at `/pk/<hash>` and return its hash.
    pub async fn put(&self, key: &VerifyingKey) -> StoreResult<ContentHash> {
        let block = Block::public_key(key);
        let hash = block.id();
        let key_path = block.routing_key();
        with_timeout(
            "put public key",
            self.timeout,
            self.store.put_value(&key_path, block.encode()),
        )
        .await?;
        debug!(key = %hash.short_hex(), "published public key");
        Ok(hash)
    }

    /// Fetch the key whose content hash is `hash`.
    pub async fn get(&self, hash: &ContentHash) -> StoreResult<VerifyingKey> {
        let key_path = routing_key(BlockKind::PublicKey, hash);
        let bytes = with_timeout(
            "get public key",
            self.timeout,
            self.store.get_value(&key_path),
        )
        .await?;
        let block = Block::decode_kind(&bytes, BlockKind::PublicKey).map_err(|e| {
            StoreError::Decode {
                key: key_path.clone(),
                reason: e.to_string(),
            }
        })?;
        let computed = block.id();
        if computed != *hash {
            return Err(StoreError::HashMismatch {
                key: key_path,
                computed: computed.to_hex(),
            });
        }
        block.to_public_key()
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("timeout", &self.timeout)
            .finish()
    }
}
