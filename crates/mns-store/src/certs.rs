use std::sync::Arc;
use std::time::Duration;

use mns_crypto::Certificate;
use mns_types::ContentHash;
use tracing::debug;

use crate::block::{routing_key, Block, BlockKind};
use crate::error::{StoreError, StoreResult};
use crate::timeout::{with_timeout, DEFAULT_PUT_TIMEOUT};
use crate::traits::ValueStore;

/// Candidates requested when fetching a certificate.
const CERTIFICATE_CANDIDATES: usize = 4;

/// Publishes and fetches certificates by content hash.
#[derive(Clone)]
pub struct CertificateManager {
    store: Arc<dyn ValueStore>,
    timeout: Duration,
}

impl CertificateManager {
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

    /// Content hash of a certificate's canonical encoding.
    pub fn certificate_hash(cert: &Certificate) -> StoreResult<ContentHash> {
        Ok(Block::certificate(cert)?.id())
    }

    /// Publish a certificate at `/cert/<hash>` and return its hash.
    pub async fn put(&self, cert: &Certificate) -> StoreResult<ContentHash> {
        let block = Block::certificate(cert)?;
        let hash = block.id();
        with_timeout(
            "put certificate",
            self.timeout,
            self.store.put_value(&block.routing_key(), block.encode()),
        )
        .await?;
        debug!(cert = %hash.short_hex(), subject = %cert.subject, "published certificate");
        Ok(hash)
    }

    /// Fetch the certificate whose content hash is `hash`.
    pub async fn get(&self, hash: &ContentHash) -> StoreResult<Certificate> {
        let key_path = routing_key(BlockKind::Certificate, hash);
        let candidates = with_timeout(
            "get certificate",
            self.timeout,
            self.store.get_values(&key_path, CERTIFICATE_CANDIDATES),
        )
        .await?;
        let index = select_certificate(&candidates)
            .ok_or_else(|| StoreError::NotFound(key_path.clone()))?;

        let block = Block::decode_kind(&candidates[index], BlockKind::Certificate).map_err(
            |e| StoreError::Decode {
                key: key_path.clone(),
                reason: e.to_string(),
            },
        )?;
        let computed = block.id();
        if computed != *hash {
            return Err(StoreError::HashMismatch {
                key: key_path,
                computed: computed.to_hex(),
            });
        }
        block.to_certificate()
    }
}

/// Pick one certificate among values found under the same content address.
///
/// Content addressing makes every valid candidate byte-identical, so the
/// first one is as good as any.
pub fn select_certificate(candidates: &[Vec<u8>]) -> Option<usize> {
    if candidates.is_empty() {
        None
    } else {
        Some(0)
    }
}

impl std::fmt::Debug for CertificateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateManager")
            .field("timeout", &self.timeout)
            .finish()
    }
}
