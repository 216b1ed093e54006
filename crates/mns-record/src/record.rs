use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{try_join_all, BoxFuture, FutureExt};
use mns_store::{with_timeout, Block, StoreResult, ValueStore};
use mns_types::RecordPath;
use tracing::info;

use crate::entry::{signable_payload, RecordEntry, ValidityType};
use crate::error::{RecordError, RecordResult};
use crate::validity::{CertValidity, Validity};
use crate::verification::{Signer, TrustWindow, Verification};

/// An immutable, signed record ready to be published at any sequence.
#[derive(Clone, Debug)]
pub struct Record {
    value: Vec<u8>,
    validity: Validity,
    verification: Verification,
    validity_type: ValidityType,
    validity_bytes: Vec<u8>,
    signature: Vec<u8>,
    ttl: Option<Duration>,
    dependencies: Vec<Block>,
    trust: TrustWindow,
}

impl Record {
    /// Build and sign a record.
    ///
    /// Certificate signers only support end-of-life validity, since the
    /// certificate payload carries an EOL next to the leaf hash.
    pub fn new(validity: Validity, signer: &Signer, value: impl Into<Vec<u8>>) -> RecordResult<Self> {
        let value = value.into();
        let (validity_type, validity_bytes) = match (signer, &validity) {
            (Signer::Key(_), v) => (v.validity_type(), v.encode()),
            (Signer::Certificate(c), Validity::Eol(eol)) => (
                ValidityType::Cert,
                CertValidity {
                    eol: *eol,
                    leaf: c.leaf_hash(),
                }
                .encode(),
            ),
            (Signer::Certificate(_), Validity::TimeRange { .. }) => {
                return Err(RecordError::Unsupported(
                    "time range validity cannot be combined with certificate verification".into(),
                ))
            }
        };
        let signature = signer
            .sign(&signable_payload(&value, &validity_bytes, validity_type))
            .to_vec();
        Ok(Self {
            value,
            validity,
            verification: signer.verification(),
            validity_type,
            validity_bytes,
            signature,
            ttl: None,
            dependencies: signer.dependencies(),
            trust: signer.trust_window(),
        })
    }

    /// Attach a cache hint.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    pub fn verification(&self) -> &Verification {
        &self.verification
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Validity window of the signing credentials.
    pub fn trust_window(&self) -> TrustWindow {
        self.trust
    }

    /// Instant after which readers stop accepting this record: the end of
    /// its validity or of its credentials, whichever comes first.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.trust.cap(self.validity.deadline())
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Blocks that must be published alongside the entry.
    pub fn dependencies(&self) -> &[Block] {
        &self.dependencies
    }

    /// Base path the record belongs at.
    pub fn path(&self) -> RecordPath {
        RecordPath::new(self.verification.root())
    }

    /// Wire entry at the given sequence.
    pub fn to_entry(&self, sequence: u64) -> RecordEntry {
        RecordEntry {
            value: self.value.clone(),
            signature: self.signature.clone(),
            validity_type: self.validity_type,
            validity: self.validity_bytes.clone(),
            sequence,
            ttl: self
                .ttl
                .map(|ttl| u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX)),
        }
    }

    /// Write the entry and every dependency concurrently.
    ///
    /// Each write is bounded by `timeout`. The publish succeeds only if every
    /// write does; the first failure is returned.
    pub async fn publish(
        &self,
        store: &dyn ValueStore,
        path: &RecordPath,
        sequence: u64,
        timeout: Duration,
    ) -> RecordResult<()> {
        if *path.root() != self.verification.root() {
            return Err(RecordError::PathMismatch {
                record: self.path().to_string(),
                path: path.to_string(),
            });
        }
        let entry_key = path.base().to_string();
        let entry = self.to_entry(sequence).encode_block()?;

        let mut writes: Vec<BoxFuture<'_, StoreResult<()>>> =
            Vec::with_capacity(1 + self.dependencies.len());
        writes.push(with_timeout("put record", timeout, store.put_value(&entry_key, entry)).boxed());
        for block in &self.dependencies {
            let key = block.routing_key();
            let bytes = block.encode();
            writes.push(
                async move { with_timeout("put dependency", timeout, store.put_value(&key, bytes)).await }
                    .boxed(),
            );
        }
        try_join_all(writes).await?;

        info!(
            path = %path.abbreviated(),
            sequence,
            dependencies = self.dependencies.len(),
            "published record"
        );
        Ok(())
    }
}
