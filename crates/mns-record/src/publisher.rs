use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mns_store::ValueStore;
use mns_types::RecordPath;
use tracing::info;

use crate::config::RecordConfig;
use crate::error::RecordResult;
use crate::record::Record;
use crate::sequence::SequenceManager;
use crate::validity::Validity;
use crate::verification::Signer;

/// Outcome of a successful publish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedRecord {
    pub path: RecordPath,
    pub sequence: u64,
    pub value: Vec<u8>,
    /// Instant after which the record stops resolving.
    pub deadline: Option<DateTime<Utc>>,
    pub ttl: Option<Duration>,
}

/// Signs records and publishes them at the next sequence of their path.
#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn ValueStore>,
    sequences: SequenceManager,
    config: RecordConfig,
}

impl Publisher {
    pub fn new(store: Arc<dyn ValueStore>, config: RecordConfig) -> Self {
        Self {
            sequences: SequenceManager::new(store.clone(), &config),
            store,
            config,
        }
    }

    pub async fn publish(
        &self,
        signer: &Signer,
        validity: Validity,
        value: impl Into<Vec<u8>>,
    ) -> RecordResult<PublishedRecord> {
        self.publish_record(&Record::new(validity, signer, value)?).await
    }

    pub async fn publish_with_ttl(
        &self,
        signer: &Signer,
        validity: Validity,
        value: impl Into<Vec<u8>>,
        ttl: Duration,
    ) -> RecordResult<PublishedRecord> {
        let record = Record::new(validity, signer, value)?.with_ttl(ttl);
        self.publish_record(&record).await
    }

    /// Publish an already signed record at its own base path.
    pub async fn publish_record(&self, record: &Record) -> RecordResult<PublishedRecord> {
        let path = record.path();
        let sequence = self.sequences.next_sequence(&path).await?;
        record
            .publish(self.store.as_ref(), &path, sequence, self.config.put_timeout())
            .await?;
        info!(path = %path.abbreviated(), sequence, "record sequence advanced");
        Ok(PublishedRecord {
            path,
            sequence,
            value: record.value().to_vec(),
            deadline: record.deadline(),
            ttl: record.ttl(),
        })
    }

    pub fn sequences(&self) -> &SequenceManager {
        &self.sequences
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::RecordChecker;
    use crate::entry::RecordEntry;
    use crate::verifier::RecordVerifier;
    use chrono::Duration as ChronoDuration;
    use mns_crypto::{CertificateBuilder, SigningKey};
    use mns_store::InMemoryValueStore;

    fn setup() -> (Arc<InMemoryValueStore>, Publisher) {
        let store = Arc::new(InMemoryValueStore::new());
        let publisher = Publisher::new(store.clone(), RecordConfig::default());
        (store, publisher)
    }

    async fn fetch_best(store: &InMemoryValueStore, path: &RecordPath) -> RecordEntry {
        let candidates = store.get_values(&path.to_string(), 16).await.unwrap();
        let index = RecordChecker::new().select_record(&candidates).unwrap();
        RecordEntry::decode_block(&candidates[index]).unwrap()
    }

    #[tokio::test]
    async fn sequences_strictly_increase() {
        let (store, publisher) = setup();
        let signer = Signer::key(SigningKey::generate());
        let mut last = 0;
        for i in 0..4 {
            if i % 2 == 1 {
                store.clear_local();
            }
            let published = publisher
                .publish(&signer, Validity::unbounded(), format!("/ipfs/{i}"))
                .await
                .unwrap();
            assert!(published.sequence > last);
            last = published.sequence;
        }
        let best = fetch_best(&store, &signer.path()).await;
        assert_eq!(best.sequence, last);
        assert_eq!(best.value, b"/ipfs/3".to_vec());
    }

    #[tokio::test]
    async fn published_record_verifies() {
        let (store, publisher) = setup();
        let ca_key = SigningKey::generate();
        let ca = CertificateBuilder::new("ca").ca(true).self_signed(&ca_key).unwrap();
        let key = SigningKey::generate();
        let leaf = CertificateBuilder::new("leaf")
            .issued_by(&key.verifying_key(), &ca, &ca_key)
            .unwrap();
        let signer = Signer::certificate(key, leaf, ca).unwrap();
        let eol = Utc::now() + ChronoDuration::hours(1);

        let published = publisher
            .publish_with_ttl(&signer, Validity::eol(eol), "/ipfs/x", Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(published.sequence, 1);
        assert_eq!(published.deadline, Some(eol));
        assert_eq!(published.ttl, Some(Duration::from_secs(30)));

        let entry = fetch_best(&store, &published.path).await;
        assert_eq!(entry.ttl(), Some(Duration::from_secs(30)));
        RecordVerifier::new(store.clone(), Duration::from_secs(1))
            .verify_record(&published.path, &entry)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn deadline_is_capped_by_issuer_expiry() {
        let (_, publisher) = setup();
        let ca_key = SigningKey::generate();
        let ca_expiry = Utc::now().timestamp() + 300;
        let ca = CertificateBuilder::new("ca")
            .ca(true)
            .validity(0, ca_expiry)
            .self_signed(&ca_key)
            .unwrap();
        let key = SigningKey::generate();
        let leaf = CertificateBuilder::new("leaf")
            .issued_by(&key.verifying_key(), &ca, &ca_key)
            .unwrap();
        let signer = Signer::certificate(key, leaf, ca).unwrap();
        let eol = Utc::now() + ChronoDuration::hours(1);
        let published = publisher
            .publish(&signer, Validity::eol(eol), "/ipfs/x")
            .await
            .unwrap();
        assert_eq!(published.deadline, DateTime::from_timestamp(ca_expiry, 0));

        let key_signer = Signer::key(SigningKey::generate());
        let published = publisher
            .publish(&key_signer, Validity::eol(eol), "/ipfs/y")
            .await
            .unwrap();
        assert_eq!(published.deadline, Some(eol));
    }
}
