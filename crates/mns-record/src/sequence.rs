use std::sync::Arc;
use std::time::Duration;

use mns_store::{with_timeout, ValueStore};
use mns_types::RecordPath;
use tracing::debug;

use crate::checker::RecordChecker;
use crate::config::RecordConfig;
use crate::entry::RecordEntry;
use crate::error::RecordResult;

/// Recovers the last published sequence number of a path.
///
/// The local replica is consulted first. On a miss the network is queried
/// under its own deadline and the best candidate is used. A path nobody has
/// published yields 0.
#[derive(Clone)]
pub struct SequenceManager {
    store: Arc<dyn ValueStore>,
    checker: RecordChecker,
    timeout: Duration,
    candidates: usize,
}

impl SequenceManager {
    pub fn new(store: Arc<dyn ValueStore>, config: &RecordConfig) -> Self {
        Self {
            store,
            checker: RecordChecker::new(),
            timeout: config.sequence_timeout(),
            candidates: config.candidate_count,
        }
    }

    /// Sequence of the most recent entry known for `path`, or 0.
    ///
    /// A network timeout is an error rather than 0, so a slow network cannot
    /// make a publisher roll its sequence back.
    pub async fn previous_sequence(&self, path: &RecordPath) -> RecordResult<u64> {
        let key = path.base().to_string();

        match self.store.get_local_value(&key).await {
            Ok(Some(bytes)) => match RecordEntry::decode_block(&bytes) {
                Ok(entry) => {
                    debug!(path = %path.abbreviated(), sequence = entry.sequence, "sequence from local replica");
                    return Ok(entry.sequence);
                }
                Err(e) => debug!(path = %path.abbreviated(), error = %e, "unusable local entry"),
            },
            Ok(None) => {}
            Err(e) => debug!(path = %path.abbreviated(), error = %e, "local lookup failed"),
        }

        let candidates = match with_timeout(
            "get previous sequence",
            self.timeout,
            self.store.get_values(&key, self.candidates),
        )
        .await
        {
            Ok(candidates) => candidates,
            Err(mns_store::StoreError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let sequence = match self.checker.select_record(&candidates) {
            Ok(index) => RecordEntry::decode_block(&candidates[index])?.sequence,
            Err(_) => 0,
        };
        debug!(
            path = %path.abbreviated(),
            sequence,
            candidates = candidates.len(),
            "sequence from network"
        );
        Ok(sequence)
    }

    /// The sequence the next publish at `path` must use.
    pub async fn next_sequence(&self, path: &RecordPath) -> RecordResult<u64> {
        Ok(self.previous_sequence(path).await?.saturating_add(1))
    }
}

impl std::fmt::Debug for SequenceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceManager")
            .field("timeout", &self.timeout)
            .field("candidates", &self.candidates)
            .finish()
    }
}
