use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mns_record::{
    RecordChecker, RecordConfig, RecordEntry, RecordError, RecordVerifier, TrustWindow, Validity,
};
use mns_store::{with_timeout, ValueStore};
use mns_types::{ContentHash, RecordPath};
use tracing::{debug, warn};

use crate::error::ResolveResult;
use crate::resolver::{Hop, NameResolver, IPNS_PREFIX};

/// Resolves `/ipns/<hash>` names through signed records.
///
/// Every candidate is verified against trust material fetched once per
/// path, the best verified candidate is selected, and only then is
/// freshness checked. An expired winner is an error; the resolver never
/// falls back to an older record. Hop deadlines never outlive the signing
/// credentials.
#[derive(Clone)]
pub struct RecordResolver {
    store: Arc<dyn ValueStore>,
    verifier: RecordVerifier,
    checker: RecordChecker,
    timeout: Duration,
    candidates: usize,
}

impl RecordResolver {
    pub fn new(store: Arc<dyn ValueStore>, config: &RecordConfig) -> Self {
        Self {
            verifier: RecordVerifier::new(store.clone(), config.get_timeout()),
            store,
            checker: RecordChecker::new(),
            timeout: config.get_timeout(),
            candidates: config.candidate_count,
        }
    }

    /// Fetch, verify and select the current entry for `path`.
    ///
    /// Returns the winner with the validity window of the credentials that
    /// signed it.
    pub async fn resolve_entry(&self, path: &RecordPath) -> ResolveResult<(RecordEntry, TrustWindow)> {
        let key = path.base().to_string();
        let raw = with_timeout(
            "get record",
            self.timeout,
            self.store.get_values(&key, self.candidates),
        )
        .await?;
        if raw.is_empty() {
            return Err(RecordError::NotFound(key).into());
        }

        let (positions, mut entries): (Vec<usize>, Vec<RecordEntry>) = raw
            .iter()
            .enumerate()
            .filter_map(|(i, bytes)| RecordEntry::decode_block(bytes).ok().map(|e| (i, e)))
            .unzip();
        if entries.is_empty() {
            return Err(RecordError::NoUsableRecords { count: raw.len() }.into());
        }

        let outcome = self
            .verifier
            .verify_candidates(path, &entries, Utc::now())
            .await;
        if outcome.verified.is_empty() {
            let error = outcome
                .first_error
                .unwrap_or(RecordError::NoUsableRecords { count: raw.len() });
            warn!(path = %path.abbreviated(), error = %error, "no candidate verified");
            return Err(error.into());
        }
        debug!(
            path = %path.abbreviated(),
            verified = outcome.verified.len(),
            candidates = raw.len(),
            "verified record candidates"
        );

        let verified: Vec<Vec<u8>> = outcome
            .verified
            .iter()
            .map(|(i, _)| raw[positions[*i]].clone())
            .collect();
        let winner = self.checker.select_record(&verified)?;
        let (index, trust) = outcome.verified[winner];
        let entry = entries.swap_remove(index);
        self.checker.validate_record(path, &entry)?;
        Ok((entry, trust))
    }
}

#[async_trait]
impl NameResolver for RecordResolver {
    fn name(&self) -> &'static str {
        "record"
    }

    fn accepts(&self, root: &str) -> bool {
        root.strip_prefix(IPNS_PREFIX)
            .is_some_and(|hash| ContentHash::from_hex(hash).is_ok())
    }

    async fn resolve_once(&self, root: &str) -> ResolveResult<Hop> {
        let path = RecordPath::from_string(root).map_err(RecordError::from)?;
        let (entry, trust) = self.resolve_entry(&path).await?;
        let validity = Validity::from_entry(&entry)?;
        Ok(Hop {
            value: entry.value_str()?.to_string(),
            ttl: entry.ttl(),
            deadline: trust.cap(validity.deadline()),
        })
    }
}

impl std::fmt::Debug for RecordResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordResolver")
            .field("timeout", &self.timeout)
            .field("candidates", &self.candidates)
            .finish()
    }
}
