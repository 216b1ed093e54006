use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use mns_crypto::{Certificate, VerifyingKey};
use mns_store::{CertificateManager, KeyManager, StoreError, ValueStore};
use mns_types::{ContentHash, RecordPath};
use tracing::{debug, warn};

use crate::entry::RecordEntry;
use crate::error::{RecordError, RecordResult};
use crate::verification::{TrustWindow, Verification};

/// Keys or certificates fetched for one verification policy.
#[derive(Clone, Debug)]
pub enum TrustAnchor {
    Key(VerifyingKey),
    Chain {
        key: VerifyingKey,
        leaf: Certificate,
        issuer: Certificate,
    },
}

/// Outcome of verifying every candidate found at one path.
#[derive(Debug, Default)]
pub struct CandidateVerification {
    /// Index and credential window of each candidate that verified.
    pub verified: Vec<(usize, TrustWindow)>,
    /// First failure in candidate order.
    pub first_error: Option<RecordError>,
}

/// Checks that a record entry was signed by the holder of its path.
#[derive(Clone, Debug)]
pub struct RecordVerifier {
    keys: KeyManager,
    certs: CertificateManager,
}

impl RecordVerifier {
    pub fn new(store: Arc<dyn ValueStore>, timeout: Duration) -> Self {
        Self {
            keys: KeyManager::new(store.clone()).with_timeout(timeout),
            certs: CertificateManager::new(store).with_timeout(timeout),
        }
    }

    /// Verify `entry` as found at `path`. Returns the validity window of the
    /// credentials that signed it.
    pub async fn verify_record(
        &self,
        path: &RecordPath,
        entry: &RecordEntry,
    ) -> RecordResult<TrustWindow> {
        self.verify_record_at(path, entry, Utc::now()).await
    }

    /// Like [`verify_record`](Self::verify_record), checking certificate
    /// validity windows at `now`.
    pub async fn verify_record_at(
        &self,
        path: &RecordPath,
        entry: &RecordEntry,
        now: DateTime<Utc>,
    ) -> RecordResult<TrustWindow> {
        let result = async {
            let policy = Verification::from_entry(path, entry)?;
            let anchor = self.load_anchor(path, &policy).await?;
            self.check_entry(path, entry, &anchor, now)
        }
        .await;
        if let Err(e) = &result {
            warn!(path = %path.abbreviated(), error = %e, "record verification failed");
        }
        result
    }

    /// Verify every candidate for `path`, fetching the key or certificates
    /// of each distinct policy once.
    pub async fn verify_candidates(
        &self,
        path: &RecordPath,
        entries: &[RecordEntry],
        now: DateTime<Utc>,
    ) -> CandidateVerification {
        let policies: Vec<RecordResult<Verification>> = entries
            .iter()
            .map(|entry| Verification::from_entry(path, entry))
            .collect();
        let mut distinct: Vec<Verification> = Vec::new();
        for policy in policies.iter().flatten() {
            if !distinct.contains(policy) {
                distinct.push(*policy);
            }
        }
        let loaded = join_all(distinct.iter().map(|policy| self.load_anchor(path, policy))).await;
        // A failed fetch is reported once, against the first candidate using it.
        let mut anchors: Vec<(Verification, Result<TrustAnchor, Option<RecordError>>)> = distinct
            .into_iter()
            .zip(loaded.into_iter().map(|r| r.map_err(Some)))
            .collect();

        let mut outcome = CandidateVerification::default();
        for (index, (entry, policy)) in entries.iter().zip(policies).enumerate() {
            let result = match policy {
                Err(e) => Err(e),
                Ok(policy) => match anchors.iter_mut().find(|(p, _)| *p == policy) {
                    Some((_, Ok(anchor))) => self.check_entry(path, entry, anchor, now),
                    Some((_, Err(failure))) => match failure.take() {
                        Some(e) => Err(e),
                        None => continue,
                    },
                    None => continue,
                },
            };
            match result {
                Ok(window) => outcome.verified.push((index, window)),
                Err(e) => {
                    debug!(path = %path.abbreviated(), candidate = index, error = %e, "candidate failed verification");
                    outcome.first_error.get_or_insert(e);
                }
            }
        }
        outcome
    }

    /// Fetch the trust material `policy` names.
    pub async fn load_anchor(
        &self,
        path: &RecordPath,
        policy: &Verification,
    ) -> RecordResult<TrustAnchor> {
        match policy {
            Verification::Key { key } => self.load_key(path, key).await,
            Verification::Certificate { leaf, issuer } => {
                self.load_chain(path, leaf, issuer).await
            }
        }
    }

    /// Check `entry` against already fetched trust material.
    pub fn check_entry(
        &self,
        path: &RecordPath,
        entry: &RecordEntry,
        anchor: &TrustAnchor,
        now: DateTime<Utc>,
    ) -> RecordResult<TrustWindow> {
        let (key, window) = match anchor {
            TrustAnchor::Key(key) => (key, TrustWindow::unbounded()),
            TrustAnchor::Chain { key, leaf, issuer } => {
                let secs = now.timestamp();
                for cert in [issuer, leaf] {
                    if !cert.is_valid_at(secs) {
                        return Err(RecordError::ChainInvalid {
                            path: path.to_string(),
                            reason: format!(
                                "certificate {} is outside its validity window",
                                cert.subject
                            ),
                        });
                    }
                }
                (key, TrustWindow::of_chain(leaf, issuer))
            }
        };
        key.verify_bytes(&entry.signable_bytes(), &entry.signature)
            .map_err(|e| RecordError::SignatureInvalid {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        Ok(window)
    }

    async fn load_key(&self, path: &RecordPath, hash: &ContentHash) -> RecordResult<TrustAnchor> {
        match self.keys.get(hash).await {
            Ok(key) => Ok(TrustAnchor::Key(key)),
            Err(e @ (StoreError::Timeout { .. } | StoreError::Rejected { .. })) => Err(e.into()),
            Err(e) => Err(RecordError::SignatureInvalid {
                path: path.to_string(),
                reason: format!("public key unavailable: {e}"),
            }),
        }
    }

    async fn load_chain(
        &self,
        path: &RecordPath,
        leaf: &ContentHash,
        issuer: &ContentHash,
    ) -> RecordResult<TrustAnchor> {
        let (leaf, issuer) =
            tokio::try_join!(self.fetch_certificate(path, leaf), self.fetch_certificate(path, issuer))?;
        let chain_invalid = |reason: String| RecordError::ChainInvalid {
            path: path.to_string(),
            reason,
        };
        leaf.check_signed_by(&issuer)
            .map_err(|e| chain_invalid(e.to_string()))?;
        let key = leaf
            .verifying_key()
            .map_err(|e| chain_invalid(e.to_string()))?;
        Ok(TrustAnchor::Chain { key, leaf, issuer })
    }

    /// Fetch failures are I/O errors; unusable bytes are trust failures.
    async fn fetch_certificate(
        &self,
        path: &RecordPath,
        hash: &ContentHash,
    ) -> RecordResult<Certificate> {
        self.certs.get(hash).await.map_err(|e| {
            if e.is_fetch_failure() {
                RecordError::Store(e)
            } else {
                RecordError::ChainInvalid {
                    path: path.to_string(),
                    reason: e.to_string(),
                }
            }
        })
    }
}
