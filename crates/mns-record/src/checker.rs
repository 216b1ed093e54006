use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use mns_types::{format_timestamp, RecordPath};
use tracing::debug;

use crate::entry::RecordEntry;
use crate::error::{RecordError, RecordResult};
use crate::validity::Validity;

/// Freshness checks and best-record selection.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecordChecker;

impl RecordChecker {
    pub fn new() -> Self {
        Self
    }

    /// Check that `entry` is fresh now.
    pub fn validate_record(&self, path: &RecordPath, entry: &RecordEntry) -> RecordResult<()> {
        self.validate_record_at(path, entry, Utc::now())
    }

    /// Check that `entry` is fresh at `now`.
    ///
    /// Fails with `Pending` before the start of a time range and `Expired`
    /// after its end (or after the end-of-life). The bounds themselves are
    /// inside the window.
    pub fn validate_record_at(
        &self,
        path: &RecordPath,
        entry: &RecordEntry,
        now: DateTime<Utc>,
    ) -> RecordResult<()> {
        let validity = Validity::from_entry(entry)?;
        if let Some(start) = validity.start() {
            if now < start {
                return Err(RecordError::Pending {
                    path: path.to_string(),
                    at: format_timestamp(&start),
                });
            }
        }
        if let Some(end) = validity.end() {
            if now > end {
                return Err(RecordError::Expired {
                    path: path.to_string(),
                    at: format_timestamp(&end),
                });
            }
        }
        Ok(())
    }

    /// Pick the best of several encoded candidates for the same path.
    ///
    /// Order, highest wins: sequence, then later end (unbounded beats any
    /// bound), then earlier start (unbounded beats any bound), then greater
    /// raw bytes. Candidates that fail to decode are skipped. Returns the
    /// index of the winner in `candidates`.
    pub fn select_record(&self, candidates: &[Vec<u8>]) -> RecordResult<usize> {
        let best = candidates
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| match Candidate::parse(raw) {
                Ok(candidate) => Some((index, candidate)),
                Err(e) => {
                    debug!(index, error = %e, "skipping unusable record candidate");
                    None
                }
            })
            .max_by(|(_, a), (_, b)| a.compare(b));
        best.map(|(index, _)| index)
            .ok_or(RecordError::NoUsableRecords {
                count: candidates.len(),
            })
    }
}

struct Candidate<'a> {
    sequence: u64,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    raw: &'a [u8],
}

impl<'a> Candidate<'a> {
    fn parse(raw: &'a [u8]) -> RecordResult<Self> {
        let entry = RecordEntry::decode_block(raw)?;
        let validity = Validity::from_entry(&entry)?;
        Ok(Self {
            sequence: entry.sequence,
            start: validity.start(),
            end: validity.end(),
            raw,
        })
    }

    /// `Greater` means `self` wins.
    fn compare(&self, other: &Self) -> Ordering {
        self.sequence
            .cmp(&other.sequence)
            .then_with(|| cmp_end(self.end, other.end))
            // `None < Some` already ranks an unbounded start earliest.
            .then_with(|| other.start.cmp(&self.start))
            .then_with(|| self.raw.cmp(other.raw))
    }
}

fn cmp_end(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(&b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ValidityType;
    use crate::error::ErrorKind;
    use chrono::{Duration, TimeZone};
    use mns_types::ContentHash;
    use proptest::prelude::*;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn path() -> RecordPath {
        RecordPath::new(ContentHash::digest(b"root"))
    }

    fn entry(sequence: u64, validity: Validity, value: &str) -> RecordEntry {
        RecordEntry {
            value: value.as_bytes().to_vec(),
            signature: vec![0; 64],
            validity_type: validity.validity_type(),
            validity: validity.encode(),
            sequence,
            ttl: None,
        }
    }

    fn encoded(entries: &[RecordEntry]) -> Vec<Vec<u8>> {
        entries.iter().map(|e| e.encode_block().unwrap()).collect()
    }

    fn winner(candidates: &[Vec<u8>]) -> RecordEntry {
        let index = RecordChecker::new().select_record(candidates).unwrap();
        RecordEntry::decode_block(&candidates[index]).unwrap()
    }

    // =========================================================================
    // Freshness
    // =========================================================================

    #[test]
    fn eol_expiry() {
        let now = base();
        let checker = RecordChecker::new();
        let past = entry(1, Validity::eol(now - Duration::hours(1)), "/ipfs/a");
        let future = entry(1, Validity::eol(now + Duration::hours(1)), "/ipfs/a");
        let err = checker.validate_record_at(&path(), &past, now).unwrap_err();
        assert!(matches!(err, RecordError::Expired { .. }));
        assert_eq!(err.kind(), ErrorKind::Stale);
        checker.validate_record_at(&path(), &future, now).unwrap();
    }

    #[test]
    fn eol_boundary_is_inclusive() {
        let now = base();
        let at = entry(1, Validity::eol(now), "/ipfs/a");
        RecordChecker::new().validate_record_at(&path(), &at, now).unwrap();
    }

    #[test]
    fn time_range_in_the_past_is_expired_not_pending() {
        let now = base();
        let v = Validity::time_range(Some(now - Duration::hours(2)), Some(now - Duration::hours(1)))
            .unwrap();
        assert!(matches!(
            RecordChecker::new().validate_record_at(&path(), &entry(1, v, "/ipfs/a"), now),
            Err(RecordError::Expired { .. })
        ));
    }

    #[test]
    fn time_range_in_the_future_is_pending() {
        let now = base();
        let v = Validity::time_range(Some(now + Duration::hours(1)), None).unwrap();
        assert!(matches!(
            RecordChecker::new().validate_record_at(&path(), &entry(1, v, "/ipfs/a"), now),
            Err(RecordError::Pending { .. })
        ));
    }

    #[test]
    fn unbounded_range_is_always_valid() {
        let checker = RecordChecker::new();
        let e = entry(1, Validity::unbounded(), "/ipfs/a");
        for now in [
            DateTime::<Utc>::MIN_UTC,
            base(),
            DateTime::<Utc>::MAX_UTC,
        ] {
            checker.validate_record_at(&path(), &e, now).unwrap();
        }
    }

    #[test]
    fn malformed_validity_is_not_stale() {
        let mut e = entry(1, Validity::unbounded(), "/ipfs/a");
        e.validity_type = ValidityType::Eol;
        let err = RecordChecker::new()
            .validate_record_at(&path(), &e, base())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    // =========================================================================
    // Selection
    // =========================================================================

    #[test]
    fn highest_sequence_wins() {
        let eol = Validity::eol(base());
        let candidates = encoded(&[
            entry(1, eol, "/ipfs/one"),
            entry(3, eol, "/ipfs/three"),
            entry(2, eol, "/ipfs/two"),
        ]);
        assert_eq!(winner(&candidates).sequence, 3);
    }

    #[test]
    fn later_eol_wins_at_equal_sequence() {
        let candidates = encoded(&[
            entry(4, Validity::eol(base() + Duration::hours(2)), "/ipfs/late"),
            entry(4, Validity::eol(base() + Duration::hours(1)), "/ipfs/early"),
        ]);
        assert_eq!(winner(&candidates).value, b"/ipfs/late".to_vec());
    }

    #[test]
    fn greater_bytes_break_full_ties() {
        let eol = Validity::eol(base());
        let candidates = encoded(&[entry(4, eol, "/ipfs/a"), entry(4, eol, "/ipfs/b")]);
        let expected = candidates.iter().max().unwrap().clone();
        let index = RecordChecker::new().select_record(&candidates).unwrap();
        assert_eq!(candidates[index], expected);
    }

    #[test]
    fn unbounded_end_beats_bounded() {
        let candidates = encoded(&[
            entry(1, Validity::time_range(None, Some(base())).unwrap(), "/ipfs/bounded"),
            entry(1, Validity::time_range(Some(base()), None).unwrap(), "/ipfs/open"),
        ]);
        assert_eq!(winner(&candidates).value, b"/ipfs/open".to_vec());
    }

    #[test]
    fn earlier_start_wins_when_ends_tie() {
        let end = Some(base() + Duration::hours(5));
        let candidates = encoded(&[
            entry(1, Validity::time_range(Some(base()), end).unwrap(), "/ipfs/late-start"),
            entry(
                1,
                Validity::time_range(Some(base() - Duration::hours(1)), end).unwrap(),
                "/ipfs/early-start",
            ),
        ]);
        assert_eq!(winner(&candidates).value, b"/ipfs/early-start".to_vec());

        let candidates = encoded(&[
            entry(1, Validity::time_range(Some(base()), end).unwrap(), "/ipfs/bounded-start"),
            entry(1, Validity::time_range(None, end).unwrap(), "/ipfs/open-start"),
        ]);
        assert_eq!(winner(&candidates).value, b"/ipfs/open-start".to_vec());
    }

    #[test]
    fn unparseable_candidates_are_skipped() {
        let good = entry(1, Validity::eol(base()), "/ipfs/good").encode_block().unwrap();
        let candidates = vec![vec![0xde, 0xad], good.clone(), Vec::new()];
        assert_eq!(RecordChecker::new().select_record(&candidates).unwrap(), 1);
    }

    #[test]
    fn no_usable_records() {
        let checker = RecordChecker::new();
        assert!(matches!(
            checker.select_record(&[vec![1, 2, 3]]),
            Err(RecordError::NoUsableRecords { count: 1 })
        ));
        assert!(matches!(
            checker.select_record(&[]),
            Err(RecordError::NoUsableRecords { count: 0 })
        ));
    }

    fn arb_candidates() -> impl Strategy<Value = Vec<RecordEntry>> {
        prop::collection::vec((0u64..4, 0i64..3, 0u8..3, any::<bool>()), 1..8).prop_map(|specs| {
            specs
                .into_iter()
                .map(|(seq, hours, value, range)| {
                    let end = base() + Duration::hours(hours);
                    let validity = if range {
                        Validity::time_range(Some(base() - Duration::hours(hours)), Some(end))
                            .unwrap()
                    } else {
                        Validity::eol(end)
                    };
                    entry(seq, validity, &format!("/ipfs/{value}"))
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn selection_is_order_independent(
            (original, shuffled) in arb_candidates().prop_flat_map(|entries| {
                let encoded = encoded(&entries);
                (Just(encoded.clone()), Just(encoded).prop_shuffle())
            })
        ) {
            let checker = RecordChecker::new();
            let a = checker.select_record(&original).unwrap();
            let b = checker.select_record(&shuffled).unwrap();
            prop_assert_eq!(&original[a], &shuffled[b]);
        }
    }
}
