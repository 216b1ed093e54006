use chrono::{DateTime, Utc};
use mns_types::{format_timestamp, parse_timestamp, ContentHash};

use crate::entry::{RecordEntry, ValidityType};
use crate::error::{RecordError, RecordResult};

const RANGE_SEPARATOR: char = '~';
const UNBOUNDED_START: &str = "-inf";
const UNBOUNDED_END: &str = "+inf";

/// Freshness policy of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Validity {
    /// Valid until the given instant.
    Eol(DateTime<Utc>),
    /// Valid within `[start, end]`; `None` is unbounded on that side.
    TimeRange {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
}

impl Validity {
    pub fn eol(at: DateTime<Utc>) -> Self {
        Self::Eol(at)
    }

    /// A time range. Fails if both bounds are set and `start > end`.
    pub fn time_range(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> RecordResult<Self> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(RecordError::MalformedValidity {
                    validity_type: ValidityType::TimeRange.as_str(),
                    reason: format!(
                        "start {} is after end {}",
                        format_timestamp(&s),
                        format_timestamp(&e)
                    ),
                });
            }
        }
        Ok(Self::TimeRange { start, end })
    }

    /// A range with no bounds, always valid.
    pub fn unbounded() -> Self {
        Self::TimeRange {
            start: None,
            end: None,
        }
    }

    /// Wire type of a key-verified record with this validity.
    pub fn validity_type(&self) -> ValidityType {
        match self {
            Self::Eol(_) => ValidityType::Eol,
            Self::TimeRange { .. } => ValidityType::TimeRange,
        }
    }

    /// Wire payload of a key-verified record with this validity.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Eol(at) => format_timestamp(at).into_bytes(),
            Self::TimeRange { start, end } => {
                let start = start
                    .map(|t| format_timestamp(&t))
                    .unwrap_or_else(|| UNBOUNDED_START.to_string());
                let end = end
                    .map(|t| format_timestamp(&t))
                    .unwrap_or_else(|| UNBOUNDED_END.to_string());
                format!("{start}{RANGE_SEPARATOR}{end}").into_bytes()
            }
        }
    }

    /// Interpret the validity carried by an entry.
    ///
    /// Certificate records carry an end-of-life, so they yield [`Validity::Eol`].
    pub fn from_entry(entry: &RecordEntry) -> RecordResult<Self> {
        match entry.validity_type {
            ValidityType::Eol => {
                let text = utf8(ValidityType::Eol, &entry.validity)?;
                Ok(Self::Eol(timestamp(ValidityType::Eol, text)?))
            }
            ValidityType::TimeRange => decode_range(&entry.validity),
            ValidityType::Cert => Ok(Self::Eol(CertValidity::decode(&entry.validity)?.eol)),
        }
    }

    /// Lower bound, if any.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Eol(_) => None,
            Self::TimeRange { start, .. } => *start,
        }
    }

    /// Upper bound, if any.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Eol(at) => Some(*at),
            Self::TimeRange { end, .. } => *end,
        }
    }

    /// Instant after which the record must not be served.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.end()
    }
}

fn decode_range(bytes: &[u8]) -> RecordResult<Validity> {
    let text = utf8(ValidityType::TimeRange, bytes)?;
    let (start, end) = text.split_once(RANGE_SEPARATOR).ok_or_else(|| {
        RecordError::MalformedValidity {
            validity_type: ValidityType::TimeRange.as_str(),
            reason: format!("missing {RANGE_SEPARATOR:?} in {text:?}"),
        }
    })?;
    let start = match start {
        UNBOUNDED_START => None,
        s => Some(timestamp(ValidityType::TimeRange, s)?),
    };
    let end = match end {
        UNBOUNDED_END => None,
        e => Some(timestamp(ValidityType::TimeRange, e)?),
    };
    Validity::time_range(start, end)
}

fn utf8(ty: ValidityType, bytes: &[u8]) -> RecordResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| RecordError::MalformedValidity {
        validity_type: ty.as_str(),
        reason: e.to_string(),
    })
}

fn timestamp(ty: ValidityType, text: &str) -> RecordResult<DateTime<Utc>> {
    parse_timestamp(text).map_err(|e| RecordError::MalformedValidity {
        validity_type: ty.as_str(),
        reason: e.to_string(),
    })
}

/// Validity payload of a certificate-verified record: the end-of-life and
/// the hash of the leaf certificate that signed it.
///
/// Wire form is `"<eol>\n<leaf-hex>"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CertValidity {
    pub eol: DateTime<Utc>,
    pub leaf: ContentHash,
}

impl CertValidity {
    pub fn encode(&self) -> Vec<u8> {
        format!("{}\n{}", format_timestamp(&self.eol), self.leaf.to_hex()).into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> RecordResult<Self> {
        let text = utf8(ValidityType::Cert, bytes)?;
        let (eol, leaf) = text
            .split_once('\n')
            .ok_or_else(|| RecordError::MalformedValidity {
                validity_type: ValidityType::Cert.as_str(),
                reason: "missing leaf certificate hash".into(),
            })?;
        let leaf = ContentHash::from_hex(leaf).map_err(|e| RecordError::MalformedValidity {
            validity_type: ValidityType::Cert.as_str(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            eol: timestamp(ValidityType::Cert, eol)?,
            leaf,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, hour, 0, 0).unwrap()
    }

    fn entry(ty: ValidityType, validity: &[u8]) -> RecordEntry {
        RecordEntry {
            value: b"/ipfs/x".to_vec(),
            signature: Vec::new(),
            validity_type: ty,
            validity: validity.to_vec(),
            sequence: 0,
            ttl: None,
        }
    }

    #[test]
    fn eol_encoding() {
        let v = Validity::eol(t(12));
        assert_eq!(v.encode(), b"2026-10-19T12:00:00.000000000Z".to_vec());
        assert_eq!(v.validity_type(), ValidityType::Eol);
        assert_eq!(Validity::from_entry(&entry(ValidityType::Eol, &v.encode())).unwrap(), v);
        assert_eq!(v.start(), None);
        assert_eq!(v.deadline(), Some(t(12)));
    }

    #[test]
    fn range_encoding_with_sentinels() {
        assert_eq!(Validity::unbounded().encode(), b"-inf~+inf".to_vec());

        let open_end = Validity::time_range(Some(t(1)), None).unwrap();
        assert_eq!(
            open_end.encode(),
            b"2026-10-19T01:00:00.000000000Z~+inf".to_vec()
        );
        let decoded =
            Validity::from_entry(&entry(ValidityType::TimeRange, &open_end.encode())).unwrap();
        assert_eq!(decoded, open_end);
        assert_eq!(decoded.deadline(), None);
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(matches!(
            Validity::time_range(Some(t(3)), Some(t(2))),
            Err(RecordError::MalformedValidity { .. })
        ));
        assert!(Validity::time_range(Some(t(2)), Some(t(2))).is_ok());
    }

    #[test]
    fn malformed_payloads() {
        for (ty, bytes) in [
            (ValidityType::Eol, &b"yesterday"[..]),
            (ValidityType::Eol, &[0xff, 0xfe][..]),
            (ValidityType::TimeRange, &b"-inf+inf"[..]),
            (ValidityType::TimeRange, &b"soon~+inf"[..]),
            (ValidityType::Cert, &b"2026-10-19T12:00:00Z"[..]),
        ] {
            assert!(
                matches!(
                    Validity::from_entry(&entry(ty, bytes)),
                    Err(RecordError::MalformedValidity { .. })
                ),
                "{ty} {bytes:?}"
            );
        }
    }

    #[test]
    fn cert_validity_is_two_fields() {
        let cv = CertValidity {
            eol: t(5) + Duration::nanoseconds(17),
            leaf: ContentHash::digest(b"leaf"),
        };
        let bytes = cv.encode();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert_eq!(
            text,
            format!("2026-10-19T05:00:00.000000017Z\n{}", cv.leaf.to_hex())
        );
        assert_eq!(CertValidity::decode(&bytes).unwrap(), cv);
        assert_eq!(
            Validity::from_entry(&entry(ValidityType::Cert, &bytes)).unwrap(),
            Validity::Eol(cv.eol)
        );
    }

    #[test]
    fn cert_validity_rejects_bad_hash() {
        let bytes = b"2026-10-19T05:00:00Z\nnot-hex".to_vec();
        assert!(matches!(
            CertValidity::decode(&bytes),
            Err(RecordError::MalformedValidity { .. })
        ));
    }
}
