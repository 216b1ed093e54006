use std::fmt;
use std::time::Duration;

use mns_store::{Block, BlockKind};
use serde::{Deserialize, Serialize};

use crate::error::{RecordError, RecordResult};

/// How the `validity` bytes of an entry are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValidityType {
    /// Fixed end-of-life timestamp.
    Eol,
    /// `start~end` with optional bounds.
    TimeRange,
    /// End-of-life plus the hash of the signing leaf certificate.
    Cert,
}

impl ValidityType {
    /// String form mixed into the signable payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eol => "EOL",
            Self::TimeRange => "TimeRange",
            Self::Cert => "Cert",
        }
    }
}

impl fmt::Display for ValidityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ValidityType> for u32 {
    fn from(ty: ValidityType) -> Self {
        match ty {
            ValidityType::Eol => 0,
            ValidityType::TimeRange => 1,
            ValidityType::Cert => 2,
        }
    }
}

impl TryFrom<u32> for ValidityType {
    type Error = RecordError;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Eol),
            1 => Ok(Self::TimeRange),
            2 => Ok(Self::Cert),
            other => Err(RecordError::UnknownValidityType(other)),
        }
    }
}

/// Bytes covered by a record signature: `value || validity || type-string`.
///
/// Sequence and TTL are deliberately excluded.
pub fn signable_payload(value: &[u8], validity: &[u8], validity_type: ValidityType) -> Vec<u8> {
    let ty = validity_type.as_str().as_bytes();
    let mut out = Vec::with_capacity(value.len() + validity.len() + ty.len());
    out.extend_from_slice(value);
    out.extend_from_slice(validity);
    out.extend_from_slice(ty);
    out
}

/// The unit stored in the network for a record path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordEntry {
    /// Terminal address or another naming path.
    pub value: Vec<u8>,
    pub signature: Vec<u8>,
    pub validity_type: ValidityType,
    /// Interpreted according to `validity_type`.
    pub validity: Vec<u8>,
    pub sequence: u64,
    /// Cache hint in nanoseconds.
    pub ttl: Option<u64>,
}

/// Field-order-fixed wire layout. The validity type travels as its numeric
/// tag so unknown tags can be reported as such.
#[derive(Serialize, Deserialize)]
struct WireEntry<'a> {
    #[serde(borrow)]
    value: &'a [u8],
    #[serde(borrow)]
    signature: &'a [u8],
    validity_type: u32,
    #[serde(borrow)]
    validity: &'a [u8],
    sequence: u64,
    ttl: Option<u64>,
}

impl RecordEntry {
    /// The bytes the signature must verify over.
    pub fn signable_bytes(&self) -> Vec<u8> {
        signable_payload(&self.value, &self.validity, self.validity_type)
    }

    /// Canonical binary encoding.
    pub fn to_bytes(&self) -> RecordResult<Vec<u8>> {
        let wire = WireEntry {
            value: &self.value,
            signature: &self.signature,
            validity_type: self.validity_type.into(),
            validity: &self.validity,
            sequence: self.sequence,
            ttl: self.ttl,
        };
        bincode::serialize(&wire).map_err(|e| RecordError::Malformed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> RecordResult<Self> {
        let wire: WireEntry<'_> =
            bincode::deserialize(bytes).map_err(|e| RecordError::Malformed(e.to_string()))?;
        Ok(Self {
            value: wire.value.to_vec(),
            signature: wire.signature.to_vec(),
            validity_type: ValidityType::try_from(wire.validity_type)?,
            validity: wire.validity.to_vec(),
            sequence: wire.sequence,
            ttl: wire.ttl,
        })
    }

    /// Wrap in a record block, the form written to the value store.
    pub fn encode_block(&self) -> RecordResult<Vec<u8>> {
        Ok(Block::new(BlockKind::Record, self.to_bytes()?).encode())
    }

    /// Unwrap a record block read from the value store.
    pub fn decode_block(bytes: &[u8]) -> RecordResult<Self> {
        let block = Block::decode_kind(bytes, BlockKind::Record)
            .map_err(|e| RecordError::Malformed(e.to_string()))?;
        Self::from_bytes(&block.data)
    }

    /// Cache hint as a duration.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl.map(Duration::from_nanos)
    }

    /// The value as text, which is how paths and addresses are carried.
    pub fn value_str(&self) -> RecordResult<&str> {
        std::str::from_utf8(&self.value)
            .map_err(|e| RecordError::Malformed(format!("value is not utf-8: {e}")))
    }
}
