use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeouts and fan-out limits for publishing and verifying records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    /// Deadline for each entry, key, or certificate write.
    pub put_timeout_ms: u64,
    /// Deadline for each record, key, or certificate read.
    pub get_timeout_ms: u64,
    /// Deadline for the network fallback of the sequence lookup.
    pub sequence_timeout_ms: u64,
    /// Maximum number of candidate entries requested per path.
    pub candidate_count: usize,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            put_timeout_ms: 10_000,
            get_timeout_ms: 10_000,
            sequence_timeout_ms: 30_000,
            candidate_count: 16,
        }
    }
}

impl RecordConfig {
    pub fn put_timeout(&self) -> Duration {
        Duration::from_millis(self.put_timeout_ms)
    }

    pub fn get_timeout(&self) -> Duration {
        Duration::from_millis(self.get_timeout_ms)
    }

    pub fn sequence_timeout(&self) -> Duration {
        Duration::from_millis(self.sequence_timeout_ms)
    }
}
