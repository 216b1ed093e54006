use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::traits::ValueStore;

/// In-memory, two-tier value store.
///
/// Intended for tests and embedding. The network tier keeps every distinct
/// value written under a key (newest first), the way several peers of a
/// routing network may each hold a different version of a record. The local
/// tier keeps the last value this process wrote, standing in for a
/// co-located replica.
///
/// Latency and write failures can be injected to exercise timeouts and
/// all-or-nothing publishing.
pub struct InMemoryValueStore {
    network: RwLock<HashMap<String, Vec<Vec<u8>>>>,
    local: RwLock<HashMap<String, Vec<u8>>>,
    latency: RwLock<Duration>,
    failing_prefixes: RwLock<Vec<String>>,
    reads: RwLock<HashMap<String, usize>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryValueStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            network: RwLock::new(HashMap::new()),
            local: RwLock::new(HashMap::new()),
            latency: RwLock::new(Duration::ZERO),
            failing_prefixes: RwLock::new(Vec::new()),
            reads: RwLock::new(HashMap::new()),
        }
    }

    /// Number of keys with at least one network value.
    pub fn len(&self) -> usize {
        read(&self.network).len()
    }

    /// Returns `true` if the network tier holds nothing.
    pub fn is_empty(&self) -> bool {
        read(&self.network).is_empty()
    }

    /// Sorted list of keys present on the network tier.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = read(&self.network).keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of distinct values held for `key` on the network tier.
    pub fn value_count(&self, key: &str) -> usize {
        read(&self.network).get(key).map_or(0, Vec::len)
    }

    /// Number of network reads issued for `key`.
    pub fn read_count(&self, key: &str) -> usize {
        read(&self.reads).get(key).copied().unwrap_or(0)
    }

    /// Drop the local replica, as if the process had restarted.
    pub fn clear_local(&self) {
        write(&self.local).clear();
    }

    /// Add a value on the network tier only, as if written by another peer.
    pub fn inject_value(&self, key: &str, value: Vec<u8>) {
        Self::push_distinct(&mut write(&self.network), key, value);
    }

    /// Delay every network operation by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *write(&self.latency) = latency;
    }

    /// Reject writes to keys starting with `prefix`.
    pub fn fail_writes_with_prefix(&self, prefix: impl Into<String>) {
        write(&self.failing_prefixes).push(prefix.into());
    }

    /// Stop rejecting writes.
    pub fn clear_failures(&self) {
        write(&self.failing_prefixes).clear();
    }

    fn push_distinct(map: &mut HashMap<String, Vec<Vec<u8>>>, key: &str, value: Vec<u8>) {
        let values = map.entry(key.to_string()).or_default();
        values.retain(|existing| *existing != value);
        values.insert(0, value);
    }

    fn record_read(&self, key: &str) {
        *write(&self.reads).entry(key.to_string()).or_default() += 1;
    }

    async fn simulate_network(&self) {
        let latency = *read(&self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for InMemoryValueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ValueStore for InMemoryValueStore {
    async fn put_value(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.simulate_network().await;
        if read(&self.failing_prefixes)
            .iter()
            .any(|prefix| key.starts_with(prefix.as_str()))
        {
            return Err(StoreError::Rejected {
                key: key.to_string(),
                reason: "write failure injected".into(),
            });
        }
        Self::push_distinct(&mut write(&self.network), key, value.clone());
        write(&self.local).insert(key.to_string(), value);
        Ok(())
    }

    async fn get_value(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.record_read(key);
        self.simulate_network().await;
        read(&self.network)
            .get(key)
            .and_then(|values| values.first().cloned())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn get_values(&self, key: &str, count: usize) -> StoreResult<Vec<Vec<u8>>> {
        self.record_read(key);
        self.simulate_network().await;
        Ok(read(&self.network)
            .get(key)
            .map(|values| values.iter().take(count).cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_value(&self, key: &str) -> StoreResult<()> {
        write(&self.network).remove(key);
        write(&self.local).remove(key);
        Ok(())
    }

    async fn get_local_value(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(read(&self.local).get(key).cloned())
    }
}

impl std::fmt::Debug for InMemoryValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryValueStore")
            .field("key_count", &self.len())
            .finish()
    }
}
