use async_trait::async_trait;

use crate::error::StoreResult;

/// Routing-layer value store.
///
/// Keys are path strings (`/ipns/<hash>`, `/pk/<hash>`, `/cert/<hash>`,
/// `/ptr/<label>`); values are opaque bytes. Implementations must be safe to
/// share between concurrent publishers and resolvers.
///
/// Cancellation follows the usual async contract: dropping the returned
/// future abandons the operation. A write already handed to the network may
/// still land; republishing is idempotent because keys are deterministic.
#[async_trait]
pub trait ValueStore: Send + Sync {
    /// Store a value under `key`.
    async fn put_value(&self, key: &str, value: Vec<u8>) -> StoreResult<()>;

    /// Fetch one value for `key`.
    ///
    /// Returns `Err(StoreError::NotFound)` if no value exists.
    async fn get_value(&self, key: &str) -> StoreResult<Vec<u8>>;

    /// Fetch up to `count` distinct values observed for `key`.
    ///
    /// Different peers may hold different versions of a record; callers pick
    /// one with the record selection order. Returns `Ok(vec![])` if nothing
    /// was found.
    async fn get_values(&self, key: &str, count: usize) -> StoreResult<Vec<Vec<u8>>>;

    /// Remove every value for `key`. Intended for tests and administration.
    async fn delete_value(&self, key: &str) -> StoreResult<()>;

    /// Fetch a value from the local replica only, without a network hop.
    ///
    /// Backends with no local replica keep the default, which finds nothing.
    async fn get_local_value(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(None)
    }
}
