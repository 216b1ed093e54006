use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mns_store::{with_timeout, StoreError, ValueStore, DEFAULT_PUT_TIMEOUT};
use tracing::info;

use crate::error::{ResolveError, ResolveResult};
use crate::resolver::{Hop, NameResolver, PTR_PREFIX};

/// Resolves `/ptr/<label>` through an unsigned routing-layer value holding
/// a UTF-8 path.
#[derive(Clone)]
pub struct PointerResolver {
    store: Arc<dyn ValueStore>,
    timeout: Duration,
}

impl PointerResolver {
    pub fn new(store: Arc<dyn ValueStore>) -> Self {
        Self {
            store,
            timeout: DEFAULT_PUT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Point `/ptr/<label>` at `target`.
    pub async fn publish_pointer(&self, label: &str, target: &str) -> ResolveResult<String> {
        if label.is_empty() || label.contains('/') {
            return Err(ResolveError::name(label, "pointer labels are a single segment"));
        }
        if !target.starts_with('/') {
            return Err(ResolveError::name(target, "pointer target must be a path"));
        }
        let key = format!("{PTR_PREFIX}{label}");
        with_timeout(
            "put pointer",
            self.timeout,
            self.store.put_value(&key, target.as_bytes().to_vec()),
        )
        .await?;
        info!(pointer = %key, target, "published pointer");
        Ok(key)
    }
}

#[async_trait]
impl NameResolver for PointerResolver {
    fn name(&self) -> &'static str {
        "pointer"
    }

    fn accepts(&self, root: &str) -> bool {
        root.strip_prefix(PTR_PREFIX)
            .is_some_and(|label| !label.is_empty() && !label.contains('/'))
    }

    async fn resolve_once(&self, root: &str) -> ResolveResult<Hop> {
        let bytes = match with_timeout("get pointer", self.timeout, self.store.get_value(root)).await {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound(_)) => return Err(ResolveError::NotFound(root.to_string())),
            Err(e) => return Err(e.into()),
        };
        let value = String::from_utf8(bytes)
            .map_err(|_| ResolveError::name(root, "pointer value is not utf-8"))?;
        Ok(Hop::new(value))
    }
}

impl std::fmt::Debug for PointerResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointerResolver")
            .field("timeout", &self.timeout)
            .finish()
    }
}
