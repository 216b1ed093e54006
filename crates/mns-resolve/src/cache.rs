use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;
use tracing::debug;

use crate::error::ResolveResult;
use crate::resolver::{Hop, NameResolver};

#[derive(Clone, Debug)]
struct CacheEntry {
    value: String,
    expires: DateTime<Utc>,
}

/// LRU of resolved hops with lazy, read-time expiry.
///
/// An entry expires at the earlier of `now + ttl` and the deadline of the
/// record it came from, so a cached record is never served past its own end
/// of life. A hop's TTL hint can shorten, but never extend, the configured
/// TTL. A size of zero disables caching.
pub struct ResolverCache {
    entries: Option<Mutex<LruCache<String, CacheEntry>>>,
    ttl: Duration,
}

impl ResolverCache {
    pub fn new(size: usize, ttl: Duration) -> Self {
        Self {
            entries: NonZeroUsize::new(size).map(|cap| Mutex::new(LruCache::new(cap))),
            ttl,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached value for `key` if it has not expired at `now`.
    ///
    /// Expired entries are removed under the same lock as the read.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<Hop> {
        let mut entries = self.lock()?;
        let entry = entries.get(key)?.clone();
        if now < entry.expires {
            debug!(key, "cache hit");
            return Some(Hop {
                value: entry.value,
                ttl: None,
                deadline: Some(entry.expires),
            });
        }
        entries.pop(key);
        debug!(key, "evicted expired cache entry");
        None
    }

    /// Cache `hop` for `key`, resolved at `now`.
    pub fn insert(&self, key: &str, hop: &Hop, now: DateTime<Utc>) {
        let Some(mut entries) = self.lock() else {
            return;
        };
        let ttl = hop.ttl.map_or(self.ttl, |hint| hint.min(self.ttl));
        let mut expires = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if let Some(deadline) = hop.deadline {
            expires = expires.min(deadline);
        }
        if expires <= now {
            entries.pop(key);
            return;
        }
        entries.put(
            key.to_string(),
            CacheEntry {
                value: hop.value.clone(),
                expires,
            },
        );
    }

    pub fn remove(&self, key: &str) {
        if let Some(mut entries) = self.lock() {
            entries.pop(key);
        }
    }

    fn lock(&self) -> Option<MutexGuard<'_, LruCache<String, CacheEntry>>> {
        self.entries
            .as_ref()
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl std::fmt::Debug for ResolverCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverCache")
            .field("enabled", &self.is_enabled())
            .field("len", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// A [`NameResolver`] whose results are served from a shared cache.
#[derive(Debug)]
pub struct CachedResolver<R> {
    inner: R,
    cache: Arc<ResolverCache>,
}

impl<R: NameResolver> CachedResolver<R> {
    pub fn new(inner: R, cache: Arc<ResolverCache>) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: NameResolver> NameResolver for CachedResolver<R> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn accepts(&self, root: &str) -> bool {
        self.inner.accepts(root)
    }

    async fn resolve_once(&self, root: &str) -> ResolveResult<Hop> {
        if let Some(hop) = self.cache.get(root, Utc::now()) {
            return Ok(hop);
        }
        let hop = self.inner.resolve_once(root).await?;
        self.cache.insert(root, &hop, Utc::now());
        Ok(hop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests::TableResolver;
    use chrono::TimeZone;
    use std::sync::atomic::Ordering;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn ms(n: i64) -> chrono::Duration {
        chrono::Duration::milliseconds(n)
    }

    #[test]
    fn hit_until_ttl() {
        let cache = ResolverCache::new(4, Duration::from_secs(60));
        cache.insert("/ptr/a", &Hop::new("/ipfs/x"), t0());
        assert_eq!(cache.get("/ptr/a", t0() + ms(59_999)).unwrap().value, "/ipfs/x");
        assert!(cache.get("/ptr/a", t0() + ms(60_000)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn deadline_caps_ttl() {
        let cache = ResolverCache::new(4, Duration::from_secs(60));
        let hop = Hop {
            deadline: Some(t0() + ms(100)),
            ..Hop::new("/ipfs/x")
        };
        cache.insert("/ipns/k", &hop, t0());
        assert!(cache.get("/ipns/k", t0() + ms(99)).is_some());
        assert!(cache.get("/ipns/k", t0() + ms(101)).is_none());
    }

    #[test]
    fn ttl_hint_shortens_but_never_extends() {
        let cache = ResolverCache::new(4, Duration::from_secs(60));
        let short = Hop {
            ttl: Some(Duration::from_secs(1)),
            ..Hop::new("/ipfs/x")
        };
        cache.insert("a", &short, t0());
        assert!(cache.get("a", t0() + ms(1_500)).is_none());

        let long = Hop {
            ttl: Some(Duration::from_secs(3600)),
            ..Hop::new("/ipfs/x")
        };
        cache.insert("b", &long, t0());
        assert!(cache.get("b", t0() + ms(61_000)).is_none());
    }

    #[test]
    fn already_expired_hop_is_not_cached() {
        let cache = ResolverCache::new(4, Duration::from_secs(60));
        let hop = Hop {
            deadline: Some(t0() - ms(1)),
            ..Hop::new("/ipfs/x")
        };
        cache.insert("a", &hop, t0());
        assert!(cache.is_empty());
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let cache = ResolverCache::new(2, Duration::from_secs(60));
        cache.insert("a", &Hop::new("1"), t0());
        cache.insert("b", &Hop::new("2"), t0());
        assert!(cache.get("a", t0()).is_some());
        cache.insert("c", &Hop::new("3"), t0());
        assert!(cache.get("b", t0()).is_none());
        assert!(cache.get("a", t0()).is_some());
        assert!(cache.get("c", t0()).is_some());
    }

    #[test]
    fn zero_size_disables() {
        let cache = ResolverCache::new(0, Duration::from_secs(60));
        assert!(!cache.is_enabled());
        cache.insert("a", &Hop::new("1"), t0());
        assert!(cache.get("a", t0()).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn cached_resolver_calls_through_once() {
        let cache = Arc::new(ResolverCache::new(8, Duration::from_secs(60)));
        let cached = CachedResolver::new(TableResolver::new(&[("/ptr/a", "/ipfs/x")]), cache);
        for _ in 0..3 {
            assert_eq!(cached.resolve_once("/ptr/a").await.unwrap().value, "/ipfs/x");
        }
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.name(), "table");
    }

    #[tokio::test]
    async fn disabled_cache_passes_through() {
        let cache = Arc::new(ResolverCache::new(0, Duration::from_secs(60)));
        let cached = CachedResolver::new(TableResolver::new(&[("/ptr/a", "/ipfs/x")]), cache);
        for _ in 0..3 {
            cached.resolve_once("/ptr/a").await.unwrap();
        }
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn concurrent_access_is_safe() {
        let cache = Arc::new(ResolverCache::new(16, Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        let key = format!("k{}", (i + j) % 20);
                        cache.insert(&key, &Hop::new("v"), t0());
                        cache.get(&key, t0());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(cache.len() <= 16);
    }
}
