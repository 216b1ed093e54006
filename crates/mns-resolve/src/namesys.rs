use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mns_record::{PublishedRecord, Publisher, Record, RecordChecker, Signer, Validity};
use mns_store::ValueStore;
use tracing::debug;

use crate::cache::{CachedResolver, ResolverCache};
use crate::config::NamesysConfig;
use crate::dns::{DnsResolver, TxtLookup};
use crate::error::ResolveResult;
use crate::pointer::PointerResolver;
use crate::record::RecordResolver;
use crate::resolver::{Hop, Resolution, ResolveOptions, Resolver};

/// Publishing and resolution over one value store, sharing one cache.
///
/// Native records and DNS names are cached; routing-layer pointers are
/// unsigned and always read through.
pub struct Namesys {
    publisher: Publisher,
    pointers: PointerResolver,
    resolver: Resolver,
    cache: Arc<ResolverCache>,
    checker: RecordChecker,
    config: NamesysConfig,
}

impl Namesys {
    pub fn new(store: Arc<dyn ValueStore>, config: NamesysConfig) -> Self {
        let cache = Arc::new(ResolverCache::new(
            config.resolver.cache_size,
            config.resolver.cache_ttl(),
        ));
        let pointers = PointerResolver::new(store.clone()).with_timeout(config.record.get_timeout());
        let resolver = Resolver::new()
            .with(CachedResolver::new(
                RecordResolver::new(store.clone(), &config.record),
                cache.clone(),
            ))
            .with(pointers.clone());
        Self {
            publisher: Publisher::new(store, config.record.clone()),
            pointers,
            resolver,
            cache,
            checker: RecordChecker::new(),
            config,
        }
    }

    /// Resolve `/ipns/<domain>` names through `lookup`.
    pub fn with_txt_lookup(mut self, lookup: Arc<dyn TxtLookup>) -> Self {
        self.resolver.push(Arc::new(CachedResolver::new(
            DnsResolver::new(lookup),
            self.cache.clone(),
        )));
        self
    }

    /// Publish `value` at the signer's path and prime the cache with it.
    pub async fn publish(
        &self,
        signer: &Signer,
        validity: Validity,
        value: impl Into<Vec<u8>>,
    ) -> ResolveResult<PublishedRecord> {
        self.publish_record(&Record::new(validity, signer, value)?).await
    }

    pub async fn publish_with_ttl(
        &self,
        signer: &Signer,
        validity: Validity,
        value: impl Into<Vec<u8>>,
        ttl: Duration,
    ) -> ResolveResult<PublishedRecord> {
        self.publish_record(&Record::new(validity, signer, value)?.with_ttl(ttl))
            .await
    }

    pub async fn publish_record(&self, record: &Record) -> ResolveResult<PublishedRecord> {
        let published = self.publisher.publish_record(record).await?;
        self.prime_cache(record, &published);
        Ok(published)
    }

    /// Cache a freshly published record only if a cold resolve would serve
    /// it right now. Otherwise evict whatever was cached for its path.
    fn prime_cache(&self, record: &Record, published: &PublishedRecord) {
        let key = published.path.to_string();
        let now = Utc::now();
        let entry = record.to_entry(published.sequence);
        if let Err(e) = self.checker.validate_record_at(&published.path, &entry, now) {
            debug!(path = %published.path.abbreviated(), error = %e, "published record is not fresh, not caching");
            self.cache.remove(&key);
            return;
        }
        if !record.trust_window().contains(now) {
            debug!(path = %published.path.abbreviated(), "signing credentials not valid now, not caching");
            self.cache.remove(&key);
            return;
        }
        match String::from_utf8(published.value.clone()) {
            Ok(value) => {
                let hop = Hop {
                    value,
                    ttl: published.ttl,
                    deadline: published.deadline,
                };
                self.cache.insert(&key, &hop, now);
            }
            Err(_) => {
                debug!(path = %published.path.abbreviated(), "value is not utf-8, not caching");
                self.cache.remove(&key);
            }
        }
    }

    /// Point `/ptr/<label>` at `target`.
    pub async fn publish_pointer(&self, label: &str, target: &str) -> ResolveResult<String> {
        self.pointers.publish_pointer(label, target).await
    }

    /// Resolve with the configured depth.
    pub async fn resolve(&self, name: &str) -> ResolveResult<Resolution> {
        self.resolve_with(name, ResolveOptions::depth(self.config.resolver.depth))
            .await
    }

    pub async fn resolve_with(
        &self,
        name: &str,
        options: ResolveOptions,
    ) -> ResolveResult<Resolution> {
        self.resolver.resolve(name, options).await
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn cache(&self) -> &ResolverCache {
        &self.cache
    }

    pub fn config(&self) -> &NamesysConfig {
        &self.config
    }
}

impl std::fmt::Debug for Namesys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namesys")
            .field("resolver", &self.resolver)
            .field("cache", &self.cache)
            .finish()
    }
}
