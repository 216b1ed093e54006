use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use mns_types::ContentHash;
use tracing::debug;

use crate::error::{ResolveError, ResolveResult};
use crate::resolver::{Hop, NameResolver, IPNS_PREFIX};

const DNSLINK_PREFIX: &str = "dnslink=";
const DNSLINK_SUBDOMAIN: &str = "_dnslink.";

/// Source of DNS TXT records.
#[async_trait]
pub trait TxtLookup: Send + Sync {
    /// All TXT strings published at `domain`. An unknown domain yields an
    /// empty list.
    async fn lookup_txt(&self, domain: &str) -> ResolveResult<Vec<String>>;
}

/// In-memory TXT zone.
#[derive(Debug, Default)]
pub struct StaticTxtLookup {
    records: RwLock<HashMap<String, Vec<String>>>,
}

impl StaticTxtLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a TXT string at `domain`.
    pub fn insert(&self, domain: impl Into<String>, txt: impl Into<String>) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(domain.into())
            .or_default()
            .push(txt.into());
    }

    /// Remove every TXT string at `domain`.
    pub fn remove(&self, domain: &str) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(domain);
    }
}

#[async_trait]
impl TxtLookup for StaticTxtLookup {
    async fn lookup_txt(&self, domain: &str) -> ResolveResult<Vec<String>> {
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(domain)
            .cloned()
            .unwrap_or_default())
    }
}

/// Resolves `/ipns/<domain>` through `dnslink=<path>` TXT records.
///
/// `_dnslink.<domain>` and `<domain>` are queried concurrently; a link at
/// `_dnslink.` wins.
#[derive(Clone)]
pub struct DnsResolver {
    lookup: Arc<dyn TxtLookup>,
}

impl DnsResolver {
    pub fn new(lookup: Arc<dyn TxtLookup>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl NameResolver for DnsResolver {
    fn name(&self) -> &'static str {
        "dns"
    }

    fn accepts(&self, root: &str) -> bool {
        root.strip_prefix(IPNS_PREFIX)
            .is_some_and(|name| ContentHash::from_hex(name).is_err() && is_domain(name))
    }

    async fn resolve_once(&self, root: &str) -> ResolveResult<Hop> {
        let domain = root
            .strip_prefix(IPNS_PREFIX)
            .ok_or_else(|| ResolveError::name(root, "not an /ipns/ name"))?;
        let subdomain = format!("{DNSLINK_SUBDOMAIN}{domain}");
        let (preferred, fallback) = tokio::join!(
            self.lookup.lookup_txt(&subdomain),
            self.lookup.lookup_txt(domain)
        );

        if let Ok(Some(link)) = preferred.as_ref().map(|txt| find_link(txt)) {
            debug!(domain, link, "dnslink found at subdomain");
            return Ok(Hop::new(link));
        }
        if let Ok(Some(link)) = fallback.as_ref().map(|txt| find_link(txt)) {
            debug!(domain, link, "dnslink found at domain");
            return Ok(Hop::new(link));
        }
        match (preferred, fallback) {
            (Err(e), Err(_)) => Err(e),
            _ => Err(ResolveError::NotFound(root.to_string())),
        }
    }
}

impl std::fmt::Debug for DnsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsResolver").finish_non_exhaustive()
    }
}

/// First well-formed `dnslink=/<path>` entry.
fn find_link(txt: &[String]) -> Option<&str> {
    txt.iter()
        .filter_map(|entry| entry.trim().strip_prefix(DNSLINK_PREFIX))
        .find(|link| link.starts_with('/'))
}

fn is_domain(name: &str) -> bool {
    name.contains('.')
        && name.len() <= 253
        && name.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
                && !label.starts_with('-')
                && !label.ends_with('-')
        })
}
