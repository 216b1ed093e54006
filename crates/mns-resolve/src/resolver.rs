use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::DEFAULT_DEPTH;
use crate::error::{ResolveError, ResolveResult};

/// Prefix of immutable content addresses. Resolution stops here.
pub const IPFS_PREFIX: &str = "/ipfs/";
/// Prefix of native records and DNS names.
pub const IPNS_PREFIX: &str = "/ipns/";
/// Prefix of routing-layer pointers.
pub const PTR_PREFIX: &str = "/ptr/";

const INDIRECTION_PREFIXES: [&str; 2] = [IPNS_PREFIX, PTR_PREFIX];

/// Result of resolving one name one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hop {
    /// Terminal address or another name.
    pub value: String,
    /// Cache hint from the source.
    pub ttl: Option<Duration>,
    /// Instant after which `value` must not be served.
    pub deadline: Option<DateTime<Utc>>,
}

impl Hop {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ttl: None,
            deadline: None,
        }
    }
}

/// A single-hop resolver for one protocol.
///
/// Resolvers only ever see a root name (`/<prefix>/<root>`); trailing
/// segments, recursion and loop detection belong to [`Resolver`].
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether this resolver handles `root`.
    fn accepts(&self, root: &str) -> bool;

    /// Resolve `root` one step without recursing.
    async fn resolve_once(&self, root: &str) -> ResolveResult<Hop>;
}

/// Outcome of a recursive resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// A terminal address, or a value no resolver recurses on.
    Complete(String),
    /// The depth budget ran out; `partial` is the last name reached.
    RecursionLimitExceeded { partial: String },
}

impl Resolution {
    pub fn path(&self) -> &str {
        match self {
            Self::Complete(path) => path,
            Self::RecursionLimitExceeded { partial } => partial,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// Options for one resolution.
#[derive(Clone, Debug)]
pub struct ResolveOptions {
    /// Maximum hops. 1 resolves exactly one hop.
    pub depth: u32,
    /// Abandon the resolution when cancelled.
    pub cancel: Option<CancellationToken>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            cancel: None,
        }
    }
}

impl ResolveOptions {
    pub fn depth(depth: u32) -> Self {
        Self {
            depth,
            ..Self::default()
        }
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Drives single-hop resolvers until a terminal address is reached.
#[derive(Clone, Default)]
pub struct Resolver {
    resolvers: Vec<Arc<dyn NameResolver>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolver. Earlier resolvers take precedence.
    pub fn with(mut self, resolver: impl NameResolver + 'static) -> Self {
        self.push(Arc::new(resolver));
        self
    }

    pub fn push(&mut self, resolver: Arc<dyn NameResolver>) {
        self.resolvers.push(resolver);
    }

    pub async fn resolve(&self, name: &str, options: ResolveOptions) -> ResolveResult<Resolution> {
        if options.depth == 0 {
            return Err(ResolveError::InvalidDepth);
        }
        match options.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(ResolveError::Cancelled),
                result = self.drive(name, options.depth) => result,
            },
            None => self.drive(name, options.depth).await,
        }
    }

    async fn drive(&self, name: &str, depth: u32) -> ResolveResult<Resolution> {
        let mut current = normalize(name)?;
        if current.starts_with(IPFS_PREFIX) {
            return Ok(Resolution::Complete(current));
        }

        let mut seen = HashSet::new();
        let mut remaining = depth;
        loop {
            let (root, rest) = split_name(&current)?;
            if !seen.insert(root.clone()) {
                return Err(ResolveError::Cycle(root));
            }
            let resolver = self
                .resolvers
                .iter()
                .find(|r| r.accepts(&root))
                .ok_or_else(|| ResolveError::NoResolver(root.clone()))?;

            let hop = resolver.resolve_once(&root).await?;
            let next = append_segments(&hop.value, &rest);
            debug!(resolver = resolver.name(), from = %root, to = %next, remaining, "resolved hop");

            if !is_indirection(&next) {
                return Ok(Resolution::Complete(next));
            }
            remaining -= 1;
            if remaining == 0 {
                debug!(name, partial = %next, depth, "resolution depth exhausted");
                return Ok(Resolution::RecursionLimitExceeded { partial: next });
            }
            current = next;
        }
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.resolvers.iter().map(|r| r.name()).collect();
        f.debug_struct("Resolver").field("resolvers", &names).finish()
    }
}

/// Prefix bare names with `/ipns/`.
fn normalize(name: &str) -> ResolveResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ResolveError::name(name, "empty name"));
    }
    if name.starts_with('/') {
        Ok(name.to_string())
    } else {
        Ok(format!("{IPNS_PREFIX}{name}"))
    }
}

/// Split `/<prefix>/<root>/<rest>...` into the root name and the rest.
fn split_name(name: &str) -> ResolveResult<(String, Vec<String>)> {
    let body = name
        .strip_prefix('/')
        .ok_or_else(|| ResolveError::name(name, "missing leading slash"))?;
    let parts: Vec<&str> = body.split('/').collect();
    if parts.len() < 2 {
        return Err(ResolveError::name(name, "expected /<prefix>/<root>"));
    }
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ResolveError::name(name, "empty path segment"));
    }
    let root = format!("/{}/{}", parts[0], parts[1]);
    let rest = parts[2..].iter().map(|s| s.to_string()).collect();
    Ok((root, rest))
}

fn append_segments(value: &str, rest: &[String]) -> String {
    if rest.is_empty() {
        return value.to_string();
    }
    format!("{}/{}", value.trim_end_matches('/'), rest.join("/"))
}

fn is_indirection(name: &str) -> bool {
    INDIRECTION_PREFIXES.iter().any(|p| name.starts_with(p))
}
