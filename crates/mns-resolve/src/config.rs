use std::path::Path;
use std::time::Duration;

use mns_record::RecordConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, ResolveResult};

/// Default bound on indirection hops.
pub const DEFAULT_DEPTH: u32 = 32;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Hops followed before reporting an incomplete resolution.
    pub depth: u32,
    /// Cached names; 0 disables the cache.
    pub cache_size: usize,
    /// Upper bound on how long a resolved hop is cached.
    pub cache_ttl_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            cache_size: 128,
            cache_ttl_ms: 60_000,
        }
    }
}

impl ResolverConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

/// Configuration of a [`Namesys`](crate::Namesys).
///
/// ```toml
/// [record]
/// put_timeout_ms = 5000
///
/// [resolver]
/// depth = 8
/// cache_size = 0
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamesysConfig {
    pub record: RecordConfig,
    pub resolver: ResolverConfig,
}

impl NamesysConfig {
    pub fn from_toml_str(text: &str) -> ResolveResult<Self> {
        toml::from_str(text).map_err(|e| ResolveError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> ResolveResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ResolveError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let c = NamesysConfig::default();
        assert_eq!(c.resolver.depth, 32);
        assert_eq!(c.resolver.cache_size, 128);
        assert_eq!(c.resolver.cache_ttl(), Duration::from_secs(60));
        assert_eq!(c.record, RecordConfig::default());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = NamesysConfig::from_toml_str(
            "[resolver]\ndepth = 4\n\n[record]\nsequence_timeout_ms = 500\n",
        )
        .unwrap();
        assert_eq!(c.resolver.depth, 4);
        assert_eq!(c.resolver.cache_size, 128);
        assert_eq!(c.record.sequence_timeout(), Duration::from_millis(500));
        assert_eq!(c.record.put_timeout_ms, 10_000);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(NamesysConfig::from_toml_str("").unwrap(), NamesysConfig::default());
    }

    #[test]
    fn bad_toml_is_config_error() {
        assert!(matches!(
            NamesysConfig::from_toml_str("[resolver]\ndepth = \"deep\""),
            Err(ResolveError::Config(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[resolver]\ncache_size = 0").unwrap();
        let c = NamesysConfig::load(file.path()).unwrap();
        assert_eq!(c.resolver.cache_size, 0);

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            NamesysConfig::load(dir.path().join("missing.toml")),
            Err(ResolveError::Config(_))
        ));
    }
}
