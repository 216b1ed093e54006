//! Record path parsing and construction.
//!
//! A record path has the textual form `/ipns/<root-id>[/<segment>...]`:
//! - The namespace is the fixed literal [`NAMESPACE`]
//! - `root-id` is the hex [`ContentHash`] of a public key or certificate
//! - Trailing segments are non-empty and separated by single slashes
//! - There is exactly one leading slash and no trailing slash

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash::ContentHash;

/// Namespace literal of every record path.
pub const NAMESPACE: &str = "ipns";

/// Location of a record: a root-id plus optional trailing segments.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordPath {
    root: ContentHash,
    segments: Vec<String>,
}

impl RecordPath {
    /// The base path for a root-id (no trailing segments).
    pub fn new(root: ContentHash) -> Self {
        Self {
            root,
            segments: Vec::new(),
        }
    }

    /// Build a path from a root-id and trailing segments.
    pub fn with_segments<I, S>(root: ContentHash, segments: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut path = Self::new(root);
        for segment in segments {
            path = path.join(segment)?;
        }
        Ok(path)
    }

    /// Parse a path from its textual form.
    pub fn from_string(s: &str) -> Result<Self, TypeError> {
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| TypeError::path(s, "missing leading '/'"))?;

        let mut parts = rest.split('/');
        match parts.next() {
            Some(NAMESPACE) => {}
            Some("") | None => return Err(TypeError::path(s, "empty namespace")),
            Some(other) => {
                return Err(TypeError::path(
                    s,
                    format!("unknown namespace {other:?}, expected {NAMESPACE:?}"),
                ))
            }
        }

        let root = match parts.next() {
            Some("") | None => return Err(TypeError::path(s, "missing root-id")),
            Some(id) => ContentHash::from_hex(id)
                .map_err(|e| TypeError::path(s, format!("invalid root-id: {e}")))?,
        };

        let mut segments = Vec::new();
        for part in parts {
            if part.is_empty() {
                return Err(TypeError::path(s, "path segments must not be empty"));
            }
            segments.push(part.to_string());
        }

        Ok(Self { root, segments })
    }

    /// Returns `true` if `s` parses as a record path.
    pub fn is_valid(s: &str) -> bool {
        Self::from_string(s).is_ok()
    }

    /// The root-id: content hash of the record's trust anchor.
    pub fn root(&self) -> &ContentHash {
        &self.root
    }

    /// Trailing segments after the root-id.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Every component in order: namespace, root-id, then trailing segments.
    pub fn components(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.segments.len() + 2);
        out.push(NAMESPACE.to_string());
        out.push(self.root.to_hex());
        out.extend(self.segments.iter().cloned());
        out
    }

    /// The path without trailing segments.
    pub fn base(&self) -> Self {
        Self::new(self.root)
    }

    /// Returns `true` if this path has no trailing segments.
    pub fn is_base(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append one segment.
    pub fn join(&self, segment: impl Into<String>) -> Result<Self, TypeError> {
        let segment = segment.into();
        if segment.is_empty() || segment.contains('/') {
            return Err(TypeError::path(
                &format!("{self}/{segment}"),
                format!("invalid segment {segment:?}"),
            ));
        }
        let mut segments = self.segments.clone();
        segments.push(segment);
        Ok(Self {
            root: self.root,
            segments,
        })
    }

    /// Human-readable form with the root-id elided to a short prefix.
    pub fn abbreviated(&self) -> String {
        let mut out = format!("/{NAMESPACE}/{}…", self.root.short_hex());
        for segment in &self.segments {
            out.push('/');
            out.push_str(segment);
        }
        out
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{NAMESPACE}/{}", self.root)?;
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordPath({})", self.abbreviated())
    }
}

impl FromStr for RecordPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn root() -> ContentHash {
        ContentHash::digest(b"root key")
    }

    #[test]
    fn parse_base_path() {
        let text = format!("/ipns/{}", root());
        let path = RecordPath::from_string(&text).unwrap();
        assert_eq!(path.root(), &root());
        assert!(path.is_base());
        assert_eq!(path.to_string(), text);
    }

    #[test]
    fn parse_path_with_segments() {
        let text = format!("/ipns/{}/my/path", root());
        let path = RecordPath::from_string(&text).unwrap();
        assert_eq!(path.segments(), ["my", "path"]);
        assert_eq!(path.base(), RecordPath::new(root()));
        assert_eq!(path.to_string(), text);
        assert_eq!(path.components().len(), 4);
        assert_eq!(path.components()[0], NAMESPACE);
    }

    #[test]
    fn rejects_malformed_paths() {
        let hex = root().to_hex();
        let bad = [
            String::new(),
            "/".into(),
            format!("ipns/{hex}"),
            format!("//ipns/{hex}"),
            format!("/ipns/{hex}/"),
            format!("/ipns/{hex}//seg"),
            format!("/ipfs/{hex}"),
            "/ipns/".into(),
            "/ipns/not-a-hash".into(),
            format!("/ipns/{}", &hex[..10]),
        ];
        for text in bad {
            assert!(RecordPath::from_string(&text).is_err(), "{text:?} should fail");
            assert!(!RecordPath::is_valid(&text));
        }
    }

    #[test]
    fn join_rejects_empty_and_slashed_segments() {
        let path = RecordPath::new(root());
        assert!(path.join("").is_err());
        assert!(path.join("a/b").is_err());
        assert_eq!(path.join("a").unwrap().segments(), ["a"]);
    }

    #[test]
    fn abbreviated_elides_hash() {
        let path = RecordPath::with_segments(root(), ["docs"]).unwrap();
        let short = path.abbreviated();
        assert!(short.starts_with("/ipns/"));
        assert!(short.ends_with("/docs"));
        assert!(short.contains(&root().short_hex()));
        assert!(!short.contains(&root().to_hex()));
    }

    #[test]
    fn serde_roundtrip() {
        let path = RecordPath::with_segments(root(), ["a", "b"]).unwrap();
        let json = serde_json::to_string(&path).unwrap();
        let parsed: RecordPath = serde_json::from_str(&json).unwrap();
        assert_eq!(path, parsed);
    }

    proptest! {
        #[test]
        fn valid_paths_roundtrip(
            seed in any::<[u8; 32]>(),
            segments in proptest::collection::vec("[a-zA-Z0-9._-]{1,12}", 0..5),
        ) {
            let hash = ContentHash::from_hash(seed);
            let text = std::iter::once(format!("/ipns/{hash}"))
                .chain(segments.iter().cloned())
                .collect::<Vec<_>>()
                .join("/");
            let path = RecordPath::from_string(&text).unwrap();
            prop_assert_eq!(path.to_string(), text);
            prop_assert_eq!(path.segments(), segments.as_slice());
        }

        #[test]
        fn empty_segment_anywhere_is_rejected(
            seed in any::<[u8; 32]>(),
            segments in proptest::collection::vec("[a-z]{1,6}", 1..5),
            at in any::<prop::sample::Index>(),
        ) {
            let hash = ContentHash::from_hash(seed);
            let mut segments = segments;
            let idx = at.index(segments.len() + 1);
            segments.insert(idx, String::new());
            let text = std::iter::once(format!("/ipns/{hash}"))
                .chain(segments)
                .collect::<Vec<_>>()
                .join("/");
            prop_assert!(RecordPath::from_string(&text).is_err());
        }

        #[test]
        fn is_valid_agrees_with_from_string(s in "\\PC{0,80}") {
            prop_assert_eq!(RecordPath::is_valid(&s), RecordPath::from_string(&s).is_ok());
        }
    }
}
