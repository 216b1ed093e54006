//! Storage boundary for the mutable naming system.
//!
//! MNS does not own a network. Every record, public key and certificate is
//! written to an external [`ValueStore`] (a routing layer offering put/get of
//! opaque bytes by string key) as a kind-tagged [`Block`].
//!
//! # Components
//!
//! - [`ValueStore`] -- async interface to the routing layer
//! - [`InMemoryValueStore`] -- two-tier (local replica + network) store for
//!   tests and embedding
//! - [`Block`] / [`BlockKind`] -- content-addressed, kind-tagged payloads
//! - [`KeyManager`] / [`CertificateManager`] -- publish and fetch trust
//!   anchors by content hash
//! - [`with_timeout`] -- per-operation deadline wrapper
//!
//! # Design Rules
//!
//! 1. Blocks are immutable once written; the key is derived from content.
//! 2. Every network operation is bounded by its own timeout.
//! 3. Timeouts surface as errors and are never retried here.
//! 4. Fetch failures and decode failures are distinct error variants.

pub mod block;
pub mod certs;
pub mod error;
pub mod keys;
pub mod memory;
pub mod timeout;
pub mod traits;

pub use block::{routing_key, Block, BlockKind};
pub use certs::CertificateManager;
pub use error::{StoreError, StoreResult};
pub use keys::KeyManager;
pub use memory::InMemoryValueStore;
pub use timeout::{with_timeout, DEFAULT_PUT_TIMEOUT};
pub use traits::ValueStore;
