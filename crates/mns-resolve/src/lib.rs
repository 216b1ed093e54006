//! Recursive name resolution for the mutable naming system.
//!
//! A name is resolved hop by hop until it reaches an immutable `/ipfs/`
//! address. Each hop is answered by one [`NameResolver`]:
//!
//! - [`RecordResolver`] for `/ipns/<hash>`, through verified signed records
//! - [`DnsResolver`] for `/ipns/<domain>`, through `dnslink=` TXT records
//! - [`PointerResolver`] for `/ptr/<label>`, through unsigned routing values
//!
//! [`Resolver`] drives the hops with a depth bound, loop detection and
//! cancellation. [`ResolverCache`] bounds how long hops are reused, never
//! past the end of life of the record they came from. [`Namesys`] wires
//! publishing and resolution over one value store.

pub mod cache;
pub mod config;
pub mod dns;
pub mod error;
pub mod namesys;
pub mod pointer;
pub mod record;
pub mod resolver;

pub use cache::{CachedResolver, ResolverCache};
pub use config::{NamesysConfig, ResolverConfig, DEFAULT_DEPTH};
pub use dns::{DnsResolver, StaticTxtLookup, TxtLookup};
pub use error::{ResolveError, ResolveResult};
pub use namesys::Namesys;
pub use pointer::PointerResolver;
pub use record::RecordResolver;
pub use resolver::{
    Hop, NameResolver, Resolution, ResolveOptions, Resolver, IPFS_PREFIX, IPNS_PREFIX, PTR_PREFIX,
};
