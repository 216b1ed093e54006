//! Foundation types for the mutable naming system (MNS).
//!
//! MNS publishes signed, versioned, expiring pointers at stable paths over an
//! immutable content-addressed store. This crate holds the identifiers every
//! other MNS crate shares.
//!
//! # Key Types
//!
//! - [`ContentHash`]: BLAKE3 digest addressing an immutable object
//! - [`RecordPath`]: `/ipns/<root-id>[/<segment>...]` record location
//! - [`format_timestamp`] / [`parse_timestamp`]: RFC 3339 nanosecond codec

pub mod error;
pub mod hash;
pub mod path;
pub mod time;

pub use error::TypeError;
pub use hash::ContentHash;
pub use path::{RecordPath, NAMESPACE};
pub use time::{format_timestamp, parse_timestamp};
