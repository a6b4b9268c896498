//! Package implement offline bulk-load and reindex tooling for
//! directory-information-tree storage.
//!
//! A directory backend persists its data as three families of tables
//! inside an ordered, duplicate-key-capable key/value store,
//!
//! * _id2entry_, the primary store, mapping entry-id to serialized entry.
//! * _dn2id_, mapping canonical-name to entry-id.
//! * one _inverted index_ per indexed attribute, mapping index token to
//!   the set of entry-ids carrying that token.
//!
//! The [tool::Session] type drives all three during a load. Entries can
//! arrive in any order; ancestors that have not arrived yet are
//! materialized on first reference and reconciled when the real entry
//! shows up. Refer to [tool] module documentation for the full life-cycle.
//!
//! Inverted-index postings are buffered in an in-memory IDL cache and
//! written out in bulk, switching a key to a compact `[0, first, last]`
//! range representation once its posting count crosses a configurable
//! threshold.

#![allow(clippy::needless_range_loop)]

#[macro_use]
mod error;
mod util;

pub mod dbs;
pub mod mdb;
pub mod schema;
pub mod tool;

pub use crate::error::Error;

/// Type alias for Result return type, used by this package.
pub type Result<T> = std::result::Result<T, Error>;
