#![forbid(unsafe_code)]

//! Dependency resolution and minimal-recompute indexing for store-backed
//! fields.
//!
//! A component declares a [`DependencySet`]: a map from field name to either
//! a bare [`Store`] reference or a [`Compound`] dependency (a derivation
//! function plus the ordered stores it may read). This crate answers three
//! questions about such a set:
//!
//! - Is it well-formed? ([`DependencySet::validate`])
//! - What is each field's current value? ([`calculate`], plus one entry
//!   point per recomputation trigger: initial mount, a dispatched event, a
//!   props transition, a state transition)
//! - Which fields must be recomputed when an event of a given type is
//!   observed? ([`DependencyIndex::build`])
//!
//! # Architecture
//!
//! Stores are owned by the binding layer; this crate holds non-owning
//! [`StoreHandle`] weak references and reads them as synchronous snapshots.
//! Each compound derivation carries an explicit calling-convention tag
//! ([`Convention`]): the tag documents what the derivation may read and
//! decides how eagerly each entry point must refresh it. Everything is
//! synchronous and single-threaded (`Rc`/`Weak` sharing); entry points
//! return fresh maps, and the index builder produces a new index value
//! rather than mutating its input.
//!
//! # Invariants
//!
//! 1. Validation performs no transformation and is idempotent.
//! 2. Index entries grow by monotonic set union; membership never depends on
//!    iteration order.
//! 3. Every entry point returns a map restricted to exactly the fields it
//!    recomputed and mutates neither the set nor any store.
//! 4. A derivation failure propagates to the caller verbatim, never
//!    wrapped, never retried.
//! 5. A dependency set, once validated and indexed, is expected to stay
//!    structurally stable; any change requires a new set, re-validated and
//!    re-indexed.

pub mod calc;
pub mod dependency;
pub mod error;
pub mod index;
pub mod store;

pub use calc::calculate;
pub use dependency::{Compound, Convention, Dependency, DependencySet, Derivation};
pub use error::{CalcError, DeclarationError};
pub use index::{DependencyIndex, IndexEntry};
pub use store::{EventType, Store, StoreHandle, StoreToken};
