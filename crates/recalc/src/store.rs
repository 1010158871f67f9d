#![forbid(unsafe_code)]

//! The store capability surface consumed by this crate.
//!
//! A [`Store`] is an externally owned, addressable data source. This crate
//! needs exactly three things from it: a synchronous snapshot read, a stable
//! identity token for set membership, and the finite set of event types it
//! reacts to. Stores are referenced through [`StoreHandle`] weak pointers;
//! ownership and lifecycle stay with the binding layer.

use std::fmt;
use std::rc::Weak;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a kind of change a [`Store`] may react to.
///
/// Cheap to clone (shared interned string); used as the key of the
/// dependency index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventType(Arc<str>);

impl EventType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        Self(Arc::from(name))
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self(Arc::from(name.as_str()))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque, stable identity of a store.
///
/// Compared and hashed for set membership, never dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreToken(u64);

impl StoreToken {
    /// Allocate a fresh, process-unique token.
    #[must_use]
    pub fn allocate() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a caller-chosen raw identity.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Capability contract required from the store collaborator.
///
/// All three methods are synchronous and must be safe to call repeatedly
/// within one calculation (snapshot reads are idempotent with respect to
/// this crate and are not deduplicated).
pub trait Store<V> {
    /// Current value of the store.
    fn snapshot(&self) -> V;

    /// Stable identity token, used only for set membership.
    fn token(&self) -> StoreToken;

    /// Event types this store reacts to.
    fn event_types(&self) -> Vec<EventType>;
}

/// Non-owning handle to an externally owned store.
///
/// A handle that no longer upgrades is reported by the Validator as an
/// invalid store reference.
pub type StoreHandle<V> = Weak<dyn Store<V>>;
