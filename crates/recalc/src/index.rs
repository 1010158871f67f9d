#![forbid(unsafe_code)]

//! The dependency index: a reverse mapping from event type to the minimal
//! set of affected fields and store identities.
//!
//! Built once from a validated [`DependencySet`] and cacheable until that
//! set changes. An entry accumulates contributions from potentially many
//! fields and stores mapping to the same event type; membership grows by
//! monotonic set union and is never overwritten, so building twice from
//! equivalent inputs yields entries with identical set contents regardless
//! of iteration order.

use ahash::{AHashMap, AHashSet};

use crate::dependency::{Dependency, DependencySet};
use crate::error::DeclarationError;
use crate::store::{EventType, StoreHandle, StoreToken};

/// For one event type: the fields it affects and the identity tokens of the
/// stores that react to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexEntry {
    fields: AHashSet<String>,
    tokens: AHashSet<StoreToken>,
}

impl IndexEntry {
    /// Field names affected by this event type.
    #[must_use]
    pub fn fields(&self) -> &AHashSet<String> {
        &self.fields
    }

    /// Identity tokens of the stores that react to this event type.
    #[must_use]
    pub fn dispatch_tokens(&self) -> &AHashSet<StoreToken> {
        &self.tokens
    }

    #[must_use]
    pub fn affects_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    #[must_use]
    pub fn affects_store(&self, token: StoreToken) -> bool {
        self.tokens.contains(&token)
    }

    fn record(&mut self, field: &str, token: StoreToken) {
        if !self.fields.contains(field) {
            self.fields.insert(field.to_owned());
        }
        self.tokens.insert(token);
    }
}

/// Reverse index from event type to [`IndexEntry`].
///
/// Derived once from a validated dependency set; the binding layer looks up
/// the entry for each dispatched event and hands it to
/// [`DependencySet::calculate_for_event`](crate::dependency::DependencySet).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyIndex {
    entries: AHashMap<EventType, IndexEntry>,
}

impl DependencyIndex {
    /// Build the index for `set`.
    ///
    /// For every (field, store) pair reachable from the set, every event
    /// type the store declares gains that field's name and that store's
    /// token. A store handle that no longer upgrades fails the build with
    /// [`DeclarationError::InvalidStoreReference`].
    pub fn build<P, S, V, E>(set: &DependencySet<P, S, V, E>) -> Result<Self, DeclarationError> {
        let mut entries: AHashMap<EventType, IndexEntry> = AHashMap::new();
        for (field, dependency) in set.iter() {
            match dependency {
                Dependency::Store(handle) => {
                    Self::record_store(&mut entries, field, 0, handle)?;
                }
                Dependency::Compound(compound) => {
                    for (position, handle) in compound.stores().iter().enumerate() {
                        Self::record_store(&mut entries, field, position, handle)?;
                    }
                }
            }
        }
        tracing::debug!(
            message = "index.build",
            fields = set.len(),
            events = entries.len()
        );
        Ok(Self { entries })
    }

    fn record_store<V>(
        entries: &mut AHashMap<EventType, IndexEntry>,
        field: &str,
        position: usize,
        handle: &StoreHandle<V>,
    ) -> Result<(), DeclarationError> {
        let store = handle
            .upgrade()
            .ok_or_else(|| DeclarationError::InvalidStoreReference {
                field: field.to_owned(),
                index: position,
            })?;
        let token = store.token();
        for event in store.event_types() {
            entries.entry(event).or_default().record(field, token);
        }
        Ok(())
    }

    /// Entry for one event type, if any reachable store reacts to it.
    #[must_use]
    pub fn entry(&self, event: &EventType) -> Option<&IndexEntry> {
        self.entries.get(event)
    }

    /// Event types with at least one affected field.
    pub fn events(&self) -> impl Iterator<Item = &EventType> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EventType, &IndexEntry)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::Derivation;
    use crate::store::Store;
    use std::cell::Cell;
    use std::convert::Infallible;
    use std::rc::Rc;

    struct TestStore {
        value: Cell<i64>,
        token: StoreToken,
        events: Vec<EventType>,
    }

    impl TestStore {
        fn new(value: i64, events: &[&str]) -> Rc<Self> {
            Rc::new(Self {
                value: Cell::new(value),
                token: StoreToken::allocate(),
                events: events.iter().copied().map(EventType::from).collect(),
            })
        }
    }

    impl Store<i64> for TestStore {
        fn snapshot(&self) -> i64 {
            self.value.get()
        }

        fn token(&self) -> StoreToken {
            self.token
        }

        fn event_types(&self) -> Vec<EventType> {
            self.events.clone()
        }
    }

    type Set = DependencySet<i64, i64, i64, Infallible>;

    fn sum_derivation() -> Derivation<i64, i64, i64, Infallible> {
        Derivation::full(|_, _, stores| Ok(stores.iter().map(|s| s.snapshot()).sum()))
    }

    #[test]
    fn event_entry_collects_fields_and_tokens() {
        let a = TestStore::new(2, &["A_CHANGED"]);
        let b = TestStore::new(3, &["B_CHANGED"]);
        let stores: Vec<Rc<dyn Store<i64>>> = vec![a.clone(), b.clone()];
        let set = Set::new().with_compound("sum", &stores, sum_derivation());

        let index = DependencyIndex::build(&set).unwrap();
        assert_eq!(index.len(), 2);

        let entry = index.entry(&EventType::from("A_CHANGED")).unwrap();
        assert!(entry.affects_field("sum"));
        assert!(entry.affects_store(a.token()));
        assert!(!entry.affects_store(b.token()));
    }

    #[test]
    fn entries_union_across_fields_sharing_an_event() {
        let a = TestStore::new(1, &["CHANGED"]);
        let b = TestStore::new(2, &["CHANGED"]);
        let both: Vec<Rc<dyn Store<i64>>> = vec![a.clone(), b.clone()];
        let set = Set::new()
            .with_store("total", &a)
            .with_compound("sum", &both, sum_derivation());

        let index = DependencyIndex::build(&set).unwrap();
        let entry = index.entry(&EventType::from("CHANGED")).unwrap();

        assert_eq!(entry.fields().len(), 2);
        assert!(entry.affects_field("total"));
        assert!(entry.affects_field("sum"));
        assert_eq!(entry.dispatch_tokens().len(), 2);
    }

    #[test]
    fn duplicate_store_listing_does_not_duplicate_membership() {
        let a = TestStore::new(1, &["CHANGED"]);
        let twice: Vec<Rc<dyn Store<i64>>> = vec![a.clone(), a.clone()];
        let set = Set::new().with_compound("sum", &twice, sum_derivation());

        let index = DependencyIndex::build(&set).unwrap();
        let entry = index.entry(&EventType::from("CHANGED")).unwrap();
        assert_eq!(entry.fields().len(), 1);
        assert_eq!(entry.dispatch_tokens().len(), 1);
    }

    #[test]
    fn rebuild_yields_identical_set_contents() {
        let a = TestStore::new(1, &["A_CHANGED", "SHARED"]);
        let b = TestStore::new(2, &["B_CHANGED", "SHARED"]);
        let both: Vec<Rc<dyn Store<i64>>> = vec![a.clone(), b.clone()];
        let set = Set::new()
            .with_store("left", &a)
            .with_store("right", &b)
            .with_compound("sum", &both, sum_derivation());

        let first = DependencyIndex::build(&set).unwrap();
        let second = DependencyIndex::build(&set).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn store_with_no_events_contributes_nothing() {
        let silent = TestStore::new(1, &[]);
        let set = Set::new().with_store("quiet", &silent);

        let index = DependencyIndex::build(&set).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn dead_store_fails_the_build() {
        let a = TestStore::new(1, &["CHANGED"]);
        let set = Set::new().with_store("total", &a);
        drop(a);

        let err = DependencyIndex::build(&set).unwrap_err();
        assert_eq!(
            err,
            DeclarationError::InvalidStoreReference {
                field: "total".to_owned(),
                index: 0,
            }
        );
    }
}
