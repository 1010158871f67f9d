#![forbid(unsafe_code)]

//! The declared dependency model: derivations, compounds, and the per-field
//! dependency set.
//!
//! A [`DependencySet`] is authored once per component definition and treated
//! as immutable thereafter. [`DependencySet::validate`] checks the residual
//! well-formedness the type system cannot express (store liveness, and a
//! full-convention derivation declaring at least one source store); on
//! success it returns without transforming or copying anything, and
//! re-validating an already-valid set always succeeds.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::error::DeclarationError;
use crate::store::{Store, StoreHandle};

/// Calling convention of a derivation function.
///
/// Declared explicitly on each derivation. The tag simultaneously documents
/// what the derivation may read (used by the index builder) and how eagerly
/// it must be refreshed (used by the calculation entry points).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Convention {
    /// No inputs. Recomputed fresh on every invocation regardless of
    /// external state; considered fixed after the initial calculation.
    Constant,
    /// Reads the current props value only.
    Props,
    /// Reads props, optional state, and the live ordered source stores.
    Full,
}

/// A pure derivation function, tagged by its calling convention.
///
/// `P` is the component's props type, `S` its state type, `V` the field
/// value type, and `E` the derivation's own error type. An `Err` returned
/// here propagates to the caller verbatim.
pub enum Derivation<P, S, V, E> {
    Constant(Box<dyn Fn() -> Result<V, E>>),
    Props(Box<dyn Fn(&P) -> Result<V, E>>),
    #[allow(clippy::type_complexity)]
    Full(Box<dyn Fn(&P, Option<&S>, &[Rc<dyn Store<V>>]) -> Result<V, E>>),
}

impl<P, S, V, E> Derivation<P, S, V, E> {
    pub fn constant(f: impl Fn() -> Result<V, E> + 'static) -> Self {
        Self::Constant(Box::new(f))
    }

    pub fn props(f: impl Fn(&P) -> Result<V, E> + 'static) -> Self {
        Self::Props(Box::new(f))
    }

    pub fn full(
        f: impl Fn(&P, Option<&S>, &[Rc<dyn Store<V>>]) -> Result<V, E> + 'static,
    ) -> Self {
        Self::Full(Box::new(f))
    }

    #[must_use]
    pub fn convention(&self) -> Convention {
        match self {
            Self::Constant(_) => Convention::Constant,
            Self::Props(_) => Convention::Props,
            Self::Full(_) => Convention::Full,
        }
    }
}

impl<P, S, V, E> fmt::Debug for Derivation<P, S, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Derivation::{:?}", self.convention())
    }
}

/// A derivation function paired with the ordered source stores it may read
/// (via the full convention) and whose reactions place it in the index.
pub struct Compound<P, S, V, E> {
    pub(crate) stores: Vec<StoreHandle<V>>,
    pub(crate) derive: Derivation<P, S, V, E>,
}

impl<P, S, V, E> Compound<P, S, V, E> {
    #[must_use]
    pub fn new(stores: Vec<StoreHandle<V>>, derive: Derivation<P, S, V, E>) -> Self {
        Self { stores, derive }
    }

    #[must_use]
    pub fn stores(&self) -> &[StoreHandle<V>] {
        &self.stores
    }

    #[must_use]
    pub fn convention(&self) -> Convention {
        self.derive.convention()
    }
}

impl<P, S, V, E> fmt::Debug for Compound<P, S, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compound")
            .field("stores", &self.stores.len())
            .field("derive", &self.derive)
            .finish()
    }
}

/// One field's dependency: a direct store reference or a compound.
pub enum Dependency<P, S, V, E> {
    Store(StoreHandle<V>),
    Compound(Compound<P, S, V, E>),
}

impl<P, S, V, E> Dependency<P, S, V, E> {
    /// Calling convention of the compound arm; `None` for a bare store.
    #[must_use]
    pub fn convention(&self) -> Option<Convention> {
        match self {
            Self::Store(_) => None,
            Self::Compound(compound) => Some(compound.convention()),
        }
    }
}

impl<P, S, V, E> fmt::Debug for Dependency<P, S, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(_) => f.write_str("Dependency::Store"),
            Self::Compound(compound) => write!(f, "Dependency::{compound:?}"),
        }
    }
}

/// A mapping from field name to [`Dependency`], authored once per component
/// definition. Insertion order is irrelevant; field names are unique by
/// construction (a later insert for the same name replaces the earlier one).
pub struct DependencySet<P, S, V, E> {
    fields: AHashMap<String, Dependency<P, S, V, E>>,
}

impl<P, S, V, E> Default for DependencySet<P, S, V, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, S, V, E> fmt::Debug for DependencySet<P, S, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.fields.iter()).finish()
    }
}

impl<P, S, V, E> DependencySet<P, S, V, E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: AHashMap::new(),
        }
    }

    /// Declare a field backed directly by a store.
    #[must_use]
    pub fn with_store<T>(mut self, field: impl Into<String>, store: &Rc<T>) -> Self
    where
        T: Store<V> + 'static,
    {
        let store: Rc<dyn Store<V>> = Rc::clone(store) as Rc<dyn Store<V>>;
        let handle: StoreHandle<V> = Rc::downgrade(&store);
        self.fields.insert(field.into(), Dependency::Store(handle));
        self
    }

    /// Declare a compound field: a derivation plus its ordered source stores.
    #[must_use]
    pub fn with_compound(
        mut self,
        field: impl Into<String>,
        stores: &[Rc<dyn Store<V>>],
        derive: Derivation<P, S, V, E>,
    ) -> Self {
        let stores = stores.iter().map(Rc::downgrade).collect();
        self.fields
            .insert(field.into(), Dependency::Compound(Compound::new(stores, derive)));
        self
    }

    /// Declare a field from a pre-built [`Dependency`].
    #[must_use]
    pub fn with_dependency(
        mut self,
        field: impl Into<String>,
        dependency: Dependency<P, S, V, E>,
    ) -> Self {
        self.fields.insert(field.into(), dependency);
        self
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Dependency<P, S, V, E>> {
        self.fields.get(field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Dependency<P, S, V, E>)> {
        self.fields.iter().map(|(name, dep)| (name.as_str(), dep))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Check structural well-formedness of the declared set.
    ///
    /// Fails fast on the first violation, naming the offending field and
    /// store position. Succeeding here is a prerequisite for
    /// [`DependencyIndex::build`](crate::index::DependencyIndex::build) and
    /// the calculation entry points; re-validating a valid set is a no-op.
    pub fn validate(&self) -> Result<(), DeclarationError> {
        for (field, dependency) in &self.fields {
            match dependency {
                Dependency::Store(handle) => {
                    if handle.upgrade().is_none() {
                        return Err(DeclarationError::InvalidStoreReference {
                            field: field.clone(),
                            index: 0,
                        });
                    }
                }
                Dependency::Compound(compound) => {
                    if compound.convention() == Convention::Full && compound.stores.is_empty() {
                        return Err(DeclarationError::MalformedDeclaration {
                            field: field.clone(),
                            reason: "full-convention derivation declares no source stores"
                                .to_owned(),
                        });
                    }
                    for (index, handle) in compound.stores.iter().enumerate() {
                        if handle.upgrade().is_none() {
                            return Err(DeclarationError::InvalidStoreReference {
                                field: field.clone(),
                                index,
                            });
                        }
                    }
                }
            }
        }
        tracing::debug!(message = "deps.validate", fields = self.fields.len());
        Ok(())
    }

    /// True iff at least one compound dependency reads state (full
    /// convention). Lets the binding layer decide once, cheaply, whether
    /// state-change tracking is needed at all.
    #[must_use]
    pub fn uses_state(&self) -> bool {
        self.fields
            .values()
            .any(|dep| dep.convention() == Some(Convention::Full))
    }
}
