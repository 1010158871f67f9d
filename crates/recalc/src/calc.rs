#![forbid(unsafe_code)]

//! The per-field calculation protocol and its four entry points.
//!
//! [`calculate`] resolves one dependency: a bare store is read as a
//! snapshot; a compound dispatches on its derivation's calling convention.
//! On top of it sit four entry points, one per recomputation trigger:
//!
//! - [`DependencySet::calculate_initial`] — every field, once, at mount.
//! - [`DependencySet::calculate_for_event`] — only the fields named by one
//!   [`IndexEntry`].
//! - [`DependencySet::calculate_for_props`] — compound fields whose
//!   convention consumes at least one positional input (props or full).
//! - [`DependencySet::calculate_for_state`] — compound fields whose
//!   convention reads state (full only).
//!
//! Bare-store fields refresh solely via their own dispatched events, and
//! constant-convention fields are fixed after the initial calculation;
//! neither is touched by the props/state entry points. Each entry point
//! returns a map holding exactly the fields it recomputed.

use std::rc::Rc;

use ahash::AHashMap;

use crate::dependency::{Convention, Dependency, DependencySet, Derivation};
use crate::error::CalcError;
use crate::index::IndexEntry;

/// Compute the current value of one dependency.
///
/// The field name is threaded through purely for error context. A
/// derivation's `Err` propagates verbatim as [`CalcError::Derivation`].
pub fn calculate<P, S, V, E>(
    field: &str,
    dependency: &Dependency<P, S, V, E>,
    props: &P,
    state: Option<&S>,
) -> Result<V, CalcError<E>>
where
    E: std::error::Error,
{
    match dependency {
        Dependency::Store(handle) => {
            let store = handle.upgrade().ok_or_else(|| CalcError::StoreDropped {
                field: field.to_owned(),
                index: 0,
            })?;
            Ok(store.snapshot())
        }
        Dependency::Compound(compound) => match &compound.derive {
            Derivation::Constant(derive) => derive().map_err(CalcError::Derivation),
            Derivation::Props(derive) => derive(props).map_err(CalcError::Derivation),
            Derivation::Full(derive) => {
                let mut live = Vec::with_capacity(compound.stores.len());
                for (index, handle) in compound.stores.iter().enumerate() {
                    let store: Rc<_> = handle.upgrade().ok_or_else(|| CalcError::StoreDropped {
                        field: field.to_owned(),
                        index,
                    })?;
                    live.push(store);
                }
                derive(props, state, &live).map_err(CalcError::Derivation)
            }
        },
    }
}

impl<P, S, V, E> DependencySet<P, S, V, E>
where
    E: std::error::Error,
{
    /// Compute every field. Used exactly once, at construction/mount.
    pub fn calculate_initial(
        &self,
        props: &P,
        state: Option<&S>,
    ) -> Result<AHashMap<String, V>, CalcError<E>> {
        let mut out = AHashMap::with_capacity(self.len());
        for (field, dependency) in self.iter() {
            out.insert(field.to_owned(), calculate(field, dependency, props, state)?);
        }
        Ok(out)
    }

    /// Recompute only the fields named by `entry` (the index entry for the
    /// event that just occurred). Fields unknown to this set are skipped.
    pub fn calculate_for_event(
        &self,
        entry: &IndexEntry,
        props: &P,
        state: Option<&S>,
    ) -> Result<AHashMap<String, V>, CalcError<E>> {
        let mut out = AHashMap::with_capacity(entry.fields().len());
        for field in entry.fields() {
            match self.get(field) {
                Some(dependency) => {
                    out.insert(field.clone(), calculate(field, dependency, props, state)?);
                }
                None => {
                    tracing::debug!(message = "calc.event.unknown_field", field = %field);
                }
            }
        }
        Ok(out)
    }

    /// Recompute the fields whose convention consumes props: compound
    /// dependencies with the props or full convention. Bare-store and
    /// constant-convention fields are deliberately excluded.
    pub fn calculate_for_props(
        &self,
        props: &P,
        state: Option<&S>,
    ) -> Result<AHashMap<String, V>, CalcError<E>> {
        self.calculate_where(props, state, |convention| {
            matches!(convention, Some(Convention::Props | Convention::Full))
        })
    }

    /// Recompute the fields whose convention reads state: compound
    /// dependencies with the full convention only.
    pub fn calculate_for_state(
        &self,
        props: &P,
        state: Option<&S>,
    ) -> Result<AHashMap<String, V>, CalcError<E>> {
        self.calculate_where(props, state, |convention| {
            matches!(convention, Some(Convention::Full))
        })
    }

    fn calculate_where(
        &self,
        props: &P,
        state: Option<&S>,
        include: impl Fn(Option<Convention>) -> bool,
    ) -> Result<AHashMap<String, V>, CalcError<E>> {
        let mut out = AHashMap::new();
        for (field, dependency) in self.iter() {
            if include(dependency.convention()) {
                out.insert(field.to_owned(), calculate(field, dependency, props, state)?);
            }
        }
        Ok(out)
    }
}
