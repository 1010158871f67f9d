#![forbid(unsafe_code)]

//! Error taxonomy.
//!
//! Everything here is raised synchronously and treated as a programmer or
//! setup error, not a recoverable runtime condition. Validation fails fast
//! at component-definition time; the calculator and index builder never
//! suppress or wrap a failure.

use thiserror::Error;

/// A dependency declaration that cannot be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    /// The entry is structurally unacceptable in a way the type system
    /// cannot rule out.
    #[error("field `{field}`: {reason}")]
    MalformedDeclaration { field: String, reason: String },

    /// A declared store reference no longer refers to a live store.
    #[error("field `{field}`: store reference {index} does not refer to a live store")]
    InvalidStoreReference { field: String, index: usize },
}

/// A failure during calculation of one field.
///
/// `Derivation` is transparent: a derivation function's own error reaches
/// the caller verbatim, with this crate adding nothing.
#[derive(Debug, Error)]
pub enum CalcError<E>
where
    E: std::error::Error,
{
    /// A source store was dropped between validation and calculation.
    #[error("field `{field}`: source store {index} was dropped before it could be read")]
    StoreDropped { field: String, index: usize },

    #[error(transparent)]
    Derivation(E),
}
