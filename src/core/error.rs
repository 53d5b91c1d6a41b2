//! Error taxonomy for inspection operations
//!
//! Every failure a caller can observe is a distinct [`QcError`] variant so the
//! request layer can map them (lookup failure, bad input, business gate,
//! access denied) without string matching.

use miette::Diagnostic;
use thiserror::Error;

use crate::core::store::StoreError;

/// Business rules that can block an otherwise well-formed request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BusinessRule {
    #[error(
        "lot has not reached the desired sample size for completion: {required} samples required, {actual} recorded"
    )]
    InsufficientSamples { required: u32, actual: u32 },

    #[error("cannot delete a lot with measurements ({count} recorded)")]
    LotHasMeasurements { count: usize },

    #[error("part type {id} is in use by one or more lots")]
    PartTypeInUse { id: String },

    #[error("a part type named '{name}' already exists")]
    DuplicatePartTypeName { name: String },

    #[error("dimension '{name}' is declared more than once")]
    DuplicateDimensionName { name: String },

    #[error("could not generate a free lot code")]
    CodeSpaceExhausted,
}

/// Errors surfaced by the inspection core
#[derive(Debug, Error, Diagnostic)]
pub enum QcError {
    #[error("{entity} not found: {id}")]
    #[diagnostic(
        code(ilt::not_found),
        help("list available entities with `ilt part list` or `ilt lot list`")
    )]
    NotFound { entity: &'static str, id: String },

    #[error("validation failed: {0}")]
    #[diagnostic(code(ilt::validation))]
    ValidationFailed(String),

    #[error("{0}")]
    #[diagnostic(code(ilt::precondition))]
    PreconditionFailed(#[from] BusinessRule),

    #[error("access denied: {0}")]
    #[diagnostic(
        code(ilt::access_denied),
        help("administrator operations need the ADMINISTRADOR role in .ilt/team.yaml")
    )]
    AccessDenied(String),

    #[error("tolerance evaluation degraded: {0}")]
    #[diagnostic(code(ilt::evaluation_degraded))]
    EvaluationDegraded(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

impl QcError {
    /// Shorthand for a missing entity
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        QcError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for a rejected input
    pub fn invalid(message: impl Into<String>) -> Self {
        QcError::ValidationFailed(message.into())
    }

    /// Check if this error is a lookup failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, QcError::NotFound { .. })
    }

    /// Check if this error is a permission failure
    pub fn is_access_denied(&self) -> bool {
        matches!(self, QcError::AccessDenied(_))
    }
}

pub type QcResult<T> = std::result::Result<T, QcError>;
