//! Error types.

use crate::geometry::PrimitiveKind;
use crate::ids::{LineId, RelationId};
use thiserror::Error;

/// Malformed numeric or structural input to a constructor or setter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("bounds must be positive and finite, got {width}x{height}")]
    InvalidBounds { width: f64, height: f64 },
    #[error("relation {id} needs exactly 2 members, got {count}")]
    RelationArity { id: RelationId, count: usize },
    #[error("relation {id} pairs {a:?} with {b:?}, which has no intersection routine")]
    UnsupportedPair {
        id: RelationId,
        a: PrimitiveKind,
        b: PrimitiveKind,
    },
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Check that `value` is finite, naming the offending field otherwise.
pub(crate) fn finite(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NonFinite { field, value })
    }
}

/// A snapshot that cannot have come from a well-formed document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateConsistencyError {
    #[error("relation {relation} references line {line}, which is not in the cache")]
    MissingLine { relation: RelationId, line: LineId },
}

/// Failures of document mutations.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("line not found: {0}")]
    LineNotFound(LineId),
    #[error("line already exists: {0}")]
    DuplicateLine(LineId),
    #[error("relation already exists: {0}")]
    DuplicateRelation(RelationId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("CRDT error: {0}")]
    Crdt(#[from] loro::LoroError),
}

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors surfaced by a [`Session`](crate::session::Session).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Consistency(#[from] StateConsistencyError),
}
