//! Error types for the adaptive engine.

use thiserror::Error;

/// Errors surfaced by this crate's public operations.
///
/// `StorageError` wraps the error type of whatever [`crate::storage::Storage`]
/// implementation a caller supplies, so this crate never commits to a
/// particular backend's error representation.
#[derive(Debug, Error)]
pub enum EngineError<E = std::convert::Infallible> {
    /// The caller passed data that violates this crate's contract: an
    /// out-of-range score, an activity index out of bounds, or mismatched
    /// vector/matrix shapes.
    #[error("validation error: {0}")]
    Validation(String),

    /// A numeric operation was asked to operate outside its domain, e.g. a
    /// probability outside `[0, 1]` passed to a non-clipping conversion.
    #[error("numeric domain error: {0}")]
    NumericDomain(String),

    /// The injected storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[source] E),
}

impl<E> EngineError<E> {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn numeric_domain(msg: impl Into<String>) -> Self {
        Self::NumericDomain(msg.into())
    }
}
