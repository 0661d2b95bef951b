//! Error types for the dynamic access core

use thiserror::Error;

/// Dynamic access errors
///
/// Validation is fail-fast: the first violated step aborts the whole
/// operation and the error is surfaced to the caller verbatim.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Requested user, role, or access request does not exist
    #[error("{0}")]
    NotFound(String),

    /// Policy or structural violation: missing required reason, unexpected
    /// wildcard, role not permitted, malformed pattern or template
    #[error("{0}")]
    BadParameter(String),
}

impl AccessError {
    /// Create a `NotFound` error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a `BadParameter` error
    pub fn bad_parameter(msg: impl Into<String>) -> Self {
        Self::BadParameter(msg.into())
    }

    /// Whether this is a `NotFound` error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this is a `BadParameter` error
    pub fn is_bad_parameter(&self) -> bool {
        matches!(self, Self::BadParameter(_))
    }
}

/// Result type for dynamic access operations
pub type Result<T> = std::result::Result<T, AccessError>;
