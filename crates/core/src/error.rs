//! Domain error taxonomy.
//!
//! Every business-rule failure in the ordering domain maps to one of these
//! variants. The service crate turns them into HTTP status codes; nothing in
//! this taxonomy is retried automatically.

use thiserror::Error;

use crate::catalog::ImportError;
use crate::types::TransitionError;

/// A business-rule failure.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Input is malformed or out of range.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A per-user limit has been reached.
    #[error("{resource} limit reached (maximum {limit})")]
    QuotaExceeded {
        /// What is being limited (e.g. "address").
        resource: &'static str,
        /// The configured maximum.
        limit: usize,
    },

    /// Role or ownership mismatch.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A referenced entity does not exist (or is not visible to the caller).
    #[error("{0} not found")]
    NotFound(String),

    /// The operation is not legal for the entity's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A supplier catalog document could not be parsed.
    #[error("invalid catalog document: {0}")]
    Parse(#[from] ImportError),
}

impl From<TransitionError> for DomainError {
    fn from(err: TransitionError) -> Self {
        Self::InvalidState(err.to_string())
    }
}

impl DomainError {
    /// Shorthand for [`DomainError::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Shorthand for [`DomainError::PermissionDenied`].
    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied(reason.into())
    }

    /// Shorthand for [`DomainError::Validation`].
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    /// Shorthand for [`DomainError::InvalidState`].
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState(reason.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::OrderStatus;

    #[test]
    fn test_transition_error_becomes_invalid_state() {
        let err: DomainError = OrderStatus::Sent
            .transition_to(OrderStatus::New)
            .map_err(DomainError::from)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert_eq!(
            err.to_string(),
            "invalid state: cannot change order status from sent to new"
        );
    }

    #[test]
    fn test_quota_message() {
        let err = DomainError::QuotaExceeded {
            resource: "address",
            limit: 5,
        };
        assert_eq!(err.to_string(), "address limit reached (maximum 5)");
    }
}
