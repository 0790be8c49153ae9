//! Per-user limits.
//!
//! Both limits are business rules rather than schema constraints: the
//! service counts existing rows inside the same transaction as the insert.

use crate::error::DomainError;

/// Maximum number of saved addresses per user.
pub const MAX_ADDRESSES_PER_USER: usize = 5;

/// Maximum number of contacts per user. A contact is edited in place, never
/// duplicated.
pub const MAX_CONTACTS_PER_USER: usize = 1;

/// Check that one more `resource` fits under `limit`.
///
/// # Errors
///
/// Returns [`DomainError::QuotaExceeded`] if `existing` has already reached `limit`.
pub const fn ensure_capacity(
    resource: &'static str,
    existing: usize,
    limit: usize,
) -> Result<(), DomainError> {
    if existing >= limit {
        Err(DomainError::QuotaExceeded { resource, limit })
    } else {
        Ok(())
    }
}
