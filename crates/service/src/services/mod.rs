//! Business logic services.
//!
//! Each service borrows the connection pool and runs one transaction per
//! mutating call. Role and ownership checks happen here, before any write.
//!
//! # Services
//!
//! - `auth` - Email/password accounts with Argon2id hashes
//! - `catalog` - Supplier catalog import, browsing and shop state
//! - `basket` - Buyer baskets and their line items
//! - `orders` - Order placement and order lists
//! - `workflow` - Shop-driven order status changes
//! - `contacts` - Delivery addresses and contacts

pub mod auth;
pub mod basket;
pub mod catalog;
pub mod contacts;
pub mod orders;
pub mod workflow;

pub use auth::{AuthError, AuthService};
pub use basket::BasketService;
pub use catalog::{CatalogService, ImportSource};
pub use contacts::ContactService;
pub use orders::OrderService;
pub use workflow::WorkflowService;

use ordering_core::DomainError;

use crate::models::CurrentUser;

/// Reject users that are not shop accounts.
fn require_shop(user: &CurrentUser, action: &str) -> Result<(), DomainError> {
    if user.role.is_shop() {
        Ok(())
    } else {
        Err(DomainError::permission_denied(format!(
            "only shop accounts can {action}"
        )))
    }
}

/// Reject users that are not buyer accounts.
fn require_buyer(user: &CurrentUser, action: &str) -> Result<(), DomainError> {
    if user.role.is_buyer() {
        Ok(())
    } else {
        Err(DomainError::permission_denied(format!(
            "only buyer accounts can {action}"
        )))
    }
}
