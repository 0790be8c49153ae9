//! Ordering Core - Domain types and business rules.
//!
//! This crate provides the pieces of the ordering domain that do not need a
//! database or a network. It is shared by:
//! - `ordering-service` - axum HTTP service backed by `PostgreSQL`
//! - `ordering-cli` - Command-line tools for migrations, users and catalog imports
//!
//! # Architecture
//!
//! The core crate contains only types and rules - no I/O, no database access,
//! no HTTP clients. Storage layers call into these rules before writing.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, user roles and the order status machine
//! - [`catalog`] - Supplier catalog documents and their validation
//! - [`order`] - Line item pricing and placement rules
//! - [`quota`] - Per-user limits for addresses and contacts
//! - [`notification`] - Events put on the outbound notification queue
//! - [`error`] - Domain error taxonomy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod error;
pub mod notification;
pub mod order;
pub mod quota;
pub mod types;

pub use error::DomainError;
pub use types::*;
