//! Domain models for the ordering service.
//!
//! Rows read from `PostgreSQL` and the JSON shapes returned by the routes.

pub mod catalog;
pub mod contact;
pub mod order;
pub mod session;
pub mod user;

pub use catalog::{
    Category, ImportSummary, Listing, ListingDetail, ListingFilter, ListingParameter, Shop,
    ShopState,
};
pub use contact::{Address, AddressInput, Contact, ContactDetail, ContactInput};
pub use order::{BasketView, OrderDetail, OrderLine, OrderRecord, OrderSummary};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{Profile, User};
