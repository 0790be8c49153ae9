//! Integration tests for the ordering service.
//!
//! # Running Tests
//!
//! ```bash
//! # Point the tests at a disposable database
//! export ORDERING_TEST_DATABASE_URL=postgres://localhost/ordering_test
//!
//! # Run the database-backed tests
//! cargo test -p ordering-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `catalog_import` - Catalog import, idempotence and rollback
//! - `basket_orders` - Basket uniqueness, line items and order placement
//! - `workflow` - Shop status changes and buyer notifications
//! - `contacts` - Address and contact quotas
//! - `http_api` - End-to-end requests against a running server
//!
//! Every test creates its own accounts and shop names, so tests can share
//! one database and run in parallel.

use std::sync::{Arc, Mutex};

use sqlx::PgPool;
use uuid::Uuid;

use ordering_core::notification::StatusChangeEvent;
use ordering_core::{ContactId, ProductInfoId, UserRole};
use ordering_service::db::catalog::CatalogRepository;
use ordering_service::models::{
    ContactInput, CurrentUser, ImportSummary, ListingFilter, Profile,
};
use ordering_service::notifications::{NotificationError, Notifier};
use ordering_service::services::{AuthService, CatalogService, ContactService, ImportSource};

/// Environment variable holding the test database URL.
pub const TEST_DATABASE_URL_VAR: &str = "ORDERING_TEST_DATABASE_URL";

/// Password used for every test account.
pub const TEST_PASSWORD: &str = "integration-test-password";

/// A migrated database connection.
pub struct TestContext {
    pub pool: PgPool,
}

impl TestContext {
    /// Connect to the test database and apply migrations.
    ///
    /// # Panics
    ///
    /// Panics if the database is not configured or unreachable.
    #[allow(clippy::expect_used)]
    pub async fn new() -> Self {
        let url = std::env::var(TEST_DATABASE_URL_VAR)
            .expect("ORDERING_TEST_DATABASE_URL must point at a disposable database");
        let pool = PgPool::connect(&url)
            .await
            .expect("Failed to connect to test database");
        sqlx::migrate!("../service/migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");
        Self { pool }
    }

    /// Register an account with a unique email.
    ///
    /// # Panics
    ///
    /// Panics if registration fails.
    #[allow(clippy::expect_used)]
    pub async fn create_user(&self, role: UserRole) -> CurrentUser {
        let email = format!("{}-{}@example.com", role.as_str(), Uuid::new_v4());
        let user = AuthService::new(&self.pool)
            .register(&email, TEST_PASSWORD, role, &Profile::default())
            .await
            .expect("Failed to register test user");
        CurrentUser::from(&user)
    }

    /// Give `buyer` a contact to place orders with.
    ///
    /// # Panics
    ///
    /// Panics if the contact cannot be saved.
    #[allow(clippy::expect_used)]
    pub async fn create_contact(&self, buyer: &CurrentUser) -> ContactId {
        ContactService::new(&self.pool)
            .set_contact(
                buyer,
                ContactInput {
                    phone: "+7 900 000-00-00".to_string(),
                    address_id: None,
                },
            )
            .await
            .expect("Failed to save test contact")
            .id
    }

    /// Run a `SELECT COUNT(*)` query with a single integer parameter.
    ///
    /// # Panics
    ///
    /// Panics if the query fails.
    #[allow(clippy::expect_used)]
    pub async fn count(&self, query: &str, id: i32) -> i64 {
        sqlx::query_scalar(query)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .expect("Count query failed")
    }

    /// Import [`catalog_yaml`] for `shop_user` and return the summary and the
    /// id of the single listing.
    ///
    /// # Panics
    ///
    /// Panics if the import fails.
    #[allow(clippy::expect_used)]
    pub async fn seed_listing(
        &self,
        shop_user: &CurrentUser,
        names: &CatalogNames,
    ) -> (ImportSummary, ProductInfoId) {
        let summary = CatalogService::new(&self.pool)
            .import(shop_user, &catalog_yaml(names), ImportSource::upload(None))
            .await
            .expect("Failed to import test catalog");
        let listing = CatalogRepository::new(&self.pool)
            .list_listings(ListingFilter {
                shop_id: Some(summary.shop_id),
                category_id: None,
            })
            .await
            .expect("Failed to list listings")
            .into_iter()
            .next()
            .expect("Imported catalog has no listing");
        (summary, listing.id)
    }
}

/// Unique shop, category and product names for one test.
#[derive(Debug, Clone)]
pub struct CatalogNames {
    pub shop: String,
    pub category: String,
    pub product: String,
}

impl CatalogNames {
    /// Fresh names so tests never touch each other's rows.
    #[must_use]
    pub fn unique() -> Self {
        let tag = Uuid::new_v4().simple().to_string();
        Self {
            shop: format!("Acme {tag}"),
            category: format!("Tools {tag}"),
            product: format!("Hammer {tag}"),
        }
    }
}

/// The reference catalog: one category, one product priced 500.
#[must_use]
pub fn catalog_yaml(names: &CatalogNames) -> String {
    format!(
        r"
shop: {shop}
categories:
  - id: 1
    name: {category}
goods:
  - id: 1
    category: 1
    name: {product}
    model: H-100
    quantity: 10
    price: 500
    price_rrc: 600
    parameters:
      weight: 1kg
",
        shop = names.shop,
        category = names.category,
        product = names.product,
    )
}

/// Notifier that records events, optionally failing every delivery.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub events: Arc<Mutex<Vec<StatusChangeEvent>>>,
    pub fail: bool,
}

impl RecordingNotifier {
    /// A notifier whose deliveries always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Events recorded so far.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[allow(clippy::unwrap_used)]
    #[must_use]
    pub fn recorded(&self) -> Vec<StatusChangeEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    async fn deliver(&self, event: &StatusChangeEvent) -> Result<(), NotificationError> {
        // Record before failing so tests can see the attempt.
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
        if self.fail {
            return Err(NotificationError::Delivery("simulated outage".to_string()));
        }
        Ok(())
    }
}
