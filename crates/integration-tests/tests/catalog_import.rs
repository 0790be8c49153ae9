//! Integration tests for catalog import.
//!
//! Tests cover:
//! - Importing the reference catalog
//! - Re-importing the same document without duplicating rows
//! - Price updates on re-import
//! - Ownership checks on shop names
//! - Rollback when an import fails
//!
//! # Running
//!
//! ```bash
//! ORDERING_TEST_DATABASE_URL=postgres://localhost/ordering_test \
//!     cargo test -p ordering-integration-tests --test catalog_import -- --ignored
//! ```

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use ordering_core::UserRole;
use ordering_integration_tests::{CatalogNames, TestContext, catalog_yaml};
use ordering_service::services::{CatalogService, ImportSource};

// ============================================================================
// Import
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_import_creates_catalog() {
    let ctx = TestContext::new().await;
    let shop = ctx.create_user(UserRole::Shop).await;
    let names = CatalogNames::unique();

    let (summary, listing_id) = ctx.seed_listing(&shop, &names).await;
    assert_eq!(summary.categories, 1);
    assert_eq!(summary.goods, 1);
    assert_eq!(summary.parameters, 1);

    let detail = CatalogService::new(&ctx.pool)
        .get_listing(listing_id)
        .await
        .unwrap();
    assert_eq!(detail.listing.name, names.product);
    assert_eq!(detail.listing.shop, names.shop);
    assert_eq!(detail.listing.category, names.category);
    assert_eq!(detail.listing.model, "H-100");
    assert_eq!(detail.listing.quantity, 10);
    assert_eq!(detail.listing.price, Decimal::from(500));
    assert_eq!(detail.listing.price_rrc, Decimal::from(600));
    assert_eq!(detail.parameters.len(), 1);
    assert_eq!(detail.parameters[0].name, "weight");
    assert_eq!(detail.parameters[0].value, "1kg");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_reimport_does_not_duplicate_rows() {
    let ctx = TestContext::new().await;
    let shop = ctx.create_user(UserRole::Shop).await;
    let names = CatalogNames::unique();
    let service = CatalogService::new(&ctx.pool);

    let (first, listing_id) = ctx.seed_listing(&shop, &names).await;
    let second = service
        .import(&shop, &catalog_yaml(&names), ImportSource::upload(None))
        .await
        .unwrap();
    assert_eq!(first, second);

    let shop_id = first.shop_id.as_i32();
    assert_eq!(
        ctx.count("SELECT COUNT(*) FROM product_infos WHERE shop_id = $1", shop_id)
            .await,
        1
    );
    assert_eq!(
        ctx.count("SELECT COUNT(*) FROM shop_categories WHERE shop_id = $1", shop_id)
            .await,
        1
    );
    assert_eq!(
        ctx.count(
            "SELECT COUNT(*) FROM product_parameters WHERE product_info_id = $1",
            listing_id.as_i32()
        )
        .await,
        1
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_reimport_updates_price_in_place() {
    let ctx = TestContext::new().await;
    let shop = ctx.create_user(UserRole::Shop).await;
    let names = CatalogNames::unique();
    let service = CatalogService::new(&ctx.pool);

    let (_, listing_id) = ctx.seed_listing(&shop, &names).await;
    let cheaper = catalog_yaml(&names).replace("price: 500", "price: 450");
    service
        .import(&shop, &cheaper, ImportSource::upload(Some("shop1.yaml")))
        .await
        .unwrap();

    let detail = service.get_listing(listing_id).await.unwrap();
    assert_eq!(detail.listing.price, Decimal::from(450));
}

// ============================================================================
// Ownership and Rollback
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_buyer_cannot_import() {
    let ctx = TestContext::new().await;
    let buyer = ctx.create_user(UserRole::Buyer).await;

    let err = CatalogService::new(&ctx.pool)
        .import(
            &buyer,
            &catalog_yaml(&CatalogNames::unique()),
            ImportSource::upload(None),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 403);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_shop_name_belongs_to_first_importer() {
    let ctx = TestContext::new().await;
    let owner = ctx.create_user(UserRole::Shop).await;
    let intruder = ctx.create_user(UserRole::Shop).await;
    let names = CatalogNames::unique();
    let service = CatalogService::new(&ctx.pool);

    let (_, listing_id) = ctx.seed_listing(&owner, &names).await;
    let hijack = catalog_yaml(&names).replace("price: 500", "price: 1");
    let err = service
        .import(&intruder, &hijack, ImportSource::upload(None))
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 403);

    let detail = service.get_listing(listing_id).await.unwrap();
    assert_eq!(detail.listing.price, Decimal::from(500));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_failed_import_leaves_nothing_behind() {
    let ctx = TestContext::new().await;
    let shop = ctx.create_user(UserRole::Shop).await;
    let service = CatalogService::new(&ctx.pool);
    ctx.seed_listing(&shop, &CatalogNames::unique()).await;

    // One shop per account: the second shop insert fails and the whole
    // transaction rolls back.
    let other = CatalogNames::unique();
    let err = service
        .import(&shop, &catalog_yaml(&other), ImportSource::upload(None))
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 409);

    let categories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE name = $1")
        .bind(&other.category)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(categories, 0);
    let shops: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shops WHERE name = $1")
        .bind(&other.shop)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(shops, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_invalid_document_is_rejected_before_writing() {
    let ctx = TestContext::new().await;
    let shop = ctx.create_user(UserRole::Shop).await;
    let names = CatalogNames::unique();
    let broken = catalog_yaml(&names).replace("category: 1", "category: 99");

    let err = CatalogService::new(&ctx.pool)
        .import(&shop, &broken, ImportSource::upload(None))
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 400);

    let shops: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shops WHERE name = $1")
        .bind(&names.shop)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(shops, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_prices_the_catalog_cannot_store_are_rejected() {
    let ctx = TestContext::new().await;
    let shop = ctx.create_user(UserRole::Shop).await;
    let service = CatalogService::new(&ctx.pool);

    for price in ["price: 10000000000", "price: 499.999"] {
        let names = CatalogNames::unique();
        let document = catalog_yaml(&names).replace("price: 500", price);

        let err = service
            .import(&shop, &document, ImportSource::upload(None))
            .await
            .unwrap_err();
        assert_eq!(err.status().as_u16(), 400, "{price}");

        let shops: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shops WHERE name = $1")
            .bind(&names.shop)
            .fetch_one(&ctx.pool)
            .await
            .unwrap();
        assert_eq!(shops, 0, "{price}");
    }
}
