//! Integration tests for baskets and order placement.
//!
//! Tests cover:
//! - Adding the same listing twice replaces the quantity
//! - Concurrent adds share a single basket
//! - Closed shops reject new basket items
//! - Placing an empty basket is refused
//! - Placed orders are frozen and a fresh basket starts afterwards
//! - Buyers cannot touch each other's orders
//!
//! # Running
//!
//! ```bash
//! ORDERING_TEST_DATABASE_URL=postgres://localhost/ordering_test \
//!     cargo test -p ordering-integration-tests --test basket_orders -- --ignored
//! ```

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use ordering_core::{OrderStatus, UserRole};
use ordering_integration_tests::{CatalogNames, RecordingNotifier, TestContext};
use ordering_service::notifications::NotificationQueue;
use ordering_service::services::{BasketService, CatalogService, OrderService};

// ============================================================================
// Basket
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_adding_same_listing_replaces_quantity() {
    let ctx = TestContext::new().await;
    let shop = ctx.create_user(UserRole::Shop).await;
    let buyer = ctx.create_user(UserRole::Buyer).await;
    let (_, listing_id) = ctx.seed_listing(&shop, &CatalogNames::unique()).await;
    let baskets = BasketService::new(&ctx.pool);

    let first = baskets
        .add_or_update_line_item(&buyer, listing_id, 2)
        .await
        .unwrap();
    let second = baskets
        .add_or_update_line_item(&buyer, listing_id, 5)
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.quantity, 5);

    let basket = baskets.get_basket(&buyer).await.unwrap();
    assert_eq!(basket.items.len(), 1);
    assert_eq!(basket.items[0].quantity, 5);
    assert_eq!(basket.total, Decimal::from(2500));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_concurrent_adds_share_one_basket() {
    let ctx = TestContext::new().await;
    let shop = ctx.create_user(UserRole::Shop).await;
    let buyer = ctx.create_user(UserRole::Buyer).await;
    let (_, listing_id) = ctx.seed_listing(&shop, &CatalogNames::unique()).await;

    let tasks: Vec<_> = (1..=8)
        .map(|quantity| {
            let pool = ctx.pool.clone();
            let buyer = buyer.clone();
            tokio::spawn(async move {
                BasketService::new(&pool)
                    .add_or_update_line_item(&buyer, listing_id, quantity)
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let baskets = ctx
        .count(
            "SELECT COUNT(*) FROM orders WHERE user_id = $1 AND status = 'basket'",
            buyer.id.as_i32(),
        )
        .await;
    assert_eq!(baskets, 1);

    let basket = BasketService::new(&ctx.pool).get_basket(&buyer).await.unwrap();
    assert_eq!(basket.items.len(), 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_closed_shop_rejects_basket_items() {
    let ctx = TestContext::new().await;
    let shop = ctx.create_user(UserRole::Shop).await;
    let buyer = ctx.create_user(UserRole::Buyer).await;
    let (_, listing_id) = ctx.seed_listing(&shop, &CatalogNames::unique()).await;

    let state = CatalogService::new(&ctx.pool)
        .set_shop_state(&shop, false)
        .await
        .unwrap();
    assert!(!state.accepting_orders);

    let err = BasketService::new(&ctx.pool)
        .add_or_update_line_item(&buyer, listing_id, 1)
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 400);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_shop_accounts_cannot_fill_baskets() {
    let ctx = TestContext::new().await;
    let shop = ctx.create_user(UserRole::Shop).await;
    let (_, listing_id) = ctx.seed_listing(&shop, &CatalogNames::unique()).await;

    let err = BasketService::new(&ctx.pool)
        .add_or_update_line_item(&shop, listing_id, 1)
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 403);
}

// ============================================================================
// Placement
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_empty_basket_cannot_be_placed() {
    let ctx = TestContext::new().await;
    let shop = ctx.create_user(UserRole::Shop).await;
    let buyer = ctx.create_user(UserRole::Buyer).await;
    let contact_id = ctx.create_contact(&buyer).await;
    let (_, listing_id) = ctx.seed_listing(&shop, &CatalogNames::unique()).await;
    let baskets = BasketService::new(&ctx.pool);

    let line = baskets
        .add_or_update_line_item(&buyer, listing_id, 1)
        .await
        .unwrap();
    let order_id = baskets.get_basket(&buyer).await.unwrap().order_id.unwrap();
    baskets
        .remove_line_item(&buyer, order_id, line.id)
        .await
        .unwrap();

    let (queue, _worker) = NotificationQueue::start(RecordingNotifier::default(), 8);
    let err = OrderService::new(&ctx.pool, &queue)
        .place_order(&buyer, order_id, contact_id)
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 400);
    assert!(err.to_string().contains("empty"));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_placed_order_is_frozen() {
    let ctx = TestContext::new().await;
    let shop = ctx.create_user(UserRole::Shop).await;
    let buyer = ctx.create_user(UserRole::Buyer).await;
    let contact_id = ctx.create_contact(&buyer).await;
    let (_, listing_id) = ctx.seed_listing(&shop, &CatalogNames::unique()).await;
    let baskets = BasketService::new(&ctx.pool);

    let line = baskets
        .add_or_update_line_item(&buyer, listing_id, 3)
        .await
        .unwrap();
    let order_id = baskets.get_basket(&buyer).await.unwrap().order_id.unwrap();

    let notifier = RecordingNotifier::default();
    let (queue, worker) = NotificationQueue::start(notifier.clone(), 8);
    let orders = OrderService::new(&ctx.pool, &queue);

    let placed = orders
        .place_order(&buyer, order_id, contact_id)
        .await
        .unwrap();
    assert_eq!(placed.status, OrderStatus::New);
    assert_eq!(placed.contact_id, Some(contact_id));
    assert_eq!(placed.total, Decimal::from(1500));

    // Placing twice and editing afterwards both fail.
    let err = orders
        .place_order(&buyer, order_id, contact_id)
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 400);
    let err = baskets
        .update_line_item(&buyer, order_id, line.id, 9)
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 400);

    // The next add starts a new basket.
    baskets
        .add_or_update_line_item(&buyer, listing_id, 1)
        .await
        .unwrap();
    let fresh = baskets.get_basket(&buyer).await.unwrap();
    assert_ne!(fresh.order_id, Some(order_id));

    let listed = orders.list_orders(&buyer).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, order_id);
    assert_eq!(listed[0].total, Decimal::from(1500));

    drop(orders);
    drop(queue);
    worker.await.unwrap();
    let events = notifier.recorded();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].previous_status, OrderStatus::Basket);
    assert_eq!(events[0].new_status, OrderStatus::New);
    assert_eq!(events[0].buyer_email, buyer.email.to_string());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_buyers_cannot_touch_each_others_orders() {
    let ctx = TestContext::new().await;
    let shop = ctx.create_user(UserRole::Shop).await;
    let owner = ctx.create_user(UserRole::Buyer).await;
    let stranger = ctx.create_user(UserRole::Buyer).await;
    let stranger_contact = ctx.create_contact(&stranger).await;
    let (_, listing_id) = ctx.seed_listing(&shop, &CatalogNames::unique()).await;
    let baskets = BasketService::new(&ctx.pool);

    let line = baskets
        .add_or_update_line_item(&owner, listing_id, 1)
        .await
        .unwrap();
    let order_id = baskets.get_basket(&owner).await.unwrap().order_id.unwrap();

    let err = baskets
        .update_line_item(&stranger, order_id, line.id, 4)
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 403);

    let (queue, _worker) = NotificationQueue::start(RecordingNotifier::default(), 8);
    let orders = OrderService::new(&ctx.pool, &queue);
    let err = orders
        .place_order(&stranger, order_id, stranger_contact)
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 403);

    // Using someone else's contact is refused too.
    let err = orders
        .place_order(&owner, order_id, stranger_contact)
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 403);

    let err = orders.get_order(&stranger, order_id).await.unwrap_err();
    assert_eq!(err.status().as_u16(), 404);
}
