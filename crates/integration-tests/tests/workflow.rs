//! Integration tests for the shop-driven order status workflow.
//!
//! Tests cover:
//! - Allowed transitions and the buyer notification they publish
//! - Failed notification delivery never undoes a status change
//! - Forbidden transitions leave the order untouched
//! - Only shops supplying the order may change it
//!
//! # Running
//!
//! ```bash
//! ORDERING_TEST_DATABASE_URL=postgres://localhost/ordering_test \
//!     cargo test -p ordering-integration-tests --test workflow -- --ignored
//! ```

#![allow(clippy::unwrap_used)]

use ordering_core::{OrderId, OrderStatus, UserRole};
use ordering_integration_tests::{CatalogNames, RecordingNotifier, TestContext};
use ordering_service::models::CurrentUser;
use ordering_service::notifications::NotificationQueue;
use ordering_service::services::{BasketService, OrderService, WorkflowService};

/// A shop, a buyer and one placed order containing the shop's listing.
async fn placed_order(ctx: &TestContext) -> (CurrentUser, CurrentUser, OrderId) {
    let shop = ctx.create_user(UserRole::Shop).await;
    let buyer = ctx.create_user(UserRole::Buyer).await;
    let contact_id = ctx.create_contact(&buyer).await;
    let (_, listing_id) = ctx.seed_listing(&shop, &CatalogNames::unique()).await;

    let baskets = BasketService::new(&ctx.pool);
    baskets
        .add_or_update_line_item(&buyer, listing_id, 2)
        .await
        .unwrap();
    let order_id = baskets.get_basket(&buyer).await.unwrap().order_id.unwrap();

    let (queue, _worker) = NotificationQueue::start(RecordingNotifier::default(), 8);
    OrderService::new(&ctx.pool, &queue)
        .place_order(&buyer, order_id, contact_id)
        .await
        .unwrap();
    (shop, buyer, order_id)
}

// ============================================================================
// Transitions
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_confirm_notifies_buyer() {
    let ctx = TestContext::new().await;
    let (shop, buyer, order_id) = placed_order(&ctx).await;

    let notifier = RecordingNotifier::default();
    let (queue, worker) = NotificationQueue::start(notifier.clone(), 8);
    let updated = WorkflowService::new(&ctx.pool, &queue)
        .update_status(&shop, order_id, OrderStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Confirmed);

    drop(queue);
    worker.await.unwrap();
    let events = notifier.recorded();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].order_id, order_id);
    assert_eq!(events[0].previous_status, OrderStatus::New);
    assert_eq!(events[0].new_status, OrderStatus::Confirmed);
    assert_eq!(events[0].buyer_email, buyer.email.to_string());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_failed_notification_keeps_status_change() {
    let ctx = TestContext::new().await;
    let (shop, buyer, order_id) = placed_order(&ctx).await;

    let notifier = RecordingNotifier::failing();
    let (queue, worker) = NotificationQueue::start(notifier.clone(), 8);
    WorkflowService::new(&ctx.pool, &queue)
        .update_status(&shop, order_id, OrderStatus::Confirmed)
        .await
        .unwrap();
    drop(queue);
    worker.await.unwrap();
    assert_eq!(notifier.recorded().len(), 1);

    let (queue, _worker) = NotificationQueue::start(RecordingNotifier::default(), 8);
    let order = OrderService::new(&ctx.pool, &queue)
        .get_order(&buyer, order_id)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_full_lifecycle_to_delivered() {
    let ctx = TestContext::new().await;
    let (shop, _buyer, order_id) = placed_order(&ctx).await;
    let (queue, _worker) = NotificationQueue::start(RecordingNotifier::default(), 8);
    let workflow = WorkflowService::new(&ctx.pool, &queue);

    for status in [
        OrderStatus::Confirmed,
        OrderStatus::Assembled,
        OrderStatus::Sent,
        OrderStatus::Delivered,
    ] {
        let updated = workflow
            .update_status(&shop, order_id, status)
            .await
            .unwrap();
        assert_eq!(updated.status, status);
    }

    // Delivered is terminal.
    let err = workflow
        .update_status(&shop, order_id, OrderStatus::Canceled)
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 400);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_forbidden_transition_leaves_order_unchanged() {
    let ctx = TestContext::new().await;
    let (shop, buyer, order_id) = placed_order(&ctx).await;
    let notifier = RecordingNotifier::default();
    let (queue, worker) = NotificationQueue::start(notifier.clone(), 8);
    let workflow = WorkflowService::new(&ctx.pool, &queue);

    let err = workflow
        .update_status(&shop, order_id, OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 400);

    let err = workflow
        .update_status(&shop, order_id, OrderStatus::Basket)
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 400);

    let order = OrderService::new(&ctx.pool, &queue)
        .get_order(&buyer, order_id)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::New);

    drop(workflow);
    drop(queue);
    worker.await.unwrap();
    assert!(notifier.recorded().is_empty());
}

// ============================================================================
// Permissions
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_unrelated_shop_cannot_change_status() {
    let ctx = TestContext::new().await;
    let (_shop, buyer, order_id) = placed_order(&ctx).await;
    let other_shop = ctx.create_user(UserRole::Shop).await;
    ctx.seed_listing(&other_shop, &CatalogNames::unique()).await;
    let (queue, _worker) = NotificationQueue::start(RecordingNotifier::default(), 8);
    let workflow = WorkflowService::new(&ctx.pool, &queue);

    let err = workflow
        .update_status(&other_shop, order_id, OrderStatus::Confirmed)
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 403);

    let err = workflow
        .update_status(&buyer, order_id, OrderStatus::Canceled)
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 403);

    let missing = workflow
        .update_status(&other_shop, OrderId::new(i32::MAX), OrderStatus::Confirmed)
        .await
        .unwrap_err();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ORDERING_TEST_DATABASE_URL)"]
async fn test_shop_sees_orders_with_its_goods() {
    let ctx = TestContext::new().await;
    let (shop, _buyer, order_id) = placed_order(&ctx).await;
    let other_shop = ctx.create_user(UserRole::Shop).await;
    let (queue, _worker) = NotificationQueue::start(RecordingNotifier::default(), 8);
    let orders = OrderService::new(&ctx.pool, &queue);

    let listed = orders.list_shop_orders(&shop).await.unwrap();
    assert!(listed.iter().any(|order| order.id == order_id));

    let listed = orders.list_shop_orders(&other_shop).await.unwrap();
    assert!(listed.iter().all(|order| order.id != order_id));
}
