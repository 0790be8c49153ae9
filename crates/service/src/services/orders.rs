//! Order placement and order lists.

use sqlx::PgPool;
use tracing::{info, instrument};

use ordering_core::notification::StatusChangeEvent;
use ordering_core::order::ensure_placeable;
use ordering_core::{ContactId, DomainError, OrderId, OrderStatus};

use super::{require_buyer, require_shop};
use crate::db::orders::{self as steps, OrderRepository};
use crate::error::Result;
use crate::models::{CurrentUser, OrderDetail, OrderSummary};
use crate::notifications::NotificationQueue;

/// Order service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    notifications: &'a NotificationQueue,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, notifications: &'a NotificationQueue) -> Self {
        Self {
            pool,
            notifications,
        }
    }

    fn repo(&self) -> OrderRepository<'a> {
        OrderRepository::new(self.pool)
    }

    /// Turn the caller's basket into a `new` order delivered to `contact_id`.
    ///
    /// The buyer is notified once the transaction has committed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order or contact does not exist,
    /// `PermissionDenied` if either belongs to another account and
    /// `InvalidState` if the order is not a basket or has no items.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn place_order(
        &self,
        user: &CurrentUser,
        order_id: OrderId,
        contact_id: ContactId,
    ) -> Result<OrderDetail> {
        require_buyer(user, "place orders")?;

        let mut tx = self.pool.begin().await?;

        let order = steps::lock_order(&mut tx, order_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;
        if order.user_id != user.id {
            return Err(DomainError::permission_denied(format!(
                "order {order_id} belongs to another account"
            ))
            .into());
        }

        let owner = steps::contact_owner(&mut tx, contact_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("contact {contact_id}")))?;
        if owner != user.id {
            return Err(DomainError::permission_denied(format!(
                "contact {contact_id} belongs to another account"
            ))
            .into());
        }

        let item_count = steps::count_items(&mut tx, order_id).await?;
        ensure_placeable(order.status, item_count)?;

        let placed = steps::place(&mut tx, order_id, contact_id).await?;
        tx.commit().await?;

        info!(order_id = %order_id, items = item_count, "Order placed");
        self.notifications.publish(StatusChangeEvent {
            order_id,
            previous_status: OrderStatus::Basket,
            new_status: placed.status,
            buyer_email: user.email.to_string(),
        });

        let items = self.repo().lines(order_id).await?;
        Ok(OrderDetail::new(placed, items))
    }

    /// The caller's placed orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_orders(&self, user: &CurrentUser) -> Result<Vec<OrderSummary>> {
        Ok(self.repo().list_for_buyer(user.id).await?)
    }

    /// One of the caller's orders with its line items.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order does not exist or belongs to another
    /// account.
    pub async fn get_order(&self, user: &CurrentUser, order_id: OrderId) -> Result<OrderDetail> {
        let repo = self.repo();
        let order = repo
            .get(order_id)
            .await?
            .filter(|order| order.user_id == user.id)
            .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;
        let items = repo.lines(order_id).await?;
        Ok(OrderDetail::new(order, items))
    }

    /// Placed orders containing goods from the caller's shop, newest first.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for non-shop accounts.
    pub async fn list_shop_orders(&self, user: &CurrentUser) -> Result<Vec<OrderSummary>> {
        require_shop(user, "view shop orders")?;
        Ok(self.repo().list_for_shop_owner(user.id).await?)
    }
}
