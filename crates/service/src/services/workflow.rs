//! Shop-driven order status changes.
//!
//! Transitions follow [`OrderStatus::transition_to`]. The new status is
//! written with a compare-and-set on the status that was read, so two shops
//! racing on the same order cannot both succeed from the same state.

use sqlx::PgPool;
use tracing::{info, instrument, warn};

use ordering_core::notification::StatusChangeEvent;
use ordering_core::{DomainError, OrderId, OrderStatus};

use super::require_shop;
use crate::db::orders::{self as steps, OrderRepository};
use crate::error::Result;
use crate::models::{CurrentUser, OrderDetail};
use crate::notifications::NotificationQueue;

/// Order status workflow service.
pub struct WorkflowService<'a> {
    pool: &'a PgPool,
    notifications: &'a NotificationQueue,
}

impl<'a> WorkflowService<'a> {
    /// Create a new workflow service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, notifications: &'a NotificationQueue) -> Self {
        Self {
            pool,
            notifications,
        }
    }

    /// Move an order to `new_status` on behalf of a shop fulfilling it.
    ///
    /// The buyer is notified after commit. A notification that cannot be
    /// queued is logged and does not fail the call.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` unless the caller owns a shop supplying at
    /// least one item of the order, `NotFound` if the order does not exist
    /// and `InvalidState` if the transition is not allowed.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn update_status(
        &self,
        user: &CurrentUser,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<OrderDetail> {
        require_shop(user, "change order status")?;
        if !new_status.is_shop_target() {
            return Err(DomainError::invalid_state(format!(
                "shops cannot move an order to {new_status}"
            ))
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let order = steps::lock_order(&mut tx, order_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;

        if !steps::fulfilled_by(&mut tx, order_id, user.id).await? {
            return Err(DomainError::permission_denied(format!(
                "order {order_id} has no items from your shop"
            ))
            .into());
        }

        let previous_status = order.status;
        let new_status = previous_status
            .transition_to(new_status)
            .map_err(DomainError::from)?;

        let updated = steps::compare_and_set_status(&mut tx, order_id, previous_status, new_status)
            .await?
            .ok_or_else(|| {
                DomainError::invalid_state(format!(
                    "order {order_id} changed status concurrently"
                ))
            })?;
        let buyer_email = steps::buyer_email(&mut tx, order_id).await?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            previous_status = %previous_status,
            new_status = %new_status,
            "Order status changed"
        );

        let queued = self.notifications.publish(StatusChangeEvent {
            order_id,
            previous_status,
            new_status,
            buyer_email,
        });
        if !queued {
            warn!(order_id = %order_id, "Buyer will not be notified of status change");
        }

        let items = OrderRepository::new(self.pool).lines(order_id).await?;
        Ok(OrderDetail::new(updated, items))
    }
}
