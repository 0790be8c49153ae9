//! Buyer baskets.
//!
//! A buyer has at most one open basket. It is created on the first line item
//! and turned into an order by [`super::OrderService::place_order`].

use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

use ordering_core::order::{ensure_editable, validate_quantity};
use ordering_core::{DomainError, OrderId, OrderItemId, ProductInfoId};

use super::require_buyer;
use crate::db::RepositoryError;
use crate::db::orders::{self as steps, OrderRepository};
use crate::error::{AppError, Result};
use crate::models::{BasketView, CurrentUser, OrderLine};

/// Basket service.
pub struct BasketService<'a> {
    pool: &'a PgPool,
}

impl<'a> BasketService<'a> {
    /// Create a new basket service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Put a listing in the caller's basket with the given quantity.
    ///
    /// Adding a listing that is already in the basket replaces its quantity.
    /// Returns the saved line item.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for non-buyer accounts, `Validation` for a
    /// bad quantity or a shop that is not accepting orders, and `NotFound` if
    /// the listing does not exist.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn add_or_update_line_item(
        &self,
        user: &CurrentUser,
        product_info_id: ProductInfoId,
        quantity: i32,
    ) -> Result<OrderLine> {
        require_buyer(user, "fill a basket")?;
        let quantity = validate_quantity(quantity)?;

        let mut tx = self.pool.begin().await?;

        match steps::listing_accepts_orders(&mut tx, product_info_id).await? {
            None => {
                return Err(DomainError::not_found(format!("product {product_info_id}")).into());
            }
            Some(false) => {
                return Err(DomainError::validation(format!(
                    "the shop offering product {product_info_id} is not accepting orders"
                ))
                .into());
            }
            Some(true) => {}
        }

        let basket = steps::get_or_create_basket(&mut tx, user.id).await?;
        let item_id = steps::upsert_item(&mut tx, basket.id, product_info_id, quantity).await?;
        tx.commit().await?;

        info!(order_id = %basket.id, item_id = %item_id, quantity, "Basket item saved");
        self.line(basket.id, item_id).await
    }

    /// Change the quantity of a line item in the caller's basket.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order or item does not exist,
    /// `PermissionDenied` if the order belongs to someone else and
    /// `InvalidState` if it is no longer a basket.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn update_line_item(
        &self,
        user: &CurrentUser,
        order_id: OrderId,
        item_id: OrderItemId,
        quantity: i32,
    ) -> Result<OrderLine> {
        let quantity = validate_quantity(quantity)?;

        let mut tx = self.pool.begin().await?;
        lock_editable_basket(&mut tx, user, order_id).await?;
        steps::update_item_quantity(&mut tx, order_id, item_id, quantity)
            .await
            .map_err(|e| item_error(e, item_id))?;
        tx.commit().await?;

        info!(order_id = %order_id, item_id = %item_id, quantity, "Basket item updated");
        self.line(order_id, item_id).await
    }

    /// Remove a line item from the caller's basket.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order or item does not exist,
    /// `PermissionDenied` if the order belongs to someone else and
    /// `InvalidState` if it is no longer a basket.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn remove_line_item(
        &self,
        user: &CurrentUser,
        order_id: OrderId,
        item_id: OrderItemId,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        lock_editable_basket(&mut tx, user, order_id).await?;
        steps::delete_item(&mut tx, order_id, item_id)
            .await
            .map_err(|e| item_error(e, item_id))?;
        tx.commit().await?;

        info!(order_id = %order_id, item_id = %item_id, "Basket item removed");
        Ok(())
    }

    /// The caller's open basket with a derived total, empty if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn get_basket(&self, user: &CurrentUser) -> Result<BasketView> {
        match OrderRepository::new(self.pool).find_basket(user.id).await? {
            Some(basket) => self.basket_view(basket.id).await,
            None => Ok(BasketView::empty()),
        }
    }

    async fn basket_view(&self, order_id: OrderId) -> Result<BasketView> {
        let items = OrderRepository::new(self.pool).lines(order_id).await?;
        Ok(BasketView::new(order_id, items))
    }

    async fn line(&self, order_id: OrderId, item_id: OrderItemId) -> Result<OrderLine> {
        OrderRepository::new(self.pool)
            .lines(order_id)
            .await?
            .into_iter()
            .find(|line| line.id == item_id)
            .ok_or_else(|| DomainError::not_found(format!("item {item_id}")).into())
    }
}

/// Lock `order_id` and check that the caller may still edit it.
async fn lock_editable_basket(
    conn: &mut PgConnection,
    user: &CurrentUser,
    order_id: OrderId,
) -> Result<()> {
    let order = steps::lock_order(conn, order_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;

    if order.user_id != user.id {
        return Err(DomainError::permission_denied(format!(
            "order {order_id} belongs to another account"
        ))
        .into());
    }
    ensure_editable(order.status)?;
    Ok(())
}

fn item_error(err: RepositoryError, item_id: OrderItemId) -> AppError {
    match err {
        RepositoryError::NotFound => DomainError::not_found(format!("item {item_id}")).into(),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn test_missing_item_is_reported_by_id() {
        let err = item_error(RepositoryError::NotFound, OrderItemId::new(12));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "item 12 not found");
    }

    #[test]
    fn test_other_repository_errors_pass_through() {
        let err = item_error(
            RepositoryError::Conflict("basket was modified concurrently".to_string()),
            OrderItemId::new(12),
        );
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
