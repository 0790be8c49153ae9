//! Baskets, orders and line items.
//!
//! One open basket per user is guaranteed by the partial unique index
//! `orders_one_basket_per_user`; [`get_or_create_basket`] inserts against it
//! with `ON CONFLICT DO NOTHING` and falls back to reading the existing row.

use sqlx::{PgConnection, PgPool};

use ordering_core::{ContactId, OrderId, OrderItemId, OrderStatus, ProductInfoId, UserId};

use super::RepositoryError;
use crate::models::{OrderLine, OrderRecord, OrderSummary};

const ORDER_COLUMNS: &str = "id, user_id, status, contact_id, created_at";

const LINE_SELECT: &str = r"
    SELECT oi.id, oi.product_info_id, p.name AS product, pi.shop_id, s.name AS shop,
           oi.quantity, pi.price AS unit_price
    FROM order_items oi
    JOIN product_infos pi ON pi.id = oi.product_info_id
    JOIN products p ON p.id = pi.product_id
    JOIN shops s ON s.id = pi.shop_id
";

const SUMMARY_SELECT: &str = r"
    SELECT o.id, o.status, o.contact_id, o.created_at,
           COUNT(oi.id) AS item_count,
           COALESCE(SUM(oi.quantity * pi.price), 0) AS total
    FROM orders o
    LEFT JOIN order_items oi ON oi.order_id = o.id
    LEFT JOIN product_infos pi ON pi.id = oi.product_info_id
";

/// Attempts made by [`get_or_create_basket`] before giving up.
const BASKET_ATTEMPTS: usize = 2;

/// Repository for reading orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's open basket, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_basket(&self, user_id: UserId) -> Result<Option<OrderRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRecord>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 AND status = 'basket'"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// One order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<OrderRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRecord>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Line items of an order with current listing prices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderLine>(&format!(
            "{LINE_SELECT} WHERE oi.order_id = $1 ORDER BY oi.id"
        ))
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Placed orders of a buyer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_buyer(&self, user_id: UserId) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderSummary>(&format!(
            r"
            {SUMMARY_SELECT}
            WHERE o.user_id = $1 AND o.status <> 'basket'
            GROUP BY o.id
            ORDER BY o.created_at DESC, o.id DESC
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Placed orders containing at least one listing of a shop owned by
    /// `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_shop_owner(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderSummary>(&format!(
            r"
            {SUMMARY_SELECT}
            WHERE o.status <> 'basket'
              AND EXISTS (
                  SELECT 1
                  FROM order_items own
                  JOIN product_infos own_pi ON own_pi.id = own.product_info_id
                  JOIN shops own_s ON own_s.id = own_pi.shop_id
                  WHERE own.order_id = o.id AND own_s.user_id = $1
              )
            GROUP BY o.id
            ORDER BY o.created_at DESC, o.id DESC
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

// =============================================================================
// Transactional steps
// =============================================================================

/// Whether the listing's shop accepts orders, `None` if the listing does not exist.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn listing_accepts_orders(
    conn: &mut PgConnection,
    product_info_id: ProductInfoId,
) -> Result<Option<bool>, RepositoryError> {
    let accepting = sqlx::query_scalar::<_, bool>(
        r"
        SELECT s.accepting_orders
        FROM product_infos pi
        JOIN shops s ON s.id = pi.shop_id
        WHERE pi.id = $1
        ",
    )
    .bind(product_info_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(accepting)
}

/// Return the user's open basket, creating it if needed, locked for update.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the basket keeps changing under
/// concurrent requests, `RepositoryError::Database` if a query fails.
pub async fn get_or_create_basket(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<OrderRecord, RepositoryError> {
    for attempt in 1..=BASKET_ATTEMPTS {
        let inserted = sqlx::query_as::<_, OrderRecord>(&format!(
            r"
            INSERT INTO orders (user_id) VALUES ($1)
            ON CONFLICT (user_id) WHERE status = 'basket' DO NOTHING
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(basket) = inserted {
            tracing::debug!(user_id = %user_id, order_id = %basket.id, "Created basket");
            return Ok(basket);
        }

        let existing = sqlx::query_as::<_, OrderRecord>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 AND status = 'basket' FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(basket) = existing {
            return Ok(basket);
        }

        tracing::debug!(user_id = %user_id, attempt, "Basket vanished between insert and read, retrying");
    }

    Err(RepositoryError::Conflict(
        "basket was modified concurrently".to_owned(),
    ))
}

/// Lock an order row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_order(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Option<OrderRecord>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRecord>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Insert a line item or replace the quantity of the existing one.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the upsert fails.
pub async fn upsert_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    product_info_id: ProductInfoId,
    quantity: i32,
) -> Result<OrderItemId, RepositoryError> {
    let id = sqlx::query_scalar::<_, OrderItemId>(
        r"
        INSERT INTO order_items (order_id, product_info_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (order_id, product_info_id) DO UPDATE SET quantity = EXCLUDED.quantity
        RETURNING id
        ",
    )
    .bind(order_id)
    .bind(product_info_id)
    .bind(quantity)
    .fetch_one(&mut *conn)
    .await?;

    touch_order(conn, order_id).await?;
    Ok(id)
}

/// Set the quantity of a line item in `order_id`.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the item is not part of the order.
pub async fn update_item_quantity(
    conn: &mut PgConnection,
    order_id: OrderId,
    item_id: OrderItemId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    let result = sqlx::query("UPDATE order_items SET quantity = $3 WHERE id = $2 AND order_id = $1")
        .bind(order_id)
        .bind(item_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    touch_order(conn, order_id).await
}

/// Remove a line item from `order_id`.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the item is not part of the order.
pub async fn delete_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    item_id: OrderItemId,
) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM order_items WHERE id = $2 AND order_id = $1")
        .bind(order_id)
        .bind(item_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    touch_order(conn, order_id).await
}

async fn touch_order(conn: &mut PgConnection, order_id: OrderId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE orders SET updated_at = NOW() WHERE id = $1")
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Number of line items in an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count_items(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<usize, RepositoryError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = $1")
        .bind(order_id)
        .fetch_one(&mut *conn)
        .await?;
    usize::try_from(count)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative row count {count}")))
}

/// Owner of a contact, `None` if the contact does not exist.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn contact_owner(
    conn: &mut PgConnection,
    contact_id: ContactId,
) -> Result<Option<UserId>, RepositoryError> {
    let owner = sqlx::query_scalar::<_, UserId>("SELECT user_id FROM contacts WHERE id = $1")
        .bind(contact_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(owner)
}

/// Turn a basket into a `new` order with the given contact.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order is not a basket any more.
pub async fn place(
    conn: &mut PgConnection,
    order_id: OrderId,
    contact_id: ContactId,
) -> Result<OrderRecord, RepositoryError> {
    sqlx::query_as::<_, OrderRecord>(&format!(
        r"
        UPDATE orders
        SET status = 'new', contact_id = $2, created_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'basket'
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(order_id)
    .bind(contact_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Set the status only if it is still `from`.
///
/// Returns `None` when another request changed the status first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn compare_and_set_status(
    conn: &mut PgConnection,
    order_id: OrderId,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<Option<OrderRecord>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRecord>(&format!(
        r"
        UPDATE orders SET status = $3, updated_at = NOW()
        WHERE id = $1 AND status = $2
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(order_id)
    .bind(from)
    .bind(to)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Whether `user_id` owns a shop supplying at least one line item of the order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn fulfilled_by(
    conn: &mut PgConnection,
    order_id: OrderId,
    user_id: UserId,
) -> Result<bool, RepositoryError> {
    let fulfils: bool = sqlx::query_scalar(
        r"
        SELECT EXISTS (
            SELECT 1
            FROM order_items oi
            JOIN product_infos pi ON pi.id = oi.product_info_id
            JOIN shops s ON s.id = pi.shop_id
            WHERE oi.order_id = $1 AND s.user_id = $2
        )
        ",
    )
    .bind(order_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(fulfils)
}

/// Email address of the order's buyer.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order does not exist.
pub async fn buyer_email(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<String, RepositoryError> {
    sqlx::query_scalar::<_, String>(
        "SELECT u.email FROM orders o JOIN users u ON u.id = o.user_id WHERE o.id = $1",
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}
