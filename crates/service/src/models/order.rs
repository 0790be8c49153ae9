//! Baskets and orders.
//!
//! Totals are computed from line items whenever an order is read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use ordering_core::order::{LineItem, compute_total};
use ordering_core::{ContactId, OrderId, OrderItemId, OrderStatus, ProductInfoId, ShopId, UserId};

/// An `orders` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub contact_id: Option<ContactId>,
    pub created_at: DateTime<Utc>,
}

/// A line item joined with its listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OrderLine {
    pub id: OrderItemId,
    pub product_info_id: ProductInfoId,
    pub product: String,
    pub shop_id: ShopId,
    pub shop: String,
    pub quantity: i32,
    /// Current listing price.
    pub unit_price: Decimal,
}

impl OrderLine {
    /// The pricing view of this line.
    #[must_use]
    pub const fn line_item(&self) -> LineItem {
        LineItem {
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

/// Total of the given lines.
fn total_of(lines: &[OrderLine]) -> Decimal {
    let items: Vec<LineItem> = lines.iter().map(OrderLine::line_item).collect();
    compute_total(&items)
}

/// A buyer's open basket. Empty when the buyer has none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasketView {
    pub order_id: Option<OrderId>,
    pub items: Vec<OrderLine>,
    pub total: Decimal,
}

impl BasketView {
    /// A basket that does not exist yet.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            order_id: None,
            items: Vec::new(),
            total: Decimal::ZERO,
        }
    }

    /// Build from an existing basket and its lines.
    #[must_use]
    pub fn new(order_id: OrderId, items: Vec<OrderLine>) -> Self {
        let total = total_of(&items);
        Self {
            order_id: Some(order_id),
            items,
            total,
        }
    }
}

/// One row of an order list, with a derived total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OrderSummary {
    pub id: OrderId,
    pub status: OrderStatus,
    pub contact_id: Option<ContactId>,
    pub created_at: DateTime<Utc>,
    pub item_count: i64,
    pub total: Decimal,
}

/// An order with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetail {
    pub id: OrderId,
    pub status: OrderStatus,
    pub contact_id: Option<ContactId>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderLine>,
    pub total: Decimal,
}

impl OrderDetail {
    /// Combine an order row with its lines.
    #[must_use]
    pub fn new(record: OrderRecord, items: Vec<OrderLine>) -> Self {
        let total = total_of(&items);
        Self {
            id: record.id,
            status: record.status,
            contact_id: record.contact_id,
            created_at: record.created_at,
            items,
            total,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: i32, quantity: i32, price: i64) -> OrderLine {
        OrderLine {
            id: OrderItemId::new(id),
            product_info_id: ProductInfoId::new(id),
            product: format!("Product {id}"),
            shop_id: ShopId::new(1),
            shop: "Acme".to_string(),
            quantity,
            unit_price: Decimal::from(price),
        }
    }

    #[test]
    fn test_basket_total_is_derived_from_lines() {
        let basket = BasketView::new(OrderId::new(3), vec![line(1, 5, 500), line(2, 2, 25)]);
        assert_eq!(basket.total, Decimal::from(2550));
        assert_eq!(basket.order_id, Some(OrderId::new(3)));
    }

    #[test]
    fn test_empty_basket_serializes_without_id() {
        let json = serde_json::to_value(BasketView::empty()).unwrap();
        assert!(json["order_id"].is_null());
        assert_eq!(json["items"].as_array().unwrap().len(), 0);
        assert_eq!(json["total"], "0");
    }
}
