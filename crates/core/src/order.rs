//! Basket and order rules.
//!
//! Order totals are always derived from line items at read time; no total is
//! stored on the order row.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::types::OrderStatus;

/// Largest quantity accepted for a single line item.
pub const MAX_LINE_QUANTITY: i32 = 10_000;

/// The pricing-relevant part of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Units ordered.
    pub quantity: i32,
    /// Current price of one unit on the listing.
    pub unit_price: Decimal,
}

impl LineItem {
    /// Quantity multiplied by unit price.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Sum of `quantity × unit_price` over all items.
///
/// ```
/// use ordering_core::order::{LineItem, compute_total};
/// use rust_decimal::Decimal;
///
/// let items = [
///     LineItem { quantity: 2, unit_price: Decimal::new(1050, 2) },
///     LineItem { quantity: 1, unit_price: Decimal::from(3) },
/// ];
/// assert_eq!(compute_total(&items), Decimal::new(2400, 2));
/// ```
#[must_use]
pub fn compute_total(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::subtotal).sum()
}

/// Check a requested line item quantity.
///
/// # Errors
///
/// Returns [`DomainError::Validation`] unless `1 <= quantity <= MAX_LINE_QUANTITY`.
pub fn validate_quantity(quantity: i32) -> Result<i32, DomainError> {
    if quantity < 1 {
        return Err(DomainError::validation("quantity must be at least 1"));
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(DomainError::validation(format!(
            "quantity must be at most {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(quantity)
}

/// Check that an order can be placed.
///
/// # Errors
///
/// Returns [`DomainError::InvalidState`] if the order is no longer a basket
/// or has no line items.
pub fn ensure_placeable(status: OrderStatus, item_count: usize) -> Result<(), DomainError> {
    if !status.is_basket() {
        return Err(DomainError::invalid_state(format!(
            "order has already been placed (status: {status})"
        )));
    }
    if item_count == 0 {
        return Err(DomainError::invalid_state("basket is empty"));
    }
    Ok(())
}

/// Check that an order's line items can still be edited.
///
/// # Errors
///
/// Returns [`DomainError::InvalidState`] unless the order is a basket.
pub fn ensure_editable(status: OrderStatus) -> Result<(), DomainError> {
    if status.is_basket() {
        Ok(())
    } else {
        Err(DomainError::invalid_state(format!(
            "only baskets can be edited (status: {status})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_of_empty_basket_is_zero() {
        assert_eq!(compute_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_total_multiplies_quantity_by_price() {
        let items = [
            LineItem {
                quantity: 5,
                unit_price: Decimal::from(500),
            },
            LineItem {
                quantity: 1,
                unit_price: Decimal::new(1999, 2),
            },
        ];
        assert_eq!(compute_total(&items), Decimal::new(252_999, 2));
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
        assert_eq!(validate_quantity(1).ok(), Some(1));
        assert_eq!(validate_quantity(MAX_LINE_QUANTITY).ok(), Some(MAX_LINE_QUANTITY));
    }

    #[test]
    fn test_empty_basket_cannot_be_placed() {
        assert!(matches!(
            ensure_placeable(OrderStatus::Basket, 0),
            Err(DomainError::InvalidState(_))
        ));
    }

    #[test]
    fn test_placed_order_cannot_be_placed_again() {
        for status in OrderStatus::ALL.into_iter().filter(|s| !s.is_basket()) {
            assert!(matches!(
                ensure_placeable(status, 3),
                Err(DomainError::InvalidState(_))
            ));
        }
        assert!(ensure_placeable(OrderStatus::Basket, 1).is_ok());
    }

    #[test]
    fn test_only_baskets_are_editable() {
        assert!(ensure_editable(OrderStatus::Basket).is_ok());
        assert!(ensure_editable(OrderStatus::New).is_err());
    }
}
