//! Events put on the outbound notification queue.

use serde::{Deserialize, Serialize};

use crate::types::{OrderId, OrderStatus};

/// An order moved from one status to another.
///
/// Published after the status change has been committed. Delivery is best
/// effort; a lost event never rolls back the change that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeEvent {
    /// The order that changed.
    pub order_id: OrderId,
    /// Status before the change.
    pub previous_status: OrderStatus,
    /// Status after the change.
    pub new_status: OrderStatus,
    /// Where to tell the buyer.
    pub buyer_email: String,
}

impl StatusChangeEvent {
    /// Subject line for messages about this event.
    #[must_use]
    pub fn subject(&self) -> String {
        format!("Order #{} is now {}", self.order_id, self.new_status)
    }

    /// The buyer just placed the order.
    #[must_use]
    pub const fn is_placement(&self) -> bool {
        matches!(
            (self.previous_status, self.new_status),
            (OrderStatus::Basket, OrderStatus::New)
        )
    }
}
