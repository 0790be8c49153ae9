//! Order status state machine.
//!
//! ```text
//! basket ──place──▶ new ──▶ confirmed ──▶ assembled ──▶ sent ──▶ delivered
//!                    │          │             │           │
//!                    └──────────┴─────────────┴───────────┴──▶ canceled
//! ```
//!
//! `basket → new` only happens when a buyer places an order. Every other edge
//! is a shop-side update. `delivered` and `canceled` are terminal.

use serde::{Deserialize, Serialize};

/// Status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Buyer-editable basket, not yet placed.
    #[default]
    Basket,
    /// Placed by the buyer, waiting for the shop.
    New,
    /// Accepted by the shop.
    Confirmed,
    /// Packed and ready to ship.
    Assembled,
    /// Handed to delivery.
    Sent,
    /// Received by the buyer.
    Delivered,
    /// Canceled before delivery.
    Canceled,
}

/// Error returned for an edge missing from the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot change order status from {from} to {to}")]
pub struct TransitionError {
    /// Status the order was in.
    pub from: OrderStatus,
    /// Status that was requested.
    pub to: OrderStatus,
}

impl OrderStatus {
    /// Every status, in workflow order.
    pub const ALL: [Self; 7] = [
        Self::Basket,
        Self::New,
        Self::Confirmed,
        Self::Assembled,
        Self::Sent,
        Self::Delivered,
        Self::Canceled,
    ];

    /// Every status, in workflow order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &Self::ALL
    }

    /// Statuses reachable from `self` in one step.
    #[must_use]
    pub const fn successors(self) -> &'static [Self] {
        match self {
            Self::Basket => &[Self::New],
            Self::New => &[Self::Confirmed, Self::Canceled],
            Self::Confirmed => &[Self::Assembled, Self::Canceled],
            Self::Assembled => &[Self::Sent, Self::Canceled],
            Self::Sent => &[Self::Delivered, Self::Canceled],
            Self::Delivered | Self::Canceled => &[],
        }
    }

    /// Whether the transition table has an edge from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.successors().contains(&next)
    }

    /// Move to `next` if the table allows it.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if there is no edge from `self` to `next`.
    pub fn transition_to(self, next: Self) -> Result<Self, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }

    /// Whether a shop may request `self` as a target status.
    ///
    /// `basket` and `new` are owned by the buyer side.
    #[must_use]
    pub const fn is_shop_target(self) -> bool {
        !matches!(self, Self::Basket | Self::New)
    }

    /// No further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    /// Still a buyer-editable basket.
    #[must_use]
    pub const fn is_basket(self) -> bool {
        matches!(self, Self::Basket)
    }

    /// The label stored in the database and used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basket => "basket",
            Self::New => "new",
            Self::Confirmed => "confirmed",
            Self::Assembled => "assembled",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}
