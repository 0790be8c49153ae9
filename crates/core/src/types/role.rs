//! Account roles.

use serde::{Deserialize, Serialize};

/// The kind of account a user registered as.
///
/// Buyers fill baskets and place orders. Shops own catalogs, import goods
/// and move placed orders through the fulfilment workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// A supplier account that owns a shop.
    Shop,
    /// A customer account.
    #[default]
    Buyer,
}

impl UserRole {
    /// Returns `true` for shop accounts.
    #[must_use]
    pub const fn is_shop(self) -> bool {
        matches!(self, Self::Shop)
    }

    /// Returns `true` for buyer accounts.
    #[must_use]
    pub const fn is_buyer(self) -> bool {
        matches!(self, Self::Buyer)
    }

    /// The label stored in the database and used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shop => "shop",
            Self::Buyer => "buyer",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shop" => Ok(Self::Shop),
            "buyer" => Ok(Self::Buyer),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [UserRole::Shop, UserRole::Buyer] {
            assert_eq!(role.to_string().parse::<UserRole>().unwrap(), role);
        }
        assert!("admin".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_default_role_is_buyer() {
        assert_eq!(UserRole::default(), UserRole::Buyer);
        assert!(UserRole::default().is_buyer());
        assert!(!UserRole::default().is_shop());
    }
}
