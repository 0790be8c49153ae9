//! The YAML catalog format.
//!
//! ```yaml
//! shop: Acme
//! categories:
//!   - id: 1
//!     name: Tools
//! goods:
//!   - id: 1
//!     category: 1
//!     name: Hammer
//!     model: H-100
//!     quantity: 10
//!     price: 500
//!     price_rrc: 600
//!     parameters:
//!       weight: 1kg
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prices are stored as `NUMERIC(12, 2)`: ten integer digits, two decimals.
const PRICE_LIMIT: i64 = 10_000_000_000;
const PRICE_SCALE: u32 = 2;

/// Errors raised while parsing or validating a catalog document.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The text is not valid YAML or does not match the document shape.
    #[error("malformed document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The `shop` field is blank.
    #[error("shop name must not be empty")]
    EmptyShopName,

    /// A category has a blank name.
    #[error("category {id} has an empty name")]
    EmptyCategoryName {
        /// Supplier category id.
        id: i64,
    },

    /// The same category id appears twice.
    #[error("category {id} is declared more than once")]
    DuplicateCategory {
        /// Supplier category id.
        id: i64,
    },

    /// A goods item has a blank name.
    #[error("goods item {id} has an empty name")]
    EmptyGoodsName {
        /// Supplier goods id.
        id: i64,
    },

    /// A goods item points at a category the document does not declare.
    #[error("goods item {id} references undeclared category {category}")]
    UnknownCategory {
        /// Supplier goods id.
        id: i64,
        /// The category id it references.
        category: i64,
    },

    /// A numeric field is negative, too large to store, or a price has more
    /// than two decimal places.
    #[error("goods item {id}: {field} is out of range")]
    OutOfRange {
        /// Supplier goods id.
        id: i64,
        /// Field name as written in the document.
        field: &'static str,
    },

    /// A parameter has a blank name.
    #[error("goods item {id} has a parameter with an empty name")]
    EmptyParameterName {
        /// Supplier goods id.
        id: i64,
    },
}

/// A supplier catalog document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportDocument {
    /// Shop name. Shops are matched by name across imports.
    pub shop: String,
    /// Categories referenced by `goods`.
    pub categories: Vec<CategoryEntry>,
    /// Listings offered by the shop.
    pub goods: Vec<GoodsEntry>,
}

/// A category declared by a catalog document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    /// Supplier-side id, only meaningful inside one document.
    pub id: i64,
    /// Category name. Categories are shared between shops by name.
    pub name: String,
}

/// A listing declared by a catalog document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodsEntry {
    /// Supplier-side goods id, stored as the listing's external id.
    pub id: i64,
    /// Supplier-side category id.
    pub category: i64,
    /// Product name.
    pub name: String,
    /// Model designation.
    #[serde(default)]
    pub model: String,
    /// Units in stock.
    pub quantity: i64,
    /// Unit price.
    pub price: Decimal,
    /// Recommended retail price.
    pub price_rrc: Decimal,
    /// Free-form attributes.
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
}

/// A parameter value as written in YAML.
///
/// Suppliers write `diagonal: 6.5` or `color: black`; both are stored as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// `true` / `false`.
    Bool(bool),
    /// Whole numbers.
    Integer(i64),
    /// Decimal numbers.
    Float(f64),
    /// Anything else.
    Text(String),
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl ImportDocument {
    /// Parse and validate a YAML catalog document.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Yaml`] for malformed YAML or missing/mistyped
    /// fields, and the other variants for documents that parse but break a
    /// catalog rule.
    pub fn from_yaml(text: &str) -> Result<Self, ImportError> {
        let document: Self = serde_yaml::from_str(text)?;
        document.validate()?;
        Ok(document)
    }

    /// Check the rules serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first rule violation found.
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.shop.trim().is_empty() {
            return Err(ImportError::EmptyShopName);
        }

        let mut declared = HashSet::with_capacity(self.categories.len());
        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(ImportError::EmptyCategoryName { id: category.id });
            }
            if !declared.insert(category.id) {
                return Err(ImportError::DuplicateCategory { id: category.id });
            }
        }

        for item in &self.goods {
            if item.name.trim().is_empty() {
                return Err(ImportError::EmptyGoodsName { id: item.id });
            }
            if !declared.contains(&item.category) {
                return Err(ImportError::UnknownCategory {
                    id: item.id,
                    category: item.category,
                });
            }
            if item.stock().is_none() {
                return Err(ImportError::OutOfRange {
                    id: item.id,
                    field: "quantity",
                });
            }
            if !price_fits(item.price) {
                return Err(ImportError::OutOfRange {
                    id: item.id,
                    field: "price",
                });
            }
            if !price_fits(item.price_rrc) {
                return Err(ImportError::OutOfRange {
                    id: item.id,
                    field: "price_rrc",
                });
            }
            if item.parameters.keys().any(|name| name.trim().is_empty()) {
                return Err(ImportError::EmptyParameterName { id: item.id });
            }
        }

        Ok(())
    }

    /// Category names keyed by supplier category id.
    #[must_use]
    pub fn category_names(&self) -> HashMap<i64, &str> {
        self.categories
            .iter()
            .map(|c| (c.id, c.name.trim()))
            .collect()
    }

    /// Distinct parameter names used by any goods item.
    #[must_use]
    pub fn parameter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .goods
            .iter()
            .flat_map(|g| g.parameters.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

impl GoodsEntry {
    /// Stock as stored in the database, `None` if negative or too large.
    #[must_use]
    pub fn stock(&self) -> Option<i32> {
        i32::try_from(self.quantity).ok().filter(|q| *q >= 0)
    }
}

/// Whether a price can be stored without overflow or rounding.
fn price_fits(price: Decimal) -> bool {
    !price.is_sign_negative()
        && price < Decimal::from(PRICE_LIMIT)
        && price.normalize().scale() <= PRICE_SCALE
}
