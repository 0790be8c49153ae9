//! Catalog models: shops, categories and listings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ordering_core::{CategoryId, ProductId, ProductInfoId, ShopId, UserId};

/// A shop, owned by one shop account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Shop {
    pub id: ShopId,
    pub user_id: UserId,
    pub name: String,
    /// URL of the last catalog fetched from the supplier.
    pub url: Option<String>,
    /// File name of the last uploaded catalog.
    pub filename: Option<String>,
    /// Whether buyers may add this shop's listings to a basket.
    pub accepting_orders: bool,
}

/// The order-acceptance state a shop account sees for its own shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ShopState {
    pub shop_id: ShopId,
    pub name: String,
    pub accepting_orders: bool,
}

/// A category shared between shops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A product as offered by one shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Listing {
    pub id: ProductInfoId,
    pub product_id: ProductId,
    pub name: String,
    pub category_id: CategoryId,
    pub category: String,
    pub shop_id: ShopId,
    pub shop: String,
    /// Supplier-side goods id.
    pub external_id: i64,
    pub model: String,
    /// Units in stock.
    pub quantity: i32,
    pub price: Decimal,
    /// Recommended retail price.
    pub price_rrc: Decimal,
}

/// A named parameter value on a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ListingParameter {
    pub name: String,
    pub value: String,
}

/// A listing together with its parameters.
#[derive(Debug, Clone, Serialize)]
pub struct ListingDetail {
    #[serde(flatten)]
    pub listing: Listing,
    pub parameters: Vec<ListingParameter>,
}

/// Query-string filter for listing browsing.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListingFilter {
    pub shop_id: Option<ShopId>,
    pub category_id: Option<CategoryId>,
}

/// What a catalog import touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub shop_id: ShopId,
    pub categories: usize,
    pub goods: usize,
    pub parameters: usize,
}
