//! Catalog storage: shops, categories, products, listings and parameters.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use ordering_core::{CategoryId, ParameterId, ProductId, ProductInfoId, ShopId, UserId};

use super::RepositoryError;
use crate::models::{Category, Listing, ListingFilter, ListingParameter, Shop, ShopState};

/// Unique constraint on `shops.name`.
const SHOP_NAME_CONSTRAINT: &str = "shops_name_key";

const SHOP_COLUMNS: &str = "id, user_id, name, url, filename, accepting_orders";

const LISTING_SELECT: &str = r"
    SELECT pi.id, pi.product_id, p.name, p.category_id, c.name AS category,
           pi.shop_id, s.name AS shop, pi.external_id, pi.model, pi.quantity,
           pi.price, pi.price_rrc
    FROM product_infos pi
    JOIN products p ON p.id = pi.product_id
    JOIN categories c ON c.id = p.category_id
    JOIN shops s ON s.id = pi.shop_id
";

/// Repository for catalog browsing and shop state.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Shops currently accepting orders, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_shops(&self) -> Result<Vec<Shop>, RepositoryError> {
        let rows = sqlx::query_as::<_, Shop>(&format!(
            "SELECT {SHOP_COLUMNS} FROM shops WHERE accepting_orders ORDER BY name"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// All categories, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Listings of shops accepting orders, optionally filtered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_listings(
        &self,
        filter: ListingFilter,
    ) -> Result<Vec<Listing>, RepositoryError> {
        let rows = sqlx::query_as::<_, Listing>(&format!(
            r"
            {LISTING_SELECT}
            WHERE s.accepting_orders
              AND ($1::int4 IS NULL OR pi.shop_id = $1)
              AND ($2::int4 IS NULL OR p.category_id = $2)
            ORDER BY p.name, s.name
            "
        ))
        .bind(filter.shop_id)
        .bind(filter.category_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// One listing of a shop accepting orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_listing(&self, id: ProductInfoId) -> Result<Option<Listing>, RepositoryError> {
        let row = sqlx::query_as::<_, Listing>(&format!(
            "{LISTING_SELECT} WHERE pi.id = $1 AND s.accepting_orders"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Parameters of a listing, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn listing_parameters(
        &self,
        id: ProductInfoId,
    ) -> Result<Vec<ListingParameter>, RepositoryError> {
        let rows = sqlx::query_as::<_, ListingParameter>(
            r"
            SELECT pa.name, pp.value
            FROM product_parameters pp
            JOIN parameters pa ON pa.id = pp.parameter_id
            WHERE pp.product_info_id = $1
            ORDER BY pa.name
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// The shop owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn shop_state(&self, user_id: UserId) -> Result<Option<ShopState>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopState>(
            "SELECT id AS shop_id, name, accepting_orders FROM shops WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Switch order acceptance for the shop owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user owns no shop.
    pub async fn set_accepting_orders(
        &self,
        user_id: UserId,
        accepting: bool,
    ) -> Result<ShopState, RepositoryError> {
        sqlx::query_as::<_, ShopState>(
            r"
            UPDATE shops SET accepting_orders = $2
            WHERE user_id = $1
            RETURNING id AS shop_id, name, accepting_orders
            ",
        )
        .bind(user_id)
        .bind(accepting)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

// =============================================================================
// Import steps (run inside one transaction)
// =============================================================================

/// Stock, prices and supplier id written to a listing.
#[derive(Debug, Clone, Copy)]
pub struct ListingValues<'a> {
    pub external_id: i64,
    pub model: &'a str,
    pub quantity: i32,
    pub price: Decimal,
    pub price_rrc: Decimal,
}

/// Find a shop by name and lock it.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_shop_by_name(
    conn: &mut PgConnection,
    name: &str,
) -> Result<Option<Shop>, RepositoryError> {
    let row = sqlx::query_as::<_, Shop>(&format!(
        "SELECT {SHOP_COLUMNS} FROM shops WHERE name = $1 FOR UPDATE"
    ))
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Create a shop owned by `user_id`.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if another account took the name or
/// the user already owns a shop.
pub async fn insert_shop(
    conn: &mut PgConnection,
    user_id: UserId,
    name: &str,
    url: Option<&str>,
    filename: Option<&str>,
) -> Result<Shop, RepositoryError> {
    sqlx::query_as::<_, Shop>(&format!(
        r"
        INSERT INTO shops (user_id, name, url, filename)
        VALUES ($1, $2, $3, $4)
        RETURNING {SHOP_COLUMNS}
        "
    ))
    .bind(user_id)
    .bind(name)
    .bind(url)
    .bind(filename)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        RepositoryError::conflict_on_constraint(e, |constraint| shop_conflict(constraint, name))
    })
}

/// Record where the shop's latest catalog came from.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn update_shop_source(
    conn: &mut PgConnection,
    shop_id: ShopId,
    url: Option<&str>,
    filename: Option<&str>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE shops
        SET url = COALESCE($2, url), filename = COALESCE($3, filename)
        WHERE id = $1
        ",
    )
    .bind(shop_id)
    .bind(url)
    .bind(filename)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Get or create a category by name.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the upsert fails.
pub async fn upsert_category(
    conn: &mut PgConnection,
    name: &str,
) -> Result<CategoryId, RepositoryError> {
    let id = sqlx::query_scalar::<_, CategoryId>(
        r"
        INSERT INTO categories (name) VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        ",
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// Link a category to a shop.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn link_shop_category(
    conn: &mut PgConnection,
    shop_id: ShopId,
    category_id: CategoryId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO shop_categories (shop_id, category_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(shop_id)
    .bind(category_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Get or create a product by name within a category.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the upsert fails.
pub async fn upsert_product(
    conn: &mut PgConnection,
    name: &str,
    category_id: CategoryId,
) -> Result<ProductId, RepositoryError> {
    let id = sqlx::query_scalar::<_, ProductId>(
        r"
        INSERT INTO products (name, category_id) VALUES ($1, $2)
        ON CONFLICT (name, category_id) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        ",
    )
    .bind(name)
    .bind(category_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// Create or update the listing of `product_id` in `shop_id`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the upsert fails.
pub async fn upsert_listing(
    conn: &mut PgConnection,
    product_id: ProductId,
    shop_id: ShopId,
    values: ListingValues<'_>,
) -> Result<ProductInfoId, RepositoryError> {
    let id = sqlx::query_scalar::<_, ProductInfoId>(
        r"
        INSERT INTO product_infos (product_id, shop_id, external_id, model, quantity, price, price_rrc)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (product_id, shop_id) DO UPDATE
        SET external_id = EXCLUDED.external_id,
            model = EXCLUDED.model,
            quantity = EXCLUDED.quantity,
            price = EXCLUDED.price,
            price_rrc = EXCLUDED.price_rrc
        RETURNING id
        ",
    )
    .bind(product_id)
    .bind(shop_id)
    .bind(values.external_id)
    .bind(values.model)
    .bind(values.quantity)
    .bind(values.price)
    .bind(values.price_rrc)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// Get or create a parameter by name.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the upsert fails.
pub async fn upsert_parameter(
    conn: &mut PgConnection,
    name: &str,
) -> Result<ParameterId, RepositoryError> {
    let id = sqlx::query_scalar::<_, ParameterId>(
        r"
        INSERT INTO parameters (name) VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        ",
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// Replace every parameter value of a listing.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete or insert fails.
pub async fn replace_listing_parameters(
    conn: &mut PgConnection,
    listing_id: ProductInfoId,
    values: &[(ParameterId, String)],
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM product_parameters WHERE product_info_id = $1")
        .bind(listing_id)
        .execute(&mut *conn)
        .await?;

    if values.is_empty() {
        return Ok(());
    }

    let parameter_ids: Vec<i32> = values.iter().map(|(id, _)| id.as_i32()).collect();
    let texts: Vec<&str> = values.iter().map(|(_, value)| value.as_str()).collect();

    sqlx::query(
        r"
        INSERT INTO product_parameters (product_info_id, parameter_id, value)
        SELECT $1, parameter_id, value
        FROM UNNEST($2::int4[], $3::text[]) AS t(parameter_id, value)
        ",
    )
    .bind(listing_id)
    .bind(&parameter_ids)
    .bind(&texts)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn shop_conflict(constraint: Option<&str>, name: &str) -> String {
    match constraint {
        Some(SHOP_NAME_CONSTRAINT) => format!("shop \"{name}\" is managed by another account"),
        _ => "account already manages another shop".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shop_conflict_names_the_violated_rule() {
        assert_eq!(
            shop_conflict(Some("shops_name_key"), "Acme"),
            "shop \"Acme\" is managed by another account"
        );
        assert_eq!(
            shop_conflict(Some("shops_user_id_key"), "Acme"),
            "account already manages another shop"
        );
        assert_eq!(
            shop_conflict(None, "Acme"),
            "account already manages another shop"
        );
    }
}
