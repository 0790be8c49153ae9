//! Catalog import, browsing and shop state.
//!
//! An import parses and validates the whole document before opening a
//! transaction, then writes shop, categories, products, listings and
//! parameters in that one transaction. Any failure rolls everything back.

use std::collections::HashMap;

use sqlx::PgPool;
use tracing::{info, instrument};
use url::Url;

use ordering_core::catalog::ImportDocument;
use ordering_core::{CategoryId, DomainError, ParameterId, ProductInfoId};

use super::require_shop;
use crate::db::RepositoryError;
use crate::db::catalog::{self as steps, CatalogRepository, ListingValues};
use crate::error::Result;
use crate::models::{
    Category, CurrentUser, ImportSummary, Listing, ListingDetail, ListingFilter, Shop, ShopState,
};

/// Where an imported catalog came from. Stored on the shop.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportSource<'a> {
    /// URL the document was fetched from.
    pub url: Option<&'a str>,
    /// Name of the uploaded file.
    pub filename: Option<&'a str>,
}

impl<'a> ImportSource<'a> {
    /// A document uploaded as a file.
    #[must_use]
    pub const fn upload(filename: Option<&'a str>) -> Self {
        Self {
            url: None,
            filename,
        }
    }

    /// A document fetched from a supplier URL.
    #[must_use]
    pub const fn url(url: &'a str) -> Self {
        Self {
            url: Some(url),
            filename: None,
        }
    }
}

/// Catalog service.
pub struct CatalogService<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    fn repo(&self) -> CatalogRepository<'a> {
        CatalogRepository::new(self.pool)
    }

    /// Parse a YAML catalog and import it.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for non-shop accounts, `Parse` for invalid
    /// documents, and whatever [`Self::import_document`] returns.
    pub async fn import(
        &self,
        user: &CurrentUser,
        text: &str,
        source: ImportSource<'_>,
    ) -> Result<ImportSummary> {
        require_shop(user, "import goods")?;
        let document = ImportDocument::from_yaml(text).map_err(DomainError::from)?;
        self.import_document(user, &document, source).await
    }

    /// Write a validated catalog document in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if the user is not a shop account or the
    /// shop belongs to another account, `Conflict` if the account already
    /// manages a differently named shop.
    #[instrument(
        skip(self, user, document, source),
        fields(user_id = %user.id, shop = %document.shop, source = %source)
    )]
    pub async fn import_document(
        &self,
        user: &CurrentUser,
        document: &ImportDocument,
        source: ImportSource<'_>,
    ) -> Result<ImportSummary> {
        require_shop(user, "import goods")?;

        let shop_name = document.shop.trim();
        let mut tx = self.pool.begin().await?;

        let shop_id = match steps::find_shop_by_name(&mut tx, shop_name).await? {
            Some(shop) if shop.user_id != user.id => {
                return Err(DomainError::permission_denied(format!(
                    "shop \"{shop_name}\" is managed by another account"
                ))
                .into());
            }
            Some(shop) => {
                steps::update_shop_source(&mut tx, shop.id, source.url, source.filename).await?;
                shop.id
            }
            None => {
                steps::insert_shop(&mut tx, user.id, shop_name, source.url, source.filename)
                    .await?
                    .id
            }
        };

        let mut categories: HashMap<i64, CategoryId> =
            HashMap::with_capacity(document.categories.len());
        for (supplier_id, name) in document.category_names() {
            let category_id = steps::upsert_category(&mut tx, name).await?;
            steps::link_shop_category(&mut tx, shop_id, category_id).await?;
            categories.insert(supplier_id, category_id);
        }

        let parameter_names = document.parameter_names();
        let mut parameters: HashMap<&str, ParameterId> =
            HashMap::with_capacity(parameter_names.len());
        for &name in &parameter_names {
            let parameter_id = steps::upsert_parameter(&mut tx, name).await?;
            parameters.insert(name, parameter_id);
        }

        for item in &document.goods {
            let category_id = *categories.get(&item.category).ok_or_else(|| {
                DomainError::validation(format!(
                    "goods item {} references undeclared category {}",
                    item.id, item.category
                ))
            })?;
            let quantity = item.stock().ok_or_else(|| {
                DomainError::validation(format!("goods item {} has an invalid quantity", item.id))
            })?;

            let product_id = steps::upsert_product(&mut tx, item.name.trim(), category_id).await?;
            let listing_id = steps::upsert_listing(
                &mut tx,
                product_id,
                shop_id,
                ListingValues {
                    external_id: item.id,
                    model: &item.model,
                    quantity,
                    price: item.price,
                    price_rrc: item.price_rrc,
                },
            )
            .await?;

            let values = item
                .parameters
                .iter()
                .map(|(name, value)| {
                    parameters
                        .get(name.as_str())
                        .map(|id| (*id, value.to_string()))
                        .ok_or_else(|| {
                            RepositoryError::DataCorruption(format!("parameter {name} not upserted"))
                        })
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            steps::replace_listing_parameters(&mut tx, listing_id, &values).await?;
        }

        tx.commit().await?;

        let summary = ImportSummary {
            shop_id,
            categories: categories.len(),
            goods: document.goods.len(),
            parameters: parameters.len(),
        };
        info!(
            shop_id = %shop_id,
            categories = summary.categories,
            goods = summary.goods,
            parameters = summary.parameters,
            "Catalog imported"
        );
        Ok(summary)
    }

    /// Download a YAML catalog from a supplier and import it.
    ///
    /// At most `max_bytes` are read from the response body.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for non-shop accounts and `Validation` if the
    /// URL is unusable, the download fails, or the body is too large.
    #[instrument(skip(self, user, http), fields(user_id = %user.id))]
    pub async fn import_from_url(
        &self,
        user: &CurrentUser,
        url: &str,
        http: &reqwest::Client,
        max_bytes: usize,
    ) -> Result<ImportSummary> {
        require_shop(user, "import goods")?;
        let url = validate_catalog_url(url)?;

        let text = fetch_catalog(http, url.clone(), max_bytes).await?;
        info!(url = %url, bytes = text.len(), "Fetched supplier catalog");

        self.import(user, &text, ImportSource::url(url.as_str()))
            .await
    }

    /// Shops that currently accept orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_shops(&self) -> Result<Vec<Shop>> {
        Ok(self.repo().list_shops().await?)
    }

    /// All categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.repo().list_categories().await?)
    }

    /// Listings of shops that accept orders, optionally filtered.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_listings(&self, filter: ListingFilter) -> Result<Vec<Listing>> {
        Ok(self.repo().list_listings(filter).await?)
    }

    /// One listing with its parameters.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the listing does not exist or its shop is not
    /// accepting orders.
    pub async fn get_listing(&self, id: ProductInfoId) -> Result<ListingDetail> {
        let repo = self.repo();
        let listing = repo
            .get_listing(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        let parameters = repo.listing_parameters(id).await?;
        Ok(ListingDetail {
            listing,
            parameters,
        })
    }

    /// The caller's own shop and whether it accepts orders.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for non-shop accounts and `NotFound` if the
    /// account has not imported a catalog yet.
    pub async fn get_shop_state(&self, user: &CurrentUser) -> Result<ShopState> {
        require_shop(user, "view shop state")?;
        self.repo()
            .shop_state(user.id)
            .await?
            .ok_or_else(|| DomainError::not_found("shop").into())
    }

    /// Open or close the caller's shop for new basket items.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for non-shop accounts and `NotFound` if the
    /// account has no shop.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn set_shop_state(&self, user: &CurrentUser, accepting: bool) -> Result<ShopState> {
        require_shop(user, "change shop state")?;
        let state = self
            .repo()
            .set_accepting_orders(user.id, accepting)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => DomainError::not_found("shop").into(),
                other => crate::error::AppError::from(other),
            })?;
        info!(shop_id = %state.shop_id, accepting, "Shop state changed");
        Ok(state)
    }
}

/// Parse a supplier URL, accepting only `http` and `https`.
fn validate_catalog_url(raw: &str) -> std::result::Result<Url, DomainError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| DomainError::validation(format!("invalid catalog url: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DomainError::validation(format!(
            "catalog url must use http or https, not {other}"
        ))),
    }
}

/// Download a document, refusing bodies larger than `max_bytes`.
async fn fetch_catalog(
    http: &reqwest::Client,
    url: Url,
    max_bytes: usize,
) -> std::result::Result<String, DomainError> {
    let fetch_failed =
        |e: reqwest::Error| DomainError::validation(format!("could not fetch catalog: {e}"));
    let too_large = || DomainError::validation(format!("catalog exceeds {max_bytes} bytes"));

    let mut response = http
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(fetch_failed)?;

    if response
        .content_length()
        .is_some_and(|len| usize::try_from(len).map_or(true, |len| len > max_bytes))
    {
        return Err(too_large());
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(fetch_failed)? {
        if body.len() + chunk.len() > max_bytes {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }

    String::from_utf8(body).map_err(|_| DomainError::validation("catalog is not valid UTF-8"))
}

impl std::fmt::Display for ImportSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.url, self.filename) {
            (Some(url), _) => write!(f, "url {url}"),
            (None, Some(name)) => write!(f, "file {name}"),
            (None, None) => f.write_str("upload"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_url_requires_http_scheme() {
        assert_eq!(
            validate_catalog_url("https://supplier.example.com/shop1.yaml")
                .unwrap()
                .host_str(),
            Some("supplier.example.com")
        );
        assert!(validate_catalog_url(" http://localhost:8080/goods.yaml ").is_ok());

        let err = validate_catalog_url("file:///etc/passwd").unwrap_err();
        assert!(err.to_string().contains("http or https"));

        let err = validate_catalog_url("not a url").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_import_source_labels() {
        assert_eq!(
            ImportSource::url("https://x.test/a.yaml").to_string(),
            "url https://x.test/a.yaml"
        );
        assert_eq!(
            ImportSource::upload(Some("shop1.yaml")).to_string(),
            "file shop1.yaml"
        );
        assert_eq!(ImportSource::upload(None).to_string(), "upload");
    }
}
