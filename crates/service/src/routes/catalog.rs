//! Catalog browsing and catalog upload.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    http::StatusCode,
};
use serde::Serialize;

use ordering_core::ProductInfoId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Category, ImportSummary, Listing, ListingDetail, ListingFilter, Shop};
use crate::services::{CatalogService, ImportSource};
use crate::state::AppState;

/// Name of the multipart field carrying the catalog.
const FILE_FIELD: &str = "file";

/// Body returned after a successful import.
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub summary: ImportSummary,
}

impl ImportResponse {
    /// `201 Created` with the import summary.
    #[must_use]
    pub const fn created(summary: ImportSummary) -> (StatusCode, Json<Self>) {
        (
            StatusCode::CREATED,
            Json(Self {
                status: "success",
                summary,
            }),
        )
    }
}

/// Shops accepting orders.
pub async fn shops(State(state): State<AppState>) -> Result<Json<Vec<Shop>>> {
    Ok(Json(CatalogService::new(state.pool()).list_shops().await?))
}

/// All categories.
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(
        CatalogService::new(state.pool()).list_categories().await?,
    ))
}

/// Listings, optionally filtered by shop and category.
pub async fn products(
    State(state): State<AppState>,
    Query(filter): Query<ListingFilter>,
) -> Result<Json<Vec<Listing>>> {
    Ok(Json(
        CatalogService::new(state.pool())
            .list_listings(filter)
            .await?,
    ))
}

/// One listing with its parameters.
pub async fn product(
    State(state): State<AppState>,
    Path(id): Path<ProductInfoId>,
) -> Result<Json<ListingDetail>> {
    Ok(Json(CatalogService::new(state.pool()).get_listing(id).await?))
}

/// Import the YAML catalog uploaded in the `file` field.
pub async fn import_goods(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImportResponse>)> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_owned);
        let text = field.text().await.map_err(multipart_error)?;
        upload = Some((filename, text));
        break;
    }

    let (filename, text) = upload.ok_or_else(|| {
        AppError::BadRequest(format!("missing multipart field \"{FILE_FIELD}\""))
    })?;

    let summary = CatalogService::new(state.pool())
        .import(&user, &text, ImportSource::upload(filename.as_deref()))
        .await?;
    Ok(ImportResponse::created(summary))
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}
