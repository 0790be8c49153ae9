//! Shop-facing endpoints: catalog refresh, shop state and order fulfilment.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use ordering_core::{DomainError, OrderId, OrderStatus};

use super::catalog::ImportResponse;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{OrderDetail, OrderSummary, ShopState};
use crate::services::{CatalogService, OrderService, WorkflowService};
use crate::state::AppState;

/// Catalog refresh request body.
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub url: String,
}

/// Shop state request body.
#[derive(Debug, Deserialize)]
pub struct StateRequest {
    pub accepting_orders: bool,
}

/// Status change request body.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// Fetch the shop's catalog from `url` and import it.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<UpdateRequest>,
) -> Result<(StatusCode, Json<ImportResponse>)> {
    let summary = CatalogService::new(state.pool())
        .import_from_url(
            &user,
            &body.url,
            state.http(),
            state.config().import_max_bytes,
        )
        .await?;
    Ok(ImportResponse::created(summary))
}

/// Whether the caller's shop accepts orders.
pub async fn state(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ShopState>> {
    Ok(Json(
        CatalogService::new(state.pool())
            .get_shop_state(&user)
            .await?,
    ))
}

/// Open or close the caller's shop.
pub async fn set_state(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<StateRequest>,
) -> Result<Json<ShopState>> {
    Ok(Json(
        CatalogService::new(state.pool())
            .set_shop_state(&user, body.accepting_orders)
            .await?,
    ))
}

/// Placed orders containing the caller's goods.
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderSummary>>> {
    Ok(Json(
        OrderService::new(state.pool(), state.notifications())
            .list_shop_orders(&user)
            .await?,
    ))
}

/// Move an order to another status.
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<OrderDetail>> {
    let status: OrderStatus = body.status.trim().parse().map_err(DomainError::Validation)?;
    Ok(Json(
        WorkflowService::new(state.pool(), state.notifications())
            .update_status(&user, id, status)
            .await?,
    ))
}
