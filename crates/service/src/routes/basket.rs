//! Buyer basket endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use ordering_core::{OrderId, OrderItemId, ProductInfoId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{BasketView, OrderLine};
use crate::services::BasketService;
use crate::state::AppState;

/// Add-to-basket request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_info_id: ProductInfoId,
    pub quantity: i32,
}

/// Quantity change request body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

/// The caller's open basket.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<BasketView>> {
    Ok(Json(BasketService::new(state.pool()).get_basket(&user).await?))
}

/// Add a listing to the basket, replacing the quantity if already present.
pub async fn add_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<OrderLine>> {
    Ok(Json(
        BasketService::new(state.pool())
            .add_or_update_line_item(&user, body.product_info_id, body.quantity)
            .await?,
    ))
}

/// Change the quantity of a basket line item.
pub async fn update_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((order_id, item_id)): Path<(OrderId, OrderItemId)>,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<OrderLine>> {
    Ok(Json(
        BasketService::new(state.pool())
            .update_line_item(&user, order_id, item_id, body.quantity)
            .await?,
    ))
}

/// Remove a basket line item.
pub async fn remove_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((order_id, item_id)): Path<(OrderId, OrderItemId)>,
) -> Result<StatusCode> {
    BasketService::new(state.pool())
        .remove_line_item(&user, order_id, item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
