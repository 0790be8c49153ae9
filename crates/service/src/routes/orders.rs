//! Buyer order endpoints.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use ordering_core::{ContactId, OrderId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{OrderDetail, OrderSummary};
use crate::services::OrderService;
use crate::state::AppState;

/// Place-order request body.
#[derive(Debug, Deserialize)]
pub struct PlaceRequest {
    pub order_id: OrderId,
    pub contact_id: ContactId,
}

/// The caller's placed orders.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderSummary>>> {
    Ok(Json(
        OrderService::new(state.pool(), state.notifications())
            .list_orders(&user)
            .await?,
    ))
}

/// Place the caller's basket.
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<PlaceRequest>,
) -> Result<Json<OrderDetail>> {
    Ok(Json(
        OrderService::new(state.pool(), state.notifications())
            .place_order(&user, body.order_id, body.contact_id)
            .await?,
    ))
}

/// One of the caller's orders.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    Ok(Json(
        OrderService::new(state.pool(), state.notifications())
            .get_order(&user, id)
            .await?,
    ))
}
