//! Contact and address endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use ordering_core::AddressId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Address, AddressInput, Contact, ContactDetail, ContactInput};
use crate::services::ContactService;
use crate::state::AppState;

/// The caller's contact with its address.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ContactDetail>> {
    Ok(Json(
        ContactService::new(state.pool()).get_contact(&user).await?,
    ))
}

/// Create the caller's contact.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<ContactInput>,
) -> Result<(StatusCode, Json<Contact>)> {
    let contact = ContactService::new(state.pool())
        .set_contact(&user, body)
        .await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

/// Replace the caller's contact.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<ContactInput>,
) -> Result<Json<Contact>> {
    Ok(Json(
        ContactService::new(state.pool())
            .update_contact(&user, body)
            .await?,
    ))
}

/// Delete the caller's contact.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<StatusCode> {
    ContactService::new(state.pool())
        .delete_contact(&user)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's addresses.
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    Ok(Json(
        ContactService::new(state.pool())
            .list_addresses(&user)
            .await?,
    ))
}

/// Save a new address.
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AddressInput>,
) -> Result<(StatusCode, Json<Address>)> {
    let address = ContactService::new(state.pool())
        .add_address(&user, body)
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// Replace an address.
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Json(body): Json<AddressInput>,
) -> Result<Json<Address>> {
    Ok(Json(
        ContactService::new(state.pool())
            .update_address(&user, id, body)
            .await?,
    ))
}

/// Delete an address.
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    ContactService::new(state.pool())
        .delete_address(&user, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
