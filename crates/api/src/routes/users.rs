//! Account administration and address-book route handlers.
//!
//! Listing and deletion are admin-only; fetching and updating a single
//! account are allowed for administrators or the account itself. Address
//! management is own-profile only, checked through the `Ownable` capability.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use harvesthub_core::{AddressId, Role, UserId};

use crate::db::users::{NewAddress, UserRepository};
use crate::error::{ApiError, Result};
use crate::middleware::{RequireAdmin, RequireAuth, require_owner_or_admin};
use crate::models::user::{Account, AddressKind};
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

/// Pagination and filtering for the account listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub role: Option<Role>,
}

/// Administrative account update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserBody {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Address create/replace request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBody {
    #[serde(default)]
    pub kind: AddressKind,
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressBody {
    fn validate(&self) -> Result<NewAddress> {
        if self.street.trim().is_empty() {
            return Err(ApiError::Validation("Street is required".to_owned()));
        }
        if self.city.trim().is_empty() {
            return Err(ApiError::Validation("City is required".to_owned()));
        }
        if self.state.trim().is_empty() {
            return Err(ApiError::Validation("State is required".to_owned()));
        }
        if !is_valid_pincode(&self.pincode) {
            return Err(ApiError::Validation(
                "Please provide a valid pincode".to_owned(),
            ));
        }

        Ok(NewAddress {
            kind: self.kind,
            street: self.street.trim().to_owned(),
            city: self.city.trim().to_owned(),
            state: self.state.trim().to_owned(),
            pincode: self.pincode.clone(),
            is_default: self.is_default,
        })
    }
}

/// Six digits, not starting with zero.
fn is_valid_pincode(pincode: &str) -> bool {
    pincode.len() == 6
        && pincode.bytes().all(|b| b.is_ascii_digit())
        && !pincode.starts_with('0')
}

// =============================================================================
// Account handlers
// =============================================================================

/// `GET /api/users` (admin)
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let users = UserRepository::new(state.pool());
    let (accounts, total) = users.list(page, limit, query.role).await?;

    let total_pages = (total + limit - 1) / limit;
    let summaries: Vec<_> = accounts.iter().map(Account::summary).collect();

    Ok(Json(json!({
        "success": true,
        "message": "OK",
        "data": {
            "users": summaries,
            "pagination": {
                "page": page,
                "limit": limit,
                "total": total,
                "totalPages": total_pages,
            },
        },
    })))
}

/// `GET /api/users/{id}` (admin or own profile)
pub async fn get_user(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse> {
    if !principal.role.is_admin() && principal.id != id {
        return Err(ApiError::Forbidden(principal.role));
    }

    let users = UserRepository::new(state.pool());
    let account = users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_owned()))?;
    let addresses = users.addresses(id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "OK",
        "data": { "user": account.summary(), "addresses": addresses },
    })))
}

/// `PUT /api/users/{id}` (admin)
///
/// Role and active-flag changes are administrative actions; profile fields
/// go through `PUT /api/auth/profile` instead.
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(body): Json<UpdateUserBody>,
) -> Result<impl IntoResponse> {
    if body.role.is_none() && body.is_active.is_none() {
        return Err(ApiError::BadRequest("Nothing to update".to_owned()));
    }

    let users = UserRepository::new(state.pool());
    let account = users
        .update_admin_fields(id, body.role, body.is_active)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => {
                ApiError::NotFound("User not found".to_owned())
            }
            other => ApiError::Database(other),
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "User updated successfully",
        "data": { "user": account.summary() },
    })))
}

/// `DELETE /api/users/{id}` (admin)
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse> {
    if admin.id == id {
        return Err(ApiError::BadRequest(
            "You cannot delete your own account".to_owned(),
        ));
    }

    let users = UserRepository::new(state.pool());
    if !users.delete(id).await? {
        return Err(ApiError::NotFound("User not found".to_owned()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "User deleted successfully",
    })))
}

// =============================================================================
// Address handlers
// =============================================================================

/// `POST /api/users/{id}/addresses` (own profile)
pub async fn add_address(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<UserId>,
    Json(body): Json<AddressBody>,
) -> Result<impl IntoResponse> {
    if principal.id != id {
        return Err(ApiError::NotOwner);
    }

    let new_address = body.validate()?;
    let users = UserRepository::new(state.pool());
    users.add_address(id, &new_address).await?;
    let addresses = users.addresses(id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Address added successfully",
            "data": { "addresses": addresses },
        })),
    ))
}

/// `PUT /api/users/{id}/addresses/{addressId}` (own profile)
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path((id, address_id)): Path<(UserId, AddressId)>,
    Json(body): Json<AddressBody>,
) -> Result<impl IntoResponse> {
    if principal.id != id {
        return Err(ApiError::NotOwner);
    }

    let new_address = body.validate()?;
    let users = UserRepository::new(state.pool());
    let address = users
        .find_address(address_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Address not found".to_owned()))?;
    require_owner_or_admin(&address, &principal)?;

    users.update_address(address_id, &new_address).await?;
    let addresses = users.addresses(id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Address updated successfully",
        "data": { "addresses": addresses },
    })))
}

/// `DELETE /api/users/{id}/addresses/{addressId}` (own profile)
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path((id, address_id)): Path<(UserId, AddressId)>,
) -> Result<impl IntoResponse> {
    if principal.id != id {
        return Err(ApiError::NotOwner);
    }

    let users = UserRepository::new(state.pool());
    let address = users
        .find_address(address_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Address not found".to_owned()))?;
    require_owner_or_admin(&address, &principal)?;

    users.delete_address(address_id).await?;
    let addresses = users.addresses(id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Address deleted successfully",
        "data": { "addresses": addresses },
    })))
}
