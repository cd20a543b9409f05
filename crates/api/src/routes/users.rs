//! User directory route handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::{ListUsersQuery, Profile, UpdateUserRequest, UserPage, UserStatus};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_mutation;

#[derive(Debug, Deserialize)]
pub struct UserStatusRequest {
    pub status: UserStatus,
}

#[derive(Debug, Deserialize)]
pub struct UserModuleRequest {
    pub enabled: bool,
}

/// Paginated, filtered user listing.
///
/// GET /api/admin/v1/users?page=&page_size=&search=&user_type=&status=
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UserPage>, ApiError> {
    let page = state.users.list_users(&query).await?;
    Ok(Json(page))
}

/// GET /api/admin/v1/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.users.get_user(id).await?))
}

/// Partial profile update.
///
/// PUT /api/admin/v1/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<Profile>, ApiError> {
    let profile = state.users.update_user(id, &request).await?;
    record_mutation("user", "update");
    Ok(Json(profile))
}

/// PUT /api/admin/v1/users/:id/status
pub async fn set_user_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UserStatusRequest>,
) -> Result<Json<Profile>, ApiError> {
    let profile = state.users.set_user_status(id, request.status).await?;
    record_mutation("user", "status");
    Ok(Json(profile))
}

/// Toggle one module for a user.
///
/// PUT /api/admin/v1/users/:id/modules/:slug
pub async fn set_user_module(
    State(state): State<AppState>,
    Path((id, slug)): Path<(Uuid, String)>,
    Json(request): Json<UserModuleRequest>,
) -> Result<Json<Profile>, ApiError> {
    let profile = state
        .users
        .set_user_module(id, &slug, request.enabled)
        .await?;
    record_mutation("user", "module");
    Ok(Json(profile))
}

/// DELETE /api/admin/v1/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.users.delete_user(id).await?;
    record_mutation("user", "delete");
    Ok(StatusCode::NO_CONTENT)
}
