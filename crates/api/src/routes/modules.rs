//! Module catalog route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{
    CreateModuleRequest, ModuleChange, ModuleStatus, ModuleSummary, PlatformModule,
    UpdateModuleRequest,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_mutation;

#[derive(Debug, Deserialize)]
pub struct ModuleStatusRequest {
    pub status: ModuleStatus,
}

/// Modules in display order with their user counts.
///
/// GET /api/admin/v1/modules
pub async fn list_modules(
    State(state): State<AppState>,
) -> Result<Json<Vec<ModuleSummary>>, ApiError> {
    Ok(Json(state.modules.list_modules().await?))
}

/// GET /api/admin/v1/modules/:id
pub async fn get_module(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlatformModule>, ApiError> {
    Ok(Json(state.modules.get_module(id).await?))
}

/// POST /api/admin/v1/modules
pub async fn create_module(
    State(state): State<AppState>,
    Json(request): Json<CreateModuleRequest>,
) -> Result<(StatusCode, Json<ModuleChange>), ApiError> {
    let change = state.modules.create_module(request).await?;
    record_mutation("module", "create");
    Ok((StatusCode::CREATED, Json(change)))
}

/// PUT /api/admin/v1/modules/:id
pub async fn update_module(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateModuleRequest>,
) -> Result<Json<ModuleChange>, ApiError> {
    let change = state.modules.update_module(id, request).await?;
    record_mutation("module", "update");
    Ok(Json(change))
}

/// PUT /api/admin/v1/modules/:id/status
pub async fn set_module_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ModuleStatusRequest>,
) -> Result<Json<ModuleChange>, ApiError> {
    let change = state.modules.set_module_status(id, request.status).await?;
    record_mutation("module", "status");
    Ok(Json(change))
}

/// DELETE /api/admin/v1/modules/:id
pub async fn delete_module(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ModuleChange>, ApiError> {
    let change = state.modules.delete_module(id).await?;
    record_mutation("module", "delete");
    Ok(Json(change))
}
