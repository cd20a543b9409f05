//! Plan catalog route handlers.
//!
//! Mutations answer with the written plan and the refreshed catalog.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{CreatePlanRequest, Plan, PlanChange, PlanSummary, UpdatePlanRequest};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_mutation;

/// Plans ordered by price with their subscriber counts.
///
/// GET /api/admin/v1/plans
pub async fn list_plans(
    State(state): State<AppState>,
) -> Result<Json<Vec<PlanSummary>>, ApiError> {
    Ok(Json(state.plans.list_plans().await?))
}

/// GET /api/admin/v1/plans/:id
pub async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Plan>, ApiError> {
    Ok(Json(state.plans.get_plan(id).await?))
}

/// POST /api/admin/v1/plans
pub async fn create_plan(
    State(state): State<AppState>,
    Json(request): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<PlanChange>), ApiError> {
    let change = state.plans.create_plan(request).await?;
    record_mutation("plan", "create");
    Ok((StatusCode::CREATED, Json(change)))
}

/// PUT /api/admin/v1/plans/:id
pub async fn update_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePlanRequest>,
) -> Result<Json<PlanChange>, ApiError> {
    let change = state.plans.update_plan(id, request).await?;
    record_mutation("plan", "update");
    Ok(Json(change))
}

/// Delete a plan; 409 while it still has active subscribers.
///
/// DELETE /api/admin/v1/plans/:id
pub async fn delete_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlanChange>, ApiError> {
    let change = state.plans.delete_plan(id).await?;
    record_mutation("plan", "delete");
    Ok(Json(change))
}
