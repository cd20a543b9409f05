//! Subscription lifecycle route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::Subscription;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_mutation;

#[derive(Debug, Deserialize)]
pub struct AssignPlanRequest {
    pub plan_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// The subscription that was cancelled; null when none was active.
    pub cancelled: Option<Subscription>,
}

/// The user's active subscription, if any.
///
/// GET /api/admin/v1/users/:id/subscription
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let subscription = state.subscriptions.get_subscription(user_id).await?;
    Ok(Json(SubscriptionResponse { subscription }))
}

/// Every subscription of the user, newest first.
///
/// GET /api/admin/v1/users/:id/subscriptions
pub async fn subscription_history(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Subscription>>, ApiError> {
    Ok(Json(state.subscriptions.history(user_id).await?))
}

/// Move the user onto a plan, cancelling any active subscription.
///
/// POST /api/admin/v1/users/:id/subscription
pub async fn assign_plan(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<AssignPlanRequest>,
) -> Result<(StatusCode, Json<Subscription>), ApiError> {
    let subscription = state
        .subscriptions
        .assign(user_id, request.plan_id)
        .await?;
    record_mutation("subscription", "assign");
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// Cancel the active subscription. Succeeds as a no-op when none exists.
///
/// DELETE /api/admin/v1/users/:id/subscription
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<CancelResponse>, ApiError> {
    let cancelled = state.subscriptions.cancel(user_id).await?;
    if cancelled.is_some() {
        record_mutation("subscription", "cancel");
    }
    Ok(Json(CancelResponse { cancelled }))
}
