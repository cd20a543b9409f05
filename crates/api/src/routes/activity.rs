//! Recent activity feed.

use axum::{extract::State, Json};
use domain::models::ActivityItem;
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub items: Vec<ActivityItem>,
}

/// Newest sign-ups and orders merged into one timeline.
///
/// GET /api/admin/v1/activity
pub async fn recent_activity(
    State(state): State<AppState>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let items = state.activity.recent().await?;
    Ok(Json(ActivityResponse { items }))
}
