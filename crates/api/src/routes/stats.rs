//! Dashboard statistics.

use axum::{extract::State, Json};
use domain::models::AdminStatsSnapshot;

use crate::app::AppState;
use crate::error::ApiError;

/// Current dashboard counters.
///
/// GET /api/admin/v1/stats
pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<AdminStatsSnapshot>, ApiError> {
    let snapshot = state.stats.snapshot().await?;
    Ok(Json(snapshot))
}
