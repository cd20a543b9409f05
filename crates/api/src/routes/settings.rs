//! Settings route handlers.
//!
//! Edits are staged in the shared pending overlay and only persisted by
//! `POST /settings/commit`.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::{SettingValue, SettingView};
use domain::services::SettingsStore;
use domain::AdminError;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_settings_committed;

#[derive(Debug, Deserialize)]
pub struct StageChangeRequest {
    pub value: SettingValue,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub categories: BTreeMap<String, Vec<SettingView>>,
    pub pending_keys: Vec<String>,
    pub has_pending_changes: bool,
    pub saved: bool,
}

impl SettingsResponse {
    fn from_store(settings: &SettingsStore) -> Self {
        Self {
            categories: settings.by_category(),
            pending_keys: settings
                .pending_keys()
                .into_iter()
                .map(str::to_string)
                .collect(),
            has_pending_changes: settings.has_pending_changes(),
            saved: settings.is_saved(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DiscardResponse {
    pub discarded: bool,
    pub settings: SettingsResponse,
}

#[derive(Debug, Serialize)]
pub struct CommitResponse {
    pub persisted: Vec<String>,
    pub settings: SettingsResponse,
}

/// Settings grouped by category with effective values.
///
/// GET /api/admin/v1/settings
pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    let settings = state.settings.lock().await;
    Json(SettingsResponse::from_store(&settings))
}

/// Stage a value for a key without persisting it.
///
/// PUT /api/admin/v1/settings/:key
pub async fn stage_change(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(request): Json<StageChangeRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let mut settings = state.settings.lock().await;
    settings.set_change(&key, request.value)?;
    Ok(Json(SettingsResponse::from_store(&settings)))
}

/// Drop the pending edit for a key.
///
/// DELETE /api/admin/v1/settings/:key
pub async fn discard_change(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DiscardResponse>, ApiError> {
    let mut settings = state.settings.lock().await;
    if settings.get(&key).is_none() {
        return Err(AdminError::not_found("Setting", &key).into());
    }
    let discarded = settings.discard(&key);
    Ok(Json(DiscardResponse {
        discarded,
        settings: SettingsResponse::from_store(&settings),
    }))
}

/// Drop every pending edit.
///
/// POST /api/admin/v1/settings/discard
pub async fn discard_all(State(state): State<AppState>) -> Json<SettingsResponse> {
    let mut settings = state.settings.lock().await;
    settings.discard_all();
    Json(SettingsResponse::from_store(&settings))
}

/// Persist every pending edit.
///
/// On a partial failure the response lists the keys that were saved; the
/// rest stay pending.
///
/// POST /api/admin/v1/settings/commit
pub async fn commit_changes(
    State(state): State<AppState>,
) -> Result<Json<CommitResponse>, ApiError> {
    let mut settings = state.settings.lock().await;
    let result = settings.commit().await;
    let persisted = match result {
        Ok(persisted) => persisted,
        Err(err) => {
            record_settings_committed(err.persisted.len());
            return Err(err.into());
        }
    };

    record_settings_committed(persisted.len());
    Ok(Json(CommitResponse {
        persisted,
        settings: SettingsResponse::from_store(&settings),
    }))
}

/// Re-read committed values; pending edits are kept.
///
/// POST /api/admin/v1/settings/reload
pub async fn reload_settings(
    State(state): State<AppState>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let mut settings = state.settings.lock().await;
    settings.reload().await?;
    Ok(Json(SettingsResponse::from_store(&settings)))
}
