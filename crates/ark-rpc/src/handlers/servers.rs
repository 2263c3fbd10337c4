//! Status, dashboard and settings.

use super::{success, ApiResult};
use crate::server::AppState;
use ark_core::{DashboardStats, ServerSettings, ServerStatus, SettingsPatch};
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn list_servers(State(state): State<Arc<AppState>>) -> Json<Vec<ServerStatus>> {
    Json(state.panel.status_all().await)
}

pub async fn dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardStats> {
    Json(state.panel.dashboard().await)
}

pub async fn server_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> ApiResult<Json<ServerStatus>> {
    Ok(Json(state.panel.status(id).await?))
}

pub async fn get_config(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> ApiResult<Json<ServerSettings>> {
    Ok(Json(state.panel.load_settings(id)?))
}

/// Merge the posted fields over the saved settings. Applies on next start.
pub async fn save_config(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Json(patch): Json<SettingsPatch>,
) -> ApiResult<Json<Value>> {
    let saved = state.panel.save_settings(id, patch)?;
    Ok(success(
        "Settings saved",
        json!({ "settings": saved }),
    ))
}
