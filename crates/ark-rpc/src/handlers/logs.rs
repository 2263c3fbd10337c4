//! Log reads.

use super::ApiResult;
use crate::server::AppState;
use ark_core::config::LogConfig;
use ark_core::{ArkError, LogFilter, LogQuery};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct LogParams {
    search: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    /// Non-numeric values fall back to the default.
    lines: Option<String>,
}

impl LogParams {
    fn to_query(&self) -> LogQuery {
        LogQuery {
            filter: LogFilter::from_query(
                self.search.as_deref(),
                self.start_date.as_deref(),
                self.end_date.as_deref(),
            ),
            limit: self
                .lines
                .as_deref()
                .and_then(|l| l.trim().parse().ok())
                .unwrap_or(LogConfig::DEFAULT_TAIL_LINES),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SpecificLogParams {
    file: Option<String>,
}

fn logs_body(lines: Vec<String>) -> Json<Value> {
    Json(json!({"status": "success", "logs": lines.join("\n")}))
}

pub async fn server_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Query(params): Query<LogParams>,
) -> ApiResult<Json<Value>> {
    Ok(logs_body(state.panel.server_logs(id, &params.to_query())?))
}

pub async fn install_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> ApiResult<Json<Value>> {
    Ok(logs_body(state.panel.install_logs(id)?))
}

pub async fn update_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> ApiResult<Json<Value>> {
    Ok(logs_body(state.panel.update_logs(id)?))
}

pub async fn specific_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Query(params): Query<SpecificLogParams>,
) -> ApiResult<Json<Value>> {
    let file = params.file.ok_or_else(|| ArkError::Validation {
        field: "file".to_string(),
        message: "file name required".to_string(),
    })?;
    Ok(logs_body(state.panel.specific_log(id, &file)?))
}

pub async fn log_files(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> ApiResult<Json<Value>> {
    let files = state.panel.available_logs(id)?;
    Ok(Json(json!({"status": "success", "files": files})))
}

pub async fn installation_logs(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    Ok(logs_body(state.panel.installation_log()?))
}
