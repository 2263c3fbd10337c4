//! Install, update, uninstall, start and stop.
//!
//! Installer operations run on a spawned task and answer `202 Accepted`
//! once preconditions pass; progress is read from the install/update logs.
//! A second installer operation on the same server gets `409`.

use super::{success, ApiError, ApiResult};
use crate::server::AppState;
use ark_core::{ArkError, InstallationState, ServerDefinition};
use ark_installer::Operation;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Default, Deserialize)]
pub struct BranchRequest {
    #[serde(default)]
    branch: Option<String>,
}

fn requested_branch(body: Option<Json<BranchRequest>>) -> Option<String> {
    body.and_then(|Json(req)| req.branch)
}

/// Check preconditions, claim the server and run `operation` in the
/// background.
fn spawn_operation(
    state: &Arc<AppState>,
    id: u32,
    operation: Operation,
    branch: Option<String>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let def: ServerDefinition = state.panel.server(id)?.clone();
    let guard = state.try_begin(id).ok_or_else(|| ApiError::busy(id))?;

    let installed = InstallationState::detect(&def).is_installed();
    match operation {
        Operation::Install if installed => return Err(ArkError::AlreadyInstalled { id }.into()),
        Operation::Update if !installed => return Err(ArkError::NotInstalled { id }.into()),
        _ => {}
    }

    let installer = state.installer.clone();
    tokio::spawn(async move {
        let _guard = guard;
        let branch = branch.as_deref();
        let result = match operation {
            Operation::Install => installer.install(&def, branch).await.map(|o| o.lines),
            Operation::ForceInstall => installer.force_install(&def, branch).await.map(|o| o.lines),
            Operation::Update => installer.update(&def, branch).await.map(|o| o.lines),
            Operation::Uninstall => installer.uninstall(&def).await.map(|r| r.steps.len()),
        };
        match result {
            Ok(_) => info!("Server {} {} finished", def.id, operation),
            Err(e) => error!("Server {} {} failed: {}", def.id, operation, e),
        }
    });

    info!("Server {} {} started", id, operation);
    Ok((
        StatusCode::ACCEPTED,
        success(
            format!("{} started for server {}", operation, id),
            json!({ "operation": operation }),
        ),
    ))
}

pub async fn install(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    body: Option<Json<BranchRequest>>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    spawn_operation(&state, id, Operation::Install, requested_branch(body))
}

pub async fn force_install(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    body: Option<Json<BranchRequest>>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    spawn_operation(&state, id, Operation::ForceInstall, requested_branch(body))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    body: Option<Json<BranchRequest>>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    spawn_operation(&state, id, Operation::Update, requested_branch(body))
}

pub async fn uninstall(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    spawn_operation(&state, id, Operation::Uninstall, None)
}

pub async fn start(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> ApiResult<Json<Value>> {
    state.panel.server(id)?;
    if state.is_busy(id) {
        return Err(ApiError::busy(id));
    }

    let panel = state.panel.clone();
    let launched = tokio::task::spawn_blocking(move || panel.start(id))
        .await
        .map_err(|e| ArkError::Other(format!("start task failed: {}", e)))??;
    Ok(success(
        "Server started",
        json!({ "pid": launched.pid, "logPath": launched.log_path }),
    ))
}

pub async fn stop(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> ApiResult<Json<Value>> {
    state.panel.server(id)?;

    let panel = state.panel.clone();
    let stopped = tokio::task::spawn_blocking(move || panel.stop(id))
        .await
        .map_err(|e| ArkError::Other(format!("stop task failed: {}", e)))??;
    Ok(success("Server stopped", json!({ "stopped": stopped })))
}
