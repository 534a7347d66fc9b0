// crates/server/src/routes/config.rs
//! Training configuration draft endpoints.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use trainview_core::{ConfigPatch, DatasetRef, TrainingConfig};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct ConfigUpdateResponse {
    pub success: bool,
    pub config: TrainingConfig,
}

/// Body of POST /dataset-location.
#[derive(Debug, Deserialize)]
pub struct DatasetLocationRequest {
    pub path: Option<String>,
    pub name: Option<String>,
    pub size: Option<u64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct DatasetLocationResponse {
    pub path: String,
}

/// GET /config - Current configuration draft.
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<TrainingConfig> {
    Json(state.config_snapshot())
}

/// PUT /config - Merge fields into the draft.
///
/// The draft is not validated here; problems surface when a run is started.
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<ConfigPatch>,
) -> Json<ConfigUpdateResponse> {
    let config = state.update_config(patch);
    tracing::info!(
        model_type = ?config.model_type,
        epochs = ?config.epochs,
        "Training configuration updated"
    );
    Json(ConfigUpdateResponse {
        success: true,
        config,
    })
}

/// POST /dataset-location - Record where the dataset lives.
///
/// Relative paths are resolved against the server's working directory.
pub async fn dataset_location(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DatasetLocationRequest>,
) -> ApiResult<Json<DatasetLocationResponse>> {
    let raw = req
        .path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("path is required".to_string()))?;

    let path = resolve_dataset_path(Path::new(raw))
        .map_err(|e| ApiError::Internal(format!("cannot resolve working directory: {e}")))?;
    let path_str = path.display().to_string();

    let name = req.name.or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
    });
    state.set_dataset(DatasetRef {
        name,
        path: Some(path_str.clone()),
        kind: Some(req.kind.clone().unwrap_or_else(|| "custom".to_string())),
        size: req.size,
        format: req.kind,
    });
    tracing::info!(path = %path_str, "Dataset location set");

    Ok(Json(DatasetLocationResponse { path: path_str }))
}

fn resolve_dataset_path(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/config", get(get_config).put(update_config))
        .route("/dataset-location", post(dataset_location))
}
