// crates/server/src/routes/control.rs
//! Training control endpoints.
//!
//! - POST /start-training
//! - POST /stop-training
//! - POST /restart-training
//! - GET  /training/status

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::error::ApiResult;
use crate::jobs::{ControlOutcome, JobStatus};
use crate::state::AppState;

/// POST /start-training - Start a run with the current configuration draft.
///
/// Returns `success: false` when a run is already active, and 422 when the
/// draft is incomplete.
pub async fn start_training(State(state): State<Arc<AppState>>) -> ApiResult<Json<ControlOutcome>> {
    let config = state.config_snapshot();
    let outcome = state.controller.start(&config)?;
    Ok(Json(outcome))
}

/// POST /stop-training - Cancel the active run, if any.
pub async fn stop_training(State(state): State<Arc<AppState>>) -> Json<ControlOutcome> {
    Json(state.controller.stop())
}

/// POST /restart-training - Replace the active run with a fresh one.
///
/// A restart also satisfies an outstanding restart request from the chat.
pub async fn restart_training(State(state): State<Arc<AppState>>) -> ApiResult<Json<ControlOutcome>> {
    let config = state.config_snapshot();
    let outcome = state.controller.restart(&config)?;
    if state.agent.clear_restart_request() {
        tracing::debug!("Cleared operator restart request");
    }
    Ok(Json(outcome))
}

/// GET /training/status - Controller state and observer count.
pub async fn training_status(State(state): State<Arc<AppState>>) -> Json<JobStatus> {
    Json(state.controller.status())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/start-training", post(start_training))
        .route("/stop-training", post(stop_training))
        .route("/restart-training", post(restart_training))
        .route("/training/status", get(training_status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::SyntheticProducer;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use std::time::Duration;
    use tower::ServiceExt;
    use trainview_core::{ConfigPatch, DatasetRef};

    fn app(state: Arc<AppState>) -> Router {
        router().with_state(state)
    }

    fn test_state() -> Arc<AppState> {
        AppState::new(Arc::new(SyntheticProducer::new(Duration::from_millis(20))))
    }

    async fn post_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn configure(state: &AppState, dataset: &std::path::Path) {
        state.update_config(ConfigPatch {
            model_type: Some("resnet50".to_string()),
            epochs: Some(50),
            dataset: Some(DatasetRef {
                path: Some(dataset.display().to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    #[tokio::test]
    async fn test_start_with_default_draft_is_rejected() {
        let state = test_state();
        let (status, body) = post_json(app(state.clone()), "/start-training").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        let fields: Vec<&str> = body["problems"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["dataset", "modelType"]);
        assert_eq!(state.controller.status().state, "idle");
    }

    #[tokio::test]
    async fn test_start_then_start_again() {
        let dataset = tempfile::NamedTempFile::new().unwrap();
        let state = test_state();
        configure(&state, dataset.path());

        let (status, first) = post_json(app(state.clone()), "/start-training").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["success"], true);
        assert_eq!(first["message"], "Training started.");

        let (_, second) = post_json(app(state.clone()), "/start-training").await;
        assert_eq!(second["success"], false);
        assert_eq!(second["message"], "Training already running.");

        state.shutdown();
    }

    #[tokio::test]
    async fn test_stop_and_restart() {
        let dataset = tempfile::NamedTempFile::new().unwrap();
        let state = test_state();
        configure(&state, dataset.path());

        let (_, restarted) = post_json(app(state.clone()), "/restart-training").await;
        assert_eq!(restarted["message"], "Training restarted.");
        assert_eq!(state.controller.status().generation.map(|g| g.0), Some(1));

        let (_, restarted) = post_json(app(state.clone()), "/restart-training").await;
        assert_eq!(restarted["success"], true);
        assert_eq!(state.controller.status().generation.map(|g| g.0), Some(2));

        let (_, stopped) = post_json(app(state.clone()), "/stop-training").await;
        assert_eq!(stopped["message"], "Training stopped.");
        assert_eq!(state.controller.status().state, "idle");
    }

    #[tokio::test]
    async fn test_restart_clears_operator_request() {
        let dataset = tempfile::NamedTempFile::new().unwrap();
        let state = test_state();
        configure(&state, dataset.path());
        state.agent.handle_query("should I restart?");
        assert!(state.agent.restart_requested());

        post_json(app(state.clone()), "/restart-training").await;
        assert!(!state.agent.restart_requested());
        state.shutdown();
    }

    #[tokio::test]
    async fn test_status_when_idle() {
        let state = test_state();
        let response = app(state)
            .oneshot(Request::builder().uri("/training/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["state"], "idle");
        assert!(json["generation"].is_null());
        assert_eq!(json["sessions"], 0);
    }
}
