// crates/server/src/lib.rs
//! Trainview server library.
//!
//! Axum server for the training dashboard: it runs the training job, streams
//! its metrics and advisory notices to every attached dashboard over
//! WebSocket, and answers operator questions.

pub mod error;
pub mod hub;
pub mod jobs;
pub mod metrics;
pub mod routes;
pub mod state;

pub use error::*;
pub use metrics::{init_metrics, render_metrics};
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - Control, config, agent and stream routes
/// - CORS allowing any origin (the dashboard is served separately)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
