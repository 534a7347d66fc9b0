//! Route handlers for the trainview server.

pub mod agent;
pub mod config;
pub mod control;
pub mod health;
pub mod metrics;
pub mod stream;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router.
///
/// Routes sit at the root; the dashboard calls them without a prefix.
///
/// - GET  / - Banner
/// - GET  /health - Health check
/// - POST /start-training - Start a run with the current draft
/// - POST /stop-training - Cancel the active run
/// - POST /restart-training - Replace the active run
/// - GET  /training/status - Controller state and observer count
/// - GET  /config - Current configuration draft
/// - PUT  /config - Merge fields into the draft
/// - POST /dataset-location - Set the dataset in the draft
/// - POST /agent-chat - Ask the training agent a question
/// - GET  /agent/summary - Progress summary of the current generation
/// - WS   /ws/train - Metrics and advisory stream
/// - WS   /ws/agent - Structured chat
/// - WS   /ws/chat - Plain-text chat
/// - GET  /metrics - Prometheus metrics
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(control::router())
        .merge(config::router())
        .merge(agent::router())
        .merge(stream::router())
        .merge(metrics::router())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::SyntheticProducer;

    #[tokio::test]
    async fn test_api_routes_creation() {
        let state = AppState::new(Arc::new(SyntheticProducer::default()));
        let _router = api_routes(state);
    }
}
