// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use trainview_core::{ConfigPatch, DatasetRef, QueryHandler, TrainingConfig};

use crate::hub::{Broadcaster, ConnectionRegistry};
use crate::jobs::{JobController, Producer};

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Observers attached to the training stream.
    pub registry: Arc<ConnectionRegistry>,
    /// Fan-out over `registry`, shared with the controller.
    pub broadcaster: Arc<Broadcaster>,
    /// Lifecycle of the training job.
    pub controller: Arc<JobController>,
    /// Editable training configuration draft. Validated at start/restart.
    pub config: RwLock<TrainingConfig>,
    /// Operator chat.
    pub agent: QueryHandler,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(producer: Arc<dyn Producer>) -> Arc<Self> {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&registry)));
        let controller = JobController::new(Arc::clone(&broadcaster), producer);
        Arc::new(Self {
            start_time: Instant::now(),
            registry,
            broadcaster,
            controller,
            config: RwLock::new(TrainingConfig::default()),
            agent: QueryHandler::new(),
        })
    }

    /// Get server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Copy of the current configuration draft.
    pub fn config_snapshot(&self) -> TrainingConfig {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading config: {e}");
                TrainingConfig::default()
            }
        }
    }

    /// Merge a partial update into the draft and return the result.
    pub fn update_config(&self, patch: ConfigPatch) -> TrainingConfig {
        match self.config.write() {
            Ok(mut config) => {
                config.apply(patch);
                config.clone()
            }
            Err(e) => {
                tracing::error!("RwLock poisoned updating config: {e}");
                TrainingConfig::default()
            }
        }
    }

    pub fn set_dataset(&self, dataset: DatasetRef) {
        match self.config.write() {
            Ok(mut config) => config.dataset = Some(dataset),
            Err(e) => tracing::error!("RwLock poisoned setting dataset: {e}"),
        }
    }

    /// Cancel the active run and drop every observer.
    pub fn shutdown(&self) {
        self.controller.shutdown();
        for session in self.registry.snapshot() {
            self.registry.detach(session.id());
        }
        tracing::info!("Application state shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::Session;
    use crate::jobs::SyntheticProducer;

    fn state() -> Arc<AppState> {
        AppState::new(Arc::new(SyntheticProducer::default()))
    }

    #[test]
    fn test_new_state_has_default_draft() {
        let state = state();
        let config = state.config_snapshot();
        assert_eq!(config.epochs, Some(100));
        assert_eq!(config.model_type, None);
        assert!(state.registry.is_empty());
    }

    #[test]
    fn test_update_config_merges() {
        let state = state();
        let updated = state.update_config(ConfigPatch {
            epochs: Some(5),
            model_type: Some("gpt2".to_string()),
            ..Default::default()
        });
        assert_eq!(updated.epochs, Some(5));
        assert_eq!(updated.batch_size, Some(32));
        assert_eq!(state.config_snapshot().model_type.as_deref(), Some("gpt2"));
    }

    #[tokio::test]
    async fn test_shutdown_detaches_observers() {
        let state = state();
        let (session, mut outbox) = Session::open("train");
        state.registry.attach(session);

        state.shutdown();
        assert!(state.registry.is_empty());
        // Dropping the last sender ends the observer's outbox.
        assert!(outbox.recv().await.is_none());
    }
}
