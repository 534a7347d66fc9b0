// crates/core/src/query.rs
//! Keyword-based answers for the operator chat.

use std::sync::atomic::{AtomicBool, Ordering};

pub const ANSWER_ACCURACY: &str = "Accuracy issues may relate to model complexity or dataset imbalance.";
pub const ANSWER_LOSS: &str = "The loss may be high due to learning rate or insufficient training.";
pub const ANSWER_RESTART: &str = "Agent recommends restarting training due to poor performance.";

/// Answers free-text operator questions.
///
/// Matching is a case-insensitive substring search in a fixed priority
/// order (`accuracy`, then `loss`, then `restart`); only the first hit is
/// acted on. Asking about a restart raises a flag that stays set until
/// [`QueryHandler::clear_restart_request`] is called.
#[derive(Debug, Default)]
pub struct QueryHandler {
    restart_requested: AtomicBool,
}

impl QueryHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_query(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        if lowered.contains("accuracy") {
            ANSWER_ACCURACY.to_string()
        } else if lowered.contains("loss") {
            ANSWER_LOSS.to_string()
        } else if lowered.contains("restart") {
            self.restart_requested.store(true, Ordering::Relaxed);
            tracing::info!("Operator asked about restarting training");
            ANSWER_RESTART.to_string()
        } else {
            format!("Training Agent received: {text}")
        }
    }

    pub fn restart_requested(&self) -> bool {
        self.restart_requested.load(Ordering::Relaxed)
    }

    /// Clear the restart flag, returning whether it was set.
    pub fn clear_restart_request(&self) -> bool {
        self.restart_requested.swap(false, Ordering::Relaxed)
    }
}
