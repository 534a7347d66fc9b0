// crates/server/src/hub/broadcaster.rs
//! Fan-out of stream messages to every attached observer.

use std::sync::Arc;

use trainview_core::StreamMessage;

use super::registry::ConnectionRegistry;
use super::session::{DeliveryError, SessionId};

/// Outcome of one broadcast call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub pruned: Vec<SessionId>,
}

/// Delivers messages to every session in the registry.
///
/// Delivery is best-effort: a session that cannot take the frame is
/// detached once the pass over the snapshot is finished, and the remaining
/// sessions still receive the message.
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Encode `message` once and send it to every attached session.
    pub fn broadcast(&self, message: &StreamMessage) -> BroadcastReport {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(kind = message.kind(), error = %e, "Failed to encode stream message");
                return BroadcastReport::default();
            }
        };
        let report = self.broadcast_frame(&frame);
        crate::metrics::record_broadcast(message.kind(), report.delivered);
        report
    }

    /// Send an already-encoded frame to every attached session.
    pub fn broadcast_frame(&self, frame: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut failed: Vec<DeliveryError> = Vec::new();

        for session in self.registry.snapshot() {
            match session.send(frame) {
                Ok(()) => report.delivered += 1,
                Err(e) => failed.push(e),
            }
        }

        for err in failed {
            tracing::warn!(session_id = %err.session(), error = %err, "Delivery failed, pruning observer");
            crate::metrics::record_delivery_failure(&err);
            self.registry.detach(err.session());
            report.pruned.push(err.session());
        }

        report
    }
}
