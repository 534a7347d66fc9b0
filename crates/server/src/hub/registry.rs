// crates/server/src/hub/registry.rs
//! Set of currently attached observer sessions.

use std::sync::RwLock;

use super::session::{Session, SessionId};

/// Tracks attached sessions in attach order.
///
/// Broadcasts iterate over a [`snapshot`](Self::snapshot) rather than the
/// live set, so attach/detach racing a broadcast neither corrupts the
/// iteration nor delivers twice within one call.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: RwLock<Vec<Session>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session. Attaching the same session twice keeps one entry.
    pub fn attach(&self, session: Session) {
        let id = session.id();
        let label = session.label().to_string();
        let total = match self.sessions.write() {
            Ok(mut sessions) => {
                if !sessions.iter().any(|s| s.id() == id) {
                    sessions.push(session);
                }
                sessions.len()
            }
            Err(e) => {
                tracing::error!("RwLock poisoned attaching session: {e}");
                return;
            }
        };
        crate::metrics::record_sessions(total);
        tracing::info!(session_id = %id, channel = %label, sessions = total, "Observer attached");
    }

    /// Remove a session. Returns whether it was present.
    pub fn detach(&self, id: SessionId) -> bool {
        let (removed, total) = match self.sessions.write() {
            Ok(mut sessions) => {
                let before = sessions.len();
                sessions.retain(|s| s.id() != id);
                (sessions.len() != before, sessions.len())
            }
            Err(e) => {
                tracing::error!("RwLock poisoned detaching session: {e}");
                return false;
            }
        };
        if removed {
            crate::metrics::record_sessions(total);
            tracing::info!(session_id = %id, sessions = total, "Observer detached");
        }
        removed
    }

    /// Point-in-time copy of the attached sessions, oldest first.
    pub fn snapshot(&self) -> Vec<Session> {
        match self.sessions.read() {
            Ok(sessions) => sessions.clone(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading sessions: {e}");
                Vec::new()
            }
        }
    }

    pub fn contains(&self, id: SessionId) -> bool {
        match self.sessions.read() {
            Ok(sessions) => sessions.iter().any(|s| s.id() == id),
            Err(e) => {
                tracing::error!("RwLock poisoned reading sessions: {e}");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        match self.sessions.read() {
            Ok(sessions) => sessions.len(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading sessions: {e}");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_adds_session() {
        let registry = ConnectionRegistry::new();
        let (session, _outbox) = Session::open("train");
        let id = session.id();
        registry.attach(session);
        assert!(registry.contains(id));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn attach_twice_keeps_one_entry() {
        let registry = ConnectionRegistry::new();
        let (session, _outbox) = Session::open("train");
        registry.attach(session.clone());
        registry.attach(session);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn detach_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (session, _outbox) = Session::open("train");
        let id = session.id();
        registry.attach(session);

        assert!(registry.detach(id));
        assert!(!registry.detach(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_preserves_attach_order() {
        let registry = ConnectionRegistry::new();
        let mut ids = Vec::new();
        let mut outboxes = Vec::new();
        for _ in 0..3 {
            let (session, outbox) = Session::open("train");
            ids.push(session.id());
            outboxes.push(outbox);
            registry.attach(session);
        }
        let snapshot: Vec<SessionId> = registry.snapshot().iter().map(|s| s.id()).collect();
        assert_eq!(snapshot, ids);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_detach() {
        let registry = ConnectionRegistry::new();
        let (session, _outbox) = Session::open("train");
        let id = session.id();
        registry.attach(session);

        let snapshot = registry.snapshot();
        registry.detach(id);
        assert_eq!(snapshot.len(), 1);
        assert!(registry.is_empty());
    }
}
