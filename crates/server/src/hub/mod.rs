// crates/server/src/hub/mod.rs
//! Observer fan-out.
//!
//! Provides:
//! - `Session` - one observer's bounded outbound queue
//! - `ConnectionRegistry` - the set of attached sessions
//! - `Broadcaster` - delivers a message to every session, pruning failures

pub mod broadcaster;
pub mod registry;
pub mod session;

pub use broadcaster::{BroadcastReport, Broadcaster};
pub use registry::ConnectionRegistry;
pub use session::{DeliveryError, Session, SessionId, SessionOutbox, SESSION_BUFFER};
