// crates/server/src/jobs/mod.rs
//! Training job lifecycle.
//!
//! Provides:
//! - `JobController` - single-flight start/stop/restart with generation tagging
//! - `Producer` - the seam for the long-running computation
//! - `SyntheticProducer` - the default producer emitting a synthetic curve
//! - `JobState` / `JobStatus` - lifecycle state and its reported snapshot

pub mod controller;
pub mod producer;
pub mod types;

pub use controller::JobController;
pub use producer::{Producer, ProducerError, ProducerRun, RecordSink, RunEnd, SyntheticProducer};
pub use types::{ControlOutcome, Forwarded, JobState, JobStatus};
