// crates/core/src/types.rs
//! Wire-level and domain types shared by the watcher, the controller and
//! the observer stream.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier for one run of the background producer.
///
/// Generations only ever grow; `0` is never handed out so it can stand for
/// "no run" in atomics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One unit of training progress emitted by the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub epoch: u32,
    pub loss: f64,
    pub accuracy: f64,
    /// Seconds since the Unix epoch at creation.
    pub timestamp: f64,
    pub note: Option<String>,
}

impl MeasurementRecord {
    pub fn new(epoch: u32, loss: f64, accuracy: f64) -> Self {
        Self {
            epoch,
            loss,
            accuracy,
            timestamp: unix_seconds(Utc::now()),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// A record together with the generation that produced it.
///
/// The generation travels next to the record rather than inside it, so the
/// record stays identical to what observers receive.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedRecord {
    pub generation: Generation,
    pub record: MeasurementRecord,
}

/// How urgent an advisory notice is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hint produced by the watcher from recent measurement history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryNotice {
    pub severity: Severity,
    pub content: String,
    /// Creation time in Unix milliseconds.
    pub id: String,
    /// Creation time in fractional Unix seconds.
    pub timestamp: String,
}

impl AdvisoryNotice {
    pub fn new(severity: Severity, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            severity,
            content: content.into(),
            id: now.timestamp_millis().to_string(),
            timestamp: unix_seconds(now).to_string(),
        }
    }
}

/// Messages fanned out to every observer on the training stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum StreamMessage {
    Metrics(MeasurementRecord),
    Tip(AdvisoryNotice),
}

impl StreamMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            StreamMessage::Metrics(_) => "metrics",
            StreamMessage::Tip(_) => "tip",
        }
    }
}

/// Reply frame sent on the agent chat socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub id: String,
    pub sender: String,
    pub content: String,
    pub timestamp: String,
}

impl ChatReply {
    pub fn from_agent(content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: now.timestamp_millis().to_string(),
            sender: "agent".to_string(),
            content: content.into(),
            timestamp: unix_seconds(now).to_string(),
        }
    }
}

fn unix_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}
