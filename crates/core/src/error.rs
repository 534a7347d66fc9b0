// crates/core/src/error.rs
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single problem found while validating a training configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigProblem {
    /// The field is absent (or empty).
    Missing { field: String, expected: String },
    /// The field is present but its value is unusable.
    Invalid { field: String, reason: String },
}

impl ConfigProblem {
    pub fn missing(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::Missing {
            field: field.into(),
            expected: expected.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            Self::Missing { field, .. } | Self::Invalid { field, .. } => field,
        }
    }
}

impl fmt::Display for ConfigProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { field, expected } => write!(f, "{field} ({expected})"),
            Self::Invalid { field, reason } => write!(f, "{field}: {reason}"),
        }
    }
}

/// Errors produced when a training configuration cannot be used to start a run.
///
/// Validation never stops at the first problem; every missing or invalid
/// field is collected so the caller can fix them in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing or invalid config values: {}", join_problems(.0))]
    Incomplete(Vec<ConfigProblem>),
}

impl ConfigError {
    pub fn problems(&self) -> &[ConfigProblem] {
        match self {
            Self::Incomplete(problems) => problems,
        }
    }
}

fn join_problems(problems: &[ConfigProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
