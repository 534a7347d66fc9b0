// crates/core/src/config.rs
//! Training configuration: the editable draft and the validated bundle a
//! producer run is started with.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigProblem};

/// Model architectures a run can be started with.
pub const KNOWN_MODEL_TYPES: &[&str] = &["resnet50", "bert-base-uncased", "gpt2", "vit-base", "custom"];

/// Dataset reference as reported by the dashboard's file picker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub format: Option<String>,
}

/// Editable training configuration.
///
/// Every field is optional so partially filled drafts can be stored and
/// shown back to the operator; [`TrainingConfig::validate`] decides whether
/// the draft is good enough to start a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingConfig {
    pub learning_rate: Option<f64>,
    pub batch_size: Option<u32>,
    pub epochs: Option<u32>,
    pub optimizer: Option<String>,
    pub model_type: Option<String>,
    pub model_name: Option<String>,
    pub dataset: Option<DatasetRef>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: Some(0.001),
            batch_size: Some(32),
            epochs: Some(100),
            optimizer: Some("adam".to_string()),
            model_type: None,
            model_name: Some("default".to_string()),
            dataset: None,
        }
    }
}

/// Partial update for [`TrainingConfig`]. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    pub learning_rate: Option<f64>,
    pub batch_size: Option<u32>,
    pub epochs: Option<u32>,
    pub optimizer: Option<String>,
    pub model_type: Option<String>,
    pub model_name: Option<String>,
    pub dataset: Option<DatasetRef>,
}

impl TrainingConfig {
    /// Merge a partial update into this draft.
    pub fn apply(&mut self, patch: ConfigPatch) {
        if patch.learning_rate.is_some() {
            self.learning_rate = patch.learning_rate;
        }
        if patch.batch_size.is_some() {
            self.batch_size = patch.batch_size;
        }
        if patch.epochs.is_some() {
            self.epochs = patch.epochs;
        }
        if patch.optimizer.is_some() {
            self.optimizer = patch.optimizer;
        }
        if patch.model_type.is_some() {
            self.model_type = patch.model_type;
        }
        if patch.model_name.is_some() {
            self.model_name = patch.model_name;
        }
        if patch.dataset.is_some() {
            self.dataset = patch.dataset;
        }
    }

    /// Check the draft and produce the bundle a producer run needs.
    ///
    /// All problems are collected before returning.
    pub fn validate(&self) -> Result<RunConfig, ConfigError> {
        let mut problems = Vec::new();

        let dataset_path = self
            .dataset
            .as_ref()
            .and_then(|d| d.path.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty());
        if dataset_path.is_none() {
            problems.push(ConfigProblem::missing("dataset", "object with a path field"));
        }

        match self.epochs {
            None => problems.push(ConfigProblem::missing("epochs", "int")),
            Some(0) => problems.push(ConfigProblem::invalid("epochs", "must be at least 1")),
            Some(_) => {}
        }

        match self.batch_size {
            None => problems.push(ConfigProblem::missing("batchSize", "int")),
            Some(0) => problems.push(ConfigProblem::invalid("batchSize", "must be at least 1")),
            Some(_) => {}
        }

        match self.learning_rate {
            None => problems.push(ConfigProblem::missing("learningRate", "float")),
            Some(lr) if !lr.is_finite() || lr <= 0.0 => problems.push(ConfigProblem::invalid(
                "learningRate",
                "must be a positive number",
            )),
            Some(_) => {}
        }

        let optimizer = non_blank(self.optimizer.as_deref());
        if optimizer.is_none() {
            problems.push(ConfigProblem::missing("optimizer", "str"));
        }

        let model_type = non_blank(self.model_type.as_deref());
        let model_name = non_blank(self.model_name.as_deref());
        match model_type {
            None => problems.push(ConfigProblem::missing("modelType", "str")),
            Some(t) if !KNOWN_MODEL_TYPES.contains(&t) => problems.push(ConfigProblem::invalid(
                "modelType",
                format!("unknown model type '{t}' (expected one of {})", KNOWN_MODEL_TYPES.join(", ")),
            )),
            Some("custom") if model_name.is_none() => problems.push(ConfigProblem::missing(
                "modelName",
                "str, required if modelType is \"custom\"",
            )),
            Some(_) => {}
        }

        if !problems.is_empty() {
            return Err(ConfigError::Incomplete(problems));
        }

        // Every Option below was checked above.
        match (dataset_path, self.epochs, self.batch_size, self.learning_rate, optimizer, model_type) {
            (Some(path), Some(epochs), Some(batch_size), Some(learning_rate), Some(optimizer), Some(model_type)) => {
                Ok(RunConfig {
                    dataset_path: PathBuf::from(path),
                    epochs,
                    batch_size,
                    learning_rate,
                    optimizer: optimizer.to_string(),
                    model: ModelSpec {
                        model_type: model_type.to_string(),
                        model_name: model_name.map(str::to_string),
                    },
                })
            }
            _ => Err(ConfigError::Incomplete(Vec::new())),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Which model a run trains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    pub model_type: String,
    pub model_name: Option<String>,
}

impl ModelSpec {
    /// Identifier used for logging and artifact naming: the custom model's
    /// name, or the architecture otherwise.
    pub fn model_id(&self) -> &str {
        match (self.model_type.as_str(), self.model_name.as_deref()) {
            ("custom", Some(name)) => name,
            (model_type, _) => model_type,
        }
    }
}

/// Validated configuration bundle handed to a producer run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub dataset_path: PathBuf,
    pub epochs: u32,
    pub batch_size: u32,
    pub learning_rate: f64,
    pub optimizer: String,
    pub model: ModelSpec,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn complete() -> TrainingConfig {
        TrainingConfig {
            model_type: Some("resnet50".to_string()),
            dataset: Some(DatasetRef {
                path: Some("data/train.csv".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_draft_is_incomplete() {
        let err = TrainingConfig::default().validate().unwrap_err();
        let fields: Vec<&str> = err.problems().iter().map(|p| p.field()).collect();
        assert_eq!(fields, vec!["dataset", "modelType"]);
    }

    #[test]
    fn test_validation_aggregates_all_problems() {
        let config = TrainingConfig {
            learning_rate: None,
            batch_size: Some(0),
            epochs: None,
            optimizer: Some("  ".to_string()),
            model_type: Some("custom".to_string()),
            model_name: None,
            dataset: Some(DatasetRef::default()),
        };
        let err = config.validate().unwrap_err();
        let fields: Vec<&str> = err.problems().iter().map(|p| p.field()).collect();
        assert_eq!(
            fields,
            vec!["dataset", "epochs", "batchSize", "learningRate", "optimizer", "modelName"]
        );
    }

    #[test]
    fn test_unknown_model_type_is_invalid() {
        let mut config = complete();
        config.model_type = Some("lstm".to_string());
        let err = config.validate().unwrap_err();
        assert!(matches!(
            &err.problems()[0],
            ConfigProblem::Invalid { field, .. } if field == "modelType"
        ));
    }

    #[test]
    fn test_complete_draft_validates() {
        let run = complete().validate().unwrap();
        assert_eq!(run.dataset_path, PathBuf::from("data/train.csv"));
        assert_eq!(run.epochs, 100);
        assert_eq!(run.batch_size, 32);
        assert_eq!(run.optimizer, "adam");
        assert_eq!(run.model.model_id(), "resnet50");
    }

    #[test]
    fn test_custom_model_uses_name_as_id() {
        let mut config = complete();
        config.model_type = Some("custom".to_string());
        config.model_name = Some("model-11".to_string());
        let run = config.validate().unwrap();
        assert_eq!(run.model.model_id(), "model-11");
    }

    #[test]
    fn test_patch_merges_only_present_fields() {
        let mut config = TrainingConfig::default();
        let patch: ConfigPatch = serde_json::from_str(r#"{"epochs": 5, "modelType": "gpt2"}"#).unwrap();
        config.apply(patch);
        assert_eq!(config.epochs, Some(5));
        assert_eq!(config.model_type.as_deref(), Some("gpt2"));
        assert_eq!(config.learning_rate, Some(0.001));
        assert_eq!(config.optimizer.as_deref(), Some("adam"));
    }

    #[test]
    fn test_config_serializes_camel_case() {
        let json = serde_json::to_value(TrainingConfig::default()).unwrap();
        assert_eq!(json["learningRate"], 0.001);
        assert_eq!(json["batchSize"], 32);
        assert!(json["dataset"].is_null());
    }
}
