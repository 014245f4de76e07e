//! Declarative pipeline configuration.
//!
//! Stage configurations are JSON objects like:
//! ```json
//! {"type": "max_limit", "max": 100}
//! {"type": "read_only"}
//! {"type": "validate", "required": ["name"], "immutable": ["owner_uid"]}
//! {"type": "owner_scoped", "field": "owner_uid"}
//! ```

use serde::{Deserialize, Serialize};

use crate::stages::{MaxLimit, OwnerScoped, ReadOnly, Validate};
use crate::{Error, StorageStage};

/// Configuration for one stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageConfig {
    /// Clamp select limits to `max`.
    MaxLimit { max: usize },
    /// Reject every write.
    ReadOnly,
    /// Required and immutable field checks.
    Validate {
        #[serde(default)]
        required: Vec<String>,
        #[serde(default)]
        immutable: Vec<String>,
    },
    /// Confine operations to the acting user's entities.
    OwnerScoped {
        #[serde(default = "default_owner_field")]
        field: String,
    },
}

fn default_owner_field() -> String {
    OwnerScoped::DEFAULT_FIELD.to_string()
}

impl StageConfig {
    /// Instantiate the configured stage.
    pub fn build(&self) -> Result<Box<dyn StorageStage>, Error> {
        let stage: Box<dyn StorageStage> = match self {
            StageConfig::MaxLimit { max } => Box::new(MaxLimit::new(*max)?),
            StageConfig::ReadOnly => Box::new(ReadOnly),
            StageConfig::Validate {
                required,
                immutable,
            } => {
                let stage = required
                    .iter()
                    .fold(Validate::new(), |stage, field| stage.require(field.clone()));
                Box::new(
                    immutable
                        .iter()
                        .fold(stage, |stage, field| stage.immutable(field.clone())),
                )
            }
            StageConfig::OwnerScoped { field } => Box::new(OwnerScoped::new(field.clone())),
        };
        Ok(stage)
    }
}

/// An ordered list of stages, outermost first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineConfig {
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_stage_configs() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"stages": [
                {"type": "max_limit", "max": 100},
                {"type": "read_only"},
                {"type": "validate", "required": ["name"]},
                {"type": "owner_scoped"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            config.stages,
            vec![
                StageConfig::MaxLimit { max: 100 },
                StageConfig::ReadOnly,
                StageConfig::Validate {
                    required: vec!["name".into()],
                    immutable: vec![],
                },
                StageConfig::OwnerScoped {
                    field: "owner_uid".into()
                },
            ]
        );
    }

    #[test]
    fn missing_stages_means_empty_pipeline() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert!(config.stages.is_empty());
    }

    #[test]
    fn unknown_stage_type_is_an_error() {
        let result: Result<PipelineConfig, _> =
            serde_json::from_str(r#"{"stages": [{"type": "teleport"}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn build_names_match_config() {
        let names: Vec<_> = [
            StageConfig::MaxLimit { max: 5 },
            StageConfig::ReadOnly,
            StageConfig::Validate {
                required: vec![],
                immutable: vec![],
            },
            StageConfig::OwnerScoped {
                field: "owner".into(),
            },
        ]
        .iter()
        .map(|c| c.build().unwrap().name())
        .collect();
        assert_eq!(names, vec!["max_limit", "read_only", "validate", "owner_scoped"]);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = PipelineConfig {
            stages: vec![StageConfig::MaxLimit { max: 3 }],
        };
        let text = serde_json::to_string(&config).unwrap();
        assert!(text.contains(r#""type":"max_limit""#));
    }
}
