//! Declarative setup of the collections behind an
//! [`EntityFilesystem`](crate::EntityFilesystem).
//!
//! ```json
//! {
//!   "page_size": 100,
//!   "entries": {
//!     "storage": {"type": "json_dir", "path": "/var/lib/facetfs/entries"},
//!     "pipeline": {"stages": [{"type": "max_limit", "max": 100}]}
//!   },
//!   "users": {"storage": {"type": "memory"}}
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use facetfs_entity_store::{
    EntityStorage, JsonDirBackend, MemoryBackend, Pipeline, PipelineConfig, StageConfig,
};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The terminal backend of one collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    #[default]
    Memory,
    /// One JSON document per entity in an existing directory.
    JsonDir { path: PathBuf },
}

/// A terminal backend plus the stages in front of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl CollectionConfig {
    /// In-memory storage behind a limit clamp and required-field checks.
    pub fn in_memory(max_limit: usize, required: &[&str]) -> Self {
        CollectionConfig {
            storage: StorageConfig::Memory,
            pipeline: PipelineConfig {
                stages: vec![
                    StageConfig::MaxLimit { max: max_limit },
                    StageConfig::Validate {
                        required: required.iter().map(|f| f.to_string()).collect(),
                        immutable: vec![],
                    },
                ],
            },
        }
    }

    /// Build the pipeline; callers only ever see its outermost stage.
    pub fn build(&self) -> Result<Arc<dyn EntityStorage>, Error> {
        let backend: Arc<dyn EntityStorage> = match &self.storage {
            StorageConfig::Memory => Arc::new(MemoryBackend::new()),
            StorageConfig::JsonDir { path } => Arc::new(JsonDirBackend::new(path.clone())?),
        };
        Ok(Pipeline::from_config(&self.pipeline, backend)?.storage())
    }
}

fn default_page_size() -> usize {
    100
}

/// Every collection an entity-backed filesystem reads from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilesystemConfig {
    /// Rows requested per `select` when walking children.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub entries: CollectionConfig,
    #[serde(default)]
    pub users: CollectionConfig,
    #[serde(default)]
    pub shares: CollectionConfig,
    #[serde(default)]
    pub subdomains: CollectionConfig,
    #[serde(default)]
    pub versions: CollectionConfig,
}

impl FilesystemConfig {
    pub fn in_memory(max_limit: usize) -> Self {
        FilesystemConfig {
            page_size: max_limit,
            entries: CollectionConfig::in_memory(max_limit, &["path", "name", "owner_uid"]),
            users: CollectionConfig::in_memory(max_limit, &["username"]),
            shares: CollectionConfig::in_memory(
                max_limit,
                &["subject_uid", "grantee_uid", "permission"],
            ),
            subdomains: CollectionConfig::in_memory(
                max_limit,
                &["subdomain", "root_dir_uid", "owner_uid"],
            ),
            versions: CollectionConfig::in_memory(max_limit, &["file_uid", "version_id"]),
        }
    }
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self::in_memory(default_page_size())
    }
}
