//! Entity storage pipelines.
//!
//! An entity collection is reached through a chain of stages. Each stage may
//! rewrite parameters, validate, short-circuit, or simply pass an operation
//! on to the next stage ("upstream"). The innermost element is a terminal
//! backend, the only place where persistent I/O happens.
//!
//! - `EntityStorage`: the operation set every caller sees
//! - `StorageStage`: a unit that overrides some of those operations
//! - `Pipeline`: stages composed once, in declared order, over a backend
//!
//! # Example
//!
//! ```rust
//! use facetfs_entity_store::{EntityStorage, MemoryBackend, Pipeline, RequestContext, SelectOptions};
//! use facetfs_entity_store::stages::MaxLimit;
//!
//! # async fn demo() -> Result<(), facetfs_entity_store::Error> {
//! let pipeline = Pipeline::builder(MemoryBackend::new())
//!     .stage(MaxLimit::new(100)?)
//!     .build();
//!
//! // limit 0 means "use the default", which is the configured maximum
//! let rows = pipeline
//!     .select(&RequestContext::system(), SelectOptions::new().with_limit(0))
//!     .await?;
//! assert!(rows.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod backend;
mod config;
mod entity;
mod error;
mod pipeline;
pub mod stages;
mod traits;

pub use backend::{JsonDirBackend, MemoryBackend};
pub use config::{PipelineConfig, StageConfig};
pub use entity::{entity_uid, Entity, Predicate, RequestContext, SelectOptions, UID_FIELD};
pub use error::Error;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use traits::{EntityStorage, StorageStage};

// Re-exported so callers can build entities without naming serde_json.
pub use serde_json::{json, Value};
