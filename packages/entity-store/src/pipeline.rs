//! Pipeline: stages composed over a terminal backend.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::PipelineConfig;
use crate::{Entity, EntityStorage, Error, RequestContext, SelectOptions, StorageStage};

/// One stage bound to the storage directly beneath it.
struct Layer {
    stage: Box<dyn StorageStage>,
    upstream: Arc<dyn EntityStorage>,
}

#[async_trait]
impl EntityStorage for Layer {
    async fn select(
        &self,
        ctx: &RequestContext,
        options: SelectOptions,
    ) -> Result<Vec<Entity>, Error> {
        self.stage
            .select(self.upstream.as_ref(), ctx, options)
            .await
    }

    async fn read(&self, ctx: &RequestContext, uid: &str) -> Result<Option<Entity>, Error> {
        self.stage.read(self.upstream.as_ref(), ctx, uid).await
    }

    async fn create(&self, ctx: &RequestContext, entity: Entity) -> Result<Entity, Error> {
        self.stage
            .create(self.upstream.as_ref(), ctx, entity)
            .await
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        uid: &str,
        patch: Entity,
    ) -> Result<Entity, Error> {
        self.stage
            .update(self.upstream.as_ref(), ctx, uid, patch)
            .await
    }

    async fn delete(&self, ctx: &RequestContext, uid: &str) -> Result<(), Error> {
        self.stage.delete(self.upstream.as_ref(), ctx, uid).await
    }
}

/// An ordered, finite chain of stages ending at a terminal backend.
///
/// The chain is assembled once by [`PipelineBuilder::build`]. Each layer owns
/// a reference to the layer beneath it, so the chain cannot contain a cycle,
/// and no stage holds per-request state: the same pipeline can serve any
/// number of concurrent requests.
///
/// # Example
///
/// ```rust
/// use facetfs_entity_store::{MemoryBackend, Pipeline};
/// use facetfs_entity_store::stages::{MaxLimit, ReadOnly};
///
/// let pipeline = Pipeline::builder(MemoryBackend::new())
///     .stage(ReadOnly)
///     .stage(MaxLimit::new(50).unwrap())
///     .build();
///
/// assert_eq!(pipeline.stage_names(), &["read_only", "max_limit"]);
/// ```
#[derive(Clone)]
pub struct Pipeline {
    outermost: Arc<dyn EntityStorage>,
    stage_names: Vec<&'static str>,
}

impl Pipeline {
    /// Start building a pipeline over a terminal backend.
    pub fn builder(backend: impl EntityStorage + 'static) -> PipelineBuilder {
        PipelineBuilder::new(Arc::new(backend))
    }

    /// Build a pipeline from configuration.
    ///
    /// Stages are listed outermost first, the same order the builder uses.
    pub fn from_config(
        config: &PipelineConfig,
        backend: Arc<dyn EntityStorage>,
    ) -> Result<Self, Error> {
        let mut builder = PipelineBuilder::new(backend);
        for stage in &config.stages {
            builder = builder.boxed_stage(stage.build()?);
        }
        Ok(builder.build())
    }

    /// Stage names, outermost first. The terminal backend is not listed.
    pub fn stage_names(&self) -> &[&'static str] {
        &self.stage_names
    }

    /// The outermost storage, for callers that want a shareable handle.
    pub fn storage(&self) -> Arc<dyn EntityStorage> {
        self.outermost.clone()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names)
            .finish()
    }
}

#[async_trait]
impl EntityStorage for Pipeline {
    async fn select(
        &self,
        ctx: &RequestContext,
        options: SelectOptions,
    ) -> Result<Vec<Entity>, Error> {
        self.outermost.select(ctx, options).await
    }

    async fn read(&self, ctx: &RequestContext, uid: &str) -> Result<Option<Entity>, Error> {
        self.outermost.read(ctx, uid).await
    }

    async fn create(&self, ctx: &RequestContext, entity: Entity) -> Result<Entity, Error> {
        self.outermost.create(ctx, entity).await
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        uid: &str,
        patch: Entity,
    ) -> Result<Entity, Error> {
        self.outermost.update(ctx, uid, patch).await
    }

    async fn delete(&self, ctx: &RequestContext, uid: &str) -> Result<(), Error> {
        self.outermost.delete(ctx, uid).await
    }
}

/// Collects stages (outermost first) before composing them.
pub struct PipelineBuilder {
    backend: Arc<dyn EntityStorage>,
    stages: Vec<Box<dyn StorageStage>>,
}

impl PipelineBuilder {
    pub fn new(backend: Arc<dyn EntityStorage>) -> Self {
        Self {
            backend,
            stages: Vec::new(),
        }
    }

    /// Append a stage beneath the ones already added.
    pub fn stage(self, stage: impl StorageStage + 'static) -> Self {
        self.boxed_stage(Box::new(stage))
    }

    pub fn boxed_stage(mut self, stage: Box<dyn StorageStage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> Pipeline {
        let stage_names = self.stages.iter().map(|s| s.name()).collect();

        // Wrap from the innermost stage outwards.
        let outermost = self
            .stages
            .into_iter()
            .rev()
            .fold(self.backend, |upstream, stage| {
                Arc::new(Layer { stage, upstream }) as Arc<dyn EntityStorage>
            });

        Pipeline {
            outermost,
            stage_names,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{MaxLimit, ReadOnly};
    use crate::{json, MemoryBackend, StageConfig};
    use std::sync::Mutex;

    /// Records the order in which stages see a select.
    struct Trace {
        label: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl StorageStage for Trace {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn select(
            &self,
            upstream: &dyn EntityStorage,
            ctx: &RequestContext,
            options: SelectOptions,
        ) -> Result<Vec<Entity>, Error> {
            self.seen.lock().unwrap().push(self.label);
            upstream.select(ctx, options).await
        }
    }

    fn obj(v: crate::Value) -> Entity {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn stages_run_in_declared_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder(MemoryBackend::new())
            .stage(Trace {
                label: "outer",
                seen: seen.clone(),
            })
            .stage(Trace {
                label: "inner",
                seen: seen.clone(),
            })
            .build();

        pipeline
            .select(&RequestContext::system(), SelectOptions::new())
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["outer", "inner"]);
        assert_eq!(pipeline.stage_names(), &["outer", "inner"]);
    }

    #[tokio::test]
    async fn unoverridden_operations_pass_through() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder(MemoryBackend::new())
            .stage(Trace {
                label: "only_select",
                seen: seen.clone(),
            })
            .build();
        let ctx = RequestContext::system();

        let created = pipeline
            .create(&ctx, obj(json!({"uid": "a", "name": "x"})))
            .await
            .unwrap();
        assert_eq!(created["name"], json!("x"));

        let read = pipeline.read(&ctx, "a").await.unwrap();
        assert!(read.is_some());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_pipeline_is_the_backend() {
        let pipeline = Pipeline::builder(MemoryBackend::new()).build();
        let ctx = RequestContext::system();
        pipeline.create(&ctx, obj(json!({"uid": "a"}))).await.unwrap();
        pipeline.delete(&ctx, "a").await.unwrap();
        assert!(pipeline.read(&ctx, "a").await.unwrap().is_none());
        assert!(pipeline.stage_names().is_empty());
    }

    #[tokio::test]
    async fn from_config_builds_declared_stages() {
        let config = PipelineConfig {
            stages: vec![StageConfig::ReadOnly, StageConfig::MaxLimit { max: 10 }],
        };
        let pipeline = Pipeline::from_config(&config, Arc::new(MemoryBackend::new())).unwrap();
        assert_eq!(pipeline.stage_names(), &["read_only", "max_limit"]);

        let err = pipeline
            .create(&RequestContext::system(), obj(json!({"uid": "a"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReadOnly { operation: "create" }));
    }

    #[tokio::test]
    async fn from_config_rejects_invalid_stage() {
        let config = PipelineConfig {
            stages: vec![StageConfig::MaxLimit { max: 0 }],
        };
        let err = Pipeline::from_config(&config, Arc::new(MemoryBackend::new())).unwrap_err();
        assert!(matches!(err, Error::InvalidOperationParameters { .. }));
    }

    #[tokio::test]
    async fn pipeline_is_reentrant_across_clones() {
        let pipeline = Pipeline::builder(MemoryBackend::new())
            .stage(MaxLimit::new(2).unwrap())
            .stage(ReadOnly)
            .build();
        let other = pipeline.clone();
        let ctx = RequestContext::system();

        let (a, b) = tokio::join!(
            pipeline.select(&ctx, SelectOptions::new()),
            other.select(&ctx, SelectOptions::new())
        );
        assert!(a.unwrap().is_empty());
        assert!(b.unwrap().is_empty());
    }

    #[test]
    fn debug_lists_stages() {
        let pipeline = Pipeline::builder(MemoryBackend::new())
            .stage(ReadOnly)
            .build();
        assert!(format!("{:?}", pipeline).contains("read_only"));
    }
}
