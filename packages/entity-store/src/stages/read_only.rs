//! ReadOnly: reject every write.

use async_trait::async_trait;

use crate::{Entity, EntityStorage, Error, RequestContext, StorageStage};

/// Answers `create`, `update` and `delete` with [`Error::ReadOnly`] without
/// consulting upstream. Reads pass through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOnly;

#[async_trait]
impl StorageStage for ReadOnly {
    fn name(&self) -> &'static str {
        "read_only"
    }

    async fn create(
        &self,
        _upstream: &dyn EntityStorage,
        _ctx: &RequestContext,
        _entity: Entity,
    ) -> Result<Entity, Error> {
        Err(Error::ReadOnly {
            operation: "create",
        })
    }

    async fn update(
        &self,
        _upstream: &dyn EntityStorage,
        _ctx: &RequestContext,
        _uid: &str,
        _patch: Entity,
    ) -> Result<Entity, Error> {
        Err(Error::ReadOnly {
            operation: "update",
        })
    }

    async fn delete(
        &self,
        _upstream: &dyn EntityStorage,
        _ctx: &RequestContext,
        _uid: &str,
    ) -> Result<(), Error> {
        Err(Error::ReadOnly {
            operation: "delete",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{json, MemoryBackend, Pipeline, SelectOptions};

    fn seeded() -> MemoryBackend {
        MemoryBackend::with_entities(vec![json!({"uid": "a", "name": "x"})
            .as_object()
            .cloned()
            .unwrap()])
        .unwrap()
    }

    #[tokio::test]
    async fn writes_are_rejected() {
        let pipeline = Pipeline::builder(seeded()).stage(ReadOnly).build();
        let ctx = RequestContext::system();

        let err = pipeline.create(&ctx, Entity::new()).await.unwrap_err();
        assert_eq!(err, Error::ReadOnly { operation: "create" });

        let err = pipeline.update(&ctx, "a", Entity::new()).await.unwrap_err();
        assert_eq!(err, Error::ReadOnly { operation: "update" });

        let err = pipeline.delete(&ctx, "a").await.unwrap_err();
        assert_eq!(err, Error::ReadOnly { operation: "delete" });

        // The entity is untouched.
        assert!(pipeline.read(&ctx, "a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn reads_pass_through() {
        let pipeline = Pipeline::builder(seeded()).stage(ReadOnly).build();
        let ctx = RequestContext::system();
        let rows = pipeline.select(&ctx, SelectOptions::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
