//! Core traits: EntityStorage, StorageStage.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Entity, Error, RequestContext, SelectOptions};

/// The standard operation set of an entity collection.
///
/// Callers hold the outermost element of a pipeline through this trait and
/// never see the stages behind it.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn EntityStorage>`.
#[async_trait]
pub trait EntityStorage: Send + Sync {
    /// Select entities matching the options' predicate.
    async fn select(
        &self,
        ctx: &RequestContext,
        options: SelectOptions,
    ) -> Result<Vec<Entity>, Error>;

    /// Read one entity by uid.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - No such entity is visible to the caller.
    /// * `Ok(Some(entity))` - The entity.
    /// * `Err(Error)` - The operation was rejected or the backend failed.
    async fn read(&self, ctx: &RequestContext, uid: &str) -> Result<Option<Entity>, Error>;

    /// Create an entity, returning it as stored (with its uid).
    async fn create(&self, ctx: &RequestContext, entity: Entity) -> Result<Entity, Error>;

    /// Shallow-merge `patch` into an existing entity, returning the result.
    async fn update(&self, ctx: &RequestContext, uid: &str, patch: Entity)
        -> Result<Entity, Error>;

    /// Delete an entity.
    async fn delete(&self, ctx: &RequestContext, uid: &str) -> Result<(), Error>;
}

/// One stage of a pipeline.
///
/// Every operation defaults to passing through to `upstream` unchanged.
/// A stage that overrides an operation must either rewrite the parameters
/// and delegate, answer by itself without calling upstream, or reject the
/// operation with an error. Stages other than the terminal backend never
/// perform persistent I/O of their own, and rewriting must depend only on
/// the input and the stage's configuration.
#[async_trait]
pub trait StorageStage: Send + Sync {
    /// Short name used in logs and pipeline introspection.
    fn name(&self) -> &'static str;

    async fn select(
        &self,
        upstream: &dyn EntityStorage,
        ctx: &RequestContext,
        options: SelectOptions,
    ) -> Result<Vec<Entity>, Error> {
        upstream.select(ctx, options).await
    }

    async fn read(
        &self,
        upstream: &dyn EntityStorage,
        ctx: &RequestContext,
        uid: &str,
    ) -> Result<Option<Entity>, Error> {
        upstream.read(ctx, uid).await
    }

    async fn create(
        &self,
        upstream: &dyn EntityStorage,
        ctx: &RequestContext,
        entity: Entity,
    ) -> Result<Entity, Error> {
        upstream.create(ctx, entity).await
    }

    async fn update(
        &self,
        upstream: &dyn EntityStorage,
        ctx: &RequestContext,
        uid: &str,
        patch: Entity,
    ) -> Result<Entity, Error> {
        upstream.update(ctx, uid, patch).await
    }

    async fn delete(
        &self,
        upstream: &dyn EntityStorage,
        ctx: &RequestContext,
        uid: &str,
    ) -> Result<(), Error> {
        upstream.delete(ctx, uid).await
    }
}

// Blanket implementations for shared and boxed storages

#[async_trait]
impl<T: EntityStorage + ?Sized> EntityStorage for Arc<T> {
    async fn select(
        &self,
        ctx: &RequestContext,
        options: SelectOptions,
    ) -> Result<Vec<Entity>, Error> {
        self.as_ref().select(ctx, options).await
    }

    async fn read(&self, ctx: &RequestContext, uid: &str) -> Result<Option<Entity>, Error> {
        self.as_ref().read(ctx, uid).await
    }

    async fn create(&self, ctx: &RequestContext, entity: Entity) -> Result<Entity, Error> {
        self.as_ref().create(ctx, entity).await
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        uid: &str,
        patch: Entity,
    ) -> Result<Entity, Error> {
        self.as_ref().update(ctx, uid, patch).await
    }

    async fn delete(&self, ctx: &RequestContext, uid: &str) -> Result<(), Error> {
        self.as_ref().delete(ctx, uid).await
    }
}

#[async_trait]
impl<T: EntityStorage + ?Sized> EntityStorage for Box<T> {
    async fn select(
        &self,
        ctx: &RequestContext,
        options: SelectOptions,
    ) -> Result<Vec<Entity>, Error> {
        self.as_ref().select(ctx, options).await
    }

    async fn read(&self, ctx: &RequestContext, uid: &str) -> Result<Option<Entity>, Error> {
        self.as_ref().read(ctx, uid).await
    }

    async fn create(&self, ctx: &RequestContext, entity: Entity) -> Result<Entity, Error> {
        self.as_ref().create(ctx, entity).await
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        uid: &str,
        patch: Entity,
    ) -> Result<Entity, Error> {
        self.as_ref().update(ctx, uid, patch).await
    }

    async fn delete(&self, ctx: &RequestContext, uid: &str) -> Result<(), Error> {
        self.as_ref().delete(ctx, uid).await
    }
}
