//! OwnerScoped: confine every operation to the acting user's entities.

use async_trait::async_trait;
use serde_json::Value;

use crate::{Entity, EntityStorage, Error, RequestContext, SelectOptions, StorageStage};

/// Stamps new entities with the acting user and hides everybody else's.
///
/// - `create` sets the owner field to the actor.
/// - `select` adds `owner == actor` to the predicate.
/// - `read` answers `None` for entities owned by someone else; `update` and
///   `delete` answer [`Error::NotFound`] for them.
///
/// A request without an actor is rejected with
/// [`Error::InvalidOperationParameters`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerScoped {
    field: String,
}

impl OwnerScoped {
    pub const DEFAULT_FIELD: &'static str = "owner_uid";

    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    fn actor<'a>(&self, ctx: &'a RequestContext) -> Result<&'a str, Error> {
        ctx.actor_uid
            .as_deref()
            .ok_or_else(|| Error::invalid("owner-scoped collection requires an actor"))
    }

    fn owned_by(&self, entity: &Entity, actor: &str) -> bool {
        entity.get(&self.field).and_then(Value::as_str) == Some(actor)
    }

    async fn require_owned(
        &self,
        upstream: &dyn EntityStorage,
        ctx: &RequestContext,
        uid: &str,
    ) -> Result<(), Error> {
        let actor = self.actor(ctx)?;
        match upstream.read(ctx, uid).await? {
            Some(entity) if self.owned_by(&entity, actor) => Ok(()),
            _ => Err(Error::not_found(uid)),
        }
    }
}

impl Default for OwnerScoped {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FIELD)
    }
}

#[async_trait]
impl StorageStage for OwnerScoped {
    fn name(&self) -> &'static str {
        "owner_scoped"
    }

    async fn select(
        &self,
        upstream: &dyn EntityStorage,
        ctx: &RequestContext,
        mut options: SelectOptions,
    ) -> Result<Vec<Entity>, Error> {
        let actor = self.actor(ctx)?;
        options.predicate = options.predicate.and(self.field.clone(), actor);
        upstream.select(ctx, options).await
    }

    async fn read(
        &self,
        upstream: &dyn EntityStorage,
        ctx: &RequestContext,
        uid: &str,
    ) -> Result<Option<Entity>, Error> {
        let actor = self.actor(ctx)?;
        Ok(upstream
            .read(ctx, uid)
            .await?
            .filter(|entity| self.owned_by(entity, actor)))
    }

    async fn create(
        &self,
        upstream: &dyn EntityStorage,
        ctx: &RequestContext,
        mut entity: Entity,
    ) -> Result<Entity, Error> {
        let actor = self.actor(ctx)?;
        entity.insert(self.field.clone(), Value::String(actor.to_string()));
        upstream.create(ctx, entity).await
    }

    async fn update(
        &self,
        upstream: &dyn EntityStorage,
        ctx: &RequestContext,
        uid: &str,
        mut patch: Entity,
    ) -> Result<Entity, Error> {
        self.require_owned(upstream, ctx, uid).await?;
        // Ownership cannot be handed over through an update.
        patch.remove(&self.field);
        upstream.update(ctx, uid, patch).await
    }

    async fn delete(
        &self,
        upstream: &dyn EntityStorage,
        ctx: &RequestContext,
        uid: &str,
    ) -> Result<(), Error> {
        self.require_owned(upstream, ctx, uid).await?;
        upstream.delete(ctx, uid).await
    }
}
