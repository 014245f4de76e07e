//! Validate: reject malformed creates and updates.

use async_trait::async_trait;
use serde_json::Value;

use crate::{Entity, EntityStorage, Error, RequestContext, StorageStage, UID_FIELD};

/// Checks entities against required and immutable field lists.
///
/// - `create` fails if a required field is missing or `null`.
/// - `update` fails if the patch touches an immutable field. `uid` is always
///   immutable.
///
/// Violations are reported as [`Error::InvalidOperationParameters`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validate {
    required: Vec<String>,
    immutable: Vec<String>,
}

impl Validate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, field: impl Into<String>) -> Self {
        self.required.push(field.into());
        self
    }

    pub fn immutable(mut self, field: impl Into<String>) -> Self {
        self.immutable.push(field.into());
        self
    }

    fn check_create(&self, entity: &Entity) -> Result<(), Error> {
        for field in &self.required {
            match entity.get(field) {
                None | Some(Value::Null) => {
                    return Err(Error::invalid(format!("missing required field `{}`", field)))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn check_update(&self, patch: &Entity) -> Result<(), Error> {
        for key in patch.keys() {
            if key == UID_FIELD || self.immutable.iter().any(|f| f == key) {
                return Err(Error::invalid(format!("field `{}` cannot be changed", key)));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StorageStage for Validate {
    fn name(&self) -> &'static str {
        "validate"
    }

    async fn create(
        &self,
        upstream: &dyn EntityStorage,
        ctx: &RequestContext,
        entity: Entity,
    ) -> Result<Entity, Error> {
        self.check_create(&entity)?;
        upstream.create(ctx, entity).await
    }

    async fn update(
        &self,
        upstream: &dyn EntityStorage,
        ctx: &RequestContext,
        uid: &str,
        patch: Entity,
    ) -> Result<Entity, Error> {
        self.check_update(&patch)?;
        upstream.update(ctx, uid, patch).await
    }
}
