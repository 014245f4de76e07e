//! In-memory terminal backend.

use std::sync::RwLock;

use async_trait::async_trait;

use super::{apply_select, assign_uid, merge, uid_of};
use crate::{Entity, EntityStorage, Error, RequestContext, SelectOptions};

/// Entities kept in insertion order behind a lock.
///
/// # Example
///
/// ```rust
/// use facetfs_entity_store::{json, EntityStorage, MemoryBackend, RequestContext};
///
/// # async fn demo() -> Result<(), facetfs_entity_store::Error> {
/// let backend = MemoryBackend::new();
/// let ctx = RequestContext::system();
/// let created = backend
///     .create(&ctx, json!({"name": "notes"}).as_object().cloned().unwrap())
///     .await?;
/// // a uid was assigned
/// assert!(created.contains_key("uid"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entities: RwLock<Vec<Entity>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-populated with entities.
    pub fn with_entities(entities: impl IntoIterator<Item = Entity>) -> Result<Self, Error> {
        let mut stored: Vec<Entity> = Vec::new();
        for mut entity in entities {
            let uid = assign_uid(&mut entity)?;
            if stored.iter().any(|e| uid_of(e) == uid) {
                return Err(Error::Conflict { uid });
            }
            stored.push(entity);
        }
        Ok(Self {
            entities: RwLock::new(stored),
        })
    }

    pub fn len(&self) -> usize {
        self.entities.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> Error {
        Error::backend("memory backend lock poisoned")
    }
}

#[async_trait]
impl EntityStorage for MemoryBackend {
    async fn select(
        &self,
        _ctx: &RequestContext,
        options: SelectOptions,
    ) -> Result<Vec<Entity>, Error> {
        let entities = self.entities.read().map_err(|_| Self::poisoned())?;
        Ok(apply_select(entities.iter(), &options))
    }

    async fn read(&self, _ctx: &RequestContext, uid: &str) -> Result<Option<Entity>, Error> {
        let entities = self.entities.read().map_err(|_| Self::poisoned())?;
        Ok(entities.iter().find(|e| uid_of(e) == uid).cloned())
    }

    async fn create(&self, _ctx: &RequestContext, mut entity: Entity) -> Result<Entity, Error> {
        let uid = assign_uid(&mut entity)?;
        let mut entities = self.entities.write().map_err(|_| Self::poisoned())?;
        if entities.iter().any(|e| uid_of(e) == uid) {
            return Err(Error::Conflict { uid });
        }
        entities.push(entity.clone());
        Ok(entity)
    }

    async fn update(
        &self,
        _ctx: &RequestContext,
        uid: &str,
        patch: Entity,
    ) -> Result<Entity, Error> {
        let mut entities = self.entities.write().map_err(|_| Self::poisoned())?;
        let entity = entities
            .iter_mut()
            .find(|e| uid_of(e) == uid)
            .ok_or_else(|| Error::not_found(uid))?;
        merge(entity, patch);
        Ok(entity.clone())
    }

    async fn delete(&self, _ctx: &RequestContext, uid: &str) -> Result<(), Error> {
        let mut entities = self.entities.write().map_err(|_| Self::poisoned())?;
        let index = entities
            .iter()
            .position(|e| uid_of(e) == uid)
            .ok_or_else(|| Error::not_found(uid))?;
        entities.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{json, Predicate, Value};

    fn obj(v: Value) -> Entity {
        v.as_object().cloned().unwrap()
    }

    fn ctx() -> RequestContext {
        RequestContext::system()
    }

    #[tokio::test]
    async fn create_assigns_uid_when_missing() {
        let backend = MemoryBackend::new();
        let created = backend.create(&ctx(), obj(json!({"name": "a"}))).await.unwrap();
        let uid = created["uid"].as_str().unwrap().to_string();
        assert!(!uid.is_empty());
        assert!(backend.read(&ctx(), &uid).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn create_rejects_duplicate_uid() {
        let backend = MemoryBackend::new();
        backend.create(&ctx(), obj(json!({"uid": "a"}))).await.unwrap();
        let err = backend.create(&ctx(), obj(json!({"uid": "a"}))).await.unwrap_err();
        assert_eq!(err, Error::Conflict { uid: "a".into() });
    }

    #[tokio::test]
    async fn create_rejects_non_string_uid() {
        let backend = MemoryBackend::new();
        let err = backend.create(&ctx(), obj(json!({"uid": 5}))).await.unwrap_err();
        assert!(matches!(err, Error::InvalidOperationParameters { .. }));
    }

    #[tokio::test]
    async fn select_applies_predicate_offset_and_limit() {
        let backend = MemoryBackend::with_entities(
            (0..6).map(|i| obj(json!({"uid": format!("e{}", i), "even": i % 2 == 0}))),
        )
        .unwrap();

        let evens = backend
            .select(
                &ctx(),
                SelectOptions::new().with_predicate(Predicate::eq("even", true)),
            )
            .await
            .unwrap();
        let uids: Vec<_> = evens.iter().map(|e| e["uid"].clone()).collect();
        assert_eq!(uids, vec![json!("e0"), json!("e2"), json!("e4")]);

        let page = backend
            .select(&ctx(), SelectOptions::new().with_offset(2).with_limit(3))
            .await
            .unwrap();
        let uids: Vec<_> = page.iter().map(|e| e["uid"].clone()).collect();
        assert_eq!(uids, vec![json!("e2"), json!("e3"), json!("e4")]);
    }

    #[tokio::test]
    async fn update_merges_and_keeps_uid() {
        let backend = MemoryBackend::new();
        backend
            .create(&ctx(), obj(json!({"uid": "a", "x": 1, "y": 2})))
            .await
            .unwrap();
        let updated = backend
            .update(&ctx(), "a", obj(json!({"uid": "zzz", "y": 3})))
            .await
            .unwrap();
        assert_eq!(updated, obj(json!({"uid": "a", "x": 1, "y": 3})));
    }

    #[tokio::test]
    async fn missing_entities_are_not_found() {
        let backend = MemoryBackend::new();
        assert!(backend.read(&ctx(), "nope").await.unwrap().is_none());
        assert_eq!(
            backend.update(&ctx(), "nope", Entity::new()).await.unwrap_err(),
            Error::not_found("nope")
        );
        assert_eq!(
            backend.delete(&ctx(), "nope").await.unwrap_err(),
            Error::not_found("nope")
        );
    }

    #[test]
    fn with_entities_rejects_duplicates() {
        let err = MemoryBackend::with_entities(vec![
            obj(json!({"uid": "a"})),
            obj(json!({"uid": "a"})),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[test]
    fn len_tracks_entities() {
        let backend = MemoryBackend::with_entities(vec![obj(json!({"uid": "a"}))]).unwrap();
        assert_eq!(backend.len(), 1);
        assert!(!backend.is_empty());
        assert!(MemoryBackend::new().is_empty());
    }
}
