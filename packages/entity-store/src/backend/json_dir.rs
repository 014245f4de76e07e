//! On-disk terminal backend: one JSON document per entity.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{apply_select, assign_uid, merge};
use crate::{Entity, EntityStorage, Error, RequestContext, SelectOptions};

/// Stores each entity as `<root>/<uid>.json`.
///
/// `select` walks the directory in uid order.
pub struct JsonDirBackend {
    root: PathBuf,
}

impl JsonDirBackend {
    /// Open a backend rooted at an existing, writable directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        let attr = std::fs::metadata(&root).map_err(|e| {
            Error::backend(format!("root path {} is invalid: {}", root.display(), e))
        })?;

        if !attr.is_dir() {
            return Err(Error::backend(format!(
                "root path {} must be a directory",
                root.display()
            )));
        }

        if attr.permissions().readonly() {
            return Err(Error::backend(format!(
                "root directory {} must be writable",
                root.display()
            )));
        }

        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, uid: &str) -> Result<PathBuf, Error> {
        let safe = !uid.is_empty()
            && uid
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(Error::invalid(format!(
                "uid `{}` cannot be stored on disk",
                uid
            )));
        }
        Ok(self.root.join(format!("{}.json", uid)))
    }

    async fn load(&self, path: &Path) -> Result<Option<Entity>, Error> {
        debug!(path = %path.display(), "reading entity");
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(entity) => Ok(Some(entity)),
            _ => Err(Error::backend(format!(
                "{} does not hold a JSON object",
                path.display()
            ))),
        }
    }

    async fn store(&self, path: &Path, entity: &Entity) -> Result<(), Error> {
        debug!(path = %path.display(), "writing entity");
        let bytes = serde_json::to_vec_pretty(entity)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Entity>, Error> {
        let mut files = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                files.push(path);
            }
        }
        files.sort();

        let mut entities = Vec::with_capacity(files.len());
        for path in files {
            if let Some(entity) = self.load(&path).await? {
                entities.push(entity);
            }
        }
        Ok(entities)
    }
}

#[async_trait]
impl EntityStorage for JsonDirBackend {
    async fn select(
        &self,
        _ctx: &RequestContext,
        options: SelectOptions,
    ) -> Result<Vec<Entity>, Error> {
        let entities = self.load_all().await?;
        Ok(apply_select(entities.iter(), &options))
    }

    async fn read(&self, _ctx: &RequestContext, uid: &str) -> Result<Option<Entity>, Error> {
        let path = self.file_path(uid)?;
        self.load(&path).await
    }

    async fn create(&self, _ctx: &RequestContext, mut entity: Entity) -> Result<Entity, Error> {
        let uid = assign_uid(&mut entity)?;
        let path = self.file_path(&uid)?;
        if tokio::fs::try_exists(&path).await? {
            return Err(Error::Conflict { uid });
        }
        self.store(&path, &entity).await?;
        Ok(entity)
    }

    async fn update(
        &self,
        _ctx: &RequestContext,
        uid: &str,
        patch: Entity,
    ) -> Result<Entity, Error> {
        let path = self.file_path(uid)?;
        let mut entity = self
            .load(&path)
            .await?
            .ok_or_else(|| Error::not_found(uid))?;
        merge(&mut entity, patch);
        self.store(&path, &entity).await?;
        Ok(entity)
    }

    async fn delete(&self, _ctx: &RequestContext, uid: &str) -> Result<(), Error> {
        let path = self.file_path(uid)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::not_found(uid)),
            Err(e) => Err(e.into()),
        }
    }
}
