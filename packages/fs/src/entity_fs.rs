//! A filesystem backend built from entity storage pipelines.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use facetfs_entity_store::{
    json, Entity, EntityStorage, Predicate, RequestContext, SelectOptions, Value,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::actor::Capability;
use crate::backend::FilesystemBackend;
use crate::config::FilesystemConfig;
use crate::entry::{
    decode, encode, FsEntry, NodeLocator, Share, StorageLocator, Subdomain, UserInfo, Version,
};
use crate::path::FsPath;
use crate::stream::ByteStream;
use crate::Error;

/// Filesystem records kept in entity collections, with file content held in
/// memory.
///
/// Lookups run with a system [`RequestContext`]: deciding who may see what
/// is the permission gate's job, not the collections'.
pub struct EntityFilesystem {
    entries: Arc<dyn EntityStorage>,
    users: Arc<dyn EntityStorage>,
    shares: Arc<dyn EntityStorage>,
    subdomains: Arc<dyn EntityStorage>,
    versions: Arc<dyn EntityStorage>,
    content: RwLock<HashMap<String, Bytes>>,
    page_size: usize,
}

impl EntityFilesystem {
    pub fn from_config(config: &FilesystemConfig) -> Result<Self, Error> {
        if config.page_size == 0 {
            return Err(Error::Storage(facetfs_entity_store::Error::invalid(
                "page_size must be at least 1",
            )));
        }
        Ok(Self {
            entries: config.entries.build()?,
            users: config.users.build()?,
            shares: config.shares.build()?,
            subdomains: config.subdomains.build()?,
            versions: config.versions.build()?,
            content: RwLock::new(HashMap::new()),
            page_size: config.page_size,
        })
    }

    /// Memory-backed collections whose selects are clamped to `max_limit`.
    pub fn in_memory(max_limit: usize) -> Result<Self, Error> {
        Self::from_config(&FilesystemConfig::in_memory(max_limit))
    }

    pub fn entries(&self) -> &Arc<dyn EntityStorage> {
        &self.entries
    }

    pub async fn add_user(
        &self,
        uid: impl Into<String>,
        username: impl Into<String>,
        email: Option<String>,
    ) -> Result<UserInfo, Error> {
        let user = UserInfo {
            uid: uid.into(),
            username: username.into(),
            email,
        };
        self.users.create(&ctx(), encode(&user)?).await?;
        Ok(user)
    }

    /// Create a directory. Its parent must already exist unless it is the
    /// root.
    pub async fn mkdir(&self, owner_uid: &str, path: &FsPath) -> Result<FsEntry, Error> {
        self.create_node(owner_uid, path, true, None).await
    }

    pub async fn write_file(
        &self,
        owner_uid: &str,
        path: &FsPath,
        content: impl Into<Bytes>,
    ) -> Result<FsEntry, Error> {
        let content = content.into();
        let entry = self
            .create_node(owner_uid, path, false, Some(content.len() as u64))
            .await?;
        self.content
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry.uid.clone(), content);
        Ok(entry)
    }

    pub async fn share(
        &self,
        subject_uid: &str,
        grantee_uid: &str,
        permission: Capability,
    ) -> Result<Share, Error> {
        let share = Share {
            subject_uid: subject_uid.to_string(),
            grantee_uid: grantee_uid.to_string(),
            permission,
        };
        self.shares.create(&ctx(), encode(&share)?).await?;
        Ok(share)
    }

    pub async fn add_version(&self, version: Version) -> Result<Version, Error> {
        self.versions.create(&ctx(), encode(&version)?).await?;
        Ok(version)
    }

    pub async fn add_subdomain(&self, subdomain: Subdomain) -> Result<Subdomain, Error> {
        self.subdomains.create(&ctx(), encode(&subdomain)?).await?;
        Ok(subdomain)
    }

    /// Record that a file's content also lives in an object store bucket.
    pub async fn place_in_bucket(
        &self,
        uid: &str,
        bucket: &str,
        region: &str,
    ) -> Result<FsEntry, Error> {
        let patch = object(json!({"bucket": bucket, "bucket_region": region}));
        let entity = self.entries.update(&ctx(), uid, patch).await?;
        FsEntry::from_entity(entity)
    }

    async fn create_node(
        &self,
        owner_uid: &str,
        path: &FsPath,
        is_dir: bool,
        size: Option<u64>,
    ) -> Result<FsEntry, Error> {
        let Some(name) = path.name().map(str::to_string) else {
            return Err(Error::Storage(facetfs_entity_store::Error::invalid(
                "cannot create the root",
            )));
        };

        let parent_uid = match path.parent() {
            Some(parent) if !parent.is_root() => {
                let parent = self
                    .find_by_path(&parent)
                    .await?
                    .ok_or(Error::SubjectNotFound)?;
                if !parent.is_dir {
                    return Err(Error::Storage(facetfs_entity_store::Error::invalid(
                        format!("{} is not a directory", parent.path),
                    )));
                }
                Some(parent.uid)
            }
            _ => None,
        };

        if self.find_by_path(path).await?.is_some() {
            return Err(Error::Storage(facetfs_entity_store::Error::Conflict {
                uid: path.to_string(),
            }));
        }

        let entity = object(json!({
            "path": path,
            "name": name,
            "parent_uid": parent_uid,
            "owner_uid": owner_uid,
            "is_dir": is_dir,
            "size": size,
        }));
        let created = self.entries.create(&ctx(), entity).await?;
        debug!(path = %path, is_dir, "created node");
        FsEntry::from_entity(created)
    }

    async fn find_by_path(&self, path: &FsPath) -> Result<Option<FsEntry>, Error> {
        let rows = self
            .entries
            .select(
                &ctx(),
                SelectOptions::new()
                    .with_predicate(Predicate::eq("path", path.to_string()))
                    .with_limit(1),
            )
            .await?;
        rows.into_iter().next().map(FsEntry::from_entity).transpose()
    }

    /// Every row matching `predicate`, fetched a page at a time.
    async fn select_all<T: DeserializeOwned>(
        &self,
        storage: &Arc<dyn EntityStorage>,
        predicate: Predicate,
    ) -> Result<Vec<T>, Error> {
        let mut out = Vec::new();
        let mut offset = 0;
        loop {
            let page = storage
                .select(
                    &ctx(),
                    SelectOptions::new()
                        .with_predicate(predicate.clone())
                        .with_limit(self.page_size)
                        .with_offset(offset),
                )
                .await?;
            // a stage may clamp the page below page_size, so only an empty
            // page marks the end
            if page.is_empty() {
                break;
            }
            offset += page.len();
            for entity in page {
                out.push(decode(entity)?);
            }
        }
        Ok(out)
    }
}

fn ctx() -> RequestContext {
    RequestContext::system()
}

fn object(value: Value) -> Entity {
    match value {
        Value::Object(map) => map,
        _ => Entity::new(),
    }
}

#[async_trait]
impl FilesystemBackend for EntityFilesystem {
    async fn entry(&self, locator: &NodeLocator) -> Result<Option<FsEntry>, Error> {
        match locator {
            NodeLocator::Uid(uid) => self
                .entries
                .read(&ctx(), uid)
                .await?
                .map(FsEntry::from_entity)
                .transpose(),
            NodeLocator::Path(path) => self.find_by_path(path).await,
        }
    }

    async fn owner(&self, entry: &FsEntry) -> Result<Option<UserInfo>, Error> {
        self.users
            .read(&ctx(), &entry.owner_uid)
            .await?
            .map(decode)
            .transpose()
    }

    async fn size(&self, entry: &FsEntry) -> Result<u64, Error> {
        if !entry.is_dir {
            return Ok(entry.size.unwrap_or(0));
        }

        let mut total = 0;
        let mut pending = vec![entry.uid.clone()];
        while let Some(dir_uid) = pending.pop() {
            let children: Vec<FsEntry> = self
                .select_all(&self.entries, Predicate::eq("parent_uid", dir_uid))
                .await?;
            for child in children {
                if child.is_dir {
                    pending.push(child.uid);
                } else {
                    total += child.size.unwrap_or(0);
                }
            }
        }
        Ok(total)
    }

    async fn subdomains(&self, entry: &FsEntry) -> Result<Vec<Subdomain>, Error> {
        self.select_all(
            &self.subdomains,
            Predicate::eq("root_dir_uid", entry.uid.as_str())
                .and("owner_uid", entry.owner_uid.as_str()),
        )
        .await
    }

    async fn shares(&self, entry: &FsEntry) -> Result<Vec<Share>, Error> {
        self.select_all(&self.shares, Predicate::eq("subject_uid", entry.uid.as_str()))
            .await
    }

    async fn grants(
        &self,
        subject_uid: &str,
        grantee_uid: &str,
    ) -> Result<Vec<Capability>, Error> {
        let shares: Vec<Share> = self
            .select_all(
                &self.shares,
                Predicate::eq("subject_uid", subject_uid).and("grantee_uid", grantee_uid),
            )
            .await?;
        Ok(shares.into_iter().map(|s| s.permission).collect())
    }

    async fn versions(&self, entry: &FsEntry) -> Result<Vec<Version>, Error> {
        let mut versions: Vec<Version> = self
            .select_all(&self.versions, Predicate::eq("file_uid", entry.uid.as_str()))
            .await?;
        versions.sort_by_key(|v| v.timestamp);
        Ok(versions)
    }

    async fn is_empty(&self, entry: &FsEntry) -> Result<bool, Error> {
        let children = self
            .entries
            .select(
                &ctx(),
                SelectOptions::new()
                    .with_predicate(Predicate::eq("parent_uid", entry.uid.as_str()))
                    .with_limit(1),
            )
            .await?;
        Ok(children.is_empty())
    }

    async fn read_content(&self, entry: &FsEntry) -> Result<ByteStream, Error> {
        if entry.is_dir {
            return Err(Error::Storage(facetfs_entity_store::Error::invalid(format!(
                "{} is a directory",
                entry.path
            ))));
        }
        debug!(uid = %entry.uid, "opening content");
        let content = self
            .content
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&entry.uid)
            .cloned()
            .ok_or_else(|| Error::backend(format!("content of {} is missing", entry.uid)))?;
        Ok(ByteStream::from_bytes(content))
    }

    async fn storage_locator(&self, entry: &FsEntry) -> Result<Option<StorageLocator>, Error> {
        Ok(match (&entry.bucket, &entry.bucket_region) {
            (Some(bucket), Some(region)) => Some(StorageLocator {
                bucket: bucket.clone(),
                region: region.clone(),
                key: entry.uid.clone(),
            }),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> FsPath {
        FsPath::parse(s).unwrap()
    }

    async fn fixture() -> EntityFilesystem {
        let fs = EntityFilesystem::in_memory(100).unwrap();
        fs.add_user("u1", "alice", None).await.unwrap();
        fs.mkdir("u1", &p("/home")).await.unwrap();
        fs.mkdir("u1", &p("/home/docs")).await.unwrap();
        fs.write_file("u1", &p("/home/a.txt"), "hello").await.unwrap();
        fs.write_file("u1", &p("/home/docs/b.txt"), "world!").await.unwrap();
        fs
    }

    #[tokio::test]
    async fn entries_resolve_by_path_and_uid() {
        let fs = fixture().await;
        let by_path = fs
            .entry(&NodeLocator::Path(p("/home/a.txt")))
            .await
            .unwrap()
            .unwrap();
        let by_uid = fs
            .entry(&NodeLocator::Uid(by_path.uid.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_path, by_uid);
        assert_eq!(by_path.name, "a.txt");
        assert!(fs
            .entry(&NodeLocator::Path(p("/nope")))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn directory_size_is_recursive() {
        let fs = fixture().await;
        let home = fs.find_by_path(&p("/home")).await.unwrap().unwrap();
        assert_eq!(fs.size(&home).await.unwrap(), 11);
    }

    #[tokio::test]
    async fn paging_survives_a_small_clamp() {
        let fs = EntityFilesystem::in_memory(2).unwrap();
        fs.mkdir("u1", &p("/d")).await.unwrap();
        for i in 0..5 {
            fs.write_file("u1", &p(&format!("/d/{}", i)), vec![0u8; 3])
                .await
                .unwrap();
        }
        let dir = fs.find_by_path(&p("/d")).await.unwrap().unwrap();
        assert_eq!(fs.size(&dir).await.unwrap(), 15);
    }

    #[tokio::test]
    async fn emptiness() {
        let fs = fixture().await;
        let docs = fs.find_by_path(&p("/home/docs")).await.unwrap().unwrap();
        assert!(!fs.is_empty(&docs).await.unwrap());
        let empty = fs.mkdir("u1", &p("/home/empty")).await.unwrap();
        assert!(fs.is_empty(&empty).await.unwrap());
    }

    #[tokio::test]
    async fn nodes_need_an_existing_parent_and_a_free_path() {
        let fs = fixture().await;
        assert_eq!(
            fs.mkdir("u1", &p("/missing/child")).await.unwrap_err(),
            Error::SubjectNotFound
        );
        assert!(matches!(
            fs.write_file("u1", &p("/home/a.txt"), "again").await,
            Err(Error::Storage(facetfs_entity_store::Error::Conflict { .. }))
        ));
        assert!(fs.write_file("u1", &p("/home/a.txt/x"), "x").await.is_err());
    }

    #[tokio::test]
    async fn content_reads_back() {
        let fs = fixture().await;
        let file = fs.find_by_path(&p("/home/a.txt")).await.unwrap().unwrap();
        let stream = fs.read_content(&file).await.unwrap();
        assert_eq!(stream.collect().await.unwrap(), "hello");

        let dir = fs.find_by_path(&p("/home")).await.unwrap().unwrap();
        assert!(fs.read_content(&dir).await.is_err());
    }

    #[tokio::test]
    async fn grants_and_shares() {
        let fs = fixture().await;
        let file = fs.find_by_path(&p("/home/a.txt")).await.unwrap().unwrap();
        fs.share(&file.uid, "u2", Capability::READ).await.unwrap();
        fs.share(&file.uid, "u3", Capability::WRITE).await.unwrap();

        assert_eq!(
            fs.grants(&file.uid, "u2").await.unwrap(),
            vec![Capability::READ]
        );
        assert!(fs.grants(&file.uid, "u9").await.unwrap().is_empty());
        assert_eq!(fs.shares(&file).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn versions_sorted_oldest_first() {
        let fs = fixture().await;
        let file = fs.find_by_path(&p("/home/a.txt")).await.unwrap().unwrap();
        for (id, ts) in [("v2", 20), ("v1", 10)] {
            fs.add_version(Version {
                file_uid: file.uid.clone(),
                version_id: id.into(),
                timestamp: ts,
                author_uid: None,
            })
            .await
            .unwrap();
        }
        let ids: Vec<String> = fs
            .versions(&file)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.version_id)
            .collect();
        assert_eq!(ids, vec!["v1", "v2"]);
    }

    #[tokio::test]
    async fn storage_locator_needs_bucket_and_region() {
        let fs = fixture().await;
        let file = fs.find_by_path(&p("/home/a.txt")).await.unwrap().unwrap();
        assert!(fs.storage_locator(&file).await.unwrap().is_none());

        let placed = fs
            .place_in_bucket(&file.uid, "files", "us-west-2")
            .await
            .unwrap();
        let locator = fs.storage_locator(&placed).await.unwrap().unwrap();
        assert_eq!(locator.bucket, "files");
        assert_eq!(locator.key, file.uid);
    }

    #[tokio::test]
    async fn owner_lookup() {
        let fs = fixture().await;
        let file = fs.find_by_path(&p("/home/a.txt")).await.unwrap().unwrap();
        assert_eq!(fs.owner(&file).await.unwrap().unwrap().username, "alice");
    }
}
