#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use facetfs_fs::{
    ByteStream, Capability, EntityFilesystem, Error, FilesystemBackend, FsEntry, FsPath,
    NodeLocator, Share, StorageLocator, Subdomain, UserInfo, Version,
};

/// Delegates to an [`EntityFilesystem`], counting calls and optionally
/// failing the version lookup.
pub struct CountingBackend {
    pub inner: Arc<EntityFilesystem>,
    pub enrichments: AtomicUsize,
    pub opens: AtomicUsize,
    pub fail_versions: bool,
}

impl CountingBackend {
    pub fn new(inner: Arc<EntityFilesystem>) -> Self {
        Self {
            inner,
            enrichments: AtomicUsize::new(0),
            opens: AtomicUsize::new(0),
            fail_versions: false,
        }
    }

    pub fn enrichments(&self) -> usize {
        self.enrichments.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn enriched(&self) {
        self.enrichments.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FilesystemBackend for CountingBackend {
    async fn entry(&self, locator: &NodeLocator) -> Result<Option<FsEntry>, Error> {
        self.inner.entry(locator).await
    }

    async fn owner(&self, entry: &FsEntry) -> Result<Option<UserInfo>, Error> {
        self.inner.owner(entry).await
    }

    async fn size(&self, entry: &FsEntry) -> Result<u64, Error> {
        self.enriched();
        self.inner.size(entry).await
    }

    async fn subdomains(&self, entry: &FsEntry) -> Result<Vec<Subdomain>, Error> {
        self.enriched();
        self.inner.subdomains(entry).await
    }

    async fn shares(&self, entry: &FsEntry) -> Result<Vec<Share>, Error> {
        self.enriched();
        self.inner.shares(entry).await
    }

    async fn grants(
        &self,
        subject_uid: &str,
        grantee_uid: &str,
    ) -> Result<Vec<Capability>, Error> {
        self.inner.grants(subject_uid, grantee_uid).await
    }

    async fn versions(&self, entry: &FsEntry) -> Result<Vec<Version>, Error> {
        self.enriched();
        if self.fail_versions {
            return Err(Error::backend("version store unavailable"));
        }
        self.inner.versions(entry).await
    }

    async fn is_empty(&self, entry: &FsEntry) -> Result<bool, Error> {
        self.enriched();
        self.inner.is_empty(entry).await
    }

    async fn read_content(&self, entry: &FsEntry) -> Result<ByteStream, Error> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        // let concurrent callers pile up behind this open
        tokio::task::yield_now().await;
        self.inner.read_content(entry).await
    }

    async fn storage_locator(&self, entry: &FsEntry) -> Result<Option<StorageLocator>, Error> {
        self.inner.storage_locator(entry).await
    }
}

pub fn p(path: &str) -> FsPath {
    FsPath::parse(path).unwrap()
}

/// alice owns `/home/alice` with a file and a subdirectory; bob and carol
/// exist but hold nothing.
pub struct World {
    pub fs: Arc<EntityFilesystem>,
    pub home: FsEntry,
    pub file: FsEntry,
    pub docs: FsEntry,
}

pub async fn world() -> World {
    let fs = Arc::new(EntityFilesystem::in_memory(100).unwrap());
    fs.add_user("u-alice", "alice", Some("alice@example.com".into()))
        .await
        .unwrap();
    fs.add_user("u-bob", "bob", None).await.unwrap();
    fs.add_user("u-carol", "carol", None).await.unwrap();

    fs.mkdir("u-alice", &p("/home")).await.unwrap();
    let home = fs.mkdir("u-alice", &p("/home/alice")).await.unwrap();
    let file = fs
        .write_file("u-alice", &p("/home/alice/notes.txt"), "remember the milk")
        .await
        .unwrap();
    let docs = fs.mkdir("u-alice", &p("/home/alice/docs")).await.unwrap();
    fs.write_file("u-alice", &p("/home/alice/docs/a.md"), "# a")
        .await
        .unwrap();

    World {
        fs,
        home,
        file,
        docs,
    }
}
