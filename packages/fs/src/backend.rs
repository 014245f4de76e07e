//! The storage side of the filesystem.

use std::sync::Arc;

use async_trait::async_trait;

use crate::actor::Capability;
use crate::entry::{FsEntry, NodeLocator, Share, StorageLocator, Subdomain, UserInfo, Version};
use crate::stream::ByteStream;
use crate::Error;

/// Lookups a [`Subject`](crate::Subject) and the permission layer rely on.
///
/// None of these check permissions; callers go through the
/// [`PermissionGate`](crate::PermissionGate) first.
#[async_trait]
pub trait FilesystemBackend: Send + Sync {
    /// Fetch a node's record, `None` when nothing lives at the locator.
    async fn entry(&self, locator: &NodeLocator) -> Result<Option<FsEntry>, Error>;

    async fn owner(&self, entry: &FsEntry) -> Result<Option<UserInfo>, Error>;

    /// Content size; the recursive total for a directory.
    async fn size(&self, entry: &FsEntry) -> Result<u64, Error>;

    /// Sites rooted at this directory.
    async fn subdomains(&self, entry: &FsEntry) -> Result<Vec<Subdomain>, Error>;

    /// Grants on this node to other users.
    async fn shares(&self, entry: &FsEntry) -> Result<Vec<Share>, Error>;

    /// Capabilities held by `grantee_uid` on the node `subject_uid`.
    async fn grants(&self, subject_uid: &str, grantee_uid: &str)
        -> Result<Vec<Capability>, Error>;

    /// Version history, oldest first.
    async fn versions(&self, entry: &FsEntry) -> Result<Vec<Version>, Error>;

    /// Whether a directory has no children.
    async fn is_empty(&self, entry: &FsEntry) -> Result<bool, Error>;

    async fn read_content(&self, entry: &FsEntry) -> Result<ByteStream, Error>;

    async fn storage_locator(&self, entry: &FsEntry) -> Result<Option<StorageLocator>, Error>;
}

#[async_trait]
impl<T: FilesystemBackend + ?Sized> FilesystemBackend for Arc<T> {
    async fn entry(&self, locator: &NodeLocator) -> Result<Option<FsEntry>, Error> {
        (**self).entry(locator).await
    }

    async fn owner(&self, entry: &FsEntry) -> Result<Option<UserInfo>, Error> {
        (**self).owner(entry).await
    }

    async fn size(&self, entry: &FsEntry) -> Result<u64, Error> {
        (**self).size(entry).await
    }

    async fn subdomains(&self, entry: &FsEntry) -> Result<Vec<Subdomain>, Error> {
        (**self).subdomains(entry).await
    }

    async fn shares(&self, entry: &FsEntry) -> Result<Vec<Share>, Error> {
        (**self).shares(entry).await
    }

    async fn grants(
        &self,
        subject_uid: &str,
        grantee_uid: &str,
    ) -> Result<Vec<Capability>, Error> {
        (**self).grants(subject_uid, grantee_uid).await
    }

    async fn versions(&self, entry: &FsEntry) -> Result<Vec<Version>, Error> {
        (**self).versions(entry).await
    }

    async fn is_empty(&self, entry: &FsEntry) -> Result<bool, Error> {
        (**self).is_empty(entry).await
    }

    async fn read_content(&self, entry: &FsEntry) -> Result<ByteStream, Error> {
        (**self).read_content(entry).await
    }

    async fn storage_locator(&self, entry: &FsEntry) -> Result<Option<StorageLocator>, Error> {
        (**self).storage_locator(entry).await
    }
}
