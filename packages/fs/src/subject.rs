//! Lazily populated handles on filesystem nodes.

use std::fmt;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::backend::FilesystemBackend;
use crate::content_type::ContentTypes;
use crate::entry::{
    FsEntry, NodeLocator, SafeEntry, SafeOwner, SafeSubdomain, Share, Subdomain, UserInfo, Version,
};
use crate::Error;

/// A node an operation acts on.
///
/// Created per request from whatever the caller knows (a uid, a path, or an
/// already-fetched record). Every field is fetched from the backend at most
/// once per instance; concurrent requests for the same field share one
/// fetch, and a failed fetch is retried on the next request.
pub struct Subject {
    locator: NodeLocator,
    backend: Arc<dyn FilesystemBackend>,
    entry: OnceCell<Option<FsEntry>>,
    owner: OnceCell<UserInfo>,
    size: OnceCell<u64>,
    subdomains: OnceCell<Vec<Subdomain>>,
    shares: OnceCell<Vec<Share>>,
    versions: OnceCell<Vec<Version>>,
    is_empty: OnceCell<bool>,
}

impl Subject {
    pub fn new(backend: Arc<dyn FilesystemBackend>, locator: NodeLocator) -> Self {
        Self {
            locator,
            backend,
            entry: OnceCell::new(),
            owner: OnceCell::new(),
            size: OnceCell::new(),
            subdomains: OnceCell::new(),
            shares: OnceCell::new(),
            versions: OnceCell::new(),
            is_empty: OnceCell::new(),
        }
    }

    /// A subject whose record is already known.
    pub fn from_entry(backend: Arc<dyn FilesystemBackend>, entry: FsEntry) -> Self {
        let mut subject = Self::new(backend, NodeLocator::Uid(entry.uid.clone()));
        subject.entry = OnceCell::new_with(Some(Some(entry)));
        subject
    }

    pub fn locator(&self) -> &NodeLocator {
        &self.locator
    }

    pub async fn fetch_entry(&self) -> Result<Option<&FsEntry>, Error> {
        let entry = self
            .entry
            .get_or_try_init(|| self.backend.entry(&self.locator))
            .await?;
        Ok(entry.as_ref())
    }

    pub async fn exists(&self) -> Result<bool, Error> {
        Ok(self.fetch_entry().await?.is_some())
    }

    pub async fn require_entry(&self) -> Result<&FsEntry, Error> {
        self.fetch_entry().await?.ok_or(Error::SubjectNotFound)
    }

    /// The record, if it has been fetched already.
    pub fn cached_entry(&self) -> Option<&FsEntry> {
        self.entry.get().and_then(Option::as_ref)
    }

    pub async fn fetch_owner(&self) -> Result<&UserInfo, Error> {
        let entry = self.require_entry().await?;
        self.owner
            .get_or_try_init(|| async {
                self.backend.owner(entry).await?.ok_or_else(|| {
                    Error::backend(format!(
                        "owner {} of {} does not exist",
                        entry.owner_uid, entry.uid
                    ))
                })
            })
            .await
    }

    pub async fn fetch_size(&self) -> Result<u64, Error> {
        let entry = self.require_entry().await?;
        self.size
            .get_or_try_init(|| self.backend.size(entry))
            .await
            .copied()
    }

    pub async fn fetch_subdomains(&self) -> Result<&[Subdomain], Error> {
        let entry = self.require_entry().await?;
        let subdomains = self
            .subdomains
            .get_or_try_init(|| self.backend.subdomains(entry))
            .await?;
        Ok(subdomains)
    }

    pub async fn fetch_shares(&self) -> Result<&[Share], Error> {
        let entry = self.require_entry().await?;
        let shares = self
            .shares
            .get_or_try_init(|| self.backend.shares(entry))
            .await?;
        Ok(shares)
    }

    pub async fn fetch_versions(&self) -> Result<&[Version], Error> {
        let entry = self.require_entry().await?;
        let versions = self
            .versions
            .get_or_try_init(|| self.backend.versions(entry))
            .await?;
        Ok(versions)
    }

    pub async fn fetch_is_empty(&self) -> Result<bool, Error> {
        let entry = self.require_entry().await?;
        self.is_empty
            .get_or_try_init(|| self.backend.is_empty(entry))
            .await
            .copied()
    }

    /// The sanitized view: identity fields, the owner, a content type, and
    /// whichever enrichments have been fetched so far.
    pub async fn safe_entry(&self, content_types: &dyn ContentTypes) -> Result<SafeEntry, Error> {
        let entry = self.require_entry().await?;
        let owner = self.fetch_owner().await?;
        let content_type = if entry.is_dir {
            None
        } else {
            content_types.content_type(&entry.name)
        };

        Ok(SafeEntry {
            uid: entry.uid.clone(),
            name: entry.name.clone(),
            path: entry.path.clone(),
            is_dir: entry.is_dir,
            content_type,
            owner: SafeOwner {
                uid: owner.uid.clone(),
                username: owner.username.clone(),
            },
            size: self.size.get().copied(),
            subdomains: self.subdomains.get().map(|subdomains| {
                subdomains
                    .iter()
                    .map(|s| SafeSubdomain {
                        uid: s.uid.clone(),
                        subdomain: s.subdomain.clone(),
                    })
                    .collect()
            }),
            permissions: self.shares.get().cloned(),
            versions: self.versions.get().cloned(),
            is_empty: self.is_empty.get().copied(),
            partial_failures: Vec::new(),
        })
    }
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("locator", &self.locator)
            .field("entry", &self.entry.get())
            .finish_non_exhaustive()
    }
}
