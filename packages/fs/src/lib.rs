//! A permission-gated filesystem over entity storage.
//!
//! A filesystem node is a [`Subject`]: a handle that fetches its record,
//! owner and enrichments lazily, each at most once. High-level operations
//! such as [`Stat`] resolve the subject, pass it through the
//! [`PermissionGate`], and only then enrich and sanitize it.
//!
//! A [`FileFacade`] holds several interchangeable representations of one
//! file (uid, path, node, stream, buffer, web URL, data URL) and derives
//! whichever is asked for from whichever is known.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use facetfs_fs::{Actor, EntityFilesystem, Filesystem, FsPath, NodeLocator, StatOptions};
//!
//! # async fn demo() -> Result<(), facetfs_fs::Error> {
//! let backend = Arc::new(EntityFilesystem::in_memory(100)?);
//! let alice = backend.add_user("u-alice", "alice", None).await?;
//! let file = backend
//!     .write_file(&alice.uid, &FsPath::parse("/notes.txt")?, "hello")
//!     .await?;
//!
//! let fs = Filesystem::with_defaults(backend);
//! let actor = Actor::user(alice.uid, alice.username);
//! let stat = fs
//!     .stat(&actor, NodeLocator::Uid(file.uid), StatOptions::default())
//!     .await?;
//! assert_eq!(stat.content_type.as_deref(), Some("text/plain; charset=utf-8"));
//! # Ok(())
//! # }
//! ```

mod acl;
mod actor;
mod backend;
mod config;
mod content_type;
mod entity_fs;
mod entry;
mod error;
mod facade;
mod path;
mod service;
mod stat;
mod stream;
mod subject;

pub use acl::{
    ChkpermTable, Decision, Denial, LegacyPermissions, OwnerSharePolicy, PermissionGate,
    PolicyEngine,
};
pub use actor::{Actor, Capability, UserRef};
pub use backend::FilesystemBackend;
pub use config::{CollectionConfig, FilesystemConfig, StorageConfig};
pub use content_type::{ContentTypes, ExtensionContentTypes};
pub use entity_fs::EntityFilesystem;
pub use entry::{
    FsEntry, NodeLocator, SafeEntry, SafeOwner, SafeSubdomain, Share, StorageLocator, Subdomain,
    UserInfo, Version,
};
pub use error::{ApiError, Error};
pub use facade::{FacadeContext, Facet, FacetKind, FileFacade};
pub use path::{FsPath, PathError};
pub use service::Filesystem;
pub use stat::{Stat, StatOptions};
pub use stream::{ByteStream, ChunkStream};
pub use subject::Subject;
