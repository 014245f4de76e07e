//! facetfs: uniform, permission-checked access to entity collections and a
//! hierarchical filesystem.
//!
//! - [`entity_store`]: composable storage stages over a terminal backend
//! - [`resolver`]: derive one representation of a resource from another
//! - [`fs`]: subjects, the permission gate, `stat`, and the file facade
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use facetfs::fs::{Actor, EntityFilesystem, Facet, FacadeContext, FileFacade, Filesystem, FsPath};
//!
//! # async fn demo() -> Result<(), facetfs::fs::Error> {
//! let backend = Arc::new(EntityFilesystem::in_memory(100)?);
//! backend.add_user("u1", "alice", None).await?;
//! backend.write_file("u1", &FsPath::parse("/hello.txt")?, "hi").await?;
//!
//! let fs = Arc::new(Filesystem::with_defaults(backend));
//! let facade = FileFacade::new(FacadeContext::new(fs, Actor::user("u1", "alice")));
//! facade.set(Facet::Path(FsPath::parse("/hello.txt")?));
//! assert_eq!(facade.buffer().await?, "hi");
//! # Ok(())
//! # }
//! ```

pub use facetfs_entity_store as entity_store;
pub use facetfs_fs as fs;
pub use facetfs_resolver as resolver;
