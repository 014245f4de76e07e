//! The filesystem as collaborators see it.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::acl::{OwnerSharePolicy, PermissionGate};
use crate::actor::{Actor, Capability};
use crate::backend::FilesystemBackend;
use crate::content_type::{ContentTypes, ExtensionContentTypes};
use crate::entry::{NodeLocator, SafeEntry};
use crate::stat::{Stat, StatOptions};
use crate::stream::ByteStream;
use crate::subject::Subject;
use crate::Error;

/// High-level, permission-checked operations over a backend.
pub struct Filesystem {
    backend: Arc<dyn FilesystemBackend>,
    gate: Arc<PermissionGate>,
    stat: Stat,
}

impl Filesystem {
    pub fn new(
        backend: Arc<dyn FilesystemBackend>,
        gate: Arc<PermissionGate>,
        content_types: Arc<dyn ContentTypes>,
    ) -> Self {
        Self {
            stat: Stat::new(gate.clone(), content_types),
            backend,
            gate,
        }
    }

    /// Ownership-and-shares policy, no legacy table, built-in content types.
    pub fn with_defaults(backend: Arc<dyn FilesystemBackend>) -> Self {
        let gate = PermissionGate::new(Arc::new(OwnerSharePolicy::new(backend.clone())));
        Self::new(
            backend,
            Arc::new(gate),
            Arc::new(ExtensionContentTypes::default()),
        )
    }

    pub fn backend(&self) -> &Arc<dyn FilesystemBackend> {
        &self.backend
    }

    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    /// A handle on the node at `locator`. Nothing is fetched yet.
    pub fn node(&self, locator: NodeLocator) -> Subject {
        Subject::new(self.backend.clone(), locator)
    }

    pub async fn stat(
        &self,
        actor: &Actor,
        locator: NodeLocator,
        options: StatOptions,
    ) -> Result<SafeEntry, Error> {
        let subject = self.node(locator);
        self.stat.run(actor, &subject, options).await
    }

    /// Open a file's content on behalf of `actor`.
    pub async fn read(&self, actor: &Actor, subject: &Subject) -> Result<ByteStream, Error> {
        let entry = subject.require_entry().await?;
        self.gate
            .authorize(actor, subject, &Capability::READ)
            .await?;
        debug!(actor = %actor, path = %entry.path, "read");
        self.backend.read_content(entry).await
    }
}

impl fmt::Debug for Filesystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filesystem").finish_non_exhaustive()
    }
}
