//! The `stat` operation.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::actor::{Actor, Capability};
use crate::acl::PermissionGate;
use crate::content_type::ContentTypes;
use crate::entry::SafeEntry;
use crate::subject::Subject;
use crate::Error;

/// Which optional fields to compute. Everything is off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatOptions {
    pub return_size: bool,
    pub return_subdomains: bool,
    /// Share grants on the node.
    pub return_permissions: bool,
    pub return_versions: bool,
}

/// Describe a node to an actor allowed to read it.
///
/// Runs, in order and stopping at the first failure:
///
/// 1. fetch the record ([`Error::SubjectNotFound`] if there is none)
/// 2. fetch the owner
/// 3. the policy check for `read` (a sanitized denial)
/// 4. the legacy check for `stat` ([`Error::Forbidden`])
///
/// Only then are the requested enrichments fetched, concurrently. A failed
/// enrichment leaves its field out and is listed in
/// [`SafeEntry::partial_failures`]; it never fails the operation.
pub struct Stat {
    gate: Arc<PermissionGate>,
    content_types: Arc<dyn ContentTypes>,
}

impl Stat {
    pub fn new(gate: Arc<PermissionGate>, content_types: Arc<dyn ContentTypes>) -> Self {
        Self {
            gate,
            content_types,
        }
    }

    pub async fn run(
        &self,
        actor: &Actor,
        subject: &Subject,
        options: StatOptions,
    ) -> Result<SafeEntry, Error> {
        let entry = subject.require_entry().await?;
        subject.fetch_owner().await?;

        self.gate.enforce(actor, subject, &Capability::READ).await?;
        self.gate
            .enforce_legacy(actor, subject, &Capability::STAT)
            .await?;

        debug!(actor = %actor, path = %entry.path, ?options, "stat");

        let failures = futures::join!(
            enrich(options.return_size, "size", subject.fetch_size()),
            enrich(
                options.return_subdomains,
                "subdomains",
                subject.fetch_subdomains()
            ),
            enrich(
                options.return_permissions,
                "permissions",
                subject.fetch_shares()
            ),
            enrich(
                options.return_versions,
                "versions",
                subject.fetch_versions()
            ),
            enrich(entry.is_dir, "is_empty", subject.fetch_is_empty()),
        );

        let mut safe = subject.safe_entry(self.content_types.as_ref()).await?;
        safe.partial_failures = [failures.0, failures.1, failures.2, failures.3, failures.4]
            .into_iter()
            .flatten()
            .collect();
        Ok(safe)
    }
}

/// Run one best-effort fetch; returns the field name if it failed.
async fn enrich<T>(
    wanted: bool,
    field: &'static str,
    fetch: impl Future<Output = Result<T, Error>>,
) -> Option<&'static str> {
    if !wanted {
        return None;
    }
    match fetch.await {
        Ok(_) => None,
        Err(e) => {
            let failure = Error::PartialEnrichmentFailure {
                field,
                message: e.to_string(),
            };
            warn!(error = %failure, "enrichment failed");
            Some(field)
        }
    }
}
