//! Capability checks in front of every filesystem operation.
//!
//! Two predicates guard an operation and both must pass:
//!
//! - a [`PolicyEngine`], the access-control model proper
//! - [`LegacyPermissions`], the older per-user permission table, still
//!   consulted until every capability is modelled by the policy engine
//!
//! A policy denial is turned into a sanitized error before it leaves the
//! gate; the raw reason is only logged.

use std::sync::Arc;

use async_trait::async_trait;
use facetfs_entity_store::{
    EntityStorage, Predicate, RequestContext, SelectOptions, Value,
};
use tracing::{debug, warn};

use crate::actor::{Actor, Capability};
use crate::backend::FilesystemBackend;
use crate::entry::{FsEntry, NodeLocator};
use crate::subject::Subject;
use crate::Error;

/// Why a check failed. Never shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub capability: Capability,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

#[async_trait]
pub trait PolicyEngine: Send + Sync {
    async fn check(
        &self,
        actor: &Actor,
        subject: &Subject,
        capability: &Capability,
    ) -> Result<Decision, Error>;

    /// The error a caller sees for `denial`.
    ///
    /// Must not reveal that the subject exists unless the actor is entitled
    /// to know it.
    async fn safe_denial(&self, actor: &Actor, subject: &Subject, denial: &Denial) -> Error;
}

/// Ownership and share grants.
///
/// The system actor may do anything. A user may do anything to what they
/// own, directly or through an owned ancestor directory, and may use a
/// capability shared with them on the node or on any ancestor. Apps act
/// with the rights of their user.
pub struct OwnerSharePolicy {
    backend: Arc<dyn FilesystemBackend>,
}

/// Capabilities that reveal a node exists.
const VISIBILITY: [Capability; 4] = [
    Capability::READ,
    Capability::STAT,
    Capability::LIST,
    Capability::WRITE,
];

impl OwnerSharePolicy {
    pub fn new(backend: Arc<dyn FilesystemBackend>) -> Self {
        Self { backend }
    }

    /// The subject's record followed by its ancestors', nearest first.
    async fn lineage(&self, entry: &FsEntry) -> Result<Vec<FsEntry>, Error> {
        let mut lineage = vec![entry.clone()];
        for path in entry.path.ancestors() {
            if path.is_root() {
                break;
            }
            if let Some(ancestor) = self.backend.entry(&NodeLocator::Path(path)).await? {
                lineage.push(ancestor);
            }
        }
        Ok(lineage)
    }

    /// Whether `user_uid` holds any of `capabilities` somewhere in `lineage`.
    async fn holds_any(
        &self,
        lineage: &[FsEntry],
        user_uid: &str,
        capabilities: &[Capability],
    ) -> Result<bool, Error> {
        for node in lineage {
            if node.owner_uid == user_uid {
                return Ok(true);
            }
            let grants = self.backend.grants(&node.uid, user_uid).await?;
            if grants.iter().any(|g| capabilities.contains(g)) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl PolicyEngine for OwnerSharePolicy {
    async fn check(
        &self,
        actor: &Actor,
        subject: &Subject,
        capability: &Capability,
    ) -> Result<Decision, Error> {
        let Some(user) = actor.related_user() else {
            return Ok(Decision::Allowed);
        };
        let entry = subject.require_entry().await?;
        let lineage = self.lineage(entry).await?;

        if self
            .holds_any(&lineage, &user.uid, std::slice::from_ref(capability))
            .await?
        {
            return Ok(Decision::Allowed);
        }
        Ok(Decision::Denied(Denial {
            capability: capability.clone(),
            reason: format!(
                "{} holds no `{}` on {} or its ancestors",
                actor, capability, entry.path
            ),
        }))
    }

    async fn safe_denial(&self, actor: &Actor, subject: &Subject, denial: &Denial) -> Error {
        let (Some(user), Some(entry)) = (actor.related_user(), subject.cached_entry()) else {
            return Error::SubjectNotFound;
        };

        let visible = match self.lineage(entry).await {
            Ok(lineage) => self
                .holds_any(&lineage, &user.uid, &VISIBILITY)
                .await
                .unwrap_or(false),
            Err(e) => {
                warn!(error = %e, "visibility lookup failed");
                false
            }
        };

        if visible {
            Error::PermissionDenied {
                message: format!(
                    "missing `{}` permission on {}",
                    denial.capability, entry.path
                ),
            }
        } else {
            Error::SubjectNotFound
        }
    }
}

/// The pre-ACL permission check.
#[async_trait]
pub trait LegacyPermissions: Send + Sync {
    async fn chkperm(
        &self,
        entry: &FsEntry,
        user_uid: &str,
        permission: &Capability,
    ) -> Result<bool, Error>;
}

/// Legacy permissions kept as `(user_uid, subject_uid, permission)` rows.
///
/// Owners always pass; anyone else needs a row naming exactly the requested
/// permission on exactly this node.
pub struct ChkpermTable {
    rows: Arc<dyn EntityStorage>,
}

impl ChkpermTable {
    pub fn new(rows: Arc<dyn EntityStorage>) -> Self {
        Self { rows }
    }

    pub async fn grant(
        &self,
        user_uid: &str,
        subject_uid: &str,
        permission: &Capability,
    ) -> Result<(), Error> {
        let mut row = facetfs_entity_store::Entity::new();
        row.insert("user_uid".into(), Value::from(user_uid));
        row.insert("subject_uid".into(), Value::from(subject_uid));
        row.insert("permission".into(), Value::from(permission.as_str()));
        self.rows.create(&RequestContext::system(), row).await?;
        Ok(())
    }
}

#[async_trait]
impl LegacyPermissions for ChkpermTable {
    async fn chkperm(
        &self,
        entry: &FsEntry,
        user_uid: &str,
        permission: &Capability,
    ) -> Result<bool, Error> {
        if entry.owner_uid == user_uid {
            return Ok(true);
        }
        let rows = self
            .rows
            .select(
                &RequestContext::system(),
                SelectOptions::new()
                    .with_predicate(
                        Predicate::eq("user_uid", user_uid)
                            .and("subject_uid", entry.uid.as_str())
                            .and("permission", permission.as_str()),
                    )
                    .with_limit(1),
            )
            .await?;
        Ok(!rows.is_empty())
    }
}

/// Both permission predicates, applied in order.
pub struct PermissionGate {
    policy: Arc<dyn PolicyEngine>,
    legacy: Option<Arc<dyn LegacyPermissions>>,
}

impl PermissionGate {
    pub fn new(policy: Arc<dyn PolicyEngine>) -> Self {
        Self {
            policy,
            legacy: None,
        }
    }

    // TODO: drop once the policy engine models every legacy permission.
    pub fn with_legacy(mut self, legacy: Arc<dyn LegacyPermissions>) -> Self {
        self.legacy = Some(legacy);
        self
    }

    /// The raw policy decision. No side effects.
    pub async fn check(
        &self,
        actor: &Actor,
        subject: &Subject,
        capability: &Capability,
    ) -> Result<Decision, Error> {
        self.policy.check(actor, subject, capability).await
    }

    /// Fail with a sanitized error unless the policy allows `capability`.
    pub async fn enforce(
        &self,
        actor: &Actor,
        subject: &Subject,
        capability: &Capability,
    ) -> Result<(), Error> {
        match self.check(actor, subject, capability).await? {
            Decision::Allowed => Ok(()),
            Decision::Denied(denial) => {
                debug!(actor = %actor, reason = %denial.reason, "denied");
                Err(self.policy.safe_denial(actor, subject, &denial).await)
            }
        }
    }

    /// Fail with [`Error::Forbidden`] unless the legacy table allows
    /// `permission`. Skipped for actors without a user.
    pub async fn enforce_legacy(
        &self,
        actor: &Actor,
        subject: &Subject,
        permission: &Capability,
    ) -> Result<(), Error> {
        let (Some(legacy), Some(user)) = (&self.legacy, actor.related_user()) else {
            return Ok(());
        };
        let entry = subject.require_entry().await?;
        if legacy.chkperm(entry, &user.uid, permission).await? {
            Ok(())
        } else {
            debug!(actor = %actor, permission = %permission, "legacy check denied");
            Err(Error::Forbidden)
        }
    }

    /// Both checks for the same capability.
    pub async fn authorize(
        &self,
        actor: &Actor,
        subject: &Subject,
        capability: &Capability,
    ) -> Result<(), Error> {
        self.enforce(actor, subject, capability).await?;
        self.enforce_legacy(actor, subject, capability).await
    }
}
