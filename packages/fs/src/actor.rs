//! Who is acting, and what they may be allowed to do.

use std::borrow::Cow;
use std::fmt;

use facetfs_entity_store::RequestContext;
use serde::{Deserialize, Serialize};

/// A user as seen by permission checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef {
    pub uid: String,
    pub username: String,
}

/// The identity performing an operation. Fixed for a whole request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Actor {
    User(UserRef),
    /// An app acting on behalf of a user, with that user's rights.
    App { app_uid: String, user: UserRef },
    /// Internal work on nobody's behalf.
    System,
}

impl Actor {
    pub fn user(uid: impl Into<String>, username: impl Into<String>) -> Self {
        Actor::User(UserRef {
            uid: uid.into(),
            username: username.into(),
        })
    }

    pub fn app(app_uid: impl Into<String>, user: UserRef) -> Self {
        Actor::App {
            app_uid: app_uid.into(),
            user,
        }
    }

    /// The user whose rights apply, if any.
    pub fn related_user(&self) -> Option<&UserRef> {
        match self {
            Actor::User(user) | Actor::App { user, .. } => Some(user),
            Actor::System => None,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Actor::System)
    }

    pub fn request_context(&self) -> RequestContext {
        match self.related_user() {
            Some(user) => RequestContext::for_actor(user.uid.clone()),
            None => RequestContext::system(),
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::User(user) => write!(f, "user:{}", user.username),
            Actor::App { app_uid, user } => write!(f, "app:{}(user:{})", app_uid, user.username),
            Actor::System => write!(f, "system"),
        }
    }
}

/// A named permission.
///
/// Capabilities are compared by name only; holding `write` says nothing
/// about `read`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(Cow<'static, str>);

impl Capability {
    pub const READ: Capability = Capability(Cow::Borrowed("read"));
    pub const WRITE: Capability = Capability(Cow::Borrowed("write"));
    pub const STAT: Capability = Capability(Cow::Borrowed("stat"));
    pub const LIST: Capability = Capability(Cow::Borrowed("list"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Capability(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
