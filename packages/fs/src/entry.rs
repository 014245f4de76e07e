//! Filesystem records and the sanitized view handed to callers.

use std::fmt;

use facetfs_entity_store::{Entity, Value};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::actor::Capability;
use crate::path::FsPath;
use crate::Error;

/// How a node is named by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeLocator {
    Uid(String),
    Path(FsPath),
}

impl fmt::Display for NodeLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeLocator::Uid(uid) => write!(f, "uid:{}", uid),
            NodeLocator::Path(path) => write!(f, "{}", path),
        }
    }
}

/// A stored filesystem node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsEntry {
    pub uid: String,
    pub path: FsPath,
    pub name: String,
    #[serde(default)]
    pub parent_uid: Option<String>,
    pub owner_uid: String,
    #[serde(default)]
    pub is_dir: bool,
    /// Byte length of a file's content. Directories leave it unset.
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub bucket_region: Option<String>,
}

impl FsEntry {
    pub fn from_entity(entity: Entity) -> Result<Self, Error> {
        decode(entity)
    }

    pub fn to_entity(&self) -> Result<Entity, Error> {
        encode(self)
    }
}

/// A user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub uid: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A grant of one capability on a node to another user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub subject_uid: String,
    pub grantee_uid: String,
    pub permission: Capability,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub file_uid: String,
    pub version_id: String,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    #[serde(default)]
    pub author_uid: Option<String>,
}

/// A hosted site whose document root is a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subdomain {
    pub uid: String,
    pub subdomain: String,
    pub root_dir_uid: String,
    pub owner_uid: String,
}

/// Where an object-store copy of a file's content lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLocator {
    pub bucket: String,
    pub region: String,
    pub key: String,
}

pub(crate) fn decode<T: DeserializeOwned>(entity: Entity) -> Result<T, Error> {
    serde_json::from_value(Value::Object(entity))
        .map_err(|e| Error::backend(format!("malformed record: {}", e)))
}

pub(crate) fn encode<T: Serialize>(record: &T) -> Result<Entity, Error> {
    match serde_json::to_value(record) {
        Ok(Value::Object(entity)) => Ok(entity),
        Ok(_) => Err(Error::backend("record did not serialize to an object")),
        Err(e) => Err(Error::backend(e.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafeOwner {
    pub uid: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafeSubdomain {
    pub uid: String,
    pub subdomain: String,
}

/// What a caller is allowed to see of a node.
///
/// Optional fields are present only when they were requested and could be
/// computed; `partial_failures` names the requested ones that could not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafeEntry {
    pub uid: String,
    pub name: String,
    pub path: FsPath,
    pub is_dir: bool,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub owner: SafeOwner,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomains: Option<Vec<SafeSubdomain>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Share>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<Vec<Version>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_empty: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub partial_failures: Vec<&'static str>,
}
