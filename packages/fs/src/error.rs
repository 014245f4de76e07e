//! Filesystem errors and their wire envelope.

use facetfs_resolver::ResolveError;
use serde::{Deserialize, Serialize};

use crate::facade::FacetKind;
use crate::path::PathError;

/// Errors from filesystem operations.
///
/// `PermissionDenied` only ever carries a sanitized message; the raw reason
/// for a denial stays inside the gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("subject does not exist")]
    SubjectNotFound,

    #[error("{message}")]
    PermissionDenied { message: String },

    /// The transitional legacy permission check failed.
    #[error("permission denied.")]
    Forbidden,

    #[error(transparent)]
    Storage(#[from] facetfs_entity_store::Error),

    #[error(transparent)]
    Resolve(#[from] ResolveError<FacetKind>),

    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    #[error("backend failure: {message}")]
    BackendFailure { message: String },

    /// A best-effort field could not be computed.
    #[error("could not compute `{field}`: {message}")]
    PartialEnrichmentFailure { field: &'static str, message: String },
}

impl Error {
    pub fn backend(message: impl Into<String>) -> Self {
        Error::BackendFailure {
            message: message.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        use facetfs_entity_store::Error as StorageError;

        match self {
            Error::SubjectNotFound => "subject_does_not_exist",
            Error::PermissionDenied { .. } => "permission_denied",
            Error::Forbidden => "forbidden",
            Error::Storage(StorageError::NotFound { .. }) => "subject_does_not_exist",
            Error::Storage(StorageError::InvalidOperationParameters { .. })
            | Error::Storage(StorageError::ReadOnly { .. })
            | Error::Storage(StorageError::Conflict { .. })
            | Error::Path(_) => "invalid_operation_parameters",
            Error::Resolve(_) => "unresolvable_representation",
            Error::Storage(StorageError::BackendFailure { .. }) | Error::BackendFailure { .. } => {
                "backend_failure"
            }
            Error::PartialEnrichmentFailure { .. } => "partial_enrichment_failure",
        }
    }
}

/// Serializable form of an [`Error`] for whoever renders responses.
///
/// ```json
/// {"$": "facetfs:api/Error", "code": "forbidden", "message": "permission denied."}
/// ```
///
/// Backend failure details are replaced by a generic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(rename = "$")]
    pub kind: String,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub const KIND: &'static str = "facetfs:api/Error";
}

impl From<&Error> for ApiError {
    fn from(error: &Error) -> Self {
        let code = error.code();
        let message = match code {
            "backend_failure" => "internal backend failure".to_string(),
            _ => error.to_string(),
        };
        ApiError {
            kind: Self::KIND.to_string(),
            code: code.to_string(),
            message,
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError::from(&error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_shape() {
        let api = ApiError::from(Error::Forbidden);
        assert_eq!(
            serde_json::to_value(&api).unwrap(),
            json!({"$": "facetfs:api/Error", "code": "forbidden", "message": "permission denied."})
        );
    }

    #[test]
    fn backend_details_are_not_leaked() {
        let api = ApiError::from(Error::backend("db at 10.0.0.3 refused connection"));
        assert_eq!(api.code, "backend_failure");
        assert!(!api.message.contains("10.0.0.3"));

        let api = ApiError::from(Error::Storage(facetfs_entity_store::Error::backend(
            "disk full",
        )));
        assert_eq!(api.message, "internal backend failure");
    }

    #[test]
    fn codes() {
        assert_eq!(Error::SubjectNotFound.code(), "subject_does_not_exist");
        assert_eq!(
            Error::PermissionDenied {
                message: "no".into()
            }
            .code(),
            "permission_denied"
        );
        assert_eq!(
            Error::from(PathError::Empty).code(),
            "invalid_operation_parameters"
        );
        assert_eq!(
            Error::from(ResolveError::Unresolvable {
                target: FacetKind::Buffer
            })
            .code(),
            "unresolvable_representation"
        );
        assert_eq!(
            Error::Storage(facetfs_entity_store::Error::not_found("x")).code(),
            "subject_does_not_exist"
        );
    }

    #[test]
    fn denial_message_is_rendered_verbatim() {
        let e = Error::PermissionDenied {
            message: "missing `read` permission on /a".into(),
        };
        assert_eq!(ApiError::from(&e).message, "missing `read` permission on /a");
    }
}
