//! Error types for entity storage.

/// Errors raised by stages and backends.
///
/// Stages propagate upstream errors unchanged unless their documentation
/// says otherwise.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A stage rejected the parameters of an operation outright.
    #[error("invalid operation parameters: {message}")]
    InvalidOperationParameters { message: String },

    /// A write reached a stage that only permits reads.
    #[error("{operation} rejected: collection is read-only")]
    ReadOnly { operation: &'static str },

    /// No entity with this uid is visible to the caller.
    #[error("entity not found: {uid}")]
    NotFound { uid: String },

    /// An entity with this uid already exists.
    #[error("entity already exists: {uid}")]
    Conflict { uid: String },

    /// The terminal backend failed to perform I/O.
    #[error("backend failure: {message}")]
    BackendFailure { message: String },
}

impl Error {
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidOperationParameters {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Error::BackendFailure {
            message: message.into(),
        }
    }

    pub fn not_found(uid: impl Into<String>) -> Self {
        Error::NotFound { uid: uid.into() }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::backend(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::backend(format!("malformed entity document: {}", e))
    }
}
