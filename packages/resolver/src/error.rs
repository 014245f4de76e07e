//! Resolution errors.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::Kind;

/// Error type factories may return.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// The error a factory returned, kept so callers can recover its type.
///
/// Compares by message.
#[derive(Clone)]
pub struct FactoryFailure(Arc<dyn StdError + Send + Sync>);

impl FactoryFailure {
    pub fn new(error: impl Into<BoxError>) -> Self {
        Self(Arc::from(error.into()))
    }

    /// The factory's error as `E`, if that is what it returned.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Debug for FactoryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for FactoryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl PartialEq for FactoryFailure {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_string() == other.0.to_string()
    }
}

impl Eq for FactoryFailure {}

/// Why a representation could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError<K: Kind> {
    /// No chain of registered factories connects a known representation to
    /// the requested one.
    #[error("no factory path resolves `{target}`")]
    Unresolvable { target: K },

    /// A factory on the chosen chain failed.
    #[error("factory `{target} <- {from}` failed: {message}")]
    Factory {
        target: K,
        from: K,
        message: String,
        cause: FactoryFailure,
    },
}

impl<K: Kind> ResolveError<K> {
    /// The representation that was being produced.
    pub fn target(&self) -> K {
        match self {
            ResolveError::Unresolvable { target } => *target,
            ResolveError::Factory { target, .. } => *target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolvable_display() {
        let e = ResolveError::Unresolvable { target: "buffer" };
        assert_eq!(e.to_string(), "no factory path resolves `buffer`");
        assert_eq!(e.target(), "buffer");
    }

    #[test]
    fn factory_display_names_edge() {
        let e = ResolveError::Factory {
            target: "stream",
            from: "web_url",
            message: "connection refused".to_string(),
            cause: FactoryFailure::new("connection refused"),
        };
        let display = e.to_string();
        assert!(display.contains("stream <- web_url"));
        assert!(display.contains("connection refused"));
        assert_eq!(e.target(), "stream");
    }

    #[derive(Debug, thiserror::Error)]
    #[error("gone")]
    struct Gone;

    #[test]
    fn failure_keeps_the_factory_error_type() {
        let failure = FactoryFailure::new(Gone);
        assert!(failure.downcast_ref::<Gone>().is_some());
        assert!(failure.downcast_ref::<std::io::Error>().is_none());
        assert_eq!(failure, FactoryFailure::new("gone"));
    }
}
