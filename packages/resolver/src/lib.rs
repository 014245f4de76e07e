//! Value resolution: derive one representation of a resource from another.
//!
//! A resource can be known through several interchangeable representations
//! (an id, a path, a byte stream, a buffer, a URL...). A [`FactoryRegistry`]
//! lists, once at startup, how each representation can be derived from
//! another. A [`ValueResolver`] is created per resource: seed it with whatever
//! is already known, then ask for what you need.
//!
//! - Every representation is derived at most once per resolver.
//! - Concurrent requests for the same representation share one derivation.
//! - A failing factory does not poison any other representation.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use facetfs_resolver::{FactoryRegistry, ValueResolver};
//!
//! # async fn demo() -> Result<(), facetfs_resolver::ResolveError<&'static str>> {
//! let mut registry = FactoryRegistry::<&'static str, String>::new();
//! registry.add_factory("upper", "text", |_, text: String| async move {
//!     Ok(Some(text.to_uppercase()))
//! });
//!
//! let resolver = ValueResolver::new(Arc::new(registry), ());
//! resolver.set("text", "hello".to_string());
//! assert_eq!(resolver.get("upper").await?, "HELLO");
//! # Ok(())
//! # }
//! ```

mod error;
mod registry;
mod resolver;

pub use error::{BoxError, FactoryFailure, ResolveError};
pub use registry::{FactoryFuture, FactoryRegistry, Kind};
pub use resolver::ValueResolver;
