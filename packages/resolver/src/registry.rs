//! Static registration of derivation factories.

use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::BoxError;

/// A representation type name.
///
/// Anything small, comparable and printable works: an enum, or a
/// `&'static str` in tests.
pub trait Kind: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {}
impl<T> Kind for T where T: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {}

/// What a factory returns.
///
/// * `Ok(Some(value))` - the derived representation.
/// * `Ok(None)` - this edge does not apply to this resource (for example the
///   node it would read from does not exist); other edges may still work.
/// * `Err(e)` - the derivation failed.
pub type FactoryFuture<V> = BoxFuture<'static, Result<Option<V>, BoxError>>;

type Factory<C, V> = Arc<dyn Fn(C, V) -> FactoryFuture<V> + Send + Sync>;

/// A registered `target <- source` derivation.
pub(crate) struct Edge<K, V, C> {
    pub target: K,
    pub source: K,
    pub factory: Factory<C, V>,
}

/// Registered `(target, source)` factories, in declaration order.
///
/// Build one at startup and share it (`Arc`) between resolvers. `C` is a
/// context value every factory receives, for services and request identity
/// that would otherwise have to be global.
pub struct FactoryRegistry<K, V, C = ()> {
    edges: Vec<Edge<K, V, C>>,
}

impl<K: Kind, V: Send + 'static, C: Send + 'static> FactoryRegistry<K, V, C> {
    pub fn new() -> Self {
        Self { edges: Vec::new() }
    }

    /// Register a factory deriving `target` from `source`.
    ///
    /// Declaration order is the tie-break when several edges could be used.
    pub fn add_factory<F, Fut>(&mut self, target: K, source: K, factory: F) -> &mut Self
    where
        F: Fn(C, V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<V>, BoxError>> + Send + 'static,
    {
        self.edges.push(Edge {
            target,
            source,
            factory: Arc::new(move |context: C, value: V| -> FactoryFuture<V> {
                Box::pin(factory(context, value))
            }),
        });
        self
    }
}

impl<K: Kind, V, C> FactoryRegistry<K, V, C> {
    /// `(target, source)` pairs in declaration order.
    pub fn edges(&self) -> impl Iterator<Item = (K, K)> + '_ {
        self.edges.iter().map(|e| (e.target, e.source))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub(crate) fn edge(&self, index: usize) -> &Edge<K, V, C> {
        &self.edges[index]
    }

    /// Edges producing `target`, with their declaration index.
    pub(crate) fn edges_into(&self, target: K) -> impl Iterator<Item = (usize, &Edge<K, V, C>)> {
        self.edges
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.target == target)
    }
}

impl<K: Kind, V: Send + 'static, C: Send + 'static> Default for FactoryRegistry<K, V, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Kind, V, C> fmt::Debug for FactoryRegistry<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.edges
                    .iter()
                    .map(|e| format!("{} <- {}", e.target, e.source)),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_keep_declaration_order() {
        let mut registry = FactoryRegistry::<&'static str, u32>::new();
        registry
            .add_factory("b", "a", |_, v| async move { Ok(Some(v + 1)) })
            .add_factory("c", "b", |_, v| async move { Ok(Some(v * 2)) })
            .add_factory("b", "z", |_, v| async move { Ok(Some(v)) });

        let edges: Vec<_> = registry.edges().collect();
        assert_eq!(edges, vec![("b", "a"), ("c", "b"), ("b", "z")]);
        assert_eq!(registry.len(), 3);

        let into_b: Vec<_> = registry.edges_into("b").map(|(i, e)| (i, e.source)).collect();
        assert_eq!(into_b, vec![(0, "a"), (2, "z")]);
    }

    #[test]
    fn debug_lists_edges() {
        let mut registry = FactoryRegistry::<&'static str, u32>::new();
        registry.add_factory("buffer", "stream", |_, v| async move { Ok(Some(v)) });
        assert_eq!(format!("{:?}", registry), r#"["buffer <- stream"]"#);
    }

    fn describe<K: Kind, V, C>(registry: &FactoryRegistry<K, V, C>) -> (usize, Vec<(K, K)>) {
        (registry.len(), registry.edges().collect())
    }

    #[test]
    fn accessors_need_no_send_bounds() {
        let mut registry = FactoryRegistry::<&'static str, u32>::new();
        registry.add_factory("buffer", "stream", |_, v| async move { Ok(Some(v)) });
        assert_eq!(describe(&registry), (1, vec![("buffer", "stream")]));
    }

    #[test]
    fn empty_registry() {
        let registry = FactoryRegistry::<&'static str, u32>::default();
        assert!(registry.is_empty());
    }
}
