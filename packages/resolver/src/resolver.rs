//! Per-resource resolver with in-flight coalescing.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;
use tracing::{debug, trace};

use crate::registry::FactoryRegistry;
use crate::{FactoryFailure, Kind, ResolveError};

/// Outcome of a single derivation step.
enum Step<K: Kind> {
    /// The factory said its edge does not apply; plan again without it.
    NotApplicable(usize),
    Failed(ResolveError<K>),
}

/// Representations of one resource, derived on demand.
///
/// Each representation lives in its own cell: resolved, in flight, or
/// empty. `get` on a resolved kind returns the cached value; otherwise a
/// chain of factories is planned from the currently resolved kinds and run,
/// caching every intermediate representation along the way. Callers asking
/// for a representation that is already being derived wait for that
/// derivation instead of starting their own.
///
/// # Planning
///
/// For a target, edges producing it are considered in declaration order.
/// An edge whose source is already resolved wins outright. Otherwise the
/// first edge (again in declaration order) whose source can itself be
/// planned is used, searching depth-first and never revisiting a kind on the
/// current chain.
///
/// A resolver belongs to a single resource and is dropped with it.
pub struct ValueResolver<K, V, C = ()> {
    registry: Arc<FactoryRegistry<K, V, C>>,
    context: C,
    cells: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
    exhausted: Mutex<HashSet<usize>>,
}

impl<K, V, C> ValueResolver<K, V, C>
where
    K: Kind,
    V: Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
{
    pub fn new(registry: Arc<FactoryRegistry<K, V, C>>, context: C) -> Self {
        Self {
            registry,
            context,
            cells: Mutex::new(HashMap::new()),
            exhausted: Mutex::new(HashSet::new()),
        }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    /// Seed a representation supplied (and vouched for) by the caller.
    ///
    /// Replaces any value already held for `kind`.
    pub fn set(&self, kind: K, value: V) {
        let cell = Arc::new(OnceCell::new_with(Some(value)));
        self.lock_cells().insert(kind, cell);
    }

    /// The cached value for `kind`, without deriving anything.
    pub fn peek(&self, kind: K) -> Option<V> {
        self.lock_cells().get(&kind).and_then(|c| c.get().cloned())
    }

    pub fn is_resolved(&self, kind: K) -> bool {
        self.lock_cells()
            .get(&kind)
            .map(|c| c.initialized())
            .unwrap_or(false)
    }

    /// The `(target, source)` chain `get(target)` would run right now.
    ///
    /// Returns an empty chain for a resolved target and `None` when nothing
    /// connects to it.
    pub fn plan_chain(&self, target: K) -> Option<Vec<(K, K)>> {
        if self.is_resolved(target) {
            return Some(Vec::new());
        }
        self.plan(target).map(|plan| {
            plan.into_iter()
                .map(|index| {
                    let edge = self.registry.edge(index);
                    (edge.target, edge.source)
                })
                .collect()
        })
    }

    /// Get the representation `kind`, deriving it if necessary.
    pub async fn get(&self, kind: K) -> Result<V, ResolveError<K>> {
        loop {
            if let Some(value) = self.peek(kind) {
                return Ok(value);
            }

            let plan = self
                .plan(kind)
                .ok_or(ResolveError::Unresolvable { target: kind })?;

            match self.execute(kind, &plan).await {
                Ok(value) => return Ok(value),
                Err(Step::NotApplicable(index)) => {
                    let edge = self.registry.edge(index);
                    debug!(
                        target_kind = %edge.target,
                        source_kind = %edge.source,
                        "edge not applicable, replanning"
                    );
                }
                Err(Step::Failed(e)) => return Err(e),
            }
        }
    }

    async fn execute(&self, target: K, plan: &[usize]) -> Result<V, Step<K>> {
        let unresolvable = || Step::Failed(ResolveError::Unresolvable { target });
        let &first = plan.first().ok_or_else(unresolvable)?;
        // The origin may have been replaced by `set` since planning.
        let mut value = self
            .peek(self.registry.edge(first).source)
            .ok_or_else(unresolvable)?;

        let chain: Vec<String> = plan
            .iter()
            .map(|&i| {
                let e = self.registry.edge(i);
                format!("{} <- {}", e.target, e.source)
            })
            .collect();
        trace!(target_kind = %target, ?chain, "resolving");

        for &index in plan {
            let cell = self.cell(self.registry.edge(index).target);
            let input = value;
            value = cell
                .get_or_try_init(|| self.derive(index, input))
                .await?
                .clone();
        }
        Ok(value)
    }

    async fn derive(&self, index: usize, input: V) -> Result<V, Step<K>> {
        // A caller that waited on a derivation which turned out not to apply
        // must not run the same factory again.
        if self.lock_exhausted().contains(&index) {
            return Err(Step::NotApplicable(index));
        }

        let edge = self.registry.edge(index);
        trace!(target_kind = %edge.target, source_kind = %edge.source, "running factory");

        match (edge.factory)(self.context.clone(), input).await {
            Ok(Some(value)) => Ok(value),
            Ok(None) => {
                self.lock_exhausted().insert(index);
                Err(Step::NotApplicable(index))
            }
            Err(e) => Err(Step::Failed(ResolveError::Factory {
                target: edge.target,
                from: edge.source,
                message: e.to_string(),
                cause: FactoryFailure::new(e),
            })),
        }
    }

    fn plan(&self, target: K) -> Option<Vec<usize>> {
        let resolved: HashSet<K> = self
            .lock_cells()
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(kind, _)| *kind)
            .collect();
        let exhausted = self.lock_exhausted().clone();
        let mut visiting = vec![target];
        self.plan_into(target, &resolved, &exhausted, &mut visiting)
    }

    fn plan_into(
        &self,
        target: K,
        resolved: &HashSet<K>,
        exhausted: &HashSet<usize>,
        visiting: &mut Vec<K>,
    ) -> Option<Vec<usize>> {
        let candidates: Vec<(usize, K)> = self
            .registry
            .edges_into(target)
            .filter(|(index, _)| !exhausted.contains(index))
            .map(|(index, edge)| (index, edge.source))
            .collect();

        if let Some(&(index, _)) = candidates.iter().find(|(_, s)| resolved.contains(s)) {
            return Some(vec![index]);
        }

        for (index, source) in candidates {
            if visiting.contains(&source) {
                continue;
            }
            visiting.push(source);
            if let Some(mut chain) = self.plan_into(source, resolved, exhausted, visiting) {
                chain.push(index);
                return Some(chain);
            }
            visiting.pop();
        }
        None
    }

    fn cell(&self, kind: K) -> Arc<OnceCell<V>> {
        self.lock_cells()
            .entry(kind)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    fn lock_cells(&self) -> MutexGuard<'_, HashMap<K, Arc<OnceCell<V>>>> {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_exhausted(&self) -> MutexGuard<'_, HashSet<usize>> {
        self.exhausted.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: Kind, V, C> std::fmt::Debug for ValueResolver<K, V, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let resolved: Vec<K> = self
            .cells
            .lock()
            .map(|cells| {
                cells
                    .iter()
                    .filter(|(_, c)| c.initialized())
                    .map(|(k, _)| *k)
                    .collect()
            })
            .unwrap_or_default();
        f.debug_struct("ValueResolver")
            .field("resolved", &resolved)
            .field("edges", &self.registry.len())
            .finish()
    }
}
