//! MaxLimit: clamp the result count of every select.

use async_trait::async_trait;
use tracing::debug;

use crate::{Entity, EntityStorage, Error, RequestContext, SelectOptions, StorageStage};

/// Compute the effective limit for a requested one.
///
/// Zero and "unset" both mean "use the default", which is `max`; anything
/// above `max` is clamped to it. Applying the clamp twice gives the same
/// result as applying it once.
pub fn clamp_limit(requested: Option<usize>, max: usize) -> usize {
    match requested {
        Some(limit) if limit > 0 && limit <= max => limit,
        _ => max,
    }
}

/// Rewrites `select` limits so callers can never force an unbounded read.
///
/// This stage never rejects: oversized limits are silently clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxLimit {
    max: usize,
}

impl MaxLimit {
    /// Create the stage. A maximum of zero would make every select empty,
    /// so it is refused.
    pub fn new(max: usize) -> Result<Self, Error> {
        if max == 0 {
            return Err(Error::invalid("max_limit stage requires max > 0"));
        }
        Ok(Self { max })
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

#[async_trait]
impl StorageStage for MaxLimit {
    fn name(&self) -> &'static str {
        "max_limit"
    }

    async fn select(
        &self,
        upstream: &dyn EntityStorage,
        ctx: &RequestContext,
        mut options: SelectOptions,
    ) -> Result<Vec<Entity>, Error> {
        let requested = options.limit;
        options.limit = Some(clamp_limit(requested, self.max));

        debug!(
            stage = "max_limit",
            ?requested,
            limit = ?options.limit,
            offset = options.offset,
            predicate = ?options.predicate,
            "select options"
        );

        upstream.select(ctx, options).await
    }
}
