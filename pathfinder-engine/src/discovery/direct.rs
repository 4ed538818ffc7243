//! Direct discoverer - mutual follow intersection.

use async_trait::async_trait;
use tracing::debug;

use pathfinder_graph::{
    Direction, EdgeType, GraphError, GraphPort, RelatedTo, TraversalQuery, Vibe,
};

use super::{DiscoveryContext, PathDiscoverer};
use crate::path::{PathKind, PathRecord, PathStep, PathType};

/// Finds people follow-connected (either direction) to both the source and
/// the target. Path: `[source, candidate]`.
pub struct DirectDiscoverer;

#[async_trait]
impl PathDiscoverer for DirectDiscoverer {
    fn path_type(&self) -> PathType {
        PathType::Direct
    }

    async fn discover(
        &self,
        graph: &dyn GraphPort,
        ctx: &DiscoveryContext,
    ) -> Result<Vec<PathRecord>, GraphError> {
        if !ctx.within(1) {
            return Ok(Vec::new());
        }

        let query = TraversalQuery::new(ctx.source.user_id.clone(), &[EdgeType::Follows], 1)
            .direction(Direction::Both)
            .vibe(Vibe::Individual)
            .related_to(RelatedTo {
                user_id: ctx.target.user_id.clone(),
                edge_types: vec![EdgeType::Follows],
                direction: Direction::Both,
            });

        let paths: Vec<PathRecord> = graph
            .reachable(&query)
            .await?
            .into_iter()
            .filter(|r| !ctx.is_endpoint(&r.node.user_id))
            .map(|r| {
                PathRecord::new(
                    r.node.clone(),
                    vec![
                        PathStep::start(ctx.source.clone()),
                        PathStep::via(r.node, r.edge_type, r.direction),
                    ],
                    PathKind::Direct,
                )
            })
            .collect();

        debug!(
            source = %ctx.source.user_id,
            target = %ctx.target.user_id,
            paths = paths.len(),
            "Direct discovery complete"
        );

        Ok(paths)
    }
}
