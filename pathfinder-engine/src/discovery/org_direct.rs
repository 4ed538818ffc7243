//! Same-organization discoverer (direct).

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use pathfinder_graph::{Direction, EdgeType, GraphError, GraphPort};

use super::{connectors, memberships, target_organizations, target_tail, DiscoveryContext, PathDiscoverer};
use crate::path::{MatchSource, PathKind, PathRecord, PathStep, PathType};

/// Finds connectors whose organizational edge reaches an organization the
/// target is directly connected to (or the target itself, when the target
/// is an organization).
///
/// Path: `[source, org, target]` or `[source, connector, org, target]`.
pub struct OrgDirectDiscoverer;

#[async_trait]
impl PathDiscoverer for OrgDirectDiscoverer {
    fn path_type(&self) -> PathType {
        PathType::OrgDirect
    }

    async fn discover(
        &self,
        graph: &dyn GraphPort,
        ctx: &DiscoveryContext,
    ) -> Result<Vec<PathRecord>, GraphError> {
        // Shortest network path: [source, connector, target-org].
        let with_network = ctx.within(2);
        let connectors = connectors(graph, ctx, with_network).await?;

        let target_orgs: HashMap<String, Option<EdgeType>> = target_organizations(graph, ctx)
            .await?
            .into_iter()
            .map(|(org, edge)| (org.user_id, edge))
            .collect();
        if target_orgs.is_empty() {
            return Ok(Vec::new());
        }

        let ids = connectors.iter().map(|c| c.person.user_id.clone()).collect();
        let by_person = memberships(graph, ids).await?;

        let mut paths = Vec::new();
        for connector in &connectors {
            let Some(list) = by_person.get(&connector.person.user_id) else {
                continue;
            };
            for membership in list {
                let Some(target_edge) = target_orgs.get(&membership.org.user_id) else {
                    continue;
                };

                let mut steps = connector.prefix(ctx);
                steps.push(PathStep::via(
                    membership.org.clone(),
                    membership.edge_type,
                    Direction::Outgoing,
                ));
                steps.extend(target_tail(ctx, *target_edge));

                if !ctx.within(steps.len() - 1) {
                    continue;
                }

                paths.push(PathRecord::new(
                    connector.destination(ctx),
                    steps,
                    PathKind::OrgDirect {
                        shared_org: membership.org.clone(),
                        match_source: MatchSource::ProspectDirect,
                    },
                ));
            }
        }

        debug!(
            source = %ctx.source.user_id,
            target = %ctx.target.user_id,
            connectors = connectors.len(),
            paths = paths.len(),
            "Same-organization discovery complete"
        );

        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    #[tokio::test]
    async fn test_source_shares_org_with_target() {
        let graph = base().with_person(org("x"));
        let graph = works_at(works_at(graph, "s", "x"), "t", "x");

        let paths = OrgDirectDiscoverer.discover(&graph, &ctx(&graph)).await.unwrap();
        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        assert_eq!(path.candidate.user_id, "t");
        let ids: Vec<_> = path.steps.iter().map(|s| s.node.user_id.as_str()).collect();
        assert_eq!(ids, vec!["s", "x", "t"]);
        assert_eq!(path.match_source(), Some(MatchSource::ProspectDirect));
    }

    #[tokio::test]
    async fn test_network_member_shares_org() {
        let graph = base()
            .with_person(person("c"))
            .with_person(org("x"))
            .with_edge("s", EdgeType::Follows, "c")
            .with_edge("c", EdgeType::WorkedAt, "x")
            .with_edge("t", EdgeType::MemberOf, "x");

        let paths = OrgDirectDiscoverer.discover(&graph, &ctx(&graph)).await.unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].candidate.user_id, "c");
        assert_eq!(paths[0].hops(), 3);
        let edges: Vec<_> = paths[0].edge_types().collect();
        assert_eq!(
            edges,
            vec![EdgeType::Follows, EdgeType::WorkedAt, EdgeType::MemberOf]
        );
    }

    #[tokio::test]
    async fn test_target_is_the_organization() {
        let graph = MemoryGraph::new("fixture")
            .with_person(person("s"))
            .with_person(person("c"))
            .with_person(org("t"))
            .with_edge("c", EdgeType::Follows, "s")
            .with_edge("c", EdgeType::WorksAt, "t");

        let paths = OrgDirectDiscoverer.discover(&graph, &ctx(&graph)).await.unwrap();
        assert_eq!(paths.len(), 1);
        let ids: Vec<_> = paths[0].steps.iter().map(|s| s.node.user_id.as_str()).collect();
        assert_eq!(ids, vec!["s", "c", "t"]);
        assert_eq!(paths[0].shared_org().unwrap().user_id, "t");
    }

    #[tokio::test]
    async fn test_hop_bound_truncates_network_paths() {
        let graph = base()
            .with_person(person("c"))
            .with_person(org("x"))
            .with_edge("s", EdgeType::Follows, "c")
            .with_edge("c", EdgeType::WorksAt, "x")
            .with_edge("s", EdgeType::WorksAt, "x")
            .with_edge("t", EdgeType::WorksAt, "x");

        let paths = OrgDirectDiscoverer
            .discover(&graph, &ctx_with_hops(&graph, 2))
            .await
            .unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].candidate.user_id, "t");
        assert!(paths.iter().all(|p| p.hops() <= 2));
    }

    #[tokio::test]
    async fn test_no_shared_org_is_empty() {
        let graph = base().with_person(org("x")).with_person(org("y"));
        let graph = works_at(works_at(graph, "s", "x"), "t", "y");

        let paths = OrgDirectDiscoverer.discover(&graph, &ctx(&graph)).await.unwrap();
        assert!(paths.is_empty());
    }
}
