//! Same-organization discoverer (via intermediary).

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tracing::debug;

use pathfinder_graph::{Direction, EdgeType, GraphError, GraphPort, NeighborQuery, PersonNode};

use super::{connectors, memberships, target_organizations, DiscoveryContext, PathDiscoverer};
use crate::path::{MatchSource, PathKind, PathRecord, PathStep, PathType};

/// Finds organizations a connector belongs to that reach the target through
/// one intermediary: someone in the target's follow network who also
/// belongs to the organization.
///
/// Path: `[source, (connector,) org, intermediary, target]`.
pub struct OrgIndirectDiscoverer;

/// A person next to the target, with how the follow edge runs.
struct Intermediary {
    person: PersonNode,
    /// Direction relative to the target
    direction: Direction,
}

impl Intermediary {
    fn match_source(&self) -> MatchSource {
        match self.direction {
            // intermediary -> target
            Direction::Incoming => MatchSource::ProspectDirect,
            _ => MatchSource::ProspectFollowing,
        }
    }
}

#[async_trait]
impl PathDiscoverer for OrgIndirectDiscoverer {
    fn path_type(&self) -> PathType {
        PathType::OrgIndirect
    }

    async fn discover(
        &self,
        graph: &dyn GraphPort,
        ctx: &DiscoveryContext,
    ) -> Result<Vec<PathRecord>, GraphError> {
        if !ctx.within(3) {
            return Ok(Vec::new());
        }

        let connectors = connectors(graph, ctx, ctx.within(4)).await?;

        // Organizations the target belongs to directly are the direct strategy's.
        let direct_orgs: HashSet<String> = target_organizations(graph, ctx)
            .await?
            .into_iter()
            .map(|(org, _)| org.user_id)
            .collect();

        let ids = connectors.iter().map(|c| c.person.user_id.clone()).collect();
        let by_person = memberships(graph, ids).await?;
        let wanted: HashSet<&str> = by_person
            .values()
            .flatten()
            .map(|m| m.org.user_id.as_str())
            .filter(|id| !direct_orgs.contains(*id))
            .collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let intermediaries = target_neighbors(graph, ctx).await?;
        if intermediaries.is_empty() {
            return Ok(Vec::new());
        }

        let intermediary_orgs = memberships(
            graph,
            intermediaries.iter().map(|i| i.person.user_id.clone()).collect(),
        )
        .await?;

        // org id -> (intermediary, membership edge)
        let mut via_org: HashMap<&str, Vec<(&Intermediary, EdgeType)>> = HashMap::new();
        for intermediary in &intermediaries {
            let Some(list) = intermediary_orgs.get(&intermediary.person.user_id) else {
                continue;
            };
            for membership in list {
                if wanted.contains(membership.org.user_id.as_str()) {
                    via_org
                        .entry(membership.org.user_id.as_str())
                        .or_default()
                        .push((intermediary, membership.edge_type));
                }
            }
        }

        let mut paths = Vec::new();
        for connector in &connectors {
            if !ctx.within(connector.prefix_hops() + 3) {
                continue;
            }
            let Some(list) = by_person.get(&connector.person.user_id) else {
                continue;
            };
            for membership in list {
                let Some(routes) = via_org.get(membership.org.user_id.as_str()) else {
                    continue;
                };
                for (intermediary, edge_type) in routes {
                    if intermediary.person.user_id == connector.person.user_id {
                        continue;
                    }

                    let mut steps = connector.prefix(ctx);
                    steps.push(PathStep::via(
                        membership.org.clone(),
                        membership.edge_type,
                        Direction::Outgoing,
                    ));
                    steps.push(PathStep::via(
                        intermediary.person.clone(),
                        *edge_type,
                        Direction::Incoming,
                    ));
                    steps.push(PathStep::via(
                        ctx.target.clone(),
                        EdgeType::Follows,
                        intermediary.direction.reverse(),
                    ));

                    paths.push(PathRecord::new(
                        connector.destination(ctx),
                        steps,
                        PathKind::OrgIndirect {
                            shared_org: membership.org.clone(),
                            intermediary: intermediary.person.clone(),
                            match_source: intermediary.match_source(),
                        },
                    ));
                }
            }
        }

        debug!(
            source = %ctx.source.user_id,
            target = %ctx.target.user_id,
            intermediaries = intermediaries.len(),
            paths = paths.len(),
            "Intermediary organization discovery complete"
        );

        Ok(paths)
    }
}

/// Individuals follow-connected to the target. When the edge runs both
/// ways the intermediary-to-target direction wins.
async fn target_neighbors(
    graph: &dyn GraphPort,
    ctx: &DiscoveryContext,
) -> Result<Vec<Intermediary>, GraphError> {
    let adjacent = graph
        .neighbors(
            &NeighborQuery::from_node(ctx.target.user_id.clone())
                .via(&[EdgeType::Follows])
                .both()
                .individuals(),
        )
        .await?;

    let mut out: Vec<Intermediary> = Vec::new();
    for adj in adjacent {
        if ctx.is_endpoint(&adj.node.user_id) {
            continue;
        }
        match out.iter_mut().find(|i| i.person.user_id == adj.node.user_id) {
            Some(existing) => {
                if adj.direction == Direction::Incoming {
                    existing.direction = Direction::Incoming;
                }
            }
            None => out.push(Intermediary {
                person: adj.node,
                direction: adj.direction,
            }),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    fn graph_with_intermediary(intermediary_follows_target: bool) -> MemoryGraph {
        let graph = base()
            .with_person(person("i"))
            .with_person(org("x"))
            .with_edge("s", EdgeType::WorksAt, "x")
            .with_edge("i", EdgeType::WorksAt, "x");
        if intermediary_follows_target {
            graph.with_edge("i", EdgeType::Follows, "t")
        } else {
            graph.with_edge("t", EdgeType::Follows, "i")
        }
    }

    #[tokio::test]
    async fn test_intermediary_follows_target() {
        let graph = graph_with_intermediary(true);
        let paths = OrgIndirectDiscoverer.discover(&graph, &ctx(&graph)).await.unwrap();

        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        assert_eq!(path.candidate.user_id, "t");
        assert_eq!(path.intermediary().unwrap().user_id, "i");
        assert_eq!(path.match_source(), Some(MatchSource::ProspectDirect));
        let ids: Vec<_> = path.steps.iter().map(|s| s.node.user_id.as_str()).collect();
        assert_eq!(ids, vec!["s", "x", "i", "t"]);
        assert_eq!(path.steps[3].link.unwrap().direction, Direction::Outgoing);
    }

    #[tokio::test]
    async fn test_target_follows_intermediary() {
        let graph = graph_with_intermediary(false);
        let paths = OrgIndirectDiscoverer.discover(&graph, &ctx(&graph)).await.unwrap();

        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].match_source(), Some(MatchSource::ProspectFollowing));
        assert_eq!(paths[0].steps[3].link.unwrap().direction, Direction::Incoming);
    }

    #[tokio::test]
    async fn test_direct_membership_left_to_direct_strategy() {
        let graph = graph_with_intermediary(true).with_edge("t", EdgeType::WorksAt, "x");
        let paths = OrgIndirectDiscoverer.discover(&graph, &ctx(&graph)).await.unwrap();
        assert!(paths.is_empty());
    }

    #[tokio::test]
    async fn test_network_connector_uses_all_four_hops() {
        let graph = base()
            .with_person(person("c"))
            .with_person(person("i"))
            .with_person(org("x"))
            .with_edge("s", EdgeType::Follows, "c")
            .with_edge("c", EdgeType::MemberOf, "x")
            .with_edge("i", EdgeType::MemberOf, "x")
            .with_edge("i", EdgeType::Follows, "t");

        let paths = OrgIndirectDiscoverer.discover(&graph, &ctx(&graph)).await.unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].candidate.user_id, "c");
        assert_eq!(paths[0].hops(), 4);

        let bounded = OrgIndirectDiscoverer
            .discover(&graph, &ctx_with_hops(&graph, 3))
            .await
            .unwrap();
        assert!(bounded.is_empty());
    }
}
