//! Shared third party discoverer.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use pathfinder_graph::{Direction, EdgeType, GraphError, GraphPort, NeighborQuery, PersonNode};

use super::{connectors, memberships, target_organizations, target_tail, DiscoveryContext, PathDiscoverer};
use crate::path::{PathKind, PathRecord, PathStep, PathType};

/// Finds a connector's organization and a target-side organization that
/// relate through an investor, auditor or partner.
///
/// Two shapes:
/// - a common third entity: `[source, orgA, thirdParty, orgB, target]`
/// - a direct link, where the edge's origin is the third party:
///   `[source, (connector,) orgA, orgB, target]`
pub struct SharedThirdPartyDiscoverer;

/// A third-party edge seen from one organization.
struct Relation {
    other: PersonNode,
    edge_type: EdgeType,
    /// Relative to the organization the relation was queried from
    direction: Direction,
}

#[async_trait]
impl PathDiscoverer for SharedThirdPartyDiscoverer {
    fn path_type(&self) -> PathType {
        PathType::SharedThirdParty
    }

    async fn discover(
        &self,
        graph: &dyn GraphPort,
        ctx: &DiscoveryContext,
    ) -> Result<Vec<PathRecord>, GraphError> {
        // Shortest shape: [source, orgA, target-as-orgB].
        if !ctx.within(2) {
            return Ok(Vec::new());
        }

        let target_orgs = target_organizations(graph, ctx).await?;
        if target_orgs.is_empty() {
            return Ok(Vec::new());
        }

        let connectors = connectors(graph, ctx, ctx.within(3)).await?;
        let ids = connectors.iter().map(|c| c.person.user_id.clone()).collect();
        let by_person = memberships(graph, ids).await?;

        let mut org_ids: Vec<String> = by_person
            .values()
            .flatten()
            .map(|m| m.org.user_id.clone())
            .chain(target_orgs.iter().map(|(org, _)| org.user_id.clone()))
            .collect();
        org_ids.sort();
        org_ids.dedup();

        let relations = third_party_relations(graph, org_ids).await?;
        let target_edge: HashMap<&str, Option<EdgeType>> = target_orgs
            .iter()
            .map(|(org, edge)| (org.user_id.as_str(), *edge))
            .collect();

        // third party id -> target-side orgs it relates to
        let mut through: HashMap<&str, Vec<(&PersonNode, &Relation)>> = HashMap::new();
        for (org, _) in &target_orgs {
            for relation in relations.get(&org.user_id).into_iter().flatten() {
                if ctx.is_endpoint(&relation.other.user_id) {
                    continue;
                }
                through
                    .entry(relation.other.user_id.as_str())
                    .or_default()
                    .push((org, relation));
            }
        }

        let mut paths = Vec::new();
        for connector in &connectors {
            let Some(list) = by_person.get(&connector.person.user_id) else {
                continue;
            };
            for membership in list {
                let org_a = &membership.org;
                let mut head = connector.prefix(ctx);
                head.push(PathStep::via(
                    org_a.clone(),
                    membership.edge_type,
                    Direction::Outgoing,
                ));

                for relation in relations.get(&org_a.user_id).into_iter().flatten() {
                    // Direct link: orgA and orgB relate to each other.
                    if let Some(edge) = target_edge.get(relation.other.user_id.as_str()) {
                        let org_b = &relation.other;
                        if org_b.user_id == org_a.user_id {
                            continue;
                        }
                        let third_party = match relation.direction {
                            Direction::Outgoing => org_a,
                            _ => org_b,
                        };

                        let mut steps = head.clone();
                        steps.push(PathStep::via(
                            org_b.clone(),
                            relation.edge_type,
                            relation.direction,
                        ));
                        steps.extend(target_tail(ctx, *edge));

                        if ctx.within(steps.len() - 1) {
                            paths.push(PathRecord::new(
                                connector.destination(ctx),
                                steps,
                                PathKind::SharedThirdParty {
                                    source_org: org_a.clone(),
                                    third_party: third_party.clone(),
                                    target_org: org_b.clone(),
                                    relation: relation.edge_type,
                                },
                            ));
                        }
                    }

                    // Common third entity between orgA and some orgB.
                    if ctx.is_endpoint(&relation.other.user_id) {
                        continue;
                    }
                    let third_party = &relation.other;
                    for (org_b, back) in through.get(third_party.user_id.as_str()).into_iter().flatten() {
                        if org_b.user_id == org_a.user_id || org_b.user_id == third_party.user_id {
                            continue;
                        }
                        let tail_edge = target_edge.get(org_b.user_id.as_str()).copied().flatten();
                        let steps_needed = head.len() + 1 + usize::from(tail_edge.is_some());
                        if !ctx.within(steps_needed) {
                            continue;
                        }

                        let mut steps = head.clone();
                        steps.push(PathStep::via(
                            third_party.clone(),
                            relation.edge_type,
                            relation.direction,
                        ));
                        steps.push(PathStep::via(
                            (*org_b).clone(),
                            back.edge_type,
                            back.direction.reverse(),
                        ));
                        steps.extend(target_tail(ctx, tail_edge));

                        paths.push(PathRecord::new(
                            connector.destination(ctx),
                            steps,
                            PathKind::SharedThirdParty {
                                source_org: org_a.clone(),
                                third_party: third_party.clone(),
                                target_org: (*org_b).clone(),
                                relation: relation.edge_type,
                            },
                        ));
                    }
                }
            }
        }

        debug!(
            source = %ctx.source.user_id,
            target = %ctx.target.user_id,
            organizations = relations.len(),
            paths = paths.len(),
            "Shared third party discovery complete"
        );

        Ok(paths)
    }
}

/// Third-party edges touching each organization, in both directions.
async fn third_party_relations(
    graph: &dyn GraphPort,
    org_ids: Vec<String>,
) -> Result<HashMap<String, Vec<Relation>>, GraphError> {
    let mut out: HashMap<String, Vec<Relation>> = HashMap::new();
    if org_ids.is_empty() {
        return Ok(out);
    }

    let adjacent = graph
        .neighbors(
            &NeighborQuery::from_nodes(org_ids)
                .via(&EdgeType::THIRD_PARTY)
                .both(),
        )
        .await?;

    for adj in adjacent {
        out.entry(adj.from_id).or_default().push(Relation {
            other: adj.node,
            edge_type: adj.edge_type,
            direction: adj.direction,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    #[tokio::test]
    async fn test_direct_investment_link() {
        let graph = base()
            .with_person(org("x"))
            .with_person(org("y"))
            .with_edge("s", EdgeType::WorksAt, "x")
            .with_edge("x", EdgeType::InvestedIn, "y")
            .with_edge("t", EdgeType::WorksAt, "y");

        let paths = SharedThirdPartyDiscoverer
            .discover(&graph, &ctx(&graph))
            .await
            .unwrap();

        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        assert_eq!(path.candidate.user_id, "t");
        assert_eq!(path.third_party().unwrap().user_id, "x");
        let ids: Vec<_> = path.steps.iter().map(|s| s.node.user_id.as_str()).collect();
        assert_eq!(ids, vec!["s", "x", "y", "t"]);
    }

    #[tokio::test]
    async fn test_common_auditor() {
        let graph = base()
            .with_person(org("x"))
            .with_person(org("y"))
            .with_person(org("audit"))
            .with_edge("s", EdgeType::WorksAt, "x")
            .with_edge("t", EdgeType::WorksAt, "y")
            .with_edge("audit", EdgeType::Audits, "x")
            .with_edge("audit", EdgeType::Audits, "y");

        let paths = SharedThirdPartyDiscoverer
            .discover(&graph, &ctx(&graph))
            .await
            .unwrap();

        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        assert_eq!(path.hops(), 4);
        assert_eq!(path.third_party().unwrap().user_id, "audit");
        match &path.kind {
            PathKind::SharedThirdParty {
                source_org,
                target_org,
                relation,
                ..
            } => {
                assert_eq!(source_org.user_id, "x");
                assert_eq!(target_org.user_id, "y");
                assert_eq!(*relation, EdgeType::Audits);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_common_third_party_through_network_exceeds_bound() {
        let graph = base()
            .with_person(person("c"))
            .with_person(org("x"))
            .with_person(org("y"))
            .with_person(org("fund"))
            .with_edge("s", EdgeType::Follows, "c")
            .with_edge("c", EdgeType::WorksAt, "x")
            .with_edge("t", EdgeType::WorksAt, "y")
            .with_edge("fund", EdgeType::InvestedIn, "x")
            .with_edge("fund", EdgeType::InvestedIn, "y");

        let paths = SharedThirdPartyDiscoverer
            .discover(&graph, &ctx(&graph))
            .await
            .unwrap();
        assert!(paths.is_empty());
    }

    #[tokio::test]
    async fn test_unrelated_orgs_yield_nothing() {
        let graph = base()
            .with_person(org("x"))
            .with_person(org("y"))
            .with_edge("s", EdgeType::WorksAt, "x")
            .with_edge("t", EdgeType::WorksAt, "y");

        let paths = SharedThirdPartyDiscoverer
            .discover(&graph, &ctx(&graph))
            .await
            .unwrap();
        assert!(paths.is_empty());
    }
}
