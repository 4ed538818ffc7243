//! Chain affinity discoverer.

use async_trait::async_trait;
use tracing::debug;

use pathfinder_graph::{Direction, GraphError, GraphPort, PersonNode};

use super::{connectors, memberships, target_organizations, target_tail, DiscoveryContext, PathDiscoverer};
use crate::path::{PathKind, PathRecord, PathStep, PathType};

/// Finds a connector's organization and a target-side organization that
/// operate on at least one common chain. The jump between the two
/// organizations is a category match, not an edge.
///
/// Path: `[source, (connector,) orgA, orgB, target]`, or
/// `[source, (connector,) orgA, target]` when the target is the organization.
pub struct ChainAffinityDiscoverer;

#[async_trait]
impl PathDiscoverer for ChainAffinityDiscoverer {
    fn path_type(&self) -> PathType {
        PathType::ChainAffinity
    }

    async fn discover(
        &self,
        graph: &dyn GraphPort,
        ctx: &DiscoveryContext,
    ) -> Result<Vec<PathRecord>, GraphError> {
        if !ctx.within(2) {
            return Ok(Vec::new());
        }

        let target_orgs: Vec<_> = target_organizations(graph, ctx)
            .await?
            .into_iter()
            .filter(|(org, _)| !org.chains.is_empty())
            .collect();
        if target_orgs.is_empty() {
            return Ok(Vec::new());
        }

        let connectors = connectors(graph, ctx, ctx.within(3)).await?;
        let ids = connectors.iter().map(|c| c.person.user_id.clone()).collect();
        let by_person = memberships(graph, ids).await?;

        let mut paths = Vec::new();
        for connector in &connectors {
            let Some(list) = by_person.get(&connector.person.user_id) else {
                continue;
            };
            for membership in list {
                let org_a = &membership.org;
                if org_a.chains.is_empty() {
                    continue;
                }

                for (org_b, edge) in &target_orgs {
                    if org_b.user_id == org_a.user_id {
                        continue;
                    }
                    let shared = shared_chains(org_a, org_b);
                    if shared.is_empty() {
                        continue;
                    }

                    let mut steps = connector.prefix(ctx);
                    steps.push(PathStep::via(
                        org_a.clone(),
                        membership.edge_type,
                        Direction::Outgoing,
                    ));
                    steps.push(PathStep::jump(org_b.clone()));
                    steps.extend(target_tail(ctx, *edge));

                    if !ctx.within(steps.len() - 1) {
                        continue;
                    }

                    paths.push(PathRecord::new(
                        connector.destination(ctx),
                        steps,
                        PathKind::ChainAffinity {
                            source_org: org_a.clone(),
                            target_org: org_b.clone(),
                            shared_chains: shared,
                        },
                    ));
                }
            }
        }

        debug!(
            source = %ctx.source.user_id,
            target = %ctx.target.user_id,
            target_orgs = target_orgs.len(),
            paths = paths.len(),
            "Chain affinity discovery complete"
        );

        Ok(paths)
    }
}

/// Chains both organizations list, ignoring case, in `a`'s order and spelling.
pub(crate) fn shared_chains(a: &PersonNode, b: &PersonNode) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for chain in &a.chains {
        let chain = chain.trim();
        if chain.is_empty() || out.iter().any(|c| c.eq_ignore_ascii_case(chain)) {
            continue;
        }
        if b.chains.iter().any(|other| other.trim().eq_ignore_ascii_case(chain)) {
            out.push(chain.to_string());
        }
    }
    out
}
