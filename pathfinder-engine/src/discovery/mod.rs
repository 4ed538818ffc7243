//! Path discoverers.
//!
//! Each discoverer answers one question about a (source, target) pair and
//! returns the paths of its type:
//!
//! 1. **Direct**: people follow-connected to both sides
//! 2. **OrgDirect**: a connector shares an organization with the target
//! 3. **OrgIndirect**: the shared organization reaches the target through an intermediary
//! 4. **SharedThirdParty**: both sides' organizations share an investor/auditor/partner
//! 5. **ChainAffinity**: both sides' organizations operate on the same chains
//!
//! A *connector* is the source itself or someone in the source's follow
//! network. Paths through the source end at the target; paths through a
//! network member are attributed to that member.

mod chain_affinity;
mod direct;
mod org_direct;
mod org_indirect;
mod third_party;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use pathfinder_graph::{
    Direction, EdgeType, GraphError, GraphPort, NeighborQuery, PersonNode, MAX_PATH_HOPS,
};

use crate::config::DiscoveryConfig;
use crate::error::PathfinderError;
use crate::path::{PathStep, PathType};

pub use chain_affinity::ChainAffinityDiscoverer;
pub use direct::DirectDiscoverer;
pub use org_direct::OrgDirectDiscoverer;
pub use org_indirect::OrgIndirectDiscoverer;
pub use third_party::SharedThirdPartyDiscoverer;

/// One path discovery strategy.
///
/// Implementations are read-only and idempotent. Zero results is `Ok(vec![])`.
#[async_trait]
pub trait PathDiscoverer: Send + Sync {
    /// Path type this discoverer produces.
    fn path_type(&self) -> PathType;

    /// Discover paths for the pair in `ctx`.
    async fn discover(
        &self,
        graph: &dyn GraphPort,
        ctx: &DiscoveryContext,
    ) -> Result<Vec<crate::path::PathRecord>, GraphError>;
}

/// The default discoverer set, filtered by the enabled path types.
pub fn default_discoverers(config: &DiscoveryConfig) -> Vec<Arc<dyn PathDiscoverer>> {
    let all: Vec<Arc<dyn PathDiscoverer>> = vec![
        Arc::new(DirectDiscoverer),
        Arc::new(OrgDirectDiscoverer),
        Arc::new(OrgIndirectDiscoverer),
        Arc::new(SharedThirdPartyDiscoverer),
        Arc::new(ChainAffinityDiscoverer),
    ];
    all.into_iter()
        .filter(|d| config.is_enabled(d.path_type()))
        .collect()
}

/// Per-request input shared by every discoverer.
#[derive(Debug, Clone)]
pub struct DiscoveryContext {
    pub source: PersonNode,
    pub target: PersonNode,
    /// Maximum path length in hops
    pub max_hops: usize,
    /// Cap on source-network members used as connectors
    pub max_network_size: usize,
}

impl DiscoveryContext {
    /// Build the context for a pair. Empty ids and self-paths are rejected.
    pub fn new(
        source: PersonNode,
        target: PersonNode,
        config: &DiscoveryConfig,
    ) -> crate::error::Result<Self> {
        if source.user_id.trim().is_empty() || target.user_id.trim().is_empty() {
            return Err(PathfinderError::Validation(
                "source and target ids must not be empty".into(),
            ));
        }
        if source.user_id == target.user_id {
            return Err(PathfinderError::Validation(format!(
                "source and target are the same person: {}",
                source.user_id
            )));
        }

        Ok(Self {
            source,
            target,
            max_hops: config.max_hops.min(MAX_PATH_HOPS),
            max_network_size: config.max_network_size,
        })
    }

    /// Whether a path of this many hops is allowed.
    pub fn within(&self, hops: usize) -> bool {
        hops <= self.max_hops
    }

    /// Whether a node is one of the two request endpoints.
    pub fn is_endpoint(&self, user_id: &str) -> bool {
        user_id == self.source.user_id || user_id == self.target.user_id
    }
}

/// The person a path is routed through on the source side.
#[derive(Debug, Clone)]
pub(crate) struct Connector {
    pub person: PersonNode,
    /// Follow edge to the source; None when the connector is the source
    pub follow: Option<Direction>,
}

impl Connector {
    /// Hops spent before the connector's organization.
    pub fn prefix_hops(&self) -> usize {
        usize::from(self.follow.is_some())
    }

    /// Steps from the source up to and including the connector.
    pub fn prefix(&self, ctx: &DiscoveryContext) -> Vec<PathStep> {
        let mut steps = vec![PathStep::start(ctx.source.clone())];
        if let Some(direction) = self.follow {
            steps.push(PathStep::via(self.person.clone(), EdgeType::Follows, direction));
        }
        steps
    }

    /// Person the path is attributed to.
    pub fn destination(&self, ctx: &DiscoveryContext) -> PersonNode {
        match self.follow {
            Some(_) => self.person.clone(),
            None => ctx.target.clone(),
        }
    }
}

/// An organizational edge from a person to an organization.
#[derive(Debug, Clone)]
pub(crate) struct Membership {
    pub org: PersonNode,
    pub edge_type: EdgeType,
}

/// Individuals follow-connected to `user_id`, each once, with the edge
/// direction relative to `user_id`.
pub(crate) async fn follow_network(
    graph: &dyn GraphPort,
    user_id: &str,
) -> Result<Vec<(PersonNode, Direction)>, GraphError> {
    let adjacent = graph
        .neighbors(
            &NeighborQuery::from_node(user_id)
                .via(&[EdgeType::Follows])
                .both()
                .individuals(),
        )
        .await?;

    let mut seen = HashSet::new();
    Ok(adjacent
        .into_iter()
        .filter(|adj| seen.insert(adj.node.user_id.clone()))
        .map(|adj| (adj.node, adj.direction))
        .collect())
}

/// The source plus, when `with_network` is set, its follow network.
pub(crate) async fn connectors(
    graph: &dyn GraphPort,
    ctx: &DiscoveryContext,
    with_network: bool,
) -> Result<Vec<Connector>, GraphError> {
    let mut out = vec![Connector {
        person: ctx.source.clone(),
        follow: None,
    }];

    if with_network {
        let network = follow_network(graph, &ctx.source.user_id).await?;
        out.extend(
            network
                .into_iter()
                .filter(|(person, _)| !ctx.is_endpoint(&person.user_id))
                .take(ctx.max_network_size)
                .map(|(person, direction)| Connector {
                    person,
                    follow: Some(direction),
                }),
        );
    }

    Ok(out)
}

/// Organizational memberships for a batch of people, keyed by person id.
pub(crate) async fn memberships(
    graph: &dyn GraphPort,
    user_ids: Vec<String>,
) -> Result<HashMap<String, Vec<Membership>>, GraphError> {
    let mut out: HashMap<String, Vec<Membership>> = HashMap::new();
    if user_ids.is_empty() {
        return Ok(out);
    }

    let adjacent = graph
        .neighbors(
            &NeighborQuery::from_nodes(user_ids)
                .via(&EdgeType::ORGANIZATIONAL)
                .outgoing()
                .organizations(),
        )
        .await?;

    for adj in adjacent {
        let entry = out.entry(adj.from_id).or_default();
        if entry.iter().any(|m| m.org.user_id == adj.node.user_id) {
            continue;
        }
        entry.push(Membership {
            org: adj.node,
            edge_type: adj.edge_type,
        });
    }
    Ok(out)
}

/// Organizations on the target's side: its memberships, plus the target
/// itself when it is an organization (with no edge).
pub(crate) async fn target_organizations(
    graph: &dyn GraphPort,
    ctx: &DiscoveryContext,
) -> Result<Vec<(PersonNode, Option<EdgeType>)>, GraphError> {
    let mut orgs = Vec::new();
    if ctx.target.is_organization() {
        orgs.push((ctx.target.clone(), None));
    }
    let mut by_person = memberships(graph, vec![ctx.target.user_id.clone()]).await?;
    if let Some(list) = by_person.remove(&ctx.target.user_id) {
        orgs.extend(list.into_iter().map(|m| (m.org, Some(m.edge_type))));
    }
    Ok(orgs)
}

/// Steps from a target-side organization to the target: nothing when the
/// organization is the target, else the target's membership edge walked
/// backwards.
pub(crate) fn target_tail(
    ctx: &DiscoveryContext,
    edge_type: Option<EdgeType>,
) -> Vec<PathStep> {
    match edge_type {
        Some(edge_type) => vec![PathStep::via(
            ctx.target.clone(),
            edge_type,
            Direction::Incoming,
        )],
        None => Vec::new(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small graphs shared by the discoverer tests.

    use pathfinder_graph::{EdgeType, PersonNode};

    pub use pathfinder_graph::MemoryGraph;

    use super::DiscoveryContext;
    use crate::config::DiscoveryConfig;

    pub fn person(id: &str) -> PersonNode {
        PersonNode::individual(id, id)
    }

    pub fn org(id: &str) -> PersonNode {
        PersonNode::organization(id, id)
    }

    /// source "s", target "t", plus whatever the caller adds.
    pub fn base() -> MemoryGraph {
        MemoryGraph::new("fixture")
            .with_person(person("s"))
            .with_person(person("t"))
    }

    pub fn ctx(graph: &MemoryGraph) -> DiscoveryContext {
        ctx_with_hops(graph, 4)
    }

    pub fn ctx_with_hops(graph: &MemoryGraph, max_hops: usize) -> DiscoveryContext {
        let snapshot = graph.snapshot();
        let find = |id: &str| {
            snapshot
                .people
                .iter()
                .find(|p| p.user_id == id)
                .cloned()
                .expect("fixture node")
        };
        let config = DiscoveryConfig {
            max_hops,
            ..Default::default()
        };
        DiscoveryContext::new(find("s"), find("t"), &config).expect("fixture context")
    }

    pub fn works_at(graph: MemoryGraph, who: &str, org: &str) -> MemoryGraph {
        graph.with_edge(who, EdgeType::WorksAt, org)
    }
}
