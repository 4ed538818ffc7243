//! The graph access port.
//!
//! This module defines the `GraphPort` trait - the read-only abstraction the
//! path engine uses to query the relationship graph. Backends (a graph
//! database client, the in-memory `MemoryGraph`) implement it; the engine
//! never sees a query language.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::types::{Adjacency, Direction, EdgeType, PersonNode, Vibe};

/// Hard upper bound on traversal depth, in hops.
pub const MAX_PATH_HOPS: usize = 4;

/// Error types for graph operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphError {
    /// Backend cannot be reached
    #[error("Graph unavailable: {0}")]
    Unavailable(String),

    /// A query was issued but failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The query itself is malformed
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;

/// Batched one-hop expansion.
#[derive(Debug, Clone)]
pub struct NeighborQuery {
    /// Nodes to expand from
    pub from: Vec<String>,
    /// Edge types to follow; empty means every type
    pub edge_types: Vec<EdgeType>,
    pub direction: Direction,
    /// Only return neighbors with this vibe
    pub vibe: Option<Vibe>,
}

impl NeighborQuery {
    /// Expand from a single node.
    pub fn from_node(user_id: impl Into<String>) -> Self {
        Self::from_nodes([user_id.into()])
    }

    /// Expand from several nodes at once.
    pub fn from_nodes(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            from: ids.into_iter().collect(),
            edge_types: Vec::new(),
            direction: Direction::Outgoing,
            vibe: None,
        }
    }

    /// Restrict to these edge types.
    pub fn via(mut self, edge_types: &[EdgeType]) -> Self {
        self.edge_types = edge_types.to_vec();
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn outgoing(self) -> Self {
        self.direction(Direction::Outgoing)
    }

    pub fn incoming(self) -> Self {
        self.direction(Direction::Incoming)
    }

    pub fn both(self) -> Self {
        self.direction(Direction::Both)
    }

    /// Only keep organization neighbors.
    pub fn organizations(mut self) -> Self {
        self.vibe = Some(Vibe::Organization);
        self
    }

    /// Only keep individual neighbors.
    pub fn individuals(mut self) -> Self {
        self.vibe = Some(Vibe::Individual);
        self
    }

    /// Whether an edge type passes this query's filter.
    pub fn accepts(&self, edge_type: EdgeType) -> bool {
        self.edge_types.is_empty() || self.edge_types.contains(&edge_type)
    }
}

/// Constraint that a reached node must also relate to a given node.
#[derive(Debug, Clone)]
pub struct RelatedTo {
    pub user_id: String,
    pub edge_types: Vec<EdgeType>,
    /// Direction from the reached node toward `user_id`
    pub direction: Direction,
}

/// Multi-hop pattern: nodes reachable from `start` via `edge_types` within
/// `max_hops`, optionally constrained to also relate to another node.
#[derive(Debug, Clone)]
pub struct TraversalQuery {
    pub start: String,
    pub edge_types: Vec<EdgeType>,
    pub direction: Direction,
    pub max_hops: usize,
    pub vibe: Option<Vibe>,
    pub also_related_to: Option<RelatedTo>,
}

impl TraversalQuery {
    pub fn new(start: impl Into<String>, edge_types: &[EdgeType], max_hops: usize) -> Self {
        Self {
            start: start.into(),
            edge_types: edge_types.to_vec(),
            direction: Direction::Outgoing,
            max_hops,
            vibe: None,
            also_related_to: None,
        }
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn vibe(mut self, vibe: Vibe) -> Self {
        self.vibe = Some(vibe);
        self
    }

    pub fn related_to(mut self, relation: RelatedTo) -> Self {
        self.also_related_to = Some(relation);
        self
    }
}

/// A node reached by a traversal, with the ids walked to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct Reached {
    pub node: PersonNode,
    /// Node ids from the start (inclusive) to `node` (inclusive)
    pub trail: Vec<String>,
    /// Edge that led into `node`
    pub edge_type: EdgeType,
    /// Direction of that edge relative to the previous node on the trail
    pub direction: Direction,
}

impl Reached {
    pub fn hops(&self) -> usize {
        self.trail.len().saturating_sub(1)
    }
}

/// Read-only access to the relationship graph.
///
/// Implementations must be safe to call concurrently; the engine issues
/// several queries in parallel against the same snapshot.
#[async_trait]
pub trait GraphPort: Send + Sync {
    /// Get the backend identifier.
    fn id(&self) -> &str;

    /// Check the backend is reachable.
    async fn ping(&self) -> Result<()>;

    /// Look up nodes by id. Unknown ids are omitted from the result.
    async fn get_people(&self, user_ids: &[String]) -> Result<Vec<PersonNode>>;

    /// Look up nodes by handle, ignoring case and a leading `@`.
    async fn find_by_screen_names(&self, handles: &[String]) -> Result<Vec<PersonNode>>;

    /// Expand one hop from every node in the query.
    async fn neighbors(&self, query: &NeighborQuery) -> Result<Vec<Adjacency>>;

    /// Look up a single node.
    async fn get_person(&self, user_id: &str) -> Result<Option<PersonNode>> {
        let mut found = self.get_people(&[user_id.to_string()]).await?;
        Ok(found.pop())
    }

    /// Breadth-first traversal composed from `neighbors`.
    ///
    /// Each node is reported once, at its shallowest depth. Depth is capped
    /// at [`MAX_PATH_HOPS`] regardless of the requested bound.
    async fn reachable(&self, query: &TraversalQuery) -> Result<Vec<Reached>> {
        if query.start.is_empty() {
            return Err(GraphError::InvalidQuery("traversal start is empty".into()));
        }

        let max_hops = query.max_hops.min(MAX_PATH_HOPS);
        let mut trails: HashMap<String, Vec<String>> = HashMap::new();
        trails.insert(query.start.clone(), vec![query.start.clone()]);

        let mut reached = Vec::new();
        let mut frontier = vec![query.start.clone()];

        for _ in 0..max_hops {
            if frontier.is_empty() {
                break;
            }

            let expansion = NeighborQuery::from_nodes(frontier.drain(..))
                .via(&query.edge_types)
                .direction(query.direction);

            for adj in self.neighbors(&expansion).await? {
                if trails.contains_key(&adj.node.user_id) {
                    continue;
                }
                let mut trail = trails.get(&adj.from_id).cloned().unwrap_or_default();
                trail.push(adj.node.user_id.clone());
                trails.insert(adj.node.user_id.clone(), trail.clone());
                frontier.push(adj.node.user_id.clone());
                reached.push(Reached {
                    node: adj.node,
                    trail,
                    edge_type: adj.edge_type,
                    direction: adj.direction,
                });
            }
        }

        if let Some(vibe) = query.vibe {
            reached.retain(|r| r.node.vibe == vibe);
        }

        if let Some(relation) = &query.also_related_to {
            if reached.is_empty() {
                return Ok(reached);
            }
            let check = NeighborQuery::from_nodes(reached.iter().map(|r| r.node.user_id.clone()))
                .via(&relation.edge_types)
                .direction(relation.direction);
            let related: HashSet<String> = self
                .neighbors(&check)
                .await?
                .into_iter()
                .filter(|adj| adj.node.user_id == relation.user_id)
                .map(|adj| adj.from_id)
                .collect();
            reached.retain(|r| related.contains(&r.node.user_id));
        }

        Ok(reached)
    }
}
