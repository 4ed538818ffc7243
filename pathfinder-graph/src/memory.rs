//! In-memory graph backend.
//!
//! Holds a fixed snapshot of people and edges. Used by tests and by the CLI
//! when running against an exported JSON snapshot. Availability and
//! per-edge-type failures can be toggled to exercise degraded discovery.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::port::{GraphError, GraphPort, NeighborQuery, Result};
use crate::types::{Adjacency, Direction, EdgeRecord, EdgeType, PersonNode};

/// Serialized form of a graph: nodes plus typed edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub people: Vec<PersonNode>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

/// In-memory `GraphPort` implementation.
pub struct MemoryGraph {
    graph_id: String,
    people: HashMap<String, PersonNode>,
    /// Lowercased handle -> user id
    handles: HashMap<String, String>,
    outgoing: HashMap<String, Vec<(EdgeType, String)>>,
    incoming: HashMap<String, Vec<(EdgeType, String)>>,
    edge_set: HashSet<EdgeRecord>,
    available: AtomicBool,
    failing: HashSet<EdgeType>,
    latency: Option<Duration>,
    query_count: AtomicU32,
}

impl MemoryGraph {
    /// Create an empty graph.
    pub fn new(graph_id: impl Into<String>) -> Self {
        Self {
            graph_id: graph_id.into(),
            people: HashMap::new(),
            handles: HashMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            edge_set: HashSet::new(),
            available: AtomicBool::new(true),
            failing: HashSet::new(),
            latency: None,
            query_count: AtomicU32::new(0),
        }
    }

    /// Build a graph from a snapshot.
    pub fn from_snapshot(graph_id: impl Into<String>, snapshot: GraphSnapshot) -> Self {
        let mut graph = Self::new(graph_id);
        for person in snapshot.people {
            graph.insert_person(person);
        }
        for edge in snapshot.edges {
            graph.insert_edge(edge);
        }
        graph
    }

    /// Parse a JSON snapshot.
    pub fn from_json(graph_id: impl Into<String>, json: &str) -> std::result::Result<Self, serde_json::Error> {
        let snapshot: GraphSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(graph_id, snapshot))
    }

    /// Export the current contents.
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut people: Vec<PersonNode> = self.people.values().cloned().collect();
        people.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        let mut edges: Vec<EdgeRecord> = self.edge_set.iter().cloned().collect();
        edges.sort_by(|a, b| {
            (a.from.as_str(), a.edge_type, a.to.as_str()).cmp(&(b.from.as_str(), b.edge_type, b.to.as_str()))
        });
        GraphSnapshot { people, edges }
    }

    /// Add or replace a node.
    pub fn insert_person(&mut self, person: PersonNode) {
        if let Some(previous) = self.people.get(&person.user_id) {
            let old_handle = previous.screen_name.to_lowercase();
            if self.handles.get(&old_handle) == Some(&person.user_id) {
                self.handles.remove(&old_handle);
            }
        }
        self.handles
            .insert(person.screen_name.to_lowercase(), person.user_id.clone());
        self.people.insert(person.user_id.clone(), person);
    }

    /// Add an edge. Duplicates are ignored.
    pub fn insert_edge(&mut self, edge: EdgeRecord) {
        if !self.edge_set.insert(edge.clone()) {
            return;
        }
        self.outgoing
            .entry(edge.from.clone())
            .or_default()
            .push((edge.edge_type, edge.to.clone()));
        self.incoming
            .entry(edge.to)
            .or_default()
            .push((edge.edge_type, edge.from));
    }

    /// Add a node.
    pub fn with_person(mut self, person: PersonNode) -> Self {
        self.insert_person(person);
        self
    }

    /// Add an edge `from -[edge_type]-> to`.
    pub fn with_edge(mut self, from: &str, edge_type: EdgeType, to: &str) -> Self {
        self.insert_edge(EdgeRecord::new(from, edge_type, to));
        self
    }

    /// Set availability.
    pub fn with_available(self, available: bool) -> Self {
        self.available.store(available, Ordering::SeqCst);
        self
    }

    /// Make every neighbor query that may touch `edge_type` fail.
    pub fn with_failing_edge_type(mut self, edge_type: EdgeType) -> Self {
        self.failing.insert(edge_type);
        self
    }

    /// Delay every neighbor query.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Toggle availability at runtime.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of queries served so far.
    pub fn query_count(&self) -> u32 {
        self.query_count.load(Ordering::SeqCst)
    }

    pub fn person_count(&self) -> usize {
        self.people.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_set.len()
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GraphError::Unavailable(format!("{} is offline", self.graph_id)))
        }
    }

    fn check_faults(&self, query: &NeighborQuery) -> Result<()> {
        let hit = if query.edge_types.is_empty() {
            self.failing.iter().next().copied()
        } else {
            query.edge_types.iter().find(|t| self.failing.contains(t)).copied()
        };
        match hit {
            Some(edge_type) => Err(GraphError::QueryFailed(format!(
                "injected failure on {} edges",
                edge_type
            ))),
            None => Ok(()),
        }
    }

    fn collect(
        &self,
        index: &HashMap<String, Vec<(EdgeType, String)>>,
        from_id: &str,
        direction: Direction,
        query: &NeighborQuery,
        out: &mut Vec<Adjacency>,
    ) {
        let Some(edges) = index.get(from_id) else {
            return;
        };
        for (edge_type, other) in edges {
            if !query.accepts(*edge_type) {
                continue;
            }
            let Some(node) = self.people.get(other) else {
                continue;
            };
            if query.vibe.is_some_and(|v| v != node.vibe) {
                continue;
            }
            out.push(Adjacency {
                from_id: from_id.to_string(),
                node: node.clone(),
                edge_type: *edge_type,
                direction,
            });
        }
    }
}

impl std::fmt::Debug for MemoryGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGraph")
            .field("graph_id", &self.graph_id)
            .field("people", &self.people.len())
            .field("edges", &self.edge_set.len())
            .field("available", &self.available.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new("memory")
    }
}

#[async_trait]
impl GraphPort for MemoryGraph {
    fn id(&self) -> &str {
        &self.graph_id
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }

    async fn get_people(&self, user_ids: &[String]) -> Result<Vec<PersonNode>> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(user_ids
            .iter()
            .filter_map(|id| self.people.get(id).cloned())
            .collect())
    }

    async fn find_by_screen_names(&self, handles: &[String]) -> Result<Vec<PersonNode>> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(handles
            .iter()
            .filter_map(|h| self.handles.get(&h.trim_start_matches('@').to_lowercase()))
            .filter_map(|id| self.people.get(id).cloned())
            .collect())
    }

    async fn neighbors(&self, query: &NeighborQuery) -> Result<Vec<Adjacency>> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.check_available()?;
        self.check_faults(query)?;

        let mut out = Vec::new();
        for from_id in &query.from {
            if matches!(query.direction, Direction::Outgoing | Direction::Both) {
                self.collect(&self.outgoing, from_id, Direction::Outgoing, query, &mut out);
            }
            if matches!(query.direction, Direction::Incoming | Direction::Both) {
                self.collect(&self.incoming, from_id, Direction::Incoming, query, &mut out);
            }
        }

        trace!(
            graph = %self.graph_id,
            from = query.from.len(),
            results = out.len(),
            "Neighbor query served"
        );

        Ok(out)
    }
}
