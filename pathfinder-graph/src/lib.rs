//! Pathfinder Graph - read-only access to the relationship graph
//!
//! Provides the boundary between the path engine and whatever stores the
//! property graph of people, organizations and typed relationships:
//! - `GraphPort`: batched, read-only query trait (neighbors, lookups, bounded traversal)
//! - `MemoryGraph`: in-memory backend over a JSON snapshot, with fault injection
//! - Node and edge types shared by every crate in the workspace

pub mod memory;
pub mod port;
pub mod types;

// Re-export main types for convenience
pub use memory::{GraphSnapshot, MemoryGraph};
pub use port::{
    GraphError, GraphPort, NeighborQuery, Reached, RelatedTo, TraversalQuery, MAX_PATH_HOPS,
};
pub use types::*;
