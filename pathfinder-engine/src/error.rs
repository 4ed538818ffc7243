//! Error types for the path engine.

use pathfinder_graph::GraphError;

/// Errors that halt a path request.
///
/// Partial discovery failures are not errors; they are reported as
/// warnings on the `DiscoveryReport`.
#[derive(Debug, thiserror::Error)]
pub enum PathfinderError {
    /// Request is malformed (empty ids, source equals target)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A request id does not exist in the graph
    #[error("Unknown person: {0}")]
    UnknownPerson(String),

    /// Target handle could not be resolved
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    /// Graph backend cannot be reached
    #[error("Graph unavailable: {0}")]
    GraphUnavailable(String),

    /// Graph error outside of discovery
    #[error("Graph error: {0}")]
    Graph(GraphError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<GraphError> for PathfinderError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Unavailable(msg) => Self::GraphUnavailable(msg),
            other => Self::Graph(other),
        }
    }
}

impl PathfinderError {
    /// Whether the request was rejected before any query was issued.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, PathfinderError>;
