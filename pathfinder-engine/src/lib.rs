//! Pathfinder Engine - warm-intro path discovery and relevancy scoring
//!
//! Given a source person and a target person in the relationship graph,
//! finds the people who can connect them and ranks those people:
//!
//! - **Discovery**: five concurrent strategies (direct follows, shared
//!   organization, organization via intermediary, shared third party,
//!   chain affinity), each bounded to four hops
//! - **Aggregation**: one row per candidate, with every path and type merged
//! - **Scoring**: a versioned, explainable relevancy score
//! - **Ranking**: sort, search, pagination and facet counts
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   PathfinderService                      │
//! │                                                          │
//! │  ┌────────────┐   ┌────────────┐   ┌────────┐   ┌──────┐ │
//! │  │ Discoverers│──▶│ Aggregator │──▶│ Scorer │──▶│ Rank │ │
//! │  └─────┬──────┘   └────────────┘   └────────┘   └──────┘ │
//! │        │                                                 │
//! └────────┼─────────────────────────────────────────────────┘
//!          ▼
//!     GraphPort (pathfinder-graph)
//! ```

pub mod aggregate;
pub mod config;
pub mod discovery;
pub mod error;
pub mod path;
pub mod ranking;
pub mod request;
pub mod scoring;
pub mod service;

// Re-export main types
pub use aggregate::{aggregate, Candidate};
pub use config::{DiscoveryConfig, PathfinderConfig, RankingConfig};
pub use discovery::{default_discoverers, DiscoveryContext, PathDiscoverer};
pub use error::{PathfinderError, Result};
pub use path::{
    Link, MatchSource, OrgConnection, OrgRole, PathDescription, PathKind, PathRecord,
    PathSegment, PathStep, PathType, StepRole,
};
pub use ranking::{facets, rank, Facet, PagedResult, RankQuery, SortKey};
pub use request::PathRequest;
pub use scoring::{RelevancyScorer, ScoreBreakdown, ScoringWeights, SCORING_VERSION};
pub use service::{
    Coverage, DiscoveryReport, DiscoveryWarning, PathfinderService, SearchResponse, WarningKind,
};
