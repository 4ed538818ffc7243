//! Request orchestration: discovery fan-out, aggregation, scoring.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use pathfinder_graph::{GraphError, GraphPort, PersonNode};

use crate::aggregate::{aggregate, Candidate};
use crate::config::PathfinderConfig;
use crate::discovery::{default_discoverers, DiscoveryContext, PathDiscoverer};
use crate::error::{PathfinderError, Result};
use crate::path::{PathRecord, PathType};
use crate::ranking::{compare, facets, rank, Facet, PagedResult, RankQuery, SortKey};
use crate::request::PathRequest;
use crate::scoring::RelevancyScorer;

/// Whether every discoverer contributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    Complete,
    Partial,
}

/// Why a discoverer contributed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    Failed,
    TimedOut,
}

/// A discoverer that failed or ran out of time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryWarning {
    pub path_type: PathType,
    pub kind: WarningKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DiscoveryWarning {
    pub fn failed(path_type: PathType, message: impl Into<String>) -> Self {
        Self {
            path_type,
            kind: WarningKind::Failed,
            message: Some(message.into()),
        }
    }

    pub fn timed_out(path_type: PathType) -> Self {
        Self {
            path_type,
            kind: WarningKind::TimedOut,
            message: None,
        }
    }
}

/// Scored candidates for one request, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryReport {
    /// Correlates the report with its log lines
    pub request_id: Uuid,
    pub source_user_id: String,
    pub target_user_id: String,
    pub candidates: Vec<Candidate>,
    pub warnings: Vec<DiscoveryWarning>,
    pub coverage: Coverage,
    /// Reference instant used for freshness
    pub generated_at: DateTime<Utc>,
}

impl DiscoveryReport {
    pub fn is_partial(&self) -> bool {
        self.coverage == Coverage::Partial
    }

    pub fn candidate(&self, user_id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.person.user_id == user_id)
    }
}

/// One ranked page plus the discovery status it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub request_id: Uuid,
    pub page: PagedResult<Candidate>,
    /// Counts over every candidate, before search and type filters
    pub facets: Vec<Facet>,
    pub warnings: Vec<DiscoveryWarning>,
    pub coverage: Coverage,
    pub generated_at: DateTime<Utc>,
}

/// Path engine entry point.
pub struct PathfinderService {
    graph: Arc<dyn GraphPort>,
    config: PathfinderConfig,
    scorer: RelevancyScorer,
    discoverers: Vec<Arc<dyn PathDiscoverer>>,
}

impl PathfinderService {
    /// Create a service over a graph backend. Rejects invalid config.
    pub fn new(graph: Arc<dyn GraphPort>, config: PathfinderConfig) -> Result<Self> {
        config.validate()?;
        let scorer = RelevancyScorer::new(config.scoring.clone())?;
        let discoverers = default_discoverers(&config.discovery);
        Ok(Self {
            graph,
            config,
            scorer,
            discoverers,
        })
    }

    /// Replace the discoverer set.
    pub fn with_discoverers(mut self, discoverers: Vec<Arc<dyn PathDiscoverer>>) -> Self {
        self.discoverers = discoverers;
        self
    }

    pub fn config(&self) -> &PathfinderConfig {
        &self.config
    }

    pub fn graph(&self) -> &Arc<dyn GraphPort> {
        &self.graph
    }

    /// Discover, aggregate and score paths, as of now.
    pub async fn find_paths(&self, request: &PathRequest) -> Result<DiscoveryReport> {
        self.find_paths_as_of(request, Utc::now()).await
    }

    /// Discover, aggregate and score paths, with freshness measured at `as_of`.
    pub async fn find_paths_as_of(
        &self,
        request: &PathRequest,
        as_of: DateTime<Utc>,
    ) -> Result<DiscoveryReport> {
        request.validate()?;
        let request_id = Uuid::new_v4();

        self.graph.ping().await?;
        let (source, target) = self.load_endpoints(request).await?;

        let ctx = Arc::new(DiscoveryContext::new(source, target, &self.config.discovery)?);
        let (paths, warnings) = self.run_discoverers(request_id, ctx).await?;

        let mut candidates = aggregate(request, paths)?;
        self.scorer.score_candidates(request, &mut candidates, as_of)?;
        candidates.sort_by(|a, b| compare(a, b, SortKey::Relevancy));

        let coverage = if warnings.is_empty() {
            Coverage::Complete
        } else {
            Coverage::Partial
        };

        info!(
            request_id = %request_id,
            source = %request.source_user_id,
            target = %request.target_user_id,
            candidates = candidates.len(),
            warnings = warnings.len(),
            coverage = ?coverage,
            "Path discovery complete"
        );

        Ok(DiscoveryReport {
            request_id,
            source_user_id: request.source_user_id.clone(),
            target_user_id: request.target_user_id.clone(),
            candidates,
            warnings,
            coverage,
            generated_at: as_of,
        })
    }

    /// Resolve the target's handle, then discover.
    pub async fn find_paths_by_screen_name(
        &self,
        source_user_id: &str,
        target_screen_name: &str,
    ) -> Result<DiscoveryReport> {
        let target = self.resolve_screen_name(target_screen_name).await?;
        let request = PathRequest::new(source_user_id, target.user_id)?;
        self.find_paths(&request).await
    }

    /// Look up a person by handle.
    pub async fn resolve_screen_name(&self, screen_name: &str) -> Result<PersonNode> {
        let handle = screen_name.trim();
        if handle.trim_start_matches('@').is_empty() {
            return Err(PathfinderError::Validation("target screen name is empty".into()));
        }

        self.graph
            .find_by_screen_names(&[handle.to_string()])
            .await?
            .into_iter()
            .find(|p| p.has_screen_name(handle))
            .ok_or_else(|| PathfinderError::TargetNotFound(handle.to_string()))
    }

    /// Discover, then filter, sort and page.
    pub async fn search(&self, request: &PathRequest, query: &RankQuery) -> Result<SearchResponse> {
        let report = self.find_paths(request).await?;
        Ok(self.rank_report(report, query))
    }

    /// Rank an existing report without rediscovering.
    pub fn rank_report(&self, report: DiscoveryReport, query: &RankQuery) -> SearchResponse {
        let page = rank(&report.candidates, query, &self.config.ranking);
        SearchResponse {
            request_id: report.request_id,
            page,
            facets: facets(&report.candidates),
            warnings: report.warnings,
            coverage: report.coverage,
            generated_at: report.generated_at,
        }
    }

    async fn load_endpoints(&self, request: &PathRequest) -> Result<(PersonNode, PersonNode)> {
        let ids = [
            request.source_user_id.clone(),
            request.target_user_id.clone(),
        ];
        let mut people = self.graph.get_people(&ids).await?;

        let mut take = |id: &str| {
            people
                .iter()
                .position(|p| p.user_id == id)
                .map(|i| people.swap_remove(i))
                .ok_or_else(|| PathfinderError::UnknownPerson(id.to_string()))
        };
        let source = take(&request.source_user_id)?;
        let target = take(&request.target_user_id)?;
        Ok((source, target))
    }

    /// Run every discoverer concurrently against one deadline.
    ///
    /// Each discoverer runs on its own task. A failed, panicked or late
    /// discoverer contributes a warning instead of paths. Only when every
    /// discoverer found the graph unreachable is the request failed.
    async fn run_discoverers(
        &self,
        request_id: Uuid,
        ctx: Arc<DiscoveryContext>,
    ) -> Result<(Vec<PathRecord>, Vec<DiscoveryWarning>)> {
        let deadline = Instant::now() + self.config.discovery.timeout();

        let runs = self.discoverers.iter().map(|discoverer| {
            let path_type = discoverer.path_type();
            let task_discoverer = Arc::clone(discoverer);
            let graph = Arc::clone(&self.graph);
            let ctx = Arc::clone(&ctx);

            async move {
                let started = Instant::now();
                let mut handle = tokio::spawn(async move {
                    task_discoverer.discover(graph.as_ref(), &ctx).await
                });

                let outcome = match tokio::time::timeout_at(deadline, &mut handle).await {
                    Ok(Ok(result)) => Ok(result),
                    Ok(Err(join_error)) => Err(Some(join_error)),
                    Err(_) => {
                        handle.abort();
                        Err(None)
                    }
                };
                (path_type, outcome, started.elapsed())
            }
        });
        let outcomes = join_all(runs).await;

        let mut paths = Vec::new();
        let mut warnings = Vec::new();
        let mut unavailable = Vec::new();

        for (path_type, outcome, elapsed) in outcomes {
            match outcome {
                Ok(Ok(found)) => {
                    debug!(
                        request_id = %request_id,
                        path_type = %path_type,
                        paths = found.len(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Discoverer finished"
                    );
                    paths.extend(found.into_iter().filter(|p| ctx.within(p.hops())));
                }
                Ok(Err(e)) => {
                    warn!(
                        request_id = %request_id,
                        path_type = %path_type,
                        error = %e,
                        "Discoverer failed"
                    );
                    if let GraphError::Unavailable(msg) = &e {
                        unavailable.push(msg.clone());
                    }
                    warnings.push(DiscoveryWarning::failed(path_type, e.to_string()));
                }
                Err(Some(join_error)) => {
                    error!(
                        request_id = %request_id,
                        path_type = %path_type,
                        error = %join_error,
                        "Discoverer task aborted"
                    );
                    warnings.push(DiscoveryWarning::failed(
                        path_type,
                        format!("discoverer task aborted: {}", join_error),
                    ));
                }
                Err(None) => {
                    warn!(
                        request_id = %request_id,
                        path_type = %path_type,
                        timeout_ms = self.config.discovery.timeout_ms,
                        "Discoverer timed out"
                    );
                    warnings.push(DiscoveryWarning::timed_out(path_type));
                }
            }
        }

        if !self.discoverers.is_empty() && unavailable.len() == self.discoverers.len() {
            return Err(PathfinderError::GraphUnavailable(unavailable.swap_remove(0)));
        }

        Ok((paths, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pathfinder_graph::{EdgeType, MemoryGraph};
    use std::time::Duration;

    fn graph() -> MemoryGraph {
        MemoryGraph::new("test")
            .with_person(PersonNode::individual("s", "source"))
            .with_person(PersonNode::individual("t", "Target"))
            .with_person(PersonNode::individual("c", "carol"))
            .with_edge("s", EdgeType::Follows, "c")
            .with_edge("c", EdgeType::Follows, "t")
    }

    fn service(graph: MemoryGraph) -> PathfinderService {
        PathfinderService::new(Arc::new(graph), PathfinderConfig::default()).unwrap()
    }

    struct Stalled;

    #[async_trait]
    impl PathDiscoverer for Stalled {
        fn path_type(&self) -> PathType {
            PathType::ChainAffinity
        }

        async fn discover(
            &self,
            _graph: &dyn GraphPort,
            _ctx: &DiscoveryContext,
        ) -> std::result::Result<Vec<PathRecord>, GraphError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    struct Panicking;

    #[async_trait]
    impl PathDiscoverer for Panicking {
        fn path_type(&self) -> PathType {
            PathType::SharedThirdParty
        }

        async fn discover(
            &self,
            _graph: &dyn GraphPort,
            _ctx: &DiscoveryContext,
        ) -> std::result::Result<Vec<PathRecord>, GraphError> {
            panic!("third-party index corrupted");
        }
    }

    /// Answers pings and lookups, but loses the connection on traversal.
    struct Severed(MemoryGraph);

    #[async_trait]
    impl GraphPort for Severed {
        fn id(&self) -> &str {
            "severed"
        }

        async fn ping(&self) -> pathfinder_graph::port::Result<()> {
            Ok(())
        }

        async fn get_people(&self, user_ids: &[String]) -> pathfinder_graph::port::Result<Vec<PersonNode>> {
            self.0.get_people(user_ids).await
        }

        async fn find_by_screen_names(
            &self,
            handles: &[String],
        ) -> pathfinder_graph::port::Result<Vec<PersonNode>> {
            self.0.find_by_screen_names(handles).await
        }

        async fn neighbors(
            &self,
            _query: &pathfinder_graph::NeighborQuery,
        ) -> pathfinder_graph::port::Result<Vec<pathfinder_graph::Adjacency>> {
            Err(GraphError::Unavailable("connection reset".into()))
        }
    }

    fn short_deadline() -> PathfinderConfig {
        PathfinderConfig {
            discovery: crate::config::DiscoveryConfig {
                timeout_ms: 50,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_report_is_scored_and_sorted() {
        let svc = service(graph());
        let report = svc
            .find_paths(&PathRequest::new("s", "t").unwrap())
            .await
            .unwrap();

        assert_eq!(report.coverage, Coverage::Complete);
        assert_eq!(report.candidates.len(), 1);
        let c = report.candidate("c").unwrap();
        assert_eq!(c.connection_types, vec![PathType::Direct]);
        assert!(c.relevancy_score > 0.0);
        assert_eq!(c.score_breakdown.version, "v1");
    }

    #[tokio::test]
    async fn test_unknown_person() {
        let svc = service(graph());
        let err = svc
            .find_paths(&PathRequest::new("s", "nobody").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PathfinderError::UnknownPerson(id) if id == "nobody"));
    }

    #[tokio::test]
    async fn test_screen_name_resolution() {
        let svc = service(graph());
        let report = svc.find_paths_by_screen_name("s", "@target").await.unwrap();
        assert_eq!(report.target_user_id, "t");

        let err = svc.find_paths_by_screen_name("s", "ghost").await.unwrap_err();
        assert!(matches!(err, PathfinderError::TargetNotFound(_)));
    }

    #[test]
    fn test_blank_handle_rejected_before_lookup() {
        let svc = service(graph());
        let err = tokio_test::block_on(svc.resolve_screen_name("  @ ")).unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_unavailable_graph_is_fatal() {
        let svc = service(graph().with_available(false));
        let err = svc
            .find_paths(&PathRequest::new("s", "t").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PathfinderError::GraphUnavailable(_)));
    }

    #[tokio::test]
    async fn test_slow_discoverer_times_out() {
        let config = short_deadline();
        let mut discoverers = default_discoverers(&config.discovery);
        discoverers.retain(|d| d.path_type() != PathType::ChainAffinity);
        discoverers.push(Arc::new(Stalled));

        let svc = PathfinderService::new(Arc::new(graph()), config)
            .unwrap()
            .with_discoverers(discoverers);
        let report = svc
            .find_paths(&PathRequest::new("s", "t").unwrap())
            .await
            .unwrap();

        assert_eq!(report.coverage, Coverage::Partial);
        assert_eq!(report.warnings, vec![DiscoveryWarning::timed_out(PathType::ChainAffinity)]);
        assert!(report.candidate("c").is_some());
    }

    #[tokio::test]
    async fn test_graph_lost_during_discovery_is_fatal() {
        let svc = PathfinderService::new(Arc::new(Severed(graph())), PathfinderConfig::default())
            .unwrap();
        let err = svc
            .find_paths(&PathRequest::new("s", "t").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PathfinderError::GraphUnavailable(msg) if msg.contains("connection reset")));
    }

    #[tokio::test]
    async fn test_graph_lost_with_one_late_discoverer_is_partial() {
        let config = short_deadline();
        let mut discoverers = default_discoverers(&config.discovery);
        discoverers.retain(|d| d.path_type() != PathType::ChainAffinity);
        discoverers.push(Arc::new(Stalled));

        let svc = PathfinderService::new(Arc::new(Severed(graph())), config)
            .unwrap()
            .with_discoverers(discoverers);
        let report = svc
            .find_paths(&PathRequest::new("s", "t").unwrap())
            .await
            .unwrap();

        assert_eq!(report.coverage, Coverage::Partial);
        assert!(report.candidates.is_empty());
        assert_eq!(report.warnings.len(), 5);
        let failed = report
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::Failed)
            .count();
        assert_eq!(failed, 4);
        assert!(report
            .warnings
            .contains(&DiscoveryWarning::timed_out(PathType::ChainAffinity)));
    }

    #[tokio::test]
    async fn test_panicking_discoverer_becomes_warning() {
        let config = PathfinderConfig::default();
        let mut discoverers = default_discoverers(&config.discovery);
        discoverers.retain(|d| d.path_type() != PathType::SharedThirdParty);
        discoverers.push(Arc::new(Panicking));

        let svc = PathfinderService::new(Arc::new(graph()), config)
            .unwrap()
            .with_discoverers(discoverers);
        let report = svc
            .find_paths(&PathRequest::new("s", "t").unwrap())
            .await
            .unwrap();

        assert_eq!(report.coverage, Coverage::Partial);
        assert_eq!(report.warnings.len(), 1);
        let warning = &report.warnings[0];
        assert_eq!(warning.path_type, PathType::SharedThirdParty);
        assert_eq!(warning.kind, WarningKind::Failed);
        assert!(report.candidate("c").is_some());
    }

    #[tokio::test]
    async fn test_search_pages_report() {
        let svc = service(graph());
        let response = svc
            .search(
                &PathRequest::new("s", "t").unwrap(),
                &RankQuery::default().search("CAR"),
            )
            .await
            .unwrap();
        assert_eq!(response.page.total_items, 1);
        assert_eq!(response.facets[0].count, 1);
        assert_eq!(response.coverage, Coverage::Complete);
    }
}
