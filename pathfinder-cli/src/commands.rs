//! Pathfinder CLI - subcommands and their execution
//!
//! Every command prints JSON (or YAML for `config`) to stdout so output can
//! be piped into other tools.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Subcommand, ValueEnum};
use tracing::info;

use pathfinder_engine::{
    PathRequest, PathType, PathfinderConfig, PathfinderService, RankQuery, SortKey,
};
use pathfinder_graph::MemoryGraph;

/// Pathfinder subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Discover and score every path between two people
    Paths {
        #[command(flatten)]
        pair: PairArgs,
    },

    /// Discover, then filter, sort and page the candidates
    Search {
        #[command(flatten)]
        pair: PairArgs,

        /// Sort order
        #[arg(long, value_enum, default_value = "relevancy")]
        sort: SortArg,

        /// Case-insensitive text filter
        #[arg(short, long)]
        query: Option<String>,

        /// Only candidates reached by these path types (repeatable)
        #[arg(long = "type", value_enum)]
        types: Vec<PathTypeArg>,

        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: usize,

        /// Page size (defaults to the configured size)
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Print the effective configuration as YAML
    Config,
}

/// Who to connect.
#[derive(Debug, Args)]
pub struct PairArgs {
    /// Source user id
    #[arg(short, long)]
    pub source: String,

    /// Target user id
    #[arg(short, long, conflicts_with = "handle", required_unless_present = "handle")]
    pub target: Option<String>,

    /// Target screen name, resolved through the graph
    #[arg(long)]
    pub handle: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Relevancy,
    Followers,
    Name,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Relevancy => SortKey::Relevancy,
            SortArg::Followers => SortKey::Followers,
            SortArg::Name => SortKey::Name,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PathTypeArg {
    Direct,
    OrgDirect,
    OrgIndirect,
    SharedThirdParty,
    ChainAffinity,
}

impl From<PathTypeArg> for PathType {
    fn from(arg: PathTypeArg) -> Self {
        match arg {
            PathTypeArg::Direct => PathType::Direct,
            PathTypeArg::OrgDirect => PathType::OrgDirect,
            PathTypeArg::OrgIndirect => PathType::OrgIndirect,
            PathTypeArg::SharedThirdParty => PathType::SharedThirdParty,
            PathTypeArg::ChainAffinity => PathType::ChainAffinity,
        }
    }
}

/// Flag overrides applied on top of the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub timeout_ms: Option<u64>,
    pub max_hops: Option<usize>,
    pub max_network_size: Option<usize>,
}

impl Overrides {
    pub fn apply(&self, config: &mut PathfinderConfig) {
        if let Some(timeout_ms) = self.timeout_ms {
            config.discovery.timeout_ms = timeout_ms;
        }
        if let Some(max_hops) = self.max_hops {
            config.discovery.max_hops = max_hops;
        }
        if let Some(max_network_size) = self.max_network_size {
            config.discovery.max_network_size = max_network_size;
        }
    }
}

/// Load the YAML config, or defaults when no file is given.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<PathfinderConfig> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            PathfinderConfig::from_yaml(&content)?
        }
        None => {
            info!("No config file given, using defaults");
            PathfinderConfig::default()
        }
    };

    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Load a JSON graph snapshot.
pub fn load_graph(path: &Path) -> anyhow::Result<MemoryGraph> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading graph snapshot {}", path.display()))?;
    let graph = MemoryGraph::from_json(path.display().to_string(), &content)
        .with_context(|| format!("parsing graph snapshot {}", path.display()))?;

    info!(
        people = graph.person_count(),
        edges = graph.edge_count(),
        "Graph snapshot loaded"
    );
    Ok(graph)
}

/// Build a service over a snapshot file.
pub fn build_service(
    graph_path: &Path,
    config_path: Option<&Path>,
    overrides: &Overrides,
) -> anyhow::Result<PathfinderService> {
    let config = load_config(config_path, overrides)?;
    let graph = load_graph(graph_path)?;
    Ok(PathfinderService::new(Arc::new(graph), config)?)
}

/// Run a command and render its output.
pub async fn execute_command(
    service: &PathfinderService,
    command: Commands,
) -> anyhow::Result<String> {
    match command {
        Commands::Paths { pair } => {
            let request = resolve(service, &pair).await?;
            let report = service.find_paths(&request).await?;
            Ok(serde_json::to_string_pretty(&report)?)
        }

        Commands::Search {
            pair,
            sort,
            query,
            types,
            page,
            page_size,
        } => {
            let request = resolve(service, &pair).await?;
            let rank_query = RankQuery {
                sort: sort.into(),
                search: query,
                path_types: types.into_iter().map(Into::into).collect(),
                page,
                page_size,
            };
            let response = service.search(&request, &rank_query).await?;
            Ok(serde_json::to_string_pretty(&response)?)
        }

        Commands::Config => Ok(service.config().to_yaml()?),
    }
}

async fn resolve(service: &PathfinderService, pair: &PairArgs) -> anyhow::Result<PathRequest> {
    let target = match (&pair.target, &pair.handle) {
        (Some(id), _) => id.clone(),
        (None, Some(handle)) => service.resolve_screen_name(handle).await?.user_id,
        (None, None) => anyhow::bail!("either --target or --handle is required"),
    };
    Ok(PathRequest::new(pair.source.clone(), target)?)
}
