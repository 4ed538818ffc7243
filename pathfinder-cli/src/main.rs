//! pathfinder: warm-intro path discovery over a graph snapshot
//!
//! Loads a JSON export of the relationship graph, runs the path engine for
//! one (source, target) pair and prints the scored candidates as JSON.
//!
//! ```text
//! pathfinder --graph graph.json paths --source 42 --handle @someone
//! pathfinder --graph graph.json search --source 42 --target 7 --query acme --sort followers
//! ```

mod commands;

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use commands::{build_service, execute_command, Commands, Overrides};

#[derive(Parser)]
#[command(name = "pathfinder")]
#[command(about = "Find and rank warm-intro paths between two people")]
struct Cli {
    /// Graph snapshot (JSON with `people` and `edges`)
    #[arg(short, long, env = "PATHFINDER_GRAPH")]
    graph: PathBuf,

    /// Path to configuration file (YAML)
    #[arg(short, long, env = "PATHFINDER_CONFIG")]
    config: Option<PathBuf>,

    /// Discovery deadline in milliseconds (overrides config file)
    #[arg(long, env = "PATHFINDER_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Maximum path length in hops (overrides config file)
    #[arg(long, env = "PATHFINDER_MAX_HOPS")]
    max_hops: Option<usize>,

    /// Cap on source-network members tried as connectors (overrides config file)
    #[arg(long, env = "PATHFINDER_MAX_NETWORK_SIZE")]
    max_network_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pathfinder=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let overrides = Overrides {
        timeout_ms: cli.timeout_ms,
        max_hops: cli.max_hops,
        max_network_size: cli.max_network_size,
    };

    info!(graph = %cli.graph.display(), "Starting pathfinder");
    let service = build_service(&cli.graph, cli.config.as_deref(), &overrides)?;

    let output = execute_command(&service, cli.command).await?;
    println!("{}", output);
    Ok(())
}
