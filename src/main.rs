//! Tuist CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tuist_graph::Severity;
use tuist_hasher::CacheOutputType;

mod builder;
mod commands;
mod telemetry;

#[derive(Parser)]
#[command(name = "tuist")]
#[command(about = "Project graph loading, hashing and binary caching for Xcode projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory containing the workspace manifest (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    path: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the project graph in Graphviz format
    Graph {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the content hash of every cacheable target
    Hash {
        /// Cache profile from Tuist/Config.toml
        #[arg(long)]
        profile: Option<String>,

        /// Kind of bundle to hash for: framework or xcframework
        #[arg(long, default_value = "xcframework")]
        output_type: String,
    },
    /// Work with the binary cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Show version
    Version,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Build and store every cacheable target missing from the cache
    Warm {
        #[arg(long)]
        profile: Option<String>,

        #[arg(long, default_value = "xcframework")]
        output_type: String,
    },
    /// Replace cached targets with their binaries and print the resulting graph
    Focus {
        /// Targets to keep as sources
        targets: Vec<String>,

        #[arg(long)]
        profile: Option<String>,

        #[arg(long, default_value = "xcframework")]
        output_type: String,
    },
    /// Delete every locally cached binary
    Clean,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "tuist={log_level},tuist_graph={log_level},tuist_loader={log_level},tuist_hasher={log_level},tuist_cache={log_level},tuist_queue={log_level}"
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::debug!("Tuist v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Workspace path: {}", cli.path.display());

    let result = run(cli).await;
    if let Err(e) = &result {
        if commands::severity(e) == Severity::Bug {
            tracing::error!(
                "This is unexpected. Please report it at https://github.com/tuist/tuist/issues"
            );
        }
    }
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let path = cli.path;
    match cli.command {
        Commands::Graph { output } => commands::graph(path, output).await,
        Commands::Hash {
            profile,
            output_type,
        } => {
            let output_type = output_type.parse::<CacheOutputType>().map_err(anyhow::Error::msg)?;
            commands::hash(path, profile, output_type).await
        }
        Commands::Cache { command } => match command {
            CacheCommands::Warm {
                profile,
                output_type,
            } => {
                let output_type = output_type.parse::<CacheOutputType>().map_err(anyhow::Error::msg)?;
                commands::cache_warm(path, profile, output_type).await
            }
            CacheCommands::Focus {
                targets,
                profile,
                output_type,
            } => {
                let output_type = output_type.parse::<CacheOutputType>().map_err(anyhow::Error::msg)?;
                commands::cache_focus(path, targets, profile, output_type).await
            }
            CacheCommands::Clean => commands::cache_clean(path).await,
        },
        Commands::Version => {
            println!("Tuist v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
