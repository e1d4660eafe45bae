//! ScholarPath CLI: terminal client for the research-guidance backend.
//!
//! Provides one-shot subcommands and an interactive session.

mod commands;
mod markdown;
mod render;
mod repl;

use clap::Parser;
use scholarpath_core::types::Level;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// ScholarPath: concept roadmaps, papers, and tiered paper explanations
#[derive(Parser, Debug)]
#[command(name = "scholarpath", version, about, long_about = None)]
struct Cli {
    /// Backend base URL (overrides configuration)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Workspace directory
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Subcommand (starts an interactive session if omitted)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Generate a conceptual roadmap for a research goal
    Roadmap {
        /// Learning goal, e.g. "graph neural networks"
        topic: String,
        /// Papers to request when a concept is selected
        #[arg(short, long)]
        count: Option<u32>,
        /// Also list papers for the concept at this 1-based position
        #[arg(short, long)]
        select: Option<usize>,
    },
    /// List papers for a single concept
    Papers {
        /// Concept name
        concept: String,
        /// Number of papers to request (1-30)
        #[arg(short, long)]
        count: Option<u32>,
    },
    /// Upload a PDF and print its explanation
    Explain {
        /// Path to the paper
        pdf: PathBuf,
        /// Explanation level: easy, intermediate, advanced
        #[arg(short, long)]
        level: Option<Level>,
    },
    /// Check that the backend is reachable
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default configuration file in the workspace
    Init,
    /// Show the current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "scholarpath", "scholarpath")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "scholarpath.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let overrides = commands::Overrides {
        backend_url: cli.backend_url,
    };

    if let Some(command) = cli.command {
        return commands::handle_command(command, &workspace, &overrides).await;
    }

    let config = commands::resolve_config(&workspace, &overrides)?;
    if !cli.quiet && !scholarpath_core::config_exists(Some(&workspace)) {
        println!("  No configuration file found; using defaults. Run `scholarpath config init` to create one.");
    }
    repl::run_interactive(config, workspace).await
}
