//! Cutforge CLI — render worker and timeline instruction tooling.
//!
//! Usage:
//!   cutforge run [OPTIONS]             Start the unattended render worker
//!   cutforge compile <INSTRUCTION>     Compile an instruction and print the op plan
//!   cutforge validate <INSTRUCTION>    Validate an instruction document
//!   cutforge check                     Check engine availability and configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "cutforge",
    about = "Unattended render worker for declarative timelines",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the unattended render worker loop
    Run {
        /// Job server base URL (overrides config)
        #[arg(long)]
        server: Option<String>,

        /// Machine identifier sent with job probes
        #[arg(long)]
        machine: Option<String>,

        /// Poll interval in seconds
        #[arg(long)]
        interval: Option<u64>,

        /// Media cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Render output directory
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Compile a local instruction document and print the operation plan
    Compile {
        /// Path to the instruction JSON file
        instruction: PathBuf,
    },

    /// Validate a local instruction document
    Validate {
        /// Path to the instruction JSON file
        instruction: PathBuf,
    },

    /// Check engine availability and show the effective configuration
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    cutforge_common::logging::init_logging(&cutforge_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Run {
            server,
            machine,
            interval,
            cache_dir,
            output_dir,
        } => commands::run::run(server, machine, interval, cache_dir, output_dir).await,
        Commands::Compile { instruction } => commands::compile::run(instruction),
        Commands::Validate { instruction } => commands::validate::run(instruction),
        Commands::Check => commands::check::run(),
    }
}
