//! Reachout CLI - operational entrypoint for the data platform
//!
//! Runs schema migrations and connectivity checks against the
//! configured database.

mod commands;

use clap::{Parser, Subcommand};
use commands::{CheckCommand, MigrateCommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "REACHOUT_LOG_LEVEL", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate(MigrateCommand),
    /// Probe database connectivity
    Check(CheckCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // If RUST_LOG is set, use it directly; otherwise scope the chosen
    // level to our own crates and keep dependencies at warn
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .expect("Invalid RUST_LOG environment variable")
    } else {
        let level = &cli.log_level;
        tracing_subscriber::EnvFilter::new(format!(
            "reachout_cli={level},\
             reachout_core={level},\
             reachout_database={level},\
             reachout_migrations={level},\
             warn"
        ))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let runtime = tokio::runtime::Runtime::new()?;
    match cli.command {
        Commands::Migrate(cmd) => runtime.block_on(cmd.run()),
        Commands::Check(cmd) => runtime.block_on(cmd.run()),
    }
}
