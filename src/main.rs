use anyhow::Result;
use banking_ledger::{cli, EngineConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "banking-ledger")]
#[command(about = "Apply a CSV command script to the ledger and print account balances")]
struct Cli {
    /// Command script (op,account,amount,destination,installments,category,...)
    input: PathBuf,
    /// TOML file overriding engine defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Append-only journal; state is rebuilt from it before the script runs
    #[arg(long)]
    journal: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Logs go to stderr, stdout carries only the CSV report
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    cli::run(args.input, config, args.journal).await
}
