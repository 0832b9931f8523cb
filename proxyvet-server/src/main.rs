use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

mod bootstrap;
mod commands;

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "proxyvet")]
#[command(about = "Validates, scores and rotates a pool of proxy endpoints")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ConfigArgs {
    /// Path to a proxyvet.toml configuration file
    #[arg(long, global = true, env = "PROXYVET_CONFIG")]
    config: Option<PathBuf>,

    /// Path to a .env file loaded before reading the environment
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the check workers, the sweeper and the rebalancer
    Run(commands::run::RunArgs),
    /// Push endpoints onto the pending queue
    Seed(commands::seed::SeedArgs),
    /// Print pending queue length and verified pool size
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = bootstrap::load_config(&cli.config)?;

    match cli.command {
        Command::Run(args) => commands::run::execute(config, args).await,
        Command::Seed(args) => commands::seed::execute(config, args).await,
        Command::Status => commands::status::execute(config).await,
    }
}
