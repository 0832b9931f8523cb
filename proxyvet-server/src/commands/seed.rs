use std::{fs, path::PathBuf};

use anyhow::{Context, bail};
use clap::Args as ClapArgs;
use proxyvet_config::Config;
use proxyvet_core::{domain::Endpoint, store::ProxyStore};
use tracing::info;

use crate::bootstrap::connect_redis;

#[derive(ClapArgs, Debug, Clone)]
pub struct SeedArgs {
    /// Endpoints as host:port or user:pass@host:port
    endpoints: Vec<String>,

    /// File with one endpoint per line; blank lines and # comments are skipped
    #[arg(short, long)]
    file: Option<PathBuf>,
}

pub async fn execute(config: Config, args: SeedArgs) -> anyhow::Result<()> {
    let endpoints = collect_endpoints(&args)?;

    let backend = connect_redis(&config).await?;
    let pushed = backend
        .store
        .push_many(&endpoints)
        .await
        .context("failed to push endpoints onto the pending queue")?;

    info!(pushed, queue = %config.keys.queue, "seeded pending queue");
    Ok(())
}

/// Positional endpoints first, then the lines of `--file`.
fn collect_endpoints(args: &SeedArgs) -> anyhow::Result<Vec<Endpoint>> {
    let mut endpoints = parse_lines(args.endpoints.iter().map(String::as_str), "argument")?;

    if let Some(path) = &args.file {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        endpoints.extend(parse_lines(contents.lines(), &path.display().to_string())?);
    }

    if endpoints.is_empty() {
        bail!("no endpoints given; pass them as arguments or with --file");
    }
    Ok(endpoints)
}

/// Parse every non-comment line; the first malformed one rejects the batch.
fn parse_lines<'a, I>(lines: I, origin: &str) -> anyhow::Result<Vec<Endpoint>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut endpoints = Vec::new();
    for (index, line) in lines.into_iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let endpoint = Endpoint::parse(trimmed)
            .with_context(|| format!("{origin} line {}: rejected endpoint", index + 1))?;
        endpoints.push(endpoint);
    }
    Ok(endpoints)
}
