use anyhow::Context;
use proxyvet_config::Config;
use proxyvet_core::store::ProxyStore;

use crate::bootstrap::connect_redis;

pub async fn execute(config: Config) -> anyhow::Result<()> {
    let backend = connect_redis(&config).await?;

    let queued = backend
        .store
        .queue_len()
        .await
        .context("failed to read pending queue length")?;
    let pooled = backend
        .store
        .pool_count()
        .await
        .context("failed to read verified pool size")?;

    println!("pending  {queued:>8}  ({})", config.keys.queue);
    println!("verified {pooled:>8}  ({})", config.keys.pool);
    Ok(())
}
