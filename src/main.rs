//! Full pipeline: ingest every configured channel, then normalize the result.
//! No arguments; settings come from `config/harvest.toml` (or $HARVEST_CONFIG_PATH)
//! and `.env`.

use telegram_harvester::{init_tracing, run_ingest, run_normalize, HarvestConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let mut cfg = HarvestConfig::load_default()?;
    cfg.credentials.resolve_env()?;

    let records = run_ingest(&cfg).await?;
    let rows = run_normalize(&cfg)?;

    tracing::info!(records = records.len(), rows, "pipeline finished");
    Ok(())
}
