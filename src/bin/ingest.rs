//! Ingest only: writes `<raw_dir>/telegram_data.json` (and downloaded photos).

use telegram_harvester::{init_tracing, run_ingest, HarvestConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let mut cfg = HarvestConfig::load_default()?;
    cfg.credentials.resolve_env()?;

    let records = run_ingest(&cfg).await?;
    println!(
        "Saved {} messages to {}",
        records.len(),
        cfg.raw_set_path().display()
    );
    Ok(())
}
