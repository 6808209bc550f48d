//! Normalize only: `<raw_dir>/telegram_data.json` -> `<processed_dir>/cleaned_messages.csv`.

use telegram_harvester::{init_tracing, run_normalize, HarvestConfig};

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = HarvestConfig::load_default()?;
    let rows = run_normalize(&cfg)?;
    println!(
        "Saved {rows} cleaned rows to {}",
        cfg.cleaned_table_path().display()
    );
    Ok(())
}
