// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod ingest;
pub mod normalize;

pub use crate::config::harvest::{Credentials, HarvestConfig};
pub use crate::ingest::types::{RawMessageRecord, SourceMessage};
pub use crate::normalize::{clean_data, normalize_amharic_text, CleanedRecord};

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact stderr logs; `RUST_LOG` overrides the default `info` filter.
/// `HARVEST_LOG_JSON=1` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("HARVEST_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()
    };
}

/// Ingest stage as the `ingest` binary runs it: configured source, default downloader.
pub async fn run_ingest(cfg: &HarvestConfig) -> Result<Vec<RawMessageRecord>> {
    let source = ingest::providers::build_source(&cfg.source)?;
    let downloader = Box::new(ingest::media::DefaultMediaDownloader::new());
    ingest::ingest_to_disk(cfg, source, downloader).await
}

/// Normalize stage over the configured raw set and table paths.
pub fn run_normalize(cfg: &HarvestConfig) -> Result<usize> {
    clean_data(&cfg.raw_set_path(), &cfg.cleaned_table_path())
}
