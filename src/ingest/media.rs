// src/ingest/media.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;

use crate::ingest::types::{MediaDownloader, PhotoRef};

/// Fetches `http(s)` locations over the network and copies anything else
/// from the local filesystem. One download at a time, awaited in place.
pub struct DefaultMediaDownloader {
    client: Client,
}

impl DefaultMediaDownloader {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for DefaultMediaDownloader {
    fn default() -> Self {
        Self::new()
    }
}

fn is_remote(location: &str) -> bool {
    let l = location.trim_start().to_ascii_lowercase();
    l.starts_with("http://") || l.starts_with("https://")
}

#[async_trait]
impl MediaDownloader for DefaultMediaDownloader {
    async fn download(&self, photo: &PhotoRef, dest: &Path) -> Result<()> {
        if let Some(dir) = dest.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }

        if is_remote(&photo.location) {
            let bytes = self
                .client
                .get(photo.location.trim())
                .send()
                .await
                .context("media http get()")?
                .error_for_status()
                .context("media non-2xx")?
                .bytes()
                .await
                .context("media http .bytes()")?;
            tokio::fs::write(dest, &bytes)
                .await
                .with_context(|| format!("writing {}", dest.display()))?;
        } else {
            tokio::fs::copy(&photo.location, dest)
                .await
                .with_context(|| format!("copying {} to {}", photo.location, dest.display()))?;
        }
        Ok(())
    }
}
