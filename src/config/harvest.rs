// src/config/harvest.rs
//! Harvest settings: channel list, per-channel limit, storage layout and the
//! credentials used to open a session with the message source.
//!
//! Everything has a built-in default; an optional TOML file overrides it.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const ENV_CONFIG_PATH: &str = "HARVEST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/harvest.toml";

pub const ENV_API_ID: &str = "TG_API_ID";
pub const ENV_API_HASH: &str = "TG_API_HASH";
pub const ENV_PHONE: &str = "TG_PHONE";

pub const DEFAULT_LIMIT: usize = 1000;
pub const RAW_SET_FILE: &str = "telegram_data.json";
pub const CLEANED_TABLE_FILE: &str = "cleaned_messages.csv";

fn default_channels() -> Vec<String> {
    [
        "shageronlinestore",
        "addisdeals",
        "ethiomall",
        "mobilebazarethiopia",
        "shewastore",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_limit() -> usize {
    DEFAULT_LIMIT
}
fn default_true() -> bool {
    true
}
fn default_raw_dir() -> PathBuf {
    PathBuf::from("data/raw")
}
fn default_processed_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

/// Which message source backend the ingest binary talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// Public channel preview pages over HTTP.
    Web {
        #[serde(default = "default_base_url")]
        base_url: String,
    },
    /// Offline JSON fixture with pre-recorded messages.
    Fixture { path: PathBuf },
}

fn default_base_url() -> String {
    "https://t.me".to_string()
}

impl Default for SourceKind {
    fn default() -> Self {
        SourceKind::Web {
            base_url: default_base_url(),
        }
    }
}

/// Application id, secret and contact phone for the message source.
/// "ENV" means: read from TG_API_ID / TG_API_HASH / TG_PHONE.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default = "env_marker")]
    pub api_id: String,
    #[serde(default = "env_marker")]
    pub api_hash: String,
    #[serde(default = "env_marker")]
    pub phone: String,
}

fn env_marker() -> String {
    "ENV".to_string()
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            api_id: env_marker(),
            api_hash: env_marker(),
            phone: env_marker(),
        }
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_id", &self.api_id)
            .field("api_hash_len", &self.api_hash.len())
            .field("phone", &self.phone)
            .finish()
    }
}

impl Credentials {
    /// Replace every "ENV" marker with the matching environment variable.
    pub fn resolve_env(&mut self) -> Result<()> {
        for (value, var) in [
            (&mut self.api_id, ENV_API_ID),
            (&mut self.api_hash, ENV_API_HASH),
            (&mut self.phone, ENV_PHONE),
        ] {
            if value.trim().eq_ignore_ascii_case("env") {
                *value = env::var(var).map_err(|_| anyhow!("Missing {var} env var"))?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let id = self.api_id.trim();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            bail!("api_id must be a non-empty number");
        }
        if self.api_hash.trim().is_empty() {
            bail!("api_hash must not be empty");
        }
        let digits = self.phone.trim().strip_prefix('+').unwrap_or_default();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            bail!("phone must be in international format (+<digits>)");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    /// Most recent messages requested per channel.
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_true")]
    pub download_images: bool,
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
    #[serde(default)]
    pub source: SourceKind,
    #[serde(default)]
    pub credentials: Credentials,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            channels: default_channels(),
            limit: default_limit(),
            download_images: true,
            raw_dir: default_raw_dir(),
            processed_dir: default_processed_dir(),
            source: SourceKind::default(),
            credentials: Credentials::default(),
        }
    }
}

impl HarvestConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading harvest config from {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("parsing {}", path.display()))
    }

    /// Load using env var + fallbacks:
    /// 1) $HARVEST_CONFIG_PATH
    /// 2) config/harvest.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            bail!("{ENV_CONFIG_PATH} points to non-existent path");
        }
        let p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if p.exists() {
            return Self::load_from(&p);
        }
        Ok(Self::default())
    }

    fn parse(s: &str) -> Result<Self> {
        let mut cfg: HarvestConfig = toml::from_str(s)?;

        let mut seen = std::collections::HashSet::new();
        cfg.channels = cfg
            .channels
            .into_iter()
            .map(|c| c.trim().trim_start_matches('@').to_string())
            .filter(|c| !c.is_empty() && seen.insert(c.clone()))
            .collect();
        if cfg.channels.is_empty() {
            bail!("at least one channel must be configured");
        }
        if cfg.limit == 0 {
            cfg.limit = DEFAULT_LIMIT;
        }
        Ok(cfg)
    }

    pub fn raw_set_path(&self) -> PathBuf {
        self.raw_dir.join(RAW_SET_FILE)
    }

    pub fn cleaned_table_path(&self) -> PathBuf {
        self.processed_dir.join(CLEANED_TABLE_FILE)
    }

    /// Destination for a downloaded photo; unique per (channel, message id).
    pub fn image_path(&self, channel: &str, id: i64) -> PathBuf {
        image_path(&self.raw_dir, channel, id)
    }
}

pub fn image_path(raw_dir: &Path, channel: &str, id: i64) -> PathBuf {
    raw_dir.join(format!("{channel}_{id}.jpg"))
}
