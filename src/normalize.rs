// src/normalize.rs
//! Raw record set -> cleaned CSV table.
//!
//! The whole input document is loaded before any row is written.

use anyhow::{Context, Result};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// UTF-8 byte-order mark so spreadsheet tools pick the right encoding.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("normalize_rows_total", "Rows written to the cleaned table.");
        describe_counter!(
            "normalize_dropped_total",
            "Raw records dropped for missing text."
        );
    });
}

/// Normalize Amharic message text:
/// 1) line breaks -> space
/// 2) Ethiopic wordspace `፡`, full stop `።` and `:` -> space
/// 3) collapse whitespace runs
/// 4) trim
pub fn normalize_amharic_text(s: &str) -> String {
    let out = s.replace(['\n', '\r'], " ");

    static RE_PUNCT: OnceCell<Regex> = OnceCell::new();
    let re_punct = RE_PUNCT.get_or_init(|| Regex::new(r"[፡።:]").unwrap());
    let out = re_punct.replace_all(&out, " ");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    let out = re_ws.replace_all(&out, " ");

    out.trim().to_string()
}

/// The subset of a raw record the normalizer reads. Other keys are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RawEntry {
    pub channel: String,
    #[serde(default)]
    pub text: Option<String>,
    pub timestamp: String,
    #[serde(default)]
    pub views: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One row of the cleaned table; field order is the column order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanedRecord {
    pub channel: String,
    pub message: String,
    pub timestamp: String,
    pub views: Option<i64>,
    pub image: Option<String>,
}

pub fn clean(raw: &[RawEntry]) -> Vec<CleanedRecord> {
    let mut out = Vec::with_capacity(raw.len());
    for item in raw {
        let Some(text) = item.text.as_deref().filter(|t| !t.is_empty()) else {
            counter!("normalize_dropped_total").increment(1);
            continue;
        };
        out.push(CleanedRecord {
            channel: item.channel.clone(),
            message: normalize_amharic_text(text),
            timestamp: item.timestamp.clone(),
            views: item.views,
            image: item.image_url.clone(),
        });
    }
    out
}

pub fn load_raw_entries(path: &Path) -> Result<Vec<RawEntry>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading raw record set {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("parsing raw record set {}", path.display()))
}

/// Write `rows` as BOM-prefixed UTF-8 CSV, header first, replacing `path`.
pub fn write_table(path: &Path, rows: &[CleanedRecord]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let mut file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    file.write_all(UTF8_BOM).context("writing BOM")?;

    // Header is written explicitly so an empty table still has its columns.
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    wtr.write_record(["channel", "message", "timestamp", "views", "image"])
        .context("writing csv header")?;
    for row in rows {
        wtr.serialize(row).context("writing csv row")?;
    }
    wtr.flush().context("flushing csv")?;
    Ok(())
}

/// Load `input_json`, clean it and write the table to `output_csv`.
/// Returns the number of rows written.
pub fn clean_data(input_json: &Path, output_csv: &Path) -> Result<usize> {
    ensure_metrics_described();

    let raw = load_raw_entries(input_json)?;
    let cleaned = clean(&raw);
    write_table(output_csv, &cleaned)?;

    counter!("normalize_rows_total").increment(cleaned.len() as u64);
    tracing::info!(
        target: "normalize",
        input = raw.len(),
        rows = cleaned.len(),
        path = %output_csv.display(),
        "cleaned data saved"
    );
    Ok(cleaned.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_ws_and_trims() {
        assert_eq!(normalize_amharic_text("  hello   world  "), "hello world");
    }

    #[test]
    fn ethiopic_punctuation_becomes_space() {
        assert_eq!(normalize_amharic_text("ሰላም፡ አለም"), "ሰላም አለም");
        assert_eq!(normalize_amharic_text("ዋጋ:1500 ብር።\r\nአዲስ"), "ዋጋ 1500 ብር አዲስ");
    }

    #[test]
    fn normalization_is_idempotent() {
        for s in ["a\n\nb", " ፡።: ", "\tx\u{00A0}y ", "", "ሰላም።አለም"] {
            let once = normalize_amharic_text(s);
            assert_eq!(normalize_amharic_text(&once), once);
        }
    }

    #[test]
    fn clean_drops_empty_and_absent_text() {
        let raw = vec![
            RawEntry {
                channel: "c1".into(),
                text: Some("".into()),
                timestamp: "t".into(),
                views: None,
                image_url: None,
            },
            RawEntry {
                channel: "c1".into(),
                text: None,
                timestamp: "t".into(),
                views: None,
                image_url: None,
            },
            RawEntry {
                channel: "c1".into(),
                text: Some("ok\n".into()),
                timestamp: "t".into(),
                views: Some(3),
                image_url: Some("data/raw/c1_1.jpg".into()),
            },
        ];
        let out = clean(&raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message, "ok");
        assert_eq!(out[0].image.as_deref(), Some("data/raw/c1_1.jpg"));
    }
}
