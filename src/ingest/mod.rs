// src/ingest/mod.rs
pub mod media;
pub mod providers;
pub mod types;

use crate::config::harvest::{image_path, Credentials, HarvestConfig};
use crate::ingest::types::{
    ChannelSession, MediaDownloader, MessageCursor, MessageSource, RawMessageRecord,
    SourceMessage,
};
use anyhow::{Context, Result};
use futures::{Stream, TryStreamExt};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "harvest_messages_seen_total",
            "Messages returned by the source."
        );
        describe_counter!(
            "harvest_records_total",
            "Raw records assembled from text-bearing messages."
        );
        describe_counter!(
            "harvest_skipped_no_text_total",
            "Messages skipped because they carry no text."
        );
        describe_counter!(
            "harvest_media_downloads_total",
            "Photos downloaded next to the raw record set."
        );
        describe_counter!(
            "harvest_source_errors_total",
            "Failed requests against the message source."
        );
        describe_histogram!(
            "harvest_channel_fetch_ms",
            "Time to drain one channel in milliseconds."
        );
        describe_histogram!(
            "harvest_page_parse_ms",
            "Preview page parse time in milliseconds."
        );
    });
}

/// Platform timestamps keep their own offset: "2024-01-01 08:30:00+00:00".
pub fn format_timestamp(date: &chrono::DateTime<chrono::FixedOffset>) -> String {
    date.format("%Y-%m-%d %H:%M:%S%:z").to_string()
}

enum Cursor {
    Pending,
    Open(Box<dyn MessageCursor>),
}

pub struct Ingestor {
    source: Box<dyn MessageSource>,
    downloader: Box<dyn MediaDownloader>,
    raw_dir: PathBuf,
    download_images: bool,
}

impl Ingestor {
    pub fn new(
        source: Box<dyn MessageSource>,
        downloader: Box<dyn MediaDownloader>,
        raw_dir: impl Into<PathBuf>,
        download_images: bool,
    ) -> Self {
        Self {
            source,
            downloader,
            raw_dir: raw_dir.into(),
            download_images,
        }
    }

    /// Lazily pull up to `limit` records for `channel`, newest first.
    /// The channel is opened on first poll; the stream stops at the first error.
    pub fn fetch_channel<'a>(
        &'a self,
        session: &'a dyn ChannelSession,
        channel: &'a str,
        limit: usize,
    ) -> impl Stream<Item = Result<RawMessageRecord>> + 'a {
        futures::stream::try_unfold(Cursor::Pending, move |state| {
            self.next_record(session, channel, limit, state)
        })
    }

    async fn next_record(
        &self,
        session: &dyn ChannelSession,
        channel: &str,
        limit: usize,
        state: Cursor,
    ) -> Result<Option<(RawMessageRecord, Cursor)>> {
        let mut cursor = match state {
            Cursor::Pending => session
                .open_channel(channel, limit)
                .await
                .with_context(|| format!("opening channel `{channel}`"))?,
            Cursor::Open(c) => c,
        };
        loop {
            let Some(msg) = cursor
                .next_message()
                .await
                .with_context(|| format!("retrieving messages from `{channel}`"))?
            else {
                return Ok(None);
            };
            counter!("harvest_messages_seen_total").increment(1);
            if let Some(rec) = self.assemble(channel, msg).await? {
                return Ok(Some((rec, Cursor::Open(cursor))));
            }
        }
    }

    /// Build the record for one message; `None` when it has no text.
    async fn assemble(&self, channel: &str, msg: SourceMessage) -> Result<Option<RawMessageRecord>> {
        let text = match msg.text.as_deref() {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => {
                counter!("harvest_skipped_no_text_total").increment(1);
                return Ok(None);
            }
        };

        let mut rec = RawMessageRecord {
            channel: channel.to_string(),
            text,
            timestamp: format_timestamp(&msg.date),
            views: msg.views,
            id: msg.id,
            sender_id: msg.sender_id,
            has_media: msg.media.is_some(),
            image_url: None,
        };

        if let (true, Some(photo)) = (self.download_images, msg.photo()) {
            let dest = image_path(&self.raw_dir, channel, msg.id);
            self.downloader
                .download(photo, &dest)
                .await
                .with_context(|| format!("downloading photo of {channel}/{}", msg.id))?;
            counter!("harvest_media_downloads_total").increment(1);
            tracing::debug!(target: "ingest", channel, id = msg.id, path = %dest.display(), "photo saved");
            rec.image_url = Some(dest.display().to_string());
        }

        counter!("harvest_records_total").increment(1);
        Ok(Some(rec))
    }

    /// Fetch every channel in order over one session and concatenate the results.
    /// The session is released whether or not the fetch succeeded.
    pub async fn run(
        &self,
        creds: &Credentials,
        channels: &[String],
        limit: usize,
    ) -> Result<Vec<RawMessageRecord>> {
        ensure_metrics_described();

        let session = self
            .source
            .connect(creds)
            .await
            .with_context(|| format!("establishing {} session", self.source.name()))?;

        let result = self.run_in_session(session.as_ref(), channels, limit).await;

        if let Err(e) = session.disconnect().await {
            tracing::warn!(target: "ingest", error = ?e, source = self.source.name(), "disconnect failed");
        }
        result
    }

    async fn run_in_session(
        &self,
        session: &dyn ChannelSession,
        channels: &[String],
        limit: usize,
    ) -> Result<Vec<RawMessageRecord>> {
        let mut all = Vec::new();
        for ch in channels {
            let t0 = std::time::Instant::now();
            let mut records: Vec<RawMessageRecord> =
                self.fetch_channel(session, ch, limit).try_collect().await?;
            histogram!("harvest_channel_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
            tracing::info!(target: "ingest", channel = %ch, records = records.len(), "channel fetched");
            all.append(&mut records);
        }
        Ok(all)
    }
}

/// Serialize the whole run as one pretty JSON array (2-space indent, UTF-8 kept
/// as is). Written to a sibling temp file first, then renamed over `path`.
pub async fn write_raw_set(path: &Path, records: &[RawMessageRecord]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    let body = serde_json::to_string_pretty(records).context("serializing raw record set")?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, body)
        .await
        .with_context(|| format!("writing {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("replacing {} with {}", path.display(), tmp.display()))?;
    Ok(())
}

pub async fn read_raw_set(path: &Path) -> Result<Vec<RawMessageRecord>> {
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading raw record set {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing raw record set {}", path.display()))
}

/// Full ingest stage: validate credentials, fetch all configured channels,
/// persist the raw record set. Nothing is written unless every channel succeeds.
pub async fn ingest_to_disk(
    cfg: &HarvestConfig,
    source: Box<dyn MessageSource>,
    downloader: Box<dyn MediaDownloader>,
) -> Result<Vec<RawMessageRecord>> {
    cfg.credentials
        .validate()
        .context("invalid credentials for message source")?;

    // Photos land here while channels are still being fetched.
    tokio::fs::create_dir_all(&cfg.raw_dir)
        .await
        .with_context(|| format!("creating {}", cfg.raw_dir.display()))?;

    let ingestor = Ingestor::new(source, downloader, &cfg.raw_dir, cfg.download_images);
    let records = ingestor
        .run(&cfg.credentials, &cfg.channels, cfg.limit)
        .await?;

    let out = cfg.raw_set_path();
    write_raw_set(&out, &records).await?;
    tracing::info!(
        target: "ingest",
        records = records.len(),
        channels = cfg.channels.len(),
        path = %out.display(),
        "raw record set saved"
    );
    Ok(records)
}
