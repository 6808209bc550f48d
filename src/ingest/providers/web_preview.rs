//! Public channel preview backend (`https://t.me/s/<channel>`).
//!
//! Each page carries ~20 posts, oldest first; older pages are reached with
//! `?before=<id>`. The cursor walks pages backwards and hands messages out
//! newest first.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::Client;
use std::collections::VecDeque;

use crate::config::harvest::Credentials;
use crate::ingest::types::{
    ChannelSession, MediaAttachment, MessageCursor, MessageSource, PhotoRef, SourceMessage,
};

fn re(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

fn re_post() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(&RE, r#"data-post="[^"/]+/(\d+)""#)
}
fn re_text() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(
        &RE,
        r#"(?s)<div class="tgme_widget_message_text[^"]*js-message_text[^"]*"[^>]*>(.*?)</div>"#,
    )
}
fn re_views() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(&RE, r#"<span class="tgme_widget_message_views">([^<]*)</span>"#)
}
fn re_time() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(&RE, r#"<time[^>]*datetime="([^"]+)""#)
}
fn re_photo() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(
        &RE,
        r#"(?s)tgme_widget_message_photo_wrap[^>]*background-image:url\('([^']+)'\)"#,
    )
}
fn re_other_media() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(
        &RE,
        r#"tgme_widget_message_(video_player|document_wrap|voice|sticker|roundvideo|poll|location_wrap|animated_sticker|link_preview|audio|contact|game|invoice)"#,
    )
}
fn re_br() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(&RE, r"(?i)<br\s*/?>")
}
fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(&RE, r"(?s)<[^>]+>")
}

/// "1.2K" -> 1200, "3M" -> 3_000_000, "987" -> 987.
pub fn parse_views(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let (num, mult) = match s.chars().last()? {
        'K' | 'k' => (&s[..s.len() - 1], 1_000.0),
        'M' | 'm' => (&s[..s.len() - 1], 1_000_000.0),
        _ => (s, 1.0),
    };
    let v: f64 = num.trim().parse().ok()?;
    if !v.is_finite() || v < 0.0 {
        return None;
    }
    Some((v * mult).round() as i64)
}

fn html_to_text(fragment: &str) -> String {
    let with_breaks = re_br().replace_all(fragment, "\n");
    let stripped = re_tags().replace_all(&with_breaks, "");
    html_escape::decode_html_entities(&stripped).to_string()
}

/// Parse one preview page into messages, in page order (oldest first).
pub fn parse_page(html: &str) -> Result<Vec<SourceMessage>> {
    let t0 = std::time::Instant::now();
    let starts: Vec<(usize, i64)> = re_post()
        .captures_iter(html)
        .filter_map(|c| {
            let m = c.get(0)?;
            Some((m.start(), c[1].parse().ok()?))
        })
        .collect();

    let mut out = Vec::with_capacity(starts.len());
    for (i, &(start, id)) in starts.iter().enumerate() {
        let end = starts.get(i + 1).map(|&(s, _)| s).unwrap_or(html.len());
        let chunk = &html[start..end];

        let Some(ts) = re_time().captures(chunk) else {
            // Posts without a date are service stubs.
            continue;
        };
        let date = DateTime::parse_from_rfc3339(&ts[1])
            .with_context(|| format!("parsing date of post {id}"))?;

        let text = re_text()
            .captures(chunk)
            .map(|c| html_to_text(&c[1]))
            .filter(|t| !t.is_empty());

        let media = if let Some(c) = re_photo().captures(chunk) {
            Some(MediaAttachment::Photo(PhotoRef {
                location: c[1].to_string(),
            }))
        } else if re_other_media().is_match(chunk) {
            Some(MediaAttachment::Other)
        } else {
            None
        };

        out.push(SourceMessage {
            id,
            text,
            date,
            views: re_views().captures(chunk).and_then(|c| parse_views(&c[1])),
            sender_id: None,
            media,
        });
    }

    histogram!("harvest_page_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(out)
}

pub struct WebPreviewSource {
    base_url: String,
    client: Client,
}

impl WebPreviewSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl MessageSource for WebPreviewSource {
    async fn connect(&self, creds: &Credentials) -> Result<Box<dyn ChannelSession>> {
        creds.validate()?;
        self.client
            .get(&self.base_url)
            .send()
            .await
            .with_context(|| format!("reaching {}", self.base_url))?
            .error_for_status()
            .with_context(|| format!("{} answered non-2xx", self.base_url))?;
        tracing::info!(target: "ingest", base_url = %self.base_url, "web preview session open");
        Ok(Box::new(WebPreviewSession {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "web-preview"
    }
}

struct WebPreviewSession {
    base_url: String,
    client: Client,
}

#[async_trait]
impl ChannelSession for WebPreviewSession {
    async fn open_channel(&self, channel: &str, limit: usize) -> Result<Box<dyn MessageCursor>> {
        let mut cursor = WebPreviewCursor {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            channel: channel.to_string(),
            remaining: limit,
            buf: VecDeque::new(),
            before: None,
            exhausted: false,
        };
        if limit > 0 && !cursor.load_page().await? {
            bail!("channel `{channel}` has no public message preview");
        }
        Ok(Box::new(cursor))
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }
}

struct WebPreviewCursor {
    client: Client,
    base_url: String,
    channel: String,
    remaining: usize,
    buf: VecDeque<SourceMessage>,
    before: Option<i64>,
    exhausted: bool,
}

impl WebPreviewCursor {
    fn page_url(&self) -> String {
        match self.before {
            Some(id) => format!("{}/s/{}?before={id}", self.base_url, self.channel),
            None => format!("{}/s/{}", self.base_url, self.channel),
        }
    }

    /// Fetch the next older page into the buffer. `false` once nothing older exists.
    async fn load_page(&mut self) -> Result<bool> {
        let url = self.page_url();
        let body = match self.client.get(&url).send().await {
            Ok(resp) => resp
                .error_for_status()
                .context("preview non-2xx")?
                .text()
                .await
                .context("preview http .text()")?,
            Err(e) => {
                counter!("harvest_source_errors_total").increment(1);
                return Err(e).with_context(|| format!("preview http get() {url}"));
            }
        };

        let mut page = parse_page(&body)?;
        if let Some(before) = self.before {
            page.retain(|m| m.id < before);
        }
        if page.is_empty() {
            self.exhausted = true;
            return Ok(false);
        }
        page.sort_by(|a, b| b.id.cmp(&a.id));
        self.before = page.last().map(|m| m.id);
        self.buf.extend(page);
        Ok(true)
    }
}

#[async_trait]
impl MessageCursor for WebPreviewCursor {
    async fn next_message(&mut self) -> Result<Option<SourceMessage>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        if self.buf.is_empty() && (self.exhausted || !self.load_page().await?) {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(self.buf.pop_front())
    }
}
