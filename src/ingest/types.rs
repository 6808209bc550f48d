// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use std::path::Path;

use crate::config::harvest::Credentials;

/// One text-bearing message as persisted in the raw record set.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct RawMessageRecord {
    pub channel: String,
    pub text: String,      // original, unmodified body
    pub timestamp: String, // "YYYY-MM-DD HH:MM:SS+HH:MM"
    pub views: Option<i64>,
    pub id: i64,
    pub sender_id: Option<i64>,
    pub has_media: bool,
    pub image_url: Option<String>, // local path of a downloaded photo
}

/// Where a photo can be fetched from (remote URL or local file).
#[derive(Debug, Clone, serde::Deserialize, PartialEq, Eq)]
pub struct PhotoRef {
    pub location: String,
}

#[derive(Debug, Clone, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaAttachment {
    Photo(PhotoRef),
    /// Video, document, sticker, poll, ... Counted, never downloaded.
    Other,
}

/// A message as the source reports it, before record assembly.
#[derive(Debug, Clone, serde::Deserialize, PartialEq, Eq)]
pub struct SourceMessage {
    pub id: i64,
    pub text: Option<String>,
    pub date: DateTime<FixedOffset>,
    pub views: Option<i64>,
    pub sender_id: Option<i64>,
    pub media: Option<MediaAttachment>,
}

impl SourceMessage {
    pub fn photo(&self) -> Option<&PhotoRef> {
        match &self.media {
            Some(MediaAttachment::Photo(p)) => Some(p),
            _ => None,
        }
    }
}

#[async_trait::async_trait]
pub trait MessageSource: Send + Sync {
    /// Establish a session; bad credentials or an unreachable host fail here.
    async fn connect(&self, creds: &Credentials) -> Result<Box<dyn ChannelSession>>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
pub trait ChannelSession: Send + Sync {
    /// Cursor over at most `limit` messages of `channel`, newest first.
    async fn open_channel(&self, channel: &str, limit: usize) -> Result<Box<dyn MessageCursor>>;
    async fn disconnect(&self) -> Result<()>;
}

#[async_trait::async_trait]
pub trait MessageCursor: Send {
    /// `Ok(None)` once the channel or the limit is exhausted.
    async fn next_message(&mut self) -> Result<Option<SourceMessage>>;
}

#[async_trait::async_trait]
pub trait MediaDownloader: Send + Sync {
    async fn download(&self, photo: &PhotoRef, dest: &Path) -> Result<()>;
}
