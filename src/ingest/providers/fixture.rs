use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use crate::config::harvest::Credentials;
use crate::ingest::types::{ChannelSession, MessageCursor, MessageSource, SourceMessage};

/// Recorded channel contents:
/// `{ "channels": { "<name>": [ { "id", "text", "date", "views", "sender_id", "media" } ] } }`
#[derive(Debug, Deserialize)]
struct FixtureDoc {
    channels: BTreeMap<String, Vec<SourceMessage>>,
}

/// Offline source replaying messages from a JSON document.
pub struct FixtureSource {
    channels: Arc<BTreeMap<String, Vec<SourceMessage>>>,
}

impl FixtureSource {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let doc: FixtureDoc = serde_json::from_str(s).context("parsing channel fixture")?;
        Ok(Self {
            channels: Arc::new(doc.channels),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading channel fixture {}", path.display()))?;
        Self::from_json_str(&s)
    }
}

#[async_trait]
impl MessageSource for FixtureSource {
    async fn connect(&self, _creds: &Credentials) -> Result<Box<dyn ChannelSession>> {
        Ok(Box::new(FixtureSession {
            channels: Arc::clone(&self.channels),
        }))
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

struct FixtureSession {
    channels: Arc<BTreeMap<String, Vec<SourceMessage>>>,
}

#[async_trait]
impl ChannelSession for FixtureSession {
    async fn open_channel(&self, channel: &str, limit: usize) -> Result<Box<dyn MessageCursor>> {
        let msgs = self
            .channels
            .get(channel)
            .ok_or_else(|| anyhow!("channel `{channel}` not found"))?;
        let mut newest_first = msgs.clone();
        newest_first.sort_by(|a, b| b.id.cmp(&a.id));
        newest_first.truncate(limit);
        Ok(Box::new(FixtureCursor {
            queue: newest_first.into(),
        }))
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }
}

struct FixtureCursor {
    queue: VecDeque<SourceMessage>,
}

#[async_trait]
impl MessageCursor for FixtureCursor {
    async fn next_message(&mut self) -> Result<Option<SourceMessage>> {
        Ok(self.queue.pop_front())
    }
}
