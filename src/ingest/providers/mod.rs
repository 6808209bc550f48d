pub mod fixture;
pub mod web_preview;

use anyhow::Result;

use crate::config::harvest::SourceKind;
use crate::ingest::types::MessageSource;

/// Build the message source selected in the harvest config.
pub fn build_source(kind: &SourceKind) -> Result<Box<dyn MessageSource>> {
    Ok(match kind {
        SourceKind::Web { base_url } => Box::new(web_preview::WebPreviewSource::new(base_url.as_str())),
        SourceKind::Fixture { path } => Box::new(fixture::FixtureSource::from_path(path)?),
    })
}
