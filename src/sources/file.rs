//! Local file provider
//!
//! Reads a playlist from disk. Documents starting with `{` are decoded as the
//! JSON playlist model, anything else is parsed as M3U.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::factory::decode_provider_config;
use super::traits::{PlaylistProvider, ProviderContext};
use crate::errors::{AppResult, ProviderError, ProviderResult};
use crate::ingestor::M3uParser;
use crate::models::Playlist;

#[derive(Debug, Clone, Deserialize)]
pub struct FileProviderConfig {
    pub source: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FileProvider {
    source: PathBuf,
    parser: M3uParser,
}

impl FileProvider {
    pub const KIND: &'static str = "file";

    pub fn new<P: Into<PathBuf>>(source: P) -> Self {
        Self {
            source: source.into(),
            parser: M3uParser::new(),
        }
    }

    pub fn from_config(config: &serde_json::Value, _ctx: &ProviderContext) -> AppResult<Self> {
        let config: FileProviderConfig = decode_provider_config(Self::KIND, config)?;
        Ok(Self::new(config.source))
    }

    fn decode(&self, contents: &str) -> ProviderResult<Playlist> {
        if contents.trim_start().starts_with('{') {
            debug!("Decoding {} as a JSON playlist", self.source.display());
            serde_json::from_str(contents)
                .map_err(|e| ProviderError::decode(self.source.display().to_string(), e.to_string()))
        } else {
            Ok(self.parser.parse(contents))
        }
    }
}

#[async_trait]
impl PlaylistProvider for FileProvider {
    fn kind(&self) -> &str {
        Self::KIND
    }

    async fn fetch_playlist(&self) -> ProviderResult<Playlist> {
        let contents = tokio::fs::read_to_string(&self.source)
            .await
            .map_err(|e| ProviderError::Read {
                path: self.source.display().to_string(),
                message: e.to_string(),
            })?;

        let playlist = self.decode(&contents)?;
        info!(
            "Loaded {} entries from {}",
            playlist.stream_count(),
            self.source.display()
        );
        Ok(playlist)
    }
}
