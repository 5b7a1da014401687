//! Provider trait definitions
//!
//! A provider turns its configuration into a complete playlist fragment. It
//! never returns a partial result: any error means "unavailable this cycle".

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{AppResult, ProviderResult};
use crate::models::Playlist;
use crate::utils::StandardHttpClient;

/// A source of channel entries
#[async_trait]
pub trait PlaylistProvider: Send + Sync + std::fmt::Debug {
    /// Registry kind this provider was built from
    fn kind(&self) -> &str;

    /// Perform all I/O needed to produce the provider's playlist
    async fn fetch_playlist(&self) -> ProviderResult<Playlist>;
}

/// Shared resources handed to provider constructors
#[derive(Debug, Clone)]
pub struct ProviderContext {
    pub http_client: StandardHttpClient,
}

impl ProviderContext {
    pub fn new(http_client: StandardHttpClient) -> Self {
        Self { http_client }
    }
}

/// Builds a provider from its opaque configuration payload
pub type ProviderConstructor = Arc<
    dyn Fn(&serde_json::Value, &ProviderContext) -> AppResult<Box<dyn PlaylistProvider>>
        + Send
        + Sync,
>;
