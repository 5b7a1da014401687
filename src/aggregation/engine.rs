//! Aggregation engine
//!
//! One load cycle: resolve every configured provider, fetch them with bounded
//! concurrency, merge in priority order, then apply overrides and the explicit
//! channel order.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::merge::merge_playlists;
use super::ordering::apply_channel_order;
use super::overrides::apply_overrides;
use crate::errors::{AppError, AppResult, ProviderError};
use crate::models::{Playlist, PlaylistConfig};
use crate::sources::{PlaylistProvider, ProviderContext, ProviderRegistry};

/// Fetch limits for a load cycle
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub fetch_timeout: Duration,
    pub max_concurrent_fetches: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            max_concurrent_fetches: 4,
        }
    }
}

struct ResolvedProvider {
    name: String,
    provider: Box<dyn PlaylistProvider>,
}

pub struct AggregationEngine {
    registry: Arc<ProviderRegistry>,
    context: ProviderContext,
    options: LoadOptions,
}

impl AggregationEngine {
    pub fn new(registry: Arc<ProviderRegistry>, context: ProviderContext, options: LoadOptions) -> Self {
        Self {
            registry,
            context,
            options,
        }
    }

    /// Read a playlist configuration document and load it
    pub async fn load_from_file<P: AsRef<Path>>(&self, path: P) -> AppResult<Playlist> {
        let config = PlaylistConfig::load_from_file(path)?;
        self.load(&config).await
    }

    pub async fn load(&self, config: &PlaylistConfig) -> AppResult<Playlist> {
        self.load_cancellable(config, &CancellationToken::new()).await
    }

    /// Run a load cycle that stops early when `cancel` fires. A cancelled
    /// cycle returns `AppError::Cancelled` and produces nothing.
    pub async fn load_cancellable(
        &self,
        config: &PlaylistConfig,
        cancel: &CancellationToken,
    ) -> AppResult<Playlist> {
        let started = Instant::now();
        let priority = config.resolve_priority()?;
        let providers = self.resolve(config, &priority)?;
        let requested = providers.len();

        let fetched = tokio::select! {
            _ = cancel.cancelled() => {
                info!("Playlist load cancelled during provider fetch");
                return Err(AppError::cancelled("playlist load"));
            }
            fetched = self.fetch_all(providers) => fetched,
        };

        let contributing: Vec<&str> = fetched.iter().map(|(name, _)| name.as_str()).collect();
        info!(
            "{} of {} providers contributed: [{}]",
            fetched.len(),
            requested,
            contributing.join(", ")
        );

        let mut playlist = merge_playlists(fetched);
        apply_overrides(&mut playlist, &config.overrides);
        apply_channel_order(&mut playlist, &config.channel_order);

        if cancel.is_cancelled() {
            return Err(AppError::cancelled("playlist load"));
        }

        info!(
            "Playlist loaded with {} entries in {:?}",
            playlist.stream_count(),
            started.elapsed()
        );
        Ok(playlist)
    }

    /// Build every provider before any I/O happens
    fn resolve(&self, config: &PlaylistConfig, priority: &[String]) -> AppResult<Vec<ResolvedProvider>> {
        priority
            .iter()
            .map(|name| {
                let entry = config
                    .providers
                    .get(name)
                    .ok_or_else(|| AppError::provider_not_available(name))?;
                debug!("Resolved provider {} ({})", name, entry.provider);
                let provider = self
                    .registry
                    .create(&entry.provider, &entry.config, &self.context)?;
                Ok(ResolvedProvider {
                    name: name.clone(),
                    provider,
                })
            })
            .collect()
    }

    /// Fetch all providers concurrently. Results keep priority order; failed
    /// providers are logged and left out.
    async fn fetch_all(&self, providers: Vec<ResolvedProvider>) -> Vec<(String, Playlist)> {
        let fetch_timeout = self.options.fetch_timeout;
        let limit = self.options.max_concurrent_fetches.max(1);

        stream::iter(providers.into_iter().map(|resolved| async move {
            let result = match tokio::time::timeout(fetch_timeout, resolved.provider.fetch_playlist()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    provider: resolved.name.clone(),
                    seconds: fetch_timeout.as_secs(),
                }),
            };
            (resolved.name, result)
        }))
        .buffered(limit)
        .filter_map(|(name, result)| async move {
            match result {
                Ok(playlist) => {
                    debug!("Provider {} returned {} entries", name, playlist.stream_count());
                    Some((name, playlist))
                }
                Err(e) => {
                    warn!("Provider {} unavailable for this cycle: {}", name, e);
                    None
                }
            }
        })
        .collect()
        .await
    }
}
