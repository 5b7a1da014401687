//! Published catalog and its refresh loop
//!
//! The served playlist is an immutable `Arc<Playlist>` that is swapped whole
//! on every successful refresh. Readers clone the `Arc` and never observe a
//! half-built catalog.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::aggregation::AggregationEngine;
use crate::errors::{AppError, AppResult};
use crate::models::{Playlist, PlaylistConfig};

#[derive(Debug, Clone)]
struct Published {
    playlist: Arc<Playlist>,
    updated_at: Option<DateTime<Utc>>,
}

/// Holds the currently served playlist
///
/// ```rust
/// use m3u_gateway::models::{Entry, Playlist};
/// use m3u_gateway::services::CatalogStore;
///
/// # tokio_test::block_on(async {
/// let store = CatalogStore::new();
/// let before = store.snapshot().await;
/// store.publish(Playlist::with_entries(vec![Entry::new("One", "http://a/1")])).await;
///
/// assert_eq!(before.stream_count(), 0);
/// assert_eq!(store.snapshot().await.stream_count(), 1);
/// # });
/// ```
#[derive(Debug)]
pub struct CatalogStore {
    current: RwLock<Published>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::with_playlist(Playlist::default(), None)
    }

    fn with_playlist(playlist: Playlist, updated_at: Option<DateTime<Utc>>) -> Self {
        Self {
            current: RwLock::new(Published {
                playlist: Arc::new(playlist),
                updated_at,
            }),
        }
    }

    /// Cheap handle to the current catalog
    pub async fn snapshot(&self) -> Arc<Playlist> {
        self.current.read().await.playlist.clone()
    }

    /// When the last successful refresh was published, if any
    pub async fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.current.read().await.updated_at
    }

    /// Replace the catalog, returning the previous one
    pub async fn publish(&self, playlist: Playlist) -> Arc<Playlist> {
        let next = Published {
            playlist: Arc::new(playlist),
            updated_at: Some(Utc::now()),
        };
        let mut guard = self.current.write().await;
        std::mem::replace(&mut *guard, next).playlist
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodically reloads the playlist configuration and republishes the catalog
pub struct CatalogRefresher {
    engine: Arc<AggregationEngine>,
    store: Arc<CatalogStore>,
    config_path: PathBuf,
    interval: Duration,
    cancel: CancellationToken,
}

impl CatalogRefresher {
    pub fn new(
        engine: Arc<AggregationEngine>,
        store: Arc<CatalogStore>,
        config_path: PathBuf,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine,
            store,
            config_path,
            interval,
            cancel,
        }
    }

    /// Run one load cycle and publish its result. The configuration document
    /// is re-read every cycle. On error the published catalog is untouched.
    pub async fn refresh_once(&self) -> AppResult<usize> {
        let config = PlaylistConfig::load_from_file(&self.config_path)?;
        let playlist = self.engine.load_cancellable(&config, &self.cancel).await?;
        let count = playlist.stream_count();
        self.store.publish(playlist).await;
        info!("Published catalog with {} entries", count);
        Ok(count)
    }

    /// Initial load, then a reload every interval until cancelled
    pub async fn run(self) {
        info!(
            "Catalog refresher started, interval {}",
            humantime::format_duration(self.interval)
        );

        self.refresh_logged().await;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Catalog refresher shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {
                    self.refresh_logged().await;
                }
            }
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn refresh_logged(&self) {
        match self.refresh_once().await {
            Ok(_) => {}
            Err(AppError::Cancelled { .. }) => {
                info!("Catalog refresh cancelled, keeping previous catalog")
            }
            Err(e) if e.is_configuration_error() => {
                error!("Catalog refresh failed, keeping previous catalog: {}", e)
            }
            Err(e) => warn!("Catalog refresh failed, keeping previous catalog: {}", e),
        }
    }
}
