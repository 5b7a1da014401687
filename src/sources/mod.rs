//! Playlist providers
//!
//! Each provider kind knows how to produce a complete playlist fragment from
//! its configuration payload. Kinds are looked up through the
//! [`ProviderRegistry`], so the aggregation engine never names a concrete
//! provider type.
//!
//! # Usage
//!
//! ```rust,no_run
//! use m3u_gateway::sources::{ProviderContext, ProviderRegistry};
//! use m3u_gateway::utils::HttpClientFactory;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = ProviderContext::new(HttpClientFactory::default().build()?);
//!     let registry = ProviderRegistry::with_builtin();
//!     let provider = registry.create(
//!         "file",
//!         &serde_json::json!({ "source": "channels.m3u" }),
//!         &ctx,
//!     )?;
//!     let playlist = provider.fetch_playlist().await?;
//!     println!("{} entries", playlist.stream_count());
//!     Ok(())
//! }
//! ```

pub mod factory;
pub mod file;
pub mod iptv_org;
pub mod traits;

pub use factory::{decode_provider_config, ProviderRegistry};
pub use file::FileProvider;
pub use iptv_org::IptvOrgProvider;
pub use traits::*;
