//! Playlist aggregation
//!
//! Merges provider playlists into the served catalog. Everything after the
//! fetch step runs on a single task against one in-progress playlist.

pub mod engine;
pub mod merge;
pub mod ordering;
pub mod overrides;

pub use engine::{AggregationEngine, LoadOptions};
pub use merge::merge_playlists;
pub use ordering::apply_channel_order;
pub use overrides::{apply_overrides, OverrideSummary};
