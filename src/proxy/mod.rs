//! Playlist output
//!
//! Renders the served catalog back into extended M3U.

pub mod generator;

pub use generator::M3uGenerator;
