//! Playlist ingestion
//!
//! Parsers that turn raw provider documents into the playlist model.

pub mod m3u_parser;

pub use m3u_parser::M3uParser;
