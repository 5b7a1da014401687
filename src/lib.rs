//! m3u-gateway
//!
//! Aggregates IPTV channel listings from several providers into one served
//! M3U catalog, behind a geographic and credential access gateway.

pub mod aggregation;
pub mod auth;
pub mod config;
pub mod errors;
pub mod ingestor;
pub mod models;
pub mod proxy;
pub mod security;
pub mod services;
pub mod sources;
pub mod utils;
pub mod web;
