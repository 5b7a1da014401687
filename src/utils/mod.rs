//! Utility modules for the m3u-gateway application
//!
//! Reusable helpers shared by providers, the gateway and the CLI.

pub mod http_client;
pub mod url;

pub use http_client::{HttpClientFactory, StandardHttpClient};
pub use url::UrlUtils;
