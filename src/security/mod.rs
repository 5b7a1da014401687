//! Access-control gateway
//!
//! Resolves the client address of each request, lets trusted networks
//! through, and restricts everyone else to whitelisted countries. Also decodes
//! the credentials a request carries for the authentication layer.

pub mod config;
pub mod credentials;
pub mod geoip;
pub mod origin;
pub mod policy;

pub use config::{GeoIpConfig, SecurityConfig};
pub use credentials::Credentials;
pub use geoip::{GeoLookup, MaxMindGeoLookup, StaticGeoLookup};
pub use origin::resolve_origin;
pub use policy::{AccessPolicy, CorsPolicy, PolicyHandle, Verdict};
