//! Access policy evaluation
//!
//! An [`AccessPolicy`] is immutable once built. Reloading configuration builds
//! a new policy and swaps it into the shared [`PolicyHandle`] whole, so a
//! request never sees a half-updated whitelist.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use ipnet::IpNet;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::config::SecurityConfig;
use super::geoip::{GeoLookup, MaxMindGeoLookup};
use crate::errors::{AppError, AppResult, GatewayError};

/// Outcome of evaluating one request origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Inside a trusted network, no geo lookup performed
    Bypass,
    /// Geo check passed, or no geo dataset configured
    Allow,
    /// Country not whitelisted. `None` when the dataset had no country.
    Deny { country: Option<String> },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Deny { .. })
    }
}

/// CORS settings carried alongside the access rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsPolicy {
    pub disabled: bool,
    pub origins: Vec<String>,
}

pub struct AccessPolicy {
    trusted_networks: Vec<IpNet>,
    whitelist: HashSet<String>,
    geo: Option<Arc<dyn GeoLookup>>,
    cors: CorsPolicy,
}

impl AccessPolicy {
    /// A policy that lets every request through
    pub fn permissive() -> Self {
        Self {
            trusted_networks: Vec::new(),
            whitelist: HashSet::new(),
            geo: None,
            cors: CorsPolicy::default(),
        }
    }

    /// Build from a security document, opening the configured database.
    /// Invalid CIDR blocks and unreadable databases are errors.
    pub fn from_config(config: &SecurityConfig) -> AppResult<Self> {
        let geo: Option<Arc<dyn GeoLookup>> = match config.geoip.database_path() {
            Some(path) => Some(Arc::new(MaxMindGeoLookup::open(path)?)),
            None => None,
        };
        if geo.is_none()
            && (!config.geoip.whitelist.is_empty() || !config.geoip.internal_networks.is_empty())
        {
            warn!(
                "GeoIP whitelist or internal networks configured without a database, \
                 geo filtering is disabled and every request is allowed"
            );
        }
        let policy = Self::with_geo(geo, &config.geoip.whitelist, &config.geoip.internal_networks)?
            .with_cors(CorsPolicy {
                disabled: config.disable_cors,
                origins: config.cors_origins.clone(),
            });

        info!(
            "Access policy: geo filtering {}, {} whitelisted countries, {} trusted networks",
            if policy.geo.is_some() { "enabled" } else { "disabled" },
            policy.whitelist.len(),
            policy.trusted_networks.len()
        );
        Ok(policy)
    }

    /// Build around an arbitrary geo dataset
    pub fn with_geo<S: AsRef<str>>(
        geo: Option<Arc<dyn GeoLookup>>,
        whitelist: &[S],
        trusted_networks: &[S],
    ) -> AppResult<Self> {
        let trusted_networks = trusted_networks
            .iter()
            .map(|cidr| {
                let cidr = cidr.as_ref().trim();
                cidr.parse::<IpNet>().map_err(|e| {
                    AppError::configuration(format!("Invalid internal network '{cidr}': {e}"))
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            trusted_networks,
            whitelist: whitelist.iter().map(|c| c.as_ref().to_string()).collect(),
            geo,
            cors: CorsPolicy::default(),
        })
    }

    pub fn with_cors(mut self, cors: CorsPolicy) -> Self {
        self.cors = cors;
        self
    }

    pub fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    pub fn geo_enabled(&self) -> bool {
        self.geo.is_some()
    }

    pub fn is_trusted(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        self.trusted_networks.iter().any(|net| net.contains(&ip))
    }

    /// Decide whether `ip` may proceed. Lookup failures are errors and must
    /// be treated as a refusal by the caller.
    pub fn evaluate(&self, ip: IpAddr) -> Result<Verdict, GatewayError> {
        if self.is_trusted(ip) {
            return Ok(Verdict::Bypass);
        }

        let Some(geo) = self.geo.as_ref() else {
            return Ok(Verdict::Allow);
        };

        match geo.lookup_country(ip.to_canonical())? {
            Some(country) if self.whitelist.contains(&country) => Ok(Verdict::Allow),
            country => Ok(Verdict::Deny { country }),
        }
    }
}

impl std::fmt::Debug for AccessPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessPolicy")
            .field("trusted_networks", &self.trusted_networks)
            .field("whitelist", &self.whitelist)
            .field("geo_enabled", &self.geo.is_some())
            .field("cors", &self.cors)
            .finish()
    }
}

/// Shared, swappable reference to the active policy
#[derive(Debug, Clone)]
pub struct PolicyHandle {
    inner: Arc<RwLock<Arc<AccessPolicy>>>,
}

impl PolicyHandle {
    pub fn new(policy: AccessPolicy) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(policy))),
        }
    }

    pub async fn current(&self) -> Arc<AccessPolicy> {
        self.inner.read().await.clone()
    }

    /// Swap in a new policy, returning the previous one
    pub async fn replace(&self, policy: AccessPolicy) -> Arc<AccessPolicy> {
        let mut guard = self.inner.write().await;
        std::mem::replace(&mut *guard, Arc::new(policy))
    }
}
