//! Geo-IP country lookups

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;

use maxminddb::{geoip2, MaxMindDBError, Reader};
use tracing::info;

use crate::errors::{AppError, AppResult, GatewayError};

/// Maps an address to an ISO country code
pub trait GeoLookup: Send + Sync {
    /// `Ok(None)` when the dataset has no country for the address
    fn lookup_country(&self, ip: IpAddr) -> Result<Option<String>, GatewayError>;
}

/// MaxMind GeoIP2/GeoLite2 country database, held in memory
pub struct MaxMindGeoLookup {
    reader: Reader<Vec<u8>>,
}

impl MaxMindGeoLookup {
    pub fn open<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let reader = Reader::open_readfile(path).map_err(|e| {
            AppError::configuration(format!(
                "Unable to open GeoIP database {}: {e}",
                path.display()
            ))
        })?;
        info!(
            "Opened GeoIP database {} ({})",
            path.display(),
            reader.metadata.database_type
        );
        Ok(Self { reader })
    }
}

impl GeoLookup for MaxMindGeoLookup {
    fn lookup_country(&self, ip: IpAddr) -> Result<Option<String>, GatewayError> {
        match self.reader.lookup::<geoip2::Country>(ip) {
            Ok(record) => Ok(record
                .country
                .and_then(|country| country.iso_code)
                .map(str::to_string)),
            Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(None),
            Err(e) => Err(GatewayError::GeoLookup {
                address: ip.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for MaxMindGeoLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaxMindGeoLookup")
            .field("database_type", &self.reader.metadata.database_type)
            .finish()
    }
}

/// Fixed address table, for tests and static deployments
#[derive(Debug, Clone, Default)]
pub struct StaticGeoLookup {
    countries: HashMap<IpAddr, String>,
}

impl StaticGeoLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_country<S: Into<String>>(mut self, ip: IpAddr, country: S) -> Self {
        self.countries.insert(ip, country.into());
        self
    }
}

impl GeoLookup for StaticGeoLookup {
    fn lookup_country(&self, ip: IpAddr) -> Result<Option<String>, GatewayError> {
        Ok(self.countries.get(&ip).cloned())
    }
}
