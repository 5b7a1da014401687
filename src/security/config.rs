//! Security policy document

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoIpConfig {
    /// MaxMind country database. No database means no geographic filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    /// ISO country codes allowed through
    #[serde(default)]
    pub whitelist: Vec<String>,
    /// CIDR blocks that bypass the geographic check
    #[serde(default)]
    pub internal_networks: Vec<String>,
}

impl GeoIpConfig {
    pub fn database_path(&self) -> Option<&Path> {
        self.database
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub geoip: GeoIpConfig,
    #[serde(default)]
    pub disable_cors: bool,
    /// Allowed CORS origins, empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl SecurityConfig {
    /// Decode a security document. Malformed documents are errors.
    pub fn from_json_str(contents: &str) -> AppResult<Self> {
        serde_json::from_str(contents)
            .map_err(|e| AppError::configuration(format!("Invalid security configuration: {e}")))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::configuration(format!(
                "Unable to read security config {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_document() {
        let config = SecurityConfig::from_json_str(
            r#"{
                "geoip": {
                    "database": "/var/lib/GeoLite2-Country.mmdb",
                    "whitelist": ["PT", "ES"],
                    "internal_networks": ["10.0.0.0/8"]
                },
                "disable_cors": true,
                "cors_origins": ["https://tv.example"]
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.geoip.database_path(),
            Some(Path::new("/var/lib/GeoLite2-Country.mmdb"))
        );
        assert_eq!(config.geoip.whitelist, vec!["PT", "ES"]);
        assert!(config.disable_cors);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SecurityConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SecurityConfig::default());
        assert!(config.geoip.database_path().is_none());
    }

    #[test]
    fn test_empty_database_path_means_none() {
        let config = SecurityConfig::from_json_str(r#"{"geoip":{"database":""}}"#).unwrap();
        assert!(config.geoip.database_path().is_none());
    }

    #[test]
    fn test_decode_errors_propagate() {
        let err = SecurityConfig::from_json_str(r#"{"geoip": {"whitelist": "PT"}}"#).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(SecurityConfig::from_json_str("not json").is_err());
        assert!(SecurityConfig::load_from_file("/nonexistent/security.json").is_err());
    }
}
