//! Playlist configuration document
//!
//! The JSON document that tells the aggregation engine which providers to
//! fetch, in what priority, and how to post-process the merged catalog.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::{AppError, AppResult};

/// One provider instance: a registry kind plus its opaque configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl ProviderConfig {
    pub fn new<S: Into<String>>(provider: S, config: serde_json::Value) -> Self {
        Self {
            provider: provider.into(),
            config,
        }
    }
}

/// Per-channel rule applied to the merged catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideEntry {
    /// `tvg-id` of the target entry
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Removes the entry outright, other fields are ignored
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
}

impl OverrideEntry {
    pub fn replacement_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }

    pub fn forwarding_proxy(&self) -> Option<&str> {
        self.http_proxy.as_deref().filter(|p| !p.is_empty())
    }
}

/// The full provider configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistConfig {
    /// Providers by name, in document order
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
    /// Explicit merge priority. When present it must name every provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers_priority: Option<Vec<String>>,
    /// Desired leading order of channels, by `tvg-id`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channel_order: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<OverrideEntry>,
}

impl PlaylistConfig {
    /// Decode a playlist configuration document. Decode errors propagate.
    pub fn from_json_str(contents: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::configuration(format!(
                "Unable to read playlist config {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&contents)
    }

    /// Provider names in merge priority order
    pub fn resolve_priority(&self) -> AppResult<Vec<String>> {
        match &self.providers_priority {
            Some(priority) => {
                if priority.len() != self.providers.len() {
                    return Err(AppError::ConfigurationMismatch {
                        priority: priority.len(),
                        providers: self.providers.len(),
                    });
                }
                Ok(priority.clone())
            }
            None => Ok(self.providers.keys().cloned().collect()),
        }
    }
}
