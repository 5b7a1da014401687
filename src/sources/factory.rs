//! Provider registry
//!
//! Maps provider kind strings to constructors. New kinds register here
//! without any change to the aggregation engine.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use super::file::FileProvider;
use super::iptv_org::IptvOrgProvider;
use super::traits::{PlaylistProvider, ProviderConstructor, ProviderContext};
use crate::errors::{AppError, AppResult, ProviderError};

/// Registry of provider constructors keyed by kind
#[derive(Clone)]
pub struct ProviderRegistry {
    constructors: HashMap<String, ProviderConstructor>,
}

impl ProviderRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A registry with the built-in `file` and `iptv.org` kinds
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(FileProvider::KIND, |config, ctx| {
            Ok(Box::new(FileProvider::from_config(config, ctx)?) as Box<dyn PlaylistProvider>)
        });
        registry.register(IptvOrgProvider::KIND, |config, ctx| {
            Ok(Box::new(IptvOrgProvider::from_config(config, ctx)?) as Box<dyn PlaylistProvider>)
        });
        registry
    }

    /// Register (or replace) the constructor for a kind
    pub fn register<K, F>(&mut self, kind: K, constructor: F)
    where
        K: Into<String>,
        F: Fn(&serde_json::Value, &ProviderContext) -> AppResult<Box<dyn PlaylistProvider>>
            + Send
            + Sync
            + 'static,
    {
        let kind = kind.into();
        debug!("Registering provider kind '{}'", kind);
        self.constructors.insert(kind, Arc::new(constructor));
    }

    /// Build a provider of the given kind
    ///
    /// # Errors
    /// `ProviderNotAvailable` for unknown kinds, or whatever the constructor
    /// reports for a payload it cannot decode.
    pub fn create(
        &self,
        kind: &str,
        config: &serde_json::Value,
        ctx: &ProviderContext,
    ) -> AppResult<Box<dyn PlaylistProvider>> {
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| AppError::provider_not_available(kind))?;
        constructor(config, ctx)
    }

    pub fn is_supported(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Registered kinds, sorted
    pub fn supported_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.constructors.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("kinds", &self.supported_kinds())
            .finish()
    }
}

/// Decode a provider's configuration payload. A missing payload decodes as an
/// empty object so kinds with all-default settings need no `config` key.
pub fn decode_provider_config<T: DeserializeOwned>(
    kind: &str,
    config: &serde_json::Value,
) -> AppResult<T> {
    let payload = if config.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        config.clone()
    };
    serde_json::from_value(payload).map_err(|e| ProviderError::invalid_config(kind, e.to_string()).into())
}
