//! Error type definitions for the M3U gateway
//!
//! This module defines all error types used throughout the application,
//! providing a hierarchical error system that separates fatal configuration
//! problems from per-provider fetch failures and per-request gateway failures.

use thiserror::Error;

/// Top-level application error type
///
/// This enum represents all possible errors that can occur in the application.
/// It uses `thiserror` to provide automatic error trait implementations and
/// proper error chaining.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors (fatal to the operation that hit them)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// `providers_priority` does not line up with the configured providers
    #[error("Configuration mismatch: providers_priority has {priority} entries but {providers} providers are configured")]
    ConfigurationMismatch { priority: usize, providers: usize },

    /// A provider name or kind could not be resolved
    #[error("Provider not available '{name}'")]
    ProviderNotAvailable { name: String },

    /// Provider handling errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Request gateway errors
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Authentication authority errors
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Refresh cycle abandoned before completion
    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    /// File system errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON document decode errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Provider specific errors
///
/// Any of these make a provider unavailable for the current refresh cycle.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Non-2xx response from a remote catalog
    #[error("HTTP error: {status} - {url}")]
    Http { status: u16, url: String },

    /// Transport-level request failure
    #[error("Request failed: {url} - {message}")]
    Request { url: String, message: String },

    /// Remote or local document could not be decoded
    #[error("Decode error: {source_type} - {message}")]
    Decode {
        source_type: String,
        message: String,
    },

    /// Fetch exceeded its time budget
    #[error("Fetch timed out after {seconds}s: {provider}")]
    Timeout { provider: String, seconds: u64 },

    /// Local source could not be read
    #[error("Read failed: {path} - {message}")]
    Read { path: String, message: String },

    /// Invalid provider configuration payload
    #[error("Invalid configuration: {kind} - {message}")]
    InvalidConfig { kind: String, message: String },
}

/// Request gateway errors
///
/// All of these fail closed: the client receives a generic internal error.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// No header or transport address yielded an origin
    #[error("Unable to resolve request origin")]
    UnresolvedOrigin,

    /// The resolved origin is not an IP literal
    #[error("Invalid origin address: {address}")]
    InvalidAddress { address: String },

    /// Geo dataset lookup failed
    #[error("GeoIP lookup failed for {address}: {message}")]
    GeoLookup { address: String, message: String },
}

/// Authentication authority errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("User already exists: {username}")]
    UserExists { username: String },

    #[error("User not found: {username}")]
    UserNotFound { username: String },

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a configuration error with a custom message
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a provider-not-available error
    pub fn provider_not_available<S: Into<String>>(name: S) -> Self {
        Self::ProviderNotAvailable { name: name.into() }
    }

    /// Create a cancellation error
    pub fn cancelled<S: Into<String>>(operation: S) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error aborts a catalog load outright
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::ConfigurationMismatch { .. }
                | Self::ProviderNotAvailable { .. }
                | Self::Json(_)
                | Self::Provider(ProviderError::InvalidConfig { .. })
        )
    }
}

impl ProviderError {
    /// Create a decode error
    pub fn decode<S: Into<String>, M: Into<String>>(source_type: S, message: M) -> Self {
        Self::Decode {
            source_type: source_type.into(),
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config<K: Into<String>, M: Into<String>>(kind: K, message: M) -> Self {
        Self::InvalidConfig {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create a request failure error
    pub fn request<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Request {
            url: url.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_classified() {
        assert!(AppError::configuration("bad").is_configuration_error());
        assert!(AppError::provider_not_available("x").is_configuration_error());
        assert!(AppError::ConfigurationMismatch {
            priority: 1,
            providers: 2
        }
        .is_configuration_error());
        assert!(AppError::from(ProviderError::invalid_config("file", "missing source"))
            .is_configuration_error());
        assert!(!AppError::from(ProviderError::Http {
            status: 500,
            url: "http://x".to_string()
        })
        .is_configuration_error());
    }

    #[test]
    fn test_provider_not_available_message() {
        let err = AppError::provider_not_available("main");
        assert_eq!(err.to_string(), "Provider not available 'main'");
    }
}
