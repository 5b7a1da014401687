//! Centralized error handling for the M3U gateway
//!
//! # Error Categories
//!
//! - **Configuration Errors**: malformed documents, priority mismatches,
//!   unknown provider kinds. Fatal to the load that hit them.
//! - **Provider Errors**: fetch/decode failures of a single source. The
//!   provider is skipped for the cycle.
//! - **Gateway Errors**: unresolvable request origins and geo lookup
//!   failures. Fail closed.
//! - **Auth Errors**: user store management failures.
//!
//! # Usage
//!
//! ```rust
//! use m3u_gateway::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Provider Results
pub type ProviderResult<T> = Result<T, ProviderError>;
