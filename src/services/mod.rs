//! Long-lived services shared by the web layer and the CLI

pub mod catalog;

pub use catalog::{CatalogRefresher, CatalogStore};
