//! Resource abstraction layer
//!
//! This module provides a data-driven approach to listing GCP resources.
//! Resource definitions are loaded from JSON at compile time, allowing
//! new resource types to be inventoried without code changes.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches resource definitions from embedded JSON
//! - [`fetcher`] - Fetches resources from GCP APIs with lazy pagination
//! - [`record`] - The [`ResourceRecord`] built from each listed item
//! - [`sdk_dispatch`] - Maps abstract SDK method names to concrete REST API calls
//!
//! # Example
//!
//! ```ignore
//! use gcp_inventory::resource::{fetch_resources, FetchTarget, GcpFetcher};
//!
//! async fn list_buckets(fetcher: &GcpFetcher) -> anyhow::Result<usize> {
//!     let target = FetchTarget::ResourceType("storage_buckets".to_string());
//!     Ok(fetch_resources(fetcher, "my-project", &target).await?.len())
//! }
//! ```

mod fetcher;
mod record;
mod registry;
mod sdk_dispatch;

pub use fetcher::{
    fetch_resources, FetchSettings, FetchTarget, GcpFetcher, PaginatedResult, ResourceSource,
    RetryPolicy, ALL_TYPES_LABEL,
};
pub use record::{extract_short_name, ResourceRecord};
pub use registry::*;
