//! GCP API interaction module
//!
//! This module provides the core functionality for interacting with Google Cloud Platform
//! APIs: authentication, the HTTP client, and project helpers.
//!
//! # Module Structure
//!
//! - [`auth`] - Credentials from a key file, a static token, or Application Default Credentials
//! - [`client`] - Main GCP client and per-API URL builders
//! - [`http`] - HTTP utilities for REST API calls
//! - [`projects`] - Project id parsing and service checks
//!
//! # Example
//!
//! ```ignore
//! use gcp_inventory::gcp::{auth::{CredentialSource, GcpCredentials}, client::{Endpoints, GcpClient}};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let credentials = GcpCredentials::new(&CredentialSource::from_env()).await?;
//!     let client = GcpClient::new(credentials, Endpoints::default())?;
//!     let buckets = client.get(&client.storage_url("b?project=my-project")).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
pub mod projects;
