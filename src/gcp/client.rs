//! GCP Client
//!
//! Main client for interacting with GCP APIs, combining authentication
//! and HTTP functionality.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use anyhow::Result;
use serde_json::Value;

/// Base URLs of the APIs the inventory talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub cloudasset: String,
    pub compute: String,
    pub container: String,
    pub cloudfunctions: String,
    pub sqladmin: String,
    pub storage: String,
    pub serviceusage: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            cloudasset: "https://cloudasset.googleapis.com".to_string(),
            compute: "https://compute.googleapis.com".to_string(),
            container: "https://container.googleapis.com".to_string(),
            cloudfunctions: "https://cloudfunctions.googleapis.com".to_string(),
            sqladmin: "https://sqladmin.googleapis.com".to_string(),
            storage: "https://storage.googleapis.com".to_string(),
            serviceusage: "https://serviceusage.googleapis.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Route every API to one base URL (local emulators, mock servers)
    pub fn single(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            cloudasset: base.clone(),
            compute: base.clone(),
            container: base.clone(),
            cloudfunctions: base.clone(),
            sqladmin: base.clone(),
            storage: base.clone(),
            serviceusage: base,
        }
    }
}

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    pub endpoints: Endpoints,
}

impl GcpClient {
    /// Create a new GCP client
    pub fn new(credentials: GcpCredentials, endpoints: Endpoints) -> Result<Self> {
        let http = GcpHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            endpoints,
        })
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        Ok(self.credentials.get_token().await?)
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Upload raw bytes to a GCP API
    pub async fn post_bytes(&self, url: &str, content_type: &str, bytes: Vec<u8>) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.post_bytes(url, &token, content_type, bytes).await
    }

    // =========================================================================
    // Cloud Asset API helpers
    // =========================================================================

    /// Build the searchAllResources URL for a project scope
    pub fn asset_search_url(&self, project: &str) -> String {
        format!(
            "{}/v1/projects/{}:searchAllResources",
            self.endpoints.cloudasset, project
        )
    }

    // =========================================================================
    // Compute Engine API helpers
    // =========================================================================

    /// Build Compute Engine API URL
    pub fn compute_url(&self, project: &str, path: &str) -> String {
        format!(
            "{}/compute/v1/projects/{}/{}",
            self.endpoints.compute, project, path
        )
    }

    /// Build aggregated Compute Engine API URL (all zones)
    pub fn compute_aggregated_url(&self, project: &str, resource: &str) -> String {
        self.compute_url(project, &format!("aggregated/{}", resource))
    }

    // =========================================================================
    // GKE API helpers
    // =========================================================================

    /// Build GKE location URL; `-` means every location
    pub fn container_location_url(&self, project: &str, location: &str, resource: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/{}",
            self.endpoints.container, project, location, resource
        )
    }

    // =========================================================================
    // Cloud Functions / Cloud SQL API helpers
    // =========================================================================

    pub fn functions_location_url(&self, project: &str, location: &str) -> String {
        format!(
            "{}/v2/projects/{}/locations/{}/functions",
            self.endpoints.cloudfunctions, project, location
        )
    }

    pub fn sql_instances_url(&self, project: &str) -> String {
        format!("{}/v1/projects/{}/instances", self.endpoints.sqladmin, project)
    }

    // =========================================================================
    // Cloud Storage API helpers
    // =========================================================================

    /// Build Cloud Storage API URL
    pub fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.endpoints.storage, path)
    }

    /// Build media upload URL for an object
    pub fn storage_upload_url(&self, bucket: &str, object: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.endpoints.storage,
            urlencoding::encode(bucket),
            urlencoding::encode(object)
        )
    }

    // =========================================================================
    // Service Usage API helpers
    // =========================================================================

    pub fn service_url(&self, project: &str, service: &str) -> String {
        format!(
            "{}/v1/projects/{}/services/{}",
            self.endpoints.serviceusage, project, service
        )
    }
}

/// Format a GCP API error for display
pub fn format_gcp_error(error: &anyhow::Error) -> String {
    super::http::format_gcp_error(error)
}
