//! Workbook upload to Cloud Storage

use crate::gcp::client::GcpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

/// MIME type of `.xlsx` files
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Pushes a finished file to object storage
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload `path` as `object` in `bucket`, returning the object URI
    async fn upload(&self, path: &Path, bucket: &str, object: &str) -> Result<String>;
}

/// Cloud Storage media upload
#[derive(Clone)]
pub struct GcsUploader {
    client: GcpClient,
}

impl GcsUploader {
    pub fn new(client: GcpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Uploader for GcsUploader {
    async fn upload(&self, path: &Path, bucket: &str, object: &str) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        tracing::info!(
            "Uploading {} ({} bytes) to gs://{}/{}",
            path.display(),
            bytes.len(),
            bucket,
            object
        );

        let url = self.client.storage_upload_url(bucket, object);
        let response = self
            .client
            .post_bytes(&url, XLSX_CONTENT_TYPE, bytes)
            .await?;

        let stored_name = response
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or(object);

        Ok(format!("gs://{}/{}", bucket, stored_name))
    }
}

/// Object name for an uploaded file: its file name
pub fn object_name_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "gcp-inventory.xlsx".to_string())
}
