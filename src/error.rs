//! Error taxonomy
//!
//! Fatal errors abort the run. Per-pair fetch failures are plain values
//! ([`crate::inventory::FetchFailure`]) and never surface through this type.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that terminate an inventory run
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("credential acquisition failed: {0}")]
    Credentials(String),

    #[error("failed to write workbook {}: {reason}", path.display())]
    WorkbookWrite { path: PathBuf, reason: String },

    #[error("failed to upload {object} to bucket {bucket}: {reason}")]
    Upload {
        bucket: String,
        object: String,
        reason: String,
    },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl InventoryError {
    /// True when this error came from acquiring credentials
    pub fn is_credentials(&self) -> bool {
        matches!(self, InventoryError::Credentials(_))
    }
}

/// Walk an error chain looking for a credential failure
pub fn is_credentials_error(error: &anyhow::Error) -> bool {
    error
        .chain()
        .filter_map(|e| e.downcast_ref::<InventoryError>())
        .any(InventoryError::is_credentials)
}
