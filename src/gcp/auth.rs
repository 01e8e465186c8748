//! GCP Authentication
//!
//! Handles authentication using an explicit service account key file,
//! a pre-issued access token, or Application Default Credentials (ADC).

use crate::error::InventoryError;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default scopes for GCP API access
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Environment variable naming a service account key file
pub const CREDENTIALS_FILE_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Environment variable carrying a pre-issued OAuth access token
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Token expiry buffer - refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Where credentials come from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CredentialSource {
    /// Service account key file
    KeyFile(PathBuf),
    /// Access token handed in from outside (never refreshed)
    AccessToken(String),
    /// Application Default Credentials
    #[default]
    ApplicationDefault,
}

impl CredentialSource {
    /// Resolve the credential source from the process environment
    pub fn from_env() -> Self {
        Self::resolve(
            std::env::var(CREDENTIALS_FILE_ENV).ok(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        )
    }

    /// Key file wins over a static token, which wins over ADC
    pub fn resolve(key_file: Option<String>, access_token: Option<String>) -> Self {
        if let Some(path) = key_file.filter(|p| !p.trim().is_empty()) {
            return CredentialSource::KeyFile(PathBuf::from(path));
        }
        if let Some(token) = access_token.filter(|t| !t.trim().is_empty()) {
            return CredentialSource::AccessToken(token);
        }
        CredentialSource::ApplicationDefault
    }
}

#[derive(Clone)]
enum TokenSource {
    Provider(Arc<dyn TokenProvider>),
    Static(String),
}

/// GCP credentials holder with token caching
#[derive(Clone)]
pub struct GcpCredentials {
    source: TokenSource,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl GcpCredentials {
    /// Create credentials from the given source
    pub async fn new(source: &CredentialSource) -> Result<Self, InventoryError> {
        let source = match source {
            CredentialSource::KeyFile(path) => TokenSource::Provider(load_key_file(path)?),
            CredentialSource::AccessToken(token) => TokenSource::Static(token.clone()),
            CredentialSource::ApplicationDefault => {
                let provider = gcp_auth::provider().await.map_err(|e| {
                    InventoryError::Credentials(format!(
                        "{}. Run 'gcloud auth application-default login'",
                        e
                    ))
                })?;
                TokenSource::Provider(provider)
            }
        };

        Ok(Self {
            source,
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Credentials that always hand out the same token
    pub fn from_static_token(token: &str) -> Self {
        Self {
            source: TokenSource::Static(token.to_string()),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Get an access token for API calls
    pub async fn get_token(&self) -> Result<String, InventoryError> {
        let provider = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Provider(provider) => provider,
        };

        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = provider
            .token(DEFAULT_SCOPES)
            .await
            .map_err(|e| InventoryError::Credentials(format!("failed to get access token: {}", e)))?;

        let token_str = token.as_str().to_string();
        let expires_at = Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER;

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token_str.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            (DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token_str)
    }
}

fn load_key_file(path: &Path) -> Result<Arc<dyn TokenProvider>, InventoryError> {
    if !path.is_file() {
        return Err(InventoryError::Credentials(format!(
            "{} points to {}, which does not exist",
            CREDENTIALS_FILE_ENV,
            path.display()
        )));
    }

    let account = CustomServiceAccount::from_file(path).map_err(|e| {
        InventoryError::Credentials(format!(
            "invalid service account key {}: {}",
            path.display(),
            e
        ))
    })?;

    tracing::info!("Using service account key file {:?}", path);
    Ok(Arc::new(account))
}

/// Get the gcloud configuration directory
pub fn get_gcloud_config_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir().map(|p| p.join("gcloud"))
}

/// Read the default project from the environment or gcloud configuration
pub fn get_default_project() -> Option<String> {
    for var in ["CLOUDSDK_CORE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"] {
        if let Ok(project) = std::env::var(var) {
            if super::projects::validate_project_id(&project) {
                return Some(project);
            }
            tracing::warn!("Invalid project ID format in {}", var);
        }
    }

    let config_dir = get_gcloud_config_dir()?;

    if let Ok(content) = std::fs::read_to_string(config_dir.join("properties")) {
        if let Some(project) = read_core_project(&content, false) {
            return Some(project);
        }
    }

    let active_config = std::fs::read_to_string(config_dir.join("active_config")).ok()?;
    let config_name = active_config.trim();

    // Config names end up in a path
    if !config_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        tracing::warn!("Invalid characters in active_config name");
        return None;
    }

    let config_path = config_dir
        .join("configurations")
        .join(format!("config_{}", config_name));
    let content = std::fs::read_to_string(config_path).ok()?;
    read_core_project(&content, true)
}

/// Find `project = ...` in an ini-style gcloud file.
/// With `section_only`, only the `[core]` section counts.
fn read_core_project(content: &str, section_only: bool) -> Option<String> {
    let mut in_core_section = !section_only;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            in_core_section = !section_only || line == "[core]";
            continue;
        }
        if in_core_section && line.starts_with("project") && line.contains('=') {
            if let Some(value) = line.split('=').nth(1) {
                let project = value.trim().to_string();
                if super::projects::validate_project_id(&project) {
                    return Some(project);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_file_wins_over_token() {
        let source = CredentialSource::resolve(
            Some("/tmp/key.json".to_string()),
            Some("ya29.token".to_string()),
        );
        assert_eq!(source, CredentialSource::KeyFile(PathBuf::from("/tmp/key.json")));
    }

    #[test]
    fn test_blank_values_fall_back_to_adc() {
        let source = CredentialSource::resolve(Some("  ".to_string()), Some(String::new()));
        assert_eq!(source, CredentialSource::ApplicationDefault);
    }

    #[tokio::test]
    async fn test_missing_key_file_is_credentials_error() {
        let source = CredentialSource::KeyFile(PathBuf::from("/nonexistent/dir/key.json"));
        let err = GcpCredentials::new(&source).await.err().unwrap();
        assert!(err.is_credentials());
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_static_token_is_returned() {
        let creds = GcpCredentials::from_static_token("abc");
        assert_eq!(creds.get_token().await.unwrap(), "abc");
    }

    #[test]
    fn test_read_core_project_from_active_config() {
        let content = "[compute]\nzone = us-central1-a\n[core]\n# comment\nproject = my-project-1\n";
        assert_eq!(
            read_core_project(content, true),
            Some("my-project-1".to_string())
        );
    }

    #[test]
    fn test_read_core_project_ignores_other_sections() {
        let content = "[other]\nproject = my-project-1\n";
        assert_eq!(read_core_project(content, true), None);
    }
}
