//! Configuration Management
//!
//! Run settings come from the command line, falling back to an optional
//! settings file and then to the gcloud environment.

use crate::cli::Args;
use crate::error::InventoryError;
use crate::gcp::auth::CredentialSource;
use crate::gcp::client::Endpoints;
use crate::gcp::projects::{parse_project_list, validate_project_id};
use crate::inventory::InventoryMode;
use crate::resource::{FetchSettings, RetryPolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default number of concurrent fetches
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Settings file contents
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Projects to inventory when none are given on the command line
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub use_asset: bool,
    #[serde(default)]
    pub expand_nested: bool,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    /// Send every API call to this base URL (emulators, proxies)
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl Settings {
    /// Get the settings file path
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcp-inventory").join("config.json"))
    }

    /// Load settings from disk; a missing or unreadable file means defaults
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid settings file {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }
}

/// Everything one run needs
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    pub projects: Vec<String>,
    pub bucket: Option<String>,
    pub output: PathBuf,
    pub mode: InventoryMode,
    pub expand_nested: bool,
    pub concurrency: usize,
    pub fetch: FetchSettings,
    pub credentials: CredentialSource,
    pub endpoints: Endpoints,
}

impl InventoryConfig {
    /// Merge CLI > settings file > environment default project
    pub fn resolve(
        args: &Args,
        settings: &Settings,
        default_project: Option<String>,
        credentials: CredentialSource,
        now: DateTime<Utc>,
    ) -> Result<Self, InventoryError> {
        let requested = match args.project.as_deref() {
            Some(raw) => parse_project_list(raw),
            None if !settings.projects.is_empty() => {
                parse_project_list(&settings.projects.join(","))
            }
            None => default_project.map(|p| vec![p]).unwrap_or_default(),
        };

        if requested.is_empty() {
            return Err(InventoryError::Configuration(
                "Project not provided via --project, settings file, or GOOGLE_CLOUD_PROJECT"
                    .to_string(),
            ));
        }

        let (projects, rejected): (Vec<String>, Vec<String>) =
            requested.into_iter().partition(|p| validate_project_id(p));
        for project in &rejected {
            tracing::warn!("Skipping {:?}: not a valid GCP project id", project);
            eprintln!("Skipping {:?}: not a valid GCP project id", project);
        }

        if projects.is_empty() {
            return Err(InventoryError::Configuration(format!(
                "No valid project ids in {}",
                rejected.join(", ")
            )));
        }

        let output = args
            .output
            .clone()
            .unwrap_or_else(|| default_output_name(&projects[0], now));

        let bucket = args
            .bucket
            .clone()
            .or_else(|| settings.bucket.clone())
            .filter(|b| !b.trim().is_empty());

        let mode = if args.use_asset || settings.use_asset {
            InventoryMode::AssetSearch
        } else {
            InventoryMode::PerType
        };

        let defaults = FetchSettings::default();
        let fetch = FetchSettings {
            timeout: args
                .fetch_timeout_secs
                .or(settings.fetch_timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            retry: RetryPolicy {
                max_retries: args
                    .max_retries
                    .or(settings.max_retries)
                    .unwrap_or(defaults.retry.max_retries),
                ..defaults.retry
            },
        };

        let endpoints = settings
            .api_base_url
            .as_deref()
            .map(Endpoints::single)
            .unwrap_or_default();

        Ok(Self {
            projects,
            bucket,
            output,
            mode,
            expand_nested: args.expand_nested || settings.expand_nested,
            concurrency: args
                .concurrency
                .or(settings.concurrency)
                .unwrap_or(DEFAULT_CONCURRENCY)
                .max(1),
            fetch,
            credentials,
            endpoints,
        })
    }
}

/// `gcp-inventory-<project>-<UTC timestamp>.xlsx`
pub fn default_output_name(project: &str, now: DateTime<Utc>) -> PathBuf {
    PathBuf::from(format!(
        "gcp-inventory-{}-{}.xlsx",
        project,
        now.format("%Y%m%dT%H%M%SZ")
    ))
}
