//! Resource Fetcher
//!
//! Handles fetching resources from GCP APIs based on resource definitions.
//! Pages are pulled lazily: only the page being processed is held in memory.

use super::record::ResourceRecord;
use super::registry::{asset_search_def, get_resource, ResourceDef};
use super::sdk_dispatch;
use crate::error::is_credentials_error;
use crate::gcp::client::GcpClient;
use crate::gcp::http::ApiError;
use crate::gcp::projects;
use anyhow::Result;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde_json::Value;
use std::time::Duration;

/// Label used for the asset search target in error reports
pub const ALL_TYPES_LABEL: &str = "*";

/// What a single fetch covers within one project
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchTarget {
    /// Every asset type through the unified search
    AssetSearch,
    /// One registry resource type
    ResourceType(String),
}

impl FetchTarget {
    /// Resource type label for reports (`*` for the asset search)
    pub fn label(&self) -> &str {
        match self {
            FetchTarget::AssetSearch => ALL_TYPES_LABEL,
            FetchTarget::ResourceType(key) => key,
        }
    }

    fn definition(&self) -> Result<&'static ResourceDef> {
        match self {
            FetchTarget::AssetSearch => Ok(asset_search_def()),
            FetchTarget::ResourceType(key) => {
                get_resource(key).ok_or_else(|| anyhow::anyhow!("Unknown resource: {}", key))
            }
        }
    }

    /// Type recorded on items whose definition has no per-item type field
    fn default_type(&self) -> &str {
        match self {
            FetchTarget::AssetSearch => "",
            FetchTarget::ResourceType(key) => key,
        }
    }
}

/// Retry policy for rate-limited and transient responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based), doubling each time
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Per-call limits for page requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    /// Deadline for one page request, retries excluded
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

/// Something that yields pages of records for a (project, target) pair
pub trait ResourceSource: Send + Sync {
    /// Lazy, finite page stream. Calling again re-queries the provider.
    fn pages<'a>(
        &'a self,
        project: &'a str,
        target: &'a FetchTarget,
    ) -> BoxStream<'a, Result<Vec<ResourceRecord>>>;
}

/// Result of paginated fetch
pub struct PaginatedResult {
    pub items: Vec<ResourceRecord>,
    pub next_token: Option<String>,
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Fetches resources from the live GCP APIs
#[derive(Clone)]
pub struct GcpFetcher {
    client: GcpClient,
    settings: FetchSettings,
}

impl GcpFetcher {
    pub fn new(client: GcpClient, settings: FetchSettings) -> Self {
        Self { client, settings }
    }

    /// Fetch one page of resources
    pub async fn fetch_resources_paginated(
        &self,
        project: &str,
        target: &FetchTarget,
        page_token: Option<&str>,
    ) -> Result<PaginatedResult> {
        let resource_def = target.definition()?;

        let mut params = resource_def.sdk_method_params.clone();
        if params.is_null() {
            params = Value::Object(serde_json::Map::new());
        }
        if let (Value::Object(map), Some(token)) = (&mut params, page_token) {
            map.insert("pageToken".to_string(), Value::String(token.to_string()));
        }

        let response = self.invoke_with_retry(resource_def, project, &params).await?;

        let items = extract_items(&response, &resource_def.response_path)
            .into_iter()
            .map(|item| {
                ResourceRecord::from_item(item, resource_def, target.default_type(), project)
            })
            .collect();

        let next_token = response
            .get("nextPageToken")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        Ok(PaginatedResult { items, next_token })
    }

    async fn invoke_with_retry(
        &self,
        resource_def: &ResourceDef,
        project: &str,
        params: &Value,
    ) -> Result<Value> {
        let mut attempt = 0;
        loop {
            let call = sdk_dispatch::invoke_sdk(
                &resource_def.service,
                &resource_def.sdk_method,
                &self.client,
                project,
                params,
            );

            let result = match tokio::time::timeout(self.settings.timeout, call).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(anyhow::anyhow!(
                        "request timed out after {}s",
                        self.settings.timeout.as_secs_f64()
                    ))
                }
            };

            match result {
                Err(e) if attempt < self.settings.retry.max_retries && is_retryable(&e) => {
                    let delay = self.settings.retry.delay(attempt);
                    tracing::warn!(
                        "{} {} for {} failed ({}), retrying in {:?}",
                        resource_def.service,
                        resource_def.sdk_method,
                        project,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Advance the page cursor by one request
    async fn next_page(
        &self,
        project: &str,
        target: &FetchTarget,
        cursor: Cursor,
    ) -> Result<Option<(Vec<ResourceRecord>, Cursor)>> {
        let page_token = match cursor {
            Cursor::Done => return Ok(None),
            Cursor::Start => {
                if !self.service_enabled(project, target).await? {
                    return Ok(None);
                }
                None
            }
            Cursor::Next(token) => Some(token),
        };

        let page = self
            .fetch_resources_paginated(project, target, page_token.as_deref())
            .await?;

        let next = match page.next_token {
            Some(token) if page_token.as_deref() == Some(token.as_str()) => {
                tracing::warn!(
                    "{} for {} returned the same page token twice; stopping",
                    target.label(),
                    project
                );
                Cursor::Done
            }
            Some(token) => Cursor::Next(token),
            None => Cursor::Done,
        };

        Ok(Some((page.items, next)))
    }

    /// False when the definition needs a service the project has not enabled
    async fn service_enabled(&self, project: &str, target: &FetchTarget) -> Result<bool> {
        let Some(service) = target.definition()?.required_service.as_deref() else {
            return Ok(true);
        };

        let check = projects::is_service_enabled(&self.client, project, service);
        let result = match tokio::time::timeout(self.settings.timeout, check).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "service check timed out after {}s",
                self.settings.timeout.as_secs_f64()
            )),
        };

        match result {
            Ok(true) => Ok(true),
            Ok(false) => {
                tracing::info!(
                    "{} not enabled for project {}; skipping {} listing",
                    service,
                    project,
                    target.label()
                );
                Ok(false)
            }
            Err(e) if is_credentials_error(&e) => Err(e),
            Err(e) => {
                tracing::warn!(
                    "Could not check {} for project {}: {}; listing anyway",
                    service,
                    project,
                    e
                );
                Ok(true)
            }
        }
    }
}

impl ResourceSource for GcpFetcher {
    fn pages<'a>(
        &'a self,
        project: &'a str,
        target: &'a FetchTarget,
    ) -> BoxStream<'a, Result<Vec<ResourceRecord>>> {
        stream::try_unfold(Cursor::Start, move |cursor| {
            self.next_page(project, target, cursor)
        })
        .boxed()
    }
}

/// Fetch all resources of a target (auto-paginate)
pub async fn fetch_resources(
    source: &dyn ResourceSource,
    project: &str,
    target: &FetchTarget,
) -> Result<Vec<ResourceRecord>> {
    let pages: Vec<Vec<ResourceRecord>> = source.pages(project, target).try_collect().await?;
    Ok(pages.into_iter().flatten().collect())
}

fn is_retryable(error: &anyhow::Error) -> bool {
    error
        .chain()
        .find_map(|e| e.downcast_ref::<ApiError>())
        .map(ApiError::is_retryable)
        .unwrap_or(false)
}

/// Extract items from response using the response_path
fn extract_items(response: &Value, path: &str) -> Vec<Value> {
    if path.is_empty() {
        return response.as_array().cloned().unwrap_or_default();
    }

    let mut current = response;
    for part in path.split('.') {
        current = match current.get(part) {
            Some(v) => v,
            None => return vec![],
        };
    }

    current.as_array().cloned().unwrap_or_default()
}
