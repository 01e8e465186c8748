//! SDK Dispatch
//!
//! Maps SDK method names to GCP REST API calls.

use crate::gcp::client::GcpClient;
use anyhow::Result;
use serde_json::Value;

/// Invoke a GCP SDK method for one project
pub async fn invoke_sdk(
    service: &str,
    method: &str,
    client: &GcpClient,
    project: &str,
    params: &Value,
) -> Result<Value> {
    tracing::debug!(
        "invoke_sdk: service={}, method={}, project={}",
        service,
        method,
        project
    );

    match service {
        "cloudasset" => invoke_cloudasset(method, client, project, params).await,
        "compute" => invoke_compute(method, client, project, params).await,
        "container" => invoke_container(method, client, project, params).await,
        "cloudfunctions" => invoke_cloudfunctions(method, client, project, params).await,
        "sqladmin" => invoke_sqladmin(method, client, project, params).await,
        "storage" => invoke_storage(method, client, project, params).await,
        _ => Err(anyhow::anyhow!("Unknown service: {}", service)),
    }
}

// =============================================================================
// Cloud Asset
// =============================================================================

async fn invoke_cloudasset(
    method: &str,
    client: &GcpClient,
    project: &str,
    params: &Value,
) -> Result<Value> {
    match method {
        "search_all_resources" => {
            let url = add_query_params(&client.asset_search_url(project), params);
            client.get(&url).await
        },
        _ => Err(anyhow::anyhow!("Unknown cloudasset method: {}", method)),
    }
}

// =============================================================================
// Compute Engine
// =============================================================================

async fn invoke_compute(
    method: &str,
    client: &GcpClient,
    project: &str,
    params: &Value,
) -> Result<Value> {
    match method {
        "list_instances" => {
            // Aggregated API covers every zone in one paginated listing
            let url = client.compute_aggregated_url(project, "instances");
            let url = add_query_params(&url, params);
            let response = client.get(&url).await?;
            Ok(flatten_aggregated_response(response))
        },
        _ => Err(anyhow::anyhow!("Unknown compute method: {}", method)),
    }
}

// =============================================================================
// GKE (Container)
// =============================================================================

async fn invoke_container(
    method: &str,
    client: &GcpClient,
    project: &str,
    params: &Value,
) -> Result<Value> {
    match method {
        "list_clusters" => {
            // List all clusters in all locations
            let url = client.container_location_url(project, "-", "clusters");
            let url = add_query_params(&url, params);
            client.get(&url).await
        },
        _ => Err(anyhow::anyhow!("Unknown container method: {}", method)),
    }
}

// =============================================================================
// Cloud Functions
// =============================================================================

async fn invoke_cloudfunctions(
    method: &str,
    client: &GcpClient,
    project: &str,
    params: &Value,
) -> Result<Value> {
    match method {
        "list_functions" => {
            let url = add_query_params(&client.functions_location_url(project, "-"), params);
            client.get(&url).await
        },
        _ => Err(anyhow::anyhow!("Unknown cloudfunctions method: {}", method)),
    }
}

// =============================================================================
// Cloud SQL
// =============================================================================

async fn invoke_sqladmin(
    method: &str,
    client: &GcpClient,
    project: &str,
    params: &Value,
) -> Result<Value> {
    match method {
        "list_instances" => {
            let url = add_query_params(&client.sql_instances_url(project), params);
            client.get(&url).await
        },
        _ => Err(anyhow::anyhow!("Unknown sqladmin method: {}", method)),
    }
}

// =============================================================================
// Cloud Storage
// =============================================================================

async fn invoke_storage(
    method: &str,
    client: &GcpClient,
    project: &str,
    params: &Value,
) -> Result<Value> {
    match method {
        "list_buckets" => {
            let url = format!(
                "{}?project={}",
                client.storage_url("b"),
                urlencoding::encode(project)
            );
            let url = add_query_params(&url, params);
            client.get(&url).await
        },
        _ => Err(anyhow::anyhow!("Unknown storage method: {}", method)),
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Append string (or string array) params as query parameters
fn add_query_params(url: &str, params: &Value) -> String {
    let Value::Object(map) = params else {
        return url.to_string();
    };

    let mut query_parts: Vec<String> = Vec::new();

    for (key, value) in map {
        match value {
            Value::String(s) => {
                query_parts.push(format!("{}={}", key, urlencoding::encode(s)));
            },
            Value::Array(arr) => {
                for item in arr {
                    if let Value::String(s) = item {
                        query_parts.push(format!("{}={}", key, urlencoding::encode(s)));
                    }
                }
            },
            _ => {},
        }
    }

    if query_parts.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, query_parts.join("&"))
    } else {
        format!("{}?{}", url, query_parts.join("&"))
    }
}

/// Flatten an aggregated API response into a standard list response.
/// Aggregated responses have format: { "items": { "zones/us-central1-a": { "instances": [...] }, ... } }
/// We flatten to: { "items": [...all instances...], "nextPageToken": ... }
fn flatten_aggregated_response(response: Value) -> Value {
    let next_page_token = response.get("nextPageToken").cloned();

    let mut all_items: Vec<Value> = Vec::new();

    if let Some(items) = response.get("items").and_then(|v| v.as_object()) {
        for zone_data in items.values() {
            // Each zone entry holds the resource array next to an optional "warning"
            if let Some(obj) = zone_data.as_object() {
                for (key, value) in obj {
                    if key == "warning" {
                        continue;
                    }
                    if let Some(arr) = value.as_array() {
                        all_items.extend(arr.iter().cloned());
                    }
                }
            }
        }
    }

    let mut flattened = serde_json::json!({ "items": all_items });
    if let Some(token) = next_page_token {
        flattened["nextPageToken"] = token;
    }
    flattened
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_query_params_appends() {
        let params = json!({"pageSize": "200", "pageToken": "a b"});
        assert_eq!(
            add_query_params("https://x/v1/p?project=a", &params),
            "https://x/v1/p?project=a&pageSize=200&pageToken=a%20b"
        );
        assert_eq!(add_query_params("https://x", &Value::Null), "https://x");
    }

    #[test]
    fn test_flatten_aggregated_response_keeps_token() {
        let response = json!({
            "items": {
                "zones/us-central1-a": {"instances": [{"name": "a"}]},
                "zones/us-east1-b": {"warning": {"code": "NO_RESULTS_ON_PAGE"}},
                "zones/europe-west1-b": {"instances": [{"name": "b"}, {"name": "c"}]}
            },
            "nextPageToken": "next"
        });
        let flattened = flatten_aggregated_response(response);
        assert_eq!(flattened["items"].as_array().unwrap().len(), 3);
        assert_eq!(flattened["nextPageToken"], "next");
    }

    #[test]
    fn test_flatten_aggregated_response_without_items() {
        let flattened = flatten_aggregated_response(json!({}));
        assert_eq!(flattened["items"], json!([]));
        assert!(flattened.get("nextPageToken").is_none());
    }
}
