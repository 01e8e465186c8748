//! Resource Registry - Load resource definitions from JSON
//!
//! This module loads the inventoried resource types from an embedded JSON
//! file and provides lookup functions for the rest of the crate.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded resource definitions (compiled into the binary)
const RESOURCE_FILE: &str = include_str!("../resources/inventory.json");

/// Resource definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    pub display_name: String,
    pub service: String,
    pub sdk_method: String,
    /// Extra query parameters sent with every page request
    #[serde(default)]
    pub sdk_method_params: Value,
    pub response_path: String,
    pub name_field: String,
    /// Field holding the resource type, when one listing returns many types
    #[serde(default)]
    pub type_field: Option<String>,
    /// Candidate fields for the location column, first match wins
    #[serde(default)]
    pub location_fields: Vec<String>,
    /// Service that must be enabled before listing is attempted
    #[serde(default)]
    pub required_service: Option<String>,
}

/// Root structure of resources/inventory.json
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    pub asset_search: ResourceDef,
    #[serde(default)]
    pub resources: HashMap<String, ResourceDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        serde_json::from_str(RESOURCE_FILE)
            .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e))
    })
}

/// Get a per-type resource definition by key
pub fn get_resource(key: &str) -> Option<&'static ResourceDef> {
    get_registry().resources.get(key)
}

/// Definition used for the unified asset search
pub fn asset_search_def() -> &'static ResourceDef {
    &get_registry().asset_search
}

/// All per-type resource keys, sorted
pub fn get_all_resource_keys() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = get_registry()
        .resources
        .keys()
        .map(|s| s.as_str())
        .collect();
    keys.sort_unstable();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_loads_successfully() {
        let registry = get_registry();
        assert!(
            !registry.resources.is_empty(),
            "Registry should have resources"
        );
        assert_eq!(registry.asset_search.response_path, "results");
    }

    #[test]
    fn test_compute_instances_resource_exists() {
        let resource = get_resource("compute_instances");
        assert!(
            resource.is_some(),
            "Compute instances resource should exist"
        );

        let resource = resource.unwrap();
        assert_eq!(resource.display_name, "VM Instances");
        assert_eq!(resource.service, "compute");
    }

    #[test]
    fn test_get_all_resource_keys_sorted() {
        assert_eq!(
            get_all_resource_keys(),
            vec![
                "cloud_functions",
                "compute_instances",
                "gke_clusters",
                "sql_instances",
                "storage_buckets"
            ]
        );
    }

    #[test]
    fn test_gke_requires_container_service() {
        let gke = get_resource("gke_clusters").unwrap();
        assert_eq!(
            gke.required_service.as_deref(),
            Some("container.googleapis.com")
        );
    }
}
