//! Resource records as fetched from the provider

use super::registry::ResourceDef;
use serde_json::Value;

/// One queried cloud resource
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    pub resource_type: String,
    pub project: String,
    pub name: String,
    /// Empty for global resources
    pub location: String,
    pub raw_data: Value,
}

impl ResourceRecord {
    /// Build a record from one listed item.
    ///
    /// `default_type` is used unless the definition names a per-item type field.
    /// Nothing here fails: fields that are missing or not strings come out empty.
    pub fn from_item(item: Value, def: &ResourceDef, default_type: &str, project: &str) -> Self {
        let resource_type = match &def.type_field {
            Some(field) => str_field(&item, field).unwrap_or_default().to_string(),
            None => default_type.to_string(),
        };

        let name = str_field(&item, &def.name_field)
            .unwrap_or_default()
            .to_string();

        let location = def
            .location_fields
            .iter()
            .find_map(|field| str_field(&item, field))
            .map(extract_short_name)
            .or_else(|| location_from_name(&name))
            .unwrap_or_default();

        Self {
            resource_type,
            project: project.to_string(),
            name,
            location,
            raw_data: item,
        }
    }
}

fn str_field<'a>(item: &'a Value, field: &str) -> Option<&'a str> {
    item.get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

/// Extract short name from GCP resource URL
/// e.g., "https://www.googleapis.com/compute/v1/projects/my-project/zones/us-central1-a" -> "us-central1-a"
pub fn extract_short_name(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

/// Pull `L` out of a resource name shaped like `projects/p/locations/L/...`
fn location_from_name(name: &str) -> Option<String> {
    let mut parts = name.split('/');
    while let Some(part) = parts.next() {
        if part == "locations" {
            return parts
                .next()
                .filter(|l| !l.is_empty() && *l != "-")
                .map(str::to_string);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::registry::{asset_search_def, get_resource};
    use serde_json::json;

    #[test]
    fn test_compute_instance_zone_is_shortened() {
        let def = get_resource("compute_instances").unwrap();
        let item = json!({
            "name": "vm-1",
            "zone": "https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a"
        });
        let record = ResourceRecord::from_item(item, def, "compute_instances", "proj-a");
        assert_eq!(record.resource_type, "compute_instances");
        assert_eq!(record.project, "proj-a");
        assert_eq!(record.name, "vm-1");
        assert_eq!(record.location, "us-central1-a");
    }

    #[test]
    fn test_asset_type_comes_from_item() {
        let item = json!({
            "name": "//storage.googleapis.com/my-bucket",
            "assetType": "storage.googleapis.com/Bucket",
            "location": "us"
        });
        let record = ResourceRecord::from_item(item, asset_search_def(), "", "proj-a");
        assert_eq!(record.resource_type, "storage.googleapis.com/Bucket");
        assert_eq!(record.location, "us");
    }

    #[test]
    fn test_function_location_parsed_from_name() {
        let def = get_resource("cloud_functions").unwrap();
        let item = json!({"name": "projects/p/locations/europe-west1/functions/f"});
        let record = ResourceRecord::from_item(item, def, "cloud_functions", "p");
        assert_eq!(record.location, "europe-west1");
    }

    #[test]
    fn test_malformed_item_gives_empty_fields() {
        let def = get_resource("storage_buckets").unwrap();
        let record = ResourceRecord::from_item(json!(42), def, "storage_buckets", "p");
        assert_eq!(record.name, "");
        assert_eq!(record.location, "");
        assert_eq!(record.raw_data, json!(42));
    }
}
