//! Schema normalization
//!
//! Turns one [`ResourceRecord`] into one flat [`NormalizedRow`]. Scalars map to
//! columns of the same name; nested values become canonical JSON strings.

use crate::resource::ResourceRecord;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::HashSet;

/// Columns present on every row, in this order
pub const IDENTITY_COLUMNS: [&str; 4] = ["resourceType", "project", "name", "location"];

/// Prefix for raw fields that clash with an identifying column
const RAW_PREFIX: &str = "raw.";

/// A single spreadsheet cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    String(String),
    Number(Number),
    Bool(bool),
}

impl CellValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Flat column → value mapping for one resource
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    columns: Vec<(String, CellValue)>,
}

impl NormalizedRow {
    /// Value of a column, `None` for a blank cell
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names in row order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn identity(&self, column: &str) -> &str {
        self.get(column).and_then(CellValue::as_str).unwrap_or("")
    }

    pub fn resource_type(&self) -> &str {
        self.identity("resourceType")
    }

    pub fn project(&self) -> &str {
        self.identity("project")
    }

    pub fn name(&self) -> &str {
        self.identity("name")
    }

    pub fn location(&self) -> &str {
        self.identity("location")
    }

    /// Stable textual form of the whole row, used to break sort ties
    pub fn encoded(&self) -> String {
        serde_json::to_string(&self.columns).unwrap_or_default()
    }
}

/// Converts resource records to rows
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    /// Expand nested objects into dotted columns instead of JSON strings
    expand_nested: bool,
}

impl Normalizer {
    pub fn new(expand_nested: bool) -> Self {
        Self { expand_nested }
    }

    /// Normalize one record. Never fails: anything unusable becomes a blank cell.
    pub fn normalize(&self, record: ResourceRecord) -> NormalizedRow {
        let mut builder = RowBuilder::default();
        builder.insert("resourceType".to_string(), CellValue::String(record.resource_type));
        builder.insert("project".to_string(), CellValue::String(record.project));
        builder.insert("name".to_string(), CellValue::String(record.name));
        builder.insert("location".to_string(), CellValue::String(record.location));

        match record.raw_data {
            Value::Object(map) => {
                for (key, value) in sorted_entries(map) {
                    self.push_field(&mut builder, key, value);
                }
            }
            Value::Null => {}
            other => {
                tracing::debug!("Ignoring non-object resource payload: {}", other);
            }
        }

        NormalizedRow {
            columns: builder.columns,
        }
    }

    fn push_field(&self, builder: &mut RowBuilder, key: String, value: Value) {
        if key.is_empty() {
            return;
        }

        match value {
            Value::Null => {}
            Value::Bool(b) => builder.insert(key, CellValue::Bool(b)),
            Value::Number(n) => builder.insert(key, CellValue::Number(n)),
            Value::String(s) => builder.insert(key, CellValue::String(s)),
            Value::Object(map) if self.expand_nested && !map.is_empty() => {
                for (child, value) in sorted_entries(map) {
                    if !child.is_empty() {
                        self.push_field(builder, format!("{}.{}", key, child), value);
                    }
                }
            }
            nested => builder.insert(key, CellValue::String(canonical_json(nested))),
        }
    }
}

#[derive(Default)]
struct RowBuilder {
    columns: Vec<(String, CellValue)>,
    seen: HashSet<String>,
}

impl RowBuilder {
    fn insert(&mut self, name: String, value: CellValue) {
        let name = if IDENTITY_COLUMNS.contains(&name.as_str()) && self.seen.contains(&name) {
            let identity = self
                .columns
                .iter()
                .find(|(existing, _)| *existing == name)
                .map(|(_, v)| v);
            if identity == Some(&value) {
                return;
            }
            format!("{}{}", RAW_PREFIX, name)
        } else {
            name
        };

        let name = if self.seen.contains(&name) {
            let renamed = (1..)
                .map(|i| format!("{}_{}", name, i))
                .find(|candidate| !self.seen.contains(candidate))
                .unwrap_or_default();
            tracing::warn!("Column {} already present; keeping value as {}", name, renamed);
            renamed
        } else {
            name
        };

        self.seen.insert(name.clone());
        self.columns.push((name, value));
    }
}

fn sorted_entries(map: Map<String, Value>) -> Vec<(String, Value)> {
    let mut entries: Vec<(String, Value)> = map.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

/// Rebuild a value with every object's keys in sorted order
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            sorted_entries(map)
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        scalar => scalar,
    }
}

/// JSON encoding with stable key order
pub fn canonical_json(value: Value) -> String {
    serde_json::to_string(&canonicalize(value)).unwrap_or_default()
}
