//! Sheet aggregation
//!
//! Groups normalized rows into sheets and derives each sheet's header.

use super::normalize::{CellValue, NormalizedRow, IDENTITY_COLUMNS};
use std::collections::{BTreeMap, HashSet};

/// Sheet used for every row in asset-search mode
pub const ASSET_SHEET_NAME: &str = "All Resources";

/// Excel limit on sheet name length
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Characters Excel rejects in sheet names
const INVALID_SHEET_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];

/// How rows are split into sheets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// One sheet per `resourceType`
    ByResourceType,
    /// Everything in [`ASSET_SHEET_NAME`]
    Single,
}

/// One tab of the output workbook
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    /// Sanitized name as written to the workbook
    pub name: String,
    /// Grouping key the sheet was built from
    pub group: String,
    pub header: Vec<String>,
    pub rows: Vec<NormalizedRow>,
}

impl Sheet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cells of one row in header order, `None` for blanks
    pub fn cells<'a>(&'a self, row: &'a NormalizedRow) -> impl Iterator<Item = Option<&'a CellValue>> {
        self.header.iter().map(move |column| row.get(column))
    }
}

/// Collects rows and builds sheets
#[derive(Debug)]
pub struct SheetAggregator {
    grouping: Grouping,
    groups: BTreeMap<String, Vec<NormalizedRow>>,
}

impl SheetAggregator {
    /// `expected_groups` get a sheet even if no row lands in them
    pub fn new<I, S>(grouping: Grouping, expected_groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut groups = BTreeMap::new();
        match grouping {
            Grouping::Single => {
                groups.insert(ASSET_SHEET_NAME.to_string(), Vec::new());
            }
            Grouping::ByResourceType => {
                for group in expected_groups {
                    groups.insert(group.into(), Vec::new());
                }
            }
        }
        Self { grouping, groups }
    }

    pub fn push(&mut self, row: NormalizedRow) {
        let key = match self.grouping {
            Grouping::Single => ASSET_SHEET_NAME.to_string(),
            Grouping::ByResourceType => row.resource_type().to_string(),
        };
        self.groups.entry(key).or_default().push(row);
    }

    /// Sort every group into a stable order and derive headers
    pub fn build(self) -> Vec<Sheet> {
        let mut used_names = HashSet::new();

        self.groups
            .into_iter()
            .map(|(group, mut rows)| {
                sort_rows(&mut rows);
                let header = derive_header(&rows);
                let name = sanitize_sheet_name(&group, &mut used_names);
                if name != group {
                    tracing::warn!(
                        "Sheet name {:?} is not valid in a workbook; using {:?}",
                        group,
                        name
                    );
                }
                Sheet {
                    name,
                    group,
                    header,
                    rows,
                }
            })
            .collect()
    }
}

impl Extend<NormalizedRow> for SheetAggregator {
    fn extend<T: IntoIterator<Item = NormalizedRow>>(&mut self, iter: T) {
        for row in iter {
            self.push(row);
        }
    }
}

/// Order rows independently of how they arrived
pub fn sort_rows(rows: &mut [NormalizedRow]) {
    rows.sort_by_cached_key(|row| {
        (
            row.resource_type().to_string(),
            row.project().to_string(),
            row.name().to_string(),
            row.location().to_string(),
            row.encoded(),
        )
    });
}

/// Identifying columns, then every other column in first-seen order
pub fn derive_header(rows: &[NormalizedRow]) -> Vec<String> {
    let mut header: Vec<String> = IDENTITY_COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut seen: HashSet<String> = header.iter().cloned().collect();

    for row in rows {
        for column in row.column_names() {
            if seen.insert(column.to_string()) {
                header.push(column.to_string());
            }
        }
    }

    header
}

/// Make `name` a legal, unused sheet name.
///
/// Invalid characters become `_`, the name is cut to 31 characters, and
/// clashes (compared case-insensitively, as Excel does) get a `_N` suffix.
pub fn sanitize_sheet_name(name: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if INVALID_SHEET_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let mut base: String = cleaned.chars().take(MAX_SHEET_NAME_LEN).collect();

    // Excel rejects a leading or trailing apostrophe
    if base.starts_with('\'') {
        base.replace_range(..1, "_");
    }
    if base.ends_with('\'') {
        base.pop();
        base.push('_');
    }

    let mut candidate = base.clone();
    let mut i = 1;

    while candidate.is_empty() || used.contains(&candidate.to_lowercase()) {
        let suffix = format!("_{}", i);
        let keep = MAX_SHEET_NAME_LEN - suffix.chars().count();
        candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        i += 1;
    }

    used.insert(candidate.to_lowercase());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::normalize::Normalizer;
    use crate::resource::ResourceRecord;
    use serde_json::{json, Value};

    fn row(resource_type: &str, name: &str, raw: Value) -> NormalizedRow {
        Normalizer::default().normalize(ResourceRecord {
            resource_type: resource_type.to_string(),
            project: "proj-a".to_string(),
            name: name.to_string(),
            location: String::new(),
            raw_data: raw,
        })
    }

    #[test]
    fn test_sanitize_replaces_invalid_chars() {
        let mut used = HashSet::new();
        assert_eq!(
            sanitize_sheet_name("proj::compute/instances", &mut used),
            "proj__compute_instances"
        );
    }

    #[test]
    fn test_sanitize_truncates_and_dedupes() {
        let mut used = HashSet::new();
        let long = "storage.googleapis.com/BucketPolicyThing";
        let first = sanitize_sheet_name(long, &mut used);
        let second = sanitize_sheet_name(long, &mut used);
        assert_eq!(first.chars().count(), 31);
        assert_eq!(second.chars().count(), 31);
        assert!(second.ends_with("_1"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_sanitize_is_case_insensitive_and_handles_empty() {
        let mut used = HashSet::new();
        assert_eq!(sanitize_sheet_name("Compute", &mut used), "Compute");
        assert_eq!(sanitize_sheet_name("compute", &mut used), "compute_1");
        assert_eq!(sanitize_sheet_name("", &mut used), "_1");
        assert_eq!(sanitize_sheet_name("'quoted'", &mut used), "_quoted_");
    }

    #[test]
    fn test_sanitize_apostrophe_exposed_by_truncation() {
        let mut used = HashSet::new();
        let name = format!("{}'tail", "a".repeat(30));
        let sanitized = sanitize_sheet_name(&name, &mut used);
        assert_eq!(sanitized.chars().count(), 31);
        assert!(!sanitized.ends_with('\''));
        assert_eq!(sanitized, format!("{}_", "a".repeat(30)));
    }

    #[test]
    fn test_empty_expected_group_has_identity_header() {
        let sheets = SheetAggregator::new(Grouping::ByResourceType, ["storage_buckets"]).build();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].header, IDENTITY_COLUMNS.to_vec());
        assert_eq!(sheets[0].row_count(), 0);
    }

    #[test]
    fn test_single_grouping_collects_every_type() {
        let mut aggregator = SheetAggregator::new(Grouping::Single, Vec::<String>::new());
        aggregator.push(row("compute.googleapis.com/Instance", "a", json!({"x": 1})));
        aggregator.push(row("storage.googleapis.com/Bucket", "b", json!({"y": 2})));
        let sheets = aggregator.build();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, ASSET_SHEET_NAME);
        assert_eq!(sheets[0].row_count(), 2);
        assert_eq!(&sheets[0].header[4..], &["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_header_independent_of_arrival_order() {
        let rows = vec![
            row("t", "b", json!({"beta": 1})),
            row("t", "a", json!({"alpha": 1, "zeta": 2})),
            row("t", "c", json!({"gamma": true})),
        ];

        let mut forward = SheetAggregator::new(Grouping::ByResourceType, ["t"]);
        forward.extend(rows.clone());
        let mut backward = SheetAggregator::new(Grouping::ByResourceType, ["t"]);
        backward.extend(rows.into_iter().rev());

        let forward = forward.build();
        let backward = backward.build();
        assert_eq!(forward, backward);
        assert_eq!(
            &forward[0].header[4..],
            &["alpha".to_string(), "zeta".to_string(), "beta".to_string(), "gamma".to_string()]
        );
    }

    #[test]
    fn test_cells_follow_header_with_blanks() {
        let mut aggregator = SheetAggregator::new(Grouping::ByResourceType, ["t"]);
        aggregator.push(row("t", "a", json!({"alpha": 1})));
        aggregator.push(row("t", "b", json!({"beta": "x"})));
        let sheet = aggregator.build().remove(0);
        let cells: Vec<Option<&CellValue>> = sheet.cells(&sheet.rows[1]).collect();
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[4], None);
        assert_eq!(cells[5], Some(&CellValue::String("x".to_string())));
    }
}
