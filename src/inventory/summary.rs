//! Human-readable end-of-run summary

use super::run::{InventoryRun, RunStatus};
use std::fmt::Write;

/// Render the summary printed when a run ends
pub fn render_summary(run: &InventoryRun) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Inventory run {} ({}) for {}",
        run.id,
        run.mode,
        run.projects.join(", ")
    );

    let status = run.status();
    let _ = match &status {
        RunStatus::Success => writeln!(out, "Status: success"),
        RunStatus::PartialSuccess(failures) => writeln!(
            out,
            "Status: partial success ({} failed fetches)",
            failures.len()
        ),
        RunStatus::Failed(error) => writeln!(out, "Status: failed: {}", error),
    };

    if !run.sheets.is_empty() {
        let _ = writeln!(out, "Total resources: {}", run.total_resources());
        let _ = writeln!(out, "Sheets:");
        for sheet in &run.sheets {
            let _ = writeln!(out, "  {}: {}", sheet.name, sheet.row_count());
        }
    }

    if !run.failures.is_empty() {
        let _ = writeln!(out, "Errors:");
        for failure in &run.failures {
            let _ = writeln!(
                out,
                "  {} / {}: {}",
                failure.project, failure.resource_type, failure.message
            );
        }
    }

    if let (RunStatus::PartialSuccess(_), Some(fatal)) = (&status, &run.fatal) {
        let _ = writeln!(out, "Fetching stopped early: {}", fatal);
    }

    if let Some(path) = &run.workbook_path {
        let _ = writeln!(out, "Workbook: {}", path.display());
    }
    if let Some(object) = &run.uploaded_object {
        let _ = writeln!(out, "Uploaded: {}", object);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::run::{FetchFailure, InventoryMode};

    #[test]
    fn test_summary_lists_failures() {
        let mut run = InventoryRun::new(
            vec!["proj-a".to_string(), "proj-x".to_string()],
            InventoryMode::AssetSearch,
        );
        run.record_failure(FetchFailure {
            project: "proj-x".to_string(),
            resource_type: "*".to_string(),
            message: "Permission denied or API not enabled (403)".to_string(),
        });

        let summary = render_summary(&run);
        assert!(summary.contains("for proj-a, proj-x"));
        assert!(summary.contains("Status: partial success (1 failed fetches)"));
        assert!(summary.contains("proj-x / *: Permission denied or API not enabled (403)"));
    }

    #[test]
    fn test_summary_for_failed_run() {
        let mut run = InventoryRun::new(vec!["proj-a".to_string()], InventoryMode::PerType);
        run.fail("credential acquisition failed: no key");
        let summary = render_summary(&run);
        assert!(summary.contains("Status: failed: credential acquisition failed: no key"));
        assert!(!summary.contains("Workbook:"));
    }
}
