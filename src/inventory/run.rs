//! Inventory run orchestration
//!
//! Drives one run through fetching, normalization, aggregation, writing
//! and upload. Per-pair fetch failures are collected; credential, write
//! and upload failures end the run.

use super::normalize::{NormalizedRow, Normalizer};
use super::sheet::{Grouping, Sheet, SheetAggregator, ASSET_SHEET_NAME};
use crate::error::{is_credentials_error, InventoryError};
use crate::gcp::client::format_gcp_error;
use crate::output::{Uploader, WorkbookWriter};
use crate::resource::{get_all_resource_keys, FetchTarget, ResourceSource, ALL_TYPES_LABEL};
use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// How resources are queried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InventoryMode {
    /// One unified asset search per project
    AssetSearch,
    /// One listing per registry resource type
    #[default]
    PerType,
}

impl InventoryMode {
    /// Fetch targets run for every project
    pub fn targets(self) -> Vec<FetchTarget> {
        match self {
            InventoryMode::AssetSearch => vec![FetchTarget::AssetSearch],
            InventoryMode::PerType => get_all_resource_keys()
                .into_iter()
                .map(|k| FetchTarget::ResourceType(k.to_string()))
                .collect(),
        }
    }

    pub fn grouping(self) -> Grouping {
        match self {
            InventoryMode::AssetSearch => Grouping::Single,
            InventoryMode::PerType => Grouping::ByResourceType,
        }
    }

    /// Sheets that exist even when nothing is found
    pub fn expected_groups(self) -> Vec<String> {
        match self {
            InventoryMode::AssetSearch => vec![ASSET_SHEET_NAME.to_string()],
            InventoryMode::PerType => get_all_resource_keys()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl fmt::Display for InventoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryMode::AssetSearch => write!(f, "asset-search"),
            InventoryMode::PerType => write!(f, "per-type"),
        }
    }
}

/// Run-level states, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RunState {
    Init,
    Fetching,
    Normalizing,
    Aggregating,
    Writing,
    Uploading,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

/// A non-fatal fetch failure for one (project, resource type) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub project: String,
    /// Resource type key, or `*` for the asset search
    pub resource_type: String,
    pub message: String,
}

/// Final outcome of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    PartialSuccess(Vec<FetchFailure>),
    Failed(String),
}

impl RunStatus {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Success | RunStatus::PartialSuccess(_) => 0,
            RunStatus::Failed(_) => 1,
        }
    }
}

/// State of one inventory invocation
#[derive(Debug)]
pub struct InventoryRun {
    pub id: Uuid,
    pub projects: Vec<String>,
    pub mode: InventoryMode,
    state: RunState,
    partial: bool,
    pub sheets: Vec<Sheet>,
    pub failures: Vec<FetchFailure>,
    /// Error that ended the run, or cut fetching short
    pub fatal: Option<String>,
    pub workbook_path: Option<PathBuf>,
    pub uploaded_object: Option<String>,
}

impl InventoryRun {
    pub fn new(projects: Vec<String>, mode: InventoryMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            projects,
            mode,
            state: RunState::Init,
            partial: false,
            sheets: Vec::new(),
            failures: Vec::new(),
            fatal: None,
            workbook_path: None,
            uploaded_object: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// True once any pair failed without ending the run
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Move forward to `next`; states are never revisited
    pub fn transition(&mut self, next: RunState) -> Result<()> {
        if self.state.is_terminal() || next <= self.state {
            return Err(anyhow::anyhow!(
                "Invalid run transition {:?} -> {:?}",
                self.state,
                next
            ));
        }
        tracing::debug!("Run {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }

    /// End the run with a fatal error
    pub fn fail(&mut self, error: impl fmt::Display) {
        let message = error.to_string();
        tracing::error!("Run {} failed in {:?}: {}", self.id, self.state, message);
        self.fatal = Some(message);
        self.state = RunState::Failed;
    }

    pub fn record_failure(&mut self, failure: FetchFailure) {
        tracing::warn!(
            "Fetching {} for {} failed: {}",
            failure.resource_type,
            failure.project,
            failure.message
        );
        self.partial = true;
        self.failures.push(failure);
    }

    pub fn status(&self) -> RunStatus {
        if self.state == RunState::Failed {
            return RunStatus::Failed(self.fatal.clone().unwrap_or_default());
        }
        if self.partial {
            RunStatus::PartialSuccess(self.failures.clone())
        } else {
            RunStatus::Success
        }
    }

    pub fn total_resources(&self) -> usize {
        self.sheets.iter().map(Sheet::row_count).sum()
    }
}

/// Knobs for one pipeline run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: InventoryMode,
    /// Concurrent (project, target) fetches
    pub concurrency: usize,
    pub expand_nested: bool,
    pub output: PathBuf,
    /// Upload is skipped without a bucket
    pub bucket: Option<String>,
    pub object_name: String,
}

/// Outcome of fetching one (project, target) pair
struct PairOutcome {
    project: String,
    target: FetchTarget,
    result: Result<Vec<NormalizedRow>>,
}

/// Wires the fetcher, normalizer, aggregator and output collaborators together
pub struct InventoryPipeline<'a> {
    source: &'a dyn ResourceSource,
    writer: &'a dyn WorkbookWriter,
    uploader: &'a dyn Uploader,
    options: RunOptions,
}

impl<'a> InventoryPipeline<'a> {
    pub fn new(
        source: &'a dyn ResourceSource,
        writer: &'a dyn WorkbookWriter,
        uploader: &'a dyn Uploader,
        options: RunOptions,
    ) -> Self {
        Self {
            source,
            writer,
            uploader,
            options,
        }
    }

    /// Run the inventory for `projects`. Every outcome is reported through the run.
    pub async fn run(&self, projects: Vec<String>) -> InventoryRun {
        let mut run = InventoryRun::new(projects, self.options.mode);
        if let Err(e) = self.drive(&mut run).await {
            run.fail(format!("{:#}", e));
        }
        run
    }

    async fn drive(&self, run: &mut InventoryRun) -> Result<()> {
        tracing::info!(
            "Run {} started: {} mode, projects {:?}",
            run.id,
            run.mode,
            run.projects
        );

        run.transition(RunState::Fetching)?;
        let Some(rows) = self.fetch_all(run).await else {
            return Ok(());
        };

        run.transition(RunState::Normalizing)?;
        tracing::info!("Normalized {} resources", rows.len());

        run.transition(RunState::Aggregating)?;
        let mut aggregator =
            SheetAggregator::new(self.options.mode.grouping(), self.options.mode.expected_groups());
        aggregator.extend(rows);
        run.sheets = aggregator.build();

        run.transition(RunState::Writing)?;
        if let Err(e) = self.writer.write(&run.sheets, &self.options.output) {
            run.fail(InventoryError::WorkbookWrite {
                path: self.options.output.clone(),
                reason: format!("{:#}", e),
            });
            return Ok(());
        }
        run.workbook_path = Some(self.options.output.clone());

        if let Some(bucket) = &self.options.bucket {
            run.transition(RunState::Uploading)?;
            match self
                .uploader
                .upload(&self.options.output, bucket, &self.options.object_name)
                .await
            {
                Ok(uri) => run.uploaded_object = Some(uri),
                Err(e) => {
                    run.fail(InventoryError::Upload {
                        bucket: bucket.clone(),
                        object: self.options.object_name.clone(),
                        reason: format_gcp_error(&e),
                    });
                    return Ok(());
                }
            }
        } else {
            tracing::info!("No bucket given; skipping upload");
        }

        run.transition(RunState::Done)?;
        tracing::info!(
            "Run {} finished with {} resources",
            run.id,
            run.total_resources()
        );
        Ok(())
    }

    /// Fetch every pair. `None` means the run failed and nothing should be written.
    async fn fetch_all(&self, run: &mut InventoryRun) -> Option<Vec<NormalizedRow>> {
        let targets = self.options.mode.targets();
        let normalizer = Normalizer::new(self.options.expand_nested);

        let mut remaining: HashMap<String, usize> = run
            .projects
            .iter()
            .map(|p| (p.clone(), targets.len()))
            .collect();
        let mut completed: HashSet<String> = HashSet::new();
        let mut rows_by_project: HashMap<String, Vec<NormalizedRow>> = HashMap::new();
        let mut fatal: Option<anyhow::Error> = None;

        let pairs: Vec<(String, FetchTarget)> = run
            .projects
            .iter()
            .flat_map(|p| targets.iter().map(move |t| (p.clone(), t.clone())))
            .collect();

        {
            let mut outcomes = stream::iter(pairs)
                .map(|(project, target)| self.fetch_pair(normalizer, project, target))
                .buffer_unordered(self.options.concurrency.max(1));

            while let Some(outcome) = outcomes.next().await {
                match outcome.result {
                    Ok(rows) => {
                        tracing::info!(
                            "Fetched {} {} resources for {}",
                            rows.len(),
                            outcome.target.label(),
                            outcome.project
                        );
                        rows_by_project
                            .entry(outcome.project.clone())
                            .or_default()
                            .extend(rows);
                    }
                    Err(e) if is_credentials_error(&e) => {
                        fatal = Some(e);
                        break;
                    }
                    Err(e) => run.record_failure(FetchFailure {
                        project: outcome.project.clone(),
                        resource_type: outcome.target.label().to_string(),
                        message: format_gcp_error(&e),
                    }),
                }

                if let Some(left) = remaining.get_mut(&outcome.project) {
                    *left -= 1;
                    if *left == 0 {
                        completed.insert(outcome.project);
                    }
                }
            }
        }

        if let Some(error) = fatal {
            let message = format!("{:#}", error);
            if completed.is_empty() {
                run.fail(message);
                return None;
            }

            tracing::warn!(
                "Fetching stopped early ({}); writing {} completed projects",
                message,
                completed.len()
            );
            let incomplete: Vec<String> = run
                .projects
                .iter()
                .filter(|p| !completed.contains(*p))
                .cloned()
                .collect();
            for project in incomplete {
                run.record_failure(FetchFailure {
                    project,
                    resource_type: ALL_TYPES_LABEL.to_string(),
                    message: format!("not inventoried: {}", message),
                });
            }
            run.fatal = Some(message);
        }

        let rows = run
            .projects
            .iter()
            .filter(|p| completed.contains(*p))
            .filter_map(|p| rows_by_project.remove(p))
            .flatten()
            .collect();
        Some(rows)
    }

    /// Pull every page of one pair, normalizing as pages arrive.
    /// A pair either contributes all of its rows or none.
    async fn fetch_pair(
        &self,
        normalizer: Normalizer,
        project: String,
        target: FetchTarget,
    ) -> PairOutcome {
        tracing::debug!("Fetching {} for {}", target.label(), project);

        let result = async {
            let mut rows = Vec::new();
            let mut pages = self.source.pages(&project, &target);
            while let Some(page) = pages.next().await {
                rows.extend(page?.into_iter().map(|record| normalizer.normalize(record)));
            }
            Ok::<_, anyhow::Error>(rows)
        }
        .await;

        PairOutcome {
            project,
            target,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_only_move_forward() {
        let mut run = InventoryRun::new(vec!["proj-a".to_string()], InventoryMode::PerType);
        assert_eq!(run.state(), RunState::Init);
        run.transition(RunState::Fetching).unwrap();
        assert!(run.transition(RunState::Init).is_err());
        assert!(run.transition(RunState::Fetching).is_err());
        run.transition(RunState::Writing).unwrap();
        run.transition(RunState::Done).unwrap();
        assert!(run.transition(RunState::Failed).is_err());
        assert_eq!(run.status(), RunStatus::Success);
    }

    #[test]
    fn test_failure_marks_partial() {
        let mut run = InventoryRun::new(vec!["proj-a".to_string()], InventoryMode::AssetSearch);
        run.record_failure(FetchFailure {
            project: "proj-a".to_string(),
            resource_type: "*".to_string(),
            message: "denied".to_string(),
        });
        assert!(run.is_partial());
        assert!(matches!(run.status(), RunStatus::PartialSuccess(ref f) if f.len() == 1));
        assert_eq!(run.status().exit_code(), 0);
    }

    #[test]
    fn test_fail_is_terminal() {
        let mut run = InventoryRun::new(vec![], InventoryMode::PerType);
        run.fail("boom");
        assert_eq!(run.state(), RunState::Failed);
        assert_eq!(run.status(), RunStatus::Failed("boom".to_string()));
        assert_eq!(run.status().exit_code(), 1);
    }

    #[test]
    fn test_mode_targets() {
        assert_eq!(InventoryMode::AssetSearch.targets(), vec![FetchTarget::AssetSearch]);
        assert_eq!(InventoryMode::PerType.targets().len(), 5);
        assert_eq!(
            InventoryMode::AssetSearch.expected_groups(),
            vec![ASSET_SHEET_NAME.to_string()]
        );
    }
}
