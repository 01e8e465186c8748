//! Inventory pipeline
//!
//! Fetched [`ResourceRecord`](crate::resource::ResourceRecord)s are normalized
//! into rows, grouped into sheets, written to a workbook and uploaded.
//!
//! - [`normalize`] - Record to flat row conversion
//! - [`sheet`] - Grouping, header derivation and sheet naming
//! - [`run`] - Run state machine and pipeline orchestration
//! - [`summary`] - End-of-run report

pub mod normalize;
pub mod run;
pub mod sheet;
pub mod summary;

pub use normalize::{canonical_json, CellValue, NormalizedRow, Normalizer, IDENTITY_COLUMNS};
pub use run::{
    FetchFailure, InventoryMode, InventoryPipeline, InventoryRun, RunOptions, RunState, RunStatus,
};
pub use sheet::{sanitize_sheet_name, Grouping, Sheet, SheetAggregator, ASSET_SHEET_NAME};
pub use summary::render_summary;
