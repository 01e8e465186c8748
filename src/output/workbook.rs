//! Workbook output
//!
//! Serializes sheets to an `.xlsx` file with `rust_xlsxwriter`.

use crate::inventory::{CellValue, Sheet};
use anyhow::{Context, Result};
use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook, Worksheet};
use serde_json::Number;
use std::path::Path;

/// Longest string Excel stores in one cell
pub const MAX_CELL_CHARS: usize = 32_767;

/// Rows per worksheet, header included
const MAX_ROWS: usize = 1_048_576;

/// Columns per worksheet
const MAX_COLUMNS: usize = 16_384;

/// Largest integer an f64 cell holds exactly
const MAX_EXACT_INTEGER: u64 = 1 << 53;

/// Writes finished sheets to a workbook file
pub trait WorkbookWriter: Send + Sync {
    fn write(&self, sheets: &[Sheet], path: &Path) -> Result<()>;
}

/// `.xlsx` writer
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxWorkbookWriter;

impl WorkbookWriter for XlsxWorkbookWriter {
    fn write(&self, sheets: &[Sheet], path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        for sheet in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet
                .set_name(&sheet.name)
                .with_context(|| format!("Invalid sheet name {:?}", sheet.name))?;
            write_sheet(worksheet, sheet, &header_format)
                .with_context(|| format!("Failed to write sheet {}", sheet.name))?;
        }

        if sheets.is_empty() {
            // A workbook needs at least one sheet
            workbook.add_worksheet();
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        workbook
            .save(path)
            .with_context(|| format!("Failed to save workbook {}", path.display()))?;

        tracing::info!("Wrote {} sheets to {}", sheets.len(), path.display());
        Ok(())
    }
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet, header_format: &Format) -> Result<()> {
    let columns = sheet.header.len().min(MAX_COLUMNS);
    if columns < sheet.header.len() {
        tracing::warn!(
            "Sheet {} has {} columns; only the first {} are written",
            sheet.name,
            sheet.header.len(),
            MAX_COLUMNS
        );
    }

    for (col, column) in sheet.header.iter().take(columns).enumerate() {
        worksheet.write_string_with_format(0, col as ColNum, column.as_str(), header_format)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    let rows = sheet.rows.len().min(MAX_ROWS - 1);
    if rows < sheet.rows.len() {
        tracing::warn!(
            "Sheet {} has {} rows; only the first {} are written",
            sheet.name,
            sheet.rows.len(),
            rows
        );
    }

    for (index, row) in sheet.rows.iter().take(rows).enumerate() {
        let row_num = (index + 1) as RowNum;
        for (col, cell) in sheet.cells(row).take(columns).enumerate() {
            let col = col as ColNum;
            match cell {
                None => {}
                Some(CellValue::String(s)) => {
                    worksheet.write_string(row_num, col, truncate_cell(s))?;
                }
                Some(CellValue::Bool(b)) => {
                    worksheet.write_boolean(row_num, col, *b)?;
                }
                Some(CellValue::Number(n)) => match number_cell(n) {
                    Some(value) => {
                        worksheet.write_number(row_num, col, value)?;
                    }
                    None => {
                        worksheet.write_string(row_num, col, n.to_string())?;
                    }
                },
            }
        }
    }

    Ok(())
}

/// Numbers that survive as f64; big integers are written as text instead
fn number_cell(n: &Number) -> Option<f64> {
    if let Some(i) = n.as_i64() {
        return (i.unsigned_abs() <= MAX_EXACT_INTEGER).then_some(i as f64);
    }
    if let Some(u) = n.as_u64() {
        return (u <= MAX_EXACT_INTEGER).then_some(u as f64);
    }
    n.as_f64()
}

fn truncate_cell(s: &str) -> &str {
    match s.char_indices().nth(MAX_CELL_CHARS) {
        Some((byte_index, _)) => {
            tracing::warn!(
                "Cell value of {} bytes truncated to {} characters",
                s.len(),
                MAX_CELL_CHARS
            );
            &s[..byte_index]
        }
        None => s,
    }
}
