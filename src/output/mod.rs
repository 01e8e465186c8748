//! Output collaborators: the workbook file and its upload.

mod upload;
mod workbook;

pub use upload::{object_name_for, GcsUploader, Uploader, XLSX_CONTENT_TYPE};
pub use workbook::{WorkbookWriter, XlsxWorkbookWriter, MAX_CELL_CHARS};
