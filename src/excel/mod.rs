//! Spreadsheet layer for timecards
//!
//! - Template: immutable `.xlsx` bytes, opened into a fresh document per request
//! - Patch: streamed edits of worksheet XML, styles derived from the template's own
//! - Reader: read a populated timecard back with calamine

mod cell_ref;
mod document;
mod package;
mod patch;
mod reader;
mod styles;
mod template;

pub use cell_ref::CellRef;
pub use document::TimecardDocument;
pub use package::{PackageError, SheetInfo, XlsxPackage};
pub use patch::{apply_cell_patches, CellPatch, CellValue, WorkbookCellPatches};
pub use reader::{TimecardReader, TimecardSummary};
pub use styles::{CellStyle, StyleSheet, DATE_STYLE};
pub use template::{build_default_template, TemplateSource, TemplateStore};
