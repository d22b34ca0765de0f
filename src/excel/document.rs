//! A single request's working copy of the template.

use chrono::NaiveDate;

use super::cell_ref::CellRef;
use super::package::{PackageError, XlsxPackage};
use super::patch::{apply_cell_patches, CellPatch, WorkbookCellPatches};
use super::styles::CellStyle;
use crate::core::dates::to_excel_serial;

/// An opened template plus the cell writes made against it.
///
/// Writes are validated eagerly (sheet must exist, address must parse) and
/// applied to the XML parts only when the document is serialized.
#[derive(Debug, Clone)]
pub struct TimecardDocument {
    package: XlsxPackage,
    sheet_names: Vec<String>,
    patches: WorkbookCellPatches,
}

impl TimecardDocument {
    /// Parse `.xlsx` bytes into a fresh, independent document.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PackageError> {
        let package = XlsxPackage::from_bytes(bytes)?;
        let sheet_names = package.sheets()?.into_iter().map(|s| s.name).collect();
        Ok(Self {
            package,
            sheet_names,
            patches: WorkbookCellPatches::default(),
        })
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    pub fn has_sheet(&self, sheet: &str) -> bool {
        self.sheet_names.iter().any(|s| s == sheet)
    }

    pub fn set_text(&mut self, sheet: &str, cell: &str, text: &str) -> Result<(), PackageError> {
        self.set(sheet, cell, CellPatch::text(text))
    }

    pub fn set_number(&mut self, sheet: &str, cell: &str, n: f64) -> Result<(), PackageError> {
        self.set(sheet, cell, CellPatch::number(n))
    }

    /// Write a date serial and layer `style` over the cell's template style.
    pub fn set_date(
        &mut self,
        sheet: &str,
        cell: &str,
        date: NaiveDate,
        style: CellStyle,
    ) -> Result<(), PackageError> {
        self.set(
            sheet,
            cell,
            CellPatch::number(to_excel_serial(date)).with_style(style),
        )
    }

    /// The pending write for a cell, if any.
    pub fn pending(&self, sheet: &str, cell: &str) -> Option<&CellPatch> {
        let cell = CellRef::from_a1(cell).ok()?;
        self.patches.get(sheet, cell)
    }

    fn set(&mut self, sheet: &str, cell: &str, patch: CellPatch) -> Result<(), PackageError> {
        if !self.has_sheet(sheet) {
            return Err(PackageError::UnknownSheet(sheet.to_string()));
        }
        let cell = CellRef::from_a1(cell)?;
        self.patches.set_cell(sheet, cell, patch);
        Ok(())
    }

    /// Apply pending writes and zip the document back up.
    pub fn into_bytes(mut self) -> Result<Vec<u8>, PackageError> {
        apply_cell_patches(&mut self.package, &self.patches)?;
        self.package.write_to_bytes()
    }
}
