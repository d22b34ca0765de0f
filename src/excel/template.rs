//! Template storage: immutable template bytes, opened fresh for every request.

use std::path::Path;
use std::sync::Arc;

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use tracing::{debug, info};

use super::cell_ref::CellRef;
use super::document::TimecardDocument;
use crate::core::layout::{WeekLayout, WEEK_LAYOUTS};
use crate::error::{TimecardError, TimecardResult};
use crate::types::DAYS_PER_WEEK;

const DAY_NAMES: [&str; DAYS_PER_WEEK] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Something that can hand out a pristine copy of the timecard template.
pub trait TemplateSource: Send + Sync {
    /// Open a new, independent document. Callers own the result outright.
    fn open(&self) -> TimecardResult<TimecardDocument>;
}

impl<T: TemplateSource + ?Sized> TemplateSource for Arc<T> {
    fn open(&self) -> TimecardResult<TimecardDocument> {
        (**self).open()
    }
}

/// Template bytes loaded once and shared read-only between requests.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    bytes: Arc<[u8]>,
    origin: String,
}

impl TemplateStore {
    /// The timecard layout that ships with the crate.
    pub fn builtin() -> TimecardResult<Self> {
        let bytes = build_default_template()?;
        info!(size = bytes.len(), "Built default timecard template");
        Ok(Self::from_bytes(bytes, "built-in template"))
    }

    /// A customized template on disk. It must keep the sheet names and cell
    /// positions of the built-in one.
    pub fn from_path(path: &Path) -> TimecardResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            TimecardError::TemplateLoad(format!("failed to read {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), size = bytes.len(), "Loaded timecard template");
        Ok(Self::from_bytes(bytes, path.display().to_string()))
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, origin: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            origin: origin.into(),
        }
    }

    /// `builtin()` unless a path is given.
    pub fn load(path: Option<&Path>) -> TimecardResult<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::builtin(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Open the template once and check every week layout has its sheet.
    pub fn verify(&self) -> TimecardResult<()> {
        let document = self.open()?;
        let missing: Vec<&str> = WEEK_LAYOUTS
            .iter()
            .map(|layout| layout.sheet)
            .filter(|sheet| !document.has_sheet(sheet))
            .collect();
        if !missing.is_empty() {
            return Err(TimecardError::TemplateLoad(format!(
                "{} is missing sheet(s): {}",
                self.origin,
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

impl TemplateSource for TemplateStore {
    fn open(&self) -> TimecardResult<TimecardDocument> {
        debug!(origin = %self.origin, "Opening template copy");
        TimecardDocument::from_bytes(&self.bytes)
            .map_err(|e| TimecardError::TemplateLoad(format!("{}: {}", self.origin, e)))
    }
}

/// Build the default two-week timecard workbook.
pub fn build_default_template() -> TimecardResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    for layout in &WEEK_LAYOUTS {
        let worksheet = workbook.add_worksheet();
        write_week_sheet(worksheet, layout).map_err(|e| {
            TimecardError::TemplateLoad(format!("failed to build sheet {}: {}", layout.sheet, e))
        })?;
    }
    workbook
        .save_to_buffer()
        .map_err(|e| TimecardError::TemplateLoad(format!("failed to build template: {}", e)))
}

fn cell(a1: &str) -> Result<(u32, u16), XlsxError> {
    let cell = CellRef::from_a1(a1).map_err(|e| XlsxError::ParameterError(e.to_string()))?;
    Ok((cell.row, cell.col as u16))
}

fn write_week_sheet(worksheet: &mut Worksheet, layout: &WeekLayout) -> Result<(), XlsxError> {
    let title = Format::new().set_bold().set_font_size(16);
    let label = Format::new().set_bold();
    let header = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin)
        .set_background_color(Color::RGB(0xDDEBF7));
    let boxed = Format::new().set_border(FormatBorder::Thin);
    let anchor = Format::new()
        .set_bold()
        .set_border(FormatBorder::Medium)
        .set_background_color(Color::RGB(0xFFF2CC));

    worksheet.set_name(layout.sheet)?;
    worksheet.set_column_width(0, 16)?;
    worksheet.set_column_width(1, 12)?;
    worksheet.set_column_width(2, 24)?;
    worksheet.set_column_width(3, 10)?;
    worksheet.set_column_width(4, 12)?;
    worksheet.set_column_width(5, 30)?;
    worksheet.set_column_width(12, 24)?;

    worksheet.write_string_with_format(0, 0, &format!("TIMECARD - {}", layout.sheet), &title)?;

    let (row, col) = cell(layout.employee_cell)?;
    worksheet.write_string_with_format(row, col.saturating_sub(1), "Employee:", &label)?;
    worksheet.write_blank(row, col, &boxed)?;

    let (row, col) = cell(layout.week_start_cell)?;
    worksheet.write_string_with_format(row, col.saturating_sub(1), "Sun Date Start", &label)?;
    worksheet.write_blank(row, col, &anchor)?;

    let totals = [
        layout.totals.map(|t| t.on_call),
        layout.totals.map(|t| t.overtime),
    ];
    let blocks = [
        (layout.primary_dates_top, "Hours", totals[0], "Total OC"),
        (layout.overtime_dates_top, "Overtime", totals[1], "Total OT"),
    ];

    for (top, heading, total_cell, total_label) in blocks {
        let (top_row, date_col) = cell(top)?;
        let header_row = top_row - 1;
        if top != layout.primary_dates_top || header_row != cell(layout.week_start_cell)?.0 {
            worksheet.write_string_with_format(header_row, 0, heading, &label)?;
        }
        for (offset, name) in ["Date", "Project", "Hours", "Type", "Notes"].iter().enumerate() {
            let col = date_col + offset as u16;
            if (header_row, col) != cell(layout.week_start_cell)? {
                worksheet.write_string_with_format(header_row, col, *name, &header)?;
            }
        }

        for (i, day) in DAY_NAMES.iter().enumerate() {
            let row = top_row + i as u32;
            worksheet.write_string_with_format(row, 0, *day, &label)?;
            for offset in 0..5u16 {
                worksheet.write_blank(row, date_col + offset, &boxed)?;
            }
        }

        if let Some(total_cell) = total_cell {
            let (row, col) = cell(total_cell)?;
            worksheet.write_string_with_format(row, col.saturating_sub(1), total_label, &label)?;
            worksheet.write_blank(row, col, &boxed)?;
        }
    }

    Ok(())
}
