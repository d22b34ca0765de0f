//! Template population: maps a timecard request onto its week's fixed cells.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::dates::{normalize_date, week_start};
use super::layout::{resolve_layout, WeekLayout};
use crate::error::{TimecardError, TimecardResult};
use crate::excel::{CellRef, PackageError, TemplateSource, TemplateStore, TimecardDocument, DATE_STYLE};
use crate::types::{TimecardEntry, TimecardRequest};

/// Which part of the sheet a skipped date belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateBlock {
    Primary,
    Overtime,
    WeekStart,
}

/// A date cell left blank because its input text was not a recognizable date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCell {
    pub sheet: &'static str,
    pub cell: String,
    pub block: DateBlock,
    pub input: String,
}

/// Output of a population run
#[derive(Debug, Clone)]
pub struct PopulatedTimecard {
    pub bytes: Vec<u8>,
    pub skipped: Vec<SkippedCell>,
}

/// Fills a fresh copy of the template for each request.
///
/// Holds no per-request state, so one populator can serve any number of
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct TimecardPopulator<S = TemplateStore> {
    source: S,
}

impl<S: TemplateSource> TimecardPopulator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Populate and serialize. Unparseable dates leave their cells blank.
    pub fn populate(&self, request: &TimecardRequest) -> TimecardResult<Vec<u8>> {
        Ok(self.populate_with_report(request)?.bytes)
    }

    /// Like [`populate`](Self::populate), also returning every date cell that
    /// was left blank.
    pub fn populate_with_report(&self, request: &TimecardRequest) -> TimecardResult<PopulatedTimecard> {
        request.validate()?;

        let layout = resolve_layout(request.week_number);
        if layout.week != request.week_number {
            debug!(
                week_number = request.week_number,
                sheet = layout.sheet,
                "Unknown week selector, using default layout"
            );
        }

        let mut doc = self.source.open()?;
        let mut fill = SheetFill {
            doc: &mut doc,
            layout,
            skipped: Vec::new(),
        };

        if !request.employee_name.is_empty() {
            fill.write_text(layout.employee_cell, &request.employee_name)?;
        }

        let rows = request.week_rows();
        fill.write_date_block(layout.primary_dates_top, rows, DateBlock::Primary)?;
        fill.write_date_block(layout.overtime_dates_top, rows, DateBlock::Overtime)?;

        // Anchor comes from the first row only
        match normalize_date(&rows[0].date) {
            Ok(date) => fill.write_date(layout.week_start_cell, week_start(date))?,
            Err(_) => fill.skip(layout.week_start_cell.to_string(), DateBlock::WeekStart, &rows[0].date),
        }

        if let Some(totals) = layout.totals {
            fill.write_number(totals.on_call, request.total_oc)?;
            fill.write_number(totals.overtime, request.total_ot)?;
        }

        let skipped = fill.skipped;
        let bytes = doc
            .into_bytes()
            .map_err(|e| TimecardError::Serialization(e.to_string()))?;

        info!(
            sheet = layout.sheet,
            size = bytes.len(),
            skipped = skipped.len(),
            "Populated timecard"
        );
        Ok(PopulatedTimecard { bytes, skipped })
    }
}

struct SheetFill<'d> {
    doc: &'d mut TimecardDocument,
    layout: &'static WeekLayout,
    skipped: Vec<SkippedCell>,
}

impl SheetFill<'_> {
    fn write_text(&mut self, cell: &str, text: &str) -> TimecardResult<()> {
        let result = self.doc.set_text(self.layout.sheet, cell, text);
        self.check(cell, result)
    }

    fn write_number(&mut self, cell: &str, n: f64) -> TimecardResult<()> {
        let result = self.doc.set_number(self.layout.sheet, cell, n);
        self.check(cell, result)
    }

    fn write_date(&mut self, cell: &str, date: chrono::NaiveDate) -> TimecardResult<()> {
        let result = self.doc.set_date(self.layout.sheet, cell, date, DATE_STYLE);
        self.check(cell, result)
    }

    fn write_date_block(
        &mut self,
        top: &str,
        rows: &[TimecardEntry],
        block: DateBlock,
    ) -> TimecardResult<()> {
        let top = CellRef::from_a1(top).map_err(|e| self.workbook_error(top, e))?;
        for (i, entry) in rows.iter().enumerate() {
            let cell = top.offset_rows(i as u32).to_a1();
            match normalize_date(&entry.date) {
                Ok(date) => self.write_date(&cell, date)?,
                Err(_) => self.skip(cell, block, &entry.date),
            }
        }
        Ok(())
    }

    fn skip(&mut self, cell: String, block: DateBlock, input: &str) {
        warn!(sheet = self.layout.sheet, cell = %cell, input, "Unrecognized date, leaving cell blank");
        self.skipped.push(SkippedCell {
            sheet: self.layout.sheet,
            cell,
            block,
            input: input.to_string(),
        });
    }

    fn check(&self, cell: &str, result: Result<(), PackageError>) -> TimecardResult<()> {
        result.map_err(|e| self.workbook_error(cell, e))
    }

    fn workbook_error(&self, cell: &str, err: PackageError) -> TimecardError {
        TimecardError::Workbook(format!("{}!{}: {}", self.layout.sheet, cell, err))
    }
}
