//! Read a populated timecard back out of its `.xlsx` bytes.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};
use chrono::NaiveDate;
use serde::Serialize;

use super::cell_ref::CellRef;
use crate::core::dates::from_excel_serial;
use crate::core::layout::WeekLayout;
use crate::error::{TimecardError, TimecardResult};
use crate::types::DAYS_PER_WEEK;

/// What a timecard sheet holds in the cells the populator owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimecardSummary {
    pub sheet: String,
    pub employee_name: Option<String>,
    pub week_start: Option<NaiveDate>,
    pub primary_dates: Vec<Option<NaiveDate>>,
    pub overtime_dates: Vec<Option<NaiveDate>>,
    #[serde(rename = "totalOC")]
    pub total_oc: Option<f64>,
    #[serde(rename = "totalOT")]
    pub total_ot: Option<f64>,
}

pub struct TimecardReader {
    workbook: Xlsx<Cursor<Vec<u8>>>,
    ranges: HashMap<String, Range<Data>>,
}

impl TimecardReader {
    pub fn from_bytes(bytes: Vec<u8>) -> TimecardResult<Self> {
        let workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
            .map_err(|e| TimecardError::Workbook(format!("Failed to open Excel data: {}", e)))?;
        Ok(Self {
            workbook,
            ranges: HashMap::new(),
        })
    }

    pub fn open(path: &Path) -> TimecardResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes)
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    fn value(&mut self, sheet: &str, cell: &str) -> TimecardResult<Option<Data>> {
        let cell = CellRef::from_a1(cell).map_err(|e| TimecardError::Workbook(e.to_string()))?;
        if !self.ranges.contains_key(sheet) {
            let range = self.workbook.worksheet_range(sheet).map_err(|e| {
                TimecardError::Workbook(format!("Failed to read sheet {}: {}", sheet, e))
            })?;
            self.ranges.insert(sheet.to_string(), range);
        }
        Ok(self
            .ranges
            .get(sheet)
            .and_then(|range| range.get_value((cell.row, cell.col)))
            .filter(|data| !matches!(data, Data::Empty))
            .cloned())
    }

    /// Cell text; numbers are rendered as written.
    pub fn read_text(&mut self, sheet: &str, cell: &str) -> TimecardResult<Option<String>> {
        Ok(self.value(sheet, cell)?.map(|data| match data {
            Data::String(s) => s,
            other => other.to_string(),
        }))
    }

    pub fn read_number(&mut self, sheet: &str, cell: &str) -> TimecardResult<Option<f64>> {
        Ok(self.value(sheet, cell)?.and_then(|data| numeric(&data)))
    }

    /// A date cell, whether stored as a formatted serial or plain number.
    pub fn read_date(&mut self, sheet: &str, cell: &str) -> TimecardResult<Option<NaiveDate>> {
        Ok(match self.value(sheet, cell)? {
            Some(Data::DateTimeIso(iso)) => iso
                .get(..10)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            Some(data) => numeric(&data).and_then(from_excel_serial),
            None => None,
        })
    }

    pub fn read_summary(&mut self, layout: &WeekLayout) -> TimecardResult<TimecardSummary> {
        let sheet = layout.sheet;
        let primary_dates = self.read_date_block(sheet, layout.primary_dates_top)?;
        let overtime_dates = self.read_date_block(sheet, layout.overtime_dates_top)?;
        let (total_oc, total_ot) = match layout.totals {
            Some(totals) => (
                self.read_number(sheet, totals.on_call)?,
                self.read_number(sheet, totals.overtime)?,
            ),
            None => (None, None),
        };

        Ok(TimecardSummary {
            sheet: sheet.to_string(),
            employee_name: self.read_text(sheet, layout.employee_cell)?,
            week_start: self.read_date(sheet, layout.week_start_cell)?,
            primary_dates,
            overtime_dates,
            total_oc,
            total_ot,
        })
    }

    fn read_date_block(&mut self, sheet: &str, top: &str) -> TimecardResult<Vec<Option<NaiveDate>>> {
        let top = CellRef::from_a1(top).map_err(|e| TimecardError::Workbook(e.to_string()))?;
        (0..DAYS_PER_WEEK as u32)
            .map(|i| self.read_date(sheet, &top.offset_rows(i).to_a1()))
            .collect()
    }
}

fn numeric(data: &Data) -> Option<f64> {
    match data {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::DateTime(dt) => Some(dt.as_f64()),
        _ => None,
    }
}
