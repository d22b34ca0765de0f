//! Timecard Forge - fills a fixed timecard spreadsheet template from JSON
//!
//! A submission (employee name, week selector, Sunday..Saturday rows, totals)
//! is mapped onto the fixed cells of a two-week `.xlsx` template: dates are
//! normalized from several textual formats, written as date serials with a
//! centered short-date style, and the result is returned as bytes.
//!
//! # Features
//!
//! - Date normalization with a fixed format priority (`YYYY-MM-DD` first)
//! - Closed week layout table; unknown weeks fall back to week 1
//! - Best-effort date cells: unparseable dates are left blank and reported
//! - Template cells keep their borders and fills when dates are styled
//! - HTTP endpoint (`POST /excel`) and CLI
//!
//! # Example
//!
//! ```no_run
//! use timecard_forge::core::TimecardPopulator;
//! use timecard_forge::excel::TemplateStore;
//! use timecard_forge::types::TimecardRequest;
//!
//! let request = TimecardRequest::from_json(br#"{
//!     "employeeName": "Alice",
//!     "weekNumber": 1,
//!     "rows": [
//!         {"date": "2024-01-07"}, {"date": "2024-01-08"}, {"date": "2024-01-09"},
//!         {"date": "2024-01-10"}, {"date": "2024-01-11"}, {"date": "2024-01-12"},
//!         {"date": "2024-01-13"}
//!     ],
//!     "totalOC": 8,
//!     "totalOT": 0
//! }"#)?;
//!
//! let populator = TimecardPopulator::new(TemplateStore::builtin()?);
//! let report = populator.populate_with_report(&request)?;
//!
//! println!("{} bytes, {} blank date cells", report.bytes.len(), report.skipped.len());
//! std::fs::write("Timecard.xlsx", &report.bytes)?;
//! # Ok::<(), timecard_forge::error::TimecardError>(())
//! ```

pub mod api;
pub mod cli;
pub mod core;
pub mod error;
pub mod excel;
pub mod types;

// Re-export commonly used types
pub use error::{TimecardError, TimecardResult};
pub use types::{TimecardEntry, TimecardRequest};
