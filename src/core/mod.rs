//! Template-population engine: date normalization, week layouts, cell filling

pub mod dates;
pub mod layout;
pub mod populate;

pub use dates::{normalize_date, week_start, DateParseError};
pub use layout::{resolve_layout, WeekLayout, WEEK_LAYOUTS};
pub use populate::{DateBlock, PopulatedTimecard, SkippedCell, TimecardPopulator};
