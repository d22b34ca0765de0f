use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{TimecardError, TimecardResult};

/// One row per day, Sunday through Saturday.
pub const DAYS_PER_WEEK: usize = 7;

//==============================================================================
// Request payload
//==============================================================================

/// One daily record of a timecard submission.
///
/// Every field defaults when absent or `null`; the date text is normalized
/// later and may be in any of the accepted formats (or garbage).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimecardEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub project: String,
    #[serde(deserialize_with = "null_as_default")]
    pub hours: f64,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub entry_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: String,
}

impl TimecardEntry {
    /// Entry with only a date set (handy for building requests by hand)
    pub fn on(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Default::default()
        }
    }
}

/// A full timecard submission as sent by the web form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimecardRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub employee_name: String,
    /// 1 or 2; anything else is treated as week 1.
    #[serde(deserialize_with = "null_as_default")]
    pub week_number: i64,
    #[serde(deserialize_with = "rows_or_empty")]
    pub rows: Vec<TimecardEntry>,
    #[serde(rename = "totalOC", deserialize_with = "null_as_default")]
    pub total_oc: f64,
    #[serde(rename = "totalOT", deserialize_with = "null_as_default")]
    pub total_ot: f64,
}

/// Web forms send `null` for untouched inputs; treat it like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `null` rows, and `null` entries inside them, decode to empty values.
fn rows_or_empty<'de, D>(deserializer: D) -> Result<Vec<TimecardEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows = Option::<Vec<Option<TimecardEntry>>>::deserialize(deserializer)?;
    Ok(rows
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}

impl TimecardRequest {
    /// Decode a request from a JSON body
    pub fn from_json(bytes: &[u8]) -> TimecardResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Reject requests that cannot fill a Sun..Sat block.
    pub fn validate(&self) -> TimecardResult<()> {
        if self.rows.len() < DAYS_PER_WEEK {
            return Err(TimecardError::InsufficientRows {
                required: DAYS_PER_WEEK,
                found: self.rows.len(),
            });
        }
        Ok(())
    }

    /// The entries that take part in block fill (extra rows are ignored).
    pub fn week_rows(&self) -> &[TimecardEntry] {
        &self.rows[..self.rows.len().min(DAYS_PER_WEEK)]
    }
}
