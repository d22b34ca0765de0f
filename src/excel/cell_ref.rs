//! A1-style cell addressing ("B5" = column B, row 5)

use std::fmt;

use super::package::PackageError;

/// Maximum worksheet extents (Excel 2007+).
const MAX_ROWS: u32 = 1_048_576;
const MAX_COLS: u32 = 16_384;

/// A zero-based cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse an A1 reference. `$` markers are accepted and ignored.
    pub fn from_a1(a1: &str) -> Result<Self, PackageError> {
        let invalid = || PackageError::InvalidCell(a1.to_string());
        let cleaned: String = a1.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = cleaned.split_at(split);
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            let value = (c.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
            col = col
                .checked_mul(26)
                .and_then(|v| v.checked_add(value))
                .ok_or_else(invalid)?;
        }
        let row: u32 = digits.parse().map_err(|_| invalid())?;

        if row == 0 || row > MAX_ROWS || col > MAX_COLS {
            return Err(invalid());
        }
        Ok(Self::new(row - 1, col - 1))
    }

    /// Render as A1 (no `$` markers).
    pub fn to_a1(&self) -> String {
        format!("{}{}", Self::column_index_to_letter(self.col), self.row + 1)
    }

    /// The cell `rows` below this one, same column.
    pub fn offset_rows(&self, rows: u32) -> Self {
        Self::new(self.row + rows, self.col)
    }

    /// Convert a zero-based column index to its letters
    ///
    /// Examples:
    /// - 0 → A
    /// - 25 → Z
    /// - 26 → AA
    pub fn column_index_to_letter(index: u32) -> String {
        let mut result = String::new();
        let mut idx = index;

        loop {
            let remainder = idx % 26;
            result.insert(0, (b'A' + remainder as u8) as char);
            if idx < 26 {
                break;
            }
            idx = idx / 26 - 1;
        }

        result
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}
