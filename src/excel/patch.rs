//! Cell patches applied to worksheet XML in place.
//!
//! Only patched rows and cells are rewritten; every other byte of the
//! worksheet (merged ranges, column widths, print setup, formulas elsewhere)
//! streams through untouched. Row and cell order stay row-major as the
//! format requires.

use std::collections::BTreeMap;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::cell_ref::CellRef;
use super::package::{local_name, PackageError, XlsxPackage, STYLES_PART};
use super::styles::{CellStyle, StyleSheet};

/// A value written into a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

/// A single cell edit: a new value and, optionally, a style layered over the
/// cell's template style.
#[derive(Debug, Clone, PartialEq)]
pub struct CellPatch {
    pub value: CellValue,
    pub style: Option<CellStyle>,
}

impl CellPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            value: CellValue::Text(text.into()),
            style: None,
        }
    }

    pub fn number(n: f64) -> Self {
        Self {
            value: CellValue::Number(n),
            style: None,
        }
    }

    pub fn with_style(mut self, style: CellStyle) -> Self {
        self.style = Some(style);
        self
    }
}

/// Pending edits for a whole workbook, keyed by sheet (tab) name.
#[derive(Debug, Clone, Default)]
pub struct WorkbookCellPatches {
    sheets: BTreeMap<String, WorksheetCellPatches>,
}

impl WorkbookCellPatches {
    pub fn is_empty(&self) -> bool {
        self.sheets.values().all(WorksheetCellPatches::is_empty)
    }

    /// Insert/replace the patch for one cell.
    pub fn set_cell(&mut self, sheet_name: &str, cell: CellRef, patch: CellPatch) {
        self.sheets
            .entry(sheet_name.to_string())
            .or_default()
            .cells
            .insert((cell.row, cell.col), patch);
    }

    pub fn get(&self, sheet_name: &str, cell: CellRef) -> Option<&CellPatch> {
        self.sheets
            .get(sheet_name)
            .and_then(|s| s.cells.get(&(cell.row, cell.col)))
    }

    fn needs_styles(&self) -> bool {
        self.sheets
            .values()
            .flat_map(|s| s.cells.values())
            .any(|p| p.style.is_some())
    }
}

#[derive(Debug, Clone, Default)]
struct WorksheetCellPatches {
    // row-major (row, col), zero-based
    cells: BTreeMap<(u32, u32), CellPatch>,
}

impl WorksheetCellPatches {
    fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// One-based row number -> [(zero-based col, patch)], columns ascending.
    fn by_row(&self) -> BTreeMap<u32, Vec<(u32, &CellPatch)>> {
        let mut out: BTreeMap<u32, Vec<(u32, &CellPatch)>> = BTreeMap::new();
        for (&(row0, col0), patch) in &self.cells {
            out.entry(row0 + 1).or_default().push((col0, patch));
        }
        out
    }
}

/// Apply every pending patch to the package's worksheet (and styles) parts.
pub fn apply_cell_patches(
    pkg: &mut XlsxPackage,
    patches: &WorkbookCellPatches,
) -> Result<(), PackageError> {
    if patches.is_empty() {
        return Ok(());
    }

    let mut styles = if patches.needs_styles() {
        let xml = pkg
            .part(STYLES_PART)
            .ok_or_else(|| PackageError::MissingPart(STYLES_PART.to_string()))?;
        Some(StyleSheet::parse(xml)?)
    } else {
        None
    };

    for (sheet_name, sheet_patches) in &patches.sheets {
        if sheet_patches.is_empty() {
            continue;
        }
        let part = pkg.worksheet_part(sheet_name)?;
        let original = pkg
            .part(&part)
            .ok_or_else(|| PackageError::MissingPart(part.clone()))?;

        let mut emitter = CellEmitter {
            styles: styles.as_mut(),
        };
        let updated = patch_worksheet_xml(original, sheet_patches, &mut emitter)?;
        pkg.set_part(part, updated);
    }

    if let Some(styles) = styles.filter(StyleSheet::is_dirty) {
        let original = pkg
            .part(STYLES_PART)
            .ok_or_else(|| PackageError::MissingPart(STYLES_PART.to_string()))?;
        let updated = styles.write_into(original)?;
        pkg.set_part(STYLES_PART, updated);
    }

    Ok(())
}

/// Row patches in ascending row order with a cursor over the ones not yet written.
struct PendingRows<'p> {
    by_row: BTreeMap<u32, Vec<(u32, &'p CellPatch)>>,
    order: Vec<u32>,
    next: usize,
}

impl<'p> PendingRows<'p> {
    fn new(patches: &'p WorksheetCellPatches) -> Self {
        let by_row = patches.by_row();
        let order = by_row.keys().copied().collect();
        Self {
            by_row,
            order,
            next: 0,
        }
    }

    /// Write brand-new rows for every pending row number below `limit`.
    fn flush_before(
        &mut self,
        limit: Option<u32>,
        writer: &mut Writer<Vec<u8>>,
        emitter: &mut CellEmitter<'_>,
    ) -> Result<(), PackageError> {
        while let Some(&row) = self.order.get(self.next) {
            if limit.is_some_and(|limit| row >= limit) {
                break;
            }
            let mut start = BytesStart::new("row");
            start.push_attribute(("r", row.to_string().as_str()));
            writer.write_event(Event::Start(start))?;
            for (col, patch) in &self.by_row[&row] {
                emitter.write(writer, row, *col, patch, None)?;
            }
            writer.write_event(Event::End(BytesEnd::new("row")))?;
            self.next += 1;
        }
        Ok(())
    }

    /// Claim the patches for an existing row, if it has any.
    fn take(&mut self, row: u32) -> Option<Vec<(u32, &'p CellPatch)>> {
        if self.order.get(self.next) == Some(&row) {
            self.next += 1;
            self.by_row.get(&row).cloned()
        } else {
            None
        }
    }
}

fn patch_worksheet_xml(
    original: &[u8],
    patches: &WorksheetCellPatches,
    emitter: &mut CellEmitter<'_>,
) -> Result<Vec<u8>, PackageError> {
    let mut pending = PendingRows::new(patches);

    let mut reader = Reader::from_reader(original);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(
        original.len() + patches.cells.len() * 64,
    ));

    let mut buf = Vec::new();
    let mut saw_sheet_data = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                saw_sheet_data = true;
                writer.write_event(Event::Start(e.into_owned()))?;
                patch_sheet_data(&mut reader, &mut writer, &mut pending, emitter)?;
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                saw_sheet_data = true;
                // `<sheetData/>` becomes `<sheetData>...</sheetData>`
                writer.write_event(Event::Start(e.into_owned()))?;
                pending.flush_before(None, &mut writer, emitter)?;
                writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
            }
            Event::Eof => break,
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }

    if !saw_sheet_data {
        return Err(PackageError::Invalid(
            "worksheet has no sheetData".to_string(),
        ));
    }
    Ok(writer.into_inner())
}

fn patch_sheet_data<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    writer: &mut Writer<Vec<u8>>,
    pending: &mut PendingRows<'_>,
    emitter: &mut CellEmitter<'_>,
) -> Result<(), PackageError> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"row" => {
                let row_start = e.into_owned();
                match parse_row_number(&row_start)? {
                    Some(row_num) => {
                        pending.flush_before(Some(row_num), writer, emitter)?;
                        writer.write_event(Event::Start(row_start))?;
                        if let Some(cells) = pending.take(row_num) {
                            // patch_row consumes through </row>
                            patch_row(reader, writer, row_num, &cells, emitter)?;
                        }
                    }
                    None => writer.write_event(Event::Start(row_start))?,
                }
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"row" => {
                let row_empty = e.into_owned();
                match parse_row_number(&row_empty)? {
                    Some(row_num) => {
                        pending.flush_before(Some(row_num), writer, emitter)?;
                        match pending.take(row_num) {
                            Some(cells) => {
                                writer.write_event(Event::Start(row_empty))?;
                                for (col, patch) in &cells {
                                    emitter.write(writer, row_num, *col, patch, None)?;
                                }
                                writer.write_event(Event::End(BytesEnd::new("row")))?;
                            }
                            None => writer.write_event(Event::Empty(row_empty))?,
                        }
                    }
                    None => writer.write_event(Event::Empty(row_empty))?,
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                pending.flush_before(None, writer, emitter)?;
                writer.write_event(Event::End(e.into_owned()))?;
                break;
            }
            Event::Eof => {
                return Err(PackageError::Invalid(
                    "unexpected EOF while patching sheetData".to_string(),
                ))
            }
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }

    Ok(())
}

fn patch_row<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    writer: &mut Writer<Vec<u8>>,
    row_num: u32,
    patches: &[(u32, &CellPatch)],
    emitter: &mut CellEmitter<'_>,
) -> Result<(), PackageError> {
    let mut buf = Vec::new();
    let mut next = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"c" => {
                let cell_start = e.into_owned();
                match parse_cell_attrs(&cell_start, row_num)? {
                    Some((col, existing_s)) => {
                        while next < patches.len() && patches[next].0 < col {
                            emitter.write(writer, row_num, patches[next].0, patches[next].1, None)?;
                            next += 1;
                        }
                        if next < patches.len() && patches[next].0 == col {
                            skip_cell_body(reader)?;
                            emitter.write(writer, row_num, col, patches[next].1, existing_s)?;
                            next += 1;
                        } else {
                            writer.write_event(Event::Start(cell_start))?;
                        }
                    }
                    None => writer.write_event(Event::Start(cell_start))?,
                }
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"c" => {
                let cell_empty = e.into_owned();
                match parse_cell_attrs(&cell_empty, row_num)? {
                    Some((col, existing_s)) => {
                        while next < patches.len() && patches[next].0 < col {
                            emitter.write(writer, row_num, patches[next].0, patches[next].1, None)?;
                            next += 1;
                        }
                        if next < patches.len() && patches[next].0 == col {
                            emitter.write(writer, row_num, col, patches[next].1, existing_s)?;
                            next += 1;
                        } else {
                            writer.write_event(Event::Empty(cell_empty))?;
                        }
                    }
                    None => writer.write_event(Event::Empty(cell_empty))?,
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"row" => {
                for (col, patch) in &patches[next..] {
                    emitter.write(writer, row_num, *col, patch, None)?;
                }
                writer.write_event(Event::End(e.into_owned()))?;
                break;
            }
            Event::Eof => {
                return Err(PackageError::Invalid(
                    "unexpected EOF while patching row".to_string(),
                ))
            }
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }

    Ok(())
}

/// Consume a replaced cell's children up to and including its `</c>`.
fn skip_cell_body<R: std::io::BufRead>(reader: &mut Reader<R>) -> Result<(), PackageError> {
    let mut buf = Vec::new();
    let mut depth = 1usize;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(PackageError::Invalid(
                    "unexpected EOF inside cell".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
}

fn parse_row_number(row: &BytesStart<'_>) -> Result<Option<u32>, PackageError> {
    for attr in row.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"r" {
            return Ok(attr.unescape_value()?.parse::<u32>().ok());
        }
    }
    Ok(None)
}

/// `(col, s)` of a `<c>` that belongs to `row_num`; `None` leaves the cell untouched.
fn parse_cell_attrs(
    cell: &BytesStart<'_>,
    row_num: u32,
) -> Result<Option<(u32, Option<u32>)>, PackageError> {
    let mut r = None;
    let mut s = None;
    for attr in cell.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"r" => r = Some(attr.unescape_value()?.into_owned()),
            b"s" => s = attr.unescape_value()?.parse::<u32>().ok(),
            _ => {}
        }
    }
    let Some(cell_ref) = r.and_then(|r| CellRef::from_a1(&r).ok()) else {
        return Ok(None);
    };
    if cell_ref.row + 1 != row_num {
        return Ok(None);
    }
    Ok(Some((cell_ref.col, s)))
}

/// Serializes patched cells, resolving styles against the workbook's XF table.
struct CellEmitter<'s> {
    styles: Option<&'s mut StyleSheet>,
}

impl CellEmitter<'_> {
    fn write(
        &mut self,
        writer: &mut Writer<Vec<u8>>,
        row_num: u32,
        col: u32,
        patch: &CellPatch,
        existing_s: Option<u32>,
    ) -> Result<(), PackageError> {
        let a1 = CellRef::new(row_num - 1, col).to_a1();

        let style_index = match &patch.style {
            Some(style) => {
                let styles = self
                    .styles
                    .as_deref_mut()
                    .ok_or_else(|| PackageError::MissingPart(STYLES_PART.to_string()))?;
                Some(styles.derive(existing_s.unwrap_or(0), style))
            }
            None => existing_s,
        };

        let mut cell = BytesStart::new("c");
        cell.push_attribute(("r", a1.as_str()));
        if let Some(s) = style_index.filter(|s| *s != 0) {
            cell.push_attribute(("s", s.to_string().as_str()));
        }

        match &patch.value {
            CellValue::Number(n) => {
                if !n.is_finite() {
                    return Err(PackageError::Invalid(format!("non-finite number for {a1}")));
                }
                writer.write_event(Event::Start(cell))?;
                writer.write_event(Event::Start(BytesStart::new("v")))?;
                writer.write_event(Event::Text(BytesText::new(&n.to_string())))?;
                writer.write_event(Event::End(BytesEnd::new("v")))?;
            }
            CellValue::Text(text) => {
                cell.push_attribute(("t", "inlineStr"));
                writer.write_event(Event::Start(cell))?;
                writer.write_event(Event::Start(BytesStart::new("is")))?;
                let mut t = BytesStart::new("t");
                if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
                    t.push_attribute(("xml:space", "preserve"));
                }
                writer.write_event(Event::Start(t))?;
                writer.write_event(Event::Text(BytesText::new(text)))?;
                writer.write_event(Event::End(BytesEnd::new("t")))?;
                writer.write_event(Event::End(BytesEnd::new("is")))?;
            }
        }
        writer.write_event(Event::End(BytesEnd::new("c")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::styles::DATE_STYLE;
    use pretty_assertions::assert_eq;

    const STYLES_XML: &str = r#"<styleSheet><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="0" fillId="0" borderId="1" xfId="0" applyBorder="1"/></cellXfs></styleSheet>"#;

    fn patch_xml(xml: &str, cells: &[(&str, CellPatch)]) -> String {
        let mut patches = WorksheetCellPatches::default();
        for (a1, patch) in cells {
            let cell = CellRef::from_a1(a1).unwrap();
            patches.cells.insert((cell.row, cell.col), patch.clone());
        }
        let mut styles = StyleSheet::parse(STYLES_XML.as_bytes()).unwrap();
        let mut emitter = CellEmitter {
            styles: Some(&mut styles),
        };
        String::from_utf8(patch_worksheet_xml(xml.as_bytes(), &patches, &mut emitter).unwrap())
            .unwrap()
    }

    #[test]
    fn test_replace_existing_styled_blank_cell() {
        let xml = r#"<worksheet><sheetData><row r="5"><c r="A5" t="s"><v>0</v></c><c r="B5" s="1"/></row></sheetData></worksheet>"#;
        let out = patch_xml(xml, &[("B5", CellPatch::number(45292.0).with_style(DATE_STYLE))]);
        assert_eq!(
            out,
            r#"<worksheet><sheetData><row r="5"><c r="A5" t="s"><v>0</v></c><c r="B5" s="2"><v>45292</v></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn test_replace_cell_with_value_keeps_style() {
        let xml = r#"<worksheet><sheetData><row r="2"><c r="M2" s="1" t="s"><v>3</v></c></row></sheetData></worksheet>"#;
        let out = patch_xml(xml, &[("M2", CellPatch::text("Dana & Co"))]);
        assert_eq!(
            out,
            r#"<worksheet><sheetData><row r="2"><c r="M2" s="1" t="inlineStr"><is><t>Dana &amp; Co</t></is></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn test_insert_cells_and_rows_in_order() {
        let xml = r#"<worksheet><sheetData><row r="2"><c r="B2"><v>1</v></c></row><row r="9"/></sheetData></worksheet>"#;
        let out = patch_xml(
            xml,
            &[
                ("A2", CellPatch::number(1.0)),
                ("C2", CellPatch::number(3.0)),
                ("B5", CellPatch::number(5.0)),
                ("A9", CellPatch::number(9.0)),
                ("A12", CellPatch::number(12.0)),
            ],
        );
        assert_eq!(
            out,
            concat!(
                r#"<worksheet><sheetData>"#,
                r#"<row r="2"><c r="A2"><v>1</v></c><c r="B2"><v>1</v></c><c r="C2"><v>3</v></c></row>"#,
                r#"<row r="5"><c r="B5"><v>5</v></c></row>"#,
                r#"<row r="9"><c r="A9"><v>9</v></c></row>"#,
                r#"<row r="12"><c r="A12"><v>12</v></c></row>"#,
                r#"</sheetData></worksheet>"#
            )
        );
    }

    #[test]
    fn test_empty_sheet_data_expanded() {
        let xml = r#"<worksheet><sheetData/></worksheet>"#;
        let out = patch_xml(xml, &[("B4", CellPatch::text(" padded "))]);
        assert_eq!(
            out,
            r#"<worksheet><sheetData><row r="4"><c r="B4" t="inlineStr"><is><t xml:space="preserve"> padded </t></is></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn test_replaced_formula_cell_loses_formula() {
        let xml = r#"<worksheet><sheetData><row r="12"><c r="D12" s="1"><f>SUM(D5:D11)</f><v>40</v></c></row></sheetData></worksheet>"#;
        let out = patch_xml(xml, &[("D12", CellPatch::number(42.5))]);
        assert_eq!(
            out,
            r#"<worksheet><sheetData><row r="12"><c r="D12" s="1"><v>42.5</v></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn test_unpatched_content_is_untouched() {
        let xml = r#"<worksheet><dimension ref="A1:M23"/><sheetData><row r="1" spans="1:13"><c r="A1" t="s"><v>0</v></c></row></sheetData><mergeCells count="1"><mergeCell ref="A1:D1"/></mergeCells></worksheet>"#;
        let out = patch_xml(xml, &[("A3", CellPatch::number(1.0))]);
        assert!(out.starts_with(
            r#"<worksheet><dimension ref="A1:M23"/><sheetData><row r="1" spans="1:13"><c r="A1" t="s"><v>0</v></c></row><row r="3">"#
        ));
        assert!(out.ends_with(r#"</sheetData><mergeCells count="1"><mergeCell ref="A1:D1"/></mergeCells></worksheet>"#));
    }

    #[test]
    fn test_missing_sheet_data_is_an_error() {
        let mut patches = WorksheetCellPatches::default();
        patches.cells.insert((0, 0), CellPatch::number(1.0));
        let mut emitter = CellEmitter { styles: None };
        let err = patch_worksheet_xml(b"<worksheet/>", &patches, &mut emitter).unwrap_err();
        assert!(matches!(err, PackageError::Invalid(_)));
    }

    #[test]
    fn test_non_finite_number_rejected() {
        let mut patches = WorksheetCellPatches::default();
        patches.cells.insert((0, 0), CellPatch::number(f64::NAN));
        let mut emitter = CellEmitter { styles: None };
        let err = patch_worksheet_xml(b"<worksheet><sheetData/></worksheet>", &patches, &mut emitter)
            .unwrap_err();
        assert!(matches!(err, PackageError::Invalid(_)));
    }

    #[test]
    fn test_workbook_patches_bookkeeping() {
        let mut patches = WorkbookCellPatches::default();
        assert!(patches.is_empty());
        assert!(!patches.needs_styles());

        let b5 = CellRef::from_a1("B5").unwrap();
        patches.set_cell("Week 1", b5, CellPatch::text("x"));
        patches.set_cell("Week 1", b5, CellPatch::number(1.0).with_style(DATE_STYLE));

        assert!(!patches.is_empty());
        assert!(patches.needs_styles());
        assert_eq!(
            patches.get("Week 1", b5),
            Some(&CellPatch::number(1.0).with_style(DATE_STYLE))
        );
        assert_eq!(patches.get("Week 2", b5), None);
    }
}
