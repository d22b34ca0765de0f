//! In-memory OOXML package: every zip entry of an .xlsx, keyed by part name.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use quick_xml::events::attributes::AttrError;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const WORKBOOK_PART: &str = "xl/workbook.xml";
pub const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
pub const STYLES_PART: &str = "xl/styles.xml";

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("xml attribute error: {0}")]
    Attr(#[from] AttrError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing part: {0}")]
    MissingPart(String),

    #[error("unknown sheet: {0}")]
    UnknownSheet(String),

    #[error("invalid cell reference: {0:?}")]
    InvalidCell(String),

    #[error("invalid package: {0}")]
    Invalid(String),
}

/// A worksheet tab and the package part holding its XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInfo {
    pub name: String,
    pub rel_id: String,
    pub part: String,
}

#[derive(Debug, Clone, Default)]
pub struct XlsxPackage {
    parts: BTreeMap<String, Vec<u8>>,
}

impl XlsxPackage {
    /// Inflate every file entry of an .xlsx into memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PackageError> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;

        let mut parts = BTreeMap::new();
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if !file.is_file() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)?;
            parts.insert(name, buf);
        }

        if !parts.contains_key(WORKBOOK_PART) {
            return Err(PackageError::MissingPart(WORKBOOK_PART.to_string()));
        }
        Ok(Self { parts })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .get(name.trim_start_matches('/'))
            .map(Vec::as_slice)
    }

    pub fn set_part(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.parts.insert(name.into(), bytes);
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// Worksheet tabs in workbook order, with their resolved part names.
    pub fn sheets(&self) -> Result<Vec<SheetInfo>, PackageError> {
        let workbook = self
            .part(WORKBOOK_PART)
            .ok_or_else(|| PackageError::MissingPart(WORKBOOK_PART.to_string()))?;
        let rels = self
            .part(WORKBOOK_RELS_PART)
            .ok_or_else(|| PackageError::MissingPart(WORKBOOK_RELS_PART.to_string()))?;

        let targets = parse_relationship_targets(rels)?;
        let mut sheets = Vec::new();
        for (name, rel_id) in parse_workbook_sheets(workbook)? {
            let target = targets
                .get(&rel_id)
                .ok_or_else(|| PackageError::Invalid(format!("no relationship {rel_id} for sheet {name}")))?;
            sheets.push(SheetInfo {
                name,
                rel_id,
                part: resolve_target("xl", target),
            });
        }
        Ok(sheets)
    }

    /// Part name of the worksheet shown as `sheet_name`.
    pub fn worksheet_part(&self, sheet_name: &str) -> Result<String, PackageError> {
        self.sheets()?
            .into_iter()
            .find(|s| s.name == sheet_name)
            .map(|s| s.part)
            .ok_or_else(|| PackageError::UnknownSheet(sheet_name.to_string()))
    }

    /// Re-zip every part (deflate).
    pub fn write_to_bytes(&self) -> Result<Vec<u8>, PackageError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        // `[Content_Types].xml` sorts first in the BTreeMap, which is where
        // some consumers expect it.
        for (name, bytes) in &self.parts {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes)?;
        }
        Ok(zip.finish()?.into_inner())
    }
}

/// `(name, r:id)` for each `<sheet>` in workbook.xml.
fn parse_workbook_sheets(xml: &[u8]) -> Result<Vec<(String, String)>, PackageError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"sheet" => {
                let mut name = None;
                let mut rel_id = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    let key = attr.key.as_ref();
                    if key == b"name" {
                        name = Some(attr.unescape_value()?.into_owned());
                    } else if local_name(key) == b"id" {
                        rel_id = Some(attr.unescape_value()?.into_owned());
                    }
                }
                if let (Some(name), Some(rel_id)) = (name, rel_id) {
                    sheets.push((name, rel_id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// `Id -> Target` for each `<Relationship>` in a .rels part.
fn parse_relationship_targets(xml: &[u8]) -> Result<BTreeMap<String, String>, PackageError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut targets = BTreeMap::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e)
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"Id" => id = Some(attr.unescape_value()?.into_owned()),
                        b"Target" => target = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(targets)
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Week 1" sheetId="1" r:id="rId1"/>
    <sheet name="Week &amp; More" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;

    const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;

    fn package() -> XlsxPackage {
        let mut pkg = XlsxPackage::default();
        pkg.set_part(WORKBOOK_PART, WORKBOOK_XML.as_bytes().to_vec());
        pkg.set_part(WORKBOOK_RELS_PART, RELS_XML.as_bytes().to_vec());
        pkg.set_part("xl/worksheets/sheet1.xml", b"<worksheet/>".to_vec());
        pkg
    }

    #[test]
    fn test_sheets_resolve_relative_and_absolute_targets() {
        let sheets = package().sheets().unwrap();
        assert_eq!(
            sheets,
            vec![
                SheetInfo {
                    name: "Week 1".to_string(),
                    rel_id: "rId1".to_string(),
                    part: "xl/worksheets/sheet1.xml".to_string(),
                },
                SheetInfo {
                    name: "Week & More".to_string(),
                    rel_id: "rId2".to_string(),
                    part: "xl/worksheets/sheet2.xml".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_worksheet_part_unknown_sheet() {
        let err = package().worksheet_part("Week 9").unwrap_err();
        assert!(matches!(err, PackageError::UnknownSheet(name) if name == "Week 9"));
    }

    #[test]
    fn test_zip_round_trip_keeps_parts() {
        let pkg = package();
        let bytes = pkg.write_to_bytes().unwrap();
        let reopened = XlsxPackage::from_bytes(&bytes).unwrap();

        assert_eq!(
            reopened.part_names().collect::<Vec<_>>(),
            pkg.part_names().collect::<Vec<_>>()
        );
        assert_eq!(reopened.part("xl/worksheets/sheet1.xml"), Some(&b"<worksheet/>"[..]));
        assert_eq!(reopened.part("/xl/workbook.xml"), Some(WORKBOOK_XML.as_bytes()));
    }

    #[test]
    fn test_from_bytes_rejects_non_zip() {
        assert!(matches!(
            XlsxPackage::from_bytes(b"definitely not a zip"),
            Err(PackageError::Zip(_))
        ));
    }

    #[test]
    fn test_from_bytes_requires_workbook() {
        let mut pkg = XlsxPackage::default();
        pkg.set_part("docProps/app.xml", b"<Properties/>".to_vec());
        let bytes = pkg.write_to_bytes().unwrap();
        assert!(matches!(
            XlsxPackage::from_bytes(&bytes),
            Err(PackageError::MissingPart(part)) if part == WORKBOOK_PART
        ));
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("xl", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl", "./worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl/worksheets", "../styles.xml"), "xl/styles.xml");
        assert_eq!(resolve_target("xl", "/xl/worksheets/sheet3.xml"), "xl/worksheets/sheet3.xml");
    }
}
