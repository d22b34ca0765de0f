//! Cell styles: deriving date formats from the template's own cell formats.
//!
//! A template cell usually already carries borders, fills and fonts through
//! its `s` (cell XF) index. Replacing that index with a fresh "date" style
//! would wipe the table borders, so each date style is derived from the cell's
//! existing XF instead: same font/fill/border, new number format + alignment.

use std::collections::HashMap;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use super::package::{local_name, PackageError};

/// A named formatting rule layered onto a template cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellStyle {
    pub name: &'static str,
    /// Built-in number format id (14 = locale short date)
    pub num_fmt_id: u32,
    pub horizontal: &'static str,
    pub vertical: &'static str,
}

/// Center-aligned short date.
pub const DATE_STYLE: CellStyle = CellStyle {
    name: "date",
    num_fmt_id: 14,
    horizontal: "center",
    vertical: "center",
};

type Attrs = Vec<(String, String)>;

#[derive(Debug, Clone, Default, PartialEq)]
struct XfRecord {
    attrs: Attrs,
    alignment: Option<Attrs>,
}

impl XfRecord {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn derive(&self, style: &CellStyle) -> XfRecord {
        let mut attrs = self.attrs.clone();
        set_attr(&mut attrs, "numFmtId", style.num_fmt_id.to_string());
        set_attr(&mut attrs, "applyNumberFormat", "1".to_string());
        set_attr(&mut attrs, "applyAlignment", "1".to_string());

        let mut alignment = self.alignment.clone().unwrap_or_default();
        set_attr(&mut alignment, "horizontal", style.horizontal.to_string());
        set_attr(&mut alignment, "vertical", style.vertical.to_string());

        XfRecord {
            attrs,
            alignment: Some(alignment),
        }
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), PackageError> {
        let mut xf = BytesStart::new("xf");
        for (k, v) in &self.attrs {
            xf.push_attribute((k.as_str(), v.as_str()));
        }
        match &self.alignment {
            Some(alignment) => {
                writer.write_event(Event::Start(xf))?;
                let mut align = BytesStart::new("alignment");
                for (k, v) in alignment {
                    align.push_attribute((k.as_str(), v.as_str()));
                }
                writer.write_event(Event::Empty(align))?;
                writer.write_event(Event::End(BytesEnd::new("xf")))?;
            }
            None => writer.write_event(Event::Empty(xf))?,
        }
        Ok(())
    }
}

fn set_attr(attrs: &mut Attrs, key: &str, value: String) {
    match attrs.iter_mut().find(|(k, _)| k == key) {
        Some((_, v)) => *v = value,
        None => attrs.push((key.to_string(), value)),
    }
}

/// The `cellXfs` table of `styles.xml`, plus any XFs derived while patching.
#[derive(Debug, Clone)]
pub struct StyleSheet {
    xfs: Vec<XfRecord>,
    base_len: usize,
    derived: HashMap<(u32, CellStyle), u32>,
}

impl StyleSheet {
    pub fn parse(xml: &[u8]) -> Result<Self, PackageError> {
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::new();
        let mut xfs = Vec::new();
        let mut in_cell_xfs = false;
        let mut open_xf: Option<XfRecord> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if local_name(e.name().as_ref()) == b"cellXfs" => in_cell_xfs = true,
                Event::End(e) if local_name(e.name().as_ref()) == b"cellXfs" => in_cell_xfs = false,
                Event::Start(e) if in_cell_xfs && local_name(e.name().as_ref()) == b"xf" => {
                    open_xf = Some(XfRecord {
                        attrs: collect_attrs(&e)?,
                        alignment: None,
                    });
                }
                Event::Empty(e) if in_cell_xfs && local_name(e.name().as_ref()) == b"xf" => {
                    xfs.push(XfRecord {
                        attrs: collect_attrs(&e)?,
                        alignment: None,
                    });
                }
                Event::Start(e) | Event::Empty(e)
                    if local_name(e.name().as_ref()) == b"alignment" =>
                {
                    if let Some(xf) = open_xf.as_mut() {
                        xf.alignment = Some(collect_attrs(&e)?);
                    }
                }
                Event::End(e) if in_cell_xfs && local_name(e.name().as_ref()) == b"xf" => {
                    if let Some(xf) = open_xf.take() {
                        xfs.push(xf);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if xfs.is_empty() {
            return Err(PackageError::Invalid("styles.xml has no cellXfs".to_string()));
        }

        Ok(Self {
            base_len: xfs.len(),
            xfs,
            derived: HashMap::new(),
        })
    }

    /// Number of cell XFs (template + derived).
    pub fn len(&self) -> usize {
        self.xfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xfs.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.xfs.len() > self.base_len
    }

    /// Number format id of an XF, if the XF exists.
    pub fn num_fmt_id(&self, xf_index: u32) -> Option<u32> {
        self.xfs
            .get(xf_index as usize)
            .and_then(|xf| xf.attr("numFmtId"))
            .and_then(|v| v.parse().ok())
    }

    /// Border id of an XF, if the XF exists.
    pub fn border_id(&self, xf_index: u32) -> Option<u32> {
        self.xfs
            .get(xf_index as usize)
            .and_then(|xf| xf.attr("borderId"))
            .and_then(|v| v.parse().ok())
    }

    /// XF index for `style` layered over `base` (deduplicated).
    pub fn derive(&mut self, base: u32, style: &CellStyle) -> u32 {
        if let Some(idx) = self.derived.get(&(base, *style)) {
            return *idx;
        }
        let base_xf = self
            .xfs
            .get(base as usize)
            .or_else(|| self.xfs.first())
            .cloned()
            .unwrap_or_default();
        let idx = self.xfs.len() as u32;
        self.xfs.push(base_xf.derive(style));
        self.derived.insert((base, *style), idx);
        debug!(style = style.name, base, xf = idx, "Derived cell style");
        idx
    }

    /// Name of the style an XF was derived with; `None` for template XFs.
    pub fn derived_style(&self, xf_index: u32) -> Option<&'static str> {
        self.derived
            .iter()
            .find(|(_, idx)| **idx == xf_index)
            .map(|((_, style), _)| style.name)
    }

    /// Rewrite `styles.xml`, appending derived XFs to `cellXfs`.
    pub fn write_into(&self, original: &[u8]) -> Result<Vec<u8>, PackageError> {
        let mut reader = Reader::from_reader(original);
        let mut writer = Writer::new(Vec::with_capacity(original.len() + 256));
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if local_name(e.name().as_ref()) == b"cellXfs" => {
                    let mut start = BytesStart::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                    for (k, v) in collect_attrs(&e)? {
                        if k == "count" {
                            continue;
                        }
                        start.push_attribute((k.as_str(), v.as_str()));
                    }
                    start.push_attribute(("count", self.xfs.len().to_string().as_str()));
                    writer.write_event(Event::Start(start))?;
                }
                Event::End(e) if local_name(e.name().as_ref()) == b"cellXfs" => {
                    for xf in &self.xfs[self.base_len..] {
                        xf.write(&mut writer)?;
                    }
                    writer.write_event(Event::End(e.into_owned()))?;
                }
                Event::Eof => break,
                ev => writer.write_event(ev.into_owned())?,
            }
            buf.clear();
        }

        Ok(writer.into_inner())
    }
}

fn collect_attrs(e: &BytesStart<'_>) -> Result<Attrs, PackageError> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="2" borderId="1" xfId="0" applyBorder="1"/><xf numFmtId="0" fontId="0" fillId="0" borderId="1" xfId="0" applyAlignment="1"><alignment wrapText="1"/></xf></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

    #[test]
    fn test_parse_only_cell_xfs() {
        let sheet = StyleSheet::parse(STYLES_XML.as_bytes()).unwrap();
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.border_id(1), Some(1));
        assert!(!sheet.is_dirty());
    }

    #[test]
    fn test_derive_keeps_border_fill_font() {
        let mut sheet = StyleSheet::parse(STYLES_XML.as_bytes()).unwrap();
        let idx = sheet.derive(1, &DATE_STYLE);

        assert_eq!(idx, 3);
        assert_eq!(sheet.num_fmt_id(idx), Some(14));
        assert_eq!(sheet.border_id(idx), Some(1));
        let xf = &sheet.xfs[idx as usize];
        assert_eq!(xf.attr("fillId"), Some("2"));
        assert_eq!(xf.attr("fontId"), Some("1"));
        assert_eq!(xf.attr("applyNumberFormat"), Some("1"));
    }

    #[test]
    fn test_derive_is_deduplicated_per_base() {
        let mut sheet = StyleSheet::parse(STYLES_XML.as_bytes()).unwrap();
        let a = sheet.derive(1, &DATE_STYLE);
        let b = sheet.derive(1, &DATE_STYLE);
        let c = sheet.derive(0, &DATE_STYLE);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(sheet.len(), 5);
    }

    #[test]
    fn test_derived_xfs_remember_style_name() {
        let mut sheet = StyleSheet::parse(STYLES_XML.as_bytes()).unwrap();
        let idx = sheet.derive(1, &DATE_STYLE);
        assert_eq!(sheet.derived_style(idx), Some("date"));
        assert_eq!(sheet.derived_style(1), None);
        assert_eq!(sheet.derived_style(99), None);
    }

    #[test]
    fn test_derive_merges_existing_alignment() {
        let mut sheet = StyleSheet::parse(STYLES_XML.as_bytes()).unwrap();
        let idx = sheet.derive(2, &DATE_STYLE);
        let alignment = sheet.xfs[idx as usize].alignment.clone().unwrap();
        assert_eq!(
            alignment,
            vec![
                ("wrapText".to_string(), "1".to_string()),
                ("horizontal".to_string(), "center".to_string()),
                ("vertical".to_string(), "center".to_string()),
            ]
        );
    }

    #[test]
    fn test_derive_from_unknown_base_uses_default_xf() {
        let mut sheet = StyleSheet::parse(STYLES_XML.as_bytes()).unwrap();
        let idx = sheet.derive(99, &DATE_STYLE);
        assert_eq!(sheet.border_id(idx), Some(0));
        assert_eq!(sheet.num_fmt_id(idx), Some(14));
    }

    #[test]
    fn test_write_into_appends_and_recounts() {
        let mut sheet = StyleSheet::parse(STYLES_XML.as_bytes()).unwrap();
        sheet.derive(1, &DATE_STYLE);
        let xml = String::from_utf8(sheet.write_into(STYLES_XML.as_bytes()).unwrap()).unwrap();

        assert!(xml.contains(r#"<cellXfs count="4">"#));
        assert!(xml.contains(r#"<cellStyleXfs count="1">"#));
        assert!(xml.contains(
            r#"<xf numFmtId="14" fontId="1" fillId="2" borderId="1" xfId="0" applyBorder="1" applyNumberFormat="1" applyAlignment="1"><alignment horizontal="center" vertical="center"/></xf></cellXfs>"#
        ));

        let reparsed = StyleSheet::parse(xml.as_bytes()).unwrap();
        assert_eq!(reparsed.len(), 4);
        assert_eq!(reparsed.num_fmt_id(3), Some(14));
    }

    #[test]
    fn test_parse_rejects_missing_cell_xfs() {
        let err = StyleSheet::parse(b"<styleSheet/>").unwrap_err();
        assert!(matches!(err, PackageError::Invalid(_)));
    }
}
