// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Word-processing decoder — WordprocessingML (docx) and OpenDocument Text
// (odt) bodies streamed with `quick-xml` into simple HTML.
//
// Only the reading order survives: paragraphs, headings, list items, line
// breaks, and tables. Styling, images, and fields are dropped.

use blattwerk_core::error::{BlattwerkError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, info, instrument};

use super::escape_markup;
use crate::archive::ZipContainer;
use crate::capability::WordProcessingDecoder;

const DOCX_BODY: &str = "word/document.xml";
const ODT_BODY: &str = "content.xml";

/// Built-in decoder for docx and odt containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfficeXmlDecoder;

impl WordProcessingDecoder for OfficeXmlDecoder {
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    fn to_html(&self, bytes: &[u8]) -> Result<String> {
        let mut container = ZipContainer::open(bytes)?;

        let html = if container.contains(DOCX_BODY) {
            debug!("Decoding WordprocessingML body");
            docx_to_html(&read_entry(&mut container, DOCX_BODY)?)?
        } else if container.contains(ODT_BODY) {
            debug!("Decoding OpenDocument text body");
            odt_to_html(&read_entry(&mut container, ODT_BODY)?)?
        } else {
            return Err(BlattwerkError::DecodeError(format!(
                "container has neither {DOCX_BODY} nor {ODT_BODY}"
            )));
        };

        info!(html_len = html.len(), "Word-processing document decoded");
        Ok(html)
    }
}

fn read_entry(container: &mut ZipContainer, name: &str) -> Result<String> {
    container
        .read_text(name)?
        .ok_or_else(|| BlattwerkError::DecodeError(format!("{name} is missing")))
}

// -- WordprocessingML ---------------------------------------------------------

fn docx_to_html(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut buf = Vec::new();
    let mut html = HtmlBuilder::default();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => html.start_paragraph(),
                b"t" => in_text = true,
                b"numPr" => html.mark_list_item(),
                b"pStyle" => html.set_heading(docx_heading_level(&e)?),
                b"tbl" => html.start_table(),
                b"tr" => html.start_row(),
                b"tc" => html.start_cell(),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"pStyle" => html.set_heading(docx_heading_level(&e)?),
                b"numPr" => html.mark_list_item(),
                b"tab" => html.push_text("\t"),
                b"br" | b"cr" => html.push_text("\n"),
                _ => {}
            },
            Event::Text(t) if in_text => {
                html.push_text(&t.unescape().map_err(xml_error)?);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"p" => html.end_paragraph(),
                b"t" => in_text = false,
                b"tc" => html.end_cell(),
                b"tr" => html.end_row(),
                b"tbl" => html.end_table(),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(html.finish())
}

/// `Heading1`..`Heading6` and `Title` styles map to heading levels.
fn docx_heading_level(element: &BytesStart<'_>) -> Result<Option<u8>> {
    let Some(style) = attribute(element, b"val")? else {
        return Ok(None);
    };
    let style = style.to_ascii_lowercase();
    if style == "title" {
        return Ok(Some(1));
    }
    if style == "subtitle" {
        return Ok(Some(2));
    }
    Ok(style
        .strip_prefix("heading")
        .and_then(|level| level.trim().parse::<u8>().ok()))
}

// -- OpenDocument text ----------------------------------------------------------

fn odt_to_html(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut buf = Vec::new();
    let mut html = HtmlBuilder::default();
    let mut list_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => {
                    html.start_paragraph();
                    if list_depth > 0 {
                        html.mark_list_item();
                    }
                }
                b"h" => {
                    html.start_paragraph();
                    html.set_heading(Some(odt_outline_level(&e)?));
                }
                b"list-item" => list_depth += 1,
                b"table" => html.start_table(),
                b"table-row" => html.start_row(),
                b"table-cell" => html.start_cell(),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"s" => {
                    let count = attribute(&e, b"c")?
                        .and_then(|c| c.parse::<usize>().ok())
                        .unwrap_or(1);
                    html.push_text(&" ".repeat(count));
                }
                b"tab" => html.push_text("\t"),
                b"line-break" => html.push_text("\n"),
                b"table-cell" => {
                    html.start_cell();
                    html.end_cell();
                }
                _ => {}
            },
            Event::Text(t) => {
                html.push_text(&t.unescape().map_err(xml_error)?);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"p" | b"h" => html.end_paragraph(),
                b"list-item" => list_depth = list_depth.saturating_sub(1),
                b"table-cell" => html.end_cell(),
                b"table-row" => html.end_row(),
                b"table" => html.end_table(),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(html.finish())
}

fn odt_outline_level(element: &BytesStart<'_>) -> Result<u8> {
    Ok(attribute(element, b"outline-level")?
        .and_then(|level| level.parse::<u8>().ok())
        .unwrap_or(1))
}

// -- Shared helpers -------------------------------------------------------------

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr
            .map_err(|err| BlattwerkError::DecodeError(format!("malformed attribute: {err}")))?;
        if attr.key.local_name().as_ref() == key {
            let raw = std::str::from_utf8(&attr.value)
                .map_err(|err| BlattwerkError::DecodeError(format!("attribute is not UTF-8: {err}")))?;
            let value = quick_xml::escape::unescape(raw)
                .map_err(|err| BlattwerkError::DecodeError(format!("malformed attribute: {err}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn xml_error(err: quick_xml::Error) -> BlattwerkError {
    BlattwerkError::DecodeError(format!("malformed document XML: {err}"))
}

#[derive(Default)]
struct Paragraph {
    text: String,
    heading: Option<u8>,
    list_item: bool,
}

/// Accumulates block-level HTML. Nested tables are flattened into the
/// enclosing cell.
#[derive(Default)]
struct HtmlBuilder {
    body: String,
    paragraph: Option<Paragraph>,
    table_depth: usize,
    cell: Option<String>,
}

impl HtmlBuilder {
    fn start_paragraph(&mut self) {
        if self.paragraph.is_some() {
            self.end_paragraph();
        }
        self.paragraph = Some(Paragraph::default());
    }

    fn set_heading(&mut self, level: Option<u8>) {
        if let (Some(paragraph), Some(level)) = (self.paragraph.as_mut(), level) {
            paragraph.heading = Some(level.clamp(1, 6));
        }
    }

    fn mark_list_item(&mut self) {
        if let Some(paragraph) = self.paragraph.as_mut() {
            paragraph.list_item = true;
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(paragraph) = self.paragraph.as_mut() {
            paragraph.text.push_str(text);
        }
    }

    fn end_paragraph(&mut self) {
        let Some(paragraph) = self.paragraph.take() else {
            return;
        };
        let trimmed = paragraph.text.trim();
        if trimmed.is_empty() {
            return;
        }
        let escaped = escape_markup(trimmed).replace('\n', "<br>");

        if let Some(cell) = self.cell.as_mut() {
            if !cell.is_empty() {
                cell.push(' ');
            }
            cell.push_str(&escaped);
            return;
        }

        match (paragraph.heading, paragraph.list_item) {
            (Some(level), _) => self.body.push_str(&format!("<h{level}>{escaped}</h{level}>\n")),
            (None, true) => self.body.push_str(&format!("<ul><li>{escaped}</li></ul>\n")),
            (None, false) => self.body.push_str(&format!("<p>{escaped}</p>\n")),
        }
    }

    fn start_table(&mut self) {
        self.table_depth += 1;
        if self.table_depth == 1 {
            self.body.push_str("<table>\n");
        }
    }

    fn start_row(&mut self) {
        if self.table_depth == 1 {
            self.body.push_str("<tr>");
        }
    }

    fn start_cell(&mut self) {
        if self.table_depth == 1 {
            self.cell = Some(String::new());
        }
    }

    fn end_cell(&mut self) {
        if self.table_depth == 1 {
            if let Some(cell) = self.cell.take() {
                self.body.push_str(&format!("<td>{cell}</td>"));
            }
        }
    }

    fn end_row(&mut self) {
        if self.table_depth == 1 {
            self.body.push_str("</tr>\n");
        }
    }

    fn end_table(&mut self) {
        if self.table_depth == 1 {
            self.body.push_str("</table>\n");
        }
        self.table_depth = self.table_depth.saturating_sub(1);
    }

    fn finish(mut self) -> String {
        self.end_paragraph();
        format!("<html><body>\n{}</body></html>\n", self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ZipArchiveWriter;
    use crate::capability::{ArchiveEntry, ArchiveWriter};

    const DOCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Report</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Hello </w:t></w:r><w:r><w:t>world &amp; friends</w:t></w:r></w:p>
    <w:p><w:pPr><w:numPr><w:ilvl w:val="0"/></w:numPr></w:pPr><w:r><w:t>First point</w:t></w:r></w:p>
    <w:tbl>
      <w:tr>
        <w:tc><w:p><w:r><w:t>A</w:t></w:r></w:p></w:tc>
        <w:tc><w:p><w:r><w:t>B</w:t></w:r></w:p></w:tc>
      </w:tr>
    </w:tbl>
    <w:p><w:r><w:t>Line one</w:t><w:br/><w:t>Line two</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    const ODT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0"><office:body><office:text><text:h text:outline-level="2">Minutes</text:h><text:p>Present:<text:s text:c="2"/><text:span>everyone</text:span></text:p><text:list><text:list-item><text:p>Budget</text:p></text:list-item></text:list><table:table><table:table-row><table:table-cell><text:p>x</text:p></table:table-cell><table:table-cell><text:p>y</text:p></table:table-cell></table:table-row></table:table></office:text></office:body></office:document-content>"#;

    fn container(entry: &str, xml: &str) -> Vec<u8> {
        ZipArchiveWriter
            .write(&[ArchiveEntry::new(entry, xml.as_bytes().to_vec())])
            .unwrap()
    }

    #[test]
    fn docx_blocks_become_html() {
        let html = OfficeXmlDecoder.to_html(&container(DOCX_BODY, DOCX)).unwrap();
        assert!(html.contains("<h1>Report</h1>"), "{html}");
        assert!(html.contains("<p>Hello world &amp; friends</p>"), "{html}");
        assert!(html.contains("<ul><li>First point</li></ul>"), "{html}");
        assert!(html.contains("<tr><td>A</td><td>B</td></tr>"), "{html}");
        assert!(html.contains("<p>Line one<br>Line two</p>"), "{html}");
    }

    #[test]
    fn odt_blocks_become_html() {
        let html = OfficeXmlDecoder.to_html(&container(ODT_BODY, ODT)).unwrap();
        assert!(html.contains("<h2>Minutes</h2>"), "{html}");
        assert!(html.contains("<p>Present:  everyone</p>"), "{html}");
        assert!(html.contains("<ul><li>Budget</li></ul>"), "{html}");
        assert!(html.contains("<tr><td>x</td><td>y</td></tr>"), "{html}");
    }

    #[test]
    fn attribute_values_are_unescaped() {
        let element = BytesStart::from_content(r#"text:h text:outline-level="2" title="R&amp;D""#, 6);
        assert_eq!(attribute(&element, b"outline-level").unwrap().as_deref(), Some("2"));
        assert_eq!(attribute(&element, b"title").unwrap().as_deref(), Some("R&D"));
        assert_eq!(attribute(&element, b"missing").unwrap(), None);
    }

    #[test]
    fn unknown_container_is_decode_error() {
        let err = OfficeXmlDecoder
            .to_html(&container("readme.txt", "hi"))
            .unwrap_err();
        assert!(matches!(err, BlattwerkError::DecodeError(_)));
        assert!(OfficeXmlDecoder.to_html(b"not a zip").is_err());
    }
}
