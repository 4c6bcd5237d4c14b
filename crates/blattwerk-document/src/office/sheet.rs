// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spreadsheet decoder — xlsx, xls, and ods workbooks read with `calamine` and
// rendered as one HTML table per sheet.

use std::io::Cursor;

use blattwerk_core::error::{BlattwerkError, Result};
use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use tracing::{debug, info, instrument, warn};

use super::escape_markup;
use crate::capability::SpreadsheetDecoder;

/// Built-in decoder for every workbook format calamine understands.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalamineDecoder;

impl SpreadsheetDecoder for CalamineDecoder {
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    fn to_html(&self, bytes: &[u8]) -> Result<String> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|err| BlattwerkError::DecodeError(format!("failed to open workbook: {err}")))?;

        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
        if sheet_names.is_empty() {
            return Err(BlattwerkError::DecodeError("workbook has no sheets".into()));
        }

        let mut html = String::from("<html><body>\n");
        for name in &sheet_names {
            match workbook.worksheet_range(name) {
                Ok(range) => {
                    debug!(sheet = %name, rows = range.height(), "Sheet read");
                    html.push_str(&sheet_to_html(name, &range));
                }
                Err(err) => warn!(sheet = %name, %err, "Skipping unreadable sheet"),
            }
        }
        html.push_str("</body></html>\n");

        info!(sheets = sheet_names.len(), html_len = html.len(), "Workbook decoded");
        Ok(html)
    }
}

fn sheet_to_html(name: &str, range: &Range<Data>) -> String {
    let mut html = format!("<h2>{}</h2>\n", escape_markup(name));
    if range.is_empty() {
        html.push_str("<p>(empty sheet)</p>\n");
        return html;
    }

    html.push_str("<table>\n");
    for row in range.rows() {
        html.push_str("<tr>");
        for cell in row {
            html.push_str("<td>");
            html.push_str(&escape_markup(&cell_text(cell)));
            html.push_str("</td>");
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
    html
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(err) => format!("#ERR:{err:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_render_as_plain_values() {
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::Int(42)), "42");
        assert_eq!(cell_text(&Data::Float(10.0)), "10");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&Data::Bool(true)), "TRUE");
    }

    #[test]
    fn sheet_becomes_heading_and_table() {
        let mut range = Range::new((0, 0), (1, 1));
        range.set_value((0, 0), Data::String("name".into()));
        range.set_value((0, 1), Data::String("qty".into()));
        range.set_value((1, 0), Data::String("bolts & nuts".into()));
        range.set_value((1, 1), Data::Int(12));

        let html = sheet_to_html("Stock", &range);
        assert!(html.starts_with("<h2>Stock</h2>"));
        assert!(html.contains("<tr><td>name</td><td>qty</td></tr>"));
        assert!(html.contains("<tr><td>bolts &amp; nuts</td><td>12</td></tr>"));
    }

    #[test]
    fn empty_sheet_is_marked() {
        let range: Range<Data> = Range::empty();
        assert!(sheet_to_html("Blank", &range).contains("(empty sheet)"));
    }

    #[test]
    fn garbage_is_decode_error() {
        let err = CalamineDecoder.to_html(b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, BlattwerkError::DecodeError(_)));
    }
}
