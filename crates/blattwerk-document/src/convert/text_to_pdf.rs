// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text-like sources to PDF — plain text, code, data files and markdown laid
// out on paper by the PDF writer.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::{ConversionResult, DocumentFormat, OptionSpec, Orientation};
use tracing::debug;

use super::{Descriptor, Family, Job, OutputDecl};
use crate::pdf::TextLayout;

/// Replaces the field delimiter when tabular text is laid out.
pub const COLUMN_SEPARATOR: &str = "  |  ";

const SOURCES: &[DocumentFormat] = &[
    DocumentFormat::Txt,
    DocumentFormat::Sql,
    DocumentFormat::Json,
    DocumentFormat::Xml,
    DocumentFormat::Csv,
    DocumentFormat::Tsv,
    DocumentFormat::Markdown,
    DocumentFormat::Log,
];

const OPTIONS: &[OptionSpec] = &[
    OptionSpec::new(
        "orientation",
        "",
        "portrait or landscape (csv and tsv default to landscape)",
    ),
    OptionSpec::new("font_size", "11", "body font size in points"),
    OptionSpec::new("title", "", "title line above the text"),
];

pub(super) fn descriptors() -> Vec<Descriptor> {
    SOURCES
        .iter()
        .map(|format| {
            Descriptor::convert(
                format!("convert:{}:pdf", format.extension()),
                Family::TextToPdf,
                convert,
            )
            .inputs(vec![*format])
            .output(OutputDecl::Bytes(DocumentFormat::Pdf))
            .options(OPTIONS)
            .summary(format!("Lay out {} text on paper", format.extension()))
        })
        .collect()
}

fn convert(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let input = job.input()?;
    let format = job.source_format()?;
    let text = std::str::from_utf8(&input.bytes)
        .map_err(|err| BlattwerkError::load(&input.name, format!("not UTF-8 text: {err}")))?;

    let body = prepare_text(format, text);
    let layout = TextLayout {
        orientation: job.orientation(default_orientation(format))?,
        font_size: job.positive("font_size", 11.0, 72.0)?,
        monospace: is_monospace(format),
        markdown: format == DocumentFormat::Markdown,
        title: job.options.str("title").filter(|title| !title.trim().is_empty()),
    };
    debug!(%format, chars = body.chars().count(), ?layout.orientation, "Text prepared");

    let pdf = job.writer().create_from_text(&body, &layout)?;
    Ok(vec![ConversionResult::bytes(
        pdf,
        job.output_name(".pdf"),
        DocumentFormat::Pdf,
    )])
}

fn default_orientation(format: DocumentFormat) -> Orientation {
    match format {
        DocumentFormat::Csv | DocumentFormat::Tsv => Orientation::Landscape,
        _ => Orientation::Portrait,
    }
}

fn is_monospace(format: DocumentFormat) -> bool {
    matches!(
        format,
        DocumentFormat::Sql
            | DocumentFormat::Json
            | DocumentFormat::Xml
            | DocumentFormat::Log
            | DocumentFormat::Csv
            | DocumentFormat::Tsv
    )
}

/// Source text as it will be laid out: JSON pretty-printed when it parses,
/// delimited rows with their fields joined by [`COLUMN_SEPARATOR`].
pub fn prepare_text(format: DocumentFormat, text: &str) -> String {
    let text = text.trim_start_matches('\u{feff}');
    match format {
        DocumentFormat::Json => match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| text.to_string()),
            Err(err) => {
                debug!(%err, "JSON did not parse, laying it out as written");
                text.to_string()
            }
        },
        DocumentFormat::Csv => columns(text, ','),
        DocumentFormat::Tsv => columns(text, '\t'),
        _ => text.to_string(),
    }
}

fn columns(text: &str, delimiter: char) -> String {
    text.lines()
        .map(|line| split_record(line, delimiter).join(COLUMN_SEPARATOR))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fields of one delimited record. Quoted fields may contain the delimiter,
/// and `""` inside quotes is a literal quote.
fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' if quoted || field.is_empty() => quoted = !quoted,
            c if c == delimiter && !quoted => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}
