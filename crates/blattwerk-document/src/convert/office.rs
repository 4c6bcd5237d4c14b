// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Office and legacy formats to PDF — decoder markup flattened to text and
// laid out with the markdown rules. Formats without a decoder are simulated.

use blattwerk_core::error::Result;
use blattwerk_core::{ConversionResult, DocumentFormat, OptionSpec, Orientation};
use tracing::{debug, info};

use super::{Descriptor, Family, Job, OutputDecl, name_decode_error};
use crate::capability::Capability;
use crate::office::html_to_text;
use crate::pdf::TextLayout;

const WORD_PROCESSING: &[DocumentFormat] = &[DocumentFormat::Docx, DocumentFormat::Odt];

const SPREADSHEETS: &[DocumentFormat] = &[
    DocumentFormat::Xlsx,
    DocumentFormat::Xls,
    DocumentFormat::Ods,
];

const SIMULATED: &[DocumentFormat] = &[
    DocumentFormat::Pptx,
    DocumentFormat::Odp,
    DocumentFormat::Pub,
    DocumentFormat::Epub,
    DocumentFormat::Heic,
    DocumentFormat::Xps,
];

const OPTIONS: &[OptionSpec] = &[
    OptionSpec::new(
        "orientation",
        "",
        "portrait or landscape (spreadsheets default to landscape)",
    ),
    OptionSpec::new("font_size", "11", "body font size in points"),
    OptionSpec::new("title", "", "title line above the content"),
];

/// Columns html2text wraps at, per orientation.
const PORTRAIT_COLUMNS: usize = 90;
const LANDSCAPE_COLUMNS: usize = 130;

pub(super) fn descriptors() -> Vec<Descriptor> {
    let office = |format: &DocumentFormat, requires: &'static [Capability], summary: &str| {
        Descriptor::convert(
            format!("convert:{}:pdf", format.extension()),
            Family::Office,
            convert,
        )
        .inputs(vec![*format])
        .output(OutputDecl::Bytes(DocumentFormat::Pdf))
        .options(OPTIONS)
        .requires(requires)
        .summary(format!("{summary} ({})", format.extension()))
    };

    WORD_PROCESSING
        .iter()
        .map(|format| office(format, &[Capability::WordProcessingDecoder], "Lay out a word-processing document"))
        .chain(
            SPREADSHEETS
                .iter()
                .map(|format| office(format, &[Capability::SpreadsheetDecoder], "Lay out every sheet of a workbook")),
        )
        .chain(SIMULATED.iter().map(|format| Descriptor::simulated(*format)))
        .collect()
}

fn convert(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let input = job.input()?;
    let format = job.source_format()?;
    let spreadsheet = SPREADSHEETS.contains(&format);

    let html = if spreadsheet {
        job.capabilities.spreadsheet()?.to_html(&input.bytes)
    } else {
        job.capabilities.word_processing()?.to_html(&input.bytes)
    }
    .map_err(name_decode_error(&input.name))?;

    let orientation = job.orientation(if spreadsheet {
        Orientation::Landscape
    } else {
        Orientation::Portrait
    })?;
    let columns = match orientation {
        Orientation::Portrait => PORTRAIT_COLUMNS,
        Orientation::Landscape => LANDSCAPE_COLUMNS,
    };
    let text = html_to_text(&html, columns);
    debug!(html_len = html.len(), text_len = text.len(), "Markup flattened");

    let layout = TextLayout {
        orientation,
        font_size: job.positive("font_size", 11.0, 72.0)?,
        // Table rules only line up in a fixed-width face.
        monospace: spreadsheet,
        markdown: true,
        title: job.options.str("title").filter(|title| !title.trim().is_empty()),
    };
    let pdf = job.writer().create_from_text(&text, &layout)?;
    info!(%format, bytes = pdf.len(), "Office document laid out");
    Ok(vec![ConversionResult::bytes(
        pdf,
        job.output_name(".pdf"),
        DocumentFormat::Pdf,
    )])
}
