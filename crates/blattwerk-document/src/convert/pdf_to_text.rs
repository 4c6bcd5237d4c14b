// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF to text-like formats — extracted page text reshaped per target.
//
// Every target starts from the same per-page text. The formatters below are
// pure functions over that text; only EPUB (archive writer) and the editable
// `.doc` layout (positioned runs, optional page snapshots) need more.

use std::fmt::Write as _;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::{ConversionResult, DocumentFormat, InputFile, OptionSpec};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::{Descriptor, Family, Job, OutputDecl};
use crate::capability::{ArchiveEntry, Capability};
use crate::office::escape_markup;
use crate::pdf::handle::{DocumentHandle, LoadOptions};
use crate::raster::{RENDER_SCALE, Rasterizer};
use crate::text::{Viewport, page_runs, page_texts};

const CSV_OPTIONS: &[OptionSpec] = &[OptionSpec::new(
    "delimiter",
    ",",
    "single character placed between cells",
)];

const TSV_OPTIONS: &[OptionSpec] = &[OptionSpec::new(
    "delimiter",
    "\t",
    "single character placed between cells",
)];

/// Text and markup targets sharing the plain extraction pipeline.
const TEXT_TARGETS: &[(DocumentFormat, &str)] = &[
    (DocumentFormat::Txt, "Extract plain text, pages separated by a blank line"),
    (DocumentFormat::Csv, "Extract text as comma-separated cells"),
    (DocumentFormat::Tsv, "Extract text as tab-separated cells"),
    (DocumentFormat::Json, "Extract text as JSON, one entry per page"),
    (DocumentFormat::Xml, "Extract text as an XML document of pages"),
    (DocumentFormat::Markdown, "Extract text as markdown with a heading per page"),
    (DocumentFormat::Rtf, "Extract text as an RTF document"),
    (DocumentFormat::Html, "Extract text as HTML paragraphs, one section per page"),
    (DocumentFormat::Svg, "Extract text as SVG text lines"),
];

pub(super) fn descriptors() -> Vec<Descriptor> {
    let mut descriptors: Vec<Descriptor> = TEXT_TARGETS
        .iter()
        .map(|(format, summary)| {
            let descriptor = Descriptor::convert(
                format!("convert:pdf:{}", format.extension()),
                Family::PdfToText,
                convert_text,
            )
            .inputs(vec![DocumentFormat::Pdf])
            .output(OutputDecl::Text)
            .summary(*summary);
            match format {
                DocumentFormat::Csv => descriptor.options(CSV_OPTIONS),
                DocumentFormat::Tsv => descriptor.options(TSV_OPTIONS),
                _ => descriptor,
            }
        })
        .collect();

    descriptors.push(
        Descriptor::convert("convert:pdf:epub", Family::PdfToText, convert_epub)
            .inputs(vec![DocumentFormat::Pdf])
            .output(OutputDecl::Bytes(DocumentFormat::Epub))
            .requires(&[Capability::ArchiveWriter])
            .summary("Repackage the text as a minimal EPUB 3 book, one chapter per page"),
    );

    descriptors.push(
        Descriptor::convert("convert:pdf:doc", Family::PdfToText, convert_editable)
            .inputs(vec![DocumentFormat::Pdf])
            .output(OutputDecl::Bytes(DocumentFormat::Doc))
            .summary("Word-compatible HTML with text placed where it sits on each page"),
    );

    descriptors
}

// -- Handlers -----------------------------------------------------------------

fn open(input: &InputFile) -> Result<DocumentHandle> {
    DocumentHandle::load_named(
        &input.name,
        &input.bytes,
        LoadOptions {
            ignore_encryption: true,
        },
    )
}

/// Per-page text, refusing documents with nothing to extract.
fn extracted_pages(input: &InputFile) -> Result<Vec<String>> {
    let handle = open(input)?;
    let pages = page_texts(&handle)?;
    if pages.iter().all(|page| page.trim().is_empty()) {
        return Err(BlattwerkError::DecodeError(format!(
            "{} has no extractable text (scanned pages need ocr)",
            input.name
        )));
    }
    Ok(pages)
}

#[instrument(skip_all, fields(operation = %job.descriptor.name))]
fn convert_text(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let input = job.input()?;
    let pages = extracted_pages(input)?;
    let target = target_format(&job.descriptor.name)?;

    let text = match target {
        DocumentFormat::Txt => pages.join("\n\n"),
        DocumentFormat::Csv | DocumentFormat::Tsv => to_delimited(&pages, delimiter(job)?),
        DocumentFormat::Json => to_json(&pages)?,
        DocumentFormat::Xml => to_xml(&pages),
        DocumentFormat::Markdown => to_markdown(input.stem(), &pages),
        DocumentFormat::Rtf => to_rtf(&pages),
        DocumentFormat::Html => to_html(input.stem(), &pages),
        DocumentFormat::Svg => to_svg(&pages),
        other => {
            return Err(BlattwerkError::UnsupportedOperation(format!(
                "no text formatter for {other}"
            )));
        }
    };

    info!(pages = pages.len(), chars = text.len(), %target, "Text formatted");
    Ok(vec![
        ConversionResult::text(text, job.output_name(&format!(".{}", target.extension())))
            .with_mime(target.mime_type()),
    ])
}

fn target_format(name: &str) -> Result<DocumentFormat> {
    name.rsplit(':')
        .next()
        .and_then(DocumentFormat::from_extension)
        .ok_or_else(|| BlattwerkError::UnsupportedOperation(format!("no target format in {name}")))
}

fn delimiter(job: &Job<'_>) -> Result<char> {
    let value = job.options.str_or("delimiter", ",");
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c != '"' && c != '\n' && c != '\r' => Ok(c),
        _ => Err(BlattwerkError::InvalidOptions(format!(
            "delimiter must be a single character other than a quote or newline, got {value:?}"
        ))),
    }
}

fn convert_epub(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let input = job.input()?;
    let pages = extracted_pages(input)?;
    let identifier = format!("urn:uuid:{}", uuid::Uuid::new_v4());
    let modified = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let entries = epub_entries(input.stem(), &pages, &identifier, &modified);
    let bytes = job.capabilities.archive()?.write(&entries)?;
    debug!(entries = entries.len(), bytes = bytes.len(), "EPUB packaged");
    Ok(vec![ConversionResult::bytes(
        bytes,
        job.output_name(".epub"),
        DocumentFormat::Epub,
    )])
}

#[instrument(skip_all)]
fn convert_editable(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let input = job.input()?;
    let handle = open(input)?;
    let scale = RENDER_SCALE;

    let backgrounds: Vec<Option<String>> = match job.capabilities.renderer() {
        Some(renderer) => Rasterizer::new(renderer, job.config)
            .render(&input.bytes, None)?
            .into_iter()
            .map(|snapshot| Some(snapshot.data_uri))
            .collect(),
        None => {
            warn!("No page renderer, editable layout will have no page backgrounds");
            vec![None; handle.page_count()]
        }
    };

    let mut pages = Vec::with_capacity(handle.page_count());
    for index in 0..handle.page_count() {
        let viewport = Viewport::for_page(&handle.page_geometry(index)?, scale);
        let runs = page_runs(&handle, index, scale)?
            .into_iter()
            .map(|run| PositionedText {
                text: run.text,
                x: run.x,
                y: run.y,
                font_size: run.font_size,
            })
            .collect();
        pages.push(EditablePage {
            width: viewport.width,
            height: viewport.height,
            background: backgrounds.get(index).cloned().flatten(),
            runs,
        });
    }

    let html = to_editable_html(input.stem(), &pages);
    Ok(vec![ConversionResult::bytes(
        html.into_bytes(),
        job.output_name(".doc"),
        DocumentFormat::Doc,
    )])
}

// -- Formatters ---------------------------------------------------------------

/// Break a line into cells at runs of two or more spaces (or tabs).
fn cells(line: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = line.trim();
    while !rest.is_empty() {
        let gap = rest
            .char_indices()
            .zip(rest.chars().skip(1))
            .find(|((_, a), b)| *a == '\t' || (*a == ' ' && *b == ' '))
            .map(|((i, _), _)| i);
        match gap {
            Some(i) => {
                out.push(&rest[..i]);
                rest = rest[i..].trim_start();
            }
            None => {
                out.push(rest.trim_end_matches('\t'));
                break;
            }
        }
    }
    out
}

/// RFC 4180 quoting: wrap in quotes when the cell contains the delimiter, a
/// quote or a line break, doubling embedded quotes.
fn quote_cell(cell: &str, delimiter: char) -> String {
    if cell.contains(delimiter) || cell.contains(['"', '\r', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

pub(crate) fn to_delimited(pages: &[String], delimiter: char) -> String {
    let separator = delimiter.to_string();
    pages
        .iter()
        .flat_map(|page| page.lines())
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            cells(line)
                .into_iter()
                .map(|cell| quote_cell(cell, delimiter))
                .collect::<Vec<_>>()
                .join(&separator)
        })
        .collect::<Vec<_>>()
        .join("\r\n")
}

#[derive(Serialize)]
struct PageText<'a> {
    page: usize,
    text: &'a str,
}

#[derive(Serialize)]
struct PagesDocument<'a> {
    pages: Vec<PageText<'a>>,
}

pub(crate) fn to_json(pages: &[String]) -> Result<String> {
    let document = PagesDocument {
        pages: pages
            .iter()
            .enumerate()
            .map(|(index, text)| PageText {
                page: index + 1,
                text,
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

pub(crate) fn to_xml(pages: &[String]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<document>\n");
    for (index, text) in pages.iter().enumerate() {
        let _ = writeln!(xml, "  <page number=\"{}\">{}</page>", index + 1, escape_markup(text));
    }
    xml.push_str("</document>\n");
    xml
}

pub(crate) fn to_markdown(title: &str, pages: &[String]) -> String {
    let mut md = format!("# {title}\n");
    for (index, text) in pages.iter().enumerate() {
        let _ = write!(md, "\n## Page {}\n\n{}\n", index + 1, text.trim_end());
    }
    md
}

fn rtf_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '{' | '}' => {
                out.push('\\');
                out.push(ch);
            }
            c if c.is_ascii() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{}?", *unit as i16);
                }
            }
        }
    }
    out
}

pub(crate) fn to_rtf(pages: &[String]) -> String {
    let mut rtf = String::from("{\\rtf1\\ansi\\deff0{\\fonttbl{\\f0 Helvetica;}}\\f0\\fs22\n");
    for (index, text) in pages.iter().enumerate() {
        if index > 0 {
            rtf.push_str("\\page\n");
        }
        for line in text.lines() {
            let _ = writeln!(rtf, "{}\\par", rtf_escape(line));
        }
    }
    rtf.push('}');
    rtf
}

pub(crate) fn to_html(title: &str, pages: &[String]) -> String {
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n",
        escape_markup(title)
    );
    for (index, text) in pages.iter().enumerate() {
        let _ = writeln!(html, "<section class=\"page\" id=\"page-{}\">", index + 1);
        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            let _ = writeln!(html, "<p>{}</p>", escape_markup(line.trim()));
        }
        html.push_str("</section>\n");
    }
    html.push_str("</body>\n</html>\n");
    html
}

const SVG_LINE_HEIGHT: usize = 16;
const SVG_PAGE_GAP: usize = 24;
const SVG_MARGIN: usize = 20;

pub(crate) fn to_svg(pages: &[String]) -> String {
    let mut body = String::new();
    let mut y = SVG_MARGIN;
    for (index, text) in pages.iter().enumerate() {
        if index > 0 {
            y += SVG_PAGE_GAP;
        }
        let _ = writeln!(body, "  <g id=\"page-{}\">", index + 1);
        for line in text.lines() {
            y += SVG_LINE_HEIGHT;
            if !line.trim().is_empty() {
                let _ = writeln!(
                    body,
                    "    <text x=\"{SVG_MARGIN}\" y=\"{y}\">{}</text>",
                    escape_markup(line)
                );
            }
        }
        body.push_str("  </g>\n");
    }
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"612\" height=\"{}\" font-family=\"Helvetica, Arial, sans-serif\" font-size=\"12\">\n{body}</svg>\n",
        y + SVG_MARGIN
    )
}

// -- EPUB ---------------------------------------------------------------------

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

fn xhtml(title: &str, body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE html>\n<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\">\n<head><title>{}</title></head>\n<body>\n{body}</body>\n</html>\n",
        escape_markup(title)
    )
}

/// Entries of a minimal EPUB 3 book: uncompressed `mimetype` first, the
/// container, the package document, a navigation document and one XHTML
/// chapter per page.
pub(crate) fn epub_entries(
    title: &str,
    pages: &[String],
    identifier: &str,
    modified: &str,
) -> Vec<ArchiveEntry> {
    let mut manifest = String::from(
        "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
    );
    let mut spine = String::new();
    let mut nav_items = String::new();
    let mut chapters = Vec::with_capacity(pages.len());

    for (index, text) in pages.iter().enumerate() {
        let number = index + 1;
        let _ = writeln!(
            manifest,
            "    <item id=\"page-{number}\" href=\"page-{number}.xhtml\" media-type=\"application/xhtml+xml\"/>"
        );
        let _ = writeln!(spine, "    <itemref idref=\"page-{number}\"/>");
        let _ = writeln!(nav_items, "      <li><a href=\"page-{number}.xhtml\">Page {number}</a></li>");

        let mut body = format!("<h2>Page {number}</h2>\n");
        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            let _ = writeln!(body, "<p>{}</p>", escape_markup(line.trim()));
        }
        chapters.push(ArchiveEntry::new(
            format!("OEBPS/page-{number}.xhtml"),
            xhtml(&format!("{title}, page {number}"), &body),
        ));
    }

    let package = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<package xmlns=\"http://www.idpf.org/2007/opf\" version=\"3.0\" unique-identifier=\"book-id\">\n  <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n    <dc:identifier id=\"book-id\">{identifier}</dc:identifier>\n    <dc:title>{}</dc:title>\n    <dc:language>en</dc:language>\n    <meta property=\"dcterms:modified\">{modified}</meta>\n  </metadata>\n  <manifest>\n{manifest}  </manifest>\n  <spine>\n{spine}  </spine>\n</package>\n",
        escape_markup(title)
    );
    let nav = xhtml(
        title,
        &format!("<nav epub:type=\"toc\" id=\"toc\">\n    <ol>\n{nav_items}    </ol>\n</nav>\n"),
    );

    let mut entries = vec![
        ArchiveEntry::new("mimetype", DocumentFormat::Epub.mime_type()).stored(),
        ArchiveEntry::new("META-INF/container.xml", CONTAINER_XML),
        ArchiveEntry::new("OEBPS/content.opf", package),
        ArchiveEntry::new("OEBPS/nav.xhtml", nav),
    ];
    entries.extend(chapters);
    entries
}

// -- Editable layout ----------------------------------------------------------

pub(crate) struct PositionedText {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
}

pub(crate) struct EditablePage {
    pub width: f32,
    pub height: f32,
    /// Snapshot data URI drawn behind the text.
    pub background: Option<String>,
    pub runs: Vec<PositionedText>,
}

pub(crate) fn to_editable_html(title: &str, pages: &[EditablePage]) -> String {
    let mut html = format!(
        "<html xmlns:o=\"urn:schemas-microsoft-com:office:office\" xmlns:w=\"urn:schemas-microsoft-com:office:word\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n.page {{ position: relative; margin: 0 auto 24px; overflow: hidden; background-size: 100% 100%; }}\n.page span {{ position: absolute; white-space: pre; font-family: Helvetica, Arial, sans-serif; }}\n</style>\n</head>\n<body>\n",
        escape_markup(title)
    );
    for page in pages {
        let background = page
            .background
            .as_deref()
            .map(|uri| format!(" background-image: url('{uri}');"))
            .unwrap_or_default();
        let _ = writeln!(
            html,
            "<div class=\"page\" style=\"width: {:.0}px; height: {:.0}px;{background}\">",
            page.width, page.height
        );
        for run in &page.runs {
            let _ = writeln!(
                html,
                "<span style=\"left: {:.1}px; top: {:.1}px; font-size: {:.1}px;\">{}</span>",
                run.x,
                run.y,
                run.font_size,
                escape_markup(&run.text)
            );
        }
        html.push_str("</div>\n");
    }
    html.push_str("</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capabilities;
    use crate::convert::Registry;
    use crate::convert::tests::{marked_pdf, registry, run};
    use crate::raster::tests::FlatRenderer;
    use blattwerk_core::{ConverterConfig, ErrorKind};
    use std::io::{Cursor, Read};

    fn pages(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn cells_split_on_wide_gaps_only() {
        assert_eq!(cells("Name   Qty  Unit price"), vec!["Name", "Qty", "Unit price"]);
        assert_eq!(cells("a\tb"), vec!["a", "b"]);
        assert!(cells("   ").is_empty());
    }

    #[test]
    fn delimited_output_quotes_per_rfc_4180() {
        let csv = to_delimited(&pages(&["Item  Note\nBolt  M6, zinc\n\nNut  5\" \"wide\""]), ',');
        assert_eq!(
            csv,
            "Item,Note\r\nBolt,\"M6, zinc\"\r\nNut,\"5\"\" \"\"wide\"\"\""
        );
        assert_eq!(to_delimited(&pages(&["a  b"]), '\t'), "a\tb");
    }

    #[test]
    fn json_lists_pages_from_one() {
        let json = to_json(&pages(&["first", "second"])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["pages"][1]["page"], 2);
        assert_eq!(value["pages"][0]["text"], "first");
    }

    #[test]
    fn xml_escapes_page_text() {
        let xml = to_xml(&pages(&["a < b & c"]));
        assert!(xml.contains("<page number=\"1\">a &lt; b &amp; c</page>"));
        assert!(xml.trim_end().ends_with("</document>"));
    }

    #[test]
    fn markdown_has_page_headings() {
        let md = to_markdown("report", &pages(&["one", "two"]));
        assert!(md.starts_with("# report\n"));
        assert!(md.contains("## Page 2\n\ntwo"));
    }

    #[test]
    fn rtf_escapes_control_characters_and_unicode() {
        let rtf = to_rtf(&pages(&["{x} \\ é", "next"]));
        assert!(rtf.starts_with("{\\rtf1"));
        assert!(rtf.contains("\\{x\\} \\\\ \\u233?\\par"));
        assert!(rtf.contains("\\page\nnext\\par"));
    }

    #[test]
    fn html_has_a_section_per_page_and_no_pre() {
        let html = to_html("r", &pages(&["a\n\nb", "c"]));
        assert_eq!(html.matches("<section").count(), 2);
        assert!(html.contains("<p>a</p>\n<p>b</p>"));
        assert!(!html.contains("<pre"));
    }

    #[test]
    fn svg_has_a_text_element_per_line() {
        let svg = to_svg(&pages(&["a\nb", "c"]));
        assert_eq!(svg.matches("<text ").count(), 3);
        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
    }

    #[test]
    fn epub_starts_with_stored_mimetype() {
        let entries = epub_entries("book", &pages(&["one", "two"]), "urn:uuid:test", "2026-01-01T00:00:00Z");
        assert_eq!(entries[0].path, "mimetype");
        assert!(entries[0].stored);
        assert_eq!(entries[0].bytes, b"application/epub+zip");
        let opf = entries.iter().find(|e| e.path == "OEBPS/content.opf").unwrap();
        let opf = String::from_utf8(opf.bytes.clone()).unwrap();
        assert!(opf.contains("<itemref idref=\"page-2\"/>"));
        assert!(entries.iter().any(|e| e.path == "OEBPS/page-2.xhtml"));
    }

    #[tokio::test]
    async fn pdf_to_txt_keeps_page_order() {
        let results = run(&registry(), "convert:pdf:txt", vec![InputFile::new("m.pdf", marked_pdf(&["ALPHA", "BRAVO"]))])
            .await
            .unwrap();
        assert_eq!(results[0].filename, "m.txt");
        assert_eq!(results[0].payload.as_text(), Some("ALPHA\n\nBRAVO"));
    }

    #[tokio::test]
    async fn pdf_to_csv_sets_mime() {
        let results = run(&registry(), "convert:pdf:csv", vec![InputFile::new("m.pdf", marked_pdf(&["ALPHA"]))])
            .await
            .unwrap();
        assert_eq!(results[0].mime_type, "text/csv");
        assert_eq!(results[0].payload.as_text(), Some("ALPHA"));
    }

    #[tokio::test]
    async fn textless_pdf_is_refused() {
        let mut blank = DocumentHandle::create_empty();
        blank.add_blank_page(100.0, 100.0).unwrap();
        let bytes = blank.save(Default::default()).unwrap();
        let err = run(&registry(), "convert:pdf:md", vec![InputFile::new("blank.pdf", bytes)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
    }

    #[tokio::test]
    async fn epub_is_a_readable_zip() {
        let results = run(&registry(), "convert:pdf:epub", vec![InputFile::new("m.pdf", marked_pdf(&["ALPHA"]))])
            .await
            .unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(results[0].payload.as_bytes().to_vec())).unwrap();
        let mut chapter = String::new();
        archive
            .by_name("OEBPS/page-1.xhtml")
            .unwrap()
            .read_to_string(&mut chapter)
            .unwrap();
        assert!(chapter.contains("<p>ALPHA</p>"));
    }

    #[tokio::test]
    async fn editable_layout_positions_runs() {
        let results = run(&registry(), "convert:pdf:doc", vec![InputFile::new("m.pdf", marked_pdf(&["ALPHA"]))])
            .await
            .unwrap();
        let html = String::from_utf8(results[0].payload.as_bytes().to_vec()).unwrap();
        // Letter at the default scale of 2.0.
        assert!(html.contains("width: 1224px; height: 1584px;"));
        assert!(html.contains(">ALPHA</span>"));
        assert!(html.contains("left: 144.0px"));
        assert!(!html.contains("background-image"));

        let with_renderer = Registry::standard(
            Capabilities::standard().with_renderer(FlatRenderer),
            ConverterConfig::default(),
        );
        let results = run(&with_renderer, "convert:pdf:doc", vec![InputFile::new("m.pdf", marked_pdf(&["ALPHA"]))])
            .await
            .unwrap();
        let html = String::from_utf8(results[0].payload.as_bytes().to_vec()).unwrap();
        assert!(html.contains("background-image: url('data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn editable_runs_share_the_snapshot_pixel_space() {
        let source = marked_pdf(&["ALPHA"]);
        let config = ConverterConfig::default();
        let snapshot = Rasterizer::new(&FlatRenderer, &config)
            .render(&source, Some(1))
            .unwrap()
            .remove(0);
        let item = crate::text::extract_items(&source, 0).unwrap().remove(0);

        let with_renderer = Registry::standard(Capabilities::standard().with_renderer(FlatRenderer), config);
        let results = run(&with_renderer, "convert:pdf:doc", vec![InputFile::new("m.pdf", source)])
            .await
            .unwrap();
        let html = String::from_utf8(results[0].payload.as_bytes().to_vec()).unwrap();
        assert!(html.contains(&format!("width: {}px; height: {}px;", snapshot.width, snapshot.height)));
        assert!(html.contains(&format!("left: {:.1}px; top: {:.1}px;", item.x, item.y)), "{html}");
    }
}
