// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — new documents from text or bitmaps using `printpdf` 0.8.
//
// Text goes through a pure layout step first (`layout_text`), which places
// every line in millimetres measured from the top of the page. Rendering then
// turns the placed lines into printpdf `Op` lists, one `PdfPage` per page.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::{ConverterConfig, Orientation, PaperSize};
use image::DynamicImage;
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    RawImageData, RawImageFormat, TextItem, XObjectTransform,
};
use tracing::{debug, info, instrument};

use crate::text::encode_win_ansi;

/// Millimetres per PDF point.
const PT_TO_MM: f32 = 0.3528;

/// Line advance as a multiple of the font size.
const LINE_SPACING: f32 = 1.4;

/// Nominal resolution at which bitmaps are placed before fitting.
const IMAGE_DPI: f32 = 150.0;

const HEADING_1_PT: f32 = 22.0;
const HEADING_2_PT: f32 = 16.0;
const TITLE_PT: f32 = 18.0;

/// Built-in font faces used by the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Helvetica,
    HelveticaBold,
    Courier,
}

impl Face {
    fn builtin(self) -> BuiltinFont {
        match self {
            Self::Helvetica => BuiltinFont::Helvetica,
            Self::HelveticaBold => BuiltinFont::HelveticaBold,
            Self::Courier => BuiltinFont::Courier,
        }
    }

    /// Average glyph advance as a fraction of the font size.
    fn average_width(self) -> f32 {
        match self {
            Self::Helvetica => 0.50,
            Self::HelveticaBold => 0.55,
            Self::Courier => 0.60,
        }
    }
}

/// How a block of text is laid out.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub orientation: Orientation,
    /// Body font size in points.
    pub font_size: f32,
    /// Courier instead of Helvetica for body lines.
    pub monospace: bool,
    /// Interpret `# `, `## `, `- ` and `* ` line prefixes.
    pub markdown: bool,
    /// Optional title line above the body.
    pub title: Option<String>,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            orientation: Orientation::Portrait,
            font_size: 11.0,
            monospace: false,
            markdown: false,
            title: None,
        }
    }
}

/// One line of text at its final position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    /// Left edge, from the left side of the page.
    pub x_mm: f32,
    /// Baseline, measured down from the top of the page.
    pub baseline_mm: f32,
    pub size_pt: f32,
    pub face: Face,
}

/// Creates new PDF documents from text content or bitmaps.
#[derive(Debug, Clone)]
pub struct PdfWriter {
    paper_size: PaperSize,
    margin_mm: f32,
}

impl PdfWriter {
    pub fn new(paper_size: PaperSize, margin_mm: f32) -> Self {
        Self {
            paper_size,
            margin_mm,
        }
    }

    /// A4 with 15 mm margins.
    pub fn a4() -> Self {
        Self::new(PaperSize::A4, 15.0)
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.paper_size, config.margin_mm)
    }

    /// Lowest cursor position before a page break, in mm from the top.
    /// On A4 that is 280 mm portrait and 190 mm landscape.
    pub fn bottom_limit_mm(&self, orientation: Orientation) -> f32 {
        let (_, height) = self.paper_size.oriented_mm(orientation);
        match orientation {
            Orientation::Portrait => height - 17.0,
            Orientation::Landscape => height - 20.0,
        }
    }

    // -- Text layout ----------------------------------------------------------

    /// Place every line of `text`, breaking pages as the cursor passes the
    /// bottom limit. Always returns at least one (possibly empty) page.
    pub fn layout_text(&self, text: &str, layout: &TextLayout) -> Vec<Vec<PlacedLine>> {
        let (page_w, _) = self.paper_size.oriented_mm(layout.orientation);
        let mut cursor = LayoutCursor {
            pages: vec![Vec::new()],
            y: self.margin_mm,
            top: self.margin_mm,
            bottom: self.bottom_limit_mm(layout.orientation),
            left: self.margin_mm,
            usable_width: page_w - 2.0 * self.margin_mm,
        };

        if let Some(title) = layout.title.as_deref().filter(|t| !t.trim().is_empty()) {
            cursor.paragraph(title.trim(), TITLE_PT, Face::HelveticaBold, "");
            cursor.blank(layout.font_size);
        }

        let body = if layout.monospace {
            Face::Courier
        } else {
            Face::Helvetica
        };

        for raw_line in text.lines() {
            let line = raw_line.replace('\t', "    ");
            if line.trim().is_empty() {
                cursor.blank(layout.font_size);
                continue;
            }
            if layout.markdown {
                if let Some(heading) = line.strip_prefix("# ") {
                    cursor.paragraph(heading.trim(), HEADING_1_PT, Face::HelveticaBold, "");
                    continue;
                }
                if let Some(heading) = line.strip_prefix("## ") {
                    cursor.paragraph(heading.trim(), HEADING_2_PT, Face::HelveticaBold, "");
                    continue;
                }
                let trimmed = line.trim_start();
                if let Some(item) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
                    cursor.paragraph(item.trim(), layout.font_size, body, "\u{2022} ");
                    continue;
                }
            }
            cursor.paragraph(&line, layout.font_size, body, "");
        }

        cursor.pages
    }

    // -- Text to PDF ----------------------------------------------------------

    /// Lay out `text` and render it.
    #[instrument(skip_all, fields(text_len = text.len(), orientation = ?layout.orientation))]
    pub fn create_from_text(&self, text: &str, layout: &TextLayout) -> Result<Vec<u8>> {
        let pages = self.layout_text(text, layout);
        let (page_w, page_h) = self.paper_size.oriented_mm(layout.orientation);
        let title = layout.title.as_deref().unwrap_or("Blattwerk Document");
        info!(pages = pages.len(), title, "Creating text PDF");

        let pdf_pages = pages
            .iter()
            .map(|lines| {
                let ops = lines
                    .iter()
                    .flat_map(|line| text_ops(line, page_h))
                    .collect::<Vec<_>>();
                PdfPage::new(Mm(page_w), Mm(page_h), ops)
            })
            .collect::<Vec<_>>();

        let mut doc = PdfDocument::new(title);
        doc.with_pages(pdf_pages);
        let bytes = save(&doc);
        if pages.iter().flatten().any(|line| !line.text.is_ascii()) {
            reencode_win_ansi(&bytes)
        } else {
            Ok(bytes)
        }
    }

    /// One page stating what happened, used where no real decoder exists.
    pub fn create_placeholder(&self, heading: &str, lines: &[String]) -> Result<Vec<u8>> {
        let mut text = format!("# {heading}\n\n");
        for line in lines {
            text.push_str(line);
            text.push('\n');
        }
        let layout = TextLayout {
            markdown: true,
            ..TextLayout::default()
        };
        self.create_from_text(&text, &layout)
    }

    // -- Images to PDF --------------------------------------------------------

    /// One page per image. Each page takes the orientation of its image, and
    /// the image is fitted inside the margins and centred.
    #[instrument(skip_all, fields(images = images.len()))]
    pub fn create_from_images(&self, images: &[DynamicImage], title: &str) -> Result<Vec<u8>> {
        if images.is_empty() {
            return Err(BlattwerkError::InvalidRequest(
                "at least one image is required".into(),
            ));
        }

        let mut doc = PdfDocument::new(title);
        let mut pages = Vec::with_capacity(images.len());

        for image in images {
            let (img_w, img_h) = (image.width(), image.height());
            if img_w == 0 || img_h == 0 {
                return Err(BlattwerkError::DecodeError("image has no pixels".into()));
            }
            let orientation = Orientation::for_dimensions(img_w as f32, img_h as f32);
            let (page_w, page_h) = self.paper_size.oriented_mm(orientation);

            let raw = RawImage {
                pixels: RawImageData::U8(image.to_rgb8().into_raw()),
                width: img_w as usize,
                height: img_h as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            let placement = fit_image(
                (img_w, img_h),
                (Mm(page_w).into_pt().0, Mm(page_h).into_pt().0),
                Mm(self.margin_mm).into_pt().0,
            );
            debug!(img_w, img_h, scale = placement.scale, "Image placed on page");

            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(placement.x)),
                    translate_y: Some(Pt(placement.y)),
                    scale_x: Some(placement.scale),
                    scale_y: Some(placement.scale),
                    dpi: Some(IMAGE_DPI),
                    rotate: None,
                },
            }];
            pages.push(PdfPage::new(Mm(page_w), Mm(page_h), ops));
        }

        info!(pages = pages.len(), title, "Creating image PDF");
        doc.with_pages(pages);
        Ok(save(&doc))
    }
}

fn save(doc: &PdfDocument) -> Vec<u8> {
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        debug!(warnings = warnings.len(), "printpdf reported warnings");
    }
    output
}

/// printpdf writes builtin-font strings as UTF-8 while the fonts declare
/// WinAnsiEncoding. Rewrite every shown string as single-byte WinAnsi.
fn reencode_win_ansi(pdf: &[u8]) -> Result<Vec<u8>> {
    let fail = |err: lopdf::Error| BlattwerkError::SaveError(format!("text encoding: {err}"));
    let mut doc = Document::load_mem(pdf).map_err(fail)?;

    let streams: Vec<ObjectId> = doc
        .get_pages()
        .into_values()
        .flat_map(|page| doc.get_page_contents(page))
        .collect();
    for id in streams {
        let Ok(stream) = doc.get_object_mut(id).and_then(Object::as_stream_mut) else {
            continue;
        };
        let raw = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        let mut content = Content::decode(&raw).map_err(fail)?;
        for op in &mut content.operations {
            if matches!(op.operator.as_str(), "Tj" | "TJ" | "'" | "\"") {
                op.operands.iter_mut().for_each(reencode_operand);
            }
        }
        stream.set_plain_content(content.encode().map_err(fail)?);
    }

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|err| BlattwerkError::SaveError(format!("text encoding: {err}")))?;
    Ok(out)
}

fn reencode_operand(operand: &mut Object) {
    match operand {
        Object::String(bytes, _) => {
            let encoded = std::str::from_utf8(bytes)
                .ok()
                .filter(|text| !text.is_ascii())
                .map(encode_win_ansi);
            if let Some(encoded) = encoded {
                *bytes = encoded;
            }
        }
        Object::Array(items) => items.iter_mut().for_each(reencode_operand),
        _ => {}
    }
}

fn text_ops(line: &PlacedLine, page_h_mm: f32) -> Vec<Op> {
    vec![
        Op::StartTextSection,
        Op::SetTextCursor {
            pos: Point {
                x: Mm(line.x_mm).into_pt(),
                y: Mm(page_h_mm - line.baseline_mm).into_pt(),
            },
        },
        Op::SetFontSizeBuiltinFont {
            size: Pt(line.size_pt),
            font: line.face.builtin(),
        },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(line.text.clone())],
            font: line.face.builtin(),
        },
        Op::EndTextSection,
    ]
}

/// Position and scale of a bitmap on a page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    x: f32,
    y: f32,
    scale: f32,
}

fn fit_image((img_w, img_h): (u32, u32), (page_w, page_h): (f32, f32), margin: f32) -> Placement {
    let native_w = img_w as f32 / IMAGE_DPI * 72.0;
    let native_h = img_h as f32 / IMAGE_DPI * 72.0;
    let usable_w = page_w - 2.0 * margin;
    let usable_h = page_h - 2.0 * margin;

    let scale = (usable_w / native_w).min(usable_h / native_h);
    Placement {
        x: margin + (usable_w - native_w * scale) / 2.0,
        y: margin + (usable_h - native_h * scale) / 2.0,
        scale,
    }
}

struct LayoutCursor {
    pages: Vec<Vec<PlacedLine>>,
    /// Top of the next line, in mm from the top of the page.
    y: f32,
    top: f32,
    bottom: f32,
    left: f32,
    usable_width: f32,
}

impl LayoutCursor {
    fn line_height(size_pt: f32) -> f32 {
        size_pt * PT_TO_MM * LINE_SPACING
    }

    fn blank(&mut self, size_pt: f32) {
        self.y += Self::line_height(size_pt);
    }

    /// Wrap `text` to the usable width and place each resulting line. The
    /// first line carries `marker`; continuation lines are indented by it.
    fn paragraph(&mut self, text: &str, size_pt: f32, face: Face, marker: &str) {
        let char_width = face.average_width() * size_pt * PT_TO_MM;
        let marker_len = marker.chars().count();
        let max_chars = ((self.usable_width / char_width) as usize)
            .saturating_sub(marker_len)
            .max(1);

        let indent = " ".repeat(marker_len);
        for (i, chunk) in wrap_line(text, max_chars).into_iter().enumerate() {
            let prefix = if i == 0 { marker } else { indent.as_str() };
            self.place(format!("{prefix}{chunk}"), size_pt, face);
        }
    }

    fn place(&mut self, text: String, size_pt: f32, face: Face) {
        if self.y > self.bottom {
            self.pages.push(Vec::new());
            self.y = self.top;
        }
        let baseline = self.y + size_pt * PT_TO_MM;
        if let Some(page) = self.pages.last_mut() {
            page.push(PlacedLine {
                text,
                x_mm: self.left,
                baseline_mm: baseline,
                size_pt,
                face,
            });
        }
        self.y += Self::line_height(size_pt);
    }
}

/// Break `line` into chunks of at most `max_chars` characters, preferring
/// whitespace boundaries. Interior spacing of each chunk is kept as written.
fn wrap_line(line: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = line.trim_end();

    while rest.chars().count() > max_chars {
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(i, _)| i);
        let split = rest[..limit]
            .rfind(char::is_whitespace)
            .filter(|&i| i > 0)
            .unwrap_or(limit);
        chunks.push(rest[..split].trim_end().to_string());
        rest = rest[split..].trim_start();
    }
    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::handle::{DocumentHandle, LoadOptions};

    #[test]
    fn wrap_keeps_short_lines_verbatim() {
        assert_eq!(wrap_line("a  |  b  |  c", 80), vec!["a  |  b  |  c"]);
    }

    #[test]
    fn wrap_breaks_on_whitespace() {
        assert_eq!(
            wrap_line("the quick brown fox", 10),
            vec!["the quick", "brown fox"]
        );
    }

    #[test]
    fn wrap_force_breaks_long_words() {
        assert_eq!(wrap_line("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn bottom_limits_on_a4() {
        let writer = PdfWriter::a4();
        assert_eq!(writer.bottom_limit_mm(Orientation::Portrait), 280.0);
        assert_eq!(writer.bottom_limit_mm(Orientation::Landscape), 190.0);
    }

    #[test]
    fn long_text_breaks_pages_and_resets_cursor() {
        let writer = PdfWriter::a4();
        let text = (1..=120).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let pages = writer.layout_text(&text, &TextLayout::default());
        assert!(pages.len() >= 2);

        let limit = writer.bottom_limit_mm(Orientation::Portrait);
        for page in &pages {
            let first = &page[0];
            assert!((first.baseline_mm - (15.0 + 11.0 * PT_TO_MM)).abs() < 1e-3);
            for line in page {
                assert!(line.baseline_mm - line.size_pt * PT_TO_MM <= limit + 1e-3);
            }
        }
        let total: usize = pages.iter().map(Vec::len).sum();
        assert_eq!(total, 120);
    }

    #[test]
    fn landscape_fits_fewer_lines_per_page() {
        let writer = PdfWriter::a4();
        let text = vec!["x"; 60].join("\n");
        let portrait = writer.layout_text(&text, &TextLayout::default());
        let landscape = writer.layout_text(
            &text,
            &TextLayout {
                orientation: Orientation::Landscape,
                ..TextLayout::default()
            },
        );
        assert!(landscape[0].len() < portrait[0].len());
    }

    #[test]
    fn markdown_prefixes_become_headings_and_bullets() {
        let writer = PdfWriter::a4();
        let layout = TextLayout {
            markdown: true,
            ..TextLayout::default()
        };
        let pages = writer.layout_text("# Title\n## Section\n- item\n* other\nbody", &layout);
        let lines = &pages[0];
        assert_eq!(lines[0].text, "Title");
        assert_eq!(lines[0].size_pt, 22.0);
        assert_eq!(lines[0].face, Face::HelveticaBold);
        assert_eq!(lines[1].size_pt, 16.0);
        assert_eq!(lines[2].text, "\u{2022} item");
        assert_eq!(lines[3].text, "\u{2022} other");
        assert_eq!(lines[4].text, "body");
        assert_eq!(lines[4].face, Face::Helvetica);
    }

    #[test]
    fn title_and_monospace() {
        let writer = PdfWriter::a4();
        let layout = TextLayout {
            monospace: true,
            title: Some("Query".into()),
            ..TextLayout::default()
        };
        let pages = writer.layout_text("SELECT 1;", &layout);
        assert_eq!(pages[0][0].text, "Query");
        assert_eq!(pages[0][1].face, Face::Courier);
    }

    #[test]
    fn text_pdf_page_count_matches_layout() {
        let writer = PdfWriter::a4();
        let text = (1..=150).map(|i| format!("row {i}")).collect::<Vec<_>>().join("\n");
        let layout = TextLayout::default();
        let expected = writer.layout_text(&text, &layout).len();
        let bytes = writer.create_from_text(&text, &layout).unwrap();
        let handle = DocumentHandle::load(&bytes, LoadOptions::default()).unwrap();
        assert_eq!(handle.page_count(), expected);
    }

    #[test]
    fn non_ascii_text_is_written_as_win_ansi() {
        let layout = TextLayout {
            markdown: true,
            ..TextLayout::default()
        };
        let bytes = PdfWriter::a4().create_from_text("- caf\u{e9} \u{2013} \u{2713}", &layout).unwrap();
        let text = crate::text::extract_text(&bytes).unwrap();
        assert_eq!(text.trim(), "\u{2022} caf\u{e9} \u{2013} ?");
    }

    #[test]
    fn empty_text_gives_one_blank_page() {
        let bytes = PdfWriter::a4().create_from_text("", &TextLayout::default()).unwrap();
        let handle = DocumentHandle::load(&bytes, LoadOptions::default()).unwrap();
        assert_eq!(handle.page_count(), 1);
    }

    #[test]
    fn image_pages_follow_aspect_ratio() {
        let wide = DynamicImage::new_rgb8(300, 100);
        let tall = DynamicImage::new_rgb8(100, 300);
        let bytes = PdfWriter::a4().create_from_images(&[wide, tall], "scan").unwrap();
        let handle = DocumentHandle::load(&bytes, LoadOptions::default()).unwrap();
        assert_eq!(handle.page_count(), 2);
        let first = handle.page_geometry(0).unwrap();
        let second = handle.page_geometry(1).unwrap();
        assert!(first.width() > first.height());
        assert!(second.height() > second.width());
    }

    #[test]
    fn fitted_image_is_centred_inside_margins() {
        let placement = fit_image((300, 150), (595.0, 842.0), 42.5);
        let drawn_w = 300.0 / IMAGE_DPI * 72.0 * placement.scale;
        let drawn_h = 150.0 / IMAGE_DPI * 72.0 * placement.scale;
        assert!((drawn_w - (595.0 - 85.0)).abs() < 0.01);
        assert!((placement.x - 42.5).abs() < 0.01);
        assert!((placement.y + drawn_h / 2.0 - 421.0).abs() < 0.01);
    }

    #[test]
    fn no_images_is_invalid() {
        assert!(matches!(
            PdfWriter::a4().create_from_images(&[], "x"),
            Err(BlattwerkError::InvalidRequest(_))
        ));
    }
}
