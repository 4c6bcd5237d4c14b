// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text extraction — walks page content streams and reports what text is
// shown where.
//
// The walker tracks the graphics state (q/Q, cm) and the text state (BT/ET,
// Tf, Tm, Td, TD, T*, TL, Tc, Tw, Tz, Ts) and emits one run per show-text
// operator (Tj, TJ, ', "). Glyph advances use a fixed per-font em width
// because only the standard fonts are measured; this keeps runs ordered and
// sized closely enough for layout reconstruction.

use std::collections::HashMap;

use blattwerk_core::error::{BlattwerkError, Result};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object};
use tracing::{debug, instrument, warn};

use super::transform::{Matrix, Viewport, to_viewport};
use crate::pdf::handle::{DocumentHandle, LoadOptions, inherited, number, resolve};

/// Form XObjects nested deeper than this are not entered.
const MAX_FORM_DEPTH: usize = 8;

/// TJ adjustments at or beyond this many thousandths of an em read as a gap.
const TJ_SPACE_THRESHOLD: f32 = 250.0;

/// A run of text positioned in top-left pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    /// Top edge of the run.
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
}

impl TextRun {
    /// Baseline in pixel space.
    pub fn baseline(&self) -> f32 {
        self.y + self.font_size
    }
}

// -- Public entry points ------------------------------------------------------

/// Page-ordered text of a whole document, pages separated by a blank line.
#[instrument(skip_all, fields(bytes_len = source.len()))]
pub fn extract_text(source: &[u8]) -> Result<String> {
    let handle = open_source(source)?;
    Ok(page_texts(&handle)?.join("\n\n"))
}

/// Positioned runs of the 0-based page `page_index`, at the snapshot scale.
#[instrument(skip_all, fields(page_index))]
pub fn extract_items(source: &[u8], page_index: usize) -> Result<Vec<TextRun>> {
    let handle = open_source(source)?;
    page_runs(&handle, page_index, crate::raster::RENDER_SCALE)
}

/// Text of every page of an open document, in page order.
pub fn page_texts(handle: &DocumentHandle) -> Result<Vec<String>> {
    let mut pages = Vec::with_capacity(handle.page_count());
    for index in 0..handle.page_count() {
        let runs = page_runs(handle, index, 1.0)?;
        pages.push(join_lines(&runs));
    }
    debug!(pages = pages.len(), "Text extracted");
    Ok(pages)
}

/// Positioned runs of one page of an open document at `scale`.
pub fn page_runs(handle: &DocumentHandle, index: usize, scale: f32) -> Result<Vec<TextRun>> {
    let page_id = handle.page_id(index)?;
    let geometry = handle.page_geometry(index)?;
    let doc = handle.document();

    let content = handle.page_content(index)?;
    let resources = inherited(doc, page_id, b"Resources")
        .and_then(|obj| resolve(doc, obj).as_dict().ok());

    let mut walker = Walker::new(doc);
    walker.walk(&content, resources, State::default(), 0)?;

    let viewport = Viewport::for_page(&geometry, scale);
    Ok(walker
        .runs
        .into_iter()
        .map(|raw| {
            let placed = to_viewport(raw.transform, &viewport, raw.width, raw.height);
            TextRun {
                text: raw.text,
                x: placed.x,
                y: placed.y,
                width: placed.width,
                height: placed.height,
                font_size: placed.font_size,
            }
        })
        .collect())
}

fn open_source(source: &[u8]) -> Result<DocumentHandle> {
    DocumentHandle::load(source, LoadOptions { ignore_encryption: true }).map_err(|err| match err {
        BlattwerkError::LoadError { reason, .. } => BlattwerkError::DecodeError(reason),
        other => other,
    })
}

/// Join runs into lines: same baseline joins with a space, a baseline change
/// breaks the line.
fn join_lines(runs: &[TextRun]) -> String {
    let mut out = String::new();
    let mut previous: Option<&TextRun> = None;
    for run in runs {
        if let Some(prev) = previous {
            let tolerance = (prev.font_size * 0.3).max(1.0);
            if (run.baseline() - prev.baseline()).abs() <= tolerance {
                out.push(' ');
            } else {
                out.push('\n');
            }
        }
        out.push_str(&run.text);
        previous = Some(run);
    }
    out
}

// -- Content walker -----------------------------------------------------------

/// A run in user space before viewport placement.
struct RawRun {
    text: String,
    /// Text rendering matrix with font size and rise folded in.
    transform: Matrix,
    width: f32,
    height: f32,
}

#[derive(Debug, Clone, Copy)]
struct FontInfo {
    /// Average glyph advance as a fraction of the em.
    em_width: f32,
    /// Two-byte codes (composite fonts).
    wide: bool,
}

const DEFAULT_FONT: FontInfo = FontInfo {
    em_width: 0.5,
    wide: false,
};

/// Graphics and text state saved by `q` and restored by `Q`.
#[derive(Debug, Clone)]
struct State {
    ctm: Matrix,
    font: Option<Vec<u8>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for State {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

struct Walker<'a> {
    doc: &'a Document,
    runs: Vec<RawRun>,
}

impl<'a> Walker<'a> {
    fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            runs: Vec::new(),
        }
    }

    fn walk(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        initial: State,
        depth: usize,
    ) -> Result<()> {
        let content = Content::decode(content)
            .map_err(|err| BlattwerkError::DecodeError(format!("content stream: {err}")))?;
        let fonts = self.fonts(resources);

        let mut state = initial;
        let mut stack: Vec<State> = Vec::new();
        let mut text_matrix = Matrix::IDENTITY;
        let mut line_matrix = Matrix::IDENTITY;

        for op in &content.operations {
            let operands = &op.operands;
            let num = |i: usize| operands.get(i).and_then(number).unwrap_or(0.0);

            match op.operator.as_str() {
                "q" => stack.push(state.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        state = saved;
                    }
                }
                "cm" => {
                    let m = Matrix([num(0), num(1), num(2), num(3), num(4), num(5)]);
                    state.ctm = m.then(&state.ctm);
                }
                "BT" => {
                    text_matrix = Matrix::IDENTITY;
                    line_matrix = Matrix::IDENTITY;
                }
                "ET" => {}
                "Tf" => {
                    state.font = operands.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec);
                    state.font_size = num(1);
                }
                "Tc" => state.char_spacing = num(0),
                "Tw" => state.word_spacing = num(0),
                "Tz" => state.horizontal_scale = num(0) / 100.0,
                "TL" => state.leading = num(0),
                "Ts" => state.rise = num(0),
                "Tm" => {
                    line_matrix = Matrix([num(0), num(1), num(2), num(3), num(4), num(5)]);
                    text_matrix = line_matrix;
                }
                "Td" | "TD" => {
                    if op.operator == "TD" {
                        state.leading = -num(1);
                    }
                    line_matrix = Matrix::translate(num(0), num(1)).then(&line_matrix);
                    text_matrix = line_matrix;
                }
                "T*" => {
                    line_matrix = Matrix::translate(0.0, -state.leading).then(&line_matrix);
                    text_matrix = line_matrix;
                }
                "Tj" | "'" | "\"" => {
                    let string_at = match op.operator.as_str() {
                        "\"" => {
                            state.word_spacing = num(0);
                            state.char_spacing = num(1);
                            2
                        }
                        _ => 0,
                    };
                    if op.operator != "Tj" {
                        line_matrix = Matrix::translate(0.0, -state.leading).then(&line_matrix);
                        text_matrix = line_matrix;
                    }
                    if let Some(Object::String(bytes, _)) = operands.get(string_at) {
                        let font = font_for(&fonts, &state);
                        let mut text = String::new();
                        let start = text_matrix;
                        let advance = advance_and_decode(bytes, font, &state, &mut text);
                        text_matrix = Matrix::translate(advance, 0.0).then(&text_matrix);
                        self.emit(text, &state, start, text_matrix);
                    }
                }
                "TJ" => {
                    let Some(Object::Array(items)) = operands.first() else {
                        continue;
                    };
                    let font = font_for(&fonts, &state);
                    let start = text_matrix;
                    let mut text = String::new();
                    for item in items {
                        match item {
                            Object::String(bytes, _) => {
                                let advance = advance_and_decode(bytes, font, &state, &mut text);
                                text_matrix = Matrix::translate(advance, 0.0).then(&text_matrix);
                            }
                            other => {
                                let adjust = number(other).unwrap_or(0.0);
                                let shift = -adjust / 1000.0 * state.font_size * state.horizontal_scale;
                                text_matrix = Matrix::translate(shift, 0.0).then(&text_matrix);
                                if adjust <= -TJ_SPACE_THRESHOLD && !text.ends_with(' ') {
                                    text.push(' ');
                                }
                            }
                        }
                    }
                    self.emit(text, &state, start, text_matrix);
                }
                "Do" => {
                    if depth < MAX_FORM_DEPTH
                        && let Some(name) = operands.first().and_then(|o| o.as_name().ok())
                    {
                        self.enter_form(name, resources, &state, depth)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn emit(&mut self, text: String, state: &State, start: Matrix, end: Matrix) {
        let text = text.trim_end().to_string();
        if text.trim().is_empty() {
            return;
        }
        let font_matrix = Matrix([
            state.font_size * state.horizontal_scale,
            0.0,
            0.0,
            state.font_size,
            0.0,
            state.rise,
        ]);
        let transform = font_matrix.then(&start).then(&state.ctm);

        let (x0, y0) = start.then(&state.ctm).apply(0.0, state.rise);
        let (x1, y1) = end.then(&state.ctm).apply(0.0, state.rise);
        let width = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        let [_, _, c, d, _, _] = transform.0;
        let height = (c * c + d * d).sqrt();

        self.runs.push(RawRun {
            text,
            transform,
            width,
            height,
        });
    }

    fn enter_form(
        &mut self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        state: &State,
        depth: usize,
    ) -> Result<()> {
        let doc = self.doc;
        let Some(xobjects) = resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|x| resolve(doc, x).as_dict().ok())
        else {
            return Ok(());
        };
        let Ok(Object::Stream(form)) = xobjects.get(name).map(|o| resolve(doc, o)) else {
            return Ok(());
        };
        if !matches!(form.dict.get(b"Subtype"), Ok(Object::Name(sub)) if sub == b"Form") {
            return Ok(());
        }

        let content = form
            .decompressed_content()
            .unwrap_or_else(|_| form.content.clone());
        let form_resources = form
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve(doc, r).as_dict().ok())
            .or(resources);

        let mut inner = state.clone();
        if let Ok(Object::Array(m)) = form.dict.get(b"Matrix")
            && m.len() == 6
        {
            let values: Vec<f32> = m.iter().map(|v| number(v).unwrap_or(0.0)).collect();
            let matrix = Matrix([values[0], values[1], values[2], values[3], values[4], values[5]]);
            inner.ctm = matrix.then(&state.ctm);
        }

        if let Err(err) = self.walk(&content, form_resources, inner, depth + 1) {
            warn!(%err, "Skipping unreadable form XObject");
        }
        Ok(())
    }

    /// Font resource name to measurement info.
    fn fonts(&self, resources: Option<&Dictionary>) -> HashMap<Vec<u8>, FontInfo> {
        let mut fonts = HashMap::new();
        let Some(font_dict) = resources
            .and_then(|r| r.get(b"Font").ok())
            .and_then(|f| resolve(self.doc, f).as_dict().ok())
        else {
            return fonts;
        };

        for (name, value) in font_dict.iter() {
            let Ok(font) = resolve(self.doc, value).as_dict() else {
                continue;
            };
            let base_font = match font.get(b"BaseFont") {
                Ok(Object::Name(base)) => String::from_utf8_lossy(base).to_ascii_lowercase(),
                _ => String::new(),
            };
            let wide = matches!(font.get(b"Subtype"), Ok(Object::Name(sub)) if sub == b"Type0");
            let em_width = if base_font.contains("courier") || base_font.contains("mono") {
                0.6
            } else {
                0.5
            };
            fonts.insert(name.clone(), FontInfo { em_width, wide });
        }
        fonts
    }
}

fn font_for(fonts: &HashMap<Vec<u8>, FontInfo>, state: &State) -> FontInfo {
    state
        .font
        .as_ref()
        .and_then(|name| fonts.get(name))
        .copied()
        .unwrap_or(DEFAULT_FONT)
}

/// Decode `bytes` onto `text` and return the horizontal advance in text
/// space.
fn advance_and_decode(bytes: &[u8], font: FontInfo, state: &State, text: &mut String) -> f32 {
    let glyph = font.em_width * state.font_size;
    let mut advance = 0.0;

    if bytes.starts_with(&[0xFE, 0xFF]) || font.wide {
        let body = bytes.strip_prefix(&[0xFE, 0xFF]).unwrap_or(bytes);
        for pair in body.chunks(2) {
            let code = u16::from_be_bytes([pair[0], *pair.get(1).unwrap_or(&0)]);
            if let Some(ch) = char::from_u32(code as u32).filter(|c| !c.is_control()) {
                text.push(ch);
            }
            advance += glyph + state.char_spacing;
        }
    } else {
        for &byte in bytes {
            text.push(super::win_ansi_char(byte));
            advance += glyph + state.char_spacing;
            if byte == b' ' {
                advance += state.word_spacing;
            }
        }
    }
    advance * state.horizontal_scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::handle::SaveOptions;
    use lopdf::content::Operation;
    use lopdf::{Stream, dictionary};

    /// A one-page document whose content stream is `operations`.
    fn page_with(operations: Vec<Operation>) -> Vec<u8> {
        let mut handle = DocumentHandle::create_empty();
        handle.add_blank_page(612.0, 792.0).unwrap();
        let page_id = handle.page_id(0).unwrap();
        let doc = handle.document_mut();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let bytes = Content { operations }.encode().unwrap();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), bytes));
        let page = doc.get_dictionary_mut(page_id).unwrap();
        page.set("Contents", Object::Reference(content_id));
        page.set(
            "Resources",
            dictionary! { "Font" => dictionary! { "F1" => font_id } },
        );
        handle.save(SaveOptions::default()).unwrap()
    }

    fn show(x: i64, y: i64, text: &str) -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]
    }

    #[test]
    fn same_baseline_joins_with_space() {
        let mut ops = show(72, 700, "Hello");
        ops.extend(show(200, 700, "world"));
        ops.extend(show(72, 680, "Next line"));
        let text = extract_text(&page_with(ops)).unwrap();
        assert_eq!(text, "Hello world\nNext line");
    }

    #[test]
    fn items_are_in_pixel_space() {
        let runs = extract_items(&page_with(show(72, 700, "Marker")), 0).unwrap();
        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        assert_eq!(run.text, "Marker");
        assert!((run.font_size - 24.0).abs() < 1e-3);
        assert!((run.x - 144.0).abs() < 1e-3);
        assert!((run.baseline() - 184.0).abs() < 1e-3);
        assert!(run.width > 0.0);
    }

    #[test]
    fn tj_array_with_wide_gap_inserts_space() {
        let ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Td", vec![50.into(), 50.into()]),
            Operation::new(
                "TJ",
                vec![Object::Array(vec![
                    Object::string_literal("Sum"),
                    Object::Integer(-400),
                    Object::string_literal("mary"),
                    Object::Integer(-20),
                    Object::string_literal("!"),
                ])],
            ),
            Operation::new("ET", vec![]),
        ];
        let text = extract_text(&page_with(ops)).unwrap();
        assert_eq!(text, "Sum mary!");
    }

    #[test]
    fn quote_operator_moves_to_next_line() {
        let ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal("first")]),
            Operation::new("'", vec![Object::string_literal("second")]),
            Operation::new("ET", vec![]),
        ];
        let runs = extract_items(&page_with(ops), 0).unwrap();
        assert_eq!(runs.len(), 2);
        assert!((runs[1].baseline() - runs[0].baseline() - 28.0).abs() < 1e-3);
    }

    #[test]
    fn cm_scales_font_size() {
        let mut ops = vec![
            Operation::new("q", vec![]),
            Operation::new("cm", vec![2.into(), 0.into(), 0.into(), 2.into(), 0.into(), 0.into()]),
        ];
        ops.extend(show(10, 10, "big"));
        ops.push(Operation::new("Q", vec![]));
        ops.extend(show(10, 10, "small"));
        let runs = extract_items(&page_with(ops), 0).unwrap();
        assert!((runs[0].font_size - 48.0).abs() < 1e-3);
        assert!((runs[1].font_size - 24.0).abs() < 1e-3);
    }

    #[test]
    fn pages_join_with_blank_line() {
        let first = DocumentHandle::load(&page_with(show(72, 700, "one")), LoadOptions::default()).unwrap();
        let mut two = DocumentHandle::create_empty();
        two.copy_pages_from(&first, &[0, 0]).unwrap();
        let bytes = two.save(SaveOptions::default()).unwrap();
        assert_eq!(extract_text(&bytes).unwrap(), "one\n\none");
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = extract_text(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, BlattwerkError::DecodeError(_)));
    }
}
