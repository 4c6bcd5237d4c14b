// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page overlays — watermarks, page numbers, Bates stamps, images, filled
// rectangles, and redaction blocks drawn on top of existing page content.
//
// Each overlay appends a content stream after the page's own streams, which
// are bracketed by `q`/`Q` so their graphics state cannot leak into the
// overlay. Page resources are copied inline before anything is added, so
// dictionaries shared between pages are never modified.

use blattwerk_core::error::{BlattwerkError, Result};
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, info, instrument};

use super::handle::{DocumentHandle, inherited, resolve};
use crate::text::encode_win_ansi;

/// Average Helvetica advance as a fraction of the font size.
const HELVETICA_AVERAGE_WIDTH: f32 = 0.5;

/// Helvetica cap height as a fraction of the font size.
const HELVETICA_CAP_HEIGHT: f32 = 0.72;

/// Distance of page numbers and Bates stamps from the page edges, in points.
const EDGE_OFFSET: f32 = 30.0;

/// Where and how a per-page text overlay is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextPlacement {
    /// Centred on the page and rotated, drawn in grey at `opacity`.
    Watermark {
        font_size: f32,
        opacity: f32,
        angle_degrees: f32,
    },
    /// Bottom centre. The text is a format where `{n}` is the 1-based page
    /// number and `{total}` the page count.
    PageNumbers { font_size: f32 },
    /// Bottom right. The text is a prefix followed by a zero-padded counter
    /// running from `start`.
    Bates {
        font_size: f32,
        digits: usize,
        start: u64,
    },
}

impl TextPlacement {
    pub fn watermark(font_size: f32, opacity: f32) -> Self {
        Self::Watermark {
            font_size,
            opacity,
            angle_degrees: 45.0,
        }
    }

    pub fn page_numbers(font_size: f32) -> Self {
        Self::PageNumbers { font_size }
    }

    pub fn bates(digits: usize, start: u64) -> Self {
        Self::Bates {
            font_size: 10.0,
            digits,
            start,
        }
    }

    fn font_size(&self) -> f32 {
        match *self {
            Self::Watermark { font_size, .. }
            | Self::PageNumbers { font_size }
            | Self::Bates { font_size, .. } => font_size,
        }
    }

    fn opacity(&self) -> f32 {
        match *self {
            Self::Watermark { opacity, .. } => opacity,
            _ => 1.0,
        }
    }

    /// Text drawn on the page at `index` of `total`.
    pub fn label(&self, text: &str, index: usize, total: usize) -> String {
        match *self {
            Self::Watermark { .. } => text.to_string(),
            Self::PageNumbers { .. } => text
                .replace("{n}", &(index + 1).to_string())
                .replace("{total}", &total.to_string()),
            Self::Bates { digits, start, .. } => {
                format!("{text}{:0digits$}", start + index as u64)
            }
        }
    }
}

/// Which pages an image or rectangle overlay applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTarget {
    All,
    /// 0-based page index.
    Page(usize),
    Last,
}

impl PageTarget {
    fn indices(&self, page_count: usize) -> Result<Vec<usize>> {
        match *self {
            Self::All => Ok((0..page_count).collect()),
            Self::Last if page_count > 0 => Ok(vec![page_count - 1]),
            Self::Page(index) if index < page_count => Ok(vec![index]),
            _ => Err(BlattwerkError::InvalidOptions(format!(
                "{self:?} is not a page of a {page_count}-page document"
            ))),
        }
    }
}

/// `[x, y, width, height]` in PDF points from the bottom-left corner.
pub type Rect = [f32; 4];

// -- Text ---------------------------------------------------------------------

/// Draw `text` on every page according to `placement`.
#[instrument(skip_all, fields(pages = handle.page_count(), ?placement))]
pub fn overlay_text(handle: &mut DocumentHandle, text: &str, placement: &TextPlacement) -> Result<()> {
    if !(0.0..=1.0).contains(&placement.opacity()) {
        return Err(BlattwerkError::InvalidOptions(format!(
            "opacity must be between 0 and 1, got {}",
            placement.opacity()
        )));
    }
    let font_size = placement.font_size();
    if font_size <= 0.0 {
        return Err(BlattwerkError::InvalidOptions(format!(
            "font size must be positive, got {font_size}"
        )));
    }

    let total = handle.page_count();
    for index in 0..total {
        let label = placement.label(text, index, total);
        let [x0, y0, x1, y1] = handle.page_geometry(index)?.visible_box();
        let width = measure(&label, font_size);

        let page_id = handle.page_id(index)?;
        let doc = handle.document_mut();
        let mut resources = own_resources(doc, page_id);
        let font_name = add_resource(&mut resources, b"Font", "BwF", helvetica(doc));

        let mut operations = vec![Operation::new("q", vec![])];

        let (matrix, gray) = match *placement {
            TextPlacement::Watermark {
                opacity,
                angle_degrees,
                ..
            } => {
                let gs_name = add_resource(&mut resources, b"ExtGState", "BwGS", opacity_state(opacity));
                operations.push(Operation::new("gs", vec![Object::Name(gs_name.into_bytes())]));

                let (sin, cos) = angle_degrees.to_radians().sin_cos();
                let (cx, cy) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);
                let half_w = width / 2.0;
                let half_h = font_size * HELVETICA_CAP_HEIGHT / 2.0;
                let tx = cx - cos * half_w + sin * half_h;
                let ty = cy - sin * half_w - cos * half_h;
                ([cos, sin, -sin, cos, tx, ty], 0.5)
            }
            TextPlacement::PageNumbers { .. } => {
                let tx = (x0 + x1) / 2.0 - width / 2.0;
                ([1.0, 0.0, 0.0, 1.0, tx, y0 + EDGE_OFFSET], 0.0)
            }
            TextPlacement::Bates { .. } => {
                let tx = x1 - EDGE_OFFSET - width;
                ([1.0, 0.0, 0.0, 1.0, tx, y0 + EDGE_OFFSET * 0.66], 0.0)
            }
        };

        operations.extend([
            Operation::new("g", vec![Object::Real(gray)]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font_name.into_bytes()), Object::Real(font_size)],
            ),
            Operation::new("Tm", matrix.iter().map(|v| Object::Real(*v)).collect()),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(&label), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);

        append_overlay(handle.document_mut(), page_id, resources, operations)?;
    }

    info!(pages = total, "Text overlay applied");
    Ok(())
}

// -- Images and rectangles ----------------------------------------------------

/// Draw `image` into `rect` on the targeted pages. An alpha channel becomes a
/// soft mask.
#[instrument(skip_all, fields(width = image.width(), height = image.height(), ?target))]
pub fn overlay_image(
    handle: &mut DocumentHandle,
    image: &DynamicImage,
    target: PageTarget,
    rect: Rect,
) -> Result<()> {
    validate_rect(rect)?;
    let indices = target.indices(handle.page_count())?;
    let image_id = add_image_xobject(handle.document_mut(), image);

    for index in indices {
        let page_id = handle.page_id(index)?;
        let doc = handle.document_mut();
        let mut resources = own_resources(doc, page_id);
        let name = add_resource(&mut resources, b"XObject", "BwIm", Object::Reference(image_id));

        let [x, y, w, h] = rect;
        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                [w, 0.0, 0.0, h, x, y].iter().map(|v| Object::Real(*v)).collect(),
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ];
        append_overlay(doc, page_id, resources, operations)?;
        debug!(page = index + 1, "Image placed");
    }
    Ok(())
}

/// Fill `rect` with an opaque RGB `color` (components in `0.0..=1.0`).
pub fn overlay_rect(
    handle: &mut DocumentHandle,
    target: PageTarget,
    rect: Rect,
    color: [f32; 3],
) -> Result<()> {
    validate_rect(rect)?;
    for index in target.indices(handle.page_count())? {
        fill_rects(handle, index, &[rect], color)?;
    }
    Ok(())
}

/// Black out two fixed bands near the top of every page: a full-width band
/// 120 pt below the top edge and a shorter one 70 pt further down.
#[instrument(skip_all, fields(pages = handle.page_count()))]
pub fn redact(handle: &mut DocumentHandle) -> Result<()> {
    for index in 0..handle.page_count() {
        let [x0, _, x1, y1] = handle.page_geometry(index)?.visible_box();
        let band = (x1 - x0 - 100.0).max(0.0);
        let rects = [
            [x0 + 50.0, y1 - 150.0, band, 30.0],
            [x0 + 50.0, y1 - 220.0, band * 0.6, 30.0],
        ];
        fill_rects(handle, index, &rects, [0.0, 0.0, 0.0])?;
    }
    info!(pages = handle.page_count(), "Redaction blocks applied");
    Ok(())
}

fn fill_rects(handle: &mut DocumentHandle, index: usize, rects: &[Rect], color: [f32; 3]) -> Result<()> {
    let page_id = handle.page_id(index)?;
    let doc = handle.document_mut();
    let resources = own_resources(doc, page_id);

    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new("rg", color.iter().map(|c| Object::Real(*c)).collect()),
    ];
    for rect in rects {
        operations.push(Operation::new(
            "re",
            rect.iter().map(|v| Object::Real(*v)).collect(),
        ));
        operations.push(Operation::new("f", vec![]));
    }
    operations.push(Operation::new("Q", vec![]));
    append_overlay(doc, page_id, resources, operations)
}

fn validate_rect([_, _, w, h]: Rect) -> Result<()> {
    if w <= 0.0 || h <= 0.0 {
        return Err(BlattwerkError::InvalidOptions(format!(
            "overlay rectangle needs a positive size, got {w} x {h}"
        )));
    }
    Ok(())
}

// -- Content and resource plumbing -------------------------------------------

/// Estimated Helvetica width of `text` at `font_size`.
fn measure(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * HELVETICA_AVERAGE_WIDTH
}

fn helvetica(doc: &mut Document) -> Object {
    Object::Reference(doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ])))
}

fn opacity_state(opacity: f32) -> Object {
    Object::Dictionary(Dictionary::from_iter([
        ("Type", Object::Name(b"ExtGState".to_vec())),
        ("ca", Object::Real(opacity)),
        ("CA", Object::Real(opacity)),
    ]))
}

fn add_image_xobject(doc: &mut Document, image: &DynamicImage) -> ObjectId {
    let rgb = image.to_rgb8();
    let mut dict = Dictionary::from_iter([
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(rgb.width() as i64)),
        ("Height", Object::Integer(rgb.height() as i64)),
        ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
    ]);

    if image.color().has_alpha() {
        let alpha: Vec<u8> = image.to_rgba8().pixels().map(|p| p.0[3]).collect();
        let mask_id = doc.add_object(Stream::new(
            Dictionary::from_iter([
                ("Type", Object::Name(b"XObject".to_vec())),
                ("Subtype", Object::Name(b"Image".to_vec())),
                ("Width", Object::Integer(rgb.width() as i64)),
                ("Height", Object::Integer(rgb.height() as i64)),
                ("ColorSpace", Object::Name(b"DeviceGray".to_vec())),
                ("BitsPerComponent", Object::Integer(8)),
            ]),
            alpha,
        ));
        dict.set("SMask", Object::Reference(mask_id));
    }

    doc.add_object(Stream::new(dict, rgb.into_raw()))
}

/// The page's effective resources as an inline dictionary, with the
/// sub-dictionaries overlays write to also copied inline.
fn own_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut resources = match inherited(doc, page_id, b"Resources").map(|obj| resolve(doc, obj)) {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    for key in [b"Font".as_slice(), b"ExtGState", b"XObject"] {
        let owned = resources.get(key).ok().map(|value| resolve(doc, value).clone());
        if let Some(Object::Dictionary(dict)) = owned {
            resources.set(key, Object::Dictionary(dict));
        }
    }
    resources
}

/// Insert `value` under a fresh `prefix<n>` name in `resources[category]`.
fn add_resource(resources: &mut Dictionary, category: &[u8], prefix: &str, value: Object) -> String {
    let mut sub = match resources.get(category) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    let mut n = 1;
    while sub.has(format!("{prefix}{n}").as_bytes()) {
        n += 1;
    }
    let name = format!("{prefix}{n}");
    sub.set(name.as_bytes(), value);
    resources.set(category, Object::Dictionary(sub));
    name
}

fn existing_contents(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let contents = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Contents").ok());
    match contents {
        Some(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            Ok(_) => vec![Object::Reference(*id)],
            Err(_) => Vec::new(),
        },
        Some(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

fn append_overlay(
    doc: &mut Document,
    page_id: ObjectId,
    resources: Dictionary,
    operations: Vec<Operation>,
) -> Result<()> {
    let overlay = Content { operations }
        .encode()
        .map_err(|err| BlattwerkError::SaveError(format!("overlay content: {err}")))?;

    let existing = existing_contents(doc, page_id);
    let mut contents = Vec::with_capacity(existing.len() + 3);
    if !existing.is_empty() {
        contents.push(Object::Reference(
            doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec())),
        ));
        contents.extend(existing);
        contents.push(Object::Reference(
            doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec())),
        ));
    }
    contents.push(Object::Reference(
        doc.add_object(Stream::new(Dictionary::new(), overlay)),
    ));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|err| BlattwerkError::SaveError(format!("page {page_id:?}: {err}")))?;
    page.set("Contents", Object::Array(contents));
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}
