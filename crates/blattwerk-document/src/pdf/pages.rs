// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-collection algebra — merge, split, reorder, subset, rotate, crop, and
// blank-page insertion, all composed from the document handle primitives.
//
// Operations that produce a new document copy pages into a fresh handle, so
// inputs are never modified. `rotate` and `crop` mutate in place.

use blattwerk_core::InputFile;
use blattwerk_core::error::{BlattwerkError, Result};
use tracing::{debug, info, instrument};

use super::handle::{DocumentHandle, LoadOptions};

/// A4 portrait in points, for blank pages inserted into an empty document.
const A4_POINTS: (f32, f32) = (595.28, 841.89);

/// Concatenate the pages of `handles` in input order.
#[instrument(skip_all, fields(documents = handles.len()))]
pub fn merge(handles: &[DocumentHandle]) -> Result<DocumentHandle> {
    if handles.is_empty() {
        return Err(BlattwerkError::InvalidRequest(
            "merge needs at least one document".into(),
        ));
    }

    let mut merged = DocumentHandle::create_empty();
    for handle in handles {
        let all: Vec<usize> = (0..handle.page_count()).collect();
        merged.copy_pages_from(handle, &all)?;
    }
    merged.set_metadata(&handles[0].metadata())?;

    info!(pages = merged.page_count(), "Documents merged");
    Ok(merged)
}

/// Load every file, failing on the first one that does not parse, then merge.
pub fn merge_files(files: &[InputFile]) -> Result<DocumentHandle> {
    let handles = files
        .iter()
        .map(|file| DocumentHandle::load_named(&file.name, &file.bytes, LoadOptions::default()))
        .collect::<Result<Vec<_>>>()?;
    merge(&handles)
}

/// One single-page document per page, in order.
#[instrument(skip_all, fields(pages = handle.page_count()))]
pub fn split(handle: &DocumentHandle) -> Result<Vec<DocumentHandle>> {
    let parts = (0..handle.page_count())
        .map(|index| derive(handle, &[index]))
        .collect::<Result<Vec<_>>>()?;
    info!(parts = parts.len(), "Document split");
    Ok(parts)
}

/// Page `i` of the result is a copy of source page `order[i]`. Indices may
/// omit or repeat pages.
#[instrument(skip_all, fields(order_len = order.len()))]
pub fn reorder(handle: &DocumentHandle, order: &[usize]) -> Result<DocumentHandle> {
    if order.is_empty() {
        return Err(BlattwerkError::InvalidOptions(
            "page order must name at least one page".into(),
        ));
    }
    derive(handle, order)
}

/// Keep only the pages at `indices`, in the given order.
pub fn extract_subset(handle: &DocumentHandle, indices: &[usize]) -> Result<DocumentHandle> {
    reorder(handle, indices)
}

/// Drop the pages at `indices`; the rest keep their order.
pub fn remove_subset(handle: &DocumentHandle, indices: &[usize]) -> Result<DocumentHandle> {
    let count = handle.page_count();
    if let Some(&bad) = indices.iter().find(|&&i| i >= count) {
        return Err(out_of_range(bad, count));
    }
    let keep: Vec<usize> = (0..count).filter(|i| !indices.contains(i)).collect();
    debug!(removed = count - keep.len(), kept = keep.len(), "Removing pages");
    derive(handle, &keep)
}

/// Add `delta` degrees to every page's rotation.
pub fn rotate(handle: &mut DocumentHandle, delta: i32) -> Result<()> {
    if delta % 90 != 0 {
        return Err(BlattwerkError::InvalidOptions(format!(
            "rotation must be a multiple of 90 degrees, got {delta}"
        )));
    }
    let turn = delta.rem_euclid(360);
    for index in 0..handle.page_count() {
        let current = handle.page_geometry(index)?.rotation;
        handle.set_rotation(index, current + turn)?;
    }
    debug!(delta, pages = handle.page_count(), "Pages rotated");
    Ok(())
}

/// Inset every page's CropBox by `margin` points on all four sides.
///
/// Every page is checked before any is changed, so a margin too large for
/// one page leaves the whole document untouched.
pub fn crop(handle: &mut DocumentHandle, margin: f32) -> Result<()> {
    if !margin.is_finite() || margin < 0.0 {
        return Err(BlattwerkError::InvalidOptions(format!(
            "crop margin must be non-negative, got {margin}"
        )));
    }

    let mut boxes = Vec::with_capacity(handle.page_count());
    for index in 0..handle.page_count() {
        let geometry = handle.page_geometry(index)?;
        let (w, h) = (geometry.width(), geometry.height());
        if margin >= w.min(h) / 2.0 {
            return Err(BlattwerkError::InvalidOptions(format!(
                "crop margin {margin} leaves nothing of page {} ({w} x {h})",
                index + 1
            )));
        }
        let [x0, y0, _, _] = geometry.media_box;
        boxes.push([x0 + margin, y0 + margin, x0 + w - margin, y0 + h - margin]);
    }

    for (index, rect) in boxes.into_iter().enumerate() {
        handle.set_crop_box(index, rect)?;
    }
    Ok(())
}

/// A copy of `handle` with a blank page inserted before index `at`
/// (`at == page_count` appends). The blank page takes the size of its
/// neighbour.
pub fn insert_blank_page(handle: &DocumentHandle, at: usize) -> Result<DocumentHandle> {
    let count = handle.page_count();
    if at > count {
        return Err(BlattwerkError::InvalidOptions(format!(
            "cannot insert at position {} (document has {count} pages)",
            at + 1
        )));
    }

    let (width, height) = match count {
        0 => A4_POINTS,
        _ => {
            let geometry = handle.page_geometry(at.min(count - 1))?;
            (geometry.width(), geometry.height())
        }
    };

    let mut result = DocumentHandle::create_empty();
    result.copy_pages_from(handle, &(0..at).collect::<Vec<_>>())?;
    result.add_blank_page(width, height)?;
    result.copy_pages_from(handle, &(at..count).collect::<Vec<_>>())?;
    result.set_metadata(&handle.metadata())?;
    Ok(result)
}

/// Parse a print-dialog style selection (`"1-3,5"`, `"4-"`, `"all"`) into
/// 0-based indices. Descending ranges (`"5-3"`) run backwards and repeats are
/// kept, so the result can double as a page order.
pub fn parse_page_selection(selection: &str, page_count: usize) -> Result<Vec<usize>> {
    let selection = selection.trim();
    if selection.eq_ignore_ascii_case("all") {
        return Ok((0..page_count).collect());
    }

    let mut indices = Vec::new();
    for part in selection.split(',').map(str::trim) {
        if part.is_empty() {
            continue;
        }
        match part.split_once('-') {
            Some((start, end)) => {
                let start = match start.trim() {
                    "" => 1,
                    s => page_number(s, page_count)?,
                };
                let end = match end.trim() {
                    "" => page_count,
                    e => page_number(e, page_count)?,
                };
                if start <= end {
                    indices.extend((start..=end).map(|n| n - 1));
                } else {
                    indices.extend((end..=start).rev().map(|n| n - 1));
                }
            }
            None => indices.push(page_number(part, page_count)? - 1),
        }
    }

    if indices.is_empty() {
        return Err(BlattwerkError::InvalidOptions(format!(
            "page selection {selection:?} names no pages"
        )));
    }
    Ok(indices)
}

fn page_number(text: &str, page_count: usize) -> Result<usize> {
    let number: usize = text
        .parse()
        .map_err(|_| BlattwerkError::InvalidOptions(format!("{text:?} is not a page number")))?;
    if number == 0 || number > page_count {
        return Err(BlattwerkError::InvalidOptions(format!(
            "page {number} out of range (document has {page_count} pages)"
        )));
    }
    Ok(number)
}

fn out_of_range(index: usize, count: usize) -> BlattwerkError {
    BlattwerkError::InvalidOptions(format!(
        "page {} out of range (document has {count} pages)",
        index + 1
    ))
}

/// Fresh document holding copies of `indices`, carrying over metadata.
fn derive(handle: &DocumentHandle, indices: &[usize]) -> Result<DocumentHandle> {
    let mut result = DocumentHandle::create_empty();
    result.copy_pages_from(handle, indices)?;
    result.set_metadata(&handle.metadata())?;
    Ok(result)
}
