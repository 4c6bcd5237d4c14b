// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rasterizer adapter — page snapshots through the injected page renderer.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use blattwerk_core::ConverterConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::capability::PageRenderer;
use crate::image::ImageProcessor;

/// Rendering scale relative to PDF points.
pub const RENDER_SCALE: f32 = 2.0;

/// One rendered page, JPEG-encoded as a data URI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSnapshot {
    /// 0-based page index.
    pub page_index: usize,
    pub width: u32,
    pub height: u32,
    pub scale: f32,
    pub data_uri: String,
}

impl PageSnapshot {
    /// Raw JPEG bytes behind the data URI.
    pub fn jpeg_bytes(&self) -> Result<Vec<u8>> {
        let encoded = self
            .data_uri
            .strip_prefix(JPEG_DATA_URI_PREFIX)
            .ok_or_else(|| BlattwerkError::DecodeError("snapshot is not a JPEG data URI".into()))?;
        STANDARD
            .decode(encoded)
            .map_err(|err| BlattwerkError::DecodeError(format!("snapshot payload: {err}")))
    }
}

const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Renders pages of a PDF through a [`PageRenderer`].
pub struct Rasterizer<'a> {
    renderer: &'a dyn PageRenderer,
    jpeg_quality: u8,
}

impl<'a> Rasterizer<'a> {
    pub fn new(renderer: &'a dyn PageRenderer, config: &ConverterConfig) -> Self {
        Self {
            renderer,
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Number of pages in `source`, read without rendering.
    pub fn page_count(source: &[u8]) -> Result<usize> {
        let document = lopdf::Document::load_mem(source)
            .map_err(|err| BlattwerkError::DecodeError(format!("not a paged document: {err}")))?;
        Ok(document.get_pages().len())
    }

    /// Render pages `1..=min(page_count, page_limit)` as JPEG snapshots.
    #[instrument(skip_all, fields(bytes_len = source.len(), page_limit))]
    pub fn render(&self, source: &[u8], page_limit: Option<usize>) -> Result<Vec<PageSnapshot>> {
        let page_count = Self::page_count(source)?;
        let pages = page_limit.map_or(page_count, |limit| limit.min(page_count));
        info!(page_count, pages, scale = RENDER_SCALE, "Rendering page snapshots");

        let mut snapshots = Vec::with_capacity(pages);
        for index in 0..pages {
            let image = self.render_page_image(source, index as u32 + 1)?;
            let jpeg = ImageProcessor::from_dynamic(image.clone()).to_jpeg_bytes(self.jpeg_quality)?;
            debug!(page = index + 1, jpeg_bytes = jpeg.len(), "Page rendered");
            snapshots.push(PageSnapshot {
                page_index: index,
                width: image.width(),
                height: image.height(),
                scale: RENDER_SCALE,
                data_uri: format!("{JPEG_DATA_URI_PREFIX}{}", STANDARD.encode(&jpeg)),
            });
        }
        Ok(snapshots)
    }

    /// Decoded bitmap of the 1-based `page_number`.
    pub fn render_page_image(&self, source: &[u8], page_number: u32) -> Result<DynamicImage> {
        self.renderer
            .render_page(source, page_number, RENDER_SCALE)
            .map_err(|err| match err {
                BlattwerkError::DecodeError(_) | BlattwerkError::DependencyUnavailable(_) => err,
                other => BlattwerkError::DecodeError(format!("page {page_number}: {other}")),
            })
    }
}
