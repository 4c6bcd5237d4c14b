// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compression policy — three tiers that shrink page boxes and pick save
// options. Embedded images are never inspected or resampled.

use blattwerk_core::error::{BlattwerkError, Result};
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::handle::{DocumentHandle, SaveOptions};

/// How aggressively `compress` shrinks a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Extreme,
    Recommended,
    Less,
}

impl CompressionLevel {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "extreme" => Ok(Self::Extreme),
            "recommended" => Ok(Self::Recommended),
            "less" => Ok(Self::Less),
            other => Err(BlattwerkError::InvalidOptions(format!(
                "unknown compression level {other:?} (expected extreme, recommended, or less)"
            ))),
        }
    }

    /// Factor applied to page box width and height.
    pub fn scale(&self) -> f32 {
        match self {
            Self::Extreme => 0.60,
            Self::Recommended => 0.85,
            Self::Less => 0.95,
        }
    }
}

/// Scale every page box about its origin and return the options to save
/// with. `Extreme` also strips every `/Info` field.
#[instrument(skip_all, fields(pages = handle.page_count(), ?level))]
pub fn apply(handle: &mut DocumentHandle, level: CompressionLevel) -> Result<SaveOptions> {
    let scale = level.scale();
    for index in 0..handle.page_count() {
        let geometry = handle.page_geometry(index)?;
        handle.set_media_box(index, scale_box(geometry.media_box, scale))?;
        if let Some(crop_box) = geometry.crop_box {
            handle.set_crop_box(index, scale_box(crop_box, scale))?;
        }
    }

    if level == CompressionLevel::Extreme {
        handle.clear_metadata();
        debug!("Metadata cleared");
    }

    info!(scale, "Compression policy applied");
    Ok(SaveOptions {
        use_object_streams: true,
        compress: true,
    })
}

fn scale_box([x0, y0, x1, y1]: [f32; 4], scale: f32) -> [f32; 4] {
    [x0, y0, x0 + (x1 - x0) * scale, y0 + (y1 - y0) * scale]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::handle::Metadata;

    fn doc() -> DocumentHandle {
        let mut handle = DocumentHandle::create_empty();
        handle.add_blank_page(600.0, 800.0).unwrap();
        handle.add_blank_page(800.0, 600.0).unwrap();
        handle.set_crop_box(0, [10.0, 10.0, 590.0, 790.0]).unwrap();
        handle
            .set_metadata(&Metadata {
                title: Some("Quarterly".into()),
                author: Some("Finance".into()),
                ..Metadata::default()
            })
            .unwrap();
        handle
    }

    fn area(handle: &DocumentHandle, index: usize) -> f32 {
        let geometry = handle.page_geometry(index).unwrap();
        geometry.width() * geometry.height()
    }

    #[test]
    fn levels_parse_and_scale() {
        assert_eq!(CompressionLevel::parse("Extreme").unwrap(), CompressionLevel::Extreme);
        assert_eq!(CompressionLevel::parse("less").unwrap().scale(), 0.95);
        assert!(matches!(
            CompressionLevel::parse("maximum"),
            Err(BlattwerkError::InvalidOptions(_))
        ));
    }

    #[test]
    fn boxes_scale_about_origin() {
        let mut handle = doc();
        let options = apply(&mut handle, CompressionLevel::Recommended).unwrap();
        assert!(options.use_object_streams && options.compress);

        let geometry = handle.page_geometry(0).unwrap();
        assert_eq!(geometry.media_box, [0.0, 0.0, 510.0, 680.0]);
        let crop = geometry.crop_box.unwrap();
        assert!((crop[2] - (10.0 + 580.0 * 0.85)).abs() < 1e-3);
        assert_eq!(handle.metadata().title.as_deref(), Some("Quarterly"));
    }

    #[test]
    fn extreme_is_never_larger_than_less() {
        let mut extreme = doc();
        let mut less = doc();
        apply(&mut extreme, CompressionLevel::Extreme).unwrap();
        apply(&mut less, CompressionLevel::Less).unwrap();
        for index in 0..2 {
            assert!(area(&extreme, index) <= area(&less, index));
        }
        assert_eq!(extreme.metadata(), Metadata::default());
    }

    #[test]
    fn compressed_document_saves_and_reloads() {
        let mut handle = doc();
        let options = apply(&mut handle, CompressionLevel::Extreme).unwrap();
        let bytes = handle.save(options).unwrap();
        let reloaded =
            DocumentHandle::load(&bytes, crate::pdf::handle::LoadOptions::default()).unwrap();
        assert_eq!(reloaded.page_count(), 2);
    }
}
