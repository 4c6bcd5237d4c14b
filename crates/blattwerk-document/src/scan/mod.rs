// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan module — image preparation ahead of recognition, and the optional
// built-in OCR provider.

use image::DynamicImage;

use crate::image::ImageProcessor;

#[cfg(feature = "ocr")]
pub mod ocr;

#[cfg(feature = "ocr")]
pub use ocr::{OcrConfig, OcrEngine};

/// Flatten transparency onto white and drop colour before recognition.
pub fn prepare_for_recognition(image: DynamicImage) -> DynamicImage {
    ImageProcessor::from_dynamic(image)
        .flatten()
        .grayscale()
        .into_dynamic()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn prepared_image_is_opaque_gray() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 0])));
        let prepared = prepare_for_recognition(source);
        assert!(!prepared.color().has_alpha());
        assert!(!prepared.color().has_color());
        assert_eq!(prepared.to_luma8().get_pixel(0, 0).0[0], 255);
    }
}
