// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode, orient, flatten, binarise, and re-encode raster
// images with the `image` and `imageproc` crates.

use blattwerk_core::DocumentFormat;
use blattwerk_core::error::{BlattwerkError, Result};
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage, RgbaImage};
use imageproc::geometric_transformations::{self, Interpolation};
use tracing::{debug, instrument};

/// Image pipeline over a single in-memory image.
///
/// Each transformation consumes `self` and returns a new processor, so
/// calls chain:
///
/// ```ignore
/// let png = ImageProcessor::from_bytes(&upload)?
///     .rotate(90.0)
///     .flatten()
///     .to_png_bytes()?;
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode encoded bytes (PNG, JPEG, WebP, BMP, TIFF, GIF).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(data)
            .map_err(|err| BlattwerkError::DecodeError(format!("failed to decode image: {err}")))?;
        debug!(width = image.width(), height = image.height(), "Image decoded");
        Ok(Self { image })
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Rotate clockwise by `degrees`. Quarter turns are lossless; other
    /// angles resample bilinearly onto a transparent canvas.
    #[instrument(skip(self), fields(degrees))]
    pub fn rotate(self, degrees: f32) -> Self {
        let normalised = degrees.rem_euclid(360.0);
        let quarter = |target: f32| (normalised - target).abs() < 0.01;

        let image = if quarter(0.0) || quarter(360.0) {
            self.image
        } else if quarter(90.0) {
            self.image.rotate90()
        } else if quarter(180.0) {
            self.image.rotate180()
        } else if quarter(270.0) {
            self.image.rotate270()
        } else {
            let rgba: RgbaImage = self.image.to_rgba8();
            DynamicImage::ImageRgba8(geometric_transformations::rotate_about_center(
                &rgba,
                degrees.to_radians(),
                Interpolation::Bilinear,
                image::Rgba([255, 255, 255, 0]),
            ))
        };
        Self { image }
    }

    /// Composite any alpha channel onto white and drop it.
    pub fn flatten(self) -> Self {
        if !self.image.color().has_alpha() {
            return Self {
                image: DynamicImage::ImageRgb8(self.image.to_rgb8()),
            };
        }
        let rgba = self.image.to_rgba8();
        let flattened = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
            let blend = |c: u8| ((c as u16 * a as u16 + 255 * (255 - a as u16)) / 255) as u8;
            Rgb([blend(r), blend(g), blend(b)])
        });
        Self {
            image: DynamicImage::ImageRgb8(flattened),
        }
    }

    pub fn grayscale(self) -> Self {
        Self {
            image: self.image.grayscale(),
        }
    }

    /// Global black-and-white threshold chosen by Otsu's method.
    #[instrument(skip(self))]
    pub fn binarize(self) -> Self {
        let gray = self.image.to_luma8();
        let threshold = otsu_threshold(&gray);
        debug!(threshold, "Otsu threshold computed");

        let output = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            let value = gray.get_pixel(x, y).0[0];
            Luma([if value <= threshold { 0 } else { 255 }])
        });
        Self {
            image: DynamicImage::ImageLuma8(output),
        }
    }

    // -- Output ---------------------------------------------------------------

    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode as baseline JPEG at `quality` (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder)
            .map_err(|err| BlattwerkError::SaveError(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }

    /// Encode in a raster `format`. BMP and TIFF are written from RGB8 since
    /// neither encoder takes every colour type.
    pub fn encode(&self, format: DocumentFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
        match format {
            DocumentFormat::Jpeg => self.to_jpeg_bytes(jpeg_quality),
            DocumentFormat::Png => self.to_png_bytes(),
            DocumentFormat::Bmp => {
                encode_to_format(&DynamicImage::ImageRgb8(self.image.to_rgb8()), ImageFormat::Bmp)
            }
            DocumentFormat::Tiff => {
                encode_to_format(&DynamicImage::ImageRgb8(self.image.to_rgb8()), ImageFormat::Tiff)
            }
            DocumentFormat::Gif => {
                encode_to_format(&DynamicImage::ImageRgba8(self.image.to_rgba8()), ImageFormat::Gif)
            }
            other => Err(BlattwerkError::UnsupportedOperation(format!(
                "cannot encode an image as {other}"
            ))),
        }
    }
}

fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| BlattwerkError::SaveError(format!("image encoding failed: {err}")))?;
    Ok(buffer)
}

/// Threshold maximising the between-class variance of the histogram.
fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total = gray.width() as u64 * gray.height() as u64;
    if total == 0 {
        return 128;
    }
    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background = 0.0;
    let mut weight_background = 0u64;
    let mut best = (0.0f64, 0u8);

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0 {
            break;
        }
        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;
        let variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);
        if variance > best.0 {
            best = (variance, t as u8);
        }
    }
    best.1
}
