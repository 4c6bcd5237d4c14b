// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-document — Document conversion for Blattwerk.
//
// Provides the PDF page engine (merge, split, reorder, rotate, crop), overlays
// (watermarks, page numbers, Bates stamps, signatures, redaction), text
// extraction and rasterisation, and the operation registry that routes a
// conversion request to its handler. Heavy dependencies such as page
// rendering and OCR are injected as capabilities.

pub mod archive;
pub mod capability;
pub mod compare;
pub mod convert;
pub mod image;
pub mod office;
pub mod pdf;
pub mod raster;
pub mod scan;
pub mod text;

// Re-export the primary types so callers can use `blattwerk_document::Registry` etc.
pub use capability::{
    ArchiveEntry, ArchiveWriter, Capabilities, Capability, OcrProvider, PageRenderer,
    SpreadsheetDecoder, SvgRasterizer, WordProcessingDecoder,
};
pub use compare::{ComparisonReport, compare};
pub use convert::{Arity, Descriptor, Family, OutputDecl, Registry};
pub use image::ImageProcessor;
pub use pdf::{DocumentHandle, PdfWriter};
pub use raster::{PageSnapshot, Rasterizer};

#[cfg(feature = "ocr")]
pub use scan::ocr::OcrEngine;
