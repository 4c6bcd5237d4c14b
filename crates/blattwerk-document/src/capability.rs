// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability providers — the external collaborators conversions depend on.
//
// Each capability is a `Send + Sync` trait. A `Capabilities` set is handed to
// the registry at construction; descriptors declare which capabilities they
// need, and a missing one surfaces as `DependencyUnavailable` when the
// operation is called, never at startup.

use std::sync::Arc;

use blattwerk_core::error::{BlattwerkError, Result};
use image::DynamicImage;
use serde::Serialize;

/// Named capability a descriptor can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    PageRenderer,
    WordProcessingDecoder,
    SpreadsheetDecoder,
    Ocr,
    ArchiveWriter,
    SvgRasterizer,
}

impl Capability {
    /// Name used in `DependencyUnavailable` messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PageRenderer => "page renderer",
            Self::WordProcessingDecoder => "word-processing decoder",
            Self::SpreadsheetDecoder => "spreadsheet decoder",
            Self::Ocr => "OCR engine",
            Self::ArchiveWriter => "archive writer",
            Self::SvgRasterizer => "SVG rasterizer",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// -- Provider traits ----------------------------------------------------------

/// Rasterise one page of a paged document.
pub trait PageRenderer: Send + Sync {
    /// Render the 1-based `page_number` of `source` at `scale` (1.0 = 72 DPI).
    fn render_page(&self, source: &[u8], page_number: u32, scale: f32) -> Result<DynamicImage>;
}

/// Turn a word-processing container (docx, odt) into HTML markup.
pub trait WordProcessingDecoder: Send + Sync {
    fn to_html(&self, bytes: &[u8]) -> Result<String>;
}

/// Turn a workbook (xlsx, xls, ods) into HTML tables.
pub trait SpreadsheetDecoder: Send + Sync {
    fn to_html(&self, bytes: &[u8]) -> Result<String>;
}

/// Recognise text in a bitmap.
///
/// The engine's worker lives as long as the provider; `progress` receives
/// values in `0.0..=1.0`.
pub trait OcrProvider: Send + Sync {
    fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        progress: &mut dyn FnMut(f32),
    ) -> Result<String>;
}

/// One file inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Folder-qualified path, e.g. `pages/page-1.jpg`.
    pub path: String,
    pub bytes: Vec<u8>,
    /// Store without compression (required for an EPUB `mimetype`).
    pub stored: bool,
}

impl ArchiveEntry {
    pub fn new(path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
            stored: false,
        }
    }

    pub fn stored(mut self) -> Self {
        self.stored = true;
        self
    }
}

/// Pack entries into a single archive, preserving entry order.
pub trait ArchiveWriter: Send + Sync {
    fn write(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>>;
}

/// Rasterise an SVG document.
pub trait SvgRasterizer: Send + Sync {
    fn rasterize(&self, svg: &[u8]) -> Result<DynamicImage>;
}

// -- Capability set -----------------------------------------------------------

/// The providers available to a registry.
#[derive(Clone, Default)]
pub struct Capabilities {
    renderer: Option<Arc<dyn PageRenderer>>,
    word_processing: Option<Arc<dyn WordProcessingDecoder>>,
    spreadsheet: Option<Arc<dyn SpreadsheetDecoder>>,
    ocr: Option<Arc<dyn OcrProvider>>,
    archive: Option<Arc<dyn ArchiveWriter>>,
    svg: Option<Arc<dyn SvgRasterizer>>,
}

impl Capabilities {
    /// No providers at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// The built-in providers: office decoders, the zip writer, and (with the
    /// `ocr` feature and cached models) the OCR engine. There is no built-in
    /// page renderer or SVG rasterizer.
    pub fn standard() -> Self {
        let capabilities = Self::none()
            .with_word_processing(crate::office::OfficeXmlDecoder)
            .with_spreadsheet(crate::office::CalamineDecoder)
            .with_archive(crate::archive::ZipArchiveWriter);

        #[cfg(feature = "ocr")]
        let capabilities = match crate::scan::OcrEngine::with_defaults() {
            Ok(engine) => capabilities.with_ocr(engine),
            Err(err) => {
                tracing::warn!(%err, "OCR engine unavailable");
                capabilities
            }
        };

        capabilities
    }

    // -- Builders -------------------------------------------------------------

    pub fn with_renderer(mut self, renderer: impl PageRenderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn with_word_processing(mut self, decoder: impl WordProcessingDecoder + 'static) -> Self {
        self.word_processing = Some(Arc::new(decoder));
        self
    }

    pub fn with_spreadsheet(mut self, decoder: impl SpreadsheetDecoder + 'static) -> Self {
        self.spreadsheet = Some(Arc::new(decoder));
        self
    }

    pub fn with_ocr(mut self, provider: impl OcrProvider + 'static) -> Self {
        self.ocr = Some(Arc::new(provider));
        self
    }

    pub fn with_archive(mut self, writer: impl ArchiveWriter + 'static) -> Self {
        self.archive = Some(Arc::new(writer));
        self
    }

    pub fn with_svg(mut self, rasterizer: impl SvgRasterizer + 'static) -> Self {
        self.svg = Some(Arc::new(rasterizer));
        self
    }

    // -- Lookup ---------------------------------------------------------------

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::PageRenderer => self.renderer.is_some(),
            Capability::WordProcessingDecoder => self.word_processing.is_some(),
            Capability::SpreadsheetDecoder => self.spreadsheet.is_some(),
            Capability::Ocr => self.ocr.is_some(),
            Capability::ArchiveWriter => self.archive.is_some(),
            Capability::SvgRasterizer => self.svg.is_some(),
        }
    }

    /// Fail with `DependencyUnavailable` naming the first missing capability.
    pub fn check(&self, required: &[Capability]) -> Result<()> {
        match required.iter().find(|cap| !self.has(**cap)) {
            Some(missing) => Err(unavailable(*missing)),
            None => Ok(()),
        }
    }

    pub fn renderer(&self) -> Option<&dyn PageRenderer> {
        self.renderer.as_deref()
    }

    pub fn require_renderer(&self) -> Result<&dyn PageRenderer> {
        self.renderer().ok_or_else(|| unavailable(Capability::PageRenderer))
    }

    pub fn word_processing(&self) -> Result<&dyn WordProcessingDecoder> {
        self.word_processing
            .as_deref()
            .ok_or_else(|| unavailable(Capability::WordProcessingDecoder))
    }

    pub fn spreadsheet(&self) -> Result<&dyn SpreadsheetDecoder> {
        self.spreadsheet
            .as_deref()
            .ok_or_else(|| unavailable(Capability::SpreadsheetDecoder))
    }

    pub fn ocr(&self) -> Result<&dyn OcrProvider> {
        self.ocr.as_deref().ok_or_else(|| unavailable(Capability::Ocr))
    }

    pub fn archive(&self) -> Result<&dyn ArchiveWriter> {
        self.archive
            .as_deref()
            .ok_or_else(|| unavailable(Capability::ArchiveWriter))
    }

    pub fn svg(&self) -> Result<&dyn SvgRasterizer> {
        self.svg
            .as_deref()
            .ok_or_else(|| unavailable(Capability::SvgRasterizer))
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("renderer", &self.renderer.is_some())
            .field("word_processing", &self.word_processing.is_some())
            .field("spreadsheet", &self.spreadsheet.is_some())
            .field("ocr", &self.ocr.is_some())
            .field("archive", &self.archive.is_some())
            .field("svg", &self.svg.is_some())
            .finish()
    }
}

fn unavailable(capability: Capability) -> BlattwerkError {
    BlattwerkError::DependencyUnavailable(capability.name().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BlankRenderer;

    impl PageRenderer for BlankRenderer {
        fn render_page(&self, _source: &[u8], _page: u32, _scale: f32) -> Result<DynamicImage> {
            Ok(DynamicImage::new_rgb8(1, 1))
        }
    }

    #[test]
    fn standard_has_defaults_but_no_renderer() {
        let caps = Capabilities::standard();
        assert!(caps.has(Capability::WordProcessingDecoder));
        assert!(caps.has(Capability::SpreadsheetDecoder));
        assert!(caps.has(Capability::ArchiveWriter));
        assert!(!caps.has(Capability::PageRenderer));
        assert!(!caps.has(Capability::SvgRasterizer));
    }

    #[test]
    fn check_names_missing_capability() {
        let err = Capabilities::none()
            .check(&[Capability::PageRenderer])
            .unwrap_err();
        assert_eq!(err.to_string(), "dependency unavailable: page renderer");
    }

    #[test]
    fn builder_installs_renderer() {
        let caps = Capabilities::none().with_renderer(BlankRenderer);
        assert!(caps.check(&[Capability::PageRenderer]).is_ok());
        assert!(caps.require_renderer().is_ok());
    }
}
