// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Blattwerk conversion engine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::integrity::hash_bytes;
use crate::options::Options;

/// Unique identifier for a conversion request (used to correlate log lines).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Broad grouping of formats, used by the registry for dispatch families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatFamily {
    Pdf,
    TextLike,
    Markup,
    Raster,
    Vector,
    Office,
    Archive,
}

/// Every file format the engine knows how to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    // Text-like
    Txt,
    Sql,
    Json,
    Xml,
    Csv,
    Tsv,
    Markdown,
    Log,
    Rtf,
    Html,
    // Images
    Png,
    Jpeg,
    Webp,
    Bmp,
    Tiff,
    Gif,
    Heic,
    Svg,
    // Office / legacy containers
    Docx,
    Odt,
    Xlsx,
    Xls,
    Ods,
    Pptx,
    Odp,
    Pub,
    Epub,
    Xps,
    /// Word-compatible HTML document (editable-layout export).
    Doc,
    Zip,
}

impl DocumentFormat {
    /// All formats, in declaration order.
    pub const ALL: &'static [DocumentFormat] = &[
        Self::Pdf,
        Self::Txt,
        Self::Sql,
        Self::Json,
        Self::Xml,
        Self::Csv,
        Self::Tsv,
        Self::Markdown,
        Self::Log,
        Self::Rtf,
        Self::Html,
        Self::Png,
        Self::Jpeg,
        Self::Webp,
        Self::Bmp,
        Self::Tiff,
        Self::Gif,
        Self::Heic,
        Self::Svg,
        Self::Docx,
        Self::Odt,
        Self::Xlsx,
        Self::Xls,
        Self::Ods,
        Self::Pptx,
        Self::Odp,
        Self::Pub,
        Self::Epub,
        Self::Xps,
        Self::Doc,
        Self::Zip,
    ];

    /// Raster formats the `image` crate decodes natively.
    pub const RASTER: &'static [DocumentFormat] = &[
        Self::Png,
        Self::Jpeg,
        Self::Webp,
        Self::Bmp,
        Self::Tiff,
        Self::Gif,
    ];

    /// Canonical file extension (without the dot). Also used as the token in
    /// operation names such as `convert:md:pdf`.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Txt => "txt",
            Self::Sql => "sql",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Markdown => "md",
            Self::Log => "log",
            Self::Rtf => "rtf",
            Self::Html => "html",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Gif => "gif",
            Self::Heic => "heic",
            Self::Svg => "svg",
            Self::Docx => "docx",
            Self::Odt => "odt",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Ods => "ods",
            Self::Pptx => "pptx",
            Self::Odp => "odp",
            Self::Pub => "pub",
            Self::Epub => "epub",
            Self::Xps => "xps",
            Self::Doc => "doc",
            Self::Zip => "zip",
        }
    }

    /// MIME type string for the suggested download.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Txt | Self::Log | Self::Sql => "text/plain",
            Self::Json => "application/json",
            Self::Xml => "application/xml",
            Self::Csv => "text/csv",
            Self::Tsv => "text/tab-separated-values",
            Self::Markdown => "text/markdown",
            Self::Rtf => "application/rtf",
            Self::Html => "text/html",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Gif => "image/gif",
            Self::Heic => "image/heic",
            Self::Svg => "image/svg+xml",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Odt => "application/vnd.oasis.opendocument.text",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Xls => "application/vnd.ms-excel",
            Self::Ods => "application/vnd.oasis.opendocument.spreadsheet",
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Odp => "application/vnd.oasis.opendocument.presentation",
            Self::Pub => "application/x-mspublisher",
            Self::Epub => "application/epub+zip",
            Self::Xps => "application/oxps",
            Self::Doc => "application/msword",
            Self::Zip => "application/zip",
        }
    }

    pub fn family(&self) -> FormatFamily {
        match self {
            Self::Pdf => FormatFamily::Pdf,
            Self::Txt
            | Self::Sql
            | Self::Json
            | Self::Xml
            | Self::Csv
            | Self::Tsv
            | Self::Markdown
            | Self::Log
            | Self::Rtf => FormatFamily::TextLike,
            Self::Html | Self::Doc => FormatFamily::Markup,
            Self::Png | Self::Jpeg | Self::Webp | Self::Bmp | Self::Tiff | Self::Gif | Self::Heic => {
                FormatFamily::Raster
            }
            Self::Svg => FormatFamily::Vector,
            Self::Docx
            | Self::Odt
            | Self::Xlsx
            | Self::Xls
            | Self::Ods
            | Self::Pptx
            | Self::Odp
            | Self::Pub
            | Self::Epub
            | Self::Xps => FormatFamily::Office,
            Self::Zip => FormatFamily::Archive,
        }
    }

    /// Infer document format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" => Some(Self::Txt),
            "sql" => Some(Self::Sql),
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            "csv" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "md" | "markdown" => Some(Self::Markdown),
            "log" => Some(Self::Log),
            "rtf" => Some(Self::Rtf),
            "html" | "htm" => Some(Self::Html),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            "gif" => Some(Self::Gif),
            "heic" | "heif" => Some(Self::Heic),
            "svg" => Some(Self::Svg),
            "docx" => Some(Self::Docx),
            "odt" => Some(Self::Odt),
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "ods" => Some(Self::Ods),
            "pptx" => Some(Self::Pptx),
            "odp" => Some(Self::Odp),
            "pub" => Some(Self::Pub),
            "epub" => Some(Self::Epub),
            "xps" | "oxps" => Some(Self::Xps),
            "doc" => Some(Self::Doc),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }

    /// Sniff a handful of unambiguous magic numbers.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            Some(Self::Pdf)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"GIF8") {
            Some(Self::Gif)
        } else if bytes.starts_with(b"BM") {
            Some(Self::Bmp)
        } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
            Some(Self::Tiff)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else {
            None
        }
    }

    /// Whether this is a raster image the built-in decoder understands.
    pub fn is_raster(&self) -> bool {
        Self::RASTER.contains(self)
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height), portrait.
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Dimensions in millimetres for the given orientation.
    pub fn oriented_mm(&self, orientation: Orientation) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        let (short, long) = (w.min(h) as f32, w.max(h) as f32);
        match orientation {
            Orientation::Portrait => (short, long),
            Orientation::Landscape => (long, short),
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "portrait" | "p" => Some(Self::Portrait),
            "landscape" | "l" => Some(Self::Landscape),
            _ => None,
        }
    }

    /// Pick an orientation from pixel or point dimensions.
    pub fn for_dimensions(width: f32, height: f32) -> Self {
        if width > height {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }
}

/// One input file handed to an operation.
#[derive(Debug, Clone)]
pub struct InputFile {
    /// Display name including extension, e.g. `report.pdf`.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read an input file from disk.
    pub fn read(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".to_string());
        Ok(Self { name, bytes })
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }

    /// Format inferred from the extension, falling back to magic bytes.
    pub fn format(&self) -> Option<DocumentFormat> {
        self.name
            .rsplit_once('.')
            .and_then(|(_, ext)| DocumentFormat::from_extension(ext))
            .or_else(|| DocumentFormat::sniff(&self.bytes))
    }
}

/// A single invocation of a named operation.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub id: RequestId,
    pub operation: String,
    pub inputs: Vec<InputFile>,
    pub options: Options,
}

impl ConversionRequest {
    pub fn new(operation: impl Into<String>, inputs: Vec<InputFile>) -> Self {
        Self {
            id: RequestId::new(),
            operation: operation.into(),
            inputs,
            options: Options::new(),
        }
    }

    /// Builder-style option setter.
    pub fn with_option(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.options.set(key, value);
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }
}

/// Output payload: exactly one of bytes or text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Bytes(Vec<u8>),
    Text(String),
}

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Bytes(bytes) => bytes,
            Self::Text(text) => text.as_bytes(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether a result carries real converted content or a stand-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultKind {
    /// Content-bearing output produced by a real pipeline.
    Converted,
    /// Placeholder page for a format with no decoder.
    Simulated,
}

/// Output of a request.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub payload: Payload,
    /// Suggested download filename.
    pub filename: String,
    pub mime_type: String,
    pub kind: ResultKind,
    /// SHA-256 of the payload bytes.
    pub sha256: String,
}

impl ConversionResult {
    pub fn bytes(bytes: Vec<u8>, filename: impl Into<String>, format: DocumentFormat) -> Self {
        let sha256 = hash_bytes(&bytes);
        Self {
            payload: Payload::Bytes(bytes),
            filename: filename.into(),
            mime_type: format.mime_type().to_string(),
            kind: ResultKind::Converted,
            sha256,
        }
    }

    pub fn text(text: String, filename: impl Into<String>) -> Self {
        let sha256 = hash_bytes(text.as_bytes());
        Self {
            payload: Payload::Text(text),
            filename: filename.into(),
            mime_type: DocumentFormat::Txt.mime_type().to_string(),
            kind: ResultKind::Converted,
            sha256,
        }
    }

    /// Override the MIME type (for text results with a structured type).
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = mime.into();
        self
    }

    pub fn simulated(mut self) -> Self {
        self.kind = ResultKind::Simulated;
        self
    }

    pub fn is_simulated(&self) -> bool {
        self.kind == ResultKind::Simulated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_round_trips_through_from_extension() {
        for format in DocumentFormat::ALL {
            assert_eq!(
                DocumentFormat::from_extension(format.extension()),
                Some(*format),
                "extension {} should map back",
                format.extension()
            );
        }
    }

    #[test]
    fn sniff_recognises_pdf_and_png() {
        assert_eq!(DocumentFormat::sniff(b"%PDF-1.7\n"), Some(DocumentFormat::Pdf));
        assert_eq!(
            DocumentFormat::sniff(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A]),
            Some(DocumentFormat::Png)
        );
        assert_eq!(DocumentFormat::sniff(b"hello"), None);
    }

    #[test]
    fn input_file_stem_and_format() {
        let file = InputFile::new("annual.report.PDF", b"%PDF-1.4".to_vec());
        assert_eq!(file.stem(), "annual.report");
        assert_eq!(file.format(), Some(DocumentFormat::Pdf));

        let bare = InputFile::new("scan", b"%PDF-1.4".to_vec());
        assert_eq!(bare.stem(), "scan");
        assert_eq!(bare.format(), Some(DocumentFormat::Pdf));
    }

    #[test]
    fn landscape_swaps_a4() {
        assert_eq!(PaperSize::A4.oriented_mm(Orientation::Portrait), (210.0, 297.0));
        assert_eq!(PaperSize::A4.oriented_mm(Orientation::Landscape), (297.0, 210.0));
    }

    #[test]
    fn result_payload_is_hashed() {
        let result = ConversionResult::text("hello".into(), "out.txt");
        assert_eq!(
            result.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(result.kind, ResultKind::Converted);
        assert!(result.clone().simulated().is_simulated());
    }
}
