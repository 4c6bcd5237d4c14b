// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF to images — pages rasterised through the page renderer, then
// re-encoded.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::{ConversionResult, DocumentFormat};
use tracing::{debug, info, warn};

use super::{Descriptor, Family, Job, OutputDecl};
use crate::capability::{ArchiveEntry, Capability};
use crate::image::ImageProcessor;
use crate::raster::Rasterizer;

/// Encoded for real.
const ENCODED: &[DocumentFormat] = &[
    DocumentFormat::Png,
    DocumentFormat::Jpeg,
    DocumentFormat::Bmp,
    DocumentFormat::Tiff,
];

/// PNG bytes under the target extension.
const RELABELLED: &[DocumentFormat] = &[DocumentFormat::Gif, DocumentFormat::Webp];

pub(super) fn descriptors() -> Vec<Descriptor> {
    let single = |format: DocumentFormat| {
        Descriptor::convert(
            format!("convert:pdf:{}", format.extension()),
            Family::PdfToImage,
            convert_first_page,
        )
        .inputs(vec![DocumentFormat::Pdf])
        .output(OutputDecl::Bytes(format))
        .requires(&[Capability::PageRenderer])
    };

    let mut descriptors: Vec<Descriptor> = ENCODED
        .iter()
        .map(|format| single(*format).summary(format!("Render the first page as {}", format.extension())))
        .collect();
    descriptors.extend(RELABELLED.iter().map(|format| {
        single(*format).relabelled().summary(format!(
            "Render the first page as PNG, named .{}",
            format.extension()
        ))
    }));

    descriptors.push(
        Descriptor::convert("convert:pdf:zip", Family::PdfToImage, convert_all_pages)
            .inputs(vec![DocumentFormat::Pdf])
            .output(OutputDecl::Bytes(DocumentFormat::Zip))
            .requires(&[Capability::PageRenderer, Capability::ArchiveWriter])
            .summary("Render every page as JPEG into pages/page-N.jpg inside a zip"),
    );

    descriptors
}

fn target(job: &Job<'_>) -> Result<DocumentFormat> {
    match job.descriptor.output {
        OutputDecl::Bytes(format) => Ok(format),
        OutputDecl::Text => Err(BlattwerkError::UnsupportedOperation(format!(
            "{} has no image target",
            job.descriptor.name
        ))),
    }
}

fn page_count(job: &Job<'_>) -> Result<usize> {
    let input = job.input()?;
    let count = Rasterizer::page_count(&input.bytes)
        .map_err(|err| BlattwerkError::load(&input.name, err))?;
    if count == 0 {
        return Err(BlattwerkError::load(&input.name, "document has no pages"));
    }
    Ok(count)
}

fn convert_first_page(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let input = job.input()?;
    let target = target(job)?;
    page_count(job)?;

    let rasterizer = Rasterizer::new(job.capabilities.require_renderer()?, job.config);
    let page = ImageProcessor::from_dynamic(rasterizer.render_page_image(&input.bytes, 1)?);

    let filename = job.output_name(&format!(".{}", target.extension()));
    let result = if job.descriptor.relabelled {
        warn!(%target, "No encoder for target, writing PNG bytes under its extension");
        ConversionResult::bytes(page.to_png_bytes()?, filename, target)
            .with_mime(DocumentFormat::Png.mime_type())
    } else {
        ConversionResult::bytes(page.encode(target, job.config.jpeg_quality)?, filename, target)
    };

    info!(width = page.width(), height = page.height(), %target, "First page rendered");
    Ok(vec![result])
}

fn convert_all_pages(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let input = job.input()?;
    let count = page_count(job)?;
    let rasterizer = Rasterizer::new(job.capabilities.require_renderer()?, job.config);

    let mut entries = Vec::with_capacity(count);
    for snapshot in rasterizer.render(&input.bytes, None)? {
        let path = format!("pages/page-{}.jpg", snapshot.page_index + 1);
        debug!(%path, "Page added to archive");
        entries.push(ArchiveEntry::new(path, snapshot.jpeg_bytes()?));
    }

    let zip = job.capabilities.archive()?.write(&entries)?;
    info!(pages = entries.len(), bytes = zip.len(), "Page archive written");
    Ok(vec![ConversionResult::bytes(
        zip,
        job.output_name("-pages.zip"),
        DocumentFormat::Zip,
    )])
}

#[cfg(test)]
mod tests {
    use crate::capability::Capabilities;
    use crate::convert::Registry;
    use crate::convert::tests::{marked_pdf, run};
    use crate::raster::tests::FlatRenderer;
    use blattwerk_core::{ConverterConfig, ErrorKind, InputFile};
    use std::io::Cursor;

    fn rendering_registry() -> Registry {
        Registry::standard(
            Capabilities::standard().with_renderer(FlatRenderer),
            ConverterConfig::default(),
        )
    }

    fn pdf() -> InputFile {
        InputFile::new("doc.pdf", marked_pdf(&["ONE", "TWO", "THREE"]))
    }

    #[tokio::test]
    async fn png_is_a_true_re_encode_of_page_one() {
        let results = run(&rendering_registry(), "convert:pdf:png", vec![pdf()]).await.unwrap();
        assert_eq!(results[0].filename, "doc.png");
        let image = image::load_from_memory(results[0].payload.as_bytes()).unwrap();
        assert_eq!((image.width(), image.height()), (1224, 1584));
    }

    #[tokio::test]
    async fn bmp_and_tiff_carry_their_magic() {
        let registry = rendering_registry();
        let bmp = run(&registry, "convert:pdf:bmp", vec![pdf()]).await.unwrap();
        assert!(bmp[0].payload.as_bytes().starts_with(b"BM"));
        let tiff = run(&registry, "convert:pdf:tiff", vec![pdf()]).await.unwrap();
        assert!(tiff[0].payload.as_bytes().starts_with(b"II*\0") || tiff[0].payload.as_bytes().starts_with(b"MM\0*"));
    }

    #[tokio::test]
    async fn webp_is_relabelled_png() {
        let results = run(&rendering_registry(), "convert:pdf:webp", vec![pdf()]).await.unwrap();
        assert_eq!(results[0].filename, "doc.webp");
        assert!(results[0].payload.as_bytes().starts_with(&[0x89, b'P', b'N', b'G']));
        assert_eq!(results[0].mime_type, "image/png");
    }

    #[tokio::test]
    async fn zip_holds_one_jpeg_per_page() {
        let results = run(&rendering_registry(), "convert:pdf:zip", vec![pdf()]).await.unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(results[0].payload.as_bytes().to_vec())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"pages/page-3.jpg"));
    }

    #[tokio::test]
    async fn absent_renderer_is_dependency_unavailable() {
        let registry = Registry::standard(Capabilities::standard(), ConverterConfig::default());
        for operation in ["convert:pdf:jpg", "convert:pdf:zip"] {
            let err = run(&registry, operation, vec![pdf()]).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DependencyUnavailable, "{operation}");
        }
    }

    #[tokio::test]
    async fn unreadable_pdf_names_the_file() {
        let err = run(&rendering_registry(), "convert:pdf:png", vec![InputFile::new("bad.pdf", "%PDF-1.4 junk")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LoadError);
        assert!(err.to_string().contains("bad.pdf"));
    }
}
