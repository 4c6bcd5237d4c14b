// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF page operations — the page engine, overlays, compression, comparison,
// preview and OCR exposed as registry operations.
//
// Every edited document is re-stamped with the configured producer before it
// is saved, except by `compress` at the extreme level, which strips all
// document information.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::{ConversionResult, DocumentFormat, InputFile, OptionSpec};
use tracing::{debug, info, instrument, warn};

use super::{Arity, Descriptor, Family, Job, OutputDecl, name_decode_error};
use crate::capability::Capability;
use crate::compare::compare;
use crate::image::ImageProcessor;
use crate::pdf::handle::{DocumentHandle, LoadOptions, Metadata, SaveOptions};
use crate::pdf::overlay::{self, PageTarget, TextPlacement};
use crate::pdf::pages::{self, parse_page_selection};
use crate::pdf::{CompressionLevel, compress};
use crate::raster::Rasterizer;
use crate::scan::prepare_for_recognition;

// -- Option tables ------------------------------------------------------------

const REORDER: &[OptionSpec] = &[OptionSpec::new(
    "order",
    "",
    "new page order, e.g. 3,1,2 or 5-1 (required)",
)];
const EXTRACT: &[OptionSpec] = &[OptionSpec::new("pages", "", "pages to keep, e.g. 1-3,5 (required)")];
const REMOVE: &[OptionSpec] = &[OptionSpec::new("pages", "", "pages to drop, e.g. 2,4- (required)")];
const ROTATE: &[OptionSpec] = &[OptionSpec::new("angle", "90", "degrees clockwise, a multiple of 90")];
const CROP: &[OptionSpec] = &[OptionSpec::new("margin", "20", "points trimmed from every edge")];
const WATERMARK: &[OptionSpec] = &[
    OptionSpec::new("text", "CONFIDENTIAL", "watermark text"),
    OptionSpec::new("font_size", "60", "font size in points"),
    OptionSpec::new("opacity", "0.4", "0 (invisible) to 1 (opaque)"),
];
const PAGE_NUMBERS: &[OptionSpec] = &[
    OptionSpec::new("format", "{n}", "label; {n} is the page number, {total} the page count"),
    OptionSpec::new("font_size", "12", "font size in points"),
];
const BATES: &[OptionSpec] = &[
    OptionSpec::new("prefix", "BATES", "text before the counter"),
    OptionSpec::new("digits", "6", "zero-padded counter width"),
    OptionSpec::new("start", "1", "number stamped on the first page"),
];
const SIGN: &[OptionSpec] = &[
    OptionSpec::new("page", "last", "page to sign: a page number, first, last or all"),
    OptionSpec::new("x", "400", "left edge in points"),
    OptionSpec::new("y", "60", "bottom edge in points"),
    OptionSpec::new("width", "150", "signature width in points"),
    OptionSpec::new("height", "50", "signature height in points"),
];
const COMPRESS: &[OptionSpec] = &[OptionSpec::new(
    "level",
    "recommended",
    "extreme, recommended or less",
)];
const PROTECT: &[OptionSpec] = &[OptionSpec::new("password", "", "password to record (required)")];
const METADATA: &[OptionSpec] = &[
    OptionSpec::new("title", "", "document title"),
    OptionSpec::new("author", "", "document author"),
    OptionSpec::new("subject", "", "document subject"),
    OptionSpec::new("keywords", "", "comma-separated keywords"),
];
const INSERT_BLANK: &[OptionSpec] = &[OptionSpec::new(
    "at",
    "end",
    "page number the blank page becomes, or end",
)];
const PREVIEW: &[OptionSpec] = &[OptionSpec::new(
    "limit",
    "",
    "pages to render (defaults to the configured preview limit)",
)];
const OCR: &[OptionSpec] = &[
    OptionSpec::new(
        "language",
        "",
        "recognition language (defaults to the configured OCR language)",
    ),
    OptionSpec::new("binarize", "false", "threshold pages to black and white first"),
];

const BATES_MAX_DIGITS: u32 = 12;

// -- Descriptors --------------------------------------------------------------

pub(super) fn descriptors() -> Vec<Descriptor> {
    let op = |name: &str, handler: super::ConvertFn, options: &'static [OptionSpec], summary: &str| {
        Descriptor::convert(name, Family::PageOps, handler)
            .inputs(vec![DocumentFormat::Pdf])
            .options(options)
            .summary(summary)
    };
    let with_images = || {
        let mut formats = vec![DocumentFormat::Pdf];
        formats.extend_from_slice(DocumentFormat::RASTER);
        formats
    };

    vec![
        op("merge", merge, &[], "Join documents in the order given").arity(Arity::AtLeast(2)),
        op("split", split, &[], "One single-page document per page"),
        op("reorder", reorder, REORDER, "Rearrange pages into a new order"),
        op("extract", extract, EXTRACT, "Keep only the selected pages"),
        op("remove", remove, REMOVE, "Drop the selected pages"),
        op("rotate", rotate, ROTATE, "Rotate every page"),
        op("crop", crop, CROP, "Trim a margin off every page"),
        op("watermark", watermark, WATERMARK, "Stamp diagonal translucent text across every page"),
        op("page-numbers", page_numbers, PAGE_NUMBERS, "Number pages at the bottom centre"),
        op("bates", bates, BATES, "Stamp sequential Bates numbers at the bottom right"),
        op("sign", sign, SIGN, "Place a signature image on a page")
            .arity(Arity::Pair)
            .inputs(with_images()),
        op("redact", redact, &[], "Black out fixed bands near the top of every page"),
        op("compress", compress_pdf, COMPRESS, "Shrink page boxes and compact the file"),
        op("compare", compare_pdfs, &[], "Report whether two documents carry the same amount of text")
            .arity(Arity::Pair)
            .output(OutputDecl::Text),
        op("protect", protect, PROTECT, "Mark the document as password protected (not encrypted)"),
        op("metadata", metadata, METADATA, "Set title, author, subject or keywords"),
        op("insert-blank", insert_blank, INSERT_BLANK, "Insert a blank page sized like its neighbour"),
        op("preview", preview, PREVIEW, "Page snapshots as JSON with JPEG data URIs")
            .output(OutputDecl::Text)
            .requires(&[Capability::PageRenderer]),
        op("ocr", ocr, OCR, "Recognise text in a scanned PDF or an image")
            .inputs(with_images())
            .output(OutputDecl::Text)
            .requires(&[Capability::Ocr]),
    ]
}

// -- Shared steps -------------------------------------------------------------

fn open(input: &InputFile) -> Result<DocumentHandle> {
    DocumentHandle::load_named(&input.name, &input.bytes, LoadOptions::default())
}

/// Stamp the producer and save with default options.
fn finish(job: &Job<'_>, mut handle: DocumentHandle, suffix: &str) -> Result<Vec<ConversionResult>> {
    handle.set_info("Producer", &job.config.producer)?;
    let bytes = handle.save(SaveOptions::default())?;
    Ok(vec![ConversionResult::bytes(
        bytes,
        job.output_name(suffix),
        DocumentFormat::Pdf,
    )])
}

fn selection(job: &Job<'_>, key: &str, page_count: usize) -> Result<Vec<usize>> {
    parse_page_selection(&job.options.require_str(key)?, page_count)
}

fn unit_interval(job: &Job<'_>, key: &str, default: f32) -> Result<f32> {
    let value = job.options.f32_or(key, default)?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(BlattwerkError::InvalidOptions(format!(
            "option `{key}` must be between 0 and 1, got {value}"
        )))
    }
}

// -- Page engine --------------------------------------------------------------

#[instrument(skip_all, fields(files = job.inputs.len()))]
fn merge(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let merged = pages::merge_files(job.inputs)?;
    finish(job, merged, "-merged.pdf")
}

fn split(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let input = job.input()?;
    let parts = pages::split(&open(input)?)?;
    if parts.is_empty() {
        return Err(BlattwerkError::load(&input.name, "document has no pages"));
    }
    let mut results = Vec::with_capacity(parts.len());
    for (index, part) in parts.into_iter().enumerate() {
        results.extend(finish(job, part, &format!("-page-{}.pdf", index + 1))?);
    }
    Ok(results)
}

fn reorder(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let handle = open(job.input()?)?;
    let order = selection(job, "order", handle.page_count())?;
    finish(job, pages::reorder(&handle, &order)?, "-reordered.pdf")
}

fn extract(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let handle = open(job.input()?)?;
    let indices = selection(job, "pages", handle.page_count())?;
    finish(job, pages::extract_subset(&handle, &indices)?, "-extract.pdf")
}

fn remove(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let handle = open(job.input()?)?;
    let indices = selection(job, "pages", handle.page_count())?;
    let remaining = pages::remove_subset(&handle, &indices)?;
    if remaining.page_count() == 0 {
        return Err(BlattwerkError::InvalidOptions(
            "removing every page would leave an empty document".into(),
        ));
    }
    finish(job, remaining, "-removed.pdf")
}

fn rotate(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let mut handle = open(job.input()?)?;
    pages::rotate(&mut handle, job.options.i32_or("angle", 90)?)?;
    finish(job, handle, "-rotated.pdf")
}

fn crop(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let mut handle = open(job.input()?)?;
    pages::crop(&mut handle, job.options.f32_or("margin", 20.0)?)?;
    finish(job, handle, "-cropped.pdf")
}

fn insert_blank(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let handle = open(job.input()?)?;
    let count = handle.page_count();
    let at = job.options.str_or("at", "end");
    let index = if at.trim().eq_ignore_ascii_case("end") {
        count
    } else {
        match at.trim().parse::<usize>() {
            Ok(position) if (1..=count + 1).contains(&position) => position - 1,
            _ => {
                return Err(BlattwerkError::InvalidOptions(format!(
                    "`at` must be end or a page number from 1 to {}, got {at:?}",
                    count + 1
                )));
            }
        }
    };
    finish(job, pages::insert_blank_page(&handle, index)?, "-with-blank.pdf")
}

// -- Overlays -----------------------------------------------------------------

fn watermark(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let mut handle = open(job.input()?)?;
    let text = job.options.require_str("text")?;
    let placement = TextPlacement::watermark(
        job.positive("font_size", 60.0, 400.0)?,
        unit_interval(job, "opacity", 0.4)?,
    );
    overlay::overlay_text(&mut handle, &text, &placement)?;
    finish(job, handle, "-watermarked.pdf")
}

fn page_numbers(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let mut handle = open(job.input()?)?;
    let format = job.options.require_str("format")?;
    let placement = TextPlacement::page_numbers(job.positive("font_size", 12.0, 72.0)?);
    overlay::overlay_text(&mut handle, &format, &placement)?;
    finish(job, handle, "-numbered.pdf")
}

fn bates(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let mut handle = open(job.input()?)?;
    let prefix = job.options.str_or("prefix", "BATES");
    let digits = job.options.u32_or("digits", 6)?;
    if !(1..=BATES_MAX_DIGITS).contains(&digits) {
        return Err(BlattwerkError::InvalidOptions(format!(
            "`digits` must be from 1 to {BATES_MAX_DIGITS}, got {digits}"
        )));
    }
    let start = job.options.u32_or("start", 1)?;
    let placement = TextPlacement::bates(digits as usize, u64::from(start));
    overlay::overlay_text(&mut handle, &prefix, &placement)?;
    finish(job, handle, "-bates.pdf")
}

fn sign(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let (document, signature) = match job.inputs {
        [document, signature]
            if document.format() == Some(DocumentFormat::Pdf)
                && signature.format().is_some_and(|format| format.is_raster()) =>
        {
            (document, signature)
        }
        _ => {
            return Err(BlattwerkError::InvalidRequest(
                "sign takes a PDF followed by a signature image".into(),
            ));
        }
    };

    let mut handle = open(document)?;
    let image = ImageProcessor::from_bytes(&signature.bytes)
        .map_err(name_decode_error(&signature.name))?
        .into_dynamic();
    let target = page_target(&job.options.str_or("page", "last"))?;
    let rect = [
        job.options.f32_or("x", 400.0)?,
        job.options.f32_or("y", 60.0)?,
        job.options.f32_or("width", 150.0)?,
        job.options.f32_or("height", 50.0)?,
    ];
    overlay::overlay_image(&mut handle, &image, target, rect)?;
    info!(signature = %signature.name, ?target, "Signature placed");
    finish(job, handle, "-signed.pdf")
}

fn page_target(value: &str) -> Result<PageTarget> {
    match value.trim().to_ascii_lowercase().as_str() {
        "last" => Ok(PageTarget::Last),
        "first" => Ok(PageTarget::Page(0)),
        "all" => Ok(PageTarget::All),
        other => match other.parse::<usize>() {
            Ok(number) if number >= 1 => Ok(PageTarget::Page(number - 1)),
            _ => Err(BlattwerkError::InvalidOptions(format!(
                "`page` must be a page number, first, last or all, got {value:?}"
            ))),
        },
    }
}

fn redact(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let mut handle = open(job.input()?)?;
    overlay::redact(&mut handle)?;
    finish(job, handle, "-redacted.pdf")
}

// -- Document-level -----------------------------------------------------------

fn compress_pdf(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let input = job.input()?;
    let mut handle = open(input)?;
    let level = CompressionLevel::parse(&job.options.str_or("level", "recommended"))?;
    let options = compress::apply(&mut handle, level)?;
    if level != CompressionLevel::Extreme {
        handle.set_info("Producer", &job.config.producer)?;
    }
    let bytes = handle.save(options)?;
    info!(before = input.bytes.len(), after = bytes.len(), ?level, "Document compressed");
    Ok(vec![ConversionResult::bytes(
        bytes,
        job.output_name("-compressed.pdf"),
        DocumentFormat::Pdf,
    )])
}

fn compare_pdfs(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let [a, b] = job.inputs else {
        return Err(BlattwerkError::InvalidRequest("compare takes two documents".into()));
    };
    // Load errors name the file; the comparison itself reads anonymously.
    open(a)?;
    open(b)?;
    let report = compare(&a.name, &a.bytes, &b.name, &b.bytes)?;
    Ok(vec![ConversionResult::text(
        report.to_string(),
        format!("{}-vs-{}.txt", a.stem(), b.stem()),
    )])
}

fn protect(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let mut handle = open(job.input()?)?;
    let password = job.options.require_str("password")?;
    warn!(password_len = password.len(), "Protection is recorded in metadata only, the document is not encrypted");
    handle.set_info("Protection", "Password protected")?;
    finish(job, handle, "-protected.pdf")
}

fn metadata(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let mut handle = open(job.input()?)?;
    let field = |key: &str| job.options.str(key).filter(|value| !value.trim().is_empty());
    let update = Metadata {
        title: field("title"),
        author: field("author"),
        subject: field("subject"),
        keywords: field("keywords"),
        ..Metadata::default()
    };
    if update == Metadata::default() {
        return Err(BlattwerkError::InvalidOptions(
            "set at least one of title, author, subject or keywords".into(),
        ));
    }
    handle.set_metadata(&update)?;
    finish(job, handle, "-metadata.pdf")
}

// -- Rendering ----------------------------------------------------------------

fn preview(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let input = job.input()?;
    open(input)?;
    let limit = job.options.u32_or("limit", job.config.preview_page_limit)?;
    if limit == 0 {
        return Err(BlattwerkError::InvalidOptions("`limit` must be at least 1".into()));
    }
    let rasterizer = Rasterizer::new(job.capabilities.require_renderer()?, job.config);
    let snapshots = rasterizer.render(&input.bytes, Some(limit as usize))?;
    let json = serde_json::to_string_pretty(&snapshots)?;
    Ok(vec![
        ConversionResult::text(json, job.output_name("-preview.json"))
            .with_mime(DocumentFormat::Json.mime_type()),
    ])
}

#[instrument(skip_all)]
fn ocr(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let input = job.input()?;
    let engine = job.capabilities.ocr()?;
    let language = job
        .options
        .str("language")
        .filter(|language| !language.trim().is_empty())
        .unwrap_or_else(|| job.config.ocr_language.clone());
    let binarize = job.options.bool_or("binarize", false)?;

    let images = if job.source_format()? == DocumentFormat::Pdf {
        open(input)?;
        let rasterizer = Rasterizer::new(job.capabilities.require_renderer()?, job.config);
        let count = Rasterizer::page_count(&input.bytes)?;
        (1..=count as u32)
            .map(|page| rasterizer.render_page_image(&input.bytes, page))
            .collect::<Result<Vec<_>>>()?
    } else {
        vec![
            ImageProcessor::from_bytes(&input.bytes)
                .map_err(name_decode_error(&input.name))?
                .into_dynamic(),
        ]
    };

    let mut pages = Vec::with_capacity(images.len());
    for (index, image) in images.into_iter().enumerate() {
        let mut report = |fraction: f32| debug!(page = index + 1, fraction, "Recognition progress");
        let mut prepared = prepare_for_recognition(image);
        if binarize {
            prepared = ImageProcessor::from_dynamic(prepared).binarize().into_dynamic();
        }
        let text = engine.recognize(&prepared, &language, &mut report)?;
        pages.push(text.trim().to_string());
    }

    if pages.iter().all(String::is_empty) {
        return Err(BlattwerkError::DecodeError(format!(
            "no text recognised in {}",
            input.name
        )));
    }
    info!(pages = pages.len(), %language, "Recognition complete");
    Ok(vec![ConversionResult::text(
        pages.join("\n\n"),
        job.output_name(".txt"),
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capabilities, OcrProvider};
    use crate::convert::Registry;
    use crate::convert::tests::{marked_pdf, registry, run};
    use crate::raster::tests::FlatRenderer;
    use crate::text::page_texts;
    use blattwerk_core::{ConversionRequest, ConverterConfig, ErrorKind};
    use image::DynamicImage;

    fn reload(result: &ConversionResult) -> DocumentHandle {
        DocumentHandle::load(result.payload.as_bytes(), LoadOptions::default()).unwrap()
    }

    fn abc() -> InputFile {
        InputFile::new("abc.pdf", marked_pdf(&["A", "B", "C"]))
    }

    async fn run_with(operation: &str, inputs: Vec<InputFile>, options: &[(&str, &str)]) -> Result<Vec<ConversionResult>> {
        let mut request = ConversionRequest::new(operation, inputs);
        for (key, value) in options {
            request.options.parse_pair(&format!("{key}={value}")).unwrap();
        }
        registry().execute(request).await
    }

    struct EchoOcr;

    impl OcrProvider for EchoOcr {
        fn recognize(&self, image: &DynamicImage, language: &str, progress: &mut dyn FnMut(f32)) -> Result<String> {
            progress(1.0);
            Ok(format!("{language} {}x{}", image.width(), image.height()))
        }
    }

    #[tokio::test]
    async fn reorder_follows_the_order_option() {
        let results = run_with("reorder", vec![abc()], &[("order", "3,1,2")]).await.unwrap();
        let texts = page_texts(&reload(&results[0])).unwrap();
        assert_eq!(texts, vec!["C", "A", "B"]);
    }

    #[tokio::test]
    async fn results_carry_the_producer() {
        let results = run_with("rotate", vec![abc()], &[]).await.unwrap();
        let handle = reload(&results[0]);
        assert_eq!(handle.metadata().producer.as_deref(), Some("Blattwerk"));
        assert_eq!(handle.page_geometry(0).unwrap().rotation, 90);
    }

    #[tokio::test]
    async fn split_names_each_page() {
        let results = run(&registry(), "split", vec![abc()]).await.unwrap();
        let names: Vec<&str> = results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["abc-page-1.pdf", "abc-page-2.pdf", "abc-page-3.pdf"]);
    }

    #[tokio::test]
    async fn merge_fails_fast_naming_the_bad_file() {
        let err = run(
            &registry(),
            "merge",
            vec![abc(), InputFile::new("second.pdf", "%PDF-1.4 broken")],
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LoadError);
        assert!(err.to_string().contains("second.pdf"));
    }

    #[tokio::test]
    async fn required_options_are_enforced() {
        for operation in ["reorder", "extract", "remove", "protect"] {
            let err = run(&registry(), operation, vec![abc()]).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidOptions, "{operation}");
        }
        let err = run(&registry(), "metadata", vec![abc()]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOptions);
    }

    #[tokio::test]
    async fn removing_everything_is_refused() {
        let err = run_with("remove", vec![abc()], &[("pages", "all")]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOptions);
    }

    #[tokio::test]
    async fn insert_blank_at_position() {
        let results = run_with("insert-blank", vec![abc()], &[("at", "2")]).await.unwrap();
        let texts = page_texts(&reload(&results[0])).unwrap();
        assert_eq!(texts, vec!["A", "", "B", "C"]);
        let err = run_with("insert-blank", vec![abc()], &[("at", "9")]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOptions);
    }

    #[tokio::test]
    async fn metadata_and_protect_update_info() {
        let results = run_with("metadata", vec![abc()], &[("title", "Ledger"), ("author", "Ops")])
            .await
            .unwrap();
        let meta = reload(&results[0]).metadata();
        assert_eq!(meta.title.as_deref(), Some("Ledger"));
        assert_eq!(meta.author.as_deref(), Some("Ops"));

        let protected = run_with("protect", vec![abc()], &[("password", "s3cret")]).await.unwrap();
        assert_eq!(protected[0].filename, "abc-protected.pdf");
    }

    #[tokio::test]
    async fn extreme_compression_strips_info() {
        let results = run_with("compress", vec![abc()], &[("level", "extreme")]).await.unwrap();
        let handle = reload(&results[0]);
        assert_eq!(handle.metadata(), Metadata::default());
        assert!((handle.page_geometry(0).unwrap().width() - 612.0 * 0.6).abs() < 0.01);

        let err = run_with("compress", vec![abc()], &[("level", "maximum")]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOptions);
    }

    #[tokio::test]
    async fn compare_reports_identical_text() {
        let results = run(&registry(), "compare", vec![abc(), abc()]).await.unwrap();
        let report = results[0].payload.as_text().unwrap();
        assert!(report.contains("Verdict: Binary Identical Content"));
        assert!(report.contains("Character delta: 0"));
        assert_eq!(results[0].filename, "abc-vs-abc.txt");
    }

    #[tokio::test]
    async fn sign_wants_pdf_then_image() {
        let png = ImageProcessor::from_dynamic(DynamicImage::new_rgba8(30, 10))
            .to_png_bytes()
            .unwrap();
        let signature = InputFile::new("sig.png", png);
        let results = run(&registry(), "sign", vec![abc(), signature.clone()]).await.unwrap();
        assert_eq!(reload(&results[0]).page_count(), 3);

        let err = run(&registry(), "sign", vec![signature, abc()]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn page_targets_parse() {
        assert_eq!(page_target("last").unwrap(), PageTarget::Last);
        assert_eq!(page_target("2").unwrap(), PageTarget::Page(1));
        assert!(page_target("0").is_err());
    }

    #[tokio::test]
    async fn preview_returns_snapshot_json() {
        let registry = Registry::standard(
            Capabilities::standard().with_renderer(FlatRenderer),
            ConverterConfig::default(),
        );
        let request = ConversionRequest::new("preview", vec![abc()]).with_option("limit", 2);
        let results = registry.execute(request).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(results[0].payload.as_text().unwrap()).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[1]["page_index"], 1);
    }

    #[tokio::test]
    async fn ocr_runs_per_page_through_the_renderer() {
        let registry = Registry::standard(
            Capabilities::standard().with_ocr(EchoOcr).with_renderer(FlatRenderer),
            ConverterConfig::default(),
        );
        let results = run(&registry, "ocr", vec![abc()]).await.unwrap();
        let text = results[0].payload.as_text().unwrap();
        assert_eq!(text.matches("eng 1224x1584").count(), 3);

        let no_renderer = Registry::standard(Capabilities::none().with_ocr(EchoOcr), ConverterConfig::default());
        let err = run(&no_renderer, "ocr", vec![abc()]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DependencyUnavailable);
    }
}
