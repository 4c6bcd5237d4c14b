// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Images to PDF — one page per bitmap, oriented to the image.

use blattwerk_core::error::Result;
use blattwerk_core::{ConversionResult, DocumentFormat, InputFile, OptionSpec};
use image::DynamicImage;
use tracing::debug;

use super::{Arity, Descriptor, Family, Job, OutputDecl, name_decode_error};
use crate::capability::Capability;
use crate::image::ImageProcessor;

const OPTIONS: &[OptionSpec] = &[
    OptionSpec::new("title", "", "document title (defaults to the first file name)"),
    OptionSpec::new("rotate", "0", "degrees clockwise applied to every image before layout"),
];

pub(super) fn descriptors() -> Vec<Descriptor> {
    let mut descriptors: Vec<Descriptor> = DocumentFormat::RASTER
        .iter()
        .map(|format| {
            Descriptor::convert(
                format!("convert:{}:pdf", format.extension()),
                Family::ImageToPdf,
                convert_rasters,
            )
            .inputs(vec![*format])
            .output(OutputDecl::Bytes(DocumentFormat::Pdf))
            .options(OPTIONS)
            .summary(format!("Place a {} image on its own page", format.extension()))
        })
        .collect();

    descriptors.push(
        Descriptor::convert("convert:image:pdf", Family::ImageToPdf, convert_rasters)
            .arity(Arity::AtLeast(1))
            .inputs(DocumentFormat::RASTER.to_vec())
            .output(OutputDecl::Bytes(DocumentFormat::Pdf))
            .options(OPTIONS)
            .summary("Combine any raster images into one PDF, one page each, in input order"),
    );

    descriptors.push(
        Descriptor::convert("convert:svg:pdf", Family::ImageToPdf, convert_svg)
            .inputs(vec![DocumentFormat::Svg])
            .output(OutputDecl::Bytes(DocumentFormat::Pdf))
            .options(OPTIONS)
            .requires(&[Capability::SvgRasterizer])
            .summary("Rasterise an SVG drawing onto a page"),
    );

    descriptors
}

fn convert_rasters(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let degrees = job.options.f32_or("rotate", 0.0)?;
    let images = job
        .inputs
        .iter()
        .map(|input| decode(input, degrees))
        .collect::<Result<Vec<_>>>()?;
    finish(job, &images)
}

fn convert_svg(job: &Job<'_>) -> Result<Vec<ConversionResult>> {
    let input = job.input()?;
    let image = job
        .capabilities
        .svg()?
        .rasterize(&input.bytes)
        .map_err(name_decode_error(&input.name))?;
    let flattened = ImageProcessor::from_dynamic(image)
        .rotate(job.options.f32_or("rotate", 0.0)?)
        .flatten()
        .into_dynamic();
    finish(job, &[flattened])
}

fn decode(input: &InputFile, degrees: f32) -> Result<DynamicImage> {
    let processor = ImageProcessor::from_bytes(&input.bytes).map_err(name_decode_error(&input.name))?;
    debug!(file = %input.name, width = processor.width(), height = processor.height(), "Image decoded");
    Ok(processor.rotate(degrees).flatten().into_dynamic())
}

fn finish(job: &Job<'_>, images: &[DynamicImage]) -> Result<Vec<ConversionResult>> {
    let title = job
        .options
        .str("title")
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| job.output_name(""));
    let pdf = job.writer().create_from_images(images, &title)?;
    Ok(vec![ConversionResult::bytes(
        pdf,
        job.output_name(".pdf"),
        DocumentFormat::Pdf,
    )])
}
