// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion registry — every operation Blattwerk offers, as data.
//
// A `Descriptor` names an operation, the inputs it accepts, the options it
// understands and the capabilities it needs. `Registry::execute` validates a
// request against its descriptor in a fixed order (name, arity, input
// formats, capabilities, options) before any handler touches the input bytes.

mod image_to_pdf;
mod office;
mod pdf_ops;
mod pdf_to_image;
mod pdf_to_text;
mod text_to_pdf;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::{
    ConversionRequest, ConversionResult, ConverterConfig, DocumentFormat, InputFile, OptionSpec,
    Options, Orientation,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::capability::{Capabilities, Capability};
use crate::pdf::PdfWriter;

pub use text_to_pdf::{COLUMN_SEPARATOR, prepare_text};

// -- Descriptor model ---------------------------------------------------------

/// Broad kind of operation, used for grouping in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Family {
    TextToPdf,
    ImageToPdf,
    PdfToText,
    PdfToImage,
    Office,
    PageOps,
}

impl Family {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TextToPdf => "text to PDF",
            Self::ImageToPdf => "image to PDF",
            Self::PdfToText => "PDF to text",
            Self::PdfToImage => "PDF to image",
            Self::Office => "office to PDF",
            Self::PageOps => "page operations",
        }
    }
}

/// How many input files an operation takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Arity {
    Single,
    Pair,
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Self::Single => count == 1,
            Self::Pair => count == 2,
            Self::AtLeast(min) => count >= min,
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => f.write_str("exactly 1 file"),
            Self::Pair => f.write_str("exactly 2 files"),
            Self::AtLeast(1) => f.write_str("1 or more files"),
            Self::AtLeast(n) => write!(f, "{n} or more files"),
        }
    }
}

/// Shape of an operation's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputDecl {
    Bytes(DocumentFormat),
    Text,
}

/// Signature every real handler has.
pub type ConvertFn = fn(&Job<'_>) -> Result<Vec<ConversionResult>>;

/// What runs once a request has been validated.
#[derive(Clone, Copy)]
pub enum Handler {
    Convert(ConvertFn),
    /// No decoder exists; the registry produces a placeholder page.
    Simulated,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Convert(_) => f.write_str("Convert"),
            Self::Simulated => f.write_str("Simulated"),
        }
    }
}

/// One registered operation.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub name: String,
    pub family: Family,
    pub arity: Arity,
    /// Formats accepted for every input position.
    pub inputs: Vec<DocumentFormat>,
    pub output: OutputDecl,
    pub options: &'static [OptionSpec],
    pub requires: &'static [Capability],
    pub handler: Handler,
    /// Output bytes are PNG carrying the target format's extension.
    pub relabelled: bool,
    pub summary: String,
}

impl Descriptor {
    /// A single-input operation with a real handler and no options.
    pub fn convert(name: impl Into<String>, family: Family, handler: ConvertFn) -> Self {
        Self {
            name: name.into(),
            family,
            arity: Arity::Single,
            inputs: Vec::new(),
            output: OutputDecl::Bytes(DocumentFormat::Pdf),
            options: &[],
            requires: &[],
            handler: Handler::Convert(handler),
            relabelled: false,
            summary: String::new(),
        }
    }

    /// `convert:<ext>:pdf` for a format without a decoder.
    pub fn simulated(source: DocumentFormat) -> Self {
        Self {
            name: format!("convert:{}:pdf", source.extension()),
            family: Family::Office,
            arity: Arity::Single,
            inputs: vec![source],
            output: OutputDecl::Bytes(DocumentFormat::Pdf),
            options: &[],
            requires: &[],
            handler: Handler::Simulated,
            relabelled: false,
            summary: format!("Placeholder PDF for {source} (no decoder available)"),
        }
    }

    pub fn arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    pub fn inputs(mut self, inputs: Vec<DocumentFormat>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn output(mut self, output: OutputDecl) -> Self {
        self.output = output;
        self
    }

    pub fn options(mut self, options: &'static [OptionSpec]) -> Self {
        self.options = options;
        self
    }

    pub fn requires(mut self, requires: &'static [Capability]) -> Self {
        self.requires = requires;
        self
    }

    pub fn relabelled(mut self) -> Self {
        self.relabelled = true;
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.handler, Handler::Simulated)
    }
}

// -- Job ----------------------------------------------------------------------

/// A validated request as a handler sees it.
pub struct Job<'a> {
    pub descriptor: &'a Descriptor,
    pub inputs: &'a [InputFile],
    /// Caller options with the descriptor defaults folded in.
    pub options: &'a Options,
    pub capabilities: &'a Capabilities,
    pub config: &'a ConverterConfig,
}

impl Job<'_> {
    /// The first (for single-input operations, the only) input.
    pub fn input(&self) -> Result<&InputFile> {
        self.inputs.first().ok_or_else(|| {
            BlattwerkError::InvalidRequest(format!("{} needs an input file", self.descriptor.name))
        })
    }

    /// Format of the first input. Already validated against the descriptor.
    pub fn source_format(&self) -> Result<DocumentFormat> {
        let input = self.input()?;
        input.format().ok_or_else(|| unknown_format(input))
    }

    /// `<stem of first input><suffix>`, e.g. `report.pdf`.
    pub fn output_name(&self, suffix: &str) -> String {
        let stem = self.inputs.first().map_or("output", InputFile::stem);
        format!("{stem}{suffix}")
    }

    pub fn writer(&self) -> PdfWriter {
        PdfWriter::from_config(self.config)
    }

    /// `orientation` option, or `default` when unset or empty.
    pub fn orientation(&self, default: Orientation) -> Result<Orientation> {
        match self.options.str("orientation").filter(|value| !value.trim().is_empty()) {
            None => Ok(default),
            Some(value) => Orientation::parse(value.trim()).ok_or_else(|| {
                BlattwerkError::InvalidOptions(format!(
                    "unknown orientation {value:?} (expected portrait or landscape)"
                ))
            }),
        }
    }

    /// A positive `f32` option bounded by `max`.
    pub fn positive(&self, key: &str, default: f32, max: f32) -> Result<f32> {
        let value = self.options.f32_or(key, default)?;
        if value > 0.0 && value <= max {
            Ok(value)
        } else {
            Err(BlattwerkError::InvalidOptions(format!(
                "option `{key}` must be above 0 and at most {max}, got {value}"
            )))
        }
    }
}

fn unknown_format(input: &InputFile) -> BlattwerkError {
    BlattwerkError::UnsupportedOperation(format!("cannot tell the format of {}", input.name))
}

/// Prefix a decode failure with the file it came from.
pub(crate) fn name_decode_error(name: &str) -> impl FnOnce(BlattwerkError) -> BlattwerkError + '_ {
    move |err| match err {
        BlattwerkError::DecodeError(reason) => BlattwerkError::DecodeError(format!("{name}: {reason}")),
        other => other,
    }
}

// -- Registry -----------------------------------------------------------------

/// All operations, the capabilities they run against, and the converter
/// configuration. Immutable after construction and safe to share.
pub struct Registry {
    descriptors: Vec<Descriptor>,
    index: HashMap<String, usize>,
    capabilities: Arc<Capabilities>,
    config: Arc<ConverterConfig>,
}

impl Registry {
    /// An empty registry.
    pub fn new(capabilities: Capabilities, config: ConverterConfig) -> Self {
        Self {
            descriptors: Vec::new(),
            index: HashMap::new(),
            capabilities: Arc::new(capabilities),
            config: Arc::new(config),
        }
    }

    /// Every built-in operation.
    pub fn standard(capabilities: Capabilities, config: ConverterConfig) -> Self {
        let mut registry = Self::new(capabilities, config);
        let families = [
            text_to_pdf::descriptors(),
            image_to_pdf::descriptors(),
            pdf_to_text::descriptors(),
            pdf_to_image::descriptors(),
            office::descriptors(),
            pdf_ops::descriptors(),
        ];
        for descriptor in families.into_iter().flatten() {
            registry.register(descriptor);
        }
        info!(
            operations = registry.descriptors.len(),
            capabilities = ?registry.capabilities,
            "Conversion registry ready"
        );
        registry
    }

    /// Add `descriptor`, replacing any operation of the same name.
    pub fn register(&mut self, descriptor: Descriptor) {
        match self.index.get(&descriptor.name) {
            Some(&slot) => {
                debug!(operation = %descriptor.name, "Replacing registered operation");
                self.descriptors[slot] = descriptor;
            }
            None => {
                self.index.insert(descriptor.name.clone(), self.descriptors.len());
                self.descriptors.push(descriptor);
            }
        }
    }

    /// Registered operations in registration order.
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn describe(&self, name: &str) -> Option<&Descriptor> {
        self.index.get(name).map(|&slot| &self.descriptors[slot])
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Validate `request` against its descriptor and run it.
    #[instrument(skip_all, fields(request = %request.id, operation = %request.operation, inputs = request.inputs.len()))]
    pub async fn execute(&self, request: ConversionRequest) -> Result<Vec<ConversionResult>> {
        let descriptor = self.describe(&request.operation).ok_or_else(|| {
            BlattwerkError::UnsupportedOperation(format!("no operation named {:?}", request.operation))
        })?;

        if !descriptor.arity.accepts(request.inputs.len()) {
            return Err(BlattwerkError::InvalidRequest(format!(
                "{} takes {}, got {}",
                descriptor.name,
                descriptor.arity,
                request.inputs.len()
            )));
        }

        for input in &request.inputs {
            let format = input.format().ok_or_else(|| unknown_format(input))?;
            if !descriptor.inputs.contains(&format) {
                return Err(BlattwerkError::UnsupportedOperation(format!(
                    "{} does not accept {format} input ({})",
                    descriptor.name, input.name
                )));
            }
        }

        self.capabilities.check(descriptor.requires)?;
        let options = request.options.with_defaults(descriptor.options)?;

        info!("Running operation");
        let results = match descriptor.handler {
            Handler::Convert(handler) => handler(&Job {
                descriptor,
                inputs: &request.inputs,
                options: &options,
                capabilities: &self.capabilities,
                config: &self.config,
            })?,
            Handler::Simulated => self.simulate(descriptor, &request.inputs).await?,
        };

        if results.is_empty() {
            return Err(BlattwerkError::SaveError(format!(
                "{} produced no output",
                descriptor.name
            )));
        }
        for result in &results {
            if result.payload.is_empty() {
                return Err(BlattwerkError::SaveError(format!(
                    "{} produced an empty {}",
                    descriptor.name, result.filename
                )));
            }
            debug!(
                filename = %result.filename,
                bytes = result.payload.len(),
                sha256 = %result.sha256,
                kind = ?result.kind,
                "Result ready"
            );
        }
        info!(results = results.len(), "Operation complete");
        Ok(results)
    }

    async fn simulate(
        &self,
        descriptor: &Descriptor,
        inputs: &[InputFile],
    ) -> Result<Vec<ConversionResult>> {
        let input = inputs
            .first()
            .ok_or_else(|| BlattwerkError::InvalidRequest("no input file".into()))?;
        warn!(operation = %descriptor.name, file = %input.name, "No decoder available, producing a placeholder");
        tokio::time::sleep(Duration::from_millis(self.config.simulated_delay_ms)).await;

        let format = input.format().map_or("unknown", |format| format.extension());
        let lines = [
            format!("Source file: {}", input.name),
            format!("Received {} bytes of {format} content.", input.bytes.len()),
            format!("Blattwerk has no {format} decoder, so this page stands in for the converted document."),
        ];
        let pdf = PdfWriter::from_config(&self.config)
            .create_placeholder(&format!("{} converted to PDF", input.name), &lines)?;
        Ok(vec![
            ConversionResult::bytes(pdf, format!("{}.pdf", input.stem()), DocumentFormat::Pdf)
                .simulated(),
        ])
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("operations", &self.descriptors.len())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}
