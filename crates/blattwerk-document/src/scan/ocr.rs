// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Built-in OCR provider backed by `ocrs`, with its detection and recognition
// networks executed by `rten`.
//
// Only available with the `ocr` feature. The two `.rten` model files are
// looked up in `$XDG_CACHE_HOME/ocrs` (or `~/.cache/ocrs`), which is where
// `ocrs-cli` downloads them on first use.

use std::path::{Path, PathBuf};

use blattwerk_core::error::{BlattwerkError, Result};
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument, warn};

use crate::capability::OcrProvider;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Script the bundled models were trained on.
const MODEL_LANGUAGE: &str = "eng";

fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where to find the model files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Both models inside `dir`, under their well-known names.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Missing model files make the capability unavailable rather than broken.
    pub fn validate(&self) -> Result<()> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(BlattwerkError::DependencyUnavailable(format!(
                    "OCR engine (model not found at {}; run `ocrs-cli` once to download it)",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Loaded OCR networks. Loading is the expensive step, so one engine serves
/// every request for the lifetime of the provider.
pub struct OcrEngine {
    engine: OcrsEngine,
}

impl OcrEngine {
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrConfig) -> Result<Self> {
        config.validate()?;

        let detection_model = load_model(&config.detection_model_path)?;
        let recognition_model = load_model(&config.recognition_model_path)?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| {
            BlattwerkError::DependencyUnavailable(format!("OCR engine failed to start: {err}"))
        })?;

        info!("OCR engine ready");
        Ok(Self { engine })
    }

    /// Engine over the default model cache directory.
    pub fn with_defaults() -> Result<Self> {
        Self::new(OcrConfig::default())
    }
}

fn load_model(path: &Path) -> Result<Model> {
    debug!(path = %path.display(), "Loading OCR model");
    Model::load_file(path).map_err(|err| {
        BlattwerkError::DependencyUnavailable(format!(
            "OCR engine (failed to load {}: {err})",
            path.display()
        ))
    })
}

impl OcrProvider for OcrEngine {
    #[instrument(skip_all, fields(width = image.width(), height = image.height(), language))]
    fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        progress: &mut dyn FnMut(f32),
    ) -> Result<String> {
        if language != MODEL_LANGUAGE {
            warn!(language, "Models are Latin-script only; recognising anyway");
        }
        progress(0.0);

        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            BlattwerkError::DecodeError(format!("OCR input {width}x{height}: {err}"))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| BlattwerkError::DecodeError(format!("OCR preprocessing: {err}")))?;
        progress(0.5);

        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| BlattwerkError::DecodeError(format!("OCR recognition: {err}")))?;
        progress(1.0);

        debug!(lines = text.lines().count(), chars = text.len(), "OCR complete");
        Ok(text)
    }
}
