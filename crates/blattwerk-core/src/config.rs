// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Converter configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// Engine-wide settings shared by every operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// JPEG quality (1-100) for page snapshots.
    pub jpeg_quality: u8,
    /// How many pages `preview` renders when no explicit limit is given.
    pub preview_page_limit: u32,
    /// Artificial delay before a simulated conversion returns.
    pub simulated_delay_ms: u64,
    /// Paper size for generated documents.
    pub paper_size: crate::PaperSize,
    /// Page margin for generated documents.
    pub margin_mm: f32,
    /// Default OCR language code.
    pub ocr_language: String,
    /// Value written to the /Producer metadata field on save.
    pub producer: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 80,
            preview_page_limit: 5,
            simulated_delay_ms: 1500,
            paper_size: crate::PaperSize::A4,
            margin_mm: 15.0,
            ocr_language: "eng".to_string(),
            producer: "Blattwerk".to_string(),
        }
    }
}

impl ConverterConfig {
    /// Load a JSON config file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        debug!(path = %path.as_ref().display(), "config loaded");
        Ok(config)
    }

    /// Load a config file, falling back to defaults when it is absent or
    /// unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.as_ref().display(), %err, "using default config");
                Self::default()
            }
        }
    }

    /// Write this config as pretty-printed JSON.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Same config with the simulated-conversion delay removed.
    pub fn without_delay(mut self) -> Self {
        self.simulated_delay_ms = 0;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ConverterConfig =
            serde_json::from_str(r#"{"jpeg_quality": 60}"#).unwrap();
        assert_eq!(config.jpeg_quality, 60);
        assert_eq!(config.ocr_language, "eng");
    }

    #[test]
    fn persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blattwerk.json");
        let config = ConverterConfig {
            preview_page_limit: 9,
            ..ConverterConfig::default()
        };
        config.persist(&path).unwrap();
        assert_eq!(ConverterConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_falls_back() {
        let config = ConverterConfig::load_or_default("/nonexistent/blattwerk.json");
        assert_eq!(config, ConverterConfig::default());
    }
}
