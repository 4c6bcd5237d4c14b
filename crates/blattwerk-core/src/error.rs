// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Blattwerk.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all Blattwerk operations.
#[derive(Debug, Error)]
pub enum BlattwerkError {
    // -- Capability errors --
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    // -- Input errors --
    #[error("{}", load_message(.file, .reason))]
    LoadError {
        file: Option<String>,
        reason: String,
    },

    #[error("decode failed: {0}")]
    DecodeError(String),

    // -- Output errors --
    #[error("failed to serialise result: {0}")]
    SaveError(String),

    // -- Request errors --
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid option: {0}")]
    InvalidOptions(String),

    // -- Ambient --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn load_message(file: &Option<String>, reason: &str) -> String {
    match file {
        Some(name) => format!("failed to load {name}: {reason}"),
        None => format!("failed to load input: {reason}"),
    }
}

impl BlattwerkError {
    /// Build a [`BlattwerkError::LoadError`] that names the offending file.
    pub fn load(file: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::LoadError {
            file: Some(file.into()),
            reason: reason.to_string(),
        }
    }

    /// Build a [`BlattwerkError::LoadError`] for an anonymous in-memory source.
    pub fn load_anonymous(reason: impl std::fmt::Display) -> Self {
        Self::LoadError {
            file: None,
            reason: reason.to_string(),
        }
    }

    /// Stable classification of this error, independent of its message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DependencyUnavailable(_) => ErrorKind::DependencyUnavailable,
            Self::LoadError { .. } => ErrorKind::LoadError,
            Self::DecodeError(_) => ErrorKind::DecodeError,
            Self::SaveError(_) => ErrorKind::SaveError,
            Self::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::InvalidOptions(_) => ErrorKind::InvalidOptions,
            Self::Io(_) => ErrorKind::Io,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }
}

/// Error classification carried alongside a failed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    DependencyUnavailable,
    LoadError,
    DecodeError,
    SaveError,
    UnsupportedOperation,
    InvalidRequest,
    InvalidOptions,
    Io,
    Serialization,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlattwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_names_file() {
        let err = BlattwerkError::load("second.pdf", "invalid xref");
        assert_eq!(err.to_string(), "failed to load second.pdf: invalid xref");
        assert_eq!(err.kind(), ErrorKind::LoadError);
    }

    #[test]
    fn anonymous_load_error() {
        let err = BlattwerkError::load_anonymous("not a PDF");
        assert_eq!(err.to_string(), "failed to load input: not a PDF");
    }

    #[test]
    fn io_converts_via_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BlattwerkError = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
