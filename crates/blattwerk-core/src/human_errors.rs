// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for callers that surface failures to people.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The core never retries on its own, so `retriable` is always false; callers
// decide for themselves whether to offer a retry.

use crate::error::BlattwerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The environment is not ready yet (missing renderer, OCR models).
    Transient,
    /// User must do something (pick a different file, fix an option).
    ActionRequired,
    /// Cannot be fixed by retrying, e.g. an unsupported conversion or corrupt input.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether repeating the identical request may succeed later.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `BlattwerkError` into a `HumanError`.
pub fn humanize_error(err: &BlattwerkError) -> HumanError {
    match err {
        BlattwerkError::DependencyUnavailable(what) => HumanError {
            message: "A required component isn't ready.".into(),
            suggestion: format!(
                "This conversion needs the {what}. Wait for it to finish loading, or install it, then try again."
            ),
            retriable: false,
            severity: Severity::Transient,
        },

        BlattwerkError::LoadError { file, .. } => HumanError {
            message: match file {
                Some(name) => format!("We couldn't open {name}."),
                None => "We couldn't open this file.".into(),
            },
            suggestion: "The file may be damaged, password-protected, or not the type its name suggests. Try a different copy.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BlattwerkError::DecodeError(_) => HumanError {
            message: "Part of this file couldn't be read.".into(),
            suggestion: "The file may use a feature we don't support. Try saving it again from the program that created it.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        BlattwerkError::SaveError(_) => HumanError {
            message: "The result couldn't be written.".into(),
            suggestion: "The document may be too large. Try fewer pages or files at once.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        BlattwerkError::UnsupportedOperation(detail) => HumanError {
            message: "This conversion isn't supported.".into(),
            suggestion: format!("Pick a different target format. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        BlattwerkError::InvalidRequest(detail) => HumanError {
            message: "The wrong number of files was given.".into(),
            suggestion: format!("Check how many files this tool expects. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BlattwerkError::InvalidOptions(detail) => HumanError {
            message: "One of the settings isn't valid.".into(),
            suggestion: format!("Check the value and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BlattwerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your disk may be full.".into(),
                    retriable: false,
                    severity: Severity::Transient,
                }
            }
        }

        BlattwerkError::Serialization(_) => HumanError {
            message: "A settings file couldn't be understood.".into(),
            suggestion: "Check that the configuration file is valid JSON.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dependency_is_transient() {
        let human = humanize_error(&BlattwerkError::DependencyUnavailable("page renderer".into()));
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.suggestion.contains("page renderer"));
        assert!(!human.retriable);
    }

    #[test]
    fn load_error_mentions_file() {
        let human = humanize_error(&BlattwerkError::load("b.pdf", "bad xref"));
        assert!(human.message.contains("b.pdf"));
        assert!(!human.retriable);
    }

    #[test]
    fn unsupported_is_permanent() {
        let human = humanize_error(&BlattwerkError::UnsupportedOperation("convert:x:pdf".into()));
        assert_eq!(human.severity, Severity::Permanent);
    }
}
