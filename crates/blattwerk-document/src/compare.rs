// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document comparison — a coarse report built from extracted text lengths.
// It does not diff and reports no positions.

use std::fmt;

use blattwerk_core::error::Result;
use serde::Serialize;
use tracing::{info, instrument};

use crate::text::extract_text;

pub const IDENTICAL: &str = "Binary Identical Content";
pub const VARIANCES: &str = "Structural Variances Detected";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonReport {
    pub name_a: String,
    pub name_b: String,
    pub verdict: &'static str,
    pub chars_a: usize,
    pub chars_b: usize,
    /// `|chars_a - chars_b|`.
    pub delta: usize,
}

impl ComparisonReport {
    pub fn is_identical(&self) -> bool {
        self.verdict == IDENTICAL
    }
}

/// Compare two PDFs by the character count of their extracted text.
#[instrument(skip(doc_a, doc_b))]
pub fn compare(name_a: &str, doc_a: &[u8], name_b: &str, doc_b: &[u8]) -> Result<ComparisonReport> {
    let chars_a = extract_text(doc_a)?.chars().count();
    let chars_b = extract_text(doc_b)?.chars().count();
    let verdict = if chars_a == chars_b { IDENTICAL } else { VARIANCES };

    info!(chars_a, chars_b, verdict, "Documents compared");
    Ok(ComparisonReport {
        name_a: name_a.to_string(),
        name_b: name_b.to_string(),
        verdict,
        chars_a,
        chars_b,
        delta: chars_a.abs_diff(chars_b),
    })
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Comparison Report")?;
        writeln!(f, "=================")?;
        writeln!(f, "Document A: {} ({} characters)", self.name_a, self.chars_a)?;
        writeln!(f, "Document B: {} ({} characters)", self.name_b, self.chars_b)?;
        writeln!(f, "Verdict: {}", self.verdict)?;
        write!(f, "Character delta: {}", self.delta)
    }
}
