// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CLI commands — listing, description and execution over the registry.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use tracing::info;

use blattwerk_core::human_errors::humanize_error;
use blattwerk_core::{ConversionRequest, InputFile, Options};
use blattwerk_document::{OutputDecl, Registry};

/// One line per operation, grouped by family in registration order.
pub fn list(registry: &Registry, family: Option<&str>) -> String {
    let mut out = String::new();
    let mut current = None;
    for descriptor in registry.descriptors() {
        let label = descriptor.family.label();
        if family.is_some_and(|wanted| !wanted.eq_ignore_ascii_case(label)) {
            continue;
        }
        if current != Some(label) {
            let _ = writeln!(out, "{}{label}:", if current.is_some() { "\n" } else { "" });
            current = Some(label);
        }
        let marker = if descriptor.is_simulated() { " (simulated)" } else { "" };
        let _ = writeln!(out, "  {:<22} {}{marker}", descriptor.name, descriptor.summary);
    }
    out
}

pub fn describe(registry: &Registry, operation: &str) -> Result<String> {
    let descriptor = registry
        .describe(operation)
        .ok_or_else(|| anyhow!("unknown operation `{operation}`; see `blattwerk list`"))?;

    let mut out = String::new();
    let _ = writeln!(out, "{}: {}", descriptor.name, descriptor.summary);
    let _ = writeln!(out, "  family:   {}", descriptor.family.label());
    let _ = writeln!(out, "  inputs:   {}", descriptor.arity);
    let formats: Vec<&str> = descriptor.inputs.iter().map(|format| format.extension()).collect();
    let _ = writeln!(out, "  accepts:  {}", formats.join(", "));
    let output = match descriptor.output {
        OutputDecl::Bytes(format) => format.extension().to_string(),
        OutputDecl::Text => "text".to_string(),
    };
    let _ = writeln!(out, "  output:   {output}");
    if !descriptor.requires.is_empty() {
        let requires: Vec<String> = descriptor.requires.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "  requires: {}", requires.join(", "));
    }
    if !descriptor.options.is_empty() {
        let _ = writeln!(out, "  options:");
        for spec in descriptor.options {
            let default = if spec.default.is_empty() {
                String::new()
            } else {
                format!(" [default: {}]", spec.default)
            };
            let _ = writeln!(out, "    {:<12} {}{default}", spec.key, spec.help);
        }
    }
    Ok(out)
}

/// Execute `operation` and write every result into `output_dir`. Returns one
/// report line per written file.
pub async fn run(
    registry: &Registry,
    operation: &str,
    inputs: &[PathBuf],
    output_dir: &Path,
    pairs: &[String],
) -> Result<Vec<String>> {
    let mut options = Options::new();
    for pair in pairs {
        options
            .parse_pair(pair)
            .with_context(|| format!("bad --opt `{pair}`"))?;
    }

    let files = inputs
        .iter()
        .map(|path| InputFile::read(path).with_context(|| format!("reading {}", path.display())))
        .collect::<Result<Vec<_>>>()?;

    let request = ConversionRequest::new(operation, files).with_options(options);
    info!(request = %request.id, operation, "Running operation");
    let results = match registry.execute(request).await {
        Ok(results) => results,
        Err(err) => {
            let human = humanize_error(&err);
            bail!("{} {} ({err})", human.message, human.suggestion);
        }
    };

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let mut written = Vec::with_capacity(results.len());
    for result in &results {
        let path = output_dir.join(&result.filename);
        std::fs::write(&path, result.payload.as_bytes())
            .with_context(|| format!("writing {}", path.display()))?;
        let note = if result.is_simulated() { "  [simulated]" } else { "" };
        written.push(format!(
            "{}  {} bytes  sha256:{}{note}",
            path.display(),
            result.payload.len(),
            result.sha256
        ));
    }
    Ok(written)
}
