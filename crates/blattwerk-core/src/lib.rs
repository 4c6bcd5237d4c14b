// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk — Core types and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod integrity;
pub mod options;
pub mod types;

pub use config::ConverterConfig;
pub use error::{BlattwerkError, ErrorKind};
pub use options::{OptionSpec, Options};
pub use types::*;
