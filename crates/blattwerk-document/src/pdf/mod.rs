// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — the document handle, page-collection engine, overlays,
// compression policy, and the writer for new documents.

pub mod compress;
pub mod handle;
pub mod overlay;
pub mod pages;
pub mod writer;

pub use compress::CompressionLevel;
pub use handle::{DocumentHandle, LoadOptions, Metadata, PageGeometry, SaveOptions};
pub use overlay::{PageTarget, TextPlacement};
pub use writer::{PdfWriter, TextLayout};
