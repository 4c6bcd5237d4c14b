// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Zip archives — the default archive writer, and entry lookup for the
// zip-based office containers.

use std::io::{Cursor, Read, Write};

use blattwerk_core::error::{BlattwerkError, Result};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::capability::{ArchiveEntry, ArchiveWriter};

/// Writes entries into an in-memory zip with the `zip` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveWriter;

impl ArchiveWriter for ZipArchiveWriter {
    fn write(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in entries {
            let method = if entry.stored {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            let options = SimpleFileOptions::default().compression_method(method);
            zip.start_file(entry.path.as_str(), options)
                .map_err(|err| BlattwerkError::SaveError(format!("zip entry {}: {err}", entry.path)))?;
            zip.write_all(&entry.bytes)?;
        }
        let cursor = zip
            .finish()
            .map_err(|err| BlattwerkError::SaveError(format!("zip finish: {err}")))?;
        let bytes = cursor.into_inner();
        debug!(entries = entries.len(), bytes = bytes.len(), "Archive written");
        Ok(bytes)
    }
}

/// Read-only view of a zip container held in memory.
pub(crate) struct ZipContainer {
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl ZipContainer {
    pub(crate) fn open(bytes: &[u8]) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes.to_vec()))
            .map_err(|err| BlattwerkError::DecodeError(format!("not a zip container: {err}")))?;
        Ok(Self { archive })
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.archive.index_for_name(name).is_some()
    }

    /// UTF-8 text of entry `name`, or `None` when absent.
    pub(crate) fn read_text(&mut self, name: &str) -> Result<Option<String>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(err) => return Err(BlattwerkError::DecodeError(format!("{name}: {err}"))),
        };
        let mut text = String::new();
        file.read_to_string(&mut text)
            .map_err(|err| BlattwerkError::DecodeError(format!("{name}: {err}")))?;
        Ok(Some(text))
    }
}
