// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text module — content-stream text extraction, PDF string coding, and the
// user-space to pixel-space transform.

pub mod extract;
pub mod transform;

pub use extract::{TextRun, extract_items, extract_text, page_runs, page_texts};
pub use transform::{Matrix, PixelBox, Viewport, to_viewport};

use lopdf::{Object, StringFormat};

/// WinAnsiEncoding code points 0x80..=0x9F, where it departs from Latin-1.
const WIN_ANSI_HIGH: [char; 32] = [
    '€', '\u{81}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{8d}', 'Ž', '\u{8f}',
    '\u{90}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ', '\u{9d}', 'ž', 'Ÿ',
];

/// Decode a PDF string: UTF-16BE when it carries a byte-order mark, else
/// single-byte WinAnsi (Latin-1 with the 0x80..0x9F block remapped).
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], *pair.get(1).unwrap_or(&0)]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| win_ansi_char(b)).collect()
}

pub(crate) fn win_ansi_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => WIN_ANSI_HIGH[(byte - 0x80) as usize],
        _ => byte as char,
    }
}

/// Encode text as a PDF text string: a literal for ASCII, UTF-16BE with a
/// byte-order mark otherwise.
pub fn encode_pdf_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Encode text for a show-text operator under WinAnsiEncoding. Characters
/// outside the encoding become `?`.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| {
            let code = ch as u32;
            if code < 0x80 || (0xA0..=0xFF).contains(&code) {
                code as u8
            } else {
                WIN_ANSI_HIGH
                    .iter()
                    .position(|&c| c == ch)
                    .map(|i| 0x80 + i as u8)
                    .unwrap_or(b'?')
            }
        })
        .collect()
}
