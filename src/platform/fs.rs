// EveTranslator - platform/fs.rs
//
// UTF-16LE transcript reads.
//
// The client writes every chat transcript as UTF-16LE with a BOM. Decoding is
// lossy: malformed code units become U+FFFD and reading carries on.

use chrono::{DateTime, Utc};
use std::io::{self, Read};
use std::path::Path;

/// UTF-16LE byte order mark.
pub const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];

/// Bytes read from the top of a file when looking for header fields.
const HEADER_READ_BYTES: u64 = 16 * 1024;

/// Decode UTF-16LE bytes, replacing malformed sequences.
///
/// A trailing sequence that may still be completed by the next read is not
/// decoded: an odd byte (half a code unit) and a high surrogate waiting for
/// its low half. Those bytes, at most three, are returned so a streaming
/// caller can prepend them to the next read.
pub fn decode_utf16le(bytes: &[u8]) -> (String, Vec<u8>) {
    let mut end = bytes.len() & !1;
    if end >= 2 {
        let last = u16::from_le_bytes([bytes[end - 2], bytes[end - 1]]);
        if (0xD800..=0xDBFF).contains(&last) {
            end -= 2;
        }
    }
    let units: Vec<u16> = bytes[..end]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    (String::from_utf16_lossy(&units), bytes[end..].to_vec())
}

/// Remove a leading byte order mark from decoded text.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Read and decode a whole transcript.
pub fn read_utf16_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let (text, _) = decode_utf16le(&bytes);
    Ok(strip_bom(&text).to_string())
}

/// Read the first `max_lines` lines of a transcript for header parsing.
///
/// Only the first few KiB are read; transcripts can be large and the header
/// always sits at the top.
pub fn read_first_lines_utf16(path: &Path, max_lines: usize) -> io::Result<Vec<String>> {
    let file = std::fs::File::open(path)?;
    let mut buf = Vec::new();
    file.take(HEADER_READ_BYTES).read_to_end(&mut buf)?;

    let (text, _) = decode_utf16le(&buf);
    Ok(strip_bom(&text)
        .lines()
        .take(max_lines)
        .map(str::to_string)
        .collect())
}

/// File modification time in UTC.
pub fn modified_utc(path: &Path) -> io::Result<DateTime<Utc>> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}

/// Encode text as UTF-16LE. Used by tools and tests that write transcripts.
pub fn encode_utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

// =============================================================================
// Tests
// =============================================================================
