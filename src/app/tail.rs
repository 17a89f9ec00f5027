// EveTranslator - app/tail.rs
//
// Incremental reader for one transcript that the game client is still
// writing.
//
// The tailer remembers a byte offset and an in-progress line. Each
// `read_new_lines` call reads only bytes past the offset, decodes them as
// UTF-16LE and returns the complete lines. Nothing here ever fails loudly:
//   - A missing file reads as empty and is retried on the next call.
//   - Stat and read errors read as empty; the offset is left unchanged.
//   - A file that shrank below the offset was truncated or rotated. The
//     tailer closes, resets the offset to 0 and reads from the start.
//   - MAX_TAIL_READ_BYTES_PER_TICK caps the bytes consumed per call so a
//     burst of writes is drained over several polls.

use crate::core::parser;
use crate::platform::fs::{decode_utf16le, strip_bom};
use crate::util::constants::{
    HISTORY_SCAN_INITIAL_BYTES, MAX_TAIL_PARTIAL_BYTES, MAX_TAIL_READ_BYTES_PER_TICK,
};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Tails one UTF-16LE transcript.
#[derive(Debug)]
pub struct LogTailer {
    path: PathBuf,
    file: Option<File>,
    /// Byte position just past the last byte consumed. Only moves backwards
    /// on truncation, when it resets to 0.
    offset: u64,
    /// Decoded text after the last newline: an in-progress line.
    partial: String,
    /// Undecoded tail of the last read: an odd byte and/or a high surrogate
    /// whose low half has not been written yet.
    pending: Vec<u8>,
}

impl LogTailer {
    /// Create a tailer for `path` and open it if it exists.
    ///
    /// The offset starts at 0; call `seek_to_end` to skip existing content.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut tailer = Self {
            path: path.into(),
            file: None,
            offset: 0,
            partial: String::new(),
            pending: Vec::new(),
        };
        tailer.ensure_open();
        tailer
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Open the file handle if it is not already open. Returns whether a
    /// handle is available.
    fn ensure_open(&mut self) -> bool {
        if self.file.is_none() {
            match File::open(&self.path) {
                Ok(f) => {
                    tracing::trace!(file = %self.path.display(), "Tail: opened");
                    self.file = Some(f);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::debug!(file = %self.path.display(), error = %e, "Tail: open failed");
                }
            }
        }
        self.file.is_some()
    }

    /// Skip everything currently in the file; only later writes are read.
    ///
    /// A file that does not exist yet leaves the offset at 0, so its whole
    /// content is read once it appears.
    pub fn seek_to_end(&mut self) {
        self.partial.clear();
        self.pending.clear();
        match std::fs::metadata(&self.path) {
            Ok(meta) => {
                self.ensure_open();
                // UTF-16 code units are two bytes; never split one.
                self.offset = meta.len() & !1;
                tracing::debug!(file = %self.path.display(), offset = self.offset, "Tail: seek to end");
            }
            Err(_) => {
                self.offset = 0;
            }
        }
    }

    /// Return every complete line appended since the last call, without
    /// line terminators.
    pub fn read_new_lines(&mut self) -> Vec<String> {
        if !self.ensure_open() {
            return Vec::new();
        }

        let current_size = match std::fs::metadata(&self.path) {
            Ok(m) => m.len(),
            Err(e) => {
                tracing::debug!(file = %self.path.display(), error = %e, "Tail: stat error");
                return Vec::new();
            }
        };

        if current_size < self.offset {
            tracing::info!(
                file = %self.path.display(),
                old_offset = self.offset,
                new_size = current_size,
                "Tail: file truncated or rotated, reading from start"
            );
            self.close();
            self.offset = 0;
            self.partial.clear();
            self.pending.clear();
            if !self.ensure_open() {
                return Vec::new();
            }
        }

        if current_size == self.offset {
            return Vec::new();
        }

        let read_start = self.offset;
        let available = usize::try_from(current_size - self.offset).unwrap_or(usize::MAX);
        let limit = available.min(MAX_TAIL_READ_BYTES_PER_TICK);

        let new_bytes = match self.read_bytes_at(read_start, limit) {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!(file = %self.path.display(), error = %e, "Tail: read error");
                return Vec::new();
            }
        };
        if new_bytes.is_empty() {
            return Vec::new();
        }
        self.offset += new_bytes.len() as u64;

        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(&new_bytes);
        let (decoded, carry) = decode_utf16le(&bytes);
        self.pending = carry;

        let decoded = if read_start == 0 {
            strip_bom(&decoded)
        } else {
            decoded.as_str()
        };
        self.partial.push_str(decoded);

        let complete = match self.partial.rfind('\n') {
            Some(nl_pos) => {
                let rest = self.partial.split_off(nl_pos + 1);
                std::mem::replace(&mut self.partial, rest)
            }
            None => {
                if self.partial.len() > MAX_TAIL_PARTIAL_BYTES {
                    tracing::warn!(
                        file = %self.path.display(),
                        bytes = self.partial.len(),
                        "Tail: discarding oversized unterminated line"
                    );
                    self.partial.clear();
                }
                return Vec::new();
            }
        };

        let lines: Vec<String> = complete
            .lines()
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect();

        tracing::trace!(file = %self.path.display(), count = lines.len(), "Tail: new lines");
        lines
    }

    /// The last `n` message lines in the file, oldest first.
    ///
    /// Header and blank lines are skipped with a cheap pattern check rather
    /// than full parsing. The file is scanned backwards in growing windows so
    /// a long transcript is not read in full for a handful of lines. Any
    /// error reads as no history.
    pub fn read_last_n_lines(&self, n: usize) -> Vec<String> {
        if n == 0 {
            return Vec::new();
        }
        match read_last_message_lines(&self.path, n) {
            Ok(lines) => lines,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::debug!(file = %self.path.display(), error = %e, "Tail: history read failed");
                }
                Vec::new()
            }
        }
    }

    /// Release the file handle. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            tracing::trace!(file = %self.path.display(), "Tail: closed");
        }
    }

    /// Read up to `limit` bytes at `offset` through the held handle.
    fn read_bytes_at(&mut self, offset: u64, limit: usize) -> io::Result<Vec<u8>> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "tailer is closed"))?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::with_capacity(limit);
        file.take(limit as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Backward scan for the last `n` message lines of a UTF-16LE file.
fn read_last_message_lines(path: &Path, n: usize) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(Vec::new());
    }
    // SAFETY: the map is read-only and dropped before returning. The client
    // only appends, so bytes below the mapped length do not change.
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    let len = mmap.len() & !1;

    let mut window = HISTORY_SCAN_INITIAL_BYTES;
    loop {
        let start = len.saturating_sub(window) & !1;
        let (decoded, _) = decode_utf16le(&mmap[start..len]);
        let text = if start == 0 { strip_bom(&decoded) } else { decoded.as_str() };

        let mut lines = text.lines();
        if start > 0 {
            // The window may begin mid-line.
            lines.next();
        }
        let messages: Vec<&str> = lines
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| parser::looks_like_message(l))
            .collect();

        if messages.len() >= n || start == 0 {
            let skip = messages.len().saturating_sub(n);
            return Ok(messages[skip..].iter().map(|l| (*l).to_string()).collect());
        }
        window = window.saturating_mul(4);
    }
}

// =============================================================================
// Tests
// =============================================================================
