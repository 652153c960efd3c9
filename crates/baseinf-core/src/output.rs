//! Streaming writer for token pieces.
//!
//! llama.cpp hands out raw bytes per token and a single character may be
//! split across two or more tokens. Each piece is staged, the valid UTF-8
//! prefix is written and flushed right away, and an incomplete tail waits
//! for the next piece.

use std::io::{self, Write};

use crate::engine::utils::utf8_valid_prefix_len;

const REPLACEMENT: &str = "\u{FFFD}";

pub struct PieceWriter<W: Write> {
    inner: W,
    staging: Vec<u8>,
    pieces: usize,
}

impl<W: Write> PieceWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            staging: Vec::with_capacity(64),
            pieces: 0,
        }
    }

    /// Stage one token piece, write whatever is complete, flush.
    pub fn write_piece(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.staging.extend_from_slice(bytes);
        self.pieces += 1;
        self.drain_valid()?;
        self.inner.flush()
    }

    /// Write any held-back bytes (lossily) and flush. Call once at the end.
    pub fn finish(&mut self) -> io::Result<()> {
        self.drain_valid()?;
        if !self.staging.is_empty() {
            let tail = String::from_utf8_lossy(&self.staging).into_owned();
            self.staging.clear();
            self.inner.write_all(tail.as_bytes())?;
        }
        self.inner.flush()
    }

    /// Pieces accepted so far.
    pub fn pieces(&self) -> usize {
        self.pieces
    }

    /// Bytes waiting for the rest of a multi-byte character.
    pub fn pending_bytes(&self) -> usize {
        self.staging.len()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn drain_valid(&mut self) -> io::Result<()> {
        loop {
            let valid = utf8_valid_prefix_len(&self.staging);
            if valid == self.staging.len() {
                self.inner.write_all(&self.staging)?;
                self.staging.clear();
                return Ok(());
            }

            // The suffix starts at the first error: either a truly invalid
            // sequence (replace and skip it) or an incomplete tail (keep it).
            let err = match std::str::from_utf8(&self.staging[valid..]) {
                Ok(_) => return Ok(()),
                Err(e) => e,
            };
            self.inner.write_all(&self.staging[..valid])?;
            match err.error_len() {
                Some(bad) => {
                    self.inner.write_all(REPLACEMENT.as_bytes())?;
                    self.staging.drain(..valid + bad);
                }
                None => {
                    self.staging.drain(..valid);
                    return Ok(());
                }
            }
        }
    }
}
