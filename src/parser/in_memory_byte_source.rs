//! [ByteSource] over an owned byte buffer.

use crate::parser::byte_source::ByteSource;
use std::fs;
use std::path::Path;

// =#========================================================================#=
// IN MEMORY BYTE SOURCE
// =#========================================================================$=
/// Byte source holding the complete input in memory.
///
/// Used for Newick strings given on the command line and for tree files
/// small enough to load at once.
pub struct InMemoryByteSource {
    input: Vec<u8>,
    pos: usize,
}

impl InMemoryByteSource {
    /// Wraps the given bytes, starting at offset 0.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            input: bytes,
            pos: 0,
        }
    }

    /// Loads the whole file at `path` into memory.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self::from_vec(fs::read(path)?))
    }
}

impl ByteSource for InMemoryByteSource {
    #[inline(always)]
    fn peek(&mut self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    #[inline(always)]
    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.input.get(self.pos).copied()?;
        self.pos += 1;
        Some(byte)
    }

    #[inline(always)]
    fn peek_slice(&mut self, k: usize) -> &[u8] {
        let start = self.pos.min(self.input.len());
        let end = (self.pos + k).min(self.input.len());
        &self.input[start..end]
    }

    fn get_context(&mut self, k: usize) -> Vec<u8> {
        self.peek_slice(k).to_vec()
    }

    #[inline]
    fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn is_eof(&mut self) -> bool {
        self.pos >= self.input.len()
    }
}
