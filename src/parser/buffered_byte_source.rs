//! [ByteSource] streaming a file through a [BufReader].
//!
//! Posterior tree samples can be far larger than memory; this source keeps
//! only the reader's buffer plus a small look-ahead copy resident.

use crate::parser::byte_source::ByteSource;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

// =#========================================================================#=
// BUFFERED BYTE SOURCE
// =#========================================================================$=
/// Byte source reading a file in chunks.
///
/// Peeking beyond the end of the reader's current buffer reads ahead and
/// seeks back to the absolute position afterwards.
pub struct BufferedByteSource {
    reader: BufReader<File>,
    /// Copy of upcoming bytes handed out by `peek_slice`
    look_ahead: Vec<u8>,
    /// Absolute position in the file
    pos: usize,
}

impl BufferedByteSource {
    /// Size of the reader buffer; large enough that keyword look-ahead
    /// rarely crosses a buffer boundary.
    const READER_CAPACITY: usize = 1 << 16;

    /// Opens the file at `path` for buffered reading.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be opened.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::with_capacity(Self::READER_CAPACITY, file),
            look_ahead: Vec::with_capacity(16),
            pos: 0,
        })
    }
}

impl ByteSource for BufferedByteSource {
    fn peek(&mut self) -> Option<u8> {
        self.reader.fill_buf().ok()?.first().copied()
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.reader.consume(1);
        self.pos += 1;
        Some(byte)
    }

    fn peek_slice(&mut self, k: usize) -> &[u8] {
        self.look_ahead.clear();

        let available = match self.reader.fill_buf() {
            Ok(buf) => buf,
            Err(_) => return &self.look_ahead,
        };
        if available.len() >= k {
            self.look_ahead.extend_from_slice(&available[..k]);
            return &self.look_ahead;
        }

        // Window crosses the buffer end: read ahead, then return to `pos`
        while self.look_ahead.len() < k {
            let chunk = match self.reader.fill_buf() {
                Ok([]) | Err(_) => break,
                Ok(chunk) => chunk,
            };
            let take = (k - self.look_ahead.len()).min(chunk.len());
            self.look_ahead.extend_from_slice(&chunk[..take]);
            self.reader.consume(take);
        }
        let _ = self.reader.seek(SeekFrom::Start(self.pos as u64));

        &self.look_ahead
    }

    fn get_context(&mut self, k: usize) -> Vec<u8> {
        self.peek_slice(k).to_vec()
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn set_position(&mut self, pos: usize) {
        let _ = self.reader.seek(SeekFrom::Start(pos as u64));
        self.pos = pos;
    }

    fn is_eof(&mut self) -> bool {
        self.reader.fill_buf().map_or(true, |buf| buf.is_empty())
    }
}

// =#========================================================================#=
// TESTS - BUFFERED BYTE SOURCE
// =#========================================================================$=
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_peek_slice_across_reads_keeps_position() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"#NEXUS\nBegin taxa;").unwrap();

        let mut source = BufferedByteSource::from_file(file.path()).unwrap();
        assert_eq!(source.peek_slice(6), b"#NEXUS");
        assert_eq!(source.next_byte(), Some(b'#'));
        assert_eq!(source.position(), 1);

        source.set_position(7);
        assert_eq!(source.peek_slice(5), b"Begin");
        assert_eq!(source.peek(), Some(b'B'));
        assert!(!source.is_eof());
    }
}
