//! Low-level byte-by-byte reader for ASCII tree formats.
//!
//! [ByteParser] is shared by the Newick and NEXUS parsers. It offers peeking,
//! conditional consumption, case-insensitive keyword matching, NEXUS comment
//! skipping and quote-aware label reading.

use crate::parser::buffered_byte_source::BufferedByteSource;
use crate::parser::byte_source::ByteSource;
use crate::parser::in_memory_byte_source::InMemoryByteSource;
use crate::parser::parsing_error::ParsingError;
use std::path::Path;

// =#========================================================================#=
// BYTE PARSER
// =#========================================================================#=
/// A byte-by-byte reader over any [ByteSource].
///
/// All keyword matching is ASCII case-insensitive, as NEXUS keywords are.
///
/// # Example
/// ```
/// use popsizes::parser::ByteParser;
///
/// let mut parser = ByteParser::for_str("BEGIN trees; [comment] tree t1 = (A,B);");
/// assert!(parser.consume_if_sequence(b"begin"));
/// parser.skip_comment_and_whitespace().unwrap();
/// assert_eq!(parser.parse_unquoted_label(b";").unwrap(), "trees");
/// ```
pub struct ByteParser<S: ByteSource> {
    source: S,
}

// ============================================================================
// Construction (pub)
// ============================================================================
impl ByteParser<InMemoryByteSource> {
    /// Creates a parser over a copy of the given string.
    pub fn for_str(input: &str) -> Self {
        Self::new(InMemoryByteSource::from_vec(input.as_bytes().to_vec()))
    }

    /// Creates a parser over the whole file, loaded into memory.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read.
    pub fn from_file_in_memory<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self::new(InMemoryByteSource::from_file(path)?))
    }
}

impl ByteParser<BufferedByteSource> {
    /// Creates a parser streaming the file through a buffered reader.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be opened.
    pub fn from_file_buffered<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self::new(BufferedByteSource::from_file(path)?))
    }
}

impl<S: ByteSource> ByteParser<S> {
    /// Creates a parser over the given byte source.
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

// ============================================================================
// Peeking & Consuming (pub)
// ============================================================================
impl<S: ByteSource> ByteParser<S> {
    /// Returns the current byte without consuming it, `None` at EOF.
    #[inline(always)]
    pub fn peek(&mut self) -> Option<u8> {
        self.source.peek()
    }

    /// Consumes and returns the current byte, `None` at EOF.
    #[inline(always)]
    pub fn next_byte(&mut self) -> Option<u8> {
        self.source.next_byte()
    }

    /// Returns whether the current byte equals `ch`, ignoring ASCII case.
    pub fn peek_is(&mut self, ch: u8) -> bool {
        self.peek().is_some_and(|b| b.eq_ignore_ascii_case(&ch))
    }

    /// Returns whether the upcoming bytes equal `sequence`, ignoring ASCII case.
    #[inline]
    pub fn peek_is_sequence(&mut self, sequence: &[u8]) -> bool {
        let upcoming = self.source.peek_slice(sequence.len());
        upcoming.len() == sequence.len() && upcoming.eq_ignore_ascii_case(sequence)
    }

    /// Consumes the current byte if it equals `ch` (ignoring case);
    /// returns whether it did.
    pub fn consume_if(&mut self, ch: u8) -> bool {
        if self.peek_is(ch) {
            self.next_byte();
            true
        } else {
            false
        }
    }

    /// Consumes `sequence` if it comes next (ignoring case);
    /// returns whether it did.
    pub fn consume_if_sequence(&mut self, sequence: &[u8]) -> bool {
        if !self.peek_is_sequence(sequence) {
            return false;
        }
        for _ in 0..sequence.len() {
            self.next_byte();
        }
        true
    }

    /// Consumes bytes up to the next `target` byte, which is consumed as
    /// well in [ConsumeMode::Inclusive].
    ///
    /// # Returns
    /// `false` if EOF was reached before finding `target`
    pub fn consume_until(&mut self, target: u8, mode: ConsumeMode) -> bool {
        while let Some(b) = self.peek() {
            if b == target {
                if mode == ConsumeMode::Inclusive {
                    self.next_byte();
                }
                return true;
            }
            self.next_byte();
        }
        false
    }

    /// Consumes bytes up to the next occurrence of `sequence` (ignoring case),
    /// which is consumed as well in [ConsumeMode::Inclusive].
    ///
    /// # Returns
    /// `false` if EOF was reached before finding `sequence`
    pub fn consume_until_sequence(&mut self, sequence: &[u8], mode: ConsumeMode) -> bool {
        while !self.is_eof() {
            if self.peek_is_sequence(sequence) {
                if mode == ConsumeMode::Inclusive {
                    for _ in 0..sequence.len() {
                        self.next_byte();
                    }
                }
                return true;
            }
            self.next_byte();
        }
        false
    }
}

// ============================================================================
// Whitespace & Comments (pub)
// ============================================================================
impl<S: ByteSource> ByteParser<S> {
    /// Consumes consecutive spaces, tabs and line breaks.
    pub fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.next_byte();
        }
    }

    /// Consumes one `[...]` comment if the parser is positioned at one.
    ///
    /// # Returns
    /// Whether a comment was consumed.
    ///
    /// # Errors
    /// [ParsingError] if the comment is never closed.
    pub fn skip_comment(&mut self) -> Result<bool, ParsingError> {
        if !self.consume_if(b'[') {
            return Ok(false);
        }
        if !self.consume_until(b']', ConsumeMode::Inclusive) {
            return Err(ParsingError::unclosed_comment(self));
        }
        Ok(true)
    }

    /// Consumes any mix of whitespace and `[...]` comments.
    ///
    /// # Errors
    /// [ParsingError] if a comment is never closed.
    pub fn skip_comment_and_whitespace(&mut self) -> Result<(), ParsingError> {
        self.skip_whitespace();
        while self.skip_comment()? {
            self.skip_whitespace();
        }
        Ok(())
    }
}

// ============================================================================
// Labels & Numbers (pub)
// ============================================================================
impl<S: ByteSource> ByteParser<S> {
    /// Reads a label, quoted (`'...'`) or unquoted, skipping leading
    /// whitespace and comments.
    ///
    /// # Arguments
    /// * `delimiters` - bytes terminating an unquoted label
    ///
    /// # Errors
    /// [ParsingError] if a quoted label is not closed.
    pub fn parse_label(&mut self, delimiters: &[u8]) -> Result<String, ParsingError> {
        self.skip_comment_and_whitespace()?;
        if self.peek() == Some(b'\'') {
            self.parse_quoted_label()
        } else {
            self.parse_unquoted_label(delimiters)
        }
    }

    /// Reads a single-quoted label where `''` stands for a literal quote.
    /// The parser must be positioned at the opening quote.
    ///
    /// # Errors
    /// [ParsingError] if EOF is reached before the closing quote.
    pub fn parse_quoted_label(&mut self) -> Result<String, ParsingError> {
        self.next_byte();

        let mut label = Vec::new();
        loop {
            match self.next_byte() {
                None => return Err(ParsingError::unclosed_quote(self)),
                Some(b'\'') if self.peek() == Some(b'\'') => {
                    self.next_byte();
                    label.push(b'\'');
                }
                Some(b'\'') => break,
                Some(b) => label.push(b),
            }
        }

        Ok(String::from_utf8_lossy(&label).into_owned())
    }

    /// Reads bytes up to (excluding) the first delimiter or EOF.
    pub fn parse_unquoted_label(&mut self, delimiters: &[u8]) -> Result<String, ParsingError> {
        let mut label = Vec::new();
        while let Some(b) = self.peek() {
            if delimiters.contains(&b) {
                break;
            }
            label.push(b);
            self.next_byte();
        }
        Ok(String::from_utf8_lossy(&label).into_owned())
    }

    /// Reads the longest run of bytes that may form a float literal
    /// (digits, sign, decimal point, exponent) and parses it.
    ///
    /// # Returns
    /// `Ok(None)` if no such byte follows, otherwise the parsed value.
    ///
    /// # Errors
    /// [ParsingError] if the run is not a valid float (e.g. `1.2.3`).
    pub fn parse_number(&mut self) -> Result<Option<f64>, ParsingError> {
        let mut literal = String::new();
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E') {
                literal.push(b as char);
                self.next_byte();
            } else {
                break;
            }
        }
        if literal.is_empty() {
            return Ok(None);
        }

        literal.parse::<f64>().map(Some).map_err(|_| {
            ParsingError::invalid_newick_string(self, format!("Invalid number: {literal}"))
        })
    }
}

// ============================================================================
// Position & Context (pub)
// ============================================================================
impl<S: ByteSource> ByteParser<S> {
    /// Returns whether all input has been consumed.
    pub fn is_eof(&mut self) -> bool {
        self.source.is_eof()
    }

    /// Returns the current absolute byte offset.
    pub fn position(&self) -> usize {
        self.source.position()
    }

    /// Jumps to the given absolute byte offset.
    pub fn set_position(&mut self, pos: usize) {
        self.source.set_position(pos);
    }

    /// Returns up to `k` upcoming bytes as (lossy) text, for error messages.
    pub fn get_context_as_string(&mut self, k: usize) -> String {
        String::from_utf8_lossy(&self.source.get_context(k)).into_owned()
    }
}

/// Whether the `consume_until*` methods also consume the target itself.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ConsumeMode {
    /// Stop after the target
    Inclusive,
    /// Stop at the target
    Exclusive,
}
