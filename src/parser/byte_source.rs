//! Byte source abstraction underneath [ByteParser](crate::parser::ByteParser).
//!
//! Tree sample files range from a few kilobytes to many gigabytes, so the
//! parser reads either from a fully loaded buffer
//! ([InMemoryByteSource](crate::parser::in_memory_byte_source::InMemoryByteSource))
//! or streams through a buffered reader
//! ([BufferedByteSource](crate::parser::buffered_byte_source::BufferedByteSource)).

// =#========================================================================#=
// BYTE SOURCE (Trait)
// =#========================================================================T=
/// Positioned access to a sequence of bytes.
///
/// Positions are absolute byte offsets from the start of the input, which
/// allows the NEXUS parser to count trees in one pass and then jump back.
pub trait ByteSource {
    /// Returns the byte at the current position without consuming it,
    /// or `None` at end of input.
    fn peek(&mut self) -> Option<u8>;

    /// Returns the byte at the current position and advances past it,
    /// or `None` at end of input.
    fn next_byte(&mut self) -> Option<u8>;

    /// Returns up to `k` upcoming bytes without consuming them.
    fn peek_slice(&mut self, k: usize) -> &[u8];

    /// Returns a copy of up to `k` upcoming bytes, used for error context.
    fn get_context(&mut self, k: usize) -> Vec<u8>;

    /// Returns the current absolute byte offset.
    fn position(&self) -> usize;

    /// Moves to the given absolute byte offset.
    fn set_position(&mut self, pos: usize);

    /// Returns whether all input has been consumed.
    fn is_eof(&mut self) -> bool;
}
