//! Constants for the Newick parser and writer.

/// Newick label delimiters: parentheses, comma, colon, semicolon, whitespace,
/// comment brackets
pub(crate) const NEWICK_LABEL_DELIMITERS: &[u8] = b"([,:; \n\t\r)]";

/// Opening of an annotation comment, e.g. `[&dmv={1,2}]`
pub(crate) const ANNOTATION_START: &[u8] = b"[&";

/// Extra buffer in Newick string length/capacity estimate
pub(crate) const BUFFER_CHARS: usize = 10;
