//! Low-level byte parsing shared by the Newick and NEXUS readers.
pub(crate) mod buffered_byte_source;
pub mod byte_parser;
pub mod byte_source;
pub(crate) mod in_memory_byte_source;
pub mod parsing_error;
pub mod utils;

pub use byte_parser::{ByteParser, ConsumeMode};
pub use parsing_error::{ParsingError, ParsingErrorType};
