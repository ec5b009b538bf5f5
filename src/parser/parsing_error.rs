//! Error types for reading Newick strings and NEXUS tree files.
//!
//! [ParsingError] wraps a [ParsingErrorType] together with the byte position
//! at which parsing stopped and a short excerpt of the upcoming input.

use crate::parser::byte_parser::ByteParser;
use crate::parser::byte_source::ByteSource;
use thiserror::Error;

/// Number of upcoming bytes captured as context of an error
const DEFAULT_CONTEXT_LENGTH: usize = 50;

// =#========================================================================#=
// PARSING ERROR TYPE
// =#========================================================================#=
/// Kinds of failure while reading tree input.
#[derive(PartialEq, Debug, Clone, Error)]
pub enum ParsingErrorType {
    #[error("IO error - {0}")]
    IoError(String),
    #[error("Unexpected end of file")]
    UnexpectedEOF,
    #[error("File does not start with #NEXUS header")]
    MissingNexusHeader,
    #[error("Invalid TAXA block format - {0}")]
    InvalidTaxaBlock(String),
    #[error("Invalid TREES block format - {0}")]
    InvalidTreesBlock(String),
    #[error("Invalid TRANSLATE command - {0}")]
    InvalidTranslateCommand(String),
    #[error("Unclosed comment")]
    UnclosedComment,
    #[error("Unclosed quoted label")]
    UnclosedQuote,
    #[error("Invalid newick string: {0}")]
    InvalidNewickString(String),
    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(String),
    #[error("Invalid formatting")]
    InvalidFormatting,
    #[error("Could not resolve label - {0}")]
    UnresolvedLabel(String),
}

// =#========================================================================#=
// PARSING ERROR
// =#========================================================================#=
/// Parsing error with the byte position and upcoming bytes where it occurred.
#[derive(Debug, Error)]
#[error("{kind} at position {position}{}", context_suffix(.context))]
pub struct ParsingError {
    kind: ParsingErrorType,
    position: usize,
    context: String,
}

fn context_suffix(context: &str) -> String {
    if context.is_empty() {
        String::new()
    } else {
        format!("\n  Context (next {} bytes): {}", context.len(), context)
    }
}

impl ParsingError {
    /// Creates a [ParsingError] of the given kind at the parser's current position.
    pub fn from_parser<S: ByteSource>(kind: ParsingErrorType, parser: &mut ByteParser<S>) -> Self {
        Self {
            kind,
            position: parser.position(),
            context: parser.get_context_as_string(DEFAULT_CONTEXT_LENGTH),
        }
    }

    /// Creates a [ParsingError] that is not tied to a parser position.
    pub fn without_context(kind: ParsingErrorType) -> Self {
        Self {
            kind,
            position: 0,
            context: String::new(),
        }
    }

    pub fn unexpected_eof<S: ByteSource>(parser: &mut ByteParser<S>) -> Self {
        Self::from_parser(ParsingErrorType::UnexpectedEOF, parser)
    }

    pub fn missing_nexus_header<S: ByteSource>(parser: &mut ByteParser<S>) -> Self {
        Self::from_parser(ParsingErrorType::MissingNexusHeader, parser)
    }

    pub fn invalid_taxa_block<S: ByteSource>(parser: &mut ByteParser<S>, msg: String) -> Self {
        Self::from_parser(ParsingErrorType::InvalidTaxaBlock(msg), parser)
    }

    pub fn invalid_trees_block<S: ByteSource>(parser: &mut ByteParser<S>, msg: String) -> Self {
        Self::from_parser(ParsingErrorType::InvalidTreesBlock(msg), parser)
    }

    pub fn invalid_translate_command<S: ByteSource>(
        parser: &mut ByteParser<S>,
        msg: String,
    ) -> Self {
        Self::from_parser(ParsingErrorType::InvalidTranslateCommand(msg), parser)
    }

    pub fn unclosed_comment<S: ByteSource>(parser: &mut ByteParser<S>) -> Self {
        Self::from_parser(ParsingErrorType::UnclosedComment, parser)
    }

    pub fn unclosed_quote<S: ByteSource>(parser: &mut ByteParser<S>) -> Self {
        Self::from_parser(ParsingErrorType::UnclosedQuote, parser)
    }

    pub fn invalid_newick_string<S: ByteSource>(parser: &mut ByteParser<S>, msg: String) -> Self {
        Self::from_parser(ParsingErrorType::InvalidNewickString(msg), parser)
    }

    pub fn invalid_annotation<S: ByteSource>(parser: &mut ByteParser<S>, msg: String) -> Self {
        Self::from_parser(ParsingErrorType::InvalidAnnotation(msg), parser)
    }

    pub fn invalid_formatting<S: ByteSource>(parser: &mut ByteParser<S>) -> Self {
        Self::from_parser(ParsingErrorType::InvalidFormatting, parser)
    }

    pub fn unresolved_label<S: ByteSource>(parser: &mut ByteParser<S>, msg: String) -> Self {
        Self::from_parser(ParsingErrorType::UnresolvedLabel(msg), parser)
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> &ParsingErrorType {
        &self.kind
    }

    /// Returns the byte position at which the error occurred.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl From<std::io::Error> for ParsingError {
    fn from(err: std::io::Error) -> Self {
        ParsingError::without_context(ParsingErrorType::IoError(err.to_string()))
    }
}
