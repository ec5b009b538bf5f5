//! Newick format parser and writer for phylogenetic trees.
//!
//! This module provides [NewickParser] to parse Newick format strings into
//! [Tree] values. It is used directly for the target tree and by the NEXUS
//! parser for every tree command.
//!
//! # Quick API
//! * [`parse_file`] - parses a file, returns all trees and their taxa
//! * [`parse_str`] - parses a single string, returns the tree and its taxa
//!
//! # Format
//! The Newick format has the following simple grammar:
//! * `tree ::= vertex ';'`
//! * `vertex ::= leaf | internal_vertex`
//! * `internal_vertex ::= '(' vertex ',' vertex ')' [label] [annotation] [branch_length]`
//! * `leaf ::= label [annotation] [branch_length]`
//! * `branch_length ::= ':' [annotation] number`
//!
//! Furthermore:
//! * Whitespace can occur between elements,
//!   just not within an unquoted label or a branch length
//! * Comments are square brackets and can occur anywhere where whitespace
//!   is allowed
//!
//! *BEAST writes the demographic of each branch as annotation, e.g.
//! `(A[&dmv={0.5,0.7},dmt=1.2]:1.2, ...)`. Both the BEAST 1 position
//! (before the `:`) and the BEAST 2 position (after the `:`) are accepted.

mod defs;
pub mod parser;
pub mod writer;

pub use parser::NewickParser;
pub use writer::{NewickStyle, to_newick, to_newick_with_style, write_newick_file};

use crate::model::{TaxonMap, Tree};
use crate::parser::ParsingError;
use crate::parser::byte_parser::ByteParser;
use std::path::Path;

// ============================================================================
// QUICK PARSING API (pub)
// ============================================================================
/// Parses a Newick file eagerly and returns all trees together with their
/// shared taxa. Annotations are parsed.
///
/// # Arguments
/// * `path` - Path to a file with a semicolon-separated list of Newick strings
///
/// # Errors
/// [ParsingError] if file reading fails or the Newick format is invalid.
///
/// # Example
/// ```no_run
/// use popsizes::newick::parse_file;
///
/// let (trees, taxa) = parse_file("species.nwk")?;
/// println!("Parsed {} trees with {} taxa", trees.len(), taxa.num_taxa());
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<(Vec<Tree>, TaxonMap), ParsingError> {
    let byte_parser = ByteParser::from_file_buffered(path)?;
    let mut newick_parser = NewickParser::new().with_annotations();
    let trees = newick_parser.parse_all(byte_parser)?;
    Ok((trees, newick_parser.into_taxa()))
}

/// Parses a single Newick string, with annotations.
///
/// # Errors
/// [ParsingError] if the string is not valid Newick format.
///
/// # Example
/// ```
/// use popsizes::newick::parse_str;
///
/// let (tree, taxa) = parse_str("(Fratercula_cirrhata,(Fratercula_arctica,Fratercula_corniculata));")?;
/// assert_eq!(tree.num_leaves(), 3);
/// assert_eq!(taxa.get_index("Fratercula_arctica"), Some(1));
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse_str<S: AsRef<str>>(newick: S) -> Result<(Tree, TaxonMap), ParsingError> {
    let mut newick_parser = NewickParser::new().with_annotations();
    let mut byte_parser = ByteParser::for_str(newick.as_ref());
    let tree = newick_parser.parse_str(&mut byte_parser)?;
    Ok((tree, newick_parser.into_taxa()))
}
