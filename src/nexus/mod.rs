//! NEXUS format parser and writer for phylogenetic trees.
//!
//! This module provides:
//! - [NexusParserBuilder] / [NexusParser]: lazily stream trees from NEXUS
//!   files, with burnin, skip-first and every-k thinning
//! - [NexusWriter]: write NEXUS files tree by tree
//!
//! # Format
//! A NEXUS file typically contains:
//! - A TAXA block defining the species/labels
//! - A TREES block containing multiple phylogenetic trees
//! - Optional TRANSLATE commands mapping short keys to full taxon labels
//!
//! ## Assumptions
//! * A `TREES` block is present; a `TAXA` block, if present, precedes it
//! * A `TRANSLATE` command, if present, precedes any `TREE` command:
//!   - Command is a comma separated list of pairs `TRANSLATE key label, ...;`
//!   - Keys are either all integers `1..=n` or arbitrary words
//!   - Every `label` must be listed in the `TAXA` block, if there is one
//!   - A label with a space or apostrophe must be enclosed in single quotes
//!     and an apostrophe is escaped by doubling it, e.g.
//!     `'Wilson''s storm-petrel'`
//! * One tree command has format `tree <name> [comments] = [&R] <Newick string>;`

mod defs;
mod parser;
mod writer;

pub use self::parser::{Burnin, NexusParser, NexusParserBuilder, ReadStrategy};
pub use self::writer::NexusWriter;
