//! Data model for rooted binary phylogenetic trees.
//!
//! # Tree representation
//! [Tree] uses the arena pattern to store [Vertex] values, referenced by
//! [VertexIndex]. A vertex is either `Internal` or a `Leaf`; the root is the
//! vertex without a parent, so single-taxon trees are representable.
//!
//! # Label handling
//! During parsing, labels flow through:
//! 1. [LabelResolver], which translates Newick labels (according to a NEXUS
//!    TRANSLATE command, if any)
//! 2. [TaxonMap], which interns labels and hands out [TaxonIndex] values
//!    stored in the leaves

pub mod annotation;
pub mod label_resolver;
pub mod taxon_map;
pub mod tree;
pub mod vertex;

pub use annotation::{AnnotationValue, Annotations};
pub use label_resolver::{LabelResolver, LabelResolvingError};
pub use taxon_map::{TaxonIndex, TaxonMap};
pub use tree::{Tree, VertexIndex};
pub use vertex::{BranchLength, Vertex};
