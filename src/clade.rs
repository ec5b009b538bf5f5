//! Clades as canonical taxon sets.
//!
//! A [Clade] identifies a subtree by the set of taxa below it, independent
//! of the subtree's shape. Target and sampled trees are matched by looking
//! sampled clades up in a map keyed by the target's clades.

use crate::model::{TaxonIndex, Tree, VertexIndex};
use std::fmt;

// =#========================================================================#=
// CLADE
// =#========================================================================#=
/// Sorted, deduplicated set of taxon indices.
///
/// Two clades are equal iff they contain the same taxa.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Clade(Vec<TaxonIndex>);

impl Clade {
    /// Creates a clade from taxa in any order, dropping duplicates.
    pub fn new(mut taxa: Vec<TaxonIndex>) -> Self {
        taxa.sort_unstable();
        taxa.dedup();
        Clade(taxa)
    }

    pub fn singleton(taxon: TaxonIndex) -> Self {
        Clade(vec![taxon])
    }

    /// Union of two clades, by merging their sorted taxa.
    pub fn union(&self, other: &Clade) -> Clade {
        let (a, b) = (&self.0, &other.0);
        let mut merged = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            if a[i] < b[j] {
                merged.push(a[i]);
                i += 1;
            } else if b[j] < a[i] {
                merged.push(b[j]);
                j += 1;
            } else {
                merged.push(a[i]);
                i += 1;
                j += 1;
            }
        }
        merged.extend_from_slice(&a[i..]);
        merged.extend_from_slice(&b[j..]);
        Clade(merged)
    }

    pub fn taxa(&self) -> &[TaxonIndex] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The taxon of a one-taxon clade.
    pub fn single_taxon(&self) -> Option<TaxonIndex> {
        match self.0.as_slice() {
            [taxon] => Some(*taxon),
            _ => None,
        }
    }
}

impl fmt::Display for Clade {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, taxon) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{taxon}")?;
        }
        write!(f, "}}")
    }
}

// =#========================================================================#=
// CLADE EXTRACTION
// =#========================================================================#=
/// Returns the clade of every vertex of `tree` in post-order, paired with
/// the vertex index. Leaves are included only if `include_tips` is set.
///
/// # Example
/// ```
/// use popsizes::clade::{clades_of, Clade};
/// use popsizes::newick::parse_str;
///
/// let (tree, _) = parse_str("((A,B),C);")?;
/// let clades = clades_of(&tree, false);
/// assert_eq!(clades[0].0, Clade::new(vec![0, 1]));
/// assert_eq!(clades[1].0, Clade::new(vec![0, 1, 2]));
/// assert_eq!(clades_of(&tree, true).len(), 5);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn clades_of(tree: &Tree, include_tips: bool) -> Vec<(Clade, VertexIndex)> {
    mapped_clades_of(tree, include_tips, Some)
}

/// Like [clades_of], but every leaf taxon is first mapped through `map`.
///
/// A leaf whose taxon maps to [None] poisons its own clade and every clade
/// above it: those vertices are not returned. This is how clades with
/// taxa foreign to a target tree are excluded from matching.
pub fn mapped_clades_of<F>(tree: &Tree, include_tips: bool, map: F) -> Vec<(Clade, VertexIndex)>
where
    F: Fn(TaxonIndex) -> Option<TaxonIndex>,
{
    let mut clades: Vec<Option<Clade>> = vec![None; tree.num_vertices()];
    let mut result = Vec::with_capacity(tree.num_vertices());

    for vertex in tree.post_order_iter() {
        let index = vertex.index();
        let clade = match (vertex.children(), vertex.taxon()) {
            (Some((left, right)), _) => match (&clades[left], &clades[right]) {
                (Some(l), Some(r)) => Some(l.union(r)),
                _ => None,
            },
            (None, Some(taxon)) => map(taxon).map(Clade::singleton),
            (None, None) => None,
        };
        if let Some(clade) = &clade {
            if include_tips || vertex.is_internal() {
                result.push((clade.clone(), index));
            }
        }
        clades[index] = clade;
    }
    result
}
