//! Vertices of the arena [Tree](crate::model::Tree).

use crate::model::taxon_map::TaxonIndex;
use crate::model::tree::VertexIndex;
use std::fmt;
use std::ops::Deref;

// =#========================================================================#=
// VERTEX
// =#========================================================================#=
/// A vertex of a rooted phylogenetic tree.
///
/// A vertex is either:
/// - **Internal**: two children, no taxon
/// - **Leaf**: no children, refers to a taxon via [TaxonIndex]
///
/// The root is the vertex without a parent. It may be a leaf, which allows
/// single-taxon trees. Each vertex owns the branch (edge) to its parent;
/// a root branch length is optional and only meaningful in *BEAST output.
#[derive(PartialEq, Debug, Clone)]
pub enum Vertex {
    /// Vertex with two children
    Internal {
        index: VertexIndex,
        parent: Option<VertexIndex>,
        children: (VertexIndex, VertexIndex),
        branch_length: Option<BranchLength>,
    },
    /// Tip of the tree
    Leaf {
        index: VertexIndex,
        parent: Option<VertexIndex>,
        taxon: TaxonIndex,
        branch_length: Option<BranchLength>,
    },
}

impl Vertex {
    /// Creates an internal vertex without parent.
    pub fn new_internal(
        index: VertexIndex,
        children: (VertexIndex, VertexIndex),
        branch_length: Option<BranchLength>,
    ) -> Self {
        Vertex::Internal {
            index,
            parent: None,
            children,
            branch_length,
        }
    }

    /// Creates a leaf without parent.
    pub fn new_leaf(index: VertexIndex, taxon: TaxonIndex, branch_length: Option<BranchLength>) -> Self {
        Vertex::Leaf {
            index,
            parent: None,
            taxon,
            branch_length,
        }
    }

    /// Returns the index of this vertex in its tree's arena.
    pub fn index(&self) -> VertexIndex {
        match self {
            Vertex::Internal { index, .. } | Vertex::Leaf { index, .. } => *index,
        }
    }

    /// Returns the parent index, `None` for the root (or during construction).
    pub fn parent(&self) -> Option<VertexIndex> {
        match self {
            Vertex::Internal { parent, .. } | Vertex::Leaf { parent, .. } => *parent,
        }
    }

    pub(crate) fn set_parent(&mut self, new_parent: VertexIndex) {
        match self {
            Vertex::Internal { parent, .. } | Vertex::Leaf { parent, .. } => {
                *parent = Some(new_parent)
            }
        }
    }

    /// Returns the children of an internal vertex, `None` for a leaf.
    pub fn children(&self) -> Option<(VertexIndex, VertexIndex)> {
        match self {
            Vertex::Internal { children, .. } => Some(*children),
            Vertex::Leaf { .. } => None,
        }
    }

    /// Iterates over the children (none for a leaf).
    pub fn child_iter(&self) -> impl Iterator<Item = VertexIndex> + use<> {
        self.children().into_iter().flat_map(|(l, r)| [l, r])
    }

    /// Returns the taxon of a leaf, `None` for an internal vertex.
    pub fn taxon(&self) -> Option<TaxonIndex> {
        match self {
            Vertex::Leaf { taxon, .. } => Some(*taxon),
            Vertex::Internal { .. } => None,
        }
    }

    /// Returns the length of the branch to the parent, if known.
    pub fn branch_length(&self) -> Option<BranchLength> {
        match self {
            Vertex::Internal { branch_length, .. } | Vertex::Leaf { branch_length, .. } => {
                *branch_length
            }
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Vertex::Leaf { .. })
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Vertex::Internal { .. })
    }

    /// Returns whether this vertex has no parent.
    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }
}

// =#========================================================================#=
// BRANCH LENGTH
// =#========================================================================#=
/// Length of the branch between a vertex and its parent;
/// non-negative and finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct BranchLength(f64);

impl BranchLength {
    /// Creates a branch length.
    ///
    /// # Panics
    /// Panics if `length` is negative or not finite; parsers check with
    /// [BranchLength::try_new] first.
    pub fn new(length: f64) -> Self {
        Self::try_new(length).unwrap_or_else(|| panic!("Invalid branch length {length}"))
    }

    /// Creates a branch length, or `None` if `length` is negative or not finite.
    pub fn try_new(length: f64) -> Option<Self> {
        (length >= 0.0 && length.is_finite()).then_some(BranchLength(length))
    }
}

impl Deref for BranchLength {
    type Target = f64;
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl fmt::Display for BranchLength {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
