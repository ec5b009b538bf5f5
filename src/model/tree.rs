//! Arena-based rooted binary tree.
//!
//! A [Tree] stores its [Vertex] values in a `Vec` and refers to them by
//! [VertexIndex]. Besides topology and branch lengths, every vertex has
//! - parsed [Annotations] (e.g. *BEAST `dmv`/`dmt`),
//! - a [Demographic] slot, filled by
//!   [set_demographics](crate::demographic::set_demographics),
//! - an attribute map written by the estimators and printed by the Newick
//!   writer.

use crate::demographic::Demographic;
use crate::model::annotation::Annotations;
use crate::model::taxon_map::TaxonIndex;
use crate::model::vertex::{BranchLength, Vertex};
use std::collections::BTreeMap;

/// Index of a vertex in the arena of its [Tree].
pub type VertexIndex = usize;

// =$========================================================================$=
// TREE
// =$========================================================================$=
/// A rooted binary phylogenetic tree.
///
/// Vertices are added bottom-up: children first, then the internal vertex
/// joining them, and finally [Tree::set_root]. Leaves refer to taxa of an
/// external [TaxonMap](crate::model::TaxonMap).
///
/// # Example
/// ```
/// use popsizes::model::{BranchLength, TaxonMap, Tree};
///
/// let mut taxa = TaxonMap::new();
/// let mut tree = Tree::new();
/// let a = tree.add_leaf(taxa.get_or_insert("A"), Some(BranchLength::new(1.0)));
/// let b = tree.add_leaf(taxa.get_or_insert("B"), Some(BranchLength::new(1.0)));
/// let root = tree.add_internal_vertex((a, b), None);
/// tree.set_root(root);
///
/// assert!(tree.is_valid());
/// assert_eq!(tree.num_leaves(), 2);
/// assert_eq!(tree.heights(), vec![0.0, 0.0, 1.0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Tree {
    vertices: Vec<Vertex>,
    root_index: Option<VertexIndex>,
    name: Option<String>,
    annotations: Annotations,
    demographics: Vec<Option<Demographic>>,
    attributes: Vec<BTreeMap<String, String>>,
}

// ============================================================================
// Construction (pub)
// ============================================================================
impl Tree {
    /// Creates an empty tree without root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a leaf for `taxon` and returns its index.
    pub fn add_leaf(&mut self, taxon: TaxonIndex, branch_length: Option<BranchLength>) -> VertexIndex {
        let index = self.vertices.len();
        self.push(Vertex::new_leaf(index, taxon, branch_length));
        index
    }

    /// Adds an internal vertex above two existing vertices and returns its
    /// index. The children's parent references are set accordingly.
    ///
    /// # Panics
    /// Panics if a child index is out of bounds.
    pub fn add_internal_vertex(
        &mut self,
        children: (VertexIndex, VertexIndex),
        branch_length: Option<BranchLength>,
    ) -> VertexIndex {
        let index = self.vertices.len();
        self.vertices[children.0].set_parent(index);
        self.vertices[children.1].set_parent(index);
        self.push(Vertex::new_internal(index, children, branch_length));
        index
    }

    /// Marks the vertex at `index` as root.
    pub fn set_root(&mut self, index: VertexIndex) {
        self.root_index = Some(index);
    }

    fn push(&mut self, vertex: Vertex) {
        self.vertices.push(vertex);
        self.demographics.push(None);
        self.attributes.push(BTreeMap::new());
    }
}

// ============================================================================
// Getters / Accessors (pub)
// ============================================================================
impl Tree {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    /// Returns whether a root has been set.
    pub fn is_root_set(&self) -> bool {
        self.root_index.is_some()
    }

    /// Returns the root index.
    ///
    /// # Panics
    /// Panics if no root has been set.
    pub fn root_index(&self) -> VertexIndex {
        self.root_index
            .unwrap_or_else(|| panic!("Root of tree has not been set"))
    }

    /// Returns the root vertex.
    ///
    /// # Panics
    /// Panics if no root has been set.
    pub fn root(&self) -> &Vertex {
        &self.vertices[self.root_index()]
    }

    /// Returns the vertex at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn vertex(&self, index: VertexIndex) -> &Vertex {
        &self.vertices[index]
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.vertices.iter().filter(|v| v.is_leaf()).count()
    }

    /// Returns the leaves in post-order.
    pub fn leaves(&self) -> impl Iterator<Item = &Vertex> {
        self.post_order_iter().filter(|v| v.is_leaf())
    }

    /// Returns the parsed annotations of all vertices.
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }

    /// Returns the demographic attached to the branch above `index`.
    pub fn demographic(&self, index: VertexIndex) -> Option<&Demographic> {
        self.demographics[index].as_ref()
    }

    pub fn set_demographic(&mut self, index: VertexIndex, demographic: Demographic) {
        self.demographics[index] = Some(demographic);
    }

    /// Returns whether any vertex carries a demographic.
    pub fn has_demographics(&self) -> bool {
        self.demographics.iter().any(Option::is_some)
    }

    /// Returns the attribute map of the vertex at `index`.
    pub fn attributes(&self, index: VertexIndex) -> &BTreeMap<String, String> {
        &self.attributes[index]
    }

    /// Sets (or replaces) one attribute of the vertex at `index`.
    pub fn set_attribute(&mut self, index: VertexIndex, key: &str, value: String) {
        self.attributes[index].insert(key.to_string(), value);
    }

    /// Returns the distance of each vertex above the most recent tip,
    /// indexed by [VertexIndex]. Missing branch lengths count as zero.
    pub fn heights(&self) -> Vec<f64> {
        let mut depths = vec![0.0; self.num_vertices()];
        for vertex in self.pre_order_iter() {
            if let Some(parent) = vertex.parent() {
                depths[vertex.index()] =
                    depths[parent] + vertex.branch_length().map_or(0.0, |bl| *bl);
            }
        }
        let deepest = depths.iter().copied().fold(0.0, f64::max);
        depths.iter().map(|depth| deepest - depth).collect()
    }
}

impl Tree {
    /// Validates the tree structure and all index references.
    ///
    /// Checks:
    /// - Root is set, in bounds and has no parent
    /// - All vertex indices match their position in the arena
    /// - Children point back to their parent and parents list their children
    /// - Exactly one vertex has no parent
    /// - All vertices are reachable from the root
    ///
    /// # Returns
    /// `true` if tree is valid, `false` otherwise
    pub fn is_valid(&self) -> bool {
        let Some(root_index) = self.root_index else {
            return false;
        };
        if root_index >= self.vertices.len() || !self.vertices[root_index].is_root() {
            return false;
        }

        let mut parentless = 0;
        for (index, vertex) in self.vertices.iter().enumerate() {
            if vertex.index() != index {
                return false;
            }

            if let Some((left, right)) = vertex.children() {
                if left >= self.vertices.len() || right >= self.vertices.len() {
                    return false;
                }
                if self.vertices[left].parent() != Some(index)
                    || self.vertices[right].parent() != Some(index)
                {
                    return false;
                }
            }

            match vertex.parent() {
                None => parentless += 1,
                Some(parent_index) => {
                    let Some((left, right)) = self.vertices.get(parent_index).and_then(Vertex::children)
                    else {
                        return false;
                    };
                    if left != index && right != index {
                        return false;
                    }
                }
            }
        }

        parentless == 1 && self.post_order_iter().count() == self.vertices.len()
    }
}

impl std::ops::Index<VertexIndex> for Tree {
    type Output = Vertex;

    fn index(&self, index: VertexIndex) -> &Self::Output {
        &self.vertices[index]
    }
}

// =$========================================================================$=
// ITERATORS
// =$========================================================================$=
impl Tree {
    /// Returns an iterator over the tree in post-order (children before parents).
    ///
    /// # Example
    /// ```
    /// use popsizes::model::{TaxonMap, Tree};
    ///
    /// let mut taxa = TaxonMap::new();
    /// let mut tree = Tree::new();
    /// let a = tree.add_leaf(taxa.get_or_insert("A"), None);
    /// let b = tree.add_leaf(taxa.get_or_insert("B"), None);
    /// let root = tree.add_internal_vertex((a, b), None);
    /// tree.set_root(root);
    ///
    /// let order: Vec<_> = tree.post_order_iter().map(|v| v.index()).collect();
    /// assert_eq!(order, vec![a, b, root]);
    /// ```
    pub fn post_order_iter(&self) -> PostOrderIter<'_> {
        PostOrderIter::new(self)
    }

    /// Returns an iterator over the tree in pre-order (parents before children).
    pub fn pre_order_iter(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self)
    }
}

/// Iterator for post-order traversal (children before parents).
///
/// Stack-based, so deep caterpillar trees do not recurse.
pub struct PostOrderIter<'a> {
    tree: &'a Tree,
    stack: Vec<(VertexIndex, bool)>, // (index, children_visited)
}

impl<'a> PostOrderIter<'a> {
    fn new(tree: &'a Tree) -> Self {
        PostOrderIter {
            tree,
            stack: tree.root_index.map(|root| (root, false)).into_iter().collect(),
        }
    }
}

impl<'a> Iterator for PostOrderIter<'a> {
    type Item = &'a Vertex;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((index, children_visited)) = self.stack.pop() {
            let vertex = &self.tree[index];
            match vertex.children() {
                Some((left, right)) if !children_visited => {
                    self.stack.push((index, true));
                    self.stack.push((right, false));
                    self.stack.push((left, false));
                }
                _ => return Some(vertex),
            }
        }
        None
    }
}

/// Iterator for pre-order traversal (parents before children).
pub struct PreOrderIter<'a> {
    tree: &'a Tree,
    stack: Vec<VertexIndex>,
}

impl<'a> PreOrderIter<'a> {
    fn new(tree: &'a Tree) -> Self {
        PreOrderIter {
            tree,
            stack: tree.root_index.into_iter().collect(),
        }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = &'a Vertex;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let vertex = &self.tree[index];
        if let Some((left, right)) = vertex.children() {
            self.stack.push(right);
            self.stack.push(left);
        }
        Some(vertex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ((0:1,1:1):2,2:3)
    fn three_taxon_tree() -> Tree {
        let mut tree = Tree::new();
        let a = tree.add_leaf(0, Some(BranchLength::new(1.0)));
        let b = tree.add_leaf(1, Some(BranchLength::new(1.0)));
        let ab = tree.add_internal_vertex((a, b), Some(BranchLength::new(2.0)));
        let c = tree.add_leaf(2, Some(BranchLength::new(3.0)));
        let root = tree.add_internal_vertex((ab, c), None);
        tree.set_root(root);
        tree
    }

    #[test]
    fn test_traversal_orders() {
        let tree = three_taxon_tree();
        let post: Vec<_> = tree.post_order_iter().map(|v| v.index()).collect();
        assert_eq!(post, vec![0, 1, 2, 3, 4]);
        let pre: Vec<_> = tree.pre_order_iter().map(|v| v.index()).collect();
        assert_eq!(pre, vec![4, 2, 0, 1, 3]);
    }

    #[test]
    fn test_heights_and_validity() {
        let tree = three_taxon_tree();
        assert!(tree.is_valid());
        assert_eq!(tree.heights(), vec![0.0, 0.0, 1.0, 0.0, 3.0]);
    }

    #[test]
    fn test_single_leaf_tree_is_valid() {
        let mut tree = Tree::new();
        let a = tree.add_leaf(0, None);
        tree.set_root(a);
        assert!(tree.is_valid());
        assert_eq!(tree.num_leaves(), 1);
        assert_eq!(tree.heights(), vec![0.0]);
    }

    #[test]
    fn test_tree_without_root_is_invalid() {
        let mut tree = Tree::new();
        tree.add_leaf(0, None);
        assert!(!tree.is_valid());
        assert_eq!(tree.post_order_iter().count(), 0);
    }

    #[test]
    fn test_attributes_are_per_vertex() {
        let mut tree = three_taxon_tree();
        tree.set_attribute(2, "dmv", "4".to_string());
        assert_eq!(tree.attributes(2).get("dmv").map(String::as_str), Some("4"));
        assert!(tree.attributes(4).is_empty());
    }
}
