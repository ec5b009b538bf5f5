//! Newick format writing, including vertex attributes.

use crate::model::tree::{Tree, VertexIndex};
use crate::model::vertex::BranchLength;
use crate::model::TaxonMap;
use crate::newick::defs::BUFFER_CHARS;
use crate::parser::utils::escape_label;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Style for serializing a tree to Newick format,
/// controlling how leaf labels are represented in the output string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NewickStyle {
    /// Use full taxon labels from the [TaxonMap]
    Label,
    /// Use 1-based taxon indices (as with a NEXUS TRANSLATE command)
    OneIndexed,
}

/// Writes the given trees to a file in Newick format, one tree per line.
///
/// # Errors
/// Returns an I/O error if writing fails.
pub fn write_newick_file(file: File, trees: &[Tree], taxa: &TaxonMap) -> io::Result<()> {
    let mut writer = BufWriter::new(file);
    for tree in trees {
        writer.write_all(to_newick(tree, taxa).as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Returns the Newick representation of the tree with closing semicolon.
///
/// Vertex attributes (see [Tree::set_attribute]) are written as an
/// annotation block `[&key=value,...]` with keys in sorted order, placed
/// between the label and the branch length.
///
/// # Example
/// ```
/// use popsizes::model::{BranchLength, TaxonMap, Tree};
/// use popsizes::newick::to_newick;
///
/// let mut taxa = TaxonMap::new();
/// let mut tree = Tree::new();
/// let a = tree.add_leaf(taxa.get_or_insert("A"), Some(BranchLength::new(1.0)));
/// let b = tree.add_leaf(taxa.get_or_insert("B"), Some(BranchLength::new(2.5)));
/// let root = tree.add_internal_vertex((a, b), None);
/// tree.set_root(root);
/// tree.set_attribute(a, "dmv", "{1,2}".to_string());
///
/// assert_eq!(to_newick(&tree, &taxa), "(A[&dmv={1,2}]:1,B:2.5);");
/// ```
pub fn to_newick(tree: &Tree, taxa: &TaxonMap) -> String {
    to_newick_with_style(tree, taxa, NewickStyle::Label)
}

/// Returns the Newick representation of the tree using the given
/// [NewickStyle] for leaf labels.
pub fn to_newick_with_style(tree: &Tree, taxa: &TaxonMap, style: NewickStyle) -> String {
    // Recursive helper for building the Newick string
    fn build_newick(
        tree: &Tree,
        newick: &mut String,
        index: VertexIndex,
        taxa: &TaxonMap,
        style: NewickStyle,
    ) {
        let vertex = &tree[index];

        match (vertex.children(), vertex.taxon()) {
            (Some((left, right)), _) => {
                newick.push('(');
                build_newick(tree, newick, left, taxa, style);
                newick.push(',');
                build_newick(tree, newick, right, taxa, style);
                newick.push(')');
            }
            (None, Some(taxon)) => match style {
                NewickStyle::Label => {
                    let label = taxa.get_label(taxon).unwrap_or_default();
                    newick.push_str(&escape_label(label));
                }
                NewickStyle::OneIndexed => newick.push_str(&(taxon + 1).to_string()),
            },
            (None, None) => {}
        }

        build_attributes(newick, tree.attributes(index));
        build_branch_length(newick, vertex.branch_length());
    }

    let mut newick = String::with_capacity(estimate_newick_len(tree, taxa));
    if tree.is_root_set() {
        build_newick(tree, &mut newick, tree.root_index(), taxa, style);
    }
    newick.push(';');
    newick
}

fn build_attributes(newick: &mut String, attributes: &BTreeMap<String, String>) {
    if attributes.is_empty() {
        return;
    }
    newick.push_str("[&");
    for (i, (key, value)) in attributes.iter().enumerate() {
        if i > 0 {
            newick.push(',');
        }
        newick.push_str(key);
        newick.push('=');
        newick.push_str(value);
    }
    newick.push(']');
}

fn build_branch_length(newick: &mut String, branch_length: Option<BranchLength>) {
    if let Some(branch_length) = branch_length {
        newick.push(':');
        newick.push_str(&branch_length.to_string());
    }
}

/// Rough length of the Newick string of a tree, used to pre-allocate.
fn estimate_newick_len(tree: &Tree, taxa: &TaxonMap) -> usize {
    // "(,)" per internal vertex, ":0.009529961339106089" per branch
    const INTERNAL_VERTEX_CHARS: usize = 3;
    const BRANCH_LENGTH_CHARS: usize = 20;

    let label_chars: usize = taxa.labels().iter().map(String::len).sum();
    let num_vertices = tree.num_vertices();
    num_vertices / 2 * INTERNAL_VERTEX_CHARS
        + num_vertices * BRANCH_LENGTH_CHARS
        + label_chars
        + BUFFER_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick::parse_str;

    #[test]
    fn test_write_then_read_keeps_attributes() {
        let (mut tree, taxa) = parse_str("(('Pan paniscus':1,B:1):0.5,C:1.5);").unwrap();
        let root = tree.root_index();
        tree.set_attribute(root, "dmv", "{2,3}".to_string());
        tree.set_attribute(root, "dmt", "0.25".to_string());

        let newick = to_newick(&tree, &taxa);
        assert_eq!(newick, "(('Pan paniscus':1,B:1):0.5,C:1.5)[&dmt=0.25,dmv={2,3}];");

        let (reread, _) = parse_str(&newick).unwrap();
        assert_eq!(
            reread.annotations().get("dmv", reread.root_index()).and_then(|v| v.as_f64_list()),
            Some(vec![2.0, 3.0])
        );
    }

    #[test]
    fn test_one_indexed_style() {
        let (tree, taxa) = parse_str("(A:1,(B:1,C:1):1);").unwrap();
        assert_eq!(
            to_newick_with_style(&tree, &taxa, NewickStyle::OneIndexed),
            "(1:1,(2:1,3:1):1);"
        );
    }
}
