//! Interning of taxon labels.
//!
//! Leaves store a compact [TaxonIndex] instead of their label. All trees read
//! from one NEXUS file share the [TaxonMap] built from its TAXA block; the
//! target tree has its own map, and clades are compared by label through
//! [TaxonMap::translation_to].

use std::collections::HashMap;
use std::fmt;

/// Index of a taxon label in a [TaxonMap].
pub type TaxonIndex = usize;

// =#========================================================================#=
// TAXON MAP
// =#========================================================================#=
/// Bidirectional mapping between taxon labels and dense indices.
///
/// # Example
/// ```
/// use popsizes::model::TaxonMap;
///
/// let mut taxa = TaxonMap::with_capacity(2);
/// let human = taxa.get_or_insert("Homo_sapiens");
/// let chimp = taxa.get_or_insert("Pan_troglodytes");
/// assert_eq!(taxa.get_or_insert("Homo_sapiens"), human);
/// assert_eq!(taxa.get_label(chimp), Some("Pan_troglodytes"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TaxonMap {
    labels: Vec<String>,
    indices: HashMap<String, TaxonIndex>,
}

impl TaxonMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with room for `capacity` labels.
    pub fn with_capacity(capacity: usize) -> Self {
        TaxonMap {
            labels: Vec::with_capacity(capacity),
            indices: HashMap::with_capacity(capacity),
        }
    }

    /// Returns the index of `label`, inserting it first if new.
    pub fn get_or_insert(&mut self, label: &str) -> TaxonIndex {
        if let Some(&index) = self.indices.get(label) {
            return index;
        }
        let index = self.labels.len();
        self.labels.push(label.to_string());
        self.indices.insert(label.to_string(), index);
        index
    }

    /// Returns the index of `label`, if present.
    pub fn get_index(&self, label: &str) -> Option<TaxonIndex> {
        self.indices.get(label).copied()
    }

    /// Returns the label at `index`, if present.
    pub fn get_label(&self, index: TaxonIndex) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.indices.contains_key(label)
    }

    /// Returns the number of taxa.
    pub fn num_taxa(&self) -> usize {
        self.labels.len()
    }

    /// Returns all labels in index order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Maps each index of this map to the index of the same label in
    /// `other`, or `None` where `other` lacks the label.
    pub fn translation_to(&self, other: &TaxonMap) -> Vec<Option<TaxonIndex>> {
        self.labels
            .iter()
            .map(|label| other.get_index(label))
            .collect()
    }
}

impl fmt::Display for TaxonMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "TaxonMap ({} taxa):", self.labels.len())?;
        for (index, label) in self.labels.iter().enumerate() {
            writeln!(f, "  [{index}] {label}")?;
        }
        Ok(())
    }
}

impl std::ops::Index<TaxonIndex> for TaxonMap {
    type Output = str;

    fn index(&self, index: TaxonIndex) -> &Self::Output {
        &self.labels[index]
    }
}
