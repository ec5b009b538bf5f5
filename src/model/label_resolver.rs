//! Label resolution for Newick and NEXUS tree parsing.
//!
//! A [LabelResolver] turns the leaf labels found in a Newick string into
//! [TaxonIndex] values of its [TaxonMap]. In NEXUS files the labels are
//! usually TRANSLATE keys rather than taxon names.

use crate::model::taxon_map::{TaxonIndex, TaxonMap};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

// =#========================================================================#=
// LABEL RESOLVER
// =#========================================================================€=
/// Resolves labels in Newick strings during parsing.
///
/// Different variants handle different scenarios:
/// - [VerbatimLabels](Self::VerbatimLabels): plain Newick input or NEXUS
///   without TRANSLATE
/// - [NexusLabels](Self::NexusLabels): NEXUS with arbitrary TRANSLATE keys
/// - [NexusIntegerLabels](Self::NexusIntegerLabels): NEXUS with the usual
///   consecutive integer keys `1..=n`
#[derive(Debug)]
pub enum LabelResolver {
    /// Interns every label as it is encountered.
    VerbatimLabels(TaxonMap),

    /// Resolves labels through a TRANSLATE mapping.
    ///
    /// Tries, in order:
    /// 1. key of the TRANSLATE map (e.g. "terny" -> "White-fronted tern")
    /// 2. integer as 1-based index into the TAXA block
    /// 3. verbatim taxon label
    NexusLabels {
        index_map: HashMap<String, TaxonIndex>,
        taxa: TaxonMap,
    },

    /// Resolves integer labels by direct array lookup (0-based internally).
    NexusIntegerLabels {
        index_array: Vec<TaxonIndex>,
        taxa: TaxonMap,
    },
}

impl LabelResolver {
    /// Creates a [VerbatimLabels](Self::VerbatimLabels) resolver.
    pub fn new_verbatim_labels_resolver(taxa: TaxonMap) -> Self {
        LabelResolver::VerbatimLabels(taxa)
    }

    /// Creates a [NexusLabels](Self::NexusLabels) resolver.
    ///
    /// # Arguments
    /// * `translation` - TRANSLATE mapping (key -> full taxon label)
    /// * `taxa` - taxa of the file; translated labels missing from it are added
    pub fn new_nexus_labels_resolver(
        translation: &[(String, String)],
        mut taxa: TaxonMap,
    ) -> Self {
        let index_map = translation
            .iter()
            .map(|(key, label)| (key.clone(), taxa.get_or_insert(label)))
            .collect();
        LabelResolver::NexusLabels { index_map, taxa }
    }

    /// Creates a [NexusIntegerLabels](Self::NexusIntegerLabels) resolver.
    ///
    /// # Errors
    /// [LabelResolvingError] if a key is not an integer in `1..=n` or the keys
    /// do not cover `1..=n`, where n is the number of TRANSLATE entries.
    pub fn new_nexus_integer_labels_resolver(
        translation: &[(String, String)],
        mut taxa: TaxonMap,
    ) -> Result<Self, LabelResolvingError> {
        let num_keys = translation.len();
        let mut index_array: Vec<Option<TaxonIndex>> = vec![None; num_keys];

        for (key, label) in translation {
            let nexus_index = key.parse::<usize>().map_err(|_| {
                LabelResolvingError(format!("TRANSLATE key '{key}' is not a valid integer"))
            })?;
            if nexus_index == 0 || nexus_index > num_keys {
                return Err(LabelResolvingError(format!(
                    "TRANSLATE index {nexus_index} out of bounds (1-based indexing, valid range: 1-{num_keys})"
                )));
            }
            index_array[nexus_index - 1] = Some(taxa.get_or_insert(label));
        }

        let index_array = index_array
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| LabelResolvingError(format!("Missing translation for index {}", i + 1)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LabelResolver::NexusIntegerLabels { index_array, taxa })
    }

    /// Resolves a parsed label to its taxon index.
    ///
    /// # Errors
    /// [LabelResolvingError] if a NEXUS resolver cannot match the label.
    pub fn resolve_label(&mut self, parsed_label: &str) -> Result<TaxonIndex, LabelResolvingError> {
        match self {
            LabelResolver::VerbatimLabels(taxa) => Ok(taxa.get_or_insert(parsed_label)),

            LabelResolver::NexusLabels { index_map, taxa } => {
                if let Some(&index) = index_map.get(parsed_label) {
                    return Ok(index);
                }
                if let Ok(nexus_index) = parsed_label.parse::<usize>() {
                    if nexus_index == 0 || nexus_index > taxa.num_taxa() {
                        return Err(LabelResolvingError(format!(
                            "Nexus label index {nexus_index} out of bounds (1-based indexing, max {})",
                            taxa.num_taxa()
                        )));
                    }
                    return Ok(nexus_index - 1);
                }
                taxa.get_index(parsed_label).ok_or_else(|| {
                    LabelResolvingError(format!("Could not resolve '{parsed_label}'"))
                })
            }

            LabelResolver::NexusIntegerLabels { index_array, .. } => {
                let nexus_index = parsed_label.parse::<usize>().map_err(|_| {
                    LabelResolvingError(format!("Integer label required, got '{parsed_label}'"))
                })?;
                if nexus_index == 0 || nexus_index > index_array.len() {
                    return Err(LabelResolvingError(format!(
                        "Index {nexus_index} out of bounds (1-based indexing, valid range: 1-{})",
                        index_array.len()
                    )));
                }
                Ok(index_array[nexus_index - 1])
            }
        }
    }

    /// Returns the taxa resolved into so far.
    pub fn taxa(&self) -> &TaxonMap {
        match self {
            LabelResolver::VerbatimLabels(taxa)
            | LabelResolver::NexusLabels { taxa, .. }
            | LabelResolver::NexusIntegerLabels { taxa, .. } => taxa,
        }
    }

    /// Consumes the resolver and returns its taxa.
    pub fn into_taxa(self) -> TaxonMap {
        match self {
            LabelResolver::VerbatimLabels(taxa)
            | LabelResolver::NexusLabels { taxa, .. }
            | LabelResolver::NexusIntegerLabels { taxa, .. } => taxa,
        }
    }
}

impl fmt::Display for LabelResolver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LabelResolver::VerbatimLabels(_) => writeln!(f, "LabelResolver::VerbatimLabels"),
            LabelResolver::NexusLabels { index_map, taxa } => {
                writeln!(f, "LabelResolver::NexusLabels with internal mapping:")?;
                for (key, &index) in index_map {
                    writeln!(f, "  {key} -> {}", &taxa[index])?;
                }
                Ok(())
            }
            LabelResolver::NexusIntegerLabels { index_array, taxa } => {
                writeln!(f, "LabelResolver::NexusIntegerLabels with array mapping:")?;
                for (i, &index) in index_array.iter().enumerate() {
                    writeln!(f, "  {} -> {}", i + 1, &taxa[index])?;
                }
                Ok(())
            }
        }
    }
}

// =#========================================================================#=
// LABEL RESOLVING ERROR
// =#========================================================================$=
/// Error returned when [LabelResolver] cannot resolve a label.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct LabelResolvingError(pub String);
