//! Posterior population sizes of a target tree, from a stream of sampled
//! trees.
//!
//! [estimate_popsizes] ties the pieces together:
//! 1. checks that the target carries demographics
//! 2. seeds an [Accumulator] with the target clades
//! 3. streams the sampled trees from a [TreeSource], attaching demographics
//!    and folding each tree into the accumulator
//! 4. picks the estimator from the [PopulationModel] of the samples and
//!    annotates the target

use crate::accumulator::{Accumulator, PopulationModel};
use crate::demographic::set_demographics;
use crate::error::PopSizeError;
use crate::estimate::{FitOptions, estimate};
use crate::model::{TaxonMap, Tree};
use crate::nexus::{Burnin, NexusParser, NexusParserBuilder};
use log::{debug, info};
use std::path::Path;

/// Number of trees between two progress messages.
const PROGRESS_INTERVAL: usize = 500;

// =#========================================================================#=
// TREE SOURCE
// =#========================================================================#=
/// A one-pass stream of sampled trees over one shared [TaxonMap].
pub trait TreeSource {
    /// Next tree, `Ok(None)` at the end of the stream.
    fn next_tree(&mut self) -> Result<Option<Tree>, PopSizeError>;

    /// Taxa the leaves of the returned trees refer to.
    fn taxa(&self) -> &TaxonMap;

    /// Number of trees the full stream yields.
    fn num_trees(&self) -> usize;
}

impl TreeSource for NexusParser {
    fn next_tree(&mut self) -> Result<Option<Tree>, PopSizeError> {
        Ok(NexusParser::next_tree(self)?)
    }

    fn taxa(&self) -> &TaxonMap {
        NexusParser::taxa(self)
    }

    fn num_trees(&self) -> usize {
        NexusParser::num_trees(self)
    }
}

/// Trees already in memory, e.g. parsed from a Newick file.
#[derive(Debug)]
pub struct TreeList {
    trees: std::vec::IntoIter<Tree>,
    taxa: TaxonMap,
    num_trees: usize,
}

impl TreeList {
    pub fn new(trees: Vec<Tree>, taxa: TaxonMap) -> Self {
        TreeList {
            num_trees: trees.len(),
            trees: trees.into_iter(),
            taxa,
        }
    }
}

impl TreeSource for TreeList {
    fn next_tree(&mut self) -> Result<Option<Tree>, PopSizeError> {
        Ok(self.trees.next())
    }

    fn taxa(&self) -> &TaxonMap {
        &self.taxa
    }

    fn num_trees(&self) -> usize {
        self.num_trees
    }
}

// =#========================================================================#=
// ESTIMATION
// =#========================================================================#=
/// Settings of one estimation run: how [open_posterior] reads the samples
/// and how [estimate_popsizes] fits them.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationOptions {
    /// Percentage of sampled trees discarded at the start of the file.
    pub burnin: f64,
    /// Keep one of every `every` trees after the burn-in.
    pub every: usize,
    pub fit: FitOptions,
}

impl Default for EstimationOptions {
    fn default() -> Self {
        EstimationOptions {
            burnin: 10.0,
            every: 1,
            fit: FitOptions::default(),
        }
    }
}

/// Opens a NEXUS file of sampled trees with burn-in and thinning of
/// `options` applied, and annotations enabled.
///
/// After `floor(burnin% · total)` trees are skipped, every `every`-th tree
/// is kept, starting with the first one after the burn-in and up to and
/// including the last tree of the file.
///
/// # Errors
/// [PopSizeError::Io] if the file cannot be opened,
/// [PopSizeError::Parsing] if its header or TRANSLATE is malformed.
pub fn open_posterior<P: AsRef<Path>>(
    path: P,
    options: &EstimationOptions,
) -> Result<NexusParser, PopSizeError> {
    let parser = NexusParserBuilder::for_file(path)?
        .with_burnin(Burnin::Percentage(options.burnin / 100.0))
        .with_every(options.every)
        .with_annotations()
        .build()?;
    info!(
        "{} trees in posterior, {} burn-in, using {}",
        parser.num_total_trees(),
        parser.num_burnin_trees(),
        parser.num_trees()
    );
    Ok(parser)
}

/// Estimates population sizes on `target` from the sampled trees of
/// `source` and annotates its vertices with the result.
///
/// # Arguments
/// * `target` - the tree to annotate, with *BEAST demographic annotations
/// * `target_taxa` - taxa of `target`'s leaves
/// * `source` - sampled trees with *BEAST demographic annotations
/// * `fit` - optimizer settings; burn-in and thinning are up to the source
///   (see [open_posterior])
///
/// # Returns
/// The [PopulationModel] that decided the estimator.
///
/// # Errors
/// * [PopSizeError::MissingDemographic] if the target or a sampled tree
///   has no demographic annotations
/// * [PopSizeError::NoSampledTrees] if `source` is empty
/// * any error of parsing, attaching demographics, or estimation
pub fn estimate_popsizes<S: TreeSource>(
    target: &mut Tree,
    target_taxa: &TaxonMap,
    source: &mut S,
    fit: &FitOptions,
) -> Result<PopulationModel, PopSizeError> {
    if !set_demographics(target)? {
        return Err(PopSizeError::MissingDemographic {
            tree: "target tree".to_string(),
        });
    }
    let mut accumulator = Accumulator::new(target, target_taxa);

    let num_trees = source.num_trees();
    info!("Reading {num_trees} trees");
    while let Some(mut tree) = source.next_tree()? {
        if !set_demographics(&mut tree)? {
            return Err(PopSizeError::MissingDemographic {
                tree: tree.name().map_or_else(
                    || format!("sampled tree #{}", accumulator.num_trees() + 1),
                    |name| format!("sampled tree '{name}'"),
                ),
            });
        }
        accumulator.add_tree(&tree, source.taxa())?;

        let done = accumulator.num_trees();
        if done % PROGRESS_INTERVAL == 0 {
            info!("{done} of {num_trees} trees");
        }
    }

    if accumulator.num_trees() == 0 {
        return Err(PopSizeError::NoSampledTrees);
    }
    debug!(
        "{} of {} target clades matched",
        accumulator.num_matched_clades(),
        target.num_vertices()
    );

    let model = accumulator.population_model();
    info!("Population model of the samples: {model}");
    estimate(target, &accumulator, model, fit)?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick::{NewickParser, parse_str};
    use crate::parser::ByteParser;

    fn tree_list(newicks: &[&str]) -> TreeList {
        let mut parser = NewickParser::new().with_annotations();
        let trees = newicks
            .iter()
            .map(|n| parser.parse_str(&mut ByteParser::for_str(n)).unwrap())
            .collect();
        TreeList::new(trees, parser.into_taxa())
    }

    #[test]
    fn test_target_without_demographics() {
        let (mut target, taxa) = parse_str("(A:1,B:1);").unwrap();
        let mut source = tree_list(&["(A[&dmv=1]:1,B[&dmv=1]:1)[&dmv=1];"]);
        let result = estimate_popsizes(&mut target, &taxa, &mut source, &FitOptions::default());
        assert!(matches!(result, Err(PopSizeError::MissingDemographic { .. })));
    }

    #[test]
    fn test_sample_without_demographics() {
        let (mut target, taxa) = parse_str("(A[&dmv=1]:1,B[&dmv=1]:1)[&dmv=1];").unwrap();
        let mut source = tree_list(&["(A[&dmv=1]:1,B[&dmv=1]:1)[&dmv=1];", "(A:1,B:1);"]);
        let err = estimate_popsizes(&mut target, &taxa, &mut source, &FitOptions::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "No demographic information in sampled tree #2");
    }

    #[test]
    fn test_empty_source() {
        let (mut target, taxa) = parse_str("(A[&dmv=1]:1,B[&dmv=1]:1)[&dmv=1];").unwrap();
        let mut source = tree_list(&[]);
        assert!(matches!(
            estimate_popsizes(&mut target, &taxa, &mut source, &FitOptions::default()),
            Err(PopSizeError::NoSampledTrees)
        ));
    }

    #[test]
    fn test_constant_run() {
        let (mut target, taxa) = parse_str("(A[&dmv=1]:1,B[&dmv=1]:1)[&dmv=1];").unwrap();
        let mut source = tree_list(&["(B[&dmv=5]:1,A[&dmv=5]:1)[&dmv=2];"; 3]);
        let model =
            estimate_popsizes(&mut target, &taxa, &mut source, &FitOptions::default()).unwrap();
        assert_eq!(model, PopulationModel::Constant);
        assert_eq!(target.attributes(0)["dmv"], "5");
        assert_eq!(target.attributes(target.root_index())["dmv"], "2");
    }
}
