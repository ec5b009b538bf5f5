//! Streaming sufficient statistics per target clade.
//!
//! The [Accumulator] is seeded with the clades of the target tree. Every
//! sampled tree is then folded in with [Accumulator::add_tree] and can be
//! dropped right after, so memory does not grow with the number of samples
//! beyond one value per sampled tip.

use crate::clade::{Clade, clades_of, mapped_clades_of};
use crate::error::PopSizeError;
use crate::model::{TaxonIndex, TaxonMap, Tree, VertexIndex};
use std::collections::HashMap;
use std::fmt;

// =#========================================================================#=
// CLADE STATISTICS
// =#========================================================================#=
/// Running count, sum and sum of squares of a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CladeStats {
    n: usize,
    sum: f64,
    sum_sq: f64,
}

impl CladeStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one observation.
    pub fn push(&mut self, x: f64) {
        self.n += 1;
        self.sum += x;
        self.sum_sq += x * x;
    }

    /// Number of observations `n`.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Sum of observations `S`.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Sum of squared observations `S2`.
    pub fn sum_sq(&self) -> f64 {
        self.sum_sq
    }

    /// Mean of the observations, [None] when empty.
    pub fn mean(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

impl FromIterator<f64> for CladeStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = CladeStats::new();
        for x in iter {
            stats.push(x);
        }
        stats
    }
}

/// Shape of the population functions found in the sampled trees, which
/// decides the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulationModel {
    /// No sampled demographic had a natural limit.
    Constant,
    /// At least one sampled demographic was piecewise linear.
    PiecewiseLinear,
}

impl fmt::Display for PopulationModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PopulationModel::Constant => write!(f, "constant"),
            PopulationModel::PiecewiseLinear => write!(f, "piecewise linear"),
        }
    }
}

// =#========================================================================#=
// ACCUMULATOR
// =#========================================================================#=
/// Per-clade statistics of sampled population sizes, keyed by the clades of
/// a target tree.
///
/// For every sampled vertex whose clade is a target clade, one estimate is
/// recorded:
/// * `1 / N(0)` for a constant demographic
/// * the time-averaged population `∫N / l` over the natural limit `l`
///   otherwise
///
/// Additionally, tips record their population at time zero, and a sampled
/// root whose clade is the target root's clade records its natural limit as
/// a root branch length. Any demographic with a natural limit, matched or
/// not, makes the samples piecewise linear.
#[derive(Debug, Clone)]
pub struct Accumulator {
    target_taxa: TaxonMap,
    vertex_clades: Vec<Option<Clade>>,
    root_clade: Option<Clade>,
    clades: HashMap<Clade, CladeStats>,
    taxon_populations: Vec<Vec<f64>>,
    root_branches: CladeStats,
    has_natural_limit: bool,
    num_trees: usize,
    // sampled taxon index -> target taxon index
    translation: Vec<Option<TaxonIndex>>,
}

// ============================================================================
// Construction (pub)
// ============================================================================
impl Accumulator {
    /// Creates an accumulator with one empty entry per clade of `target`,
    /// tips included.
    pub fn new(target: &Tree, target_taxa: &TaxonMap) -> Self {
        let mut vertex_clades = vec![None; target.num_vertices()];
        let mut clades = HashMap::new();
        for (clade, vertex) in clades_of(target, true) {
            clades.insert(clade.clone(), CladeStats::new());
            vertex_clades[vertex] = Some(clade);
        }

        let root_clade = target
            .is_root_set()
            .then(|| vertex_clades[target.root_index()].clone())
            .flatten();

        Accumulator {
            target_taxa: target_taxa.clone(),
            vertex_clades,
            root_clade,
            clades,
            taxon_populations: vec![Vec::new(); target_taxa.num_taxa()],
            root_branches: CladeStats::new(),
            has_natural_limit: false,
            num_trees: 0,
            translation: Vec::new(),
        }
    }
}

// ============================================================================
// Accumulation (pub)
// ============================================================================
impl Accumulator {
    /// Folds one sampled tree, with demographics attached, into the
    /// statistics.
    ///
    /// Sampled taxa are matched to target taxa by label. The label
    /// translation is cached and only recomputed when `taxa` changes size,
    /// so all trees passed in must share one growing [TaxonMap].
    ///
    /// # Errors
    /// * [PopSizeError::MissingDemographic] if a matched vertex has no
    ///   demographic
    /// * [PopSizeError::Domain] if a demographic cannot be evaluated at 0
    pub fn add_tree(&mut self, tree: &Tree, taxa: &TaxonMap) -> Result<(), PopSizeError> {
        if self.translation.len() != taxa.num_taxa() {
            self.translation = taxa.translation_to(&self.target_taxa);
        }
        let translation = &self.translation;
        let sampled_clades =
            mapped_clades_of(tree, true, |taxon| translation.get(taxon).copied().flatten());
        let sampled_root = tree.is_root_set().then(|| tree.root_index());
        self.has_natural_limit |= (0..tree.num_vertices())
            .filter_map(|v| tree.demographic(v))
            .any(|demographic| demographic.natural_limit().is_some());

        for (clade, vertex) in sampled_clades {
            let Some(stats) = self.clades.get_mut(&clade) else {
                continue;
            };
            let demographic = tree.demographic(vertex).ok_or_else(|| {
                PopSizeError::MissingDemographic {
                    tree: describe_tree(tree, self.num_trees),
                }
            })?;

            let estimate = match demographic.natural_limit() {
                None => 1.0 / demographic.population(0.0)?,
                Some(limit) => {
                    if Some(vertex) == sampled_root && self.root_clade.as_ref() == Some(&clade) {
                        self.root_branches.push(limit);
                    }
                    demographic.integrate(limit)? / limit
                }
            };
            stats.push(estimate);

            if let Some(taxon) = clade.single_taxon() {
                self.taxon_populations[taxon].push(demographic.population(0.0)?);
            }
        }

        self.num_trees += 1;
        Ok(())
    }
}

// ============================================================================
// Getters / Accessors (pub)
// ============================================================================
impl Accumulator {
    /// Statistics of a clade, [None] if it is not a target clade.
    pub fn stats(&self, clade: &Clade) -> Option<&CladeStats> {
        self.clades.get(clade)
    }

    /// Statistics of the clade below target vertex `vertex`.
    pub fn vertex_stats(&self, vertex: VertexIndex) -> Option<&CladeStats> {
        self.vertex_clades
            .get(vertex)
            .and_then(Option::as_ref)
            .and_then(|clade| self.clades.get(clade))
    }

    /// Time-zero population sizes recorded for a target taxon.
    pub fn taxon_populations(&self, taxon: TaxonIndex) -> &[f64] {
        self.taxon_populations.get(taxon).map_or(&[], Vec::as_slice)
    }

    /// Natural limits of the demographics above sampled roots.
    pub fn root_branches(&self) -> &CladeStats {
        &self.root_branches
    }

    /// Number of trees folded in so far.
    pub fn num_trees(&self) -> usize {
        self.num_trees
    }

    /// Number of target clades that were matched at least once.
    pub fn num_matched_clades(&self) -> usize {
        self.clades.values().filter(|stats| stats.n() > 0).count()
    }

    /// Classification of all trees seen so far.
    pub fn population_model(&self) -> PopulationModel {
        if self.has_natural_limit {
            PopulationModel::PiecewiseLinear
        } else {
            PopulationModel::Constant
        }
    }
}

fn describe_tree(tree: &Tree, position: usize) -> String {
    match tree.name() {
        Some(name) => format!("sampled tree '{name}'"),
        None => format!("sampled tree #{}", position + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demographic::set_demographics;
    use crate::newick::NewickParser;
    use crate::parser::ByteParser;
    use approx::assert_relative_eq;

    fn sampled(parser: &mut NewickParser, newick: &str) -> Tree {
        let mut tree = parser.parse_str(&mut ByteParser::for_str(newick)).unwrap();
        set_demographics(&mut tree).unwrap();
        tree
    }

    #[test]
    fn test_clade_stats() {
        let stats: CladeStats = [1.0, 2.0, 3.0].into_iter().collect();
        assert_eq!(stats.n(), 3);
        assert_eq!(stats.sum(), 6.0);
        assert_eq!(stats.sum_sq(), 14.0);
        assert_eq!(stats.mean(), Some(2.0));
        assert_eq!(CladeStats::new().mean(), None);
    }

    #[test]
    fn test_constant_samples() {
        let (target, target_taxa) = crate::newick::parse_str("((A,B),C);").unwrap();
        let mut accumulator = Accumulator::new(&target, &target_taxa);

        let mut parser = NewickParser::new().with_annotations();
        for newick in [
            "((A[&dmv=2]:1,B[&dmv=2]:1)[&dmv=4]:1,C[&dmv=2]:2)[&dmv=4];",
            "((A[&dmv=4]:1,C[&dmv=2]:1)[&dmv=4]:1,B[&dmv=2]:2)[&dmv=4];",
        ] {
            let tree = sampled(&mut parser, newick);
            accumulator.add_tree(&tree, parser.taxa()).unwrap();
        }

        assert_eq!(accumulator.population_model(), PopulationModel::Constant);
        assert_eq!(accumulator.num_trees(), 2);

        let a = target_taxa.get_index("A").unwrap();
        assert_eq!(accumulator.taxon_populations(a), &[2.0, 4.0]);
        let a_stats = accumulator.stats(&Clade::singleton(a)).unwrap();
        assert_relative_eq!(a_stats.sum(), 0.5 + 0.25);

        // (A,B) only in the first sample
        let ab = Clade::new(vec![a, target_taxa.get_index("B").unwrap()]);
        assert_eq!(accumulator.stats(&ab).unwrap().n(), 1);
        assert_eq!(accumulator.stats(&Clade::new(vec![0, 1, 2])).unwrap().n(), 2);
        assert_eq!(accumulator.root_branches().n(), 0);
    }

    #[test]
    fn test_piecewise_samples_record_root_branches() {
        let (target, target_taxa) = crate::newick::parse_str("(A,B);").unwrap();
        let mut accumulator = Accumulator::new(&target, &target_taxa);

        let mut parser = NewickParser::new().with_annotations();
        for root_length in [1, 2, 3] {
            let newick = format!(
                "(A[&dmv={{1,3}}]:1,B[&dmv={{2,2}}]:1)[&dmv={{2,4}},dmt={root_length}];"
            );
            let tree = sampled(&mut parser, &newick);
            accumulator.add_tree(&tree, parser.taxa()).unwrap();
        }

        assert_eq!(accumulator.population_model(), PopulationModel::PiecewiseLinear);
        assert_eq!(accumulator.root_branches().mean(), Some(2.0));
        let root_stats = accumulator.vertex_stats(target.root_index()).unwrap();
        assert_eq!(root_stats.n(), 3);
        assert_relative_eq!(root_stats.sum(), 9.0);
        assert_eq!(accumulator.vertex_stats(0).unwrap().mean(), Some(2.0));
        assert_eq!(accumulator.taxon_populations(0), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_foreign_and_unmatched_clades() {
        let (target, target_taxa) = crate::newick::parse_str("((A,B),C);").unwrap();
        let mut accumulator = Accumulator::new(&target, &target_taxa);

        let mut parser = NewickParser::new().with_annotations();
        let tree = sampled(
            &mut parser,
            "((A[&dmv=1]:1,X[&dmv=1]:1)[&dmv=1]:1,(B[&dmv=1]:1,C[&dmv=1]:1)[&dmv=1]:1)[&dmv=1];",
        );
        accumulator.add_tree(&tree, parser.taxa()).unwrap();

        // tips match, no internal clade does
        assert_eq!(accumulator.num_matched_clades(), 3);
        assert_eq!(accumulator.vertex_stats(target.root_index()).unwrap().n(), 0);
    }

    #[test]
    fn test_subset_sample_root_is_not_target_root() {
        let (target, target_taxa) = crate::newick::parse_str("((A:1,B:1):1,C:2);").unwrap();
        let mut accumulator = Accumulator::new(&target, &target_taxa);

        let mut parser = NewickParser::new().with_annotations();
        for newick in [
            "((A[&dmv={1,1}]:1,B[&dmv={1,1}]:1)[&dmv={2,2}]:1,C[&dmv={1,1}]:2)[&dmt=2,dmv={3,3}];",
            // only A and B: its root is the target's (A,B) clade
            "(A[&dmv={1,1}]:1,B[&dmv={1,1}]:1)[&dmt=50,dmv={2,2}];",
        ] {
            let tree = sampled(&mut parser, newick);
            accumulator.add_tree(&tree, parser.taxa()).unwrap();
        }

        assert_eq!(accumulator.root_branches().n(), 1);
        assert_eq!(accumulator.root_branches().mean(), Some(2.0));
        let ab = target.vertex(0).parent().unwrap();
        assert_eq!(accumulator.vertex_stats(ab).unwrap().n(), 2);
    }

    #[test]
    fn test_unmatched_linear_demographic_classifies() {
        let (target, target_taxa) = crate::newick::parse_str("((A,B),C);").unwrap();
        let mut accumulator = Accumulator::new(&target, &target_taxa);

        // only the unmatched (A,C) clade is linear
        let mut parser = NewickParser::new().with_annotations();
        let tree = sampled(
            &mut parser,
            "((A[&dmv=1]:1,C[&dmv=1]:1)[&dmv={1,2}]:1,B[&dmv=1]:2)[&dmv=1];",
        );
        accumulator.add_tree(&tree, parser.taxa()).unwrap();

        let ac = Clade::new(vec![0, 2]);
        assert!(accumulator.stats(&ac).is_none());
        assert_eq!(accumulator.population_model(), PopulationModel::PiecewiseLinear);
    }

    #[test]
    fn test_missing_demographic_on_matched_vertex() {
        let (target, target_taxa) = crate::newick::parse_str("(A,B);").unwrap();
        let mut accumulator = Accumulator::new(&target, &target_taxa);

        let mut parser = NewickParser::new().with_annotations();
        let tree = sampled(&mut parser, "(A[&dmv=1]:1,B:1)[&dmv=1];");
        let err = accumulator.add_tree(&tree, parser.taxa()).unwrap_err();
        assert!(matches!(err, PopSizeError::MissingDemographic { .. }));
    }
}
