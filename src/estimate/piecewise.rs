//! Least-squares fit of linear population functions on every target branch.
//!
//! Every target vertex `v` gets a parameter `e(v)` for the population at the
//! top of its branch. The population at the bottom of a branch is the sum
//! of the top populations of its children, so lineages merging at a vertex
//! pool their populations. Tips have no children: their bottom population
//! is fixed to the median of the sampled time-zero sizes of their taxon,
//! and is a free parameter `s(v)` only when nothing was sampled.
//!
//! For an edge with branch length `b`, mean population `ipop` of its linear
//! function, and sampled time-averaged sizes with statistics `(n, S, S2)`,
//! the squared error `b·Σ(ipop - x)²` equals
//!
//! `b·(n·ipop² - 2·ipop·S + S2)`
//!
//! and the objective is the sum over all edges.

use crate::accumulator::{Accumulator, CladeStats};
use crate::annotate::annotate_linear;
use crate::demographic::Demographic;
use crate::error::PopSizeError;
use crate::estimate::optimizer::{FitOptions, FitOutcome, minimize};
use crate::model::{Tree, VertexIndex};
use argmin::core::{CostFunction, Error};
use log::{debug, warn};

/// Index into the parameter vector.
type ParamIndex = usize;

/// Population at the bottom of an edge.
#[derive(Debug, Clone, PartialEq)]
enum EdgeStart {
    /// Sum of the end parameters of the children.
    Children(Vec<ParamIndex>),
    /// Fixed tip population.
    Prior(f64),
    /// Free tip parameter.
    Free(ParamIndex),
}

#[derive(Debug, Clone, PartialEq)]
struct Edge {
    vertex: VertexIndex,
    start: EdgeStart,
    end: ParamIndex,
    branch_length: Option<f64>,
    stats: CladeStats,
}

// =#========================================================================#=
// PIECEWISE PROBLEM
// =#========================================================================#=
/// The least-squares problem for one target tree.
#[derive(Debug, Clone)]
pub struct PiecewiseProblem {
    edges: Vec<Edge>,
    num_params: usize,
}

/// Fitted linear population function of one target branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeFit {
    pub vertex: VertexIndex,
    pub start: f64,
    pub end: f64,
    pub branch_length: Option<f64>,
}

impl PiecewiseProblem {
    /// Builds the parameter index and edge terms of `target`.
    ///
    /// The root branch length is the mean of the sampled root lengths. If
    /// no sampled root matched the target root, the target's own root
    /// branch length is used. Without either the root contributes no term.
    ///
    /// # Errors
    /// [PopSizeError::InvalidTarget] if a non-root vertex has no branch
    /// length.
    pub fn new(target: &Tree, accumulator: &Accumulator) -> Result<Self, PopSizeError> {
        let num_vertices = target.num_vertices();
        let root = target.root_index();
        let root_length = accumulator
            .root_branches()
            .mean()
            .or_else(|| target.vertex(root).branch_length().map(|length| *length));
        if root_length.is_none() {
            warn!("No root branch length, the root branch is not fitted");
        }

        let mut edges = Vec::with_capacity(num_vertices);
        let mut num_params = num_vertices;

        for vertex in target.post_order_iter() {
            let index = vertex.index();
            let start = match vertex.taxon() {
                None => EdgeStart::Children(vertex.child_iter().collect()),
                Some(taxon) => match median(accumulator.taxon_populations(taxon)) {
                    Some(prior) => EdgeStart::Prior(prior),
                    None => {
                        num_params += 1;
                        EdgeStart::Free(num_params - 1)
                    }
                },
            };
            let branch_length = if index == root {
                root_length
            } else {
                let length = vertex.branch_length().ok_or_else(|| {
                    PopSizeError::InvalidTarget(format!("Vertex {index} has no branch length"))
                })?;
                Some(*length)
            };

            edges.push(Edge {
                vertex: index,
                start,
                end: index,
                branch_length,
                stats: accumulator.vertex_stats(index).copied().unwrap_or_default(),
            });
        }

        Ok(PiecewiseProblem { edges, num_params })
    }

    /// Number of parameters: one per vertex plus one per tip without prior.
    pub fn num_params(&self) -> usize {
        self.num_params
    }

    /// Sum of the weighted squared errors of all edges at `params`.
    ///
    /// # Errors
    /// [PopSizeError::InvalidDemographic] for non-finite parameters.
    pub fn error(&self, params: &[f64]) -> Result<f64, PopSizeError> {
        let mut total = 0.0;
        for edge in &self.edges {
            let Some(b) = edge.branch_length.filter(|&b| b > 0.0) else {
                continue;
            };
            if edge.stats.n() == 0 {
                continue;
            }
            let (start, end) = self.endpoints(edge, params);
            let demographic = Demographic::two_point(start, end, b).map_err(|e| {
                PopSizeError::InvalidDemographic {
                    vertex: edge.vertex,
                    reason: e.to_string(),
                }
            })?;
            let ipop = demographic.integrate(b)? / b;
            let stats = &edge.stats;
            total += b * (stats.n() as f64 * ipop * ipop - 2.0 * ipop * stats.sum() + stats.sum_sq());
        }
        Ok(total)
    }

    /// Start and end population of every edge at `params`, in post-order.
    pub fn fits(&self, params: &[f64]) -> Vec<EdgeFit> {
        self.edges
            .iter()
            .map(|edge| {
                let (start, end) = self.endpoints(edge, params);
                EdgeFit {
                    vertex: edge.vertex,
                    start,
                    end,
                    branch_length: edge.branch_length,
                }
            })
            .collect()
    }

    fn endpoints(&self, edge: &Edge, params: &[f64]) -> (f64, f64) {
        let start = match &edge.start {
            EdgeStart::Children(children) => children.iter().map(|&c| params[c].abs()).sum(),
            EdgeStart::Prior(prior) => *prior,
            EdgeStart::Free(param) => params[*param].abs(),
        };
        (start, params[edge.end].abs())
    }
}

impl CostFunction for PiecewiseProblem {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.error(params)?)
    }
}

// =#========================================================================#=
// ESTIMATION
// =#========================================================================#=
/// Fits linear population functions on all branches of `target` and writes
/// them as `dmv={start,end}` and `dmt=b` attributes.
///
/// # Errors
/// * [PopSizeError::InvalidTarget] for a target without branch lengths
/// * [PopSizeError::Optimization] if the minimizer fails
pub fn estimate_piecewise(
    target: &mut Tree,
    accumulator: &Accumulator,
    options: &FitOptions,
) -> Result<FitOutcome, PopSizeError> {
    let problem = PiecewiseProblem::new(target, accumulator)?;
    debug!("Fitting {} parameters", problem.num_params());

    let outcome = minimize(&problem, vec![1.0; problem.num_params()], options)?;
    debug!(
        "Least squares error {} after {} iterations ({})",
        outcome.cost, outcome.iterations, outcome.status
    );

    for fit in problem.fits(&outcome.params) {
        annotate_linear(target, fit.vertex, fit.start, fit.end, fit.branch_length);
    }
    Ok(outcome)
}

/// Median of a sample, mean of the two middle values for even sizes.
pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick::parse_str;
    use approx::assert_abs_diff_eq;

    fn stats(values: &[f64]) -> CladeStats {
        values.iter().copied().collect()
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_single_edge_toy() {
        // n = 2, S = 3, S2 = 5, b = 2 with start and end tied to one value
        let problem = PiecewiseProblem {
            edges: vec![Edge {
                vertex: 0,
                start: EdgeStart::Children(vec![0]),
                end: 0,
                branch_length: Some(2.0),
                stats: stats(&[1.0, 2.0]),
            }],
            num_params: 1,
        };
        for p in [0.5, 1.0, 1.5, 3.0] {
            let expected = 2.0 * (2.0 * p * p - 2.0 * p * 3.0 + 5.0);
            assert_abs_diff_eq!(problem.error(&[p]).unwrap(), expected, epsilon = 1e-12);
        }

        let outcome = minimize(&problem, vec![1.0], &FitOptions::default()).unwrap();
        assert_abs_diff_eq!(outcome.params[0].abs(), 1.5, epsilon = 1e-3);
    }

    #[test]
    fn test_parameter_index() {
        let (target, taxa) = parse_str("((A:1,B:1):1,C:2);").unwrap();
        let accumulator = Accumulator::new(&target, &taxa);
        let problem = PiecewiseProblem::new(&target, &accumulator).unwrap();
        // 5 vertices + 3 tips without prior
        assert_eq!(problem.num_params(), 8);
        assert!(problem.edges.iter().all(|e| e.stats.n() == 0));
        assert_eq!(problem.error(&[1.0; 8]).unwrap(), 0.0);
    }

    #[test]
    fn test_missing_branch_length() {
        let (target, taxa) = parse_str("((A:1,B),C:2);").unwrap();
        let accumulator = Accumulator::new(&target, &taxa);
        assert!(matches!(
            PiecewiseProblem::new(&target, &accumulator),
            Err(PopSizeError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_internal_start_sums_children() {
        let (target, taxa) = parse_str("(A:1,B:1);").unwrap();
        let accumulator = Accumulator::new(&target, &taxa);
        let problem = PiecewiseProblem::new(&target, &accumulator).unwrap();
        let params = [2.0, -3.0, 0.5, 7.0, 8.0];
        let fits = problem.fits(&params);
        let root = fits.last().unwrap();
        assert_eq!(root.vertex, target.root_index());
        assert_eq!((root.start, root.end), (5.0, 0.5));
        assert_eq!(root.branch_length, None);
        // tips start at their free parameters
        assert_eq!((fits[0].start, fits[0].end), (7.0, 2.0));
    }
}
