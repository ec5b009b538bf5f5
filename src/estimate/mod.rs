//! Population size estimators.
//!
//! Which estimator runs is decided by the [PopulationModel] of the sampled
//! trees:
//! * [constant] - closed form `n / S` per vertex
//! * [piecewise] - least-squares fit of linear functions over the whole
//!   tree, minimized by [optimizer]

pub mod constant;
pub mod optimizer;
pub mod piecewise;

pub use constant::estimate_constant;
pub use optimizer::{FitOptions, FitOutcome, minimize};
pub use piecewise::{EdgeFit, PiecewiseProblem, estimate_piecewise};

use crate::accumulator::{Accumulator, PopulationModel};
use crate::error::PopSizeError;
use crate::model::Tree;
use log::info;

/// Runs the estimator for `model` and annotates `target`.
///
/// # Errors
/// See [estimate_piecewise]; the constant estimator cannot fail.
pub fn estimate(
    target: &mut Tree,
    accumulator: &Accumulator,
    model: PopulationModel,
    options: &FitOptions,
) -> Result<(), PopSizeError> {
    match model {
        PopulationModel::Constant => {
            let annotated = estimate_constant(target, accumulator);
            info!("Annotated {annotated} vertices with constant population sizes");
        }
        PopulationModel::PiecewiseLinear => {
            let outcome = estimate_piecewise(target, accumulator, options)?;
            if !outcome.converged {
                info!("Least squares fit stopped without converging: {}", outcome.status);
            }
        }
    }
    Ok(())
}
