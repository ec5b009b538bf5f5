//! Derivative-free minimization with restarts, on top of `argmin`'s
//! Nelder-Mead solver.

use crate::error::PopSizeError;
use argmin::core::{CostFunction, Error, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead;
use log::debug;

/// Budget and tolerances of the minimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    /// Maximum Nelder-Mead iterations per run.
    pub max_iters: u64,
    /// Additional runs, each started from a fresh simplex around the best
    /// point so far.
    pub restarts: usize,
    /// Convergence threshold on the standard deviation of the cost over the
    /// simplex.
    pub sd_tolerance: f64,
    /// Edge length of the initial simplex.
    pub initial_step: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            max_iters: 10_000,
            restarts: 3,
            sd_tolerance: 1e-12,
            initial_step: 0.5,
        }
    }
}

/// Best point found by [minimize].
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome {
    pub params: Vec<f64>,
    pub cost: f64,
    /// Iterations summed over all runs.
    pub iterations: u64,
    /// Whether the last run converged rather than running out of iterations.
    pub converged: bool,
    pub status: String,
}

/// Minimizes `problem` starting from `start`.
///
/// Nelder-Mead is run from the simplex `start, start + step·e_i` and then
/// restarted from the best vertex up to [FitOptions::restarts] times, which
/// helps it escape a collapsed simplex. Restarts stop early once a run no
/// longer improves the cost. Running out of iterations is not an error: the
/// best iterate is returned.
///
/// # Errors
/// [PopSizeError::Optimization] if the solver cannot be set up or the cost
/// function fails.
pub fn minimize<O>(problem: &O, start: Vec<f64>, options: &FitOptions) -> Result<FitOutcome, PopSizeError>
where
    O: CostFunction<Param = Vec<f64>, Output = f64>,
{
    if start.is_empty() {
        let cost = problem.cost(&start)?;
        return Ok(FitOutcome {
            params: start,
            cost,
            iterations: 0,
            converged: true,
            status: "Nothing to optimize".to_string(),
        });
    }

    let mut best = FitOutcome {
        cost: problem.cost(&start)?,
        params: start,
        iterations: 0,
        converged: false,
        status: "Not started".to_string(),
    };

    for run in 0..=options.restarts {
        let solver = NelderMead::new(simplex_around(&best.params, options.initial_step))
            .with_sd_tolerance(options.sd_tolerance)?;
        let result = Executor::new(Borrowed(problem), solver)
            .configure(|state| state.max_iters(options.max_iters))
            .run()?;

        let state = result.state();
        let status = state.get_termination_status();
        let cost = state.get_best_cost();
        debug!(
            "Nelder-Mead run {}: cost {cost} after {} iterations ({status:?})",
            run + 1,
            state.get_iter()
        );

        best.iterations += state.get_iter();
        best.converged = matches!(
            status,
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
        );
        best.status = format!("{status:?}");

        let improved = cost < best.cost;
        let significant = best.cost - cost > options.sd_tolerance * best.cost.abs().max(1.0);
        if improved {
            if let Some(params) = state.get_best_param() {
                best.params = params.clone();
                best.cost = cost;
            }
        }
        if !significant {
            break;
        }
    }
    Ok(best)
}

/// `n + 1` points: `center` and `center` moved by `step` along each axis.
fn simplex_around(center: &[f64], step: f64) -> Vec<Vec<f64>> {
    let mut simplex = Vec::with_capacity(center.len() + 1);
    simplex.push(center.to_vec());
    for i in 0..center.len() {
        let mut vertex = center.to_vec();
        vertex[i] += step;
        simplex.push(vertex);
    }
    simplex
}

/// Hands a borrowed cost function to the [Executor], which takes its
/// problem by value.
struct Borrowed<'a, O>(&'a O);

impl<O> CostFunction for Borrowed<'_, O>
where
    O: CostFunction<Param = Vec<f64>, Output = f64>,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        self.0.cost(param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    struct Rosenbrock;

    impl CostFunction for Rosenbrock {
        type Param = Vec<f64>;
        type Output = f64;

        fn cost(&self, p: &Self::Param) -> Result<Self::Output, Error> {
            Ok((1.0 - p[0]).powi(2) + 100.0 * (p[1] - p[0] * p[0]).powi(2))
        }
    }

    struct Parabola(f64);

    impl CostFunction for Parabola {
        type Param = Vec<f64>;
        type Output = f64;

        fn cost(&self, p: &Self::Param) -> Result<Self::Output, Error> {
            Ok((p[0] - self.0).powi(2))
        }
    }

    #[test]
    fn test_minimize_parabola() {
        let outcome = minimize(&Parabola(3.0), vec![1.0], &FitOptions::default()).unwrap();
        assert_abs_diff_eq!(outcome.params[0], 3.0, epsilon = 1e-4);
        assert!(outcome.cost <= 1e-8);
    }

    #[test]
    fn test_minimize_rosenbrock() {
        let outcome = minimize(&Rosenbrock, vec![-1.0, 1.0], &FitOptions::default()).unwrap();
        assert_abs_diff_eq!(outcome.params[0], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(outcome.params[1], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_iteration_budget_is_not_an_error() {
        let options = FitOptions {
            max_iters: 2,
            restarts: 0,
            ..FitOptions::default()
        };
        let outcome = minimize(&Rosenbrock, vec![-1.0, 1.0], &options).unwrap();
        assert!(!outcome.converged);
        assert!(outcome.cost <= 4.0);
    }

    #[test]
    fn test_simplex_around() {
        assert_eq!(
            simplex_around(&[1.0, 2.0], 0.5),
            vec![vec![1.0, 2.0], vec![1.5, 2.0], vec![1.0, 2.5]]
        );
    }
}
