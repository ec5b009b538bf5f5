//! Population size as a function of time along one branch.

use std::fmt;
use thiserror::Error;

// =#========================================================================#=
// DEMOGRAPHIC
// =#========================================================================#=
/// Effective population size along one branch, with time `t` running from
/// the child end (`t = 0`) towards the parent.
///
/// # Example
/// ```
/// use popsizes::demographic::Demographic;
///
/// let linear = Demographic::two_point(2.0, 4.0, 2.0)?;
/// assert_eq!(linear.population(1.0)?, 3.0);
/// assert_eq!(linear.integrate(2.0)?, 6.0);
/// assert_eq!(linear.natural_limit(), Some(2.0));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Demographic {
    /// Constant size `N0` for all `t >= 0`.
    Constant(f64),
    /// Linear interpolation between `values[i]` at `times[i]`, with
    /// `times[0] == 0` and strictly increasing times.
    PiecewiseLinear { values: Vec<f64>, times: Vec<f64> },
}

/// Evaluation of a [Demographic] outside of its domain.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error(
    "Time {t} is outside of the demographic's domain [0, {}]",
    .limit.map_or_else(|| "inf".to_string(), |l| l.to_string())
)]
pub struct DomainError {
    pub t: f64,
    pub limit: Option<f64>,
}

/// Malformed population values or breakpoint times.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct ShapeError(pub String);

// ============================================================================
// Construction (pub)
// ============================================================================
impl Demographic {
    /// Creates a constant demographic.
    ///
    /// # Errors
    /// [ShapeError] if `population` is negative or not finite.
    pub fn constant(population: f64) -> Result<Self, ShapeError> {
        check_population(population)?;
        Ok(Demographic::Constant(population))
    }

    /// Creates a piecewise-linear demographic.
    ///
    /// # Arguments
    /// * `values` - population sizes at the breakpoints, at least two
    /// * `times` - breakpoint times, same length as `values`, starting at 0
    ///   and strictly increasing
    ///
    /// # Errors
    /// [ShapeError] if the lengths differ, fewer than two breakpoints are
    /// given, the times do not start at 0 or are not strictly increasing,
    /// or a population is negative or not finite.
    pub fn piecewise_linear(values: Vec<f64>, times: Vec<f64>) -> Result<Self, ShapeError> {
        if values.len() != times.len() {
            return Err(ShapeError(format!(
                "{} population values for {} breakpoint times",
                values.len(),
                times.len()
            )));
        }
        if values.len() < 2 {
            return Err(ShapeError("At least two breakpoints are needed".to_string()));
        }
        if times[0] != 0.0 {
            return Err(ShapeError(format!("First breakpoint is {}, not 0", times[0])));
        }
        if let Some(w) = times.windows(2).find(|w| !(w[0] < w[1]) || !w[1].is_finite()) {
            return Err(ShapeError(format!(
                "Breakpoint times must increase strictly, found {} then {}",
                w[0], w[1]
            )));
        }
        for &value in &values {
            check_population(value)?;
        }
        Ok(Demographic::PiecewiseLinear { values, times })
    }

    /// Creates the linear demographic going from `start` to `end` over a
    /// branch of `length`.
    ///
    /// # Errors
    /// [ShapeError] if `length` is not positive or a population is invalid.
    pub fn two_point(start: f64, end: f64, length: f64) -> Result<Self, ShapeError> {
        Self::piecewise_linear(vec![start, end], vec![0.0, length])
    }
}

fn check_population(population: f64) -> Result<(), ShapeError> {
    if population.is_finite() && population >= 0.0 {
        Ok(())
    } else {
        Err(ShapeError(format!("Invalid population size {population}")))
    }
}

// ============================================================================
// Evaluation (pub)
// ============================================================================
impl Demographic {
    /// Last breakpoint of a piecewise-linear demographic, [None] for a
    /// constant one.
    pub fn natural_limit(&self) -> Option<f64> {
        match self {
            Demographic::Constant(_) => None,
            Demographic::PiecewiseLinear { times, .. } => times.last().copied(),
        }
    }

    /// Population size at time `t`.
    ///
    /// # Errors
    /// [DomainError] if `t` is negative or beyond the natural limit.
    pub fn population(&self, t: f64) -> Result<f64, DomainError> {
        self.check_domain(t)?;
        Ok(match self {
            Demographic::Constant(n0) => *n0,
            Demographic::PiecewiseLinear { values, times } => {
                let i = segment_of(times, t);
                interpolate(values, times, i, t)
            }
        })
    }

    /// Definite integral of the population size from 0 to `x`.
    ///
    /// # Errors
    /// [DomainError] if `x` is negative or beyond the natural limit.
    pub fn integrate(&self, x: f64) -> Result<f64, DomainError> {
        self.check_domain(x)?;
        Ok(match self {
            Demographic::Constant(n0) => n0 * x,
            Demographic::PiecewiseLinear { values, times } => {
                let mut area = 0.0;
                for i in 0..times.len() - 1 {
                    if times[i] >= x {
                        break;
                    }
                    let upper = times[i + 1].min(x);
                    let end_value = interpolate(values, times, i, upper);
                    area += (upper - times[i]) * (values[i] + end_value) / 2.0;
                }
                area
            }
        })
    }

    /// Coalescent intensity `∫₀ᵗ 1/N(s) ds`.
    ///
    /// Defined for every `t >= 0`: past the natural limit the last
    /// population size is carried on. A zero population gives an infinite
    /// intensity.
    ///
    /// # Errors
    /// [DomainError] if `t` is negative.
    pub fn intensity(&self, t: f64) -> Result<f64, DomainError> {
        if !(t >= 0.0) {
            return Err(DomainError { t, limit: None });
        }
        match self {
            Demographic::Constant(n0) => Ok(t / n0),
            Demographic::PiecewiseLinear { values, times } => {
                let mut total = 0.0;
                for i in 0..times.len() - 1 {
                    if times[i] >= t {
                        return Ok(total);
                    }
                    let upper = times[i + 1].min(t);
                    total += segment_intensity(
                        values[i],
                        slope(values, times, i),
                        upper - times[i],
                    );
                }
                let (last_time, last_value) = (times[times.len() - 1], values[values.len() - 1]);
                if t > last_time {
                    total += (t - last_time) / last_value;
                }
                Ok(total)
            }
        }
    }

    /// Inverse of [intensity](Self::intensity): the time `t` at which the
    /// intensity reaches `x`.
    ///
    /// # Errors
    /// [DomainError] if `x` is negative.
    pub fn inverse_intensity(&self, x: f64) -> Result<f64, DomainError> {
        if !(x >= 0.0) {
            return Err(DomainError { t: x, limit: None });
        }
        match self {
            Demographic::Constant(n0) => Ok(x * n0),
            Demographic::PiecewiseLinear { values, times } => {
                let mut remaining = x;
                for i in 0..times.len() - 1 {
                    let length = times[i + 1] - times[i];
                    let m = slope(values, times, i);
                    let full = segment_intensity(values[i], m, length);
                    if remaining <= full {
                        return Ok(times[i] + segment_time(values[i], m, remaining));
                    }
                    remaining -= full;
                }
                let (last_time, last_value) = (times[times.len() - 1], values[values.len() - 1]);
                Ok(last_time + remaining * last_value)
            }
        }
    }

    fn check_domain(&self, t: f64) -> Result<(), DomainError> {
        let limit = self.natural_limit();
        let within = t >= 0.0 && limit.is_none_or(|l| t <= l);
        if within { Ok(()) } else { Err(DomainError { t, limit }) }
    }
}

impl fmt::Display for Demographic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Demographic::Constant(n0) => write!(f, "constant({n0})"),
            Demographic::PiecewiseLinear { values, times } => {
                write!(f, "linear(")?;
                for (i, (v, t)) in values.iter().zip(times).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}@{t}")?;
                }
                write!(f, ")")
            }
        }
    }
}

// ============================================================================
// Segment arithmetic (private)
// ============================================================================
/// Index `i` of the segment `[times[i], times[i+1]]` containing `t`.
/// Assumes `t` is within the domain.
fn segment_of(times: &[f64], t: f64) -> usize {
    let after = times.partition_point(|&time| time <= t);
    after.saturating_sub(1).min(times.len() - 2)
}

fn slope(values: &[f64], times: &[f64], i: usize) -> f64 {
    (values[i + 1] - values[i]) / (times[i + 1] - times[i])
}

fn interpolate(values: &[f64], times: &[f64], i: usize, t: f64) -> f64 {
    values[i] + slope(values, times, i) * (t - times[i])
}

/// `∫₀ᵈ 1/(n + m·s) ds`
fn segment_intensity(n: f64, m: f64, d: f64) -> f64 {
    if m == 0.0 {
        d / n
    } else {
        ((n + m * d) / n).ln() / m
    }
}

/// Inverse of [segment_intensity] in `d`.
fn segment_time(n: f64, m: f64, x: f64) -> f64 {
    if m == 0.0 {
        x * n
    } else {
        n * ((m * x).exp() - 1.0) / m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_integral_is_exact() {
        let d = Demographic::constant(4.0).unwrap();
        assert_eq!(d.integrate(2.5).unwrap(), 4.0 * 2.5);
        assert_eq!(d.population(1e9).unwrap(), 4.0);
        assert_eq!(d.natural_limit(), None);
    }

    #[test]
    fn test_two_point_mean() {
        let d = Demographic::two_point(1.0, 2.0, 3.0).unwrap();
        assert_relative_eq!(d.integrate(3.0).unwrap() / 3.0, 1.5);
        assert_relative_eq!(d.integrate(1.5).unwrap(), 1.5 * (1.0 + 1.5) / 2.0);
    }

    #[test]
    fn test_three_breakpoints() {
        let d = Demographic::piecewise_linear(vec![1.0, 3.0, 3.0], vec![0.0, 1.0, 2.0]).unwrap();
        assert_eq!(d.population(0.5).unwrap(), 2.0);
        assert_eq!(d.population(1.5).unwrap(), 3.0);
        assert_eq!(d.population(2.0).unwrap(), 3.0);
        assert_relative_eq!(d.integrate(2.0).unwrap(), 2.0 + 3.0);
    }

    #[test]
    fn test_domain_errors() {
        let d = Demographic::two_point(1.0, 2.0, 3.0).unwrap();
        assert_eq!(d.population(3.5), Err(DomainError { t: 3.5, limit: Some(3.0) }));
        assert!(d.integrate(-1.0).is_err());
        assert!(Demographic::Constant(1.0).population(-0.1).is_err());
    }

    #[test]
    fn test_invalid_shapes() {
        assert!(Demographic::two_point(1.0, 2.0, 0.0).is_err());
        assert!(Demographic::piecewise_linear(vec![1.0], vec![0.0]).is_err());
        assert!(Demographic::piecewise_linear(vec![1.0, 2.0], vec![0.5, 1.0]).is_err());
        assert!(Demographic::constant(-1.0).is_err());
        assert!(Demographic::constant(f64::NAN).is_err());
    }

    #[test]
    fn test_intensity_inverts() {
        let d = Demographic::piecewise_linear(vec![1.0, 3.0, 2.0], vec![0.0, 1.0, 2.0]).unwrap();
        for t in [0.0, 0.3, 1.0, 1.7, 2.0, 5.0] {
            let x = d.intensity(t).unwrap();
            assert_relative_eq!(d.inverse_intensity(x).unwrap(), t, epsilon = 1e-9);
        }
        let c = Demographic::Constant(2.0);
        assert_eq!(c.intensity(3.0).unwrap(), 1.5);
        assert_eq!(c.inverse_intensity(1.5).unwrap(), 3.0);
    }

    #[test]
    fn test_intensity_constant_segment() {
        let d = Demographic::two_point(2.0, 2.0, 1.0).unwrap();
        assert_relative_eq!(d.intensity(1.0).unwrap(), 0.5);
        assert_relative_eq!(d.intensity(3.0).unwrap(), 1.5);
    }
}
