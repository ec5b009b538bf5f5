//! Writes estimated population sizes into target vertex attributes.
//!
//! Estimates are stored in the *BEAST annotation form, so that the Newick
//! writer prints e.g. `[&dmt=1.5,dmv={0.8,1.2}]` and tree viewers that
//! understand *BEAST output can display them:
//! * `dmv=x` - constant population `x`
//! * `dmv={start,end}` - linear from the bottom to the top of the branch
//! * `dmt=b` - branch length the linear function spans

use crate::demographic::{POPULATION_TIMES_KEY, POPULATION_VALUES_KEY};
use crate::model::{Tree, VertexIndex};

/// Annotates a vertex with a constant population size.
pub fn annotate_constant(tree: &mut Tree, vertex: VertexIndex, population: f64) {
    tree.set_attribute(vertex, POPULATION_VALUES_KEY, format_g(population));
}

/// Annotates a vertex with a linear population function from `start` to
/// `end`. `branch_length` becomes `dmt` if known.
pub fn annotate_linear(
    tree: &mut Tree,
    vertex: VertexIndex,
    start: f64,
    end: f64,
    branch_length: Option<f64>,
) {
    tree.set_attribute(
        vertex,
        POPULATION_VALUES_KEY,
        format!("{{{},{}}}", format_g(start), format_g(end)),
    );
    if let Some(branch_length) = branch_length {
        tree.set_attribute(vertex, POPULATION_TIMES_KEY, branch_length.to_string());
    }
}

/// Formats a number like C's `%g`: six significant digits, trailing zeros
/// removed, and scientific notation for exponents below -4 or from 6 on.
///
/// # Example
/// ```
/// use popsizes::annotate::format_g;
///
/// assert_eq!(format_g(4.0), "4");
/// assert_eq!(format_g(1.0 / 3.0), "0.333333");
/// assert_eq!(format_g(1234567.0), "1.23457e+06");
/// assert_eq!(format_g(0.00001), "1e-05");
/// ```
pub fn format_g(x: f64) -> String {
    const PRECISION: i32 = 6;

    if x == 0.0 {
        return if x.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x < 0.0 { "-inf" } else { "inf" }.to_string();
    }

    // rounding to the precision may bump the exponent, e.g. 999999.5
    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, x);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            strip_trailing_zeros(mantissa),
            sign,
            exponent.abs()
        )
    } else {
        let decimals = (PRECISION - 1 - exponent) as usize;
        strip_trailing_zeros(&format!("{x:.decimals$}")).to_string()
    }
}

fn strip_trailing_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}
