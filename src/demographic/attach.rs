//! Attaches demographics to tree vertices from *BEAST annotations.
//!
//! *BEAST logs the population function of every species branch as vertex
//! annotations:
//! * `dmv=x` - constant population `x`
//! * `dmv={a,b}` - linear from `a` at the bottom to `b` at the top of the
//!   branch; the top is at `dmt` if given, else at the branch length
//! * `dmv={v0,...,vk}` with `dmt={t1,...,tk}` - piecewise linear with the
//!   given breakpoint times above the bottom of the branch

use crate::demographic::function::Demographic;
use crate::error::PopSizeError;
use crate::model::{Tree, VertexIndex};

/// Annotation key of the population values.
pub const POPULATION_VALUES_KEY: &str = "dmv";
/// Annotation key of the breakpoint times.
pub const POPULATION_TIMES_KEY: &str = "dmt";

/// Reads the `dmv`/`dmt` annotations of every vertex and attaches the
/// resulting [Demographic] to it.
///
/// Vertices without `dmv` are left without demographic.
///
/// # Returns
/// Whether any vertex carried demographic information.
///
/// # Errors
/// [PopSizeError::InvalidDemographic] if the annotations of a vertex do not
/// describe a valid demographic.
///
/// # Example
/// ```
/// use popsizes::demographic::{set_demographics, Demographic};
/// use popsizes::newick::parse_str;
///
/// let (mut tree, _) = parse_str("(A[&dmv=2]:1,B[&dmv={1,3}]:2)[&dmv={4,4},dmt=0.5];")?;
/// assert!(set_demographics(&mut tree)?);
/// assert_eq!(tree.demographic(0), Some(&Demographic::Constant(2.0)));
/// assert_eq!(tree.demographic(1).and_then(|d| d.natural_limit()), Some(2.0));
/// assert_eq!(tree.demographic(2).and_then(|d| d.natural_limit()), Some(0.5));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn set_demographics(tree: &mut Tree) -> Result<bool, PopSizeError> {
    let mut found = false;
    for index in 0..tree.num_vertices() {
        if let Some(demographic) = demographic_of(tree, index)? {
            tree.set_demographic(index, demographic);
            found = true;
        }
    }
    Ok(found)
}

fn demographic_of(tree: &Tree, index: VertexIndex) -> Result<Option<Demographic>, PopSizeError> {
    let annotations = tree.annotations();
    let Some(raw_values) = annotations.get(POPULATION_VALUES_KEY, index) else {
        return Ok(None);
    };
    let invalid = |reason: String| PopSizeError::InvalidDemographic { vertex: index, reason };

    let values = raw_values.as_f64_list().ok_or_else(|| {
        invalid(format!("'{POPULATION_VALUES_KEY}' is not numeric: {raw_values}"))
    })?;

    let demographic = match values.as_slice() {
        [] => return Err(invalid(format!("'{POPULATION_VALUES_KEY}' is empty"))),
        [population] => Demographic::constant(*population),
        _ => {
            let breakpoints = match annotations.get(POPULATION_TIMES_KEY, index) {
                Some(raw_times) => raw_times.as_f64_list().ok_or_else(|| {
                    invalid(format!("'{POPULATION_TIMES_KEY}' is not numeric: {raw_times}"))
                })?,
                None if values.len() == 2 => {
                    let branch_length = tree[index].branch_length().ok_or_else(|| {
                        invalid(format!(
                            "Linear demographic without '{POPULATION_TIMES_KEY}' needs a branch length"
                        ))
                    })?;
                    vec![*branch_length]
                }
                None => {
                    return Err(invalid(format!(
                        "{} population values without '{POPULATION_TIMES_KEY}'",
                        values.len()
                    )));
                }
            };
            if breakpoints.len() + 1 != values.len() {
                return Err(invalid(format!(
                    "{} population values need {} breakpoint times, found {}",
                    values.len(),
                    values.len() - 1,
                    breakpoints.len()
                )));
            }
            let times = std::iter::once(0.0).chain(breakpoints).collect();
            Demographic::piecewise_linear(values, times)
        }
    };
    demographic.map(Some).map_err(|e| invalid(e.to_string()))
}
