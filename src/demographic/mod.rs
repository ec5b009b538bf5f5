//! Demographic functions and their *BEAST annotation form.
//!
//! * [Demographic] - constant or piecewise-linear population size over one
//!   branch, with evaluation, integration and coalescent intensity
//! * [set_demographics] - reads `dmv`/`dmt` vertex annotations into the
//!   demographic slots of a [Tree](crate::model::Tree)

mod attach;
mod function;

pub use attach::{POPULATION_TIMES_KEY, POPULATION_VALUES_KEY, set_demographics};
pub use function::{Demographic, DomainError, ShapeError};
