//! Crate-level error type.

use crate::demographic::DomainError;
use crate::model::VertexIndex;
use crate::parser::ParsingError;
use thiserror::Error;

/// Everything that can abort a population size estimation.
#[derive(Debug, Error)]
pub enum PopSizeError {
    #[error(transparent)]
    Parsing(#[from] ParsingError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A tree that needs demographics has none (`dmv` annotations).
    #[error("No demographic information in {tree}")]
    MissingDemographic { tree: String },

    /// `dmv`/`dmt` annotations of a vertex do not form a demographic.
    #[error("Invalid demographic at vertex {vertex}: {reason}")]
    InvalidDemographic { vertex: VertexIndex, reason: String },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Invalid target tree: {0}")]
    InvalidTarget(String),

    /// Runtime failure of the minimizer.
    #[error("Optimization failed: {text}")]
    Optimization { text: String },

    #[error("No sampled trees left after burn-in and thinning")]
    NoSampledTrees,
}

impl From<argmin::core::Error> for PopSizeError {
    fn from(error: argmin::core::Error) -> Self {
        PopSizeError::Optimization {
            text: error.to_string(),
        }
    }
}
