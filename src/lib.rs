//! Popsizes estimates population sizes on a species tree from a posterior
//! sample of *BEAST species trees.
//!
//! Every sampled tree carries a demographic function per branch (`dmv` and
//! `dmt` annotations). The clades of a fixed target tree are looked up in
//! each sampled tree, and the population sizes of matching branches are
//! summarized. The target is then annotated with either
//! - constant population sizes, if no sampled demographic had a time limit,
//!   or
//! - linear population functions per branch, fitted jointly over the whole
//!   tree by least squares.
//!
//! Core functionality provided:
//! - [demographic]: constant and piecewise-linear population functions and
//!   their *BEAST annotation form
//! - [clade]: clades as canonical taxon sets for matching across trees
//! - [accumulator]: streaming per-clade statistics over the samples
//! - [estimate]: the constant and piecewise-linear estimators
//! - [pipeline]: the whole run, streaming a NEXUS file of samples
//! - [simulate]: gene trees within species trees, for testing the above
//! - Tree input and output: [newick] and [nexus], on top of the arena tree
//!   [model] and the byte level [parser]
//!
//! Limitations:
//! - Only binary trees
//! - Only leaf labels considered, internal labels are dropped
//!
//! # Usage
//! ```no_run
//! use popsizes::newick::{parse_str, to_newick};
//! use popsizes::pipeline::{estimate_popsizes, open_posterior, EstimationOptions};
//!
//! let options = EstimationOptions::default();
//! let (mut target, taxa) = parse_str("((A[&dmv=1]:1,B[&dmv=1]:1)[&dmv=1]:1,C[&dmv=1]:2)[&dmv=1];")?;
//! let mut posterior = open_posterior("species.trees", &options)?;
//!
//! estimate_popsizes(&mut target, &taxa, &mut posterior, &options.fit)?;
//! println!("{}", to_newick(&target, &taxa));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod accumulator;
pub mod annotate;
pub mod clade;
pub mod demographic;
pub mod error;
pub mod estimate;
pub mod logger;
pub mod model;
pub mod newick;
pub mod nexus;
pub mod parser;
pub mod pipeline;
pub mod simulate;

pub use error::PopSizeError;
