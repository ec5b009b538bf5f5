use anyhow::{Context, Result, bail, ensure};
use clap::Parser;
use log::info;
use popsizes::estimate::FitOptions;
use popsizes::model::{TaxonMap, Tree};
use popsizes::newick::{self, to_newick};
use popsizes::pipeline::{EstimationOptions, estimate_popsizes, open_posterior};
use std::path::{Path, PathBuf};

// ============================================================================
// CLI
// ============================================================================
#[derive(Parser)]
#[command(
    version,
    about = "Annotate a tree with posterior estimates of population sizes",
    long_about = "Annotate a tree with posterior estimates of population sizes from \
                  *BEAST species trees. Prints the annotated Newick tree to stdout."
)]
struct Args {
    /// Target tree: a Newick string or a file containing one
    tree: String,
    /// NEXUS file with posterior species trees
    posterior_trees: PathBuf,
    /// Burn-in amount in percent
    #[arg(short, long, default_value_t = 10.0)]
    burnin: f64,
    /// Thin out: take one tree for every E
    #[arg(short, long, value_name = "E", default_value_t = 1,
          value_parser = clap::value_parser!(u64).range(1..))]
    every: u64,
    /// Print progress messages to stderr
    #[arg(short, long)]
    progress: bool,
    /// Maximum iterations of each minimizer run
    #[arg(long, default_value_t = FitOptions::default().max_iters)]
    max_iters: u64,
    /// Number of minimizer restarts
    #[arg(long, default_value_t = FitOptions::default().restarts)]
    restarts: usize,
    /// Print debug messages to stderr
    #[arg(short, long)]
    verbose: bool,
}

// ============================================================================
// Main
// ============================================================================
fn main() -> Result<()> {
    let args = Args::parse();
    popsizes::logger::init(popsizes::logger::level_for(args.progress, args.verbose))?;

    ensure!(
        (0.0..=100.0).contains(&args.burnin),
        "Burn-in must be a percentage in [0, 100], got {}",
        args.burnin
    );
    let options = EstimationOptions {
        burnin: args.burnin,
        every: usize::try_from(args.every)?,
        fit: FitOptions {
            max_iters: args.max_iters,
            restarts: args.restarts,
            ..FitOptions::default()
        },
    };

    let (mut target, taxa) = read_target(&args.tree)?;
    let mut posterior = open_posterior(&args.posterior_trees, &options)
        .with_context(|| format!("Failed to open {}", args.posterior_trees.display()))?;

    let model = estimate_popsizes(&mut target, &taxa, &mut posterior, &options.fit)
        .with_context(|| format!("Failed to estimate from {}", args.posterior_trees.display()))?;
    info!("Done ({model} population sizes)");

    println!("{}", to_newick(&target, &taxa));
    Ok(())
}

/// Parses the target tree from a file if `tree` names one, else from the
/// string itself.
fn read_target(tree: &str) -> Result<(Tree, TaxonMap)> {
    let path = Path::new(tree);
    if path.is_file() {
        let (mut trees, taxa) = newick::parse_file(path)
            .with_context(|| format!("Failed to parse target tree file {tree}"))?;
        if trees.is_empty() {
            bail!("No tree in {tree}");
        }
        Ok((trees.swap_remove(0), taxa))
    } else {
        newick::parse_str(tree).context("Failed to parse target tree")
    }
}
