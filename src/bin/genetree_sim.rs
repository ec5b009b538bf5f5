use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;
use popsizes::model::Tree;
use popsizes::newick::to_newick;
use popsizes::nexus::{NexusParser, NexusParserBuilder, NexusWriter};
use popsizes::simulate::{GeneTreeSimulator, SimulationOptions};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

// ============================================================================
// CLI
// ============================================================================
#[derive(Parser)]
#[command(
    version,
    about = "Generate gene trees compatible with species trees",
    long_about = "Generate gene trees compatible with species trees. The species trees \
                  in the NEXUS input file should contain population size information \
                  in the format generated by *BEAST. Tips of individuals of species X \
                  are labeled X_tip0, X_tip1, etc. in the gene trees."
)]
struct Args {
    /// NEXUS file with species trees
    species_trees: PathBuf,
    /// Number of gene trees per species tree
    #[arg(short = 'n', long = "ntrees", default_value_t = 1,
          value_parser = clap::value_parser!(u64).range(1..))]
    ntrees: u64,
    /// Number of individuals per species
    #[arg(short = 't', long, default_value_t = 2,
          value_parser = clap::value_parser!(u64).range(1..))]
    per_species: u64,
    /// Write trees in NEXUS format to this file instead of Newick to stdout
    #[arg(short = 'o', long = "nexus", value_name = "FILE")]
    nexus: Option<PathBuf>,
    /// Stop after processing this number of species trees
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    total: Option<u64>,
    /// Seed of the random number generator
    #[arg(long)]
    seed: Option<u64>,
    /// Print progress messages to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Where simulated gene trees go.
enum Output {
    Newick(io::BufWriter<io::Stdout>),
    Nexus(NexusWriter<File>),
}

// ============================================================================
// Main
// ============================================================================
fn main() -> Result<()> {
    let args = Args::parse();
    popsizes::logger::init(popsizes::logger::level_for(args.verbose, false))?;

    let options = SimulationOptions {
        trees_per_species_tree: usize::try_from(args.ntrees)?,
        tips_per_species: usize::try_from(args.per_species)?,
        total: args.total.map(usize::try_from).transpose()?,
        seed: args.seed,
    };
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut species_trees = NexusParserBuilder::for_file(&args.species_trees)
        .map(NexusParserBuilder::with_annotations)
        .with_context(|| format!("Failed to open {}", args.species_trees.display()))?
        .build()
        .with_context(|| format!("Failed to read {}", args.species_trees.display()))?;

    let Some(first) = next_species_tree(&mut species_trees)? else {
        bail!("No species trees in {}", args.species_trees.display());
    };
    let simulator = GeneTreeSimulator::new(species_trees.taxa(), options.tips_per_species);

    let mut output = match &args.nexus {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Output::Nexus(NexusWriter::begin(file, simulator.gene_taxa())?)
        }
        None => Output::Newick(io::BufWriter::new(io::stdout())),
    };

    let mut next = Some(first);
    let mut num_species_trees = 0;
    while let Some(mut species) = next {
        let gene_trees = simulator
            .simulate_many(&mut species, options.trees_per_species_tree, &mut rng)
            .with_context(|| format!("Failed to simulate in species tree {}", num_species_trees + 1))?;
        for gene_tree in &gene_trees {
            match &mut output {
                Output::Newick(out) => writeln!(out, "{}", to_newick(gene_tree, simulator.gene_taxa()))?,
                Output::Nexus(writer) => writer.write_tree(gene_tree)?,
            }
        }

        num_species_trees += 1;
        if options.total.is_some_and(|total| num_species_trees >= total) {
            break;
        }
        next = next_species_tree(&mut species_trees)?;
    }
    info!("Simulated gene trees for {num_species_trees} species trees");

    match output {
        Output::Newick(mut out) => out.flush()?,
        Output::Nexus(writer) => {
            writer.finish()?;
        }
    }
    Ok(())
}

fn next_species_tree(parser: &mut NexusParser) -> Result<Option<Tree>> {
    parser.next_tree().context("Failed to parse species tree")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_must_be_positive() {
        assert!(Args::try_parse_from(["genetree_sim", "--total", "0", "species.trees"]).is_err());
        let args = Args::try_parse_from(["genetree_sim", "--total", "2", "species.trees"]).unwrap();
        assert_eq!(args.total, Some(2));
        assert_eq!(args.ntrees, 1);
    }
}
