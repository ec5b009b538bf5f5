use popsizes::clade::clades_of;
use popsizes::demographic::set_demographics;
use popsizes::newick::parse_str;
use popsizes::nexus::{NexusParserBuilder, NexusWriter};
use popsizes::simulate::GeneTreeSimulator;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::File;
use std::path::Path;

// --- TESTS COALESCENT ---
#[test]
fn test_mean_coalescence_time_in_root() {
    // one lineage per species: they can only meet in the root population
    // of size 2, after an exponential waiting time with mean 2
    let (mut species, taxa) = parse_str("(A[&dmv=1]:1,B[&dmv=1]:1)[&dmv=2];").unwrap();
    set_demographics(&mut species).unwrap();
    let simulator = GeneTreeSimulator::new(&taxa, 1);
    let mut rng = StdRng::seed_from_u64(2024);

    let n = 4000;
    let total: f64 = (0..n)
        .map(|_| {
            let tree = simulator.simulate(&species, &mut rng).unwrap();
            tree.heights()[tree.root_index()]
        })
        .sum();
    let mean = total / n as f64;
    assert!((mean - 3.0).abs() < 0.15, "mean root height {mean}");
}

#[test]
fn test_small_population_coalesces_within_branch() {
    // a tiny population on A's long branch: both A lineages coalesce below
    // the split at height 10, so the A tips always form a clade
    let (mut species, taxa) = parse_str("(A[&dmv=0.001]:10,B[&dmv=1]:10)[&dmv=1];").unwrap();
    let simulator = GeneTreeSimulator::new(&taxa, 2);
    let mut rng = StdRng::seed_from_u64(5);
    let gene_trees = simulator.simulate_many(&mut species, 50, &mut rng).unwrap();

    let a_tips = vec![simulator.gene_taxon(0, 0), simulator.gene_taxon(0, 1)];
    for tree in &gene_trees {
        assert!(tree.is_valid());
        assert!(clades_of(tree, false).iter().any(|(c, _)| c.taxa() == a_tips.as_slice()));
    }
}

// --- TESTS SIMULATING FROM A POSTERIOR FILE ---
#[test]
fn test_gene_trees_from_nexus_species_trees() {
    let path = Path::new("tests").join("fixtures").join("constant_n4.trees");
    let mut species_trees = NexusParserBuilder::for_file(path)
        .unwrap()
        .with_annotations()
        .build()
        .unwrap();
    let simulator = GeneTreeSimulator::new(species_trees.taxa(), 3);
    let mut rng = StdRng::seed_from_u64(11);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("genetrees.trees");
    let mut writer = NexusWriter::begin(File::create(&out).unwrap(), simulator.gene_taxa()).unwrap();
    let mut written = 0;
    while let Some(mut species) = species_trees.next_tree().unwrap() {
        for gene_tree in simulator.simulate_many(&mut species, 2, &mut rng).unwrap() {
            writer.write_tree(&gene_tree).unwrap();
            written += 1;
        }
    }
    writer.finish().unwrap();
    assert_eq!(written, 10);

    let mut gene_trees = NexusParserBuilder::for_file(&out).unwrap().build().unwrap();
    assert_eq!(gene_trees.num_trees(), 10);
    assert_eq!(gene_trees.taxa().num_taxa(), 9);
    assert_eq!(gene_trees.taxa().get_label(8), Some("C_tip2"));
    while let Some(tree) = gene_trees.next_tree().unwrap() {
        assert_eq!(tree.num_leaves(), 9);
        assert!(tree.is_valid());
    }
}
