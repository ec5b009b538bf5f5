use approx::assert_abs_diff_eq;
use popsizes::PopSizeError;
use popsizes::accumulator::PopulationModel;
use popsizes::estimate::FitOptions;
use popsizes::model::{AnnotationValue, TaxonMap, Tree};
use popsizes::newick::{parse_file, parse_str, to_newick};
use popsizes::newick::NewickParser;
use popsizes::parser::ByteParser;
use popsizes::pipeline::{EstimationOptions, TreeList, estimate_popsizes, open_posterior};
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new("tests").join("fixtures").join(name)
}

fn target() -> (Tree, TaxonMap) {
    let (mut trees, taxa) = parse_file(fixture("target_abc.nwk")).unwrap();
    (trees.remove(0), taxa)
}

fn no_burnin() -> EstimationOptions {
    EstimationOptions {
        burnin: 0.0,
        ..EstimationOptions::default()
    }
}

// --- TESTS CONSTANT POPULATIONS ---
#[test]
fn test_constant_end_to_end() {
    let (mut target, taxa) = target();
    let options = EstimationOptions::default();
    let mut posterior = open_posterior(fixture("constant_n4.trees"), &options).unwrap();
    assert_eq!(posterior.num_trees(), 5);

    let model = estimate_popsizes(&mut target, &taxa, &mut posterior, &options.fit).unwrap();
    assert_eq!(model, PopulationModel::Constant);
    for index in 0..target.num_vertices() {
        assert_eq!(target.attributes(index)["dmv"], "4");
        assert!(!target.attributes(index).contains_key("dmt"));
    }
    assert_eq!(
        to_newick(&target, &taxa),
        "((A[&dmv=4]:1,B[&dmv=4]:1)[&dmv=4]:1,C[&dmv=4]:2)[&dmv=4];"
    );
}

#[test]
fn test_unmatched_clade_stays_plain() {
    let (mut target, taxa) =
        parse_str("((A[&dmv=1]:1,C[&dmv=1]:1)[&dmv=1]:1,B[&dmv=1]:2)[&dmv=1];").unwrap();
    let options = no_burnin();
    let mut posterior = open_posterior(fixture("constant_n4.trees"), &options).unwrap();
    estimate_popsizes(&mut target, &taxa, &mut posterior, &options.fit).unwrap();

    let a = target
        .leaves()
        .find(|v| v.taxon() == taxa.get_index("A"))
        .unwrap()
        .index();
    let ac = target.vertex(a).parent().unwrap();
    assert!(!target.attributes(ac).contains_key("dmv"));
    assert_eq!(target.attributes(a)["dmv"], "4");
    assert_eq!(target.attributes(target.root_index())["dmv"], "4");
}

#[test]
fn test_burnin_and_thinning_counts() {
    let options = EstimationOptions {
        burnin: 40.0,
        every: 2,
        ..EstimationOptions::default()
    };
    let posterior = open_posterior(fixture("constant_n4.trees"), &options).unwrap();
    assert_eq!(posterior.num_total_trees(), 5);
    assert_eq!(posterior.num_burnin_trees(), 2);
    assert_eq!(posterior.num_trees(), 2);
}

#[test]
fn test_all_burnin_means_no_trees() {
    let (mut target, taxa) = target();
    let options = EstimationOptions {
        burnin: 100.0,
        ..EstimationOptions::default()
    };
    let mut posterior = open_posterior(fixture("constant_n4.trees"), &options).unwrap();
    assert!(matches!(
        estimate_popsizes(&mut target, &taxa, &mut posterior, &options.fit),
        Err(PopSizeError::NoSampledTrees)
    ));
}

#[test]
fn test_single_taxon_target() {
    let (mut target, taxa) = parse_str("A[&dmv=1];").unwrap();
    let mut parser = NewickParser::new().with_annotations();
    let trees = (0..3)
        .map(|_| {
            parser
                .parse_str(&mut ByteParser::for_str("(A[&dmv=4]:1,B[&dmv=2]:1)[&dmv=3];"))
                .unwrap()
        })
        .collect();
    let mut source = TreeList::new(trees, parser.into_taxa());

    let model = estimate_popsizes(&mut target, &taxa, &mut source, &FitOptions::default()).unwrap();
    assert_eq!(model, PopulationModel::Constant);
    assert_eq!(to_newick(&target, &taxa), "A[&dmv=4];");
}

// --- TESTS LINEAR POPULATIONS ---
#[test]
fn test_linear_root_length_after_burnin() {
    let (mut target, taxa) = target();
    // 4 trees, the first (root 9) is burn-in
    let options = EstimationOptions {
        burnin: 25.0,
        ..EstimationOptions::default()
    };
    let mut posterior = open_posterior(fixture("linear_root_lengths.trees"), &options).unwrap();
    let model = estimate_popsizes(&mut target, &taxa, &mut posterior, &options.fit).unwrap();
    assert_eq!(model, PopulationModel::PiecewiseLinear);

    let root = target.root_index();
    assert_eq!(target.attributes(root)["dmt"], "2");
    let values = AnnotationValue::parse(&target.attributes(root)["dmv"])
        .as_f64_list()
        .unwrap();
    assert_abs_diff_eq!(values[0], 6.0, epsilon = 1e-2);
    assert_abs_diff_eq!(values[1], 6.0, epsilon = 1e-2);
}

#[test]
fn test_linear_root_length_all_trees() {
    let (mut target, taxa) = target();
    let options = no_burnin();
    let mut posterior = open_posterior(fixture("linear_root_lengths.trees"), &options).unwrap();
    estimate_popsizes(&mut target, &taxa, &mut posterior, &options.fit).unwrap();
    assert_eq!(target.attributes(target.root_index())["dmt"], "3.75");
}

#[test]
fn test_annotated_target_reparses() {
    let (mut target, taxa) = target();
    let options = no_burnin();
    let mut posterior = open_posterior(fixture("linear_root_lengths.trees"), &options).unwrap();
    estimate_popsizes(&mut target, &taxa, &mut posterior, &options.fit).unwrap();

    // the output is itself a valid *BEAST annotated tree
    let (mut copy, _) = parse_str(to_newick(&target, &taxa)).unwrap();
    assert!(popsizes::demographic::set_demographics(&mut copy).unwrap());
    let root = copy.demographic(copy.root_index()).unwrap();
    assert_eq!(root.natural_limit(), Some(3.75));
}

// --- TESTS ERRORS ---
#[test]
fn test_missing_posterior_file() {
    assert!(matches!(
        open_posterior(fixture("missing.trees"), &EstimationOptions::default()),
        Err(PopSizeError::Io(_))
    ));
}

#[test]
fn test_target_without_demographics() {
    let (mut target, taxa) = parse_str("((A:1,B:1):1,C:2);").unwrap();
    let options = EstimationOptions::default();
    let mut posterior = open_posterior(fixture("constant_n4.trees"), &options).unwrap();
    let err = estimate_popsizes(&mut target, &taxa, &mut posterior, &options.fit).unwrap_err();
    assert!(matches!(err, PopSizeError::MissingDemographic { .. }));
}
