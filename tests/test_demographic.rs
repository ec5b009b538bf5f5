use approx::assert_abs_diff_eq;
use popsizes::PopSizeError;
use popsizes::demographic::{Demographic, set_demographics};
use popsizes::newick::parse_str;
use popsizes::nexus::NexusParserBuilder;
use std::path::Path;

// --- TESTS DEMOGRAPHIC FUNCTIONS ---
#[test]
fn test_piecewise_integral_and_population() {
    // 1 -> 3 over [0,2], then 3 -> 2 over [2,3]
    let d = Demographic::piecewise_linear(vec![1.0, 3.0, 2.0], vec![0.0, 2.0, 3.0]).unwrap();

    assert_abs_diff_eq!(d.population(1.0).unwrap(), 2.0);
    assert_abs_diff_eq!(d.population(2.5).unwrap(), 2.5);
    assert_abs_diff_eq!(d.integrate(2.0).unwrap(), 4.0);
    assert_abs_diff_eq!(d.integrate(3.0).unwrap(), 6.5);
    assert_abs_diff_eq!(d.integrate(1.0).unwrap(), 1.5);
    assert!(d.integrate(3.5).is_err());
    assert!(d.population(-0.1).is_err());
}

#[test]
fn test_mean_of_two_point() {
    let d = Demographic::two_point(2.0, 6.0, 4.0).unwrap();
    let limit = d.natural_limit().unwrap();
    assert_abs_diff_eq!(d.integrate(limit).unwrap() / limit, 4.0);
}

#[test]
fn test_intensity_constant_and_linear() {
    let constant = Demographic::constant(2.0).unwrap();
    assert_abs_diff_eq!(constant.intensity(3.0).unwrap(), 1.5);
    assert_abs_diff_eq!(constant.inverse_intensity(1.5).unwrap(), 3.0);

    // ∫₀¹ 1/(1+t) dt = ln 2
    let linear = Demographic::two_point(1.0, 2.0, 1.0).unwrap();
    assert_abs_diff_eq!(linear.intensity(1.0).unwrap(), 2f64.ln(), epsilon = 1e-12);
    // past the limit the last size is carried on
    assert_abs_diff_eq!(linear.intensity(3.0).unwrap(), 2f64.ln() + 1.0, epsilon = 1e-12);
    for t in [0.0, 0.3, 1.0, 2.5] {
        let x = linear.intensity(t).unwrap();
        assert_abs_diff_eq!(linear.inverse_intensity(x).unwrap(), t, epsilon = 1e-9);
    }
}

#[test]
fn test_invalid_shapes() {
    assert!(Demographic::constant(-1.0).is_err());
    assert!(Demographic::piecewise_linear(vec![1.0], vec![0.0]).is_err());
    assert!(Demographic::piecewise_linear(vec![1.0, 2.0], vec![0.5, 1.0]).is_err());
    assert!(Demographic::piecewise_linear(vec![1.0, 2.0, 3.0], vec![0.0, 2.0, 1.0]).is_err());
    assert!(Demographic::two_point(1.0, 2.0, 0.0).is_err());
}

// --- TESTS ATTACHING ANNOTATIONS ---
#[test]
fn test_attach_from_annotations() {
    let (mut tree, taxa) =
        parse_str("((A[&dmv=3]:1,B[&dmv={1,2}]:2)[&dmv={1,2,3},dmt={0.5,1}]:1,C:2)[&dmt=4,dmv={6,5}];")
            .unwrap();
    assert!(set_demographics(&mut tree).unwrap());

    let leaf = |label: &str| {
        tree.leaves()
            .find(|v| v.taxon() == taxa.get_index(label))
            .unwrap()
            .index()
    };
    let (a, b, c) = (leaf("A"), leaf("B"), leaf("C"));
    let ab = tree.vertex(a).parent().unwrap();
    let root = tree.root_index();

    assert_eq!(tree.demographic(a), Some(&Demographic::Constant(3.0)));
    // linear without dmt ends at the branch length
    assert_eq!(tree.demographic(b).unwrap().natural_limit(), Some(2.0));
    assert_eq!(
        tree.demographic(ab),
        Some(&Demographic::piecewise_linear(vec![1.0, 2.0, 3.0], vec![0.0, 0.5, 1.0]).unwrap())
    );
    assert_eq!(tree.demographic(c), None);
    assert_eq!(tree.demographic(root).unwrap().natural_limit(), Some(4.0));
}

#[test]
fn test_attach_errors() {
    let invalid = |newick: &str| {
        let (mut tree, _) = parse_str(newick).unwrap();
        matches!(set_demographics(&mut tree), Err(PopSizeError::InvalidDemographic { .. }))
    };
    // three values without times
    assert!(invalid("(A[&dmv={1,2,3}]:1,B:1);"));
    // wrong number of times
    assert!(invalid("(A[&dmv={1,2,3},dmt=1]:1,B:1);"));
    // linear root without dmt has no branch length
    assert!(invalid("(A:1,B:1)[&dmv={1,2}];"));
    // not numeric
    assert!(invalid("(A[&dmv=large]:1,B:1);"));
}

#[test]
fn test_no_annotations() {
    let (mut tree, _) = parse_str("((A:1,B:1):1,C:2);").unwrap();
    assert!(!set_demographics(&mut tree).unwrap());
    assert!(!tree.has_demographics());
}

#[test]
fn test_attach_nexus_samples() {
    let path = Path::new("tests").join("fixtures").join("linear_root_lengths.trees");
    let mut parser = NexusParserBuilder::for_file(path)
        .unwrap()
        .with_annotations()
        .build()
        .unwrap();

    let mut root_limits = Vec::new();
    while let Some(mut tree) = parser.next_tree().unwrap() {
        assert!(set_demographics(&mut tree).unwrap());
        let root = tree.demographic(tree.root_index()).unwrap();
        root_limits.push(root.natural_limit().unwrap());
        assert_abs_diff_eq!(root.population(0.0).unwrap(), 6.0);
    }
    assert_eq!(root_limits, vec![9.0, 1.0, 2.0, 3.0]);
}
