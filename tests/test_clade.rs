use popsizes::accumulator::Accumulator;
use popsizes::clade::{Clade, clades_of, mapped_clades_of};
use popsizes::demographic::set_demographics;
use popsizes::newick::parse_str;
use popsizes::nexus::NexusParserBuilder;
use std::collections::HashSet;
use std::path::Path;

fn clade_set(newick: &str, include_tips: bool) -> HashSet<Vec<String>> {
    let (tree, taxa) = parse_str(newick).unwrap();
    clades_of(&tree, include_tips)
        .into_iter()
        .map(|(clade, _)| {
            let mut labels: Vec<String> = clade
                .taxa()
                .iter()
                .map(|&t| taxa.get_label(t).unwrap().to_string())
                .collect();
            labels.sort();
            labels
        })
        .collect()
}

fn labels(clade: &[&str]) -> Vec<String> {
    clade.iter().map(|s| s.to_string()).collect()
}

// --- TESTS CLADES ---
#[test]
fn test_internal_clades() {
    let clades = clade_set("((A:1,B:1):1,(C:1,D:1):1);", false);
    assert_eq!(clades.len(), 3);
    assert!(clades.contains(&labels(&["A", "B"])));
    assert!(clades.contains(&labels(&["C", "D"])));
    assert!(clades.contains(&labels(&["A", "B", "C", "D"])));
}

#[test]
fn test_tip_clades() {
    let clades = clade_set("((A:1,B:1):1,C:2);", true);
    assert_eq!(clades.len(), 5);
    assert!(clades.contains(&labels(&["C"])));
}

#[test]
fn test_same_clades_for_rotated_trees() {
    assert_eq!(
        clade_set("((A,B),(C,D));", true),
        clade_set("((D,C),(B,A));", true)
    );
    assert_ne!(
        clade_set("((A,B),(C,D));", true),
        clade_set("((A,C),(B,D));", true)
    );
}

#[test]
fn test_clade_union() {
    let ab = Clade::new(vec![1, 0]);
    let c = Clade::singleton(2);
    assert_eq!(ab.union(&c), Clade::new(vec![2, 1, 0]));
    assert_eq!(c.single_taxon(), Some(2));
    assert_eq!(ab.len(), 2);
}

#[test]
fn test_foreign_taxa_excluded() {
    let (tree, taxa) = parse_str("((A,X),(B,C));").unwrap();
    let x = taxa.get_index("X").unwrap();
    let clades = mapped_clades_of(&tree, false, |t| (t != x).then_some(t));
    // only (B,C) survives
    assert_eq!(clades.len(), 1);
    assert_eq!(clades[0].0.len(), 2);
}

// --- TESTS MATCHING ACROSS TAXON ORDERINGS ---
#[test]
fn test_translate_ordering_matched_by_label() {
    // target taxa ordered C, B, A; the sample file translates 1=A, 2=B, 3=C
    let (target, target_taxa) = parse_str("(C[&dmv=1]:2,(B[&dmv=1]:1,A[&dmv=1]:1)[&dmv=1]:1)[&dmv=1];").unwrap();
    assert_eq!(target_taxa.get_index("C"), Some(0));

    let path = Path::new("tests").join("fixtures").join("constant_n4.trees");
    let mut parser = NexusParserBuilder::for_file(path)
        .unwrap()
        .with_annotations()
        .build()
        .unwrap();

    let mut accumulator = Accumulator::new(&target, &target_taxa);
    while let Some(mut tree) = parser.next_tree().unwrap() {
        set_demographics(&mut tree).unwrap();
        accumulator.add_tree(&tree, parser.taxa()).unwrap();
    }

    assert_eq!(accumulator.num_trees(), 5);
    assert_eq!(accumulator.num_matched_clades(), target.num_vertices());
    let ab = Clade::new(vec![
        target_taxa.get_index("A").unwrap(),
        target_taxa.get_index("B").unwrap(),
    ]);
    assert_eq!(accumulator.stats(&ab).unwrap().n(), 5);
}
