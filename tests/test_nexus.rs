use popsizes::demographic::set_demographics;
use popsizes::model::AnnotationValue;
use popsizes::newick::to_newick;
use popsizes::nexus::{Burnin, NexusParserBuilder, NexusWriter};
use std::fs::File;
use std::path::Path;

fn constant_fixture() -> std::path::PathBuf {
    Path::new("tests").join("fixtures").join("constant_n4.trees")
}

// --- TESTS NEXUS PARSING ---
#[test]
fn test_translate_and_taxa_block() {
    let mut parser = NexusParserBuilder::for_file(constant_fixture())
        .unwrap()
        .with_annotations()
        .build()
        .unwrap();

    assert_eq!(parser.num_total_trees(), 5);
    assert_eq!(parser.num_trees(), 5);
    let taxa = parser.taxa().clone();
    assert_eq!(taxa.labels(), &["A".to_string(), "B".to_string(), "C".to_string()]);

    let tree = parser.next_tree().unwrap().unwrap();
    assert_eq!(tree.name(), Some("STATE_0"));
    assert!(tree.is_valid());
    assert_eq!(
        tree.annotations().get("dmv", tree.root_index()),
        Some(&AnnotationValue::Int(4))
    );

    let mut count = 1;
    while let Some(tree) = parser.next_tree().unwrap() {
        assert_eq!(tree.num_leaves(), 3);
        count += 1;
    }
    assert_eq!(count, 5);
}

#[test]
fn test_annotations_skipped_by_default() {
    let mut parser = NexusParserBuilder::for_file(constant_fixture())
        .unwrap()
        .build()
        .unwrap();
    let mut tree = parser.next_tree().unwrap().unwrap();
    assert!(tree.annotations().is_empty());
    assert!(!set_demographics(&mut tree).unwrap());
}

#[test]
fn test_burnin_and_every() {
    let mut parser = NexusParserBuilder::for_file(constant_fixture())
        .unwrap()
        .with_burnin(Burnin::Percentage(0.4))
        .with_every(2)
        .build()
        .unwrap();

    // 5 trees, 2 burn-in, then STATE_2000 and STATE_4000
    assert_eq!(parser.num_burnin_trees(), 2);
    assert_eq!(parser.num_trees(), 2);
    let names: Vec<String> = std::iter::from_fn(|| parser.next_tree().unwrap())
        .map(|tree| tree.name().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["STATE_2000", "STATE_4000"]);
}

#[test]
fn test_every_keeps_last_tree() {
    let mut parser = NexusParserBuilder::for_file(constant_fixture())
        .unwrap()
        .with_burnin(Burnin::Count(1))
        .with_every(3)
        .build()
        .unwrap();

    // STATE_1000 and STATE_4000
    assert_eq!(parser.num_trees(), 2);
    parser.next_tree().unwrap();
    let last = parser.next_tree().unwrap().unwrap();
    assert_eq!(last.name(), Some("STATE_4000"));
    assert!(parser.next_tree().unwrap().is_none());
}

#[test]
fn test_reset() {
    let mut parser = NexusParserBuilder::for_file(constant_fixture())
        .unwrap()
        .with_skip_first()
        .build()
        .unwrap();
    let first = parser.next_tree().unwrap().unwrap();
    while parser.next_tree().unwrap().is_some() {}

    parser.reset();
    let again = parser.next_tree().unwrap().unwrap();
    assert_eq!(first.name(), again.name());
    assert_eq!(again.name(), Some("STATE_1000"));
}

#[test]
fn test_read_strategies_agree() {
    let read_all = |builder: NexusParserBuilder| {
        let mut parser = builder.with_annotations().build().unwrap();
        let mut newicks = Vec::new();
        while let Some(tree) = parser.next_tree().unwrap() {
            newicks.push(to_newick(&tree, parser.taxa()));
        }
        newicks
    };
    let buffered = read_all(NexusParserBuilder::for_file(constant_fixture()).unwrap().with_buffered_source());
    let in_memory =
        read_all(NexusParserBuilder::for_file(constant_fixture()).unwrap().with_in_memory_source());
    assert_eq!(buffered.len(), 5);
    assert_eq!(buffered, in_memory);
}

#[test]
fn test_missing_file() {
    assert!(NexusParserBuilder::for_file("tests/fixtures/does_not_exist.trees").is_err());
}

#[test]
fn test_missing_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.trees");
    std::fs::write(&path, "Begin trees;\ntree t = (A,B);\nEnd;\n").unwrap();
    assert!(NexusParserBuilder::for_file(&path).unwrap().build().is_err());
}

// --- TESTS NEXUS WRITING ---
#[test]
fn test_writer_round_trip() {
    let mut parser = NexusParserBuilder::for_file(constant_fixture())
        .unwrap()
        .build()
        .unwrap();
    let mut trees = Vec::new();
    while let Some(tree) = parser.next_tree().unwrap() {
        trees.push(tree);
    }
    let taxa = parser.into_taxa();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("copy.trees");
    let mut writer = NexusWriter::begin(File::create(&path).unwrap(), &taxa).unwrap();
    for tree in &trees {
        writer.write_tree(tree).unwrap();
    }
    writer.finish().unwrap();

    let mut reparsed = NexusParserBuilder::for_file(&path).unwrap().build().unwrap();
    assert_eq!(reparsed.num_trees(), trees.len());
    for tree in &trees {
        let copy = reparsed.next_tree().unwrap().unwrap();
        assert_eq!(copy.name(), tree.name());
        assert_eq!(to_newick(&copy, reparsed.taxa()), to_newick(tree, &taxa));
    }
}

#[test]
fn test_written_attributes_are_annotations() {
    let mut parser = NexusParserBuilder::for_file(constant_fixture())
        .unwrap()
        .build()
        .unwrap();
    let mut tree = parser.next_tree().unwrap().unwrap();
    let taxa = parser.into_taxa();
    for index in 0..tree.num_vertices() {
        tree.set_attribute(index, "dmv", "{1,2}".to_string());
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("annotated.trees");
    let mut writer = NexusWriter::begin(File::create(&path).unwrap(), &taxa).unwrap();
    writer.write_tree(&tree).unwrap();
    writer.finish().unwrap();

    let mut reparsed = NexusParserBuilder::for_file(&path)
        .unwrap()
        .with_annotations()
        .build()
        .unwrap();
    let mut copy = reparsed.next_tree().unwrap().unwrap();
    let root = copy.root_index();
    assert_eq!(
        copy.annotations().get("dmv", root),
        Some(&AnnotationValue::List(vec![1.0, 2.0]))
    );
    // the root has no branch length, so its linear demographic needs dmt
    assert!(set_demographics(&mut copy).is_err());
}
