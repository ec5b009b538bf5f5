//! Closed-form estimate for constant population sizes.

use crate::accumulator::Accumulator;
use crate::annotate::annotate_constant;
use crate::model::Tree;

/// Annotates every target vertex whose clade was sampled with `dmv = n / S`.
///
/// Under a constant demographic the accumulator records `1 / N` per sample,
/// so `n / S` is the harmonic mean of the sampled sizes. Vertices never
/// matched by a sampled clade stay unannotated.
///
/// # Returns
/// The number of annotated vertices.
pub fn estimate_constant(target: &mut Tree, accumulator: &Accumulator) -> usize {
    let mut annotated = 0;
    for index in 0..target.num_vertices() {
        let Some(stats) = accumulator.vertex_stats(index).filter(|s| s.n() > 0) else {
            continue;
        };
        annotate_constant(target, index, stats.n() as f64 / stats.sum());
        annotated += 1;
    }
    annotated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demographic::set_demographics;
    use crate::newick::{NewickParser, parse_str};
    use crate::parser::ByteParser;

    fn accumulate(target: &Tree, taxa: &crate::model::TaxonMap, samples: &[&str]) -> Accumulator {
        let mut accumulator = Accumulator::new(target, taxa);
        let mut parser = NewickParser::new().with_annotations();
        for newick in samples {
            let mut tree = parser.parse_str(&mut ByteParser::for_str(newick)).unwrap();
            set_demographics(&mut tree).unwrap();
            accumulator.add_tree(&tree, parser.taxa()).unwrap();
        }
        accumulator
    }

    #[test]
    fn test_all_ones() {
        let (mut target, taxa) = parse_str("(A,B);").unwrap();
        let sample = "(A[&dmv=1]:1,B[&dmv=1]:1)[&dmv=1];";
        let accumulator = accumulate(&target, &taxa, &[sample, sample, sample]);

        assert_eq!(estimate_constant(&mut target, &accumulator), 3);
        for index in 0..3 {
            assert_eq!(target.attributes(index)["dmv"], "1");
        }
    }

    #[test]
    fn test_harmonic_mean() {
        // 1/N of 0.5 and 1.0
        let (mut target, taxa) = parse_str("(A,B);").unwrap();
        let accumulator = accumulate(
            &target,
            &taxa,
            &["(A[&dmv=2]:1,B[&dmv=1]:1)[&dmv=1];", "(A[&dmv=1]:1,B[&dmv=1]:1)[&dmv=1];"],
        );
        estimate_constant(&mut target, &accumulator);
        assert_eq!(target.attributes(0)["dmv"], "1.33333");
        assert_eq!(target.attributes(1)["dmv"], "1");
    }

    #[test]
    fn test_unmatched_vertices_stay_plain() {
        let (mut target, taxa) = parse_str("((A,B),C);").unwrap();
        let accumulator = accumulate(
            &target,
            &taxa,
            &["((A[&dmv=3]:1,C[&dmv=3]:1)[&dmv=3]:1,B[&dmv=3]:2)[&dmv=3];"],
        );
        assert_eq!(estimate_constant(&mut target, &accumulator), 4);
        let ab = 2;
        assert!(target.attributes(ab).is_empty());
        assert_eq!(target.attributes(target.root_index())["dmv"], "3");
    }
}
