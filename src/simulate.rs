//! Gene trees simulated inside species trees under the multispecies
//! coalescent.
//!
//! Every species tip `X` contributes the gene tips `X_tip0, X_tip1, ...`.
//! Going back in time through each species branch, the `k` lineages present
//! coalesce at pairwise rate `C(k,2) / N(t)`, with `N` the demographic of
//! the branch. Lineages reaching the top of a branch enter the parent
//! population; in the root population they coalesce until one is left.

use crate::demographic::{Demographic, set_demographics};
use crate::error::PopSizeError;
use crate::model::{BranchLength, TaxonIndex, TaxonMap, Tree, VertexIndex};
use rand::Rng;

/// Settings of the gene tree simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOptions {
    /// Gene trees simulated per species tree.
    pub trees_per_species_tree: usize,
    /// Gene tips sampled per species.
    pub tips_per_species: usize,
    /// Stop after this many species trees.
    pub total: Option<usize>,
    /// Seed of the random generator, random if not set.
    pub seed: Option<u64>,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        SimulationOptions {
            trees_per_species_tree: 1,
            tips_per_species: 2,
            total: None,
            seed: None,
        }
    }
}

/// One node of a gene tree under construction, in order of creation.
#[derive(Debug, Clone, Copy)]
enum GeneNode {
    Tip { taxon: TaxonIndex, height: f64 },
    Join { children: (usize, usize), height: f64 },
}

impl GeneNode {
    fn height(&self) -> f64 {
        match self {
            GeneNode::Tip { height, .. } | GeneNode::Join { height, .. } => *height,
        }
    }
}

// =#========================================================================#=
// GENE TREE SIMULATOR
// =#========================================================================#=
/// Simulates gene trees for species trees over a fixed set of species.
///
/// # Example
/// ```
/// use popsizes::newick::parse_str;
/// use popsizes::demographic::set_demographics;
/// use popsizes::simulate::GeneTreeSimulator;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let (mut species, species_taxa) = parse_str("(A[&dmv=1]:1,B[&dmv=1]:1)[&dmv=2];")?;
/// set_demographics(&mut species)?;
///
/// let simulator = GeneTreeSimulator::new(&species_taxa, 2);
/// let gene_tree = simulator.simulate(&species, &mut StdRng::seed_from_u64(7))?;
/// assert_eq!(gene_tree.num_leaves(), 4);
/// assert_eq!(simulator.gene_taxa().get_label(1), Some("A_tip1"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct GeneTreeSimulator {
    num_species: usize,
    tips_per_species: usize,
    gene_taxa: TaxonMap,
}

impl GeneTreeSimulator {
    /// Creates a simulator whose gene taxa are `<species>_tip<k>` for every
    /// species taxon and `k < tips_per_species`, ordered by species.
    pub fn new(species_taxa: &TaxonMap, tips_per_species: usize) -> Self {
        let mut gene_taxa = TaxonMap::with_capacity(species_taxa.num_taxa() * tips_per_species);
        for species in species_taxa.labels() {
            for k in 0..tips_per_species {
                gene_taxa.get_or_insert(&format!("{species}_tip{k}"));
            }
        }
        GeneTreeSimulator {
            num_species: species_taxa.num_taxa(),
            tips_per_species,
            gene_taxa,
        }
    }

    /// Taxa of all gene trees produced by this simulator.
    pub fn gene_taxa(&self) -> &TaxonMap {
        &self.gene_taxa
    }

    /// Gene taxon of the `k`-th tip sampled from `species_taxon`.
    pub fn gene_taxon(&self, species_taxon: TaxonIndex, k: usize) -> TaxonIndex {
        species_taxon * self.tips_per_species + k
    }

    /// Attaches the demographics of `species` and simulates `count` gene
    /// trees in it.
    ///
    /// # Errors
    /// [PopSizeError::MissingDemographic] if `species` has no demographic
    /// annotations, and any error of [simulate](Self::simulate).
    pub fn simulate_many<R: Rng + ?Sized>(
        &self,
        species: &mut Tree,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Tree>, PopSizeError> {
        if !set_demographics(species)? {
            return Err(PopSizeError::MissingDemographic {
                tree: describe(species),
            });
        }
        (0..count).map(|_| self.simulate(species, rng)).collect()
    }

    /// Simulates one gene tree in a species tree with demographics attached.
    ///
    /// Species tips may sit at different heights; gene tips are sampled at
    /// the height of their species tip.
    ///
    /// # Errors
    /// * [PopSizeError::MissingDemographic] if a species branch has no
    ///   demographic
    /// * [PopSizeError::InvalidTarget] if a species is unknown to this
    ///   simulator or the species tree has no root
    pub fn simulate<R: Rng + ?Sized>(&self, species: &Tree, rng: &mut R) -> Result<Tree, PopSizeError> {
        if !species.is_root_set() {
            return Err(PopSizeError::InvalidTarget("Species tree has no root".to_string()));
        }
        let heights = species.heights();
        let root = species.root_index();

        let mut nodes: Vec<GeneNode> = Vec::new();
        // lineages leaving the top of each species branch
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); species.num_vertices()];

        for vertex in species.post_order_iter() {
            let index = vertex.index();
            let mut lineages = match (vertex.children(), vertex.taxon()) {
                (Some((left, right)), _) => {
                    let mut merged = std::mem::take(&mut outgoing[left]);
                    merged.append(&mut outgoing[right]);
                    merged
                }
                (None, Some(taxon)) => self.sample_tips(taxon, heights[index], &mut nodes)?,
                (None, None) => Vec::new(),
            };

            let demographic = species.demographic(index).ok_or_else(|| {
                PopSizeError::MissingDemographic {
                    tree: format!("{}, vertex {index}", describe(species)),
                }
            })?;
            let duration = if index == root {
                f64::INFINITY
            } else {
                vertex.branch_length().map_or(0.0, |bl| *bl)
            };

            coalesce_in_branch(demographic, heights[index], duration, &mut lineages, &mut nodes, rng)?;
            outgoing[index] = lineages;
        }

        Ok(build_tree(&nodes))
    }

    fn sample_tips(
        &self,
        species_taxon: TaxonIndex,
        height: f64,
        nodes: &mut Vec<GeneNode>,
    ) -> Result<Vec<usize>, PopSizeError> {
        if species_taxon >= self.num_species {
            return Err(PopSizeError::InvalidTarget(format!(
                "Species taxon {species_taxon} is unknown to the simulator"
            )));
        }
        Ok((0..self.tips_per_species)
            .map(|k| {
                nodes.push(GeneNode::Tip {
                    taxon: self.gene_taxon(species_taxon, k),
                    height,
                });
                nodes.len() - 1
            })
            .collect())
    }
}

/// Coalesces `lineages` within one species branch starting at height
/// `bottom` and lasting `duration`, leaving the survivors in `lineages`.
fn coalesce_in_branch<R: Rng + ?Sized>(
    demographic: &Demographic,
    bottom: f64,
    duration: f64,
    lineages: &mut Vec<usize>,
    nodes: &mut Vec<GeneNode>,
    rng: &mut R,
) -> Result<(), PopSizeError> {
    let mut t = 0.0;
    while lineages.len() > 1 {
        let k = lineages.len() as f64;
        let pairs = k * (k - 1.0) / 2.0;
        let waiting: f64 = -(1.0 - rng.gen_range(0.0..1.0_f64)).ln() / pairs;

        let next = demographic.inverse_intensity(demographic.intensity(t)? + waiting)?;
        if next > duration {
            break;
        }
        t = next;

        let first = lineages.swap_remove(rng.gen_range(0..lineages.len()));
        let second = lineages.swap_remove(rng.gen_range(0..lineages.len()));
        nodes.push(GeneNode::Join {
            children: (first, second),
            height: bottom + t,
        });
        lineages.push(nodes.len() - 1);
    }
    Ok(())
}

/// Converts the gene nodes, children always before parents, into a [Tree]
/// with the same indices.
fn build_tree(nodes: &[GeneNode]) -> Tree {
    let mut parent_heights: Vec<Option<f64>> = vec![None; nodes.len()];
    for node in nodes {
        if let GeneNode::Join { children: (a, b), height } = node {
            parent_heights[*a] = Some(*height);
            parent_heights[*b] = Some(*height);
        }
    }
    let branch_length = |i: usize| -> Option<BranchLength> {
        parent_heights[i].and_then(|h| BranchLength::try_new((h - nodes[i].height()).max(0.0)))
    };

    let mut tree = Tree::new();
    let mut root: Option<VertexIndex> = None;
    for (i, node) in nodes.iter().enumerate() {
        let index = match node {
            GeneNode::Tip { taxon, .. } => tree.add_leaf(*taxon, branch_length(i)),
            GeneNode::Join { children, .. } => tree.add_internal_vertex(*children, branch_length(i)),
        };
        if parent_heights[i].is_none() {
            root = Some(index);
        }
    }
    if let Some(root) = root {
        tree.set_root(root);
    }
    tree
}

fn describe(tree: &Tree) -> String {
    tree.name()
        .map_or_else(|| "species tree".to_string(), |name| format!("species tree '{name}'"))
}
