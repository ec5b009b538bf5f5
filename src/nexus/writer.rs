//! NEXUS format tree writer.

use crate::model::{TaxonMap, Tree};
use crate::newick::{NewickStyle, to_newick_with_style};
use crate::nexus::defs::{
    BLOCK_BEGIN, BLOCK_END, DIMENSIONS, NEXUS_HEADER, NTAX, TAXA, TAXLABELS, TRANSLATE, TREE,
    TREES,
};
use crate::parser::utils::escape_label;
use std::io::{self, BufWriter, Write};

// =#========================================================================#=
// NEXUS WRITER
// =#========================================================================#=
/// Streaming writer for phylogenetic trees in NEXUS format.
///
/// All trees share one [TaxonMap], written once as TAXA block and as an
/// integer TRANSLATE command. Trees are then appended one at a time with
/// [`write_tree()`](Self::write_tree) and the file is completed with
/// [`finish()`](Self::finish).
///
/// # Format Structure
/// - `#NEXUS` header
/// - `TAXA` block with dimensions and tax labels
/// - `TREES` block with TRANSLATE command and tree definitions
///
/// # Example
/// ```
/// use popsizes::model::{TaxonMap, Tree};
/// use popsizes::nexus::NexusWriter;
///
/// let mut taxa = TaxonMap::new();
/// let mut tree = Tree::new();
/// let a = tree.add_leaf(taxa.get_or_insert("A"), None);
/// let b = tree.add_leaf(taxa.get_or_insert("B"), None);
/// let root = tree.add_internal_vertex((a, b), None);
/// tree.set_root(root);
///
/// let mut writer = NexusWriter::begin(Vec::new(), &taxa)?;
/// writer.write_tree(&tree)?;
/// let bytes = writer.finish()?;
/// assert!(String::from_utf8(bytes).unwrap().contains("tree tree_0 = (1,2);"));
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct NexusWriter<W: Write> {
    bw: BufWriter<W>,
    taxa: TaxonMap,
    num_written: usize,
}

// ============================================================================
// API (public)
// ============================================================================
impl<W: Write> NexusWriter<W> {
    /// Creates a writer and writes everything up to the first tree command:
    /// header, TAXA block and the start of the TREES block with TRANSLATE.
    ///
    /// # Errors
    /// Returns an I/O error if writing fails.
    pub fn begin(inner: W, taxa: &TaxonMap) -> io::Result<Self> {
        let mut writer = NexusWriter {
            bw: BufWriter::new(inner),
            taxa: taxa.clone(),
            num_written: 0,
        };
        writer.header()?.taxa_block()?.trees_block_start()?;
        Ok(writer)
    }

    /// Appends one `TREE` command. Trees without name are called
    /// `tree_<i>`, counting from 0.
    ///
    /// # Errors
    /// Returns an I/O error if writing fails.
    pub fn write_tree(&mut self, tree: &Tree) -> io::Result<()> {
        let name = tree
            .name()
            .map(escape_label)
            .unwrap_or_else(|| format!("tree_{}", self.num_written));
        let newick = to_newick_with_style(tree, &self.taxa, NewickStyle::OneIndexed);

        self.write_all(TREE)?
            .space()?
            .write_all(name.as_bytes())?
            .space()?
            .equals()?
            .space()?
            .write_all(newick.as_bytes())?
            .newline()?;
        self.num_written += 1;
        Ok(())
    }

    /// Closes the TREES block, flushes, and returns the underlying writer.
    ///
    /// # Errors
    /// Returns an I/O error if writing or flushing fails.
    pub fn finish(mut self) -> io::Result<W> {
        self.write_all(BLOCK_END)?.newline()?;
        self.bw.into_inner().map_err(|e| e.into_error())
    }
}

// ============================================================================
// Nexus Block & Command Writing (private)
// ============================================================================
impl<W: Write> NexusWriter<W> {
    /// Writes the NEXUS file header ("#NEXUS"), returning itself for chaining.
    fn header(&mut self) -> io::Result<&mut Self> {
        self.write_all(NEXUS_HEADER)?.newline()?;
        Ok(self)
    }

    /// Writes the TAXA block with dimensions and taxon labels, returning itself for chaining.
    fn taxa_block(&mut self) -> io::Result<&mut Self> {
        // "Begin taxa;"
        self.write_all(BLOCK_BEGIN)?
            .space()?
            .write_all(TAXA)?
            .semicolon_ln()?;

        // "\tDimensions ntax=n;"
        let num_taxa = self.taxa.num_taxa().to_string();
        self.tab()?
            .write_all(DIMENSIONS)?
            .space()?
            .write_all(NTAX)?
            .equals()?
            .write_all(num_taxa.as_bytes())?
            .semicolon_ln()?;

        // "\tTaxlabels label ...;"
        self.tab()?.write_all(TAXLABELS)?;
        let labels: Vec<String> = self.taxa.labels().iter().map(|l| escape_label(l)).collect();
        for label in labels {
            self.space()?.write_all(label.as_bytes())?;
        }
        self.semicolon_ln()?;

        // "End;"
        self.write_all(BLOCK_END)?.newline()?;

        Ok(self)
    }

    /// Writes "Begin trees;" and the TRANSLATE command mapping 1-based
    /// indices to labels, returning itself for chaining.
    fn trees_block_start(&mut self) -> io::Result<&mut Self> {
        self.write_all(BLOCK_BEGIN)?
            .space()?
            .write_all(TREES)?
            .semicolon_ln()?;

        self.tab()?.write_all(TRANSLATE)?.newline()?;

        let labels: Vec<String> = self.taxa.labels().iter().map(|l| escape_label(l)).collect();
        let num_labels = labels.len();
        for (i, label) in labels.iter().enumerate() {
            self.tab()?
                .tab()?
                .write_all((i + 1).to_string().as_bytes())?
                .space()?
                .write_all(label.as_bytes())?;

            // No comma after last pair
            if i + 1 < num_labels {
                self.comma()?;
            }
            self.newline()?;
        }
        self.tab()?.semicolon_ln()?;

        Ok(self)
    }
}

// ============================================================================
// Little Helpers (private)
// ============================================================================
impl<W: Write> NexusWriter<W> {
    /// Appends a byte slice to the [BufWriter], returning itself for chaining.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<&mut Self> {
        self.bw.write_all(buf)?;
        Ok(self)
    }

    fn space(&mut self) -> io::Result<&mut Self> {
        self.write_all(b" ")
    }

    fn tab(&mut self) -> io::Result<&mut Self> {
        self.write_all(b"\t")
    }

    fn newline(&mut self) -> io::Result<&mut Self> {
        self.write_all(b"\n")
    }

    fn comma(&mut self) -> io::Result<&mut Self> {
        self.write_all(b",")
    }

    fn equals(&mut self) -> io::Result<&mut Self> {
        self.write_all(b"=")
    }

    /// Appends a semicolon followed by a newline (';\n'), returning itself for chaining.
    fn semicolon_ln(&mut self) -> io::Result<&mut Self> {
        self.write_all(b";\n")
    }
}
