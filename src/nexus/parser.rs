//! Structs and logic to stream trees from NEXUS files.
//!
//! This module provides the [NexusParserBuilder] and [NexusParser] structs.
//! Trees are parsed lazily one at a time, so arbitrarily long posterior
//! samples can be processed in constant memory.

use crate::model::{LabelResolver, TaxonMap, Tree};
use crate::newick::NewickParser;
use crate::nexus::defs::*;
use crate::parser::buffered_byte_source::BufferedByteSource;
use crate::parser::byte_parser::{ByteParser, ConsumeMode::*};
use crate::parser::byte_source::ByteSource;
use crate::parser::in_memory_byte_source::InMemoryByteSource;
use crate::parser::parsing_error::ParsingError;
use std::path::{Path, PathBuf};

// =#========================================================================#=
// BURNIN
// =#========================================================================#=
/// Specifies how many initial trees to skip as burnin.
///
/// Burnin is commonly used in MCMC sampling to discard initial trees
/// before the chain has converged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Burnin {
    /// Skip a fixed number of trees.
    Count(usize),

    /// Skip a fraction of total trees, rounded down.
    ///
    /// The fraction must be in the range [0.0, 1.0];
    /// e.g. `Burnin::Percentage(0.1)` skips the first 10% of trees.
    Percentage(f64),
}

impl Burnin {
    /// Calculates the absolute number of trees to skip given the total tree count.
    pub(crate) fn get_count(&self, num_total_trees: usize) -> usize {
        match self {
            Burnin::Count(n) => *n,
            Burnin::Percentage(p) => (num_total_trees as f64 * p).floor() as usize,
        }
    }
}

// =#========================================================================#=
// BYTE SOURCE SETTING
// =#========================================================================#=
/// Controls how the file is read during parsing.
///
/// By default, the [NexusParserBuilder] uses [ReadStrategy::Automatic],
/// which picks a strategy based on file size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadStrategy {
    /// Read the file in chunks through a buffered I/O reader.
    Buffered,

    /// Load the entire file into a contiguous byte buffer before parsing.
    InMemory,

    /// Automatically choose between [ReadStrategy::Buffered] and
    /// [ReadStrategy::InMemory] based on file size.
    /// This is the default.
    Automatic,
}

// =#========================================================================#=
// NEXUS PARSER BUILDER
// =#========================================================================$=
/// Builder for configuring and creating a [NexusParser].
///
/// # Configuration Options
/// * **Skip first**: [`with_skip_first()`](Self::with_skip_first) skips the
///   very first tree (often the start tree of an MCMC run)
/// * **Burnin**: [`with_burnin()`](Self::with_burnin) skips a fixed count or
///   percentage of the (remaining) trees
/// * **Thinning**: [`with_every(k)`](Self::with_every) keeps only every k-th
///   tree after burnin, starting with the first one
/// * **Annotations**: [`with_annotations()`](Self::with_annotations) parses
///   `[&key=value,...]` blocks instead of treating them as comments
/// * **Read strategy**: [`with_buffered_source()`](Self::with_buffered_source)
///   or [`with_in_memory_source()`](Self::with_in_memory_source)
///
/// # Example
/// ```no_run
/// use popsizes::nexus::{Burnin, NexusParserBuilder};
///
/// let mut parser = NexusParserBuilder::for_file("species.trees")?
///     .with_burnin(Burnin::Percentage(0.1))
///     .with_every(10)
///     .with_annotations()
///     .build()?;
///
/// while let Some(tree) = parser.next_tree()? {
///     println!("{} leaves", tree.num_leaves());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct NexusParserBuilder {
    path: PathBuf,
    read_strategy: ReadStrategy,
    burnin: Burnin,
    every: usize,
    skip_first: bool,
    parse_annotations: bool,
}

impl NexusParserBuilder {
    /// Creates a new builder for the given file, with default settings:
    /// - First tree not skipped
    /// - No burnin, no thinning
    /// - Annotations treated as comments
    ///
    /// # Errors
    /// Returns an I/O error if the file does not exist.
    pub fn for_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        std::fs::metadata(path.as_ref())?;
        Ok(NexusParserBuilder {
            path: path.as_ref().to_path_buf(),
            read_strategy: ReadStrategy::Automatic,
            burnin: Burnin::Count(0),
            every: 1,
            skip_first: false,
            parse_annotations: false,
        })
    }

    /// Configure burnin, i.e., discard/skip initial trees.
    ///
    /// If both burnin and [with_skip_first()](Self::with_skip_first) are
    /// configured, the first tree is skipped, then burnin is applied to
    /// the remaining trees.
    pub fn with_burnin(mut self, burnin: Burnin) -> Self {
        self.burnin = burnin;
        self
    }

    /// Configure thinning: after burnin, keep one tree out of every `every`,
    /// starting with the first. Trees in between are skipped without being
    /// parsed. A value of 0 is treated as 1.
    pub fn with_every(mut self, every: usize) -> Self {
        self.every = every.max(1);
        self
    }

    /// Configure the parser to skip the first tree.
    pub fn with_skip_first(mut self) -> Self {
        self.skip_first = true;
        self
    }

    /// Configure the parser to parse vertex annotations
    /// (e.g. `[&dmv={1,2},dmt=0.4]`) instead of treating them as comments.
    pub fn with_annotations(mut self) -> Self {
        self.parse_annotations = true;
        self
    }

    /// Configure the parser to read the file using a buffered reader.
    pub fn with_buffered_source(mut self) -> Self {
        self.read_strategy = ReadStrategy::Buffered;
        self
    }

    /// Configure the parser to read the entire file into memory upfront.
    pub fn with_in_memory_source(mut self) -> Self {
        self.read_strategy = ReadStrategy::InMemory;
        self
    }

    /// Builds and initializes the [NexusParser] with the configured settings.
    ///
    /// This method:
    /// 1. Parses the NEXUS header and the TAXA block (if present)
    /// 2. Parses the TRANSLATE command (if present) in the TREES block
    /// 3. Counts total trees without parsing them and applies skip-first,
    ///    burnin and thinning
    /// 4. Positions the parser at the first tree to return
    ///
    /// # Errors
    /// Returns a [ParsingError] if:
    /// - The file is not a valid NEXUS file
    /// - The TREES block is missing
    /// - The NEXUS format is malformed
    pub fn build(self) -> Result<NexusParser, ParsingError> {
        /// File size threshold (in bytes) for automatic read strategy.
        /// Files smaller than this are read into memory; larger files use buffered I/O.
        const AUTO_IN_MEMORY_THRESHOLD: u64 = 100 * 1024 * 1024; // 100 MB

        let use_buffered = match self.read_strategy {
            ReadStrategy::Buffered => true,
            ReadStrategy::InMemory => false,
            ReadStrategy::Automatic => {
                let file_size = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
                file_size >= AUTO_IN_MEMORY_THRESHOLD
            }
        };

        if use_buffered {
            let byte_parser = ByteParser::from_file_buffered(&self.path)?;
            Ok(NexusParser::Buffered(NexusParserInner::init(byte_parser, &self)?))
        } else {
            let byte_parser = ByteParser::from_file_in_memory(&self.path)?;
            Ok(NexusParser::InMemory(NexusParserInner::init(byte_parser, &self)?))
        }
    }
}

// =#========================================================================#=
// NEXUS PARSER
// =#========================================================================$=
/// Lazy parser for NEXUS phylogenetic tree files (BEAST, *BEAST, MrBayes, ...).
///
/// Created via [NexusParserBuilder]. Use [`next_tree()`](Self::next_tree)
/// to retrieve the kept trees one by one, and [`taxa()`](Self::taxa) for the
/// taxa their leaves refer to.
#[allow(private_interfaces)]
pub enum NexusParser {
    /// NexusParser with buffered file read
    Buffered(NexusParserInner<BufferedByteSource>),
    /// NexusParser with in-memory file read
    InMemory(NexusParserInner<InMemoryByteSource>),
}

/// Helper macro to delegate a method call to the inner parser variant.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            NexusParser::Buffered(inner) => inner.$method($($arg),*),
            NexusParser::InMemory(inner) => inner.$method($($arg),*),
        }
    };
}

impl NexusParser {
    /// Reset to the first kept tree (respecting skip-first and burnin).
    pub fn reset(&mut self) {
        delegate!(self, reset)
    }

    /// Parses and returns the next kept tree, `Ok(None)` once all kept trees
    /// have been returned.
    pub fn next_tree(&mut self) -> Result<Option<Tree>, ParsingError> {
        delegate!(self, next_tree)
    }

    /// Get the taxa of the file (TAXA block, TRANSLATE, or labels seen).
    pub fn taxa(&self) -> &TaxonMap {
        delegate!(self, taxa)
    }

    /// Get the number of trees [`next_tree()`](Self::next_tree) yields in total.
    pub fn num_trees(&self) -> usize {
        delegate!(self, num_trees)
    }

    /// Get the total number of trees including skipped, burnin and thinned ones.
    pub fn num_total_trees(&self) -> usize {
        delegate!(self, num_total_trees)
    }

    /// Get the number of trees skipped as first tree or burnin.
    pub fn num_burnin_trees(&self) -> usize {
        delegate!(self, num_burnin_trees)
    }

    /// Consumes this [NexusParser] and returns its taxa.
    pub fn into_taxa(self) -> TaxonMap {
        delegate!(self, into_taxa)
    }
}

// =#========================================================================#=
// NEXUS PARSER INNER
// =#========================================================================$=
/// Inner of [NexusParser] for type erasure pattern of generic byte source.
struct NexusParserInner<B: ByteSource> {
    /// Continuously used to parse Newick strings, including resolving labels
    newick_parser: NewickParser,
    /// Accessor to the underlying bytes/file being parsed
    byte_parser: ByteParser<B>,

    /// Keep one tree out of `every`
    every: usize,

    /// The total number of `TREE` commands in the Nexus file
    num_total_trees: usize,
    /// The number of trees returned by a full pass of `next_tree()`
    num_trees: usize,
    /// The first `TREE` command to consider (0-indexed)
    start_tree_pos: usize,
    /// Byte position of the `TREE` command at `start_tree_pos`
    start_byte_pos: usize,
    /// Index of the `TREE` command the byte parser is positioned at
    tree_pos: usize,
    /// Number of trees returned since start/reset
    num_returned: usize,
}

// ============================================================================
// Initialization & State (private)
// ============================================================================
impl<B: ByteSource> NexusParserInner<B> {
    /// Creates the inner parser and makes it ready to retrieve trees.
    ///
    /// Parses the header, the TAXA block and TRANSLATE command, counts the
    /// trees, applies skip-first and burnin and moves to the first tree to
    /// be returned.
    fn init(byte_parser: ByteParser<B>, config: &NexusParserBuilder) -> Result<Self, ParsingError> {
        let mut newick_parser = NewickParser::new();
        newick_parser.set_parse_annotations(config.parse_annotations);

        let mut inner = NexusParserInner {
            newick_parser,
            byte_parser,
            every: config.every.max(1),
            num_total_trees: 0,
            num_trees: 0,
            start_tree_pos: 0,
            start_byte_pos: 0,
            tree_pos: 0,
            num_returned: 0,
        };

        // > Header
        inner.parse_nexus_header()?;

        // > TAXA block (optional) up to the TREES block
        let taxa = inner.skip_until_trees_block()?;

        // > TREES block: TRANSLATE command and matching label resolver
        let translation = inner.parse_tree_block_translate()?;
        let resolver = inner.choose_resolver(taxa, translation)?;
        inner.newick_parser.set_resolver(resolver);

        // > Count trees, then skip past the ones we don't want
        inner.byte_parser.skip_comment_and_whitespace()?;
        let num_total_trees = inner.count_trees()?;
        inner.configure_tree_counts(num_total_trees, config.skip_first, config.burnin);

        for _ in 0..inner.start_tree_pos {
            inner.skip_tree()?;
        }
        inner.start_byte_pos = inner.byte_parser.position();
        inner.tree_pos = inner.start_tree_pos;

        Ok(inner)
    }

    /// Sets `num_total_trees`, `num_trees` and `start_tree_pos` based on
    /// the skip-first, burnin and thinning configuration.
    fn configure_tree_counts(&mut self, num_total_trees: usize, skip_first: bool, burnin: Burnin) {
        self.num_total_trees = num_total_trees;

        let mut skip_count = usize::from(skip_first && num_total_trees > 0);
        skip_count += burnin.get_count(num_total_trees - skip_count);
        skip_count = skip_count.min(num_total_trees);

        let remaining = num_total_trees - skip_count;
        self.num_trees = remaining.div_ceil(self.every);
        self.start_tree_pos = skip_count;
    }

    /// Picks and configures the right [LabelResolver] at initialization.
    ///
    /// Without TRANSLATE, labels are taken verbatim. With TRANSLATE, every
    /// translated label must be a taxon of the TAXA block (if there is one).
    fn choose_resolver(
        &mut self,
        taxa: Option<TaxonMap>,
        translation: Option<Vec<(String, String)>>,
    ) -> Result<LabelResolver, ParsingError> {
        let Some(translation) = translation else {
            return Ok(LabelResolver::new_verbatim_labels_resolver(
                taxa.unwrap_or_default(),
            ));
        };

        if let Some(taxa) = &taxa {
            if let Some((_, label)) = translation.iter().find(|(_, l)| !taxa.contains_label(l)) {
                return Err(ParsingError::invalid_translate_command(
                    &mut self.byte_parser,
                    format!("Label '{label}' is not listed in TAXA block"),
                ));
            }
        }

        let taxa = taxa.unwrap_or_default();
        let all_keys_are_integers = translation
            .iter()
            .all(|(key, _)| key.parse::<usize>().is_ok());

        if all_keys_are_integers {
            LabelResolver::new_nexus_integer_labels_resolver(&translation, taxa).map_err(|e| {
                ParsingError::invalid_translate_command(&mut self.byte_parser, e.to_string())
            })
        } else {
            Ok(LabelResolver::new_nexus_labels_resolver(&translation, taxa))
        }
    }

    /// Reset to first kept tree
    fn reset(&mut self) {
        self.byte_parser.set_position(self.start_byte_pos);
        self.tree_pos = self.start_tree_pos;
        self.num_returned = 0;
    }
}

// ============================================================================
// Getters / Accessors, Tree Retrieval
// ============================================================================
impl<B: ByteSource> NexusParserInner<B> {
    fn taxa(&self) -> &TaxonMap {
        self.newick_parser.taxa()
    }

    fn into_taxa(self) -> TaxonMap {
        self.newick_parser.into_taxa()
    }

    fn num_trees(&self) -> usize {
        self.num_trees
    }

    fn num_total_trees(&self) -> usize {
        self.num_total_trees
    }

    fn num_burnin_trees(&self) -> usize {
        self.start_tree_pos
    }

    /// Skips the trees thinned out since the last returned one, then parses
    /// and returns the next kept tree.
    fn next_tree(&mut self) -> Result<Option<Tree>, ParsingError> {
        if self.num_returned >= self.num_trees {
            return Ok(None);
        }

        let target_pos = self.start_tree_pos + self.num_returned * self.every;
        while self.tree_pos < target_pos {
            if !self.skip_tree()? {
                return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
            }
            self.tree_pos += 1;
        }

        let Some(tree) = self.parse_single_tree()? else {
            return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
        };
        self.tree_pos += 1;
        self.num_returned += 1;
        Ok(Some(tree))
    }
}

// ============================================================================
// Parsing helpers (private)
// ============================================================================
impl<B: ByteSource> NexusParserInner<B> {
    /// Parses header `#NEXUS` at start of file;
    /// returns [`ParsingError::missing_nexus_header`] if header missing.
    fn parse_nexus_header(&mut self) -> Result<(), ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;

        if !self.byte_parser.consume_if_sequence(NEXUS_HEADER) {
            return Err(ParsingError::missing_nexus_header(&mut self.byte_parser));
        }

        Ok(())
    }

    /// Skips NEXUS blocks until the TREES block, whose header is consumed.
    /// A TAXA block on the way is parsed and returned.
    ///
    /// # Errors
    /// [ParsingError] if EOF is reached first or a block is malformed.
    fn skip_until_trees_block(&mut self) -> Result<Option<TaxonMap>, ParsingError> {
        let mut taxa = None;
        loop {
            self.byte_parser.skip_comment_and_whitespace()?;
            if self.byte_parser.is_eof() {
                return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
            }

            match self.detect_next_block()? {
                NexusBlock::Trees => return Ok(taxa),
                NexusBlock::Taxa => taxa = Some(self.parse_taxa_block()?),
                NexusBlock::Skipped(_) => self.skip_to_block_end()?,
            }
        }
    }

    /// Detects the next Nexus block, which must start with header
    /// `BEGIN <BlockType>;` (case-insensitive), consumes its header,
    /// and returns its type.
    fn detect_next_block(&mut self) -> Result<NexusBlock, ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;

        if !self.byte_parser.consume_if_sequence(BLOCK_BEGIN) {
            return Err(ParsingError::invalid_formatting(&mut self.byte_parser));
        }
        self.byte_parser.skip_comment_and_whitespace()?;

        let block_name = self.byte_parser.parse_unquoted_label(b";")?;
        if !self.byte_parser.consume_if(b';') {
            return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
        }

        Ok(NexusBlock::from_name(&block_name))
    }

    /// Skips block, e.g. continuing until encountering and consuming `END;`.
    fn skip_to_block_end(&mut self) -> Result<(), ParsingError> {
        if !self
            .byte_parser
            .consume_until_sequence(BLOCK_END, Inclusive)
        {
            return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
        }

        Ok(())
    }

    /// Parses TAXA block extracting number of taxa from the `ntax` command
    /// and the taxon list from the `TAXLABELS` command.
    ///
    /// # Assumptions
    /// * First command must be `DIMENSIONS NTAX=<value>;` (case-insensitive)
    /// * Followed by `TAXLABELS label1 label2 ...;` where comments are allowed
    fn parse_taxa_block(&mut self) -> Result<TaxonMap, ParsingError> {
        let ntax = self.parse_taxa_block_ntax()?;
        let taxa = self.parse_taxa_block_labels(ntax)?;
        self.skip_to_block_end()?;
        Ok(taxa)
    }

    /// Parses `DIMENSIONS NTAX=n;` and returns n.
    fn parse_taxa_block_ntax(&mut self) -> Result<usize, ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;
        if !self.byte_parser.consume_if_sequence(DIMENSIONS) {
            return Err(ParsingError::invalid_taxa_block(
                &mut self.byte_parser,
                String::from("Expected 'DIMENSIONS' in TAXA block."),
            ));
        }

        self.byte_parser.skip_whitespace();
        if !self.byte_parser.consume_if_sequence(NTAX) {
            return Err(ParsingError::invalid_taxa_block(
                &mut self.byte_parser,
                String::from("Expected 'NTAX' in TAXA block."),
            ));
        }

        self.byte_parser.skip_whitespace();
        if !self.byte_parser.consume_if(b'=') {
            return Err(ParsingError::invalid_taxa_block(
                &mut self.byte_parser,
                String::from("Expected '=' in TAXA block."),
            ));
        }

        self.byte_parser.skip_whitespace();
        let ntax_str = self.byte_parser.parse_unquoted_label(b";")?;
        let ntax: usize = ntax_str.trim().parse().map_err(|_| {
            ParsingError::invalid_taxa_block(
                &mut self.byte_parser,
                format!("Cannot parse `ntax` value: {ntax_str}"),
            )
        })?;
        self.byte_parser.next_byte(); // consume the semicolon

        Ok(ntax)
    }

    /// Parses the `TAXLABELS` command into a [TaxonMap] and checks that it
    /// lists `ntax` labels.
    fn parse_taxa_block_labels(&mut self, ntax: usize) -> Result<TaxonMap, ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;
        if !self.byte_parser.consume_if_sequence(TAXLABELS) {
            return Err(ParsingError::invalid_taxa_block(
                &mut self.byte_parser,
                String::from("Expected 'TAXLABELS' in TAXA block."),
            ));
        }

        let mut taxa = TaxonMap::with_capacity(ntax);
        loop {
            self.byte_parser.skip_comment_and_whitespace()?;
            if self.byte_parser.is_eof() {
                return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
            }

            if self.byte_parser.consume_if(b';') {
                break;
            }

            let label = self.byte_parser.parse_label(NEXUS_LABEL_DELIMITERS)?;
            if !label.is_empty() {
                taxa.get_or_insert(&label);
            } else {
                // stray delimiter such as ','
                self.byte_parser.next_byte();
            }
        }

        if taxa.num_taxa() != ntax {
            return Err(ParsingError::invalid_taxa_block(
                &mut self.byte_parser,
                format!(
                    "Number of parsed labels ({}) did not match ntax value ({ntax}).",
                    taxa.num_taxa()
                ),
            ));
        }

        Ok(taxa)
    }

    /// Parses the `TRANSLATE` command of the TREES block if present.
    /// Returns the `(key, label)` pairs in file order.
    ///
    /// After this method, the parser is positioned after the semicolon of the
    /// command (or unchanged if there is none).
    fn parse_tree_block_translate(&mut self) -> Result<Option<Vec<(String, String)>>, ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;
        if !self.byte_parser.consume_if_sequence(TRANSLATE) {
            return if self.byte_parser.peek_is_sequence(TREE)
                || self.byte_parser.peek_is_sequence(BLOCK_END)
            {
                Ok(None)
            } else {
                Err(ParsingError::invalid_trees_block(
                    &mut self.byte_parser,
                    String::from("Expected 'TRANSLATE' or first 'TREE' in TREES block."),
                ))
            };
        }

        let mut translation = Vec::new();
        loop {
            self.byte_parser.skip_comment_and_whitespace()?;
            // tolerate a trailing comma before the closing semicolon
            if self.byte_parser.consume_if(b';') {
                break;
            }

            let key = self.byte_parser.parse_label(NEXUS_LABEL_DELIMITERS)?;
            let label = self.byte_parser.parse_label(NEXUS_LABEL_DELIMITERS)?;
            if key.is_empty() || label.is_empty() {
                return Err(ParsingError::invalid_translate_command(
                    &mut self.byte_parser,
                    String::from("Expected 'key label' pair."),
                ));
            }
            translation.push((key, label));

            self.byte_parser.skip_comment_and_whitespace()?;
            if self.byte_parser.consume_if(b',') {
                continue;
            }
            if self.byte_parser.consume_if(b';') {
                break;
            }
            let found = self.byte_parser.peek().map(char::from);
            return Err(ParsingError::invalid_translate_command(
                &mut self.byte_parser,
                format!("Unexpected {found:?} in TRANSLATE."),
            ));
        }

        Ok(Some(translation))
    }

    /// Parses the `TREE <name> [comments] =` prefix of a tree command.
    ///
    /// # Returns
    /// * `Ok(Some(name))` - Prefix consumed
    /// * `Ok(None)` - No more trees (encountered `END;`)
    fn parse_tree_command_prefix(&mut self) -> Result<Option<String>, ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;

        if self.byte_parser.peek_is_sequence(BLOCK_END) || self.byte_parser.is_eof() {
            return Ok(None);
        }

        if !self.byte_parser.consume_if_sequence(TREE) {
            return Err(ParsingError::invalid_trees_block(
                &mut self.byte_parser,
                String::from("Expected 'TREE' in tree command."),
            ));
        }

        // "tree* name" marks a default tree in some programs
        self.byte_parser.consume_if(b'*');
        let name = self.byte_parser.parse_label(NEXUS_TREE_NAME_DELIMITERS)?;

        // Tree comments such as "[&lnP=-3.2]" may precede the '='
        self.byte_parser.skip_comment_and_whitespace()?;
        if !self.byte_parser.consume_if(b'=') {
            return Err(ParsingError::invalid_trees_block(
                &mut self.byte_parser,
                String::from("Expected '=' after tree name in tree command."),
            ));
        }

        // Skip optional "[&R/U]" annotation
        self.byte_parser.skip_comment_and_whitespace()?;
        Ok(Some(name))
    }

    /// Parses a single TREE entry.
    ///
    /// # Returns
    /// * `Ok(Some(Tree))` - Successfully parsed a tree
    /// * `Ok(None)` - No more trees (encountered END;)
    fn parse_single_tree(&mut self) -> Result<Option<Tree>, ParsingError> {
        let Some(name) = self.parse_tree_command_prefix()? else {
            return Ok(None);
        };
        let tree = self
            .newick_parser
            .parse_str_and_name(&mut self.byte_parser, Some(name))?;
        Ok(Some(tree))
    }

    /// Skips over a single TREE entry without parsing the Newick string.
    ///
    /// # Returns
    /// * `Ok(true)` - Successfully skipped a tree
    /// * `Ok(false)` - No more trees (encountered END;)
    fn skip_tree(&mut self) -> Result<bool, ParsingError> {
        if self.parse_tree_command_prefix()?.is_none() {
            return Ok(false);
        }

        // Skip the Newick string (everything until and including semicolon)
        if !self.byte_parser.consume_until(b';', Inclusive) {
            return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
        }

        Ok(true)
    }

    /// Counts the number of trees in the TREES block without parsing them,
    /// restoring the parser position afterwards.
    fn count_trees(&mut self) -> Result<usize, ParsingError> {
        let saved_pos = self.byte_parser.position();

        let mut count = 0;
        while self.skip_tree()? {
            count += 1;
        }

        self.byte_parser.set_position(saved_pos);

        Ok(count)
    }
}
