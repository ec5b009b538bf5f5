//! Structs and logic to parse Newick strings.
//!
//! This module provides the [NewickParser] struct, which parses single trees
//! or all trees of a byte source into [Tree] values.

use crate::model::annotation::AnnotationValue;
use crate::model::tree::{Tree, VertexIndex};
use crate::model::vertex::BranchLength;
use crate::model::{LabelResolver, TaxonMap};
use crate::newick::defs::{ANNOTATION_START, NEWICK_LABEL_DELIMITERS};
use crate::parser::byte_parser::ByteParser;
use crate::parser::byte_source::ByteSource;
use crate::parser::parsing_error::ParsingError;

/// Key-value pairs of one `[&...]` block, waiting for their vertex index
type PendingAnnotations = Vec<(String, AnnotationValue)>;

// =#========================================================================#=
// NEWICK PARSER
// =#========================================================================$=
/// Parser (configuration) for Newick format binary phylogenetic trees.
///
/// Leaf labels are resolved through a [LabelResolver] into a [TaxonMap],
/// e.g. as necessary when parsing a NEXUS file with a `TRANSLATE` command.
///
/// # Configuration
/// * [`with_resolver(resolver)`](Self::with_resolver)
///     - replaces the default verbatim resolver
/// * [`with_annotations()`](Self::with_annotations)
///     - parses vertex annotations (e.g. `[&dmv={1.5,2},dmt=0.3]`)
///       instead of treating them as comments
///
/// # Parsing
/// * [`parse_str`](Self::parse_str) - parse a single tree
/// * [`parse_all`](Self::parse_all) - parse all trees until EOF
///
/// # Example
/// ```
/// use popsizes::newick::NewickParser;
/// use popsizes::parser::ByteParser;
///
/// let input = "((A:1.0,B:1.0)[&dmv=2.5]:0.5,C:1.5);";
/// let mut byte_parser = ByteParser::for_str(input);
/// let mut newick_parser = NewickParser::new().with_annotations();
///
/// let tree = newick_parser.parse_str(&mut byte_parser).unwrap();
/// assert_eq!(tree.num_leaves(), 3);
/// assert!(tree.annotations().contains_key("dmv"));
/// ```
#[derive(Debug)]
pub struct NewickParser {
    resolver: LabelResolver,
    parse_annotations: bool,
}

// ============================================================================
// Construction & Configuration, Deconstruction (pub)
// ============================================================================
impl NewickParser {
    /// Creates a new [NewickParser] with a verbatim label resolver and
    /// without annotation parsing.
    pub fn new() -> Self {
        Self {
            resolver: LabelResolver::new_verbatim_labels_resolver(TaxonMap::new()),
            parse_annotations: false,
        }
    }

    /// Replaces the resolver with a custom one.
    ///
    /// Used by [NexusParser](crate::nexus::NexusParser) to provide resolvers
    /// configured from TRANSLATE blocks.
    pub fn with_resolver(mut self, resolver: LabelResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub(crate) fn set_resolver(&mut self, resolver: LabelResolver) -> &mut Self {
        self.resolver = resolver;
        self
    }

    /// Configures the parser to parse vertex annotations.
    pub fn with_annotations(mut self) -> Self {
        self.parse_annotations = true;
        self
    }

    pub(crate) fn set_parse_annotations(&mut self, parse_annotations: bool) -> &mut Self {
        self.parse_annotations = parse_annotations;
        self
    }

    /// Returns the taxa of all trees parsed so far.
    pub fn taxa(&self) -> &TaxonMap {
        self.resolver.taxa()
    }

    /// Consumes the parser and returns the taxa of all parsed trees.
    pub fn into_taxa(self) -> TaxonMap {
        self.resolver.into_taxa()
    }
}

impl Default for NewickParser {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// API Parsing (pub)
// ============================================================================
impl NewickParser {
    /// Parses all Newick trees from the byte source until EOF.
    ///
    /// # Arguments
    /// * `byte_parser` - A byte parser with underlying source containing only
    ///   Newick strings, except for whitespace and `[...]` comments.
    ///
    /// # Errors
    /// [ParsingError] if any tree fails to parse.
    pub fn parse_all<B: ByteSource>(
        &mut self,
        mut byte_parser: ByteParser<B>,
    ) -> Result<Vec<Tree>, ParsingError> {
        let mut trees = Vec::new();
        loop {
            byte_parser.skip_comment_and_whitespace()?;
            if byte_parser.is_eof() {
                break;
            }
            trees.push(self.parse_str(&mut byte_parser)?);
        }
        Ok(trees)
    }

    /// Parses a single Newick tree from the given [ByteParser].
    ///
    /// # Arguments
    /// * `parser` - The byte parser positioned at the start of a Newick string
    ///
    /// # Errors
    /// [ParsingError] if the Newick format is invalid or a label cannot be
    /// resolved.
    pub fn parse_str<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
    ) -> Result<Tree, ParsingError> {
        self.parse_str_and_name(parser, None)
    }

    /// Parses a single Newick tree and gives it the provided name.
    pub(crate) fn parse_str_and_name<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
        tree_name: Option<String>,
    ) -> Result<Tree, ParsingError> {
        let mut tree = Tree::new();
        if let Some(name) = tree_name {
            tree.set_name(name);
        }

        self.parse_root(parser, &mut tree)?;
        Ok(tree)
    }
}

// ============================================================================
// Parsing
// ============================================================================
impl NewickParser {
    /// Parses the root of the tree and the terminating `;`:
    /// - `vertex;` where the vertex may be a single leaf
    /// - Skips leading comments and whitespace (including `[&R]`)
    fn parse_root<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
        tree: &mut Tree,
    ) -> Result<(), ParsingError> {
        let root_index = self.parse_vertex(parser, tree)?;

        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b';') {
            let next_char = parser.peek().map(char::from);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected ';' at end of tree but found {next_char:?}"),
            ));
        }

        tree.set_root(root_index);
        Ok(())
    }

    /// Parses a vertex (either internal vertex or leaf) and returns its index:
    /// - Skips leading comments and whitespace
    /// - Dispatches to `parse_internal_vertex` if starts with `(`, otherwise `parse_leaf`
    fn parse_vertex<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
        tree: &mut Tree,
    ) -> Result<VertexIndex, ParsingError> {
        parser.skip_comment_and_whitespace()?;
        if parser.peek_is(b'(') {
            self.parse_internal_vertex(parser, tree)
        } else {
            self.parse_leaf(parser, tree)
        }
    }

    /// Parses internal vertex, adds it to tree, and returns its index:
    /// - `(left, right)[label][annotations][:[annotations]branch_length]`
    /// - An internal label (e.g. a support value) is read and dropped
    fn parse_internal_vertex<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
        tree: &mut Tree,
    ) -> Result<VertexIndex, ParsingError> {
        let children = self.parse_children(parser, tree)?;

        parser.skip_whitespace();
        if parser
            .peek()
            .is_some_and(|b| !NEWICK_LABEL_DELIMITERS.contains(&b) || b == b'\'')
        {
            parser.parse_label(NEWICK_LABEL_DELIMITERS)?;
        }

        let (branch_length, annotations) = self.parse_vertex_suffix(parser)?;
        let index = tree.add_internal_vertex(children, branch_length);
        Self::add_annotations(tree, annotations, index);

        Ok(index)
    }

    /// Parses children pair `(left, right)` and returns their indices.
    /// Expects parser at opening `(`.
    fn parse_children<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
        tree: &mut Tree,
    ) -> Result<(VertexIndex, VertexIndex), ParsingError> {
        if !parser.consume_if(b'(') {
            let next_char = parser.peek().map(char::from);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected '(' before children but found {next_char:?}"),
            ));
        }
        let left_index = self.parse_vertex(parser, tree)?;

        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b',') {
            let next_char = parser.peek().map(char::from);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected ',' between children but found {next_char:?}"),
            ));
        }
        let right_index = self.parse_vertex(parser, tree)?;

        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b')') {
            let next_char = parser.peek().map(char::from);
            let msg = if next_char == Some(',') {
                "Only binary trees are supported, found a third child".to_string()
            } else {
                format!("Expected ')' after children but found {next_char:?}")
            };
            return Err(ParsingError::invalid_newick_string(parser, msg));
        }

        Ok((left_index, right_index))
    }

    /// Parses leaf vertex and adds it to tree:
    /// - `label[annotations][:[annotations]branch_length]`
    /// - Expects parser at start of label
    fn parse_leaf<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
        tree: &mut Tree,
    ) -> Result<VertexIndex, ParsingError> {
        let label = parser.parse_label(NEWICK_LABEL_DELIMITERS)?;
        if label.is_empty() {
            return Err(ParsingError::invalid_newick_string(
                parser,
                "Empty leaf label".to_string(),
            ));
        }
        let taxon = self
            .resolver
            .resolve_label(&label)
            .map_err(|e| ParsingError::unresolved_label(parser, e.to_string()))?;

        let (branch_length, annotations) = self.parse_vertex_suffix(parser)?;
        let leaf_index = tree.add_leaf(taxon, branch_length);
        Self::add_annotations(tree, annotations, leaf_index);

        Ok(leaf_index)
    }

    /// Parses what may follow a label or `)`: annotation blocks and an
    /// optional branch length, in the orders written by BEAST 1 and 2
    /// (`[&..]:1.0` and `:[&..]1.0`).
    fn parse_vertex_suffix<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
    ) -> Result<(Option<BranchLength>, PendingAnnotations), ParsingError> {
        let mut annotations = PendingAnnotations::new();
        self.parse_annotations(parser, &mut annotations)?;

        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b':') {
            return Ok((None, annotations));
        }
        self.parse_annotations(parser, &mut annotations)?;
        let branch_length = Self::parse_branch_length(parser)?;
        self.parse_annotations(parser, &mut annotations)?;

        Ok((Some(branch_length), annotations))
    }

    /// Parses a branch length value (the `:` already consumed).
    /// Supports scientific notation (e.g., `1.5e-10`).
    fn parse_branch_length<B: ByteSource>(
        parser: &mut ByteParser<B>,
    ) -> Result<BranchLength, ParsingError> {
        parser.skip_comment_and_whitespace()?;
        let Some(value) = parser.parse_number()? else {
            return Err(ParsingError::invalid_newick_string(
                parser,
                "Missing branch length after ':'".to_string(),
            ));
        };
        BranchLength::try_new(value).ok_or_else(|| {
            ParsingError::invalid_newick_string(parser, format!("Invalid branch length: {value}"))
        })
    }

    /// Parses any annotation blocks `[&key=value,...]` at the current
    /// position (after optional whitespace) into `pending`. Plain `[...]`
    /// comments are left for the caller to skip.
    ///
    /// Without annotation parsing enabled, annotation blocks are skipped
    /// like comments.
    fn parse_annotations<B: ByteSource>(
        &self,
        parser: &mut ByteParser<B>,
        pending: &mut PendingAnnotations,
    ) -> Result<(), ParsingError> {
        loop {
            parser.skip_whitespace();
            if !parser.peek_is_sequence(ANNOTATION_START) {
                return Ok(());
            }
            if !self.parse_annotations {
                parser.skip_comment()?;
                continue;
            }
            parser.consume_if_sequence(ANNOTATION_START);
            Self::parse_annotation_block(parser, pending)?;
        }
    }

    /// Parses the content of one annotation block after `[&`, up to and
    /// including `]`. Keys without value (e.g. `[&R]`) are ignored.
    fn parse_annotation_block<B: ByteSource>(
        parser: &mut ByteParser<B>,
        pending: &mut PendingAnnotations,
    ) -> Result<(), ParsingError> {
        loop {
            parser.skip_whitespace();
            let key = parser.parse_unquoted_label(b"=,]")?.trim().to_string();
            if key.is_empty() {
                return Err(ParsingError::invalid_annotation(
                    parser,
                    "Empty annotation key".to_string(),
                ));
            }

            if parser.consume_if(b'=') {
                let raw = Self::parse_annotation_value(parser)?;
                if raw.trim().is_empty() {
                    return Err(ParsingError::invalid_annotation(
                        parser,
                        format!("Empty annotation value for key '{key}'"),
                    ));
                }
                pending.push((key, AnnotationValue::parse(&raw)));
            }

            match parser.next_byte() {
                Some(b',') => continue,
                Some(b']') => return Ok(()),
                Some(b) => {
                    return Err(ParsingError::invalid_annotation(
                        parser,
                        format!("Unexpected '{}' in annotation block", char::from(b)),
                    ));
                }
                None => return Err(ParsingError::unclosed_comment(parser)),
            }
        }
    }

    /// Reads a raw annotation value up to a `,` or `]` outside of braces
    /// and double quotes.
    fn parse_annotation_value<B: ByteSource>(
        parser: &mut ByteParser<B>,
    ) -> Result<String, ParsingError> {
        let mut raw = Vec::new();
        let mut brace_depth = 0usize;
        let mut in_quotes = false;
        loop {
            let Some(b) = parser.peek() else {
                return Err(ParsingError::unclosed_comment(parser));
            };
            match b {
                b'"' => in_quotes = !in_quotes,
                b'{' if !in_quotes => brace_depth += 1,
                b'}' if !in_quotes => {
                    if brace_depth == 0 {
                        return Err(ParsingError::invalid_annotation(
                            parser,
                            "Unbalanced '}'".to_string(),
                        ));
                    }
                    brace_depth -= 1;
                }
                b',' | b']' if !in_quotes && brace_depth == 0 => break,
                _ => {}
            }
            raw.push(b);
            parser.next_byte();
        }
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// Adds the collected annotations of a vertex to the tree.
    fn add_annotations(tree: &mut Tree, annotations: PendingAnnotations, index: VertexIndex) {
        for (key, value) in annotations {
            tree.annotations_mut().add(key, index, value);
        }
    }
}
