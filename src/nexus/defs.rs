//! Keywords and delimiters of the NEXUS subset read and written here.
//!
//! Keyword matching is case-insensitive, so the spelling below is the one
//! used when writing (as in *BEAST logs).

/// Ends an unquoted label in TAXLABELS and TRANSLATE.
pub(crate) const NEXUS_LABEL_DELIMITERS: &[u8] = b" ,;\t\n\r";

/// Ends a tree name; `[` because *BEAST puts `[&lnP=...]` before the `=`.
pub(crate) const NEXUS_TREE_NAME_DELIMITERS: &[u8] = b" ,;\t\n\r=[";

pub(crate) const NEXUS_HEADER: &[u8] = b"#NEXUS";
pub(crate) const BLOCK_BEGIN: &[u8] = b"Begin";
pub(crate) const BLOCK_END: &[u8] = b"End;";

// > TAXA block
pub(crate) const TAXA: &[u8] = b"taxa";
pub(crate) const DIMENSIONS: &[u8] = b"Dimensions";
pub(crate) const NTAX: &[u8] = b"ntax";
pub(crate) const TAXLABELS: &[u8] = b"Taxlabels";

// > TREES block
pub(crate) const TREES: &[u8] = b"trees";
pub(crate) const TRANSLATE: &[u8] = b"Translate";
pub(crate) const TREE: &[u8] = b"tree";

/// Blocks the parser tells apart; everything else is skipped up to its
/// `End;`.
#[derive(Debug, PartialEq, Clone)]
pub(crate) enum NexusBlock {
    Taxa,
    Trees,
    Skipped(String),
}

impl NexusBlock {
    /// Block of a `Begin <name>;` header, by case-insensitive name.
    pub(crate) fn from_name(name: &str) -> Self {
        let name = name.trim();
        if name.eq_ignore_ascii_case("taxa") {
            NexusBlock::Taxa
        } else if name.eq_ignore_ascii_case("trees") {
            NexusBlock::Trees
        } else {
            NexusBlock::Skipped(name.to_string())
        }
    }
}
