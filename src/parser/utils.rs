//! Label quoting for writing Newick and NEXUS output.

/// Bytes that cannot appear in an unquoted Newick/NEXUS label.
const SPECIAL_CHARS: &[char] = &[
    ' ', ',', ';', '\t', '\n', '\r', '(', ')', ':', '[', ']', '\'', '=', '{', '}',
];

/// Quotes a label if needed so that it reads back unchanged.
///
/// Labels without special characters are returned as they are. Otherwise the
/// label is wrapped in single quotes and internal quotes are doubled.
///
/// # Examples
/// ```
/// # use popsizes::parser::utils::escape_label;
/// assert_eq!(escape_label("Pan_troglodytes"), "Pan_troglodytes");
/// assert_eq!(escape_label("Pan troglodytes"), "'Pan troglodytes'");
/// assert_eq!(escape_label("Heled's"), "'Heled''s'");
/// ```
pub fn escape_label(label: &str) -> String {
    if label.is_empty() || label.contains(SPECIAL_CHARS) {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}
