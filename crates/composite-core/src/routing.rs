//! Routing helpers for prefix-qualified names.
//!
//! The gateway exposes every backend tool and prompt as `{prefix}_{name}`.
//! These helpers centralise the qualification logic so listing and dispatch
//! agree on what a qualified name means.

/// Separator placed between a backend prefix and a backend-local name
pub const PREFIX_SEPARATOR: char = '_';

/// Build the qualified name `{prefix}_{name}`.
///
/// ```
/// # use composite_core::routing::qualified_name;
/// assert_eq!(qualified_name("doc", "read"), "doc_read");
/// ```
pub fn qualified_name(prefix: &str, name: &str) -> String {
    format!("{}{}{}", prefix, PREFIX_SEPARATOR, name)
}

/// Strip `"{prefix}_"` from a qualified name.
///
/// Returns `None` when the name does not literally start with `"{prefix}_"`.
/// A bare `"{prefix}_"` still belongs to that prefix and yields an empty
/// local name; the owning backend decides what that means.
///
/// ```
/// # use composite_core::routing::strip_qualified_prefix;
/// assert_eq!(strip_qualified_prefix("doc_read", "doc"), Some("read"));
/// assert_eq!(strip_qualified_prefix("doc_search_all", "doc"), Some("search_all"));
/// assert_eq!(strip_qualified_prefix("docs_read", "doc"), None);
/// assert_eq!(strip_qualified_prefix("doc_", "doc"), Some(""));
/// ```
pub fn strip_qualified_prefix<'a>(qualified: &'a str, prefix: &str) -> Option<&'a str> {
    qualified
        .strip_prefix(prefix)?
        .strip_prefix(PREFIX_SEPARATOR)
}

/// Whether two prefixes could both claim the same qualified name.
///
/// That happens when one qualified prefix (`"{prefix}_"`) is a literal
/// leading match of the other.
///
/// ```
/// # use composite_core::routing::prefixes_overlap;
/// assert!(prefixes_overlap("doc", "doc_v2"));
/// assert!(prefixes_overlap("doc", "doc"));
/// assert!(!prefixes_overlap("doc", "docs"));
/// assert!(!prefixes_overlap("calc", "doc"));
/// ```
pub fn prefixes_overlap(a: &str, b: &str) -> bool {
    let qa = format!("{}{}", a, PREFIX_SEPARATOR);
    let qb = format!("{}{}", b, PREFIX_SEPARATOR);
    qa.starts_with(&qb) || qb.starts_with(&qa)
}
