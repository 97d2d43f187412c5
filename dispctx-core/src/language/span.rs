//! Language-agnostic source locations and ranges

use serde::{Deserialize, Serialize};

/// A resolved position in a source file
///
/// Both fields are 1-indexed; the column counts bytes from the start of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        SourceLocation { line, column }
    }
}

/// Line/column extent of a tree node
///
/// `end` points just past the last token of the node, so `end.line` is the line
/// holding that token. A range is only usable when both endpoints resolved;
/// nodes synthesized during error recovery carry no endpoints at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: Option<SourceLocation>,
    pub end: Option<SourceLocation>,
}

impl SourceRange {
    /// Create a fully resolved range
    pub fn new(start: SourceLocation, end: SourceLocation) -> Self {
        SourceRange {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Shorthand for tests and synthesized nodes that only care about lines
    pub fn lines(start_line: u32, end_line: u32) -> Self {
        SourceRange::new(
            SourceLocation::new(start_line, 1),
            SourceLocation::new(end_line, u32::MAX),
        )
    }

    /// A range whose endpoints could not be resolved
    pub fn invalid() -> Self {
        SourceRange {
            start: None,
            end: None,
        }
    }
}

/// Convert a tree-sitter node's extent into a `SourceRange`
///
/// tree-sitter rows and columns are 0-indexed and the end point is exclusive.
/// When a node's text ends with a newline its end point sits at column 0 of the
/// following row; that row holds no token of the node, so the end is pulled back
/// onto the previous line.
pub fn range_of_node(node: tree_sitter::Node) -> SourceRange {
    if node.is_missing() {
        return SourceRange::invalid();
    }

    let start = node.start_position();
    let end = node.end_position();

    let end_location = if end.column == 0 && end.row > start.row {
        SourceLocation::new(end.row as u32, u32::MAX)
    } else {
        SourceLocation::new(end.row as u32 + 1, end.column as u32 + 1)
    };

    SourceRange::new(location_of_node(node), end_location)
}

/// Start location of a tree-sitter node
pub fn location_of_node(node: tree_sitter::Node) -> SourceLocation {
    let start = node.start_position();
    SourceLocation::new(start.row as u32 + 1, start.column as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let range = SourceRange::new(SourceLocation::new(3, 5), SourceLocation::new(7, 2));
        assert_eq!(range.start, Some(SourceLocation::new(3, 5)));
        assert_eq!(range.end, Some(SourceLocation::new(7, 2)));
    }

    #[test]
    fn test_invalid_has_no_endpoints() {
        let range = SourceRange::invalid();
        assert_eq!(range.start, None);
        assert_eq!(range.end, None);
    }

    #[test]
    fn test_location_ordering() {
        assert!(SourceLocation::new(2, 1) > SourceLocation::new(1, 80));
        assert!(SourceLocation::new(2, 4) < SourceLocation::new(2, 5));
    }

    #[test]
    fn test_range_of_node_is_one_indexed() {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_cpp::LANGUAGE.into())
            .unwrap();
        let source = "int a;\nvoid f() {\n  a = 1;\n}\n";
        let tree = parser.parse(source, None).unwrap();
        let root = tree.root_node();
        let mut cursor = root.walk();
        let function = root
            .named_children(&mut cursor)
            .find(|n| n.kind() == "function_definition")
            .unwrap();

        let range = range_of_node(function);
        assert_eq!(range.start, Some(SourceLocation::new(2, 1)));
        assert_eq!(range.end, Some(SourceLocation::new(4, 2)));
    }
}
