//! Language-agnostic parser trait

use crate::tree::SyntaxTree;
use anyhow::Result;

/// Front-end interface
///
/// Each supported language implements this trait to lower source code into
/// the declaration/statement tree the resolver walks.
pub trait LanguageParser {
    /// Parse source code into a syntax tree
    ///
    /// # Arguments
    ///
    /// * `source` - The source code to parse
    /// * `filename` - The name of the file being parsed (for error messages)
    ///
    /// Recoverable syntax errors do not fail the parse; they are reported
    /// through [`SyntaxTree::has_errors`].
    fn parse(&self, source: &str, filename: &str) -> Result<SyntaxTree>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::span::{SourceLocation, SourceRange};
    use crate::tree::DeclKind;

    // One callable per non-empty line
    struct LineParser;

    impl LanguageParser for LineParser {
        fn parse(&self, source: &str, _filename: &str) -> Result<SyntaxTree> {
            let line_count = source.lines().count() as u32;
            let mut tree = SyntaxTree::new(SourceRange::lines(1, line_count.max(1)));
            for (index, line) in source.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let line_no = index as u32 + 1;
                tree.add_decl(
                    tree.root(),
                    DeclKind::callable(),
                    line.trim(),
                    SourceRange::lines(line_no, line_no),
                    SourceLocation::new(line_no, 1),
                )?;
            }
            Ok(tree)
        }
    }

    #[test]
    fn test_parser_trait() {
        let parser = LineParser;
        let tree = parser.parse("a\n\nb\n", "test.cpp").unwrap();
        let root = tree.decl(tree.root());
        assert_eq!(root.children().len(), 2);
        assert_eq!(tree.decl(root.children()[1]).signature, "b");
    }

    #[test]
    fn test_parser_trait_object() {
        let parser: Box<dyn LanguageParser> = Box::new(LineParser);
        let tree = parser.parse("", "empty.cpp").unwrap();
        assert!(tree.decl(tree.root()).children().is_empty());
        assert!(!tree.has_errors());
    }
}
