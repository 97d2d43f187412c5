//! Display orchestration - ties together parsing, resolution and issue strings

use crate::issue::{finalize, ContentIssueGenerator, IssueStringGenerator};
use crate::language::Language;
use crate::range::{ColumnMode, Position};
use crate::report::IssueReport;
use crate::resolve::Resolver;
use crate::tree::SyntaxTree;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::Path;
use tracing::debug;

/// Knobs for one display run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayOptions {
    pub column_mode: ColumnMode,
    /// Drop the issue when the resolved location is not on the requested line
    pub require_exact_line: bool,
    /// Fail instead of resolving against a tree recovered from syntax errors
    pub reject_syntax_errors: bool,
}

/// Resolve every position in a file on disk
///
/// `language` overrides extension-based detection.
pub fn display_file(
    path: &Path,
    language: Option<Language>,
    positions: &[Position],
    options: &DisplayOptions,
) -> Result<Vec<IssueReport>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let language = language
        .or_else(|| Language::from_path(path))
        .ok_or_else(|| anyhow::anyhow!("Unsupported file type: {}", path.display()))?;

    display_source(&source, &path.to_string_lossy(), language, positions, options)
}

/// Resolve every position in an in-memory source
pub fn display_source(
    source: &str,
    filename: &str,
    language: Language,
    positions: &[Position],
    options: &DisplayOptions,
) -> Result<Vec<IssueReport>> {
    let parser = language
        .parser()
        .with_context(|| format!("Failed to create {} parser", language))?;
    let tree = parser.parse(source, filename)?;
    if options.reject_syntax_errors && tree.has_errors() {
        anyhow::bail!("Syntax errors in {}; no issue strings produced", filename);
    }
    display_tree(&tree, source, positions, options)
}

/// Resolve positions against an already parsed tree
///
/// Each position is an independent query; queries run in parallel and the
/// reports come back in input order.
pub fn display_tree(
    tree: &SyntaxTree,
    source: &str,
    positions: &[Position],
    options: &DisplayOptions,
) -> Result<Vec<IssueReport>> {
    positions
        .par_iter()
        .map(|&position| display_position(tree, source, position, options))
        .collect()
}

/// Resolve one position and build its report
///
/// A malformed issue string is an error; a position that resolves onto
/// another line only loses its issue under `require_exact_line`.
pub fn display_position(
    tree: &SyntaxTree,
    source: &str,
    position: Position,
    options: &DisplayOptions,
) -> Result<IssueReport> {
    let resolution = Resolver::new(tree, position, options.column_mode).resolve();

    if options.require_exact_line && resolution.location.line != position.line {
        debug!(
            line = position.line,
            column = position.column,
            resolved_line = resolution.location.line,
            "resolved location is on another line; no issue"
        );
        return Ok(IssueReport::without_issue(position));
    }

    let generator = ContentIssueGenerator::new(source);
    let raw = generator.issue_string(
        resolution.location,
        tree.decl(resolution.enclosing_decl),
        None,
        None,
    );
    let issue = finalize(&raw, position.column).with_context(|| {
        format!(
            "Malformed issue string for line {} column {}",
            position.line, position.column
        )
    })?;

    Ok(IssueReport::with_issue(position, issue))
}
