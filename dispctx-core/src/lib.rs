//! dispctx core library - maps a (line, column) position in C/C++ source to
//! the issue string a static analyzer would report there

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Resolution is strictly per-position; every query owns its own state
// - No global mutable state
// - The parsed tree is never mutated after lowering
// - Declaration search is first-match-wins, statement search is last-match-wins
// - Identical input yields byte-for-byte identical output

pub mod analysis;
pub mod config;
pub mod issue;
pub mod language;
pub mod range;
pub mod report;
pub mod resolve;
pub mod tree;

pub use analysis::{display_file, display_source, display_tree, DisplayOptions};
pub use config::ResolvedConfig;
pub use issue::{finalize, ContentIssueGenerator, IssueStringError, IssueStringGenerator};
pub use language::{Language, LanguageParser, SourceLocation, SourceRange};
pub use range::{is_interesting, ColumnMode, Position};
pub use report::{render_json, render_text, IssueReport};
pub use resolve::{resolve, Resolution, Resolver};
pub use tree::{Decl, DeclId, DeclKind, Stmt, StmtId, StmtKind, SyntaxTree};
