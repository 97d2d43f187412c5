//! Line containment test shared by declarations and statements

use crate::language::span::SourceRange;
use serde::{Deserialize, Serialize};

/// Anything with a resolved (or unresolvable) source extent
pub trait HasSourceRange {
    fn source_range(&self) -> SourceRange;
}

/// A requested (line, column) pair, both 1-indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

/// How much of the requested position takes part in containment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMode {
    /// Only lines are compared; the column is applied textually at the end
    #[default]
    LineOnly,
    /// Nodes that start and end on the requested line must also span the column
    Precise,
}

/// Decide whether `node` encloses the requested position
///
/// Invalid ranges are never interesting. In `LineOnly` mode this is the closed
/// interval test `start.line <= line <= end.line`.
pub fn is_interesting<N: HasSourceRange + ?Sized>(
    node: &N,
    target: Position,
    mode: ColumnMode,
) -> bool {
    let range = node.source_range();
    let (Some(start), Some(end)) = (range.start, range.end) else {
        return false;
    };

    if mode == ColumnMode::Precise && start.line == target.line && end.line == target.line {
        return start.column <= target.column && target.column <= end.column;
    }

    start.line <= target.line && target.line <= end.line
}
