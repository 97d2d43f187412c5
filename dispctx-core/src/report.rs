//! Reporting and output generation
//!
//! Global invariants enforced:
//! - One report per requested position, in request order
//! - Byte-for-byte identical output across runs

use crate::range::Position;
use serde::{Deserialize, Serialize};

/// Outcome of one (line, column) query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueReport {
    pub line: u32,
    pub column: u32,
    /// Finalized issue string; `None` when the position specifies no issue
    pub issue: Option<String>,
}

impl IssueReport {
    pub fn with_issue(position: Position, issue: String) -> Self {
        IssueReport {
            line: position.line,
            column: position.column,
            issue: Some(issue),
        }
    }

    pub fn without_issue(position: Position) -> Self {
        IssueReport {
            line: position.line,
            column: position.column,
            issue: None,
        }
    }

    /// Text shown for this report: the issue string or the fallback message
    pub fn message(&self) -> String {
        match &self.issue {
            Some(issue) => issue.clone(),
            None => format!(
                "Line {} and column {} do not specify an issue.",
                self.line, self.column
            ),
        }
    }
}

/// Render reports as text output, one line per report
pub fn render_text(reports: &[IssueReport]) -> String {
    let mut output = String::new();
    for report in reports {
        output.push_str(&report.message());
        output.push('\n');
    }
    output
}

/// Render reports as JSON output
pub fn render_json(reports: &[IssueReport]) -> String {
    serde_json::to_string_pretty(reports).unwrap_or_else(|_| "[]".to_string())
}
