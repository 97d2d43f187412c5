//! Issue string generation and finalization
//!
//! The raw format follows the static analyzer's issue string:
//!
//! ```text
//! <checker>$<signature>$<column>$<normalized line>$<bug type>
//! ```
//!
//! This tool never supplies a checker name or bug type, so the raw string is
//! wrapped in a leading and trailing `$`. Finalization drops those two
//! delimiters and replaces the `$<digits>$` column token with the column the
//! caller asked about.

use crate::language::span::SourceLocation;
use crate::tree::Decl;
use regex::{NoExpand, Regex};
use std::sync::OnceLock;
use thiserror::Error;

/// Field delimiter of the issue string format
pub const DELIMITER: char = '$';

/// Malformed generator output
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IssueStringError {
    #[error("issue string is not wrapped in '$' delimiters: {0:?}")]
    MissingDelimiters(String),
    #[error("issue string has no '$<column>$' placeholder: {0:?}")]
    MissingPlaceholder(String),
}

/// Produces the raw issue string for a resolved location
pub trait IssueStringGenerator {
    fn issue_string(
        &self,
        location: SourceLocation,
        decl: &Decl,
        checker_name: Option<&str>,
        bug_type: Option<&str>,
    ) -> String;
}

/// Default generator: declaration signature plus the normalized source line
pub struct ContentIssueGenerator<'s> {
    source: &'s str,
}

impl<'s> ContentIssueGenerator<'s> {
    pub fn new(source: &'s str) -> Self {
        ContentIssueGenerator { source }
    }
}

impl IssueStringGenerator for ContentIssueGenerator<'_> {
    fn issue_string(
        &self,
        location: SourceLocation,
        decl: &Decl,
        checker_name: Option<&str>,
        bug_type: Option<&str>,
    ) -> String {
        let line = nth_line(self.source, location.line)
            .map(normalize_line)
            .unwrap_or_default();
        format!(
            "{checker}{d}{signature}{d}{column}{d}{line}{d}{bug}",
            checker = checker_name.unwrap_or(""),
            signature = decl.signature,
            column = location.column,
            line = line,
            bug = bug_type.unwrap_or(""),
            d = DELIMITER,
        )
    }
}

/// Fetch a 1-indexed line without its terminator
fn nth_line(source: &str, line: u32) -> Option<&str> {
    let index = (line as usize).checked_sub(1)?;
    source
        .split('\n')
        .nth(index)
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
}

/// Strip whitespace and comments from a line, keeping literals intact
///
/// Tokens end up concatenated, so `return foo(5);` becomes `returnfoo(5);`.
/// An unterminated block comment swallows the rest of the line.
pub fn normalize_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => break,
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
            }
            '"' | '\'' => {
                out.push(c);
                let mut escaped = false;
                for inner in chars.by_ref() {
                    out.push(inner);
                    if escaped {
                        escaped = false;
                    } else if inner == '\\' {
                        escaped = true;
                    } else if inner == c {
                        break;
                    }
                }
            }
            c if c.is_whitespace() => {}
            c => out.push(c),
        }
    }

    out
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\$[0-9]+\$").unwrap())
}

/// Rewrite a raw issue string for output
///
/// Drops the first and last character (the empty checker/bug-type delimiters)
/// and replaces every `$<digits>$` token with `$<column>$`. Any other digit run
/// is left alone.
pub fn finalize(raw: &str, column: u32) -> Result<String, IssueStringError> {
    let body = raw
        .strip_prefix(DELIMITER)
        .and_then(|rest| rest.strip_suffix(DELIMITER))
        .ok_or_else(|| IssueStringError::MissingDelimiters(raw.to_string()))?;

    let placeholder = placeholder_regex();
    if !placeholder.is_match(body) {
        return Err(IssueStringError::MissingPlaceholder(raw.to_string()));
    }

    let replacement = format!("{d}{column}{d}", d = DELIMITER);
    Ok(placeholder
        .replace_all(body, NoExpand(&replacement))
        .into_owned())
}
