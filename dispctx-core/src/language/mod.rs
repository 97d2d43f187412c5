//! Language detection and front-end layer
//!
//! Front ends turn source text into the language-agnostic [`SyntaxTree`]
//! consumed by the resolver. C and C++ share one tree-sitter grammar.
//!
//! [`SyntaxTree`]: crate::tree::SyntaxTree

pub mod cpp;
pub mod parser;
pub mod span;
pub mod tree_sitter_utils;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use cpp::CppParser;
pub use parser::LanguageParser;
pub use span::{SourceLocation, SourceRange};

/// Supported source languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// C (.c, .h)
    C,
    /// C++ (.cc, .cpp, .cxx, .c++, .hh, .hpp, .hxx, .ipp, .inl)
    Cpp,
}

impl Language {
    /// Detect language from file extension
    ///
    /// Returns `None` if the extension is not recognized.
    ///
    /// # Examples
    ///
    /// ```
    /// use dispctx_core::language::Language;
    ///
    /// assert_eq!(Language::from_extension("cpp"), Some(Language::Cpp));
    /// assert_eq!(Language::from_extension("c"), Some(Language::C));
    /// assert_eq!(Language::from_extension("rs"), None);
    /// ```
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "c" | "h" => Some(Language::C),
            "cc" | "cpp" | "cxx" | "c++" | "hh" | "hpp" | "hxx" | "ipp" | "inl" => {
                Some(Language::Cpp)
            }
            _ => None,
        }
    }

    /// Detect language from file path
    ///
    /// Returns `None` if the file has no extension or the extension is not recognized.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Get the canonical name of the language
    pub fn name(&self) -> &'static str {
        match self {
            Language::C => "C",
            Language::Cpp => "C++",
        }
    }

    /// Front end able to parse this language
    pub fn parser(&self) -> anyhow::Result<Box<dyn LanguageParser + Send + Sync>> {
        match self {
            Language::C | Language::Cpp => Ok(Box::new(CppParser::new()?)),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
