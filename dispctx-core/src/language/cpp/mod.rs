//! C and C++ language support
//!
//! Both languages are parsed with tree-sitter-cpp; the C++ grammar accepts
//! the C subset the resolver cares about.

pub mod parser;
pub mod signature;

pub use parser::CppParser;
