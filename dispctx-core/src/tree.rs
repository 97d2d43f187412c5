//! Arena-backed declaration/statement tree
//!
//! Global invariants enforced:
//! - The tree owns every node; consumers hold `DeclId` / `StmtId` handles only
//! - Child order is source order and never changes after insertion
//! - The owning-context chain of every declaration ends at the root

use crate::language::span::{SourceLocation, SourceRange};
use crate::range::HasSourceRange;
use thiserror::Error;

/// Handle to a declaration in a `SyntaxTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(usize);

/// Handle to a statement in a `SyntaxTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(usize);

/// Errors raised while building a tree
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("declaration {0:?} cannot own child declarations")]
    NotAContainer(DeclId),
    #[error("template wrapper {0:?} already wraps a declaration")]
    TemplateAlreadyFilled(DeclId),
    #[error("declaration {0:?} is not callable and cannot have a body")]
    NotCallable(DeclId),
}

/// The closed set of declaration shapes the resolver distinguishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind {
    /// Whole-program root; callable-equivalent for issue anchoring
    TranslationUnit { children: Vec<DeclId> },
    /// Function-like declaration, optionally with a body
    Callable {
        body: Option<StmtId>,
        children: Vec<DeclId>,
    },
    /// Wraps exactly one templated declaration
    TemplateWrapper { templated: Option<DeclId> },
    /// Namespace, record, enum or linkage block
    Container { children: Vec<DeclId> },
    /// Variable, field, parameter, alias and anything else without a body
    NonCallable,
}

impl DeclKind {
    pub fn callable() -> Self {
        DeclKind::Callable {
            body: None,
            children: Vec::new(),
        }
    }

    pub fn container() -> Self {
        DeclKind::Container {
            children: Vec::new(),
        }
    }

    pub fn template_wrapper() -> Self {
        DeclKind::TemplateWrapper { templated: None }
    }
}

/// A declaration node
#[derive(Debug, Clone)]
pub struct Decl {
    pub kind: DeclKind,
    pub range: SourceRange,
    /// Identifying location (usually the declared name)
    pub location: SourceLocation,
    /// Lexical owning context; `None` only for the root
    pub parent: Option<DeclId>,
    /// Canonical signature used in issue strings
    pub signature: String,
}

impl Decl {
    /// Callable declarations and the root are valid issue anchors
    pub fn is_callable(&self) -> bool {
        matches!(
            self.kind,
            DeclKind::Callable { .. } | DeclKind::TranslationUnit { .. }
        )
    }

    pub fn is_non_callable(&self) -> bool {
        matches!(self.kind, DeclKind::NonCallable)
    }

    pub fn body(&self) -> Option<StmtId> {
        match &self.kind {
            DeclKind::Callable { body, .. } => *body,
            _ => None,
        }
    }

    /// Nested declarations in source order
    pub fn children(&self) -> &[DeclId] {
        match &self.kind {
            DeclKind::TranslationUnit { children }
            | DeclKind::Callable { children, .. }
            | DeclKind::Container { children } => children,
            DeclKind::TemplateWrapper { .. } | DeclKind::NonCallable => &[],
        }
    }
}

impl HasSourceRange for Decl {
    fn source_range(&self) -> SourceRange {
        self.range
    }
}

/// Statement shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtKind {
    Plain,
    /// Lambda-like literal; carries its synthesized call operator
    AnonymousFunctionLiteral { call_operator: DeclId },
}

/// A statement or expression node
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub range: SourceRange,
    pub children: Vec<StmtId>,
}

impl Stmt {
    /// Start of the statement, if it resolved
    pub fn start(&self) -> Option<SourceLocation> {
        self.range.start
    }
}

impl HasSourceRange for Stmt {
    fn source_range(&self) -> SourceRange {
        self.range
    }
}

/// A parsed file: declarations and statements in two arenas
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    decls: Vec<Decl>,
    stmts: Vec<Stmt>,
    has_errors: bool,
}

impl SyntaxTree {
    /// Create a tree holding only the root declaration
    pub fn new(range: SourceRange) -> Self {
        let root = Decl {
            kind: DeclKind::TranslationUnit {
                children: Vec::new(),
            },
            range,
            location: SourceLocation::new(1, 1),
            parent: None,
            signature: String::new(),
        };
        SyntaxTree {
            decls: vec![root],
            stmts: Vec::new(),
            has_errors: false,
        }
    }

    pub fn root(&self) -> DeclId {
        DeclId(0)
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.0]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.0]
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }

    /// Whether the front end recovered from syntax errors
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn set_has_errors(&mut self, has_errors: bool) {
        self.has_errors = has_errors;
    }

    /// Add a declaration owned by `parent`
    ///
    /// Under a template wrapper the new declaration becomes the wrapped one and
    /// shares the wrapper's owning context; everywhere else it is appended to
    /// the parent's children.
    pub fn add_decl(
        &mut self,
        parent: DeclId,
        kind: DeclKind,
        signature: impl Into<String>,
        range: SourceRange,
        location: SourceLocation,
    ) -> Result<DeclId, TreeError> {
        let id = DeclId(self.decls.len());
        let wrapper_owner = self.decls[parent.0].parent.unwrap_or(parent);
        let owner = match &mut self.decls[parent.0].kind {
            DeclKind::TranslationUnit { children }
            | DeclKind::Callable { children, .. }
            | DeclKind::Container { children } => {
                children.push(id);
                parent
            }
            DeclKind::TemplateWrapper { templated } => {
                if templated.is_some() {
                    return Err(TreeError::TemplateAlreadyFilled(parent));
                }
                *templated = Some(id);
                wrapper_owner
            }
            DeclKind::NonCallable => return Err(TreeError::NotAContainer(parent)),
        };

        self.decls.push(Decl {
            kind,
            range,
            location,
            parent: Some(owner),
            signature: signature.into(),
        });
        Ok(id)
    }

    /// Add a declaration owned by `owner` that is not listed among its children
    ///
    /// Used for call operators synthesized for anonymous function literals,
    /// which are reachable only through the statement tree.
    pub fn add_detached_decl(
        &mut self,
        owner: DeclId,
        kind: DeclKind,
        signature: impl Into<String>,
        range: SourceRange,
        location: SourceLocation,
    ) -> DeclId {
        let id = DeclId(self.decls.len());
        self.decls.push(Decl {
            kind,
            range,
            location,
            parent: Some(owner),
            signature: signature.into(),
        });
        id
    }

    /// Attach a body to a callable declaration
    pub fn set_body(&mut self, decl: DeclId, body: StmtId) -> Result<(), TreeError> {
        match &mut self.decls[decl.0].kind {
            DeclKind::Callable { body: slot, .. } => {
                *slot = Some(body);
                Ok(())
            }
            _ => Err(TreeError::NotCallable(decl)),
        }
    }

    /// Add a statement with no children yet
    pub fn add_stmt(&mut self, kind: StmtKind, range: SourceRange) -> StmtId {
        let id = StmtId(self.stmts.len());
        self.stmts.push(Stmt {
            kind,
            range,
            children: Vec::new(),
        });
        id
    }

    /// Append `child` to `parent`'s statement children
    pub fn push_child_stmt(&mut self, parent: StmtId, child: StmtId) {
        self.stmts[parent.0].children.push(child);
    }
}
