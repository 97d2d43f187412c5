//! Position-to-enclosing-node resolution
//!
//! Global invariants enforced:
//! - The tree is never mutated; all state lives in one `ResolutionState` per query
//! - Declaration descent stops at the first matching sibling
//! - Statement descent visits every child, so the last interesting node wins
//! - Anonymous function literals rebind the enclosing declaration for the rest
//!   of the walk; the rebinding is never undone

use crate::language::span::SourceLocation;
use crate::range::{is_interesting, ColumnMode, Position};
use crate::tree::{DeclId, DeclKind, StmtId, StmtKind, SyntaxTree};
use tracing::debug;

/// Mutable state of a single resolution run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionState {
    pub issue_location: SourceLocation,
    pub enclosing_decl: DeclId,
}

/// Final answer for one position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Innermost declaration found by the declaration walk, before normalization
    pub matched_decl: DeclId,
    /// Start of the deepest interesting statement, or the matched declaration's location
    pub location: SourceLocation,
    /// Callable the issue string is anchored to
    pub enclosing_decl: DeclId,
}

/// Walks one tree for one requested position
pub struct Resolver<'t> {
    tree: &'t SyntaxTree,
    target: Position,
    mode: ColumnMode,
}

impl<'t> Resolver<'t> {
    pub fn new(tree: &'t SyntaxTree, target: Position, mode: ColumnMode) -> Self {
        Resolver { tree, target, mode }
    }

    /// Run the full pipeline from the tree root
    pub fn resolve(&self) -> Resolution {
        let (matched_decl, body) = self.resolve_declaration(self.tree.root());
        let enclosing_decl = self.normalize(matched_decl);

        let mut state = ResolutionState {
            issue_location: self.tree.decl(matched_decl).location,
            enclosing_decl,
        };
        if let Some(body) = body {
            self.resolve_statement(body, &mut state);
        }

        debug!(
            line = self.target.line,
            issue_line = state.issue_location.line,
            issue_column = state.issue_location.column,
            signature = %self.tree.decl(state.enclosing_decl).signature,
            "resolved position"
        );

        Resolution {
            matched_decl,
            location: state.issue_location,
            enclosing_decl: state.enclosing_decl,
        }
    }

    /// Descend to the innermost declaration enclosing the target line
    ///
    /// Template wrappers are unwrapped before anything else. Among children,
    /// the first interesting one in declaration order is taken and later
    /// siblings are never inspected. Returns the declaration and its body.
    pub fn resolve_declaration(&self, root: DeclId) -> (DeclId, Option<StmtId>) {
        let mut current = root;
        loop {
            let decl = self.tree.decl(current);
            if let DeclKind::TemplateWrapper {
                templated: Some(templated),
            } = decl.kind
            {
                current = templated;
                continue;
            }

            let next = decl
                .children()
                .iter()
                .copied()
                .find(|&child| is_interesting(self.tree.decl(child), self.target, self.mode));

            match next {
                Some(child) => current = child,
                None => return (current, decl.body()),
            }
        }
    }

    /// Walk up from a non-callable declaration to its nearest callable context
    ///
    /// Callable declarations (and the root) are returned unchanged.
    pub fn normalize(&self, decl: DeclId) -> DeclId {
        let mut current = decl;
        while self.tree.decl(current).is_non_callable() {
            match self.tree.decl(current).parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        if current != decl {
            debug!(
                from = %self.tree.decl(decl).signature,
                to = %self.tree.decl(current).signature,
                "normalized enclosing declaration"
            );
        }
        current
    }

    /// Pre-order walk of a statement subtree
    ///
    /// A statement that is not interesting prunes its whole subtree. Every
    /// interesting statement overwrites the issue location before its children
    /// are visited, so the deepest and latest match dominates.
    ///
    /// Recursion depth equals statement nesting depth. Compilers cap bracket
    /// nesting at a few hundred levels, far below the default thread stack.
    pub fn resolve_statement(&self, stmt: StmtId, state: &mut ResolutionState) {
        let node = self.tree.stmt(stmt);
        if !is_interesting(node, self.target, self.mode) {
            return;
        }

        if let Some(start) = node.start() {
            state.issue_location = start;
        }

        if let StmtKind::AnonymousFunctionLiteral { call_operator } = node.kind {
            debug!(
                signature = %self.tree.decl(call_operator).signature,
                "entering anonymous function literal"
            );
            state.enclosing_decl = call_operator;
        }

        for &child in &node.children {
            self.resolve_statement(child, state);
        }
    }
}

/// Resolve `target` in `tree` with a fresh state
pub fn resolve(tree: &SyntaxTree, target: Position, mode: ColumnMode) -> Resolution {
    Resolver::new(tree, target, mode).resolve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::span::SourceRange;
    use crate::tree::DeclKind;

    fn at(line: u32) -> SourceLocation {
        SourceLocation::new(line, 1)
    }

    fn lines(start: u32, end: u32) -> SourceRange {
        SourceRange::lines(start, end)
    }

    fn line_only(tree: &SyntaxTree, line: u32) -> Resolver<'_> {
        Resolver::new(tree, Position::new(line, 1), ColumnMode::LineOnly)
    }

    /// `void function(int) { issueCall(5); }` across lines 6-8
    fn single_function() -> (SyntaxTree, DeclId, StmtId) {
        let mut tree = SyntaxTree::new(lines(1, 20));
        let root = tree.root();
        let f = tree
            .add_decl(root, DeclKind::callable(), "void function(int)", lines(6, 8), at(6))
            .unwrap();
        tree.add_decl(f, DeclKind::NonCallable, "", lines(6, 6), SourceLocation::new(6, 15))
            .unwrap();
        let body = tree.add_stmt(StmtKind::Plain, lines(6, 8));
        let call = tree.add_stmt(
            StmtKind::Plain,
            SourceRange::new(SourceLocation::new(7, 3), SourceLocation::new(7, 29)),
        );
        tree.push_child_stmt(body, call);
        tree.set_body(f, body).unwrap();
        (tree, f, call)
    }

    #[test]
    fn test_resolves_function_and_call() {
        let (tree, f, _) = single_function();
        let resolution = resolve(&tree, Position::new(7, 27), ColumnMode::LineOnly);
        assert_eq!(resolution.matched_decl, f);
        assert_eq!(resolution.enclosing_decl, f);
        assert_eq!(resolution.location, SourceLocation::new(7, 3));
    }

    #[test]
    fn test_line_inside_decl_outside_children_returns_decl() {
        let mut tree = SyntaxTree::new(lines(1, 30));
        let root = tree.root();
        let ns = tree
            .add_decl(root, DeclKind::container(), "N", lines(2, 20), at(2))
            .unwrap();
        tree.add_decl(ns, DeclKind::callable(), "void N::a()", lines(3, 5), at(3))
            .unwrap();
        tree.add_decl(ns, DeclKind::callable(), "void N::b()", lines(10, 12), at(10))
            .unwrap();

        let resolver = line_only(&tree, 7);
        assert_eq!(resolver.resolve_declaration(root), (ns, None));
    }

    #[test]
    fn test_first_matching_sibling_wins() {
        let mut tree = SyntaxTree::new(lines(1, 30));
        let root = tree.root();
        let first = tree
            .add_decl(root, DeclKind::container(), "A", lines(2, 10), at(2))
            .unwrap();
        let inner = tree
            .add_decl(first, DeclKind::callable(), "void A::f()", lines(4, 6), at(4))
            .unwrap();
        let second = tree
            .add_decl(root, DeclKind::callable(), "void g()", lines(3, 8), at(3))
            .unwrap();

        let (found, _) = line_only(&tree, 5).resolve_declaration(root);
        assert_eq!(found, inner);
        assert_ne!(found, second);

        // No child of the first sibling matches: still never falls through to the second
        let (found, _) = line_only(&tree, 8).resolve_declaration(root);
        assert_eq!(found, first);
    }

    #[test]
    fn test_template_wrapper_is_unwrapped() {
        let mut tree = SyntaxTree::new(lines(1, 30));
        let root = tree.root();
        let wrapper = tree
            .add_decl(root, DeclKind::template_wrapper(), "", lines(1, 4), at(1))
            .unwrap();
        let f = tree
            .add_decl(wrapper, DeclKind::callable(), "void f(T)", lines(2, 4), at(2))
            .unwrap();
        let body = tree.add_stmt(StmtKind::Plain, lines(2, 4));
        tree.set_body(f, body).unwrap();

        assert_eq!(line_only(&tree, 3).resolve_declaration(root), (f, Some(body)));
    }

    #[test]
    fn test_empty_template_wrapper_is_a_leaf() {
        let mut tree = SyntaxTree::new(lines(1, 30));
        let root = tree.root();
        let wrapper = tree
            .add_decl(root, DeclKind::template_wrapper(), "", lines(1, 4), at(1))
            .unwrap();
        assert_eq!(line_only(&tree, 2).resolve_declaration(root), (wrapper, None));
    }

    #[test]
    fn test_no_match_degrades_to_root() {
        let (tree, _, _) = single_function();
        let resolution = resolve(&tree, Position::new(15, 4), ColumnMode::LineOnly);
        assert_eq!(resolution.matched_decl, tree.root());
        assert_eq!(resolution.enclosing_decl, tree.root());
        assert_eq!(resolution.location, tree.decl(tree.root()).location);
    }

    #[test]
    fn test_invalid_range_prunes_declaration() {
        let mut tree = SyntaxTree::new(lines(1, 30));
        let root = tree.root();
        tree.add_decl(root, DeclKind::callable(), "void m()", SourceRange::invalid(), at(2))
            .unwrap();
        let second = tree
            .add_decl(root, DeclKind::callable(), "void n()", lines(2, 4), at(2))
            .unwrap();
        assert_eq!(line_only(&tree, 3).resolve_declaration(root).0, second);
    }

    #[test]
    fn test_normalize_callable_is_identity() {
        let (tree, f, _) = single_function();
        let resolver = line_only(&tree, 7);
        assert_eq!(resolver.normalize(f), f);
        assert_eq!(resolver.normalize(tree.root()), tree.root());
    }

    #[test]
    fn test_normalize_walks_up_and_is_idempotent() {
        let mut tree = SyntaxTree::new(lines(1, 30));
        let root = tree.root();
        let ns = tree
            .add_decl(root, DeclKind::container(), "AA", lines(1, 20), at(1))
            .unwrap();
        let class = tree
            .add_decl(ns, DeclKind::container(), "AA::X", lines(2, 10), at(2))
            .unwrap();
        let field = tree
            .add_decl(class, DeclKind::NonCallable, "field", lines(3, 3), at(3))
            .unwrap();

        let resolver = line_only(&tree, 3);
        let once = resolver.normalize(field);
        assert_eq!(once, class);
        assert_eq!(resolver.normalize(once), once);
    }

    #[test]
    fn test_normalize_reaches_function_from_parameter() {
        let (tree, f, _) = single_function();
        let param = tree.decl(f).children()[0];
        assert_eq!(line_only(&tree, 6).normalize(param), f);
    }

    #[test]
    fn test_field_in_class_anchors_to_class() {
        let mut tree = SyntaxTree::new(lines(1, 30));
        let root = tree.root();
        let class = tree
            .add_decl(root, DeclKind::container(), "X", lines(2, 10), at(2))
            .unwrap();
        tree.add_decl(class, DeclKind::callable(), "void X::f()", lines(3, 5), at(3))
            .unwrap();
        let field = tree
            .add_decl(class, DeclKind::NonCallable, "x", lines(7, 7), SourceLocation::new(7, 7))
            .unwrap();

        let resolution = resolve(&tree, Position::new(7, 9), ColumnMode::LineOnly);
        assert_eq!(resolution.matched_decl, field);
        assert_eq!(resolution.enclosing_decl, class);
        assert_eq!(resolution.location, SourceLocation::new(7, 7));
    }

    #[test]
    fn test_deepest_statement_wins() {
        let mut tree = SyntaxTree::new(lines(1, 30));
        let root = tree.root();
        let f = tree
            .add_decl(root, DeclKind::callable(), "void f()", lines(1, 10), at(1))
            .unwrap();
        let body = tree.add_stmt(StmtKind::Plain, lines(1, 10));
        let outer = tree.add_stmt(StmtKind::Plain, lines(2, 8));
        let inner = tree.add_stmt(StmtKind::Plain, SourceRange::new(SourceLocation::new(4, 5), SourceLocation::new(5, 2)));
        let sibling = tree.add_stmt(StmtKind::Plain, lines(9, 9));
        tree.push_child_stmt(body, outer);
        tree.push_child_stmt(outer, inner);
        tree.push_child_stmt(body, sibling);
        tree.set_body(f, body).unwrap();

        let resolution = resolve(&tree, Position::new(5, 1), ColumnMode::LineOnly);
        assert_eq!(resolution.location, SourceLocation::new(4, 5));

        let resolution = resolve(&tree, Position::new(7, 1), ColumnMode::LineOnly);
        assert_eq!(resolution.location, SourceLocation::new(2, 1));
    }

    #[test]
    fn test_non_matching_statement_prunes_subtree() {
        let mut tree = SyntaxTree::new(lines(1, 30));
        let root = tree.root();
        let f = tree
            .add_decl(root, DeclKind::callable(), "void f()", lines(1, 10), at(1))
            .unwrap();
        let body = tree.add_stmt(StmtKind::Plain, lines(1, 10));
        let outer = tree.add_stmt(StmtKind::Plain, lines(2, 3));
        // Malformed: child lies outside its parent
        let stray = tree.add_stmt(StmtKind::Plain, lines(6, 6));
        tree.push_child_stmt(body, outer);
        tree.push_child_stmt(outer, stray);
        tree.set_body(f, body).unwrap();

        let resolution = resolve(&tree, Position::new(6, 1), ColumnMode::LineOnly);
        assert_eq!(resolution.location, at(1));
    }

    #[test]
    fn test_later_sibling_on_same_line_wins() {
        let mut tree = SyntaxTree::new(lines(1, 30));
        let root = tree.root();
        let f = tree
            .add_decl(root, DeclKind::callable(), "void f()", lines(1, 5), at(1))
            .unwrap();
        let body = tree.add_stmt(StmtKind::Plain, lines(1, 5));
        let a = tree.add_stmt(StmtKind::Plain, SourceRange::new(SourceLocation::new(3, 3), SourceLocation::new(3, 8)));
        let b = tree.add_stmt(StmtKind::Plain, SourceRange::new(SourceLocation::new(3, 10), SourceLocation::new(3, 15)));
        tree.push_child_stmt(body, a);
        tree.push_child_stmt(body, b);
        tree.set_body(f, body).unwrap();

        let resolution = resolve(&tree, Position::new(3, 4), ColumnMode::LineOnly);
        assert_eq!(resolution.location, SourceLocation::new(3, 10));

        // Precise columns keep the node actually under the cursor
        let resolution = resolve(&tree, Position::new(3, 4), ColumnMode::Precise);
        assert_eq!(resolution.location, SourceLocation::new(3, 3));
    }

    /// `void testLambda() { [](){ call(); }(); after(); }` on lines 1-7
    fn lambda_tree() -> (SyntaxTree, DeclId, DeclId) {
        let mut tree = SyntaxTree::new(lines(1, 30));
        let root = tree.root();
        let f = tree
            .add_decl(root, DeclKind::callable(), "void testLambda()", lines(1, 7), at(1))
            .unwrap();
        let op = tree.add_detached_decl(
            f,
            DeclKind::callable(),
            "void testLambda()::(anonymous class)::operator()() const",
            lines(2, 4),
            SourceLocation::new(2, 3),
        );

        let body = tree.add_stmt(StmtKind::Plain, lines(1, 7));
        let call_expr = tree.add_stmt(StmtKind::Plain, lines(2, 6));
        let lambda = tree.add_stmt(StmtKind::AnonymousFunctionLiteral { call_operator: op }, lines(2, 4));
        let lambda_body = tree.add_stmt(StmtKind::Plain, lines(2, 4));
        let inner_call = tree.add_stmt(StmtKind::Plain, SourceRange::new(SourceLocation::new(3, 5), SourceLocation::new(3, 12)));
        let args = tree.add_stmt(StmtKind::Plain, lines(5, 6));

        tree.push_child_stmt(body, call_expr);
        tree.push_child_stmt(call_expr, lambda);
        tree.push_child_stmt(lambda, lambda_body);
        tree.push_child_stmt(lambda_body, inner_call);
        tree.push_child_stmt(call_expr, args);
        tree.set_body(f, body).unwrap();
        tree.set_body(op, lambda_body).unwrap();
        (tree, f, op)
    }

    #[test]
    fn test_lambda_rebinds_enclosing_declaration() {
        let (tree, _, op) = lambda_tree();
        let resolution = resolve(&tree, Position::new(3, 7), ColumnMode::LineOnly);
        assert_eq!(resolution.enclosing_decl, op);
        assert_eq!(resolution.location, SourceLocation::new(3, 5));
    }

    #[test]
    fn test_lambda_rebinding_is_not_undone() {
        let (tree, f, op) = lambda_tree();
        // Line 4 is inside the literal and inside the call expression; the
        // argument list on lines 5-6 is not visited for line 4
        let resolution = resolve(&tree, Position::new(4, 1), ColumnMode::LineOnly);
        assert_eq!(resolution.enclosing_decl, op);

        // Line 5 never enters the literal
        let resolution = resolve(&tree, Position::new(5, 1), ColumnMode::LineOnly);
        assert_eq!(resolution.enclosing_decl, f);
    }

    #[test]
    fn test_lambda_rebinding_persists_for_later_siblings() {
        let mut tree = SyntaxTree::new(lines(1, 30));
        let root = tree.root();
        let f = tree
            .add_decl(root, DeclKind::callable(), "void f()", lines(1, 5), at(1))
            .unwrap();
        let op = tree.add_detached_decl(f, DeclKind::callable(), "op", lines(2, 2), at(2));
        let body = tree.add_stmt(StmtKind::Plain, lines(1, 5));
        let stmt = tree.add_stmt(StmtKind::Plain, lines(2, 2));
        let lambda = tree.add_stmt(StmtKind::AnonymousFunctionLiteral { call_operator: op }, SourceRange::new(SourceLocation::new(2, 3), SourceLocation::new(2, 10)));
        let sibling = tree.add_stmt(StmtKind::Plain, SourceRange::new(SourceLocation::new(2, 14), SourceLocation::new(2, 20)));
        tree.push_child_stmt(body, stmt);
        tree.push_child_stmt(stmt, lambda);
        tree.push_child_stmt(stmt, sibling);
        tree.set_body(f, body).unwrap();

        let resolution = resolve(&tree, Position::new(2, 1), ColumnMode::LineOnly);
        assert_eq!(resolution.location, SourceLocation::new(2, 14));
        assert_eq!(resolution.enclosing_decl, op);
    }

    #[test]
    fn test_nested_lambda_rebinds_again() {
        let mut tree = SyntaxTree::new(lines(1, 30));
        let root = tree.root();
        let f = tree
            .add_decl(root, DeclKind::callable(), "void f()", lines(1, 9), at(1))
            .unwrap();
        let outer_op = tree.add_detached_decl(f, DeclKind::callable(), "outer", lines(2, 8), at(2));
        let inner_op = tree.add_detached_decl(outer_op, DeclKind::callable(), "inner", lines(3, 5), at(3));
        let body = tree.add_stmt(StmtKind::Plain, lines(1, 9));
        let outer = tree.add_stmt(StmtKind::AnonymousFunctionLiteral { call_operator: outer_op }, lines(2, 8));
        let inner = tree.add_stmt(StmtKind::AnonymousFunctionLiteral { call_operator: inner_op }, lines(3, 5));
        let leaf = tree.add_stmt(StmtKind::Plain, lines(4, 4));
        tree.push_child_stmt(body, outer);
        tree.push_child_stmt(outer, inner);
        tree.push_child_stmt(inner, leaf);
        tree.set_body(f, body).unwrap();

        assert_eq!(resolve(&tree, Position::new(4, 1), ColumnMode::LineOnly).enclosing_decl, inner_op);
        assert_eq!(resolve(&tree, Position::new(7, 1), ColumnMode::LineOnly).enclosing_decl, outer_op);
    }

    #[test]
    fn test_local_variable_keeps_declaration_location() {
        let mut tree = SyntaxTree::new(lines(1, 30));
        let root = tree.root();
        let f = tree
            .add_decl(root, DeclKind::callable(), "void f()", lines(1, 5), at(1))
            .unwrap();
        let var = tree
            .add_decl(f, DeclKind::NonCallable, "y", lines(3, 3), SourceLocation::new(3, 5))
            .unwrap();
        let body = tree.add_stmt(StmtKind::Plain, lines(1, 5));
        let decl_stmt = tree.add_stmt(StmtKind::Plain, lines(3, 3));
        tree.push_child_stmt(body, decl_stmt);
        tree.set_body(f, body).unwrap();

        let resolution = resolve(&tree, Position::new(3, 1), ColumnMode::LineOnly);
        assert_eq!(resolution.matched_decl, var);
        assert_eq!(resolution.enclosing_decl, f);
        // A variable has no body, so the statement walk never runs
        assert_eq!(resolution.location, SourceLocation::new(3, 5));
    }

    #[test]
    fn test_state_is_fresh_per_query() {
        let (tree, f, op) = lambda_tree();
        let resolver_in = Resolver::new(&tree, Position::new(3, 1), ColumnMode::LineOnly);
        let resolver_out = Resolver::new(&tree, Position::new(5, 1), ColumnMode::LineOnly);
        assert_eq!(resolver_in.resolve().enclosing_decl, op);
        assert_eq!(resolver_out.resolve().enclosing_decl, f);
        assert_eq!(resolver_in.resolve().enclosing_decl, op);
    }
}
