//! C/C++ front end using tree-sitter
//!
//! Lowers the concrete syntax tree into the declaration/statement arena:
//! namespaces and records become containers, function definitions become
//! callables whose bodies are lowered statement by statement, and every
//! lambda expression becomes an anonymous function literal carrying a
//! synthesized call operator.

use super::signature::{self, Scopes};
use crate::language::parser::LanguageParser;
use crate::language::span::{location_of_node, range_of_node, SourceRange};
use crate::language::tree_sitter_utils::{collapse_whitespace, named_children, node_text};
use crate::tree::{DeclId, DeclKind, StmtId, StmtKind, SyntaxTree};
use anyhow::{Context, Result};
use tracing::{debug, warn};
use tree_sitter::{Node, Parser};

/// C/C++ parser using tree-sitter-cpp
pub struct CppParser;

impl CppParser {
    /// Create a new C/C++ parser
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_cpp::LANGUAGE.into())
            .context("Failed to set C++ language for parser")?;
        Ok(CppParser)
    }
}

impl LanguageParser for CppParser {
    fn parse(&self, source: &str, filename: &str) -> Result<SyntaxTree> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_cpp::LANGUAGE.into())
            .context("Failed to set C++ language")?;

        let parsed = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("Failed to parse C/C++ file: {}", filename))?;
        let root = parsed.root_node();

        let line_count = source.lines().count().max(1) as u32;
        let mut builder = TreeBuilder {
            source,
            tree: SyntaxTree::new(SourceRange::lines(1, line_count)),
            scopes: Scopes::new(),
        };
        let root_decl = builder.tree.root();
        builder
            .build_items(root, root_decl)
            .with_context(|| format!("Failed to lower syntax tree of {}", filename))?;

        let mut tree = builder.tree;
        if root.has_error() {
            warn!(
                file = filename,
                "syntax errors in source; resolving against the recovered tree"
            );
            tree.set_has_errors(true);
        }

        debug!(
            file = filename,
            decls = tree.decl_count(),
            stmts = tree.stmt_count(),
            "lowered syntax tree"
        );
        Ok(tree)
    }
}

struct TreeBuilder<'s> {
    source: &'s str,
    tree: SyntaxTree,
    scopes: Scopes,
}

impl TreeBuilder<'_> {
    /// Add a declaration, spilling extra declarations of a filled template
    /// wrapper (`template <class T> struct A {} a;`) into the wrapper's owner
    fn add(
        &mut self,
        parent: DeclId,
        kind: DeclKind,
        signature: String,
        range: SourceRange,
        node: Node,
    ) -> Result<DeclId> {
        let parent_decl = self.tree.decl(parent);
        let parent = match parent_decl.kind {
            DeclKind::TemplateWrapper {
                templated: Some(_),
            } => parent_decl.parent.unwrap_or(parent),
            _ => parent,
        };
        let id = self
            .tree
            .add_decl(parent, kind, signature, range, location_of_node(node))?;
        Ok(id)
    }

    fn add_non_callable(
        &mut self,
        parent: DeclId,
        range: SourceRange,
        node: Node,
        name: Option<Node>,
    ) -> Result<DeclId> {
        let signature = name
            .map(|n| self.scopes.qualify(&collapse_whitespace(self.text(n))))
            .unwrap_or_default();
        self.add(
            parent,
            DeclKind::NonCallable,
            signature,
            range,
            name.unwrap_or(node),
        )
    }

    fn text(&self, node: Node) -> &str {
        node_text(node, self.source)
    }

    fn build_items(&mut self, container: Node, parent: DeclId) -> Result<()> {
        for child in named_children(container) {
            self.build_item(child, parent)?;
        }
        Ok(())
    }

    fn build_item(&mut self, node: Node, parent: DeclId) -> Result<()> {
        match node.kind() {
            "function_definition" => self.build_function(node, parent),
            "declaration" | "field_declaration" => self.build_declaration(node, parent),
            "template_declaration" => self.build_template(node, parent),
            "namespace_definition" => self.build_namespace(node, parent),
            "linkage_specification" => self.build_linkage(node, parent),
            "type_definition" => self.build_type_definition(node, parent),
            "friend_declaration" => self.build_friend(node, parent),
            "alias_declaration"
            | "using_declaration"
            | "static_assert_declaration"
            | "concept_definition"
            | "namespace_alias_definition"
            | "template_instantiation" => {
                let name = node.child_by_field_name("name");
                self.add_non_callable(parent, range_of_node(node), node, name)?;
                Ok(())
            }
            "preproc_if" | "preproc_ifdef" | "preproc_else" | "preproc_elif"
            | "preproc_elifdef" => self.build_items(node, parent),
            _ if is_record_definition(node) => self.build_record(node, parent),
            _ => Ok(()),
        }
    }

    fn build_namespace(&mut self, node: Node, parent: DeclId) -> Result<()> {
        let qualified = self
            .scopes
            .qualify(&signature::namespace_name(node, self.source));
        let anchor = node.child_by_field_name("name").unwrap_or(node);
        let decl = self.add(
            parent,
            DeclKind::container(),
            qualified.clone(),
            range_of_node(node),
            anchor,
        )?;

        let Some(body) = node.child_by_field_name("body") else {
            return Ok(());
        };
        self.scopes.push(qualified);
        let result = self.build_items(body, decl);
        self.scopes.pop();
        result
    }

    /// `extern "C"` blocks own their declarations but add no name scope
    fn build_linkage(&mut self, node: Node, parent: DeclId) -> Result<()> {
        let decl = self.add(
            parent,
            DeclKind::container(),
            String::new(),
            range_of_node(node),
            node,
        )?;
        match node.child_by_field_name("body") {
            Some(body) if body.kind() == "declaration_list" => self.build_items(body, decl),
            Some(body) => self.build_item(body, decl),
            None => Ok(()),
        }
    }

    fn build_template(&mut self, node: Node, parent: DeclId) -> Result<()> {
        let wrapper = self.add(
            parent,
            DeclKind::template_wrapper(),
            String::new(),
            range_of_node(node),
            node,
        )?;
        let templated = named_children(node)
            .into_iter()
            .find(|c| !matches!(c.kind(), "template_parameter_list" | "requires_clause"));
        match templated {
            Some(templated) => self.build_item(templated, wrapper),
            None => Ok(()),
        }
    }

    fn build_record(&mut self, node: Node, parent: DeclId) -> Result<()> {
        let keyword = signature::record_keyword(node.kind()).unwrap_or("struct");
        let name = node.child_by_field_name("name");
        let qualified = match name {
            Some(name) => self.scopes.qualify(&collapse_whitespace(self.text(name))),
            None => self.scopes.qualify(&format!("(anonymous {keyword})")),
        };
        if let Some(name) = name.filter(|n| n.kind() == "type_identifier") {
            let simple = self.text(name).to_string();
            self.scopes
                .declare_record(&simple, keyword, qualified.clone());
        }

        let decl = self.add(
            parent,
            DeclKind::container(),
            qualified.clone(),
            range_of_node(node),
            name.unwrap_or(node),
        )?;

        let Some(body) = node.child_by_field_name("body") else {
            return Ok(());
        };
        self.scopes.push(qualified);
        let result = if node.kind() == "enum_specifier" {
            self.build_enumerators(body, decl)
        } else {
            self.build_items(body, decl)
        };
        self.scopes.pop();
        result
    }

    fn build_enumerators(&mut self, body: Node, decl: DeclId) -> Result<()> {
        for enumerator in named_children(body) {
            if enumerator.kind() == "enumerator" {
                let name = enumerator.child_by_field_name("name");
                self.add_non_callable(decl, range_of_node(enumerator), enumerator, name)?;
            }
        }
        Ok(())
    }

    /// Variables, fields and function declarations without a body
    fn build_declaration(&mut self, node: Node, parent: DeclId) -> Result<()> {
        if let Some(ty) = node.child_by_field_name("type") {
            if is_record_definition(ty) {
                self.build_record(ty, parent)?;
            }
        }

        let mut cursor = node.walk();
        let declarators: Vec<Node> = node
            .children_by_field_name("declarator", &mut cursor)
            .collect();

        for declarator in declarators {
            let range = span_between(node, declarator);
            match signature::function_signature(node, declarator, self.source, &self.scopes) {
                Some(function) => {
                    self.add(
                        parent,
                        DeclKind::callable(),
                        function.signature,
                        range,
                        function.name,
                    )?;
                }
                None => {
                    self.add_non_callable(parent, range, declarator, declarator_name(declarator))?;
                }
            }
        }
        Ok(())
    }

    fn build_type_definition(&mut self, node: Node, parent: DeclId) -> Result<()> {
        if let Some(ty) = node.child_by_field_name("type") {
            if is_record_definition(ty) {
                self.build_record(ty, parent)?;
            }
        }

        let mut cursor = node.walk();
        let declarators: Vec<Node> = node
            .children_by_field_name("declarator", &mut cursor)
            .collect();
        for declarator in declarators {
            let range = span_between(node, declarator);
            self.add_non_callable(parent, range, declarator, declarator_name(declarator))?;
        }
        Ok(())
    }

    /// Friends defined in place are real functions; the rest only name one
    fn build_friend(&mut self, node: Node, parent: DeclId) -> Result<()> {
        let children = named_children(node);
        match children.iter().find(|c| c.kind() == "function_definition") {
            Some(definition) => self.build_function(*definition, parent),
            None => {
                self.add_non_callable(parent, range_of_node(node), node, None)?;
                Ok(())
            }
        }
    }

    fn build_function(&mut self, node: Node, parent: DeclId) -> Result<()> {
        let Some(declarator) = node.child_by_field_name("declarator") else {
            return Ok(());
        };

        let (signature, scope, anchor, parameters) =
            match signature::function_signature(node, declarator, self.source, &self.scopes) {
                Some(function) => (
                    function.signature,
                    function.scope,
                    function.name,
                    function.parameters,
                ),
                None => {
                    // Declarator shapes produced by macros or error recovery
                    let written = self
                        .scopes
                        .qualify(&collapse_whitespace(self.text(declarator)));
                    (written.clone(), written, declarator, None)
                }
            };

        let decl = self.add(parent, DeclKind::callable(), signature, range_of_node(node), anchor)?;

        self.scopes.push(scope);
        let result = self.build_function_contents(node, decl, parameters);
        self.scopes.pop();
        result
    }

    fn build_function_contents(
        &mut self,
        node: Node,
        decl: DeclId,
        parameters: Option<Node>,
    ) -> Result<()> {
        if let Some(parameters) = parameters {
            for param in named_children(parameters) {
                if matches!(
                    param.kind(),
                    "parameter_declaration"
                        | "optional_parameter_declaration"
                        | "variadic_parameter_declaration"
                ) {
                    // Unnamed parameters declare nothing in the function's scope
                    let Some(name) = param
                        .child_by_field_name("declarator")
                        .and_then(declarator_name)
                    else {
                        continue;
                    };
                    self.add_non_callable(decl, range_of_node(param), param, Some(name))?;
                }
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            self.build_local_declarations(body, decl)?;
            let stmt = self.build_statement(body, decl)?;
            self.tree.set_body(decl, stmt)?;
        }
        Ok(())
    }

    /// Declarations made anywhere in a function body, in source order
    ///
    /// Lambda bodies and local record bodies are their own scopes and are not
    /// searched.
    fn build_local_declarations(&mut self, node: Node, owner: DeclId) -> Result<()> {
        for child in named_children(node) {
            match child.kind() {
                "declaration" => self.build_declaration(child, owner)?,
                "type_definition" => self.build_type_definition(child, owner)?,
                "alias_declaration"
                | "using_declaration"
                | "static_assert_declaration"
                | "namespace_alias_definition" => {
                    let name = child.child_by_field_name("name");
                    self.add_non_callable(owner, range_of_node(child), child, name)?;
                }
                "lambda_expression" => {}
                _ if is_record_definition(child) => self.build_record(child, owner)?,
                _ => self.build_local_declarations(child, owner)?,
            }
        }
        Ok(())
    }

    /// Recurses once per syntax nesting level, like `Resolver::resolve_statement`
    fn build_statement(&mut self, node: Node, owner: DeclId) -> Result<StmtId> {
        if node.kind() == "lambda_expression" {
            return self.build_lambda(node, owner);
        }

        let stmt = self.tree.add_stmt(StmtKind::Plain, range_of_node(node));
        if is_record_definition(node) {
            return Ok(stmt);
        }

        for child in named_children(node) {
            let child_stmt = self.build_statement(child, owner)?;
            self.tree.push_child_stmt(stmt, child_stmt);
        }
        Ok(stmt)
    }

    fn build_lambda(&mut self, node: Node, owner: DeclId) -> Result<StmtId> {
        let rendered = signature::lambda_signature(node, self.source, &self.scopes);
        let range = range_of_node(node);
        let call_operator = self.tree.add_detached_decl(
            owner,
            DeclKind::callable(),
            rendered.signature,
            range,
            location_of_node(node),
        );
        let stmt = self
            .tree
            .add_stmt(StmtKind::AnonymousFunctionLiteral { call_operator }, range);

        self.scopes.push(rendered.scope);
        let result = self.build_lambda_children(node, stmt, call_operator);
        self.scopes.pop();
        result?;

        Ok(stmt)
    }

    fn build_lambda_children(
        &mut self,
        node: Node,
        stmt: StmtId,
        call_operator: DeclId,
    ) -> Result<()> {
        let body = node.child_by_field_name("body");
        for child in named_children(node) {
            let child_stmt = self.build_statement(child, call_operator)?;
            self.tree.push_child_stmt(stmt, child_stmt);
            if Some(child) == body {
                self.tree.set_body(call_operator, child_stmt)?;
            }
        }
        Ok(())
    }
}

fn is_record_definition(node: Node) -> bool {
    signature::record_keyword(node.kind()).is_some() && node.child_by_field_name("body").is_some()
}

/// From the start of `first` to the end of `last`
fn span_between(first: Node, last: Node) -> SourceRange {
    SourceRange {
        start: range_of_node(first).start,
        end: range_of_node(last).end,
    }
}

/// The identifier a (possibly nested) declarator introduces
fn declarator_name(declarator: Node) -> Option<Node> {
    let mut current = declarator;
    loop {
        match current.kind() {
            "identifier" | "field_identifier" | "qualified_identifier" | "operator_name"
            | "destructor_name" | "template_function" | "type_identifier" => {
                return Some(current);
            }
            _ => {
                current = current.child_by_field_name("declarator").or_else(|| {
                    named_children(current)
                        .into_iter()
                        .find(|c| c.kind() != "type_qualifier")
                })?;
            }
        }
    }
}
