//! Canonical C/C++ declaration signatures
//!
//! Signatures follow the compiler's pretty-printed form used in issue hashes:
//! `<return type> <qualified name>(<parameter types>)<qualifiers>`. The return
//! type is left out for constructors, destructors and conversion operators.
//! Named records used as types print with their keyword and full scope
//! (`class AA::X &`), everything else prints as written with whitespace
//! collapsed.

use crate::language::tree_sitter_utils::{
    all_children, collapse_whitespace, find_child_by_kind, named_children, node_text,
};
use std::collections::HashMap;
use tree_sitter::Node;

pub const ANONYMOUS_NAMESPACE: &str = "(anonymous namespace)";
pub const ANONYMOUS_CLASS: &str = "(anonymous class)";

#[derive(Debug, Clone)]
struct RecordType {
    keyword: &'static str,
    qualified_name: String,
}

#[derive(Debug, Default)]
struct Scope {
    prefix: String,
    records: HashMap<String, RecordType>,
}

/// Lexical scopes open while lowering a file
///
/// Each scope carries the qualified prefix for names declared in it and the
/// records declared there, so that later type references can print fully
/// qualified.
#[derive(Debug)]
pub struct Scopes {
    stack: Vec<Scope>,
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

impl Scopes {
    pub fn new() -> Self {
        Scopes {
            stack: vec![Scope::default()],
        }
    }

    /// Qualified prefix of the innermost scope ("" at file scope)
    pub fn prefix(&self) -> &str {
        self.stack.last().map(|s| s.prefix.as_str()).unwrap_or("")
    }

    pub fn qualify(&self, name: &str) -> String {
        let prefix = self.prefix();
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}::{name}")
        }
    }

    pub fn push(&mut self, prefix: String) {
        self.stack.push(Scope {
            prefix,
            records: HashMap::new(),
        });
    }

    /// Close the innermost scope; file scope is never popped
    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    pub fn declare_record(&mut self, name: &str, keyword: &'static str, qualified_name: String) {
        if let Some(scope) = self.stack.last_mut() {
            scope.records.insert(
                name.to_string(),
                RecordType {
                    keyword,
                    qualified_name,
                },
            );
        }
    }

    fn lookup_record(&self, name: &str) -> Option<&RecordType> {
        self.stack.iter().rev().find_map(|s| s.records.get(name))
    }
}

/// Result of rendering a function declarator
#[derive(Debug)]
pub struct FunctionSignature<'t> {
    pub signature: String,
    /// Qualified name plus parameter list; prefix for names declared inside
    pub scope: String,
    /// Node whose start is the declaration's identifying location
    pub name: Node<'t>,
    pub parameters: Option<Node<'t>>,
}

/// Result of rendering a lambda's call operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaSignature {
    pub signature: String,
    pub scope: String,
}

/// Record keyword for a specifier node kind
pub fn record_keyword(kind: &str) -> Option<&'static str> {
    match kind {
        "class_specifier" => Some("class"),
        "struct_specifier" => Some("struct"),
        "union_specifier" => Some("union"),
        "enum_specifier" => Some("enum"),
        _ => None,
    }
}

/// Namespace name, or the anonymous placeholder
pub fn namespace_name(node: Node, source: &str) -> String {
    node.child_by_field_name("name")
        .map(|name| collapse_whitespace(node_text(name, source)))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| ANONYMOUS_NAMESPACE.to_string())
}

/// Render the function declared by `declarator`
///
/// `holder` is the node carrying the declaration specifiers (a
/// `function_definition`, `declaration` or `field_declaration`). Returns `None`
/// when the declarator does not declare a function, e.g. a function pointer.
pub fn function_signature<'t>(
    holder: Node<'t>,
    declarator: Node<'t>,
    source: &str,
    scopes: &Scopes,
) -> Option<FunctionSignature<'t>> {
    let mut return_sigils = String::new();
    let mut current = declarator;
    while matches!(
        current.kind(),
        "pointer_declarator" | "reference_declarator" | "attributed_declarator"
    ) {
        return_sigils.push_str(&sigil(current, source));
        current = inner_declarator(current)?;
    }

    let (name, function) = match current.kind() {
        "function_declarator" => {
            let name = current.child_by_field_name("declarator")?;
            if name.kind() == "parenthesized_declarator" {
                return None;
            }
            (name, current)
        }
        "operator_cast" => (current, cast_function(current)?),
        "qualified_identifier" => {
            let cast = descend_name(current);
            if cast.kind() != "operator_cast" {
                return None;
            }
            (current, cast_function(cast)?)
        }
        _ => return None,
    };

    let qualified_name = scopes.qualify(&render_name(name, source, scopes));
    let parameters = function.child_by_field_name("parameters");
    let parameter_list = parameters
        .map(|p| parameter_list(p, source, scopes))
        .unwrap_or_default();

    let return_type = match holder.child_by_field_name("type") {
        None => None,
        Some(_) if descend_name(name).kind() == "operator_cast" => None,
        Some(ty) => Some(
            find_child_by_kind(function, "trailing_return_type")
                .and_then(|t| named_children(t).into_iter().next())
                .map(|descriptor| render_descriptor(descriptor, source, scopes))
                .unwrap_or_else(|| render_type(holder, ty, &return_sigils, source, scopes)),
        ),
    };

    let scope = format!("{qualified_name}({parameter_list})");
    let mut signature = match return_type {
        Some(ret) => format!("{ret} {scope}"),
        None => scope.clone(),
    };
    signature.push_str(&method_qualifiers(function, source));

    Some(FunctionSignature {
        signature,
        scope,
        name: descend_name(name),
        parameters,
    })
}

/// Render the call operator of a lambda expression
///
/// The return type is the trailing one when written, otherwise `void` for a
/// body without value-returning `return` statements and `auto` for the rest.
/// Call operators are `const` unless the lambda is `mutable`.
pub fn lambda_signature(lambda: Node, source: &str, scopes: &Scopes) -> LambdaSignature {
    let declarator = lambda.child_by_field_name("declarator");

    let parameter_list = declarator
        .and_then(|d| d.child_by_field_name("parameters"))
        .map(|p| parameter_list(p, source, scopes))
        .unwrap_or_default();

    let mutable = declarator
        .map(|d| {
            all_children(d)
                .iter()
                .any(|c| node_text(*c, source) == "mutable")
        })
        .unwrap_or(false);

    let return_type = declarator
        .and_then(|d| find_child_by_kind(d, "trailing_return_type"))
        .and_then(|t| named_children(t).into_iter().next())
        .map(|descriptor| render_descriptor(descriptor, source, scopes))
        .unwrap_or_else(|| {
            let returns = lambda
                .child_by_field_name("body")
                .map(returns_value)
                .unwrap_or(false);
            let deduced = if returns { "auto" } else { "void" };
            deduced.to_string()
        });

    let name = scopes.qualify(&format!("{ANONYMOUS_CLASS}::operator()"));
    let scope = format!("{name}({parameter_list})");
    let signature = if mutable {
        format!("{return_type} {scope}")
    } else {
        format!("{return_type} {scope} const")
    };

    LambdaSignature { signature, scope }
}

/// Print a declared name without template arguments on the final component
pub fn render_name(node: Node, source: &str, scopes: &Scopes) -> String {
    match node.kind() {
        "operator_name" => normalize_operator(node_text(node, source)),
        "operator_cast" => {
            let sigils = abstract_sigils(node.child_by_field_name("declarator"), source);
            let ty = node
                .child_by_field_name("type")
                .map(|ty| render_type(node, ty, &sigils, source, scopes))
                .unwrap_or_default();
            format!("operator {ty}")
        }
        "template_function" | "template_method" => node
            .child_by_field_name("name")
            .map(|name| render_name(name, source, scopes))
            .unwrap_or_else(|| collapse_whitespace(node_text(node, source))),
        "qualified_identifier" => {
            let Some(name) = node.child_by_field_name("name") else {
                return collapse_whitespace(node_text(node, source));
            };
            let name = render_name(name, source, scopes);
            match node.child_by_field_name("scope") {
                Some(scope) => format!("{}::{}", collapse_whitespace(node_text(scope, source)), name),
                None => name,
            }
        }
        "destructor_name" => node_text(node, source)
            .split_whitespace()
            .collect::<String>(),
        _ => collapse_whitespace(node_text(node, source)),
    }
}

/// `operator =` -> `operator=`, `operator new [ ]` -> `operator new[]`
pub fn normalize_operator(text: &str) -> String {
    let rest = text.strip_prefix("operator").unwrap_or(text);
    let compact: String = rest.split_whitespace().collect();
    if compact.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        format!("operator {compact}")
    } else {
        format!("operator{compact}")
    }
}

/// Innermost name component of a possibly qualified name
fn descend_name(node: Node) -> Node {
    let mut current = node;
    while current.kind() == "qualified_identifier" {
        match current.child_by_field_name("name") {
            Some(name) => current = name,
            None => break,
        }
    }
    current
}

fn inner_declarator(node: Node) -> Option<Node> {
    node.child_by_field_name("declarator").or_else(|| {
        named_children(node)
            .into_iter()
            .rev()
            .find(|c| !matches!(c.kind(), "type_qualifier" | "attribute_declaration"))
    })
}

/// Pointer or reference marker contributed by one declarator layer
fn sigil(node: Node, source: &str) -> String {
    match node.kind() {
        "pointer_declarator" | "abstract_pointer_declarator" => {
            let qualified = all_children(node)
                .iter()
                .filter(|c| c.kind() == "type_qualifier")
                .map(|c| node_text(*c, source))
                .filter(|q| matches!(*q, "const" | "volatile"))
                .collect::<Vec<_>>();
            if qualified.is_empty() {
                "*".to_string()
            } else {
                format!("*{}", qualified.join(" "))
            }
        }
        "reference_declarator" | "abstract_reference_declarator" => all_children(node)
            .first()
            .map(|c| node_text(*c, source).to_string())
            .filter(|t| t == "&" || t == "&&")
            .unwrap_or_else(|| "&".to_string()),
        "array_declarator" | "abstract_array_declarator" => "*".to_string(),
        _ => String::new(),
    }
}

/// Sigils of an abstract (or parameter) declarator chain, outermost first
fn abstract_sigils(declarator: Option<Node>, source: &str) -> String {
    let mut sigils = String::new();
    let mut current = declarator;
    while let Some(node) = current {
        match node.kind() {
            "pointer_declarator"
            | "abstract_pointer_declarator"
            | "reference_declarator"
            | "abstract_reference_declarator"
            | "array_declarator"
            | "abstract_array_declarator" => {
                sigils.push_str(&sigil(node, source));
                current = inner_declarator(node);
            }
            _ => break,
        }
    }
    sigils
}

/// The abstract function declarator holding a conversion operator's parameters
fn cast_function(cast: Node) -> Option<Node> {
    let mut current = cast.child_by_field_name("declarator");
    while let Some(node) = current {
        if node.kind() == "abstract_function_declarator" {
            return Some(node);
        }
        current = inner_declarator(node);
    }
    None
}

/// Render a type as `[cv ]<base>[ <sigils>]`
fn render_type(holder: Node, ty: Node, sigils: &str, source: &str, scopes: &Scopes) -> String {
    let mut out = String::new();
    for child in all_children(holder) {
        if child.kind() == "type_qualifier" {
            let qualifier = node_text(child, source);
            if matches!(qualifier, "const" | "volatile") {
                out.push_str(qualifier);
                out.push(' ');
            }
        }
    }

    out.push_str(&render_base_type(ty, source, scopes));

    if !sigils.is_empty() {
        out.push(' ');
        out.push_str(sigils);
    }
    out
}

fn render_base_type(ty: Node, source: &str, scopes: &Scopes) -> String {
    if ty.kind() == "type_identifier" {
        let name = node_text(ty, source);
        if let Some(record) = scopes.lookup_record(name) {
            return format!("{} {}", record.keyword, record.qualified_name);
        }
        return name.to_string();
    }

    if let Some(keyword) = record_keyword(ty.kind()) {
        let name = ty.child_by_field_name("name");
        if let Some(record) = name
            .filter(|n| n.kind() == "type_identifier")
            .and_then(|n| scopes.lookup_record(node_text(n, source)))
        {
            return format!("{} {}", record.keyword, record.qualified_name);
        }
        let name = name
            .map(|n| collapse_whitespace(node_text(n, source)))
            .unwrap_or_else(|| "(anonymous)".to_string());
        return format!("{keyword} {name}");
    }

    collapse_whitespace(node_text(ty, source))
}

/// Render a `type_descriptor` (type plus abstract declarator)
fn render_descriptor(descriptor: Node, source: &str, scopes: &Scopes) -> String {
    match descriptor.child_by_field_name("type") {
        Some(ty) => {
            let sigils = abstract_sigils(descriptor.child_by_field_name("declarator"), source);
            render_type(descriptor, ty, &sigils, source, scopes)
        }
        None => collapse_whitespace(node_text(descriptor, source)),
    }
}

fn render_parameter(param: Node, source: &str, scopes: &Scopes) -> String {
    let Some(ty) = param.child_by_field_name("type") else {
        return collapse_whitespace(node_text(param, source));
    };

    let declarator = param.child_by_field_name("declarator");
    let mut innermost = declarator;
    while let Some(node) = innermost {
        match node.kind() {
            "pointer_declarator"
            | "abstract_pointer_declarator"
            | "reference_declarator"
            | "abstract_reference_declarator"
            | "array_declarator"
            | "abstract_array_declarator" => innermost = inner_declarator(node),
            _ => break,
        }
    }
    if innermost.is_some_and(|n| {
        matches!(
            n.kind(),
            "function_declarator" | "abstract_function_declarator" | "parenthesized_declarator"
        )
    }) {
        // Function pointers keep their written form
        return collapse_whitespace(node_text(param, source));
    }

    let rendered = render_type(param, ty, &abstract_sigils(declarator, source), source, scopes);
    if param.kind() == "variadic_parameter_declaration" {
        format!("{rendered}...")
    } else {
        rendered
    }
}

/// Comma-separated parameter types; C-style variadics append `, ...`
fn parameter_list(params: Node, source: &str, scopes: &Scopes) -> String {
    let mut types = Vec::new();
    let mut variadic = false;
    let mut declarator_count = 0;

    for child in all_children(params) {
        match child.kind() {
            "parameter_declaration"
            | "optional_parameter_declaration"
            | "variadic_parameter_declaration" => {
                if child.child_by_field_name("declarator").is_some() {
                    declarator_count += 1;
                }
                types.push(render_parameter(child, source, scopes));
            }
            "..." | "variadic_parameter" => variadic = true,
            _ => {}
        }
    }

    // `f(void)` declares no parameters
    if types.len() == 1 && types[0] == "void" && declarator_count == 0 {
        types.clear();
    }

    let mut out = types.join(", ");
    if variadic {
        out.push_str(", ...");
    }
    out
}

/// Trailing cv- and ref-qualifiers in printing order
fn method_qualifiers(function: Node, source: &str) -> String {
    let mut is_const = false;
    let mut is_volatile = false;
    let mut reference = None;

    for child in all_children(function) {
        match child.kind() {
            "type_qualifier" => match node_text(child, source) {
                "const" => is_const = true,
                "volatile" => is_volatile = true,
                _ => {}
            },
            "ref_qualifier" => reference = Some(node_text(child, source).trim().to_string()),
            _ => {}
        }
    }

    let mut out = String::new();
    if is_const {
        out.push_str(" const");
    }
    if is_volatile {
        out.push_str(" volatile");
    }
    if let Some(reference) = reference {
        out.push(' ');
        out.push_str(&reference);
    }
    out
}

/// Whether a body holds a `return <expr>;` outside nested lambdas
fn returns_value(node: Node) -> bool {
    named_children(node).into_iter().any(|child| match child.kind() {
        "lambda_expression" => false,
        "return_statement" => !named_children(child).is_empty(),
        _ => returns_value(child),
    })
}
