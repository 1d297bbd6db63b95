//! TypeScript / JavaScript parser using tree-sitter.
//!
//! Both dialects share class syntax, so one visitor serves both frontends.
//! In JavaScript, types come only from JSDoc tags.

use std::path::Path;

use tree_sitter::{Node, Parser};

use crate::classify::annotation;
use crate::codegen::naming::to_pascal_case;
use crate::context::GenerationContext;
use crate::diagnostic::CompilerError;
use crate::frontend::{check_syntax, clean_doc, dedupe_methods, select_class, type_expr, SourceFile, TypeFallback};
use crate::ir::{
    ClassDefinition, DefaultValue, MethodDefinition, MethodKind, ParameterDefinition, Program,
    PropertyDefinition, SourceLanguage, StructLiteral, TriggerAnnotation, TypeNode,
};
use super::jsdoc::JsDoc;
use super::types;

fn inline_record_name(context: &str) -> String {
    context
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .map(to_pascal_case)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    TypeScript,
    Tsx,
    JavaScript,
}

impl Dialect {
    fn language(self) -> tree_sitter::Language {
        match self {
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Dialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }

    fn source_language(self) -> SourceLanguage {
        match self {
            Dialect::TypeScript | Dialect::Tsx => SourceLanguage::Ts,
            Dialect::JavaScript => SourceLanguage::Js,
        }
    }
}

/// Parses one file of the given dialect into a program.
pub fn parse(dialect: Dialect, source: &SourceFile, ctx: &GenerationContext) -> Result<Program, CompilerError> {
    let mut parser = Parser::new();
    parser
        .set_language(&dialect.language())
        .map_err(|_| CompilerError::ParserInitFailed)?;

    let tree = parser
        .parse(&source.content, None)
        .ok_or_else(|| CompilerError::ParseError {
            message: "parser produced no tree".to_string(),
            file: source.path.clone(),
            line: 1,
            column: 1,
        })?;

    let root = tree.root_node();
    check_syntax(root, &source.path)?;

    let mut visitor = Visitor::new(dialect, &source.content, &source.path, ctx);
    visitor.visit_program(root);

    let class = select_class(visitor.classes).ok_or_else(|| CompilerError::NoClassFound {
        file: source.path.clone(),
    })?;

    Ok(Program::new(dialect.source_language(), class, visitor.structs))
}

/// AST visitor that extracts declarations from tree-sitter nodes.
struct Visitor<'a> {
    dialect: Dialect,
    source: &'a str,
    path: &'a Path,
    fallback: TypeFallback<'a>,
    classes: Vec<ClassDefinition>,
    structs: Vec<StructLiteral>,
}

/// Comments and decorators seen right before a declaration.
#[derive(Default)]
struct Leading<'t> {
    nodes: Vec<Node<'t>>,
}

impl<'a> Visitor<'a> {
    fn new(dialect: Dialect, source: &'a str, path: &'a Path, ctx: &'a GenerationContext) -> Self {
        Self {
            dialect,
            source,
            path,
            fallback: TypeFallback::new(path, ctx),
            classes: Vec::new(),
            structs: Vec::new(),
        }
    }

    fn node_text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn visit_program(&mut self, node: Node) {
        let mut leading = Leading::default();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "comment" | "decorator" => {
                    leading.nodes.push(child);
                    continue;
                }
                "export_statement" => self.visit_export(child, &leading),
                "class_declaration" | "abstract_class_declaration" => {
                    self.visit_class(child, &leading)
                }
                "type_alias_declaration" => self.visit_type_alias(child),
                "interface_declaration" => self.visit_interface(child),
                _ => {}
            }
            leading.nodes.clear();
        }
    }

    fn visit_export(&mut self, node: Node, outer: &Leading) {
        let mut leading = Leading { nodes: outer.nodes.clone() };
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "decorator" | "comment" => leading.nodes.push(child),
                "class_declaration" | "abstract_class_declaration" => {
                    self.visit_class(child, &leading)
                }
                "type_alias_declaration" => self.visit_type_alias(child),
                "interface_declaration" => self.visit_interface(child),
                _ => {}
            }
        }
    }

    fn visit_class(&mut self, node: Node, leading: &Leading) {
        let Some(name) = node.child_by_field_name("name").map(|n| self.node_text(n).to_string()) else {
            return;
        };

        let mut annotations = leading.nodes.clone();
        let mut cursor = node.walk();
        annotations.extend(node.children(&mut cursor).filter(|c| c.kind() == "decorator"));

        let mut methods = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut pending: Vec<Node> = Vec::new();
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                match child.kind() {
                    "comment" | "decorator" => pending.push(child),
                    "method_definition" => {
                        if let Some(method) = self.visit_method(&name, child, &pending) {
                            methods.push(method);
                        }
                        pending.clear();
                    }
                    "{" | "}" | ";" | "," => {}
                    _ => pending.clear(),
                }
            }
        }
        dedupe_methods(&mut methods);

        self.classes.push(ClassDefinition {
            name,
            path: self.path.to_string_lossy().to_string(),
            doc_string: self.doc_of(&annotations),
            methods,
            trigger: self.class_trigger(&annotations),
        });
    }

    fn visit_method(&self, class: &str, node: Node, leading: &[Node]) -> Option<MethodDefinition> {
        let name_node = node.child_by_field_name("name")?;
        if name_node.kind() == "private_property_identifier" {
            return None;
        }
        let name = self.node_text(name_node).to_string();

        let mut annotations = leading.to_vec();
        let mut is_static = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "accessibility_modifier" => {
                    if matches!(self.node_text(child), "private" | "protected") {
                        return None;
                    }
                }
                "static" => is_static = true,
                "get" | "set" => return None,
                "decorator" => annotations.push(child),
                _ => {}
            }
        }

        let kind = if name == "constructor" {
            MethodKind::Constructor
        } else {
            MethodKind::Method
        };

        let context = format!("{}.{}", class, name);
        let jsdoc = self.jsdoc_of(&annotations);
        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.visit_params(p, &context, jsdoc.as_ref()))
            .unwrap_or_default();

        let return_type = match node.child_by_field_name("return_type") {
            Some(annotation) => self.visit_type(annotation, &format!("{} return", context)),
            None => jsdoc
                .as_ref()
                .and_then(|doc| doc.returns.as_deref())
                .map(|raw| self.text_type(raw, &format!("{} return", context)))
                .unwrap_or(TypeNode::AnyLiteral),
        };

        Some(MethodDefinition {
            name,
            kind,
            is_static,
            return_type,
            params,
            doc_string: self.doc_of(&annotations),
            trigger: self.method_trigger(&annotations),
        })
    }

    fn visit_params(&self, node: Node, context: &str, jsdoc: Option<&JsDoc>) -> Vec<ParameterDefinition> {
        let mut params = Vec::new();
        let mut cursor = node.walk();
        for (index, child) in node.named_children(&mut cursor).enumerate() {
            let (pattern, type_node, value, optional) = match child.kind() {
                "required_parameter" | "optional_parameter" => (
                    child.child_by_field_name("pattern"),
                    child.child_by_field_name("type"),
                    child.child_by_field_name("value"),
                    child.kind() == "optional_parameter",
                ),
                "assignment_pattern" => (
                    child.child_by_field_name("left"),
                    None,
                    child.child_by_field_name("right"),
                    true,
                ),
                "identifier" | "rest_pattern" | "object_pattern" | "array_pattern" => {
                    (Some(child), None, None, false)
                }
                _ => continue,
            };
            let Some(pattern) = pattern else { continue };
            if pattern.kind() == "this" {
                continue;
            }

            let name = self.pattern_name(pattern, index);
            let param_context = format!("{}({})", context, name);
            let (raw_type, param_type) = match type_node {
                Some(annotation) => {
                    let inner = annotation.named_child(0).unwrap_or(annotation);
                    (self.node_text(inner).to_string(), self.visit_type(annotation, &param_context))
                }
                None => match jsdoc.and_then(|doc| doc.params.get(&name)) {
                    Some(raw) => (raw.clone(), self.text_type(raw, &param_context)),
                    None => (String::new(), TypeNode::AnyLiteral),
                },
            };
            let param_type = if pattern.kind() == "rest_pattern" && !matches!(param_type, TypeNode::ArrayType { .. }) {
                TypeNode::array(param_type)
            } else {
                param_type
            };

            params.push(ParameterDefinition {
                name,
                raw_type,
                param_type,
                optional: optional || value.is_some(),
                default_value: value.map(|v| self.default_value(v)),
            });
        }
        params
    }

    fn pattern_name(&self, pattern: Node, index: usize) -> String {
        match pattern.kind() {
            "identifier" => self.node_text(pattern).to_string(),
            "rest_pattern" => pattern
                .named_child(0)
                .filter(|n| n.kind() == "identifier")
                .map(|n| self.node_text(n).to_string())
                .unwrap_or_else(|| format!("arg{}", index)),
            _ => format!("arg{}", index),
        }
    }

    fn default_value(&self, node: Node) -> DefaultValue {
        let text = self.node_text(node);
        match node.kind() {
            "string" => DefaultValue::StringLiteral(text.trim_matches(|c| c == '"' || c == '\'').to_string()),
            _ => DefaultValue::Literal(text.to_string()),
        }
    }

    // =========================================================================
    // Records
    // =========================================================================

    fn visit_type_alias(&mut self, node: Node) {
        let (Some(name), Some(value)) = (node.child_by_field_name("name"), node.child_by_field_name("value")) else {
            return;
        };
        if value.kind() != "object_type" || self.has_index_signature(value) {
            return;
        }
        let name = self.node_text(name).to_string();
        let properties = self.visit_members(&name, value);
        self.push_struct(name, properties);
    }

    fn visit_interface(&mut self, node: Node) {
        let (Some(name), Some(body)) = (node.child_by_field_name("name"), node.child_by_field_name("body")) else {
            return;
        };
        let name = self.node_text(name).to_string();
        let properties = self.visit_members(&name, body);
        self.push_struct(name, properties);
    }

    fn push_struct(&mut self, name: String, properties: Vec<PropertyDefinition>) {
        let mut record = StructLiteral::new(name, properties);
        record.path = Some(self.path.to_string_lossy().to_string());
        self.structs.push(record);
    }

    fn visit_members(&self, owner: &str, node: Node) -> Vec<PropertyDefinition> {
        let mut properties = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "property_signature" {
                continue;
            }
            let Some(name) = child.child_by_field_name("name") else { continue };
            let name = self.node_text(name).to_string();
            let mut inner = child.walk();
            let optional = child.children(&mut inner).any(|c| c.kind() == "?");
            let property_type = child
                .child_by_field_name("type")
                .map(|t| self.visit_type(t, &format!("{}.{}", owner, name)))
                .unwrap_or(TypeNode::AnyLiteral);
            properties.push(PropertyDefinition::new(name, property_type, optional));
        }
        properties
    }

    fn has_index_signature(&self, node: Node) -> bool {
        let mut cursor = node.walk();
        let found = node.named_children(&mut cursor).any(|c| c.kind() == "index_signature");
        found
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn visit_type(&self, node: Node, context: &str) -> TypeNode {
        let text = self.node_text(node);
        match node.kind() {
            "type_annotation" | "parenthesized_type" | "readonly_type" => match node.named_child(0) {
                Some(inner) => self.visit_type(inner, context),
                None => TypeNode::AnyLiteral,
            },
            "predefined_type" => types::predefined(text).unwrap_or_else(|| self.fallback.any(context, text)),
            "type_identifier" => types::named(text),
            "nested_type_identifier" => TypeNode::custom(text),
            "array_type" => match node.named_child(0) {
                Some(inner) => TypeNode::array(self.visit_type(inner, context)),
                None => TypeNode::array(TypeNode::AnyLiteral),
            },
            "generic_type" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.node_text(n))
                    .unwrap_or_default();
                let args: Vec<TypeNode> = match node.child_by_field_name("type_arguments") {
                    Some(list) => {
                        let mut cursor = list.walk();
                        let args: Vec<Node> = list.named_children(&mut cursor).collect();
                        args.into_iter().map(|a| self.visit_type(a, context)).collect()
                    }
                    None => Vec::new(),
                };
                types::generic(name, args).unwrap_or_else(|| self.fallback.any(context, text))
            }
            "union_type" => {
                let mut members = Vec::new();
                self.flatten_union(node, &mut members);
                let non_null: Vec<Node> = members
                    .into_iter()
                    .filter(|m| !matches!(self.node_text(*m), "null" | "undefined"))
                    .collect();
                match non_null.as_slice() {
                    [single] => self.visit_type(*single, context),
                    many if !many.is_empty() && many.iter().all(|m| self.is_string_literal(*m)) => {
                        TypeNode::StringLiteral
                    }
                    _ => self.fallback.any(context, text),
                }
            }
            "literal_type" => match node.named_child(0).map(|n| n.kind()) {
                Some("string") | Some("template_string") => TypeNode::StringLiteral,
                Some("number") | Some("unary_expression") => TypeNode::DoubleLiteral,
                Some("true") | Some("false") => TypeNode::BooleanLiteral,
                Some("null") | Some("undefined") => TypeNode::VoidLiteral,
                _ => self.fallback.any(context, text),
            },
            "object_type" => self
                .index_signature(node, context)
                .or_else(|| self.inline_record(node, context))
                .unwrap_or_else(|| self.fallback.any(context, text)),
            _ => self.fallback.any(context, text),
        }
    }

    fn flatten_union<'t>(&self, node: Node<'t>, out: &mut Vec<Node<'t>>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "union_type" {
                self.flatten_union(child, out);
            } else {
                out.push(child);
            }
        }
    }

    fn is_string_literal(&self, node: Node) -> bool {
        node.kind() == "literal_type" && node.named_child(0).is_some_and(|n| n.kind() == "string")
    }

    /// `{ [key: K]: V }` becomes a map.
    fn index_signature(&self, node: Node, context: &str) -> Option<TypeNode> {
        let mut cursor = node.walk();
        let signature = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "index_signature")?;
        let key = signature
            .child_by_field_name("index_type")
            .map(|k| self.visit_type(k, context))
            .unwrap_or(TypeNode::StringLiteral);
        let value = signature
            .child_by_field_name("type")
            .map(|v| self.visit_type(v, context))
            .unwrap_or(TypeNode::AnyLiteral);
        Some(TypeNode::map(key, value))
    }

    /// `{ sku: string }` written in a signature becomes a record named after
    /// where it appears, e.g. `ShopBuyItem` for parameter `item` of `Shop.buy`.
    fn inline_record(&self, node: Node, context: &str) -> Option<TypeNode> {
        let name = inline_record_name(context);
        let properties = self.visit_members(&name, node);
        if properties.is_empty() {
            return None;
        }
        let mut record = StructLiteral::new(name, properties);
        record.path = Some(self.path.to_string_lossy().to_string());
        Some(TypeNode::StructLiteral(record))
    }

    /// Maps a type written as text (JSDoc) with the TypeScript rules.
    fn text_type(&self, raw: &str, context: &str) -> TypeNode {
        types::from_expr(&type_expr::parse(raw)).unwrap_or_else(|| self.fallback.any(context, raw))
    }

    // =========================================================================
    // Annotations
    // =========================================================================

    fn doc_of(&self, nodes: &[Node]) -> Option<String> {
        nodes
            .iter()
            .rev()
            .filter(|n| n.kind() == "comment")
            .map(|n| self.node_text(*n))
            .find(|text| text.starts_with("/**"))
            .and_then(clean_doc)
    }

    fn jsdoc_of(&self, nodes: &[Node]) -> Option<JsDoc> {
        if self.dialect != Dialect::JavaScript {
            return None;
        }
        nodes
            .iter()
            .rev()
            .filter(|n| n.kind() == "comment")
            .map(|n| self.node_text(*n))
            .find(|text| text.starts_with("/**"))
            .map(JsDoc::parse)
    }

    fn class_trigger(&self, nodes: &[Node]) -> Option<TriggerAnnotation> {
        nodes.iter().find_map(|n| match n.kind() {
            "decorator" => annotation::decorator(self.node_text(*n)),
            _ => annotation::class_directive(self.node_text(*n)),
        })
    }

    fn method_trigger(&self, nodes: &[Node]) -> Option<TriggerAnnotation> {
        nodes.iter().find_map(|n| match n.kind() {
            "decorator" => annotation::decorator(self.node_text(*n)),
            _ => annotation::method_directive(self.node_text(*n)),
        })
    }
}

