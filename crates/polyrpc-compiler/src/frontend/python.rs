//! Python frontend.
//!
//! Classes with methods are deployable candidates. Classes holding annotated
//! fields (dataclasses, pydantic models, `TypedDict`s) become records.

use std::path::Path;

use tree_sitter::{Node, Parser};

use crate::classify::annotation;
use crate::context::GenerationContext;
use crate::diagnostic::CompilerError;
use crate::ir::{
    ClassDefinition, DefaultValue, MethodDefinition, MethodKind, ParameterDefinition, Program,
    PropertyDefinition, SourceLanguage, StructLiteral, TriggerAnnotation, TypeNode,
};
use super::type_expr::{self, TypeExpr};
use super::{check_syntax, clean_doc, dedupe_methods, select_class, AstGenerator, SourceFile, TypeFallback};

pub struct PythonAstGenerator;

impl AstGenerator for PythonAstGenerator {
    fn language(&self) -> &str {
        "python"
    }

    fn extensions(&self) -> Vec<String> {
        vec!["py".to_string()]
    }

    fn generate(&self, source: &SourceFile, ctx: &GenerationContext) -> Result<Program, CompilerError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|_| CompilerError::ParserInitFailed)?;
        let tree = parser
            .parse(&source.content, None)
            .ok_or_else(|| CompilerError::ParseError {
                message: "parser produced no tree".to_string(),
                file: source.path.clone(),
                line: 1,
                column: 1,
            })?;
        check_syntax(tree.root_node(), &source.path)?;

        let mut visitor = Visitor::new(&source.content, &source.path, ctx);
        visitor.visit_module(tree.root_node());

        let path = source.path.to_string_lossy().to_string();
        let candidates: Vec<ClassDefinition> = visitor
            .classes
            .iter()
            .filter(|c| c.has_methods)
            .map(|c| c.definition.clone())
            .collect();
        let class = select_class(candidates).ok_or_else(|| CompilerError::NoClassFound {
            file: source.path.clone(),
        })?;

        let records = visitor
            .classes
            .into_iter()
            .filter(|c| c.definition.name != class.name && !c.fields.is_empty())
            .map(|c| {
                let mut record = StructLiteral::new(c.definition.name, c.fields);
                record.path = Some(path.clone());
                record
            })
            .collect();

        tracing::debug!(file = %source.path.display(), class = %class.name, "parsed python");
        Ok(Program::new(SourceLanguage::Python, class, records))
    }
}

struct PyClass {
    definition: ClassDefinition,
    fields: Vec<PropertyDefinition>,
    has_methods: bool,
}

struct Visitor<'a> {
    source: &'a str,
    path: &'a Path,
    fallback: TypeFallback<'a>,
    classes: Vec<PyClass>,
}

impl<'a> Visitor<'a> {
    fn new(source: &'a str, path: &'a Path, ctx: &'a GenerationContext) -> Self {
        Self {
            source,
            path,
            fallback: TypeFallback::new(path, ctx),
            classes: Vec::new(),
        }
    }

    fn node_text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn visit_module(&mut self, node: Node) {
        let mut comments: Vec<Node> = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "comment" => {
                    comments.push(child);
                    continue;
                }
                "class_definition" => self.visit_class(child, &comments),
                "decorated_definition" => {
                    if let Some(def) = child.child_by_field_name("definition") {
                        if def.kind() == "class_definition" {
                            self.visit_class(def, &comments);
                        }
                    }
                }
                _ => {}
            }
            comments.clear();
        }
    }

    fn visit_class(&mut self, node: Node, comments: &[Node]) {
        let Some(name) = node.child_by_field_name("name").map(|n| self.node_text(n).to_string()) else {
            return;
        };
        let trigger = comments
            .iter()
            .find_map(|c| annotation::class_directive(self.node_text(*c)));

        let mut methods = Vec::new();
        let mut fields = Vec::new();
        let mut doc_string = None;
        if let Some(body) = node.child_by_field_name("body") {
            doc_string = self.docstring(body);
            let mut pending: Vec<Node> = Vec::new();
            let mut cursor = body.walk();
            for child in body.named_children(&mut cursor) {
                match child.kind() {
                    "comment" => {
                        pending.push(child);
                        continue;
                    }
                    "function_definition" => {
                        if let Some(method) = self.visit_method(&name, child, &[], &pending) {
                            methods.push(method);
                        }
                    }
                    "decorated_definition" => {
                        let decorators = self.decorators(child);
                        if let Some(def) = child.child_by_field_name("definition") {
                            if def.kind() == "function_definition" {
                                if let Some(method) = self.visit_method(&name, def, &decorators, &pending) {
                                    methods.push(method);
                                }
                            }
                        }
                    }
                    "expression_statement" => {
                        if let Some(field) = self.visit_field(&name, child) {
                            fields.push(field);
                        }
                    }
                    _ => {}
                }
                pending.clear();
            }
        }
        dedupe_methods(&mut methods);

        let has_methods = !methods.is_empty();
        self.classes.push(PyClass {
            definition: ClassDefinition {
                name,
                path: self.path.to_string_lossy().to_string(),
                doc_string,
                methods,
                trigger,
            },
            fields,
            has_methods,
        });
    }

    fn decorators(&self, node: Node) -> Vec<&'a str> {
        let mut cursor = node.walk();
        let decorators = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "decorator")
            .map(|c| self.node_text(c).trim_start_matches('@').trim())
            .collect();
        decorators
    }

    fn visit_method(
        &self,
        class: &str,
        node: Node,
        decorators: &[&str],
        comments: &[Node],
    ) -> Option<MethodDefinition> {
        let name = self.node_text(node.child_by_field_name("name")?).to_string();
        let kind = if name == "__init__" {
            MethodKind::Constructor
        } else if name.starts_with('_') {
            return None;
        } else {
            MethodKind::Method
        };
        if decorators.iter().any(|d| *d == "property" || d.ends_with(".setter")) {
            return None;
        }
        let is_static = decorators.contains(&"staticmethod");

        let context = format!("{}.{}", class, name);
        let mut cursor = node.walk();
        let is_async = node.children(&mut cursor).any(|c| c.kind() == "async");

        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.visit_params(p, &context, !is_static))
            .unwrap_or_default();

        let return_type = match node.child_by_field_name("return_type") {
            Some(ty) => self.map_type(self.node_text(ty), &format!("{} return", context)),
            None => TypeNode::AnyLiteral,
        };
        let return_type = if is_async {
            TypeNode::promise(return_type)
        } else {
            return_type
        };

        let trigger = comments
            .iter()
            .find_map(|c| annotation::method_directive(self.node_text(*c)))
            .or_else(|| decorators.iter().find_map(|d| decorator_trigger(d)));

        Some(MethodDefinition {
            name,
            kind,
            is_static,
            return_type,
            params,
            doc_string: node.child_by_field_name("body").and_then(|b| self.docstring(b)),
            trigger,
        })
    }

    fn visit_params(&self, node: Node, context: &str, drop_receiver: bool) -> Vec<ParameterDefinition> {
        let mut params = Vec::new();
        let mut cursor = node.walk();
        for (index, child) in node.named_children(&mut cursor).enumerate() {
            let (name_node, type_node, value) = match child.kind() {
                "identifier" => (Some(child), None, None),
                "typed_parameter" => (child.named_child(0), child.child_by_field_name("type"), None),
                "default_parameter" => (child.child_by_field_name("name"), None, child.child_by_field_name("value")),
                "typed_default_parameter" => (
                    child.child_by_field_name("name"),
                    child.child_by_field_name("type"),
                    child.child_by_field_name("value"),
                ),
                _ => continue,
            };
            let Some(name_node) = name_node else { continue };
            // `*args: int` keeps its splat inside the typed parameter.
            if matches!(name_node.kind(), "list_splat_pattern" | "dictionary_splat_pattern") {
                continue;
            }
            let name = self.node_text(name_node).to_string();
            if index == 0 && drop_receiver && matches!(name.as_str(), "self" | "cls") {
                continue;
            }

            let raw_type = type_node.map(|t| self.node_text(t)).unwrap_or("");
            let param_type = match type_node {
                Some(_) => self.map_type(raw_type, &format!("{}({})", context, name)),
                None => TypeNode::AnyLiteral,
            };
            let mut param = ParameterDefinition::new(name, raw_type, param_type);
            if let Some(value) = value {
                param.optional = true;
                param.default_value = Some(self.default_value(value));
            }
            params.push(param);
        }
        params
    }

    fn default_value(&self, node: Node) -> DefaultValue {
        let text = self.node_text(node);
        if node.kind() == "string" {
            DefaultValue::StringLiteral(text.trim_matches(|c| c == '"' || c == '\'').to_string())
        } else {
            DefaultValue::Literal(text.to_string())
        }
    }

    /// `name: T` or `name: T = value` inside a class body.
    fn visit_field(&self, owner: &str, node: Node) -> Option<PropertyDefinition> {
        let assignment = node.named_child(0).filter(|n| n.kind() == "assignment")?;
        let left = assignment.child_by_field_name("left")?;
        let ty = assignment.child_by_field_name("type")?;
        if left.kind() != "identifier" {
            return None;
        }
        let name = self.node_text(left);
        if name.starts_with('_') {
            return None;
        }
        let raw = self.node_text(ty);
        let parsed = type_expr::parse(raw);
        let optional = assignment.child_by_field_name("right").is_some() || is_optional(&parsed);
        let property_type = self.map_type(raw, &format!("{}.{}", owner, name));
        Some(PropertyDefinition::new(name, property_type, optional))
    }

    /// The first string statement of a block.
    fn docstring(&self, body: Node) -> Option<String> {
        let mut cursor = body.walk();
        let first = body.named_children(&mut cursor).find(|c| c.kind() != "comment")?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let string = first.named_child(0).filter(|n| n.kind() == "string")?;
        clean_doc(self.node_text(string))
    }

    fn map_type(&self, raw: &str, context: &str) -> TypeNode {
        python_type(&type_expr::parse(raw)).unwrap_or_else(|| self.fallback.any(context, raw))
    }
}

/// Reads `@PolyrpcMethod(type="cron", cron_string="...")` decorators.
fn decorator_trigger(decorator: &str) -> Option<TriggerAnnotation> {
    annotation::decorator(&decorator.replace("cron_string", "cronString").replace('=', ":"))
}

fn is_optional(expr: &TypeExpr) -> bool {
    match expr {
        TypeExpr::Named { name, .. } => name == "Optional" || name == "typing.Optional",
        TypeExpr::Union(members) => members.iter().any(TypeExpr::is_null),
        _ => false,
    }
}

/// Python's type rules. `None` means the caller degrades.
fn python_type(expr: &TypeExpr) -> Option<TypeNode> {
    let TypeExpr::Named { name, args } = expr else {
        return match expr {
            TypeExpr::Union(_) => python_type(expr.without_null()?),
            TypeExpr::Literal(text) if text.starts_with(['"', '\'']) => {
                python_type(&type_expr::parse(text.trim_matches(['"', '\''])))
            }
            _ => None,
        };
    };
    let name = name.strip_prefix("typing.").unwrap_or(name);
    let ty = match (name, args.as_slice()) {
        ("str", []) => TypeNode::StringLiteral,
        ("int", []) => TypeNode::IntegerLiteral,
        ("float", []) => TypeNode::DoubleLiteral,
        ("bool", []) => TypeNode::BooleanLiteral,
        ("Any" | "object", []) => TypeNode::AnyLiteral,
        ("None", []) => TypeNode::VoidLiteral,
        ("datetime" | "datetime.datetime" | "date" | "datetime.date", []) => TypeNode::DateType,
        ("list" | "List" | "Sequence" | "Iterable" | "set" | "Set", []) => TypeNode::array(TypeNode::AnyLiteral),
        ("list" | "List" | "Sequence" | "Iterable" | "set" | "Set", [inner]) => TypeNode::array(python_type(inner)?),
        ("dict" | "Dict" | "Mapping", []) => TypeNode::map(TypeNode::StringLiteral, TypeNode::AnyLiteral),
        ("dict" | "Dict" | "Mapping", [key, value]) => TypeNode::map(python_type(key)?, python_type(value)?),
        ("Optional", [inner]) => python_type(inner)?,
        ("Union", members) => {
            let union = TypeExpr::Union(members.to_vec());
            python_type(union.without_null()?)?
        }
        (_, []) if !name.contains('.') => TypeNode::custom(name),
        _ => return None,
    };
    Some(ty)
}
