//! Go frontend.
//!
//! The deployable class is a struct type that has methods. Every other struct
//! in the file becomes a record. Only exported methods are recorded.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::{Node, Parser};

use crate::classify::annotation::{self, DIRECTIVE_PREFIX};
use crate::context::GenerationContext;
use crate::diagnostic::CompilerError;
use crate::ir::{
    ClassDefinition, MethodDefinition, ParameterDefinition, Program, PropertyDefinition,
    SourceLanguage, StructLiteral, TypeNode,
};
use super::type_expr::{self, TypeExpr};
use super::{check_syntax, clean_doc, dedupe_methods, select_class, AstGenerator, SourceFile, TypeFallback};

static JSON_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"json:"([^"]*)""#).expect("json tag pattern is valid"));

pub struct GoAstGenerator;

impl AstGenerator for GoAstGenerator {
    fn language(&self) -> &str {
        "go"
    }

    fn extensions(&self) -> Vec<String> {
        vec!["go".to_string()]
    }

    fn generate(&self, source: &SourceFile, ctx: &GenerationContext) -> Result<Program, CompilerError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
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
        visitor.visit_source_file(tree.root_node());
        let program = visitor.into_program()?;
        tracing::debug!(file = %source.path.display(), "parsed go");
        Ok(program)
    }
}

struct GoStruct {
    name: String,
    fields: Vec<PropertyDefinition>,
    comments: Vec<String>,
}

struct Visitor<'a> {
    source: &'a str,
    path: &'a Path,
    fallback: TypeFallback<'a>,
    structs: Vec<GoStruct>,
    /// Methods keyed by receiver type name.
    methods: HashMap<String, Vec<MethodDefinition>>,
}

impl<'a> Visitor<'a> {
    fn new(source: &'a str, path: &'a Path, ctx: &'a GenerationContext) -> Self {
        Self {
            source,
            path,
            fallback: TypeFallback::new(path, ctx),
            structs: Vec::new(),
            methods: HashMap::new(),
        }
    }

    fn node_text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn visit_source_file(&mut self, node: Node) {
        let mut comments: Vec<Node> = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "comment" {
                if comments.last().is_some_and(|prev| !adjacent(*prev, child)) {
                    comments.clear();
                }
                comments.push(child);
                continue;
            }

            let leading: Vec<String> = match comments.last() {
                Some(last) if adjacent(*last, child) => {
                    comments.iter().map(|c| self.node_text(*c).to_string()).collect()
                }
                _ => Vec::new(),
            };
            comments.clear();

            match child.kind() {
                "type_declaration" => self.visit_type_declaration(child, leading),
                "method_declaration" => self.visit_method(child, leading),
                _ => {}
            }
        }
    }

    fn visit_type_declaration(&mut self, node: Node, leading: Vec<String>) {
        let mut cursor = node.walk();
        for spec in node.named_children(&mut cursor) {
            if spec.kind() != "type_spec" {
                continue;
            }
            let (Some(name), Some(ty)) = (spec.child_by_field_name("name"), spec.child_by_field_name("type")) else {
                continue;
            };
            if ty.kind() != "struct_type" {
                continue;
            }
            let name = self.node_text(name).to_string();
            let fields = self.visit_fields(&name, ty);
            self.structs.push(GoStruct {
                name,
                fields,
                comments: leading.clone(),
            });
        }
    }

    fn visit_fields(&self, owner: &str, node: Node) -> Vec<PropertyDefinition> {
        let mut properties = Vec::new();
        let mut walker = node.walk();
        let lists: Vec<Node> = node
            .named_children(&mut walker)
            .filter(|c| c.kind() == "field_declaration_list")
            .collect();

        for list in lists {
            let mut cursor = list.walk();
            for field in list.named_children(&mut cursor) {
                if field.kind() != "field_declaration" {
                    continue;
                }
                let Some(ty) = field.child_by_field_name("type") else { continue };
                let raw = self.node_text(ty);
                let tag = field.child_by_field_name("tag").map(|t| self.node_text(t)).unwrap_or("");
                let tag_name = JSON_TAG.captures(tag).map(|c| c[1].to_string());
                if tag_name.as_deref().is_some_and(|t| t.starts_with('-')) {
                    continue;
                }
                let omitempty = tag_name.as_deref().is_some_and(|t| t.contains(",omitempty"));
                let pointer = ty.kind() == "pointer_type";

                let mut names = field.walk();
                for name in field.children_by_field_name("name", &mut names) {
                    let name = self.node_text(name);
                    if !is_exported(name) {
                        continue;
                    }
                    let wire_name = tag_name
                        .as_deref()
                        .and_then(|t| t.split(',').next())
                        .filter(|t| !t.is_empty())
                        .unwrap_or(name);
                    let property_type = self.map_type(raw, &format!("{}.{}", owner, name));
                    properties.push(PropertyDefinition::new(wire_name, property_type, omitempty || pointer));
                }
            }
        }
        properties
    }

    fn visit_method(&mut self, node: Node, leading: Vec<String>) {
        let (Some(receiver), Some(name)) = (node.child_by_field_name("receiver"), node.child_by_field_name("name")) else {
            return;
        };
        let Some(owner) = self.receiver_type(receiver) else { return };
        let name = self.node_text(name).to_string();
        if !is_exported(&name) {
            return;
        }

        let context = format!("{}.{}", owner, name);
        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.visit_params(p, &context))
            .unwrap_or_default();
        let return_type = self.visit_result(node.child_by_field_name("result"), &context);

        let mut method = MethodDefinition::new(name, return_type);
        method.params = params;
        method.doc_string = doc_of(&leading);
        method.trigger = leading.iter().find_map(|c| annotation::method_directive(c));

        self.methods.entry(owner).or_default().push(method);
    }

    fn receiver_type(&self, receiver: Node) -> Option<String> {
        let mut cursor = receiver.walk();
        let param = receiver
            .named_children(&mut cursor)
            .find(|c| c.kind() == "parameter_declaration")?;
        let ty = param.child_by_field_name("type")?;
        let text = self.node_text(ty).trim_start_matches('*');
        let name = text.split('[').next().unwrap_or(text).trim();
        Some(name.to_string())
    }

    fn visit_params(&self, node: Node, context: &str) -> Vec<ParameterDefinition> {
        let mut params = Vec::new();
        let mut cursor = node.walk();
        for (index, decl) in node.named_children(&mut cursor).enumerate() {
            let variadic = match decl.kind() {
                "parameter_declaration" => false,
                "variadic_parameter_declaration" => true,
                _ => continue,
            };
            let Some(ty) = decl.child_by_field_name("type") else { continue };
            let raw = self.node_text(ty);
            if raw == "context.Context" {
                continue;
            }

            let mut names_cursor = decl.walk();
            let mut names: Vec<String> = decl
                .children_by_field_name("name", &mut names_cursor)
                .map(|n| self.node_text(n).to_string())
                .collect();
            if names.is_empty() {
                names.push(format!("arg{}", index));
            }

            for name in names {
                let param_type = self.map_type(raw, &format!("{}({})", context, name));
                let param_type = if variadic { TypeNode::array(param_type) } else { param_type };
                let raw_type = if variadic { format!("...{}", raw) } else { raw.to_string() };
                params.push(ParameterDefinition::new(name, raw_type, param_type));
            }
        }
        params
    }

    /// `(T, error)` returns `T`; a lone `error` returns nothing.
    fn visit_result(&self, result: Option<Node>, context: &str) -> TypeNode {
        let Some(result) = result else {
            return TypeNode::VoidLiteral;
        };
        let mut types: Vec<&str> = if result.kind() == "parameter_list" {
            let mut cursor = result.walk();
            let mut out = Vec::new();
            for decl in result.named_children(&mut cursor) {
                let Some(ty) = decl.child_by_field_name("type") else { continue };
                let mut names = decl.walk();
                let count = decl.children_by_field_name("name", &mut names).count().max(1);
                out.extend(std::iter::repeat(self.node_text(ty)).take(count));
            }
            out
        } else {
            vec![self.node_text(result)]
        };

        if types.last() == Some(&"error") {
            types.pop();
        }
        let context = format!("{} return", context);
        match types.as_slice() {
            [] => TypeNode::VoidLiteral,
            [single] => self.map_type(single, &context),
            _ => self.fallback.any(&context, self.node_text(result)),
        }
    }

    fn map_type(&self, raw: &str, context: &str) -> TypeNode {
        go_type(&type_expr::parse(raw)).unwrap_or_else(|| self.fallback.any(context, raw))
    }

    fn into_program(mut self) -> Result<Program, CompilerError> {
        let mut candidates = Vec::new();
        for record in &self.structs {
            let Some(mut methods) = self.methods.remove(&record.name) else { continue };
            dedupe_methods(&mut methods);
            candidates.push(ClassDefinition {
                name: record.name.clone(),
                path: self.path.to_string_lossy().to_string(),
                doc_string: doc_of(&record.comments),
                methods,
                trigger: record.comments.iter().find_map(|c| annotation::class_directive(c)),
            });
        }

        let class = select_class(candidates).ok_or_else(|| CompilerError::NoClassFound {
            file: self.path.to_path_buf(),
        })?;

        let path = self.path.to_string_lossy().to_string();
        let records = self
            .structs
            .into_iter()
            .filter(|s| s.name != class.name)
            .map(|s| {
                let mut record = StructLiteral::new(s.name, s.fields);
                record.path = Some(path.clone());
                record
            })
            .collect();

        Ok(Program::new(SourceLanguage::Go, class, records))
    }
}

/// Go's type rules. `None` means the caller degrades.
fn go_type(expr: &TypeExpr) -> Option<TypeNode> {
    match expr {
        TypeExpr::Named { name, args } if args.is_empty() => Some(match name.as_str() {
            "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16" | "uint32"
            | "uint64" | "uintptr" | "byte" | "rune" => TypeNode::IntegerLiteral,
            "float32" | "float64" => TypeNode::DoubleLiteral,
            "bool" => TypeNode::BooleanLiteral,
            "string" => TypeNode::StringLiteral,
            "interface{}" | "any" => TypeNode::AnyLiteral,
            "time.Time" => TypeNode::DateType,
            qualified if qualified.contains('.') => return None,
            local => TypeNode::custom(local),
        }),
        TypeExpr::Array(inner) => Some(TypeNode::array(go_type(inner)?)),
        TypeExpr::Map(key, value) => Some(TypeNode::map(go_type(key)?, go_type(value)?)),
        TypeExpr::Pointer(inner) => go_type(inner),
        _ => None,
    }
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn adjacent(comment: Node, next: Node) -> bool {
    comment.end_position().row + 1 >= next.start_position().row
}

/// Doc text from `//` comment lines, directives removed.
fn doc_of(comments: &[String]) -> Option<String> {
    let text: Vec<&str> = comments
        .iter()
        .map(String::as_str)
        .filter(|c| !c.contains(DIRECTIVE_PREFIX))
        .collect();
    clean_doc(&text.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TriggerType;

    const SOURCE: &str = r#"
package greeter

import (
    "context"
    "time"
)

// User is a person.
type User struct {
    Name    string            `json:"name"`
    Email   *string           `json:"email,omitempty"`
    Tags    []string          `json:"tags"`
    Scores  map[string]float64
    secret  string
    Skipped string `json:"-"`
}

// Greeter says hello.
// polyrpc: deploy
type Greeter struct {
    prefix string
}

// Hello greets a user.
func (g *Greeter) Hello(ctx context.Context, user User, times int) (string, error) {
    return g.prefix + user.Name, nil
}

// polyrpc: cron */5 * * * *
func (g Greeter) Tick() error { return nil }

func (g *Greeter) Since(at time.Time, names ...string) (a, b int) { return 0, 0 }

func (g *Greeter) private() {}
"#;

    #[test]
    fn test_parse_greeter() {
        let ctx = GenerationContext::new();
        let program = GoAstGenerator
            .generate(&SourceFile::new("greeter.go", SOURCE), &ctx)
            .unwrap();
        assert_eq!(program.original_language, SourceLanguage::Go);

        let class = program.class().unwrap();
        assert_eq!(class.name, "Greeter");
        assert_eq!(class.doc_string.as_deref(), Some("Greeter says hello."));
        assert!(class.trigger.is_some());
        let names: Vec<_> = class.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Hello", "Tick", "Since"]);

        let hello = &class.methods[0];
        assert_eq!(hello.doc_string.as_deref(), Some("Hello greets a user."));
        assert_eq!(hello.params.len(), 2);
        assert_eq!(hello.params[0].param_type, TypeNode::custom("User"));
        assert_eq!(hello.params[1].param_type, TypeNode::IntegerLiteral);
        assert_eq!(hello.return_type, TypeNode::StringLiteral);

        let tick = &class.methods[1];
        assert_eq!(tick.return_type, TypeNode::VoidLiteral);
        let trigger = tick.trigger.clone().unwrap();
        assert_eq!(trigger.trigger, TriggerType::Cron);
        assert_eq!(trigger.cron_string.as_deref(), Some("*/5 * * * *"));

        let since = &class.methods[2];
        assert_eq!(since.params[0].param_type, TypeNode::DateType);
        assert_eq!(since.params[1].param_type, TypeNode::array(TypeNode::StringLiteral));
        assert_eq!(since.return_type, TypeNode::AnyLiteral);
        assert_eq!(ctx.warnings.snapshot().len(), 1);
    }

    #[test]
    fn test_parse_records() {
        let ctx = GenerationContext::new();
        let program = GoAstGenerator
            .generate(&SourceFile::new("greeter.go", SOURCE), &ctx)
            .unwrap();
        let user = program.find_struct("User").unwrap();
        let props: Vec<_> = user
            .type_literal
            .properties
            .iter()
            .map(|p| (p.name.as_str(), p.optional))
            .collect();
        assert_eq!(
            props,
            vec![("name", false), ("email", true), ("tags", false), ("Scores", false)]
        );
        assert_eq!(
            user.type_literal.properties[3].property_type,
            TypeNode::map(TypeNode::StringLiteral, TypeNode::DoubleLiteral)
        );
        assert!(program.find_struct("Greeter").is_none());
    }

    #[test]
    fn test_struct_without_methods_is_not_a_class() {
        let ctx = GenerationContext::new();
        let result = GoAstGenerator.generate(
            &SourceFile::new("models.go", "package models\n\ntype User struct { Name string }\n"),
            &ctx,
        );
        assert!(matches!(result, Err(CompilerError::NoClassFound { .. })));
    }

    #[test]
    fn test_go_type_rules() {
        let map = |raw: &str| go_type(&type_expr::parse(raw));
        assert_eq!(map("uint64"), Some(TypeNode::IntegerLiteral));
        assert_eq!(map("*User"), Some(TypeNode::custom("User")));
        assert_eq!(map("[]map[string]interface{}"), Some(TypeNode::array(TypeNode::map(
            TypeNode::StringLiteral,
            TypeNode::AnyLiteral
        ))));
        assert_eq!(map("json.RawMessage"), None);
        assert_eq!(map("chan int"), None);
    }
}
