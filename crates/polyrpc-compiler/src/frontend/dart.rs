//! Dart frontend.
//!
//! Dart sources are read by an AOT-compiled helper that prints:
//!
//! ```json
//! { "classes": [{ "name": "Greeter",
//!                 "methods": [{ "name": "hello", "returnType": "Future<String>",
//!                               "parameters": [{ "name": "name", "type": "String" }] }],
//!                 "fields": [] }] }
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::context::GenerationContext;
use crate::diagnostic::CompilerError;
use crate::ir::{
    ClassDefinition, MethodDefinition, ParameterDefinition, Program, PropertyDefinition,
    SourceLanguage, StructLiteral, TypeNode,
};
use super::toolchain::HelperToolchain;
use super::type_expr::{self, TypeExpr};
use super::{dedupe_methods, select_class, AstGenerator, SourceFile, TypeFallback};

pub struct DartAstGenerator {
    toolchain: HelperToolchain,
}

impl DartAstGenerator {
    pub fn new() -> Self {
        Self {
            toolchain: HelperToolchain::dart(),
        }
    }
}

impl Default for DartAstGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl AstGenerator for DartAstGenerator {
    fn language(&self) -> &str {
        "dart"
    }

    fn extensions(&self) -> Vec<String> {
        vec!["dart".to_string()]
    }

    fn generate(&self, source: &SourceFile, ctx: &GenerationContext) -> Result<Program, CompilerError> {
        let output = self.toolchain.run(&ctx.toolchains, &source.path)?;
        program_from_json(&output, &source.path, ctx)
    }
}

#[derive(Debug, Deserialize)]
struct HelperOutput {
    classes: Vec<DartClass>,
}

#[derive(Debug, Deserialize)]
struct DartClass {
    name: String,
    #[serde(default)]
    methods: Vec<DartMethod>,
    #[serde(default)]
    fields: Vec<DartVariable>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DartMethod {
    name: String,
    return_type: String,
    #[serde(default)]
    parameters: Vec<DartVariable>,
}

#[derive(Debug, Deserialize)]
struct DartVariable {
    name: String,
    #[serde(rename = "type")]
    ty: String,
}

pub(crate) fn program_from_json(json: &str, path: &Path, ctx: &GenerationContext) -> Result<Program, CompilerError> {
    let output: HelperOutput = serde_json::from_str(json)
        .map_err(|e| CompilerError::toolchain("dart", format!("unreadable helper output: {}", e)))?;
    let fallback = TypeFallback::new(path, ctx);
    let file = path.to_string_lossy().to_string();

    let candidates = output
        .classes
        .iter()
        .filter(|c| c.methods.iter().any(|m| is_public(&m.name)))
        .map(|c| {
            let mut methods: Vec<MethodDefinition> = c
                .methods
                .iter()
                .filter(|m| is_public(&m.name))
                .map(|m| method(&c.name, m, &fallback))
                .collect();
            dedupe_methods(&mut methods);
            ClassDefinition {
                name: c.name.clone(),
                path: file.clone(),
                doc_string: None,
                methods,
                trigger: None,
            }
        })
        .collect();
    let class = select_class(candidates).ok_or_else(|| CompilerError::NoClassFound {
        file: path.to_path_buf(),
    })?;

    let records = output
        .classes
        .iter()
        .filter(|c| c.name != class.name && is_public(&c.name))
        .map(|c| {
            let properties = c
                .fields
                .iter()
                .filter(|f| is_public(&f.name))
                .map(|f| {
                    let context = format!("{}.{}", c.name, f.name);
                    PropertyDefinition::new(&f.name, map_type(&f.ty, &context, &fallback), f.ty.ends_with('?'))
                })
                .collect();
            let mut record = StructLiteral::new(&c.name, properties);
            record.path = Some(file.clone());
            record
        })
        .collect();

    tracing::debug!(file = %path.display(), class = %class.name, "parsed dart");
    Ok(Program::new(SourceLanguage::Dart, class, records))
}

fn method(class: &str, method: &DartMethod, fallback: &TypeFallback) -> MethodDefinition {
    let context = format!("{}.{}", class, method.name);
    let mut definition = MethodDefinition::new(
        &method.name,
        map_type(&method.return_type, &format!("{} return", context), fallback),
    );
    definition.params = method
        .parameters
        .iter()
        .map(|p| {
            let mut param = ParameterDefinition::new(
                &p.name,
                &p.ty,
                map_type(&p.ty, &format!("{}({})", context, p.name), fallback),
            );
            param.optional = p.ty.ends_with('?');
            param
        })
        .collect();
    definition
}

fn is_public(name: &str) -> bool {
    !name.starts_with('_')
}

fn map_type(raw: &str, context: &str, fallback: &TypeFallback) -> TypeNode {
    dart_type(&type_expr::parse(raw)).unwrap_or_else(|| fallback.any(context, raw))
}

/// Dart's type rules. `None` means the caller degrades.
fn dart_type(expr: &TypeExpr) -> Option<TypeNode> {
    match expr {
        TypeExpr::Nullable(inner) => dart_type(inner),
        TypeExpr::Named { name, args } => {
            let ty = match (name.as_str(), args.as_slice()) {
                ("String", []) => TypeNode::StringLiteral,
                ("int", []) => TypeNode::IntegerLiteral,
                ("double" | "num", []) => TypeNode::DoubleLiteral,
                ("bool", []) => TypeNode::BooleanLiteral,
                ("dynamic" | "Object", []) => TypeNode::AnyLiteral,
                ("void" | "Null", []) => TypeNode::VoidLiteral,
                ("DateTime", []) => TypeNode::DateType,
                ("List" | "Set" | "Iterable", []) => TypeNode::array(TypeNode::AnyLiteral),
                ("List" | "Set" | "Iterable", [inner]) => TypeNode::array(dart_type(inner)?),
                ("Map", [key, value]) => TypeNode::map(dart_type(key)?, dart_type(value)?),
                ("Future" | "FutureOr", []) => TypeNode::promise(TypeNode::AnyLiteral),
                ("Future" | "FutureOr", [inner]) => TypeNode::promise(dart_type(inner)?),
                (other, []) => TypeNode::custom(other),
                _ => return None,
            };
            Some(ty)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = r#"{
        "classes": [
            { "name": "Greeter",
              "methods": [
                  { "name": "hello", "returnType": "Future<String>",
                    "parameters": [{ "name": "user", "type": "User" }, { "name": "times", "type": "int?" }] },
                  { "name": "_secret", "returnType": "void", "parameters": [] },
                  { "name": "stream", "returnType": "Stream<int>", "parameters": [] }
              ],
              "fields": [{ "name": "_prefix", "type": "String" }] },
            { "name": "User",
              "methods": [],
              "fields": [{ "name": "name", "type": "String" }, { "name": "born", "type": "DateTime?" }] }
        ]
    }"#;

    #[test]
    fn test_program_from_json() {
        let ctx = GenerationContext::new();
        let program = program_from_json(OUTPUT, Path::new("greeter.dart"), &ctx).unwrap();
        assert_eq!(program.original_language, SourceLanguage::Dart);

        let class = program.class().unwrap();
        let names: Vec<_> = class.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["hello", "stream"]);
        assert_eq!(class.methods[0].return_type, TypeNode::promise(TypeNode::StringLiteral));
        assert!(class.methods[0].params[1].optional);
        assert_eq!(class.methods[0].params[1].param_type, TypeNode::IntegerLiteral);
        assert_eq!(class.methods[1].return_type, TypeNode::AnyLiteral);
        assert_eq!(ctx.warnings.snapshot().len(), 1);

        let user = program.find_struct("User").unwrap();
        assert_eq!(user.type_literal.properties[1].property_type, TypeNode::DateType);
        assert!(user.type_literal.properties[1].optional);
    }

    #[test]
    fn test_dart_type_rules() {
        let map = |raw: &str| dart_type(&type_expr::parse(raw));
        assert_eq!(
            map("Map<String, List<num>>"),
            Some(TypeNode::map(TypeNode::StringLiteral, TypeNode::array(TypeNode::DoubleLiteral)))
        );
        assert_eq!(map("Object?"), Some(TypeNode::AnyLiteral));
        assert_eq!(map("Stream<int>"), None);
    }
}
