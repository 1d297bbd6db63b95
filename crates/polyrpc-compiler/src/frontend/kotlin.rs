//! Kotlin frontend.
//!
//! Kotlin sources are read by an external helper (a JVM jar) that prints a
//! JSON description of every class in the file:
//!
//! ```json
//! { "projectClasses": { "Greeter": {
//!     "className": "Greeter",
//!     "classConstructor": [{ "paramName": "prefix", "paramType": "String" }],
//!     "classMethods": [{ "funcName": "hello", "funcRetType": "String",
//!                        "funcParams": [{ "paramName": "name", "paramType": "String" }] }] } } }
//! ```
//!
//! Classes with methods are deployable candidates; the rest are data classes
//! and become records built from their constructor properties.

use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::context::GenerationContext;
use crate::diagnostic::CompilerError;
use crate::ir::{
    ClassDefinition, MethodDefinition, MethodKind, ParameterDefinition, Program, PropertyDefinition,
    SourceLanguage, StructLiteral, TypeNode,
};
use super::toolchain::HelperToolchain;
use super::type_expr::{self, TypeExpr};
use super::{dedupe_methods, select_class, AstGenerator, SourceFile, TypeFallback};

pub struct KotlinAstGenerator {
    toolchain: HelperToolchain,
}

impl KotlinAstGenerator {
    pub fn new() -> Self {
        Self {
            toolchain: HelperToolchain::kotlin(),
        }
    }
}

impl Default for KotlinAstGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl AstGenerator for KotlinAstGenerator {
    fn language(&self) -> &str {
        "kotlin"
    }

    fn extensions(&self) -> Vec<String> {
        vec!["kt".to_string()]
    }

    fn generate(&self, source: &SourceFile, ctx: &GenerationContext) -> Result<Program, CompilerError> {
        let output = self.toolchain.run(&ctx.toolchains, &source.path)?;
        program_from_json(&output, &source.path, ctx)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HelperOutput {
    #[serde(deserialize_with = "in_source_order")]
    project_classes: Vec<KotlinClass>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KotlinClass {
    class_name: String,
    #[serde(default)]
    class_constructor: Vec<KotlinParam>,
    #[serde(default)]
    class_methods: Vec<KotlinMethod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KotlinMethod {
    func_name: String,
    func_ret_type: String,
    #[serde(default)]
    func_params: Vec<KotlinParam>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KotlinParam {
    param_name: String,
    param_type: String,
}

/// Keeps the helper's class map in the order the classes were declared.
fn in_source_order<'de, D>(deserializer: D) -> Result<Vec<KotlinClass>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Entries;

    impl<'de> Visitor<'de> for Entries {
        type Value = Vec<KotlinClass>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of class descriptions")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut classes = Vec::new();
            while let Some((_, class)) = map.next_entry::<String, KotlinClass>()? {
                classes.push(class);
            }
            Ok(classes)
        }
    }

    deserializer.deserialize_map(Entries)
}

/// Builds a program from the helper's JSON output.
pub(crate) fn program_from_json(json: &str, path: &Path, ctx: &GenerationContext) -> Result<Program, CompilerError> {
    let output: HelperOutput = serde_json::from_str(json)
        .map_err(|e| CompilerError::toolchain("kotlin", format!("unreadable helper output: {}", e)))?;
    let fallback = TypeFallback::new(path, ctx);
    let file = path.to_string_lossy().to_string();

    let candidates = output
        .project_classes
        .iter()
        .filter(|c| !c.class_methods.is_empty())
        .map(|c| class_definition(c, &file, &fallback))
        .collect();
    let class = select_class(candidates).ok_or_else(|| CompilerError::NoClassFound {
        file: path.to_path_buf(),
    })?;

    let records = output
        .project_classes
        .iter()
        .filter(|c| c.class_name != class.name)
        .map(|c| {
            let properties = c
                .class_constructor
                .iter()
                .map(|p| {
                    let optional = p.param_type.trim_end().ends_with('?');
                    let context = format!("{}.{}", c.class_name, p.param_name);
                    PropertyDefinition::new(&p.param_name, map_type(&p.param_type, &context, &fallback), optional)
                })
                .collect();
            let mut record = StructLiteral::new(&c.class_name, properties);
            record.path = Some(file.clone());
            record
        })
        .collect();

    tracing::debug!(file = %path.display(), class = %class.name, "parsed kotlin");
    Ok(Program::new(SourceLanguage::Kotlin, class, records))
}

fn class_definition(class: &KotlinClass, file: &str, fallback: &TypeFallback) -> ClassDefinition {
    let mut methods = Vec::new();
    if !class.class_constructor.is_empty() {
        let mut constructor = MethodDefinition::new("constructor", TypeNode::VoidLiteral);
        constructor.kind = MethodKind::Constructor;
        constructor.params = params(&class.class_name, "constructor", &class.class_constructor, fallback);
        methods.push(constructor);
    }
    for method in &class.class_methods {
        let context = format!("{}.{} return", class.class_name, method.func_name);
        let mut definition = MethodDefinition::new(&method.func_name, map_type(&method.func_ret_type, &context, fallback));
        definition.params = params(&class.class_name, &method.func_name, &method.func_params, fallback);
        methods.push(definition);
    }
    dedupe_methods(&mut methods);

    ClassDefinition {
        name: class.class_name.clone(),
        path: file.to_string(),
        doc_string: None,
        methods,
        trigger: None,
    }
}

fn params(class: &str, method: &str, params: &[KotlinParam], fallback: &TypeFallback) -> Vec<ParameterDefinition> {
    params
        .iter()
        .map(|p| {
            let context = format!("{}.{}({})", class, method, p.param_name);
            let mut param = ParameterDefinition::new(&p.param_name, &p.param_type, map_type(&p.param_type, &context, fallback));
            param.optional = p.param_type.trim_end().ends_with('?');
            param
        })
        .collect()
}

fn map_type(raw: &str, context: &str, fallback: &TypeFallback) -> TypeNode {
    kotlin_type(&type_expr::parse(raw)).unwrap_or_else(|| fallback.any(context, raw))
}

/// Kotlin's type rules. `None` means the caller degrades.
fn kotlin_type(expr: &TypeExpr) -> Option<TypeNode> {
    match expr {
        TypeExpr::Nullable(inner) => kotlin_type(inner),
        TypeExpr::Named { name, args } => {
            let simple = name.rsplit('.').next().unwrap_or(name);
            let ty = match (simple, args.as_slice()) {
                ("String" | "Char", []) => TypeNode::StringLiteral,
                ("Int" | "Long" | "Short" | "Byte", []) => TypeNode::IntegerLiteral,
                ("Double" | "Float", []) => TypeNode::DoubleLiteral,
                ("Boolean", []) => TypeNode::BooleanLiteral,
                ("Any", []) => TypeNode::AnyLiteral,
                ("Unit" | "Void" | "Nothing", []) => TypeNode::VoidLiteral,
                ("Date" | "Instant" | "LocalDateTime", []) => TypeNode::DateType,
                ("List" | "MutableList" | "ArrayList" | "Set" | "MutableSet" | "Array" | "Collection", [inner]) => {
                    TypeNode::array(kotlin_type(inner)?)
                }
                ("Map" | "MutableMap" | "HashMap", [key, value]) => {
                    TypeNode::map(kotlin_type(key)?, kotlin_type(value)?)
                }
                ("Future" | "Deferred", [inner]) => TypeNode::promise(kotlin_type(inner)?),
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
        "projectClasses": {
            "User": {
                "className": "User",
                "classConstructor": [
                    { "paramName": "name", "paramType": "String" },
                    { "paramName": "age", "paramType": "Int?" }
                ],
                "classMethods": []
            },
            "Greeter": {
                "className": "Greeter",
                "classConstructor": [],
                "classMethods": [
                    { "funcName": "hello", "funcRetType": "String",
                      "funcParams": [{ "paramName": "user", "paramType": "User" }] },
                    { "funcName": "scores", "funcRetType": "Map<String, List<Double>>",
                      "funcParams": [{ "paramName": "callback", "paramType": "(Int) -> Unit" }] }
                ]
            }
        }
    }"#;

    #[test]
    fn test_program_from_json() {
        let ctx = GenerationContext::new();
        let program = program_from_json(OUTPUT, Path::new("Greeter.kt"), &ctx).unwrap();
        assert_eq!(program.original_language, SourceLanguage::Kotlin);

        let class = program.class().unwrap();
        assert_eq!(class.name, "Greeter");
        assert_eq!(class.methods.len(), 2);
        assert_eq!(class.methods[0].params[0].param_type, TypeNode::custom("User"));
        assert_eq!(
            class.methods[1].return_type,
            TypeNode::map(TypeNode::StringLiteral, TypeNode::array(TypeNode::DoubleLiteral))
        );
        assert_eq!(class.methods[1].params[0].param_type, TypeNode::AnyLiteral);
        assert_eq!(ctx.warnings.snapshot().len(), 1);

        let user = program.find_struct("User").unwrap();
        assert_eq!(user.type_literal.properties[1].property_type, TypeNode::IntegerLiteral);
        assert!(user.type_literal.properties[1].optional);
    }

    #[test]
    fn test_no_class_with_methods() {
        let ctx = GenerationContext::new();
        let json = r#"{ "projectClasses": { "User": { "className": "User", "classConstructor": [], "classMethods": [] } } }"#;
        let result = program_from_json(json, Path::new("User.kt"), &ctx);
        assert!(matches!(result, Err(CompilerError::NoClassFound { .. })));
    }

    #[test]
    fn test_unreadable_output() {
        let ctx = GenerationContext::new();
        let result = program_from_json("Exception in thread main", Path::new("A.kt"), &ctx);
        assert!(matches!(result, Err(CompilerError::Toolchain { .. })));
    }
}
