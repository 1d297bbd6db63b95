//! Kotlin SDK built on coroutines and kotlinx.serialization.

use askama::Template;

use crate::diagnostic::CompilerError;
use crate::ir::TypeNode;
use super::model::{ClassModel, SdkModel, Target};
use super::naming::{escape_suffix, to_pascal_case, KOTLIN_RESERVED};
use super::{render, SdkFile, SdkFiles, SdkGenerator, SdkGeneratorInput};

const REMOTE: &str = include_str!("../../runtime/kotlin/Remote.kt");
const STORAGE: &str = include_str!("../../runtime/kotlin/StorageManager.kt");

#[derive(Template)]
#[template(path = "kotlin/class.kt", escape = "none")]
struct ClassTemplate<'a> {
    class: &'a ClassModel,
    url: &'a str,
}

#[derive(Template)]
#[template(path = "kotlin/Sdk.kt", escape = "none")]
struct SdkTemplate<'a> {
    model: &'a SdkModel,
}

struct KotlinTarget;

impl Target for KotlinTarget {
    fn type_name(&self, ty: &TypeNode) -> String {
        kotlin_type(ty)
    }

    fn ident(&self, name: &str) -> String {
        escape_suffix(name, KOTLIN_RESERVED)
    }

    fn context_arg(&self) -> String {
        r#"mapOf("token" to StorageManager.getStorage().getItem("token"))"#.to_string()
    }
}

/// Every rendered type must have a kotlinx.serialization serializer, so
/// untyped values stay JSON trees and dates travel as ISO 8601 strings.
fn kotlin_type(ty: &TypeNode) -> String {
    match ty {
        TypeNode::StringLiteral => "String".to_string(),
        TypeNode::DoubleLiteral => "Double".to_string(),
        TypeNode::IntegerLiteral => "Int".to_string(),
        TypeNode::BooleanLiteral => "Boolean".to_string(),
        TypeNode::AnyLiteral => "JsonElement".to_string(),
        TypeNode::VoidLiteral => "Unit".to_string(),
        TypeNode::DateType => "String".to_string(),
        TypeNode::ArrayType { generic } => format!("List<{}>", kotlin_type(generic)),
        TypeNode::MapType { generic_key, generic_value } => {
            format!("Map<{}, {}>", kotlin_type(generic_key), kotlin_type(generic_value))
        }
        TypeNode::PromiseType { generic } => kotlin_type(generic),
        TypeNode::CustomNodeLiteral { raw_value } => raw_value.clone(),
        TypeNode::StructLiteral(record) => record.name.clone(),
    }
}

pub struct KotlinSdkGenerator;

impl SdkGenerator for KotlinSdkGenerator {
    fn language(&self) -> &str {
        "kotlin"
    }

    fn generate(&self, input: &SdkGeneratorInput) -> Result<SdkFiles, CompilerError> {
        let model = SdkModel::build(input, &KotlinTarget);
        let mut files = SdkFiles::default();
        if model.is_empty() {
            return Ok(files);
        }

        for class in &model.classes {
            let data = render("kotlin", &ClassTemplate { class, url: &model.url })?;
            files.push(SdkFile::for_class(
                format!("{}.kt", to_pascal_case(&class.name)),
                data,
                &class.name,
            ));
        }
        files.push(SdkFile::new("Remote.kt", REMOTE));
        files.push(SdkFile::new("StorageManager.kt", STORAGE));
        files.push(SdkFile::new("Sdk.kt", render("kotlin", &SdkTemplate { model: &model })?));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::fixtures;

    #[test]
    fn test_greeter_sdk() {
        let files = KotlinSdkGenerator.generate(&fixtures::greeter()).unwrap();
        let paths: Vec<_> = files.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["Greeter.kt", "Remote.kt", "StorageManager.kt", "Sdk.kt"]);

        let sdk = files.get("Greeter.kt").unwrap();
        assert!(sdk.contains("@Serializable\ndata class User(\n    val name: String,\n    val tags: List<String>,\n    val address: Address? = null\n)"));
        assert!(sdk.contains("    suspend fun hello(name: String, times: Int? = null): String {\n        return remote.call<String>(\"Greeter.hello\", listOf(Remote.encode(name), Remote.encode(times)))"));
        assert!(sdk.contains("    suspend fun save(user: User): Unit {\n        remote.call<Unit>(\"Greeter.save\", listOf(Remote.encode(user)))"));
        assert!(sdk.contains("Remote.encode(mapOf(\"token\" to StorageManager.getStorage().getItem(\"token\")))"));
        assert!(!sdk.contains("tick"));

        let aggregator = files.get("Sdk.kt").unwrap();
        assert!(aggregator.contains("listOf(\"Greeter\")"));
    }

    #[test]
    fn test_every_type_is_serializable() {
        assert_eq!(kotlin_type(&TypeNode::AnyLiteral), "JsonElement");
        assert_eq!(kotlin_type(&TypeNode::DateType), "String");
        assert_eq!(
            kotlin_type(&TypeNode::map(TypeNode::StringLiteral, TypeNode::array(TypeNode::AnyLiteral))),
            "Map<String, List<JsonElement>>"
        );

        let files = KotlinSdkGenerator.generate(&fixtures::greeter()).unwrap();
        let sdk = files.get("Greeter.kt").unwrap();
        assert!(sdk.contains("suspend fun hook(request: JsonElement): JsonElement {"));
        assert!(!sdk.contains(": Any"));
        assert!(!sdk.contains("java.util.Date"));
    }
}
