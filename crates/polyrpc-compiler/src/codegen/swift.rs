//! Swift SDK using async/await and Codable records.

use askama::Template;

use crate::diagnostic::CompilerError;
use crate::ir::TypeNode;
use super::model::{ClassModel, SdkModel, Target};
use super::naming::{escape_suffix, to_pascal_case, SWIFT_RESERVED};
use super::{render, SdkFile, SdkFiles, SdkGenerator, SdkGeneratorInput};

const REMOTE: &str = include_str!("../../runtime/swift/Remote.swift");
const STORAGE: &str = include_str!("../../runtime/swift/StorageManager.swift");

#[derive(Template)]
#[template(path = "swift/class.swift", escape = "none")]
struct ClassTemplate<'a> {
    class: &'a ClassModel,
    url: &'a str,
}

#[derive(Template)]
#[template(path = "swift/Sdk.swift", escape = "none")]
struct SdkTemplate<'a> {
    model: &'a SdkModel,
}

struct SwiftTarget;

impl Target for SwiftTarget {
    fn type_name(&self, ty: &TypeNode) -> String {
        swift_type(ty)
    }

    fn ident(&self, name: &str) -> String {
        escape_suffix(name, SWIFT_RESERVED)
    }

    fn context_arg(&self) -> String {
        r#"["token": StorageManager.getStorage().getItem("token")]"#.to_string()
    }
}

fn swift_type(ty: &TypeNode) -> String {
    match ty {
        TypeNode::StringLiteral => "String".to_string(),
        TypeNode::DoubleLiteral => "Double".to_string(),
        TypeNode::IntegerLiteral => "Int".to_string(),
        TypeNode::BooleanLiteral => "Bool".to_string(),
        TypeNode::AnyLiteral => "JSONValue".to_string(),
        TypeNode::VoidLiteral => "Void".to_string(),
        TypeNode::DateType => "Date".to_string(),
        TypeNode::ArrayType { generic } => format!("[{}]", swift_type(generic)),
        TypeNode::MapType { generic_key, generic_value } => {
            format!("[{}: {}]", swift_type(generic_key), swift_type(generic_value))
        }
        TypeNode::PromiseType { generic } => swift_type(generic),
        TypeNode::CustomNodeLiteral { raw_value } => raw_value.clone(),
        TypeNode::StructLiteral(record) => record.name.clone(),
    }
}

pub struct SwiftSdkGenerator;

impl SdkGenerator for SwiftSdkGenerator {
    fn language(&self) -> &str {
        "swift"
    }

    fn generate(&self, input: &SdkGeneratorInput) -> Result<SdkFiles, CompilerError> {
        let model = SdkModel::build(input, &SwiftTarget);
        let mut files = SdkFiles::default();
        if model.is_empty() {
            return Ok(files);
        }

        for class in &model.classes {
            let data = render("swift", &ClassTemplate { class, url: &model.url })?;
            files.push(SdkFile::for_class(
                format!("{}.sdk.swift", to_pascal_case(&class.name)),
                data,
                &class.name,
            ));
        }
        files.push(SdkFile::new("Remote.swift", REMOTE));
        files.push(SdkFile::new("StorageManager.swift", STORAGE));
        files.push(SdkFile::new("Sdk.swift", render("swift", &SdkTemplate { model: &model })?));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::fixtures;

    #[test]
    fn test_greeter_sdk() {
        let files = SwiftSdkGenerator.generate(&fixtures::greeter()).unwrap();
        let sdk = files.get("Greeter.sdk.swift").unwrap();

        assert!(sdk.contains("public struct User: Codable {\n    public var name: String\n    public var tags: [String]\n    public var address: Address?\n"));
        assert!(sdk.contains("public init(name: String, tags: [String], address: Address? = nil) {"));
        assert!(sdk.contains("    /// Says hello.\n    public static func hello(name: String, times: Int? = nil) async throws -> String {\n        return try await remote.call(\"Greeter.hello\", [AnyEncodable(name), AnyEncodable(times)])"));
        assert!(sdk.contains("    public static func save(user: User) async throws {\n        try await remote.send(\"Greeter.save\", [AnyEncodable(user)])"));
        assert!(sdk.contains("public static func whoami() async throws -> String"));
        assert!(!sdk.contains("tick"));

        let aggregator = files.get("Sdk.swift").unwrap();
        assert!(aggregator.contains("public static let classes = [\"Greeter\"]"));
    }

    #[test]
    fn test_untyped_values_stay_codable() {
        assert_eq!(swift_type(&TypeNode::AnyLiteral), "JSONValue");
        assert_eq!(
            swift_type(&TypeNode::map(TypeNode::StringLiteral, TypeNode::AnyLiteral)),
            "[String: JSONValue]"
        );
        // An undeclared record degrades the same way.
        let mut input = fixtures::greeter();
        input.classes[0].program = std::sync::Arc::new(crate::ir::Program::new(
            crate::ir::SourceLanguage::Ts,
            input.classes[0].program.class().unwrap().clone(),
            Vec::new(),
        ));
        let files = SwiftSdkGenerator.generate(&input).unwrap();
        let sdk = files.get("Greeter.sdk.swift").unwrap();
        assert!(sdk.contains("public static func save(user: JSONValue) async throws {"));
        assert!(!sdk.contains(": Any"));
        assert!(files.get("Remote.swift").unwrap().contains("public enum JSONValue: Codable"));
    }

    #[test]
    fn test_swift_collections() {
        let ty = TypeNode::map(TypeNode::StringLiteral, TypeNode::array(TypeNode::IntegerLiteral));
        assert_eq!(swift_type(&ty), "[String: [Int]]");
    }
}
