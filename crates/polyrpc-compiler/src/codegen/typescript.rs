//! TypeScript SDK.

use askama::Template;

use crate::diagnostic::CompilerError;
use crate::ir::TypeNode;
use super::model::{ClassModel, SdkModel, Target};
use super::naming::{escape_suffix, lower_first, TYPESCRIPT_RESERVED};
use super::{render, SdkFile, SdkFiles, SdkGenerator, SdkGeneratorInput};

const REMOTE: &str = include_str!("../../runtime/ts/remote.ts");
const STORAGE: &str = include_str!("../../runtime/ts/storage.ts");

/// Sent in place of a context parameter, in both TS and JS.
pub(super) const TOKEN_ARG: &str = r#"{"token": StorageManager.getStorage().getItem("token")}"#;

#[derive(Template)]
#[template(path = "ts/class.ts", escape = "none")]
struct ClassTemplate<'a> {
    class: &'a ClassModel,
    url: &'a str,
}

#[derive(Template)]
#[template(path = "ts/index.ts", escape = "none")]
struct IndexTemplate<'a> {
    model: &'a SdkModel,
}

struct TsTarget;

impl Target for TsTarget {
    fn type_name(&self, ty: &TypeNode) -> String {
        ts_type(ty)
    }

    fn ident(&self, name: &str) -> String {
        escape_suffix(name, TYPESCRIPT_RESERVED)
    }

    fn context_arg(&self) -> String {
        TOKEN_ARG.to_string()
    }

    fn module_name(&self, class: &str) -> String {
        format!("./{}.sdk", lower_first(class))
    }
}

fn ts_type(ty: &TypeNode) -> String {
    match ty {
        TypeNode::StringLiteral => "string".to_string(),
        TypeNode::DoubleLiteral | TypeNode::IntegerLiteral => "number".to_string(),
        TypeNode::BooleanLiteral => "boolean".to_string(),
        TypeNode::AnyLiteral => "any".to_string(),
        TypeNode::VoidLiteral => "void".to_string(),
        TypeNode::DateType => "Date".to_string(),
        TypeNode::ArrayType { generic } => format!("Array<{}>", ts_type(generic)),
        TypeNode::MapType { generic_key, generic_value } => {
            format!("{{[key: {}]: {}}}", ts_type(generic_key), ts_type(generic_value))
        }
        TypeNode::PromiseType { generic } => format!("Promise<{}>", ts_type(generic)),
        TypeNode::CustomNodeLiteral { raw_value } => raw_value.clone(),
        TypeNode::StructLiteral(record) => record.name.clone(),
    }
}

pub struct TsSdkGenerator;

impl SdkGenerator for TsSdkGenerator {
    fn language(&self) -> &str {
        "ts"
    }

    fn generate(&self, input: &SdkGeneratorInput) -> Result<SdkFiles, CompilerError> {
        let model = SdkModel::build(input, &TsTarget);
        let mut files = SdkFiles::default();
        if model.is_empty() {
            return Ok(files);
        }

        for class in &model.classes {
            let data = render("ts", &ClassTemplate { class, url: &model.url })?;
            files.push(SdkFile::for_class(
                format!("{}.sdk.ts", lower_first(&class.name)),
                data,
                &class.name,
            ));
        }
        files.push(SdkFile::new("remote.ts", REMOTE));
        files.push(SdkFile::new("storage.ts", STORAGE));
        files.push(SdkFile::new("index.ts", render("ts", &IndexTemplate { model: &model })?));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::fixtures;

    #[test]
    fn test_greeter_sdk() {
        let files = TsSdkGenerator.generate(&fixtures::greeter()).unwrap();
        let paths: Vec<_> = files.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["greeter.sdk.ts", "remote.ts", "storage.ts", "index.ts"]);

        let sdk = files.get("greeter.sdk.ts").unwrap();
        assert!(sdk.contains(r#"static remote = new Remote("https://api.example.com");"#));
        assert!(sdk.contains(
            "static async hello(name: string, times?: number): Promise<string> {\n        return await Greeter.remote.call(\"Greeter.hello\", name, times);"
        ));
        assert!(sdk.contains("     * Says hello."));
        assert!(sdk.contains("static async whoami(): Promise<string>"));
        assert!(sdk.contains(&format!("Greeter.remote.call(\"Greeter.whoami\", {});", TOKEN_ARG)));
        assert!(sdk.contains("import { StorageManager } from \"./storage\";"));
        assert!(sdk.contains("static async save(user: User): Promise<void>"));
        assert!(sdk.contains("export interface User {\n    name: string;\n    tags: Array<string>;\n    address?: Address;\n}"));
        assert!(sdk.contains("Greeter.remote.http(\"Greeter.hook\", request);"));
        assert!(!sdk.contains("tick"));
        assert!(!sdk.contains(", )"));

        let index = files.get("index.ts").unwrap();
        assert!(index.contains("export { Greeter } from \"./greeter.sdk\";"));
        assert!(index.contains("export type { User, Address } from \"./greeter.sdk\";"));
    }

    #[test]
    fn test_nothing_callable_means_no_files() {
        let files = TsSdkGenerator.generate(&fixtures::cron_only()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_map_type() {
        let ty = TypeNode::map(TypeNode::StringLiteral, TypeNode::array(TypeNode::DoubleLiteral));
        assert_eq!(ts_type(&ty), "{[key: string]: Array<number>}");
    }
}
