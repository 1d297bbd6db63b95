//! JavaScript SDK, typed through JSDoc.

use askama::Template;

use crate::diagnostic::CompilerError;
use crate::ir::TypeNode;
use super::model::{ClassModel, SdkModel, Target};
use super::naming::{escape_suffix, lower_first, TYPESCRIPT_RESERVED};
use super::typescript::TOKEN_ARG;
use super::{render, SdkFile, SdkFiles, SdkGenerator, SdkGeneratorInput};

const REMOTE: &str = include_str!("../../runtime/js/remote.js");
const STORAGE: &str = include_str!("../../runtime/js/storage.js");

#[derive(Template)]
#[template(path = "js/class.js", escape = "none")]
struct ClassTemplate<'a> {
    class: &'a ClassModel,
    url: &'a str,
}

#[derive(Template)]
#[template(path = "js/index.js", escape = "none")]
struct IndexTemplate<'a> {
    model: &'a SdkModel,
}

struct JsTarget;

impl Target for JsTarget {
    fn type_name(&self, ty: &TypeNode) -> String {
        jsdoc_type(ty)
    }

    fn ident(&self, name: &str) -> String {
        escape_suffix(name, TYPESCRIPT_RESERVED)
    }

    fn context_arg(&self) -> String {
        TOKEN_ARG.to_string()
    }

    fn module_name(&self, class: &str) -> String {
        format!("./{}.sdk.js", lower_first(class))
    }
}

fn jsdoc_type(ty: &TypeNode) -> String {
    match ty {
        TypeNode::StringLiteral => "string".to_string(),
        TypeNode::DoubleLiteral | TypeNode::IntegerLiteral => "number".to_string(),
        TypeNode::BooleanLiteral => "boolean".to_string(),
        TypeNode::AnyLiteral => "any".to_string(),
        TypeNode::VoidLiteral => "void".to_string(),
        TypeNode::DateType => "Date".to_string(),
        TypeNode::ArrayType { generic } => format!("Array<{}>", jsdoc_type(generic)),
        TypeNode::MapType { generic_key, generic_value } => {
            format!("Object<{}, {}>", jsdoc_type(generic_key), jsdoc_type(generic_value))
        }
        TypeNode::PromiseType { generic } => format!("Promise<{}>", jsdoc_type(generic)),
        TypeNode::CustomNodeLiteral { raw_value } => raw_value.clone(),
        TypeNode::StructLiteral(record) => record.name.clone(),
    }
}

pub struct JsSdkGenerator;

impl SdkGenerator for JsSdkGenerator {
    fn language(&self) -> &str {
        "js"
    }

    fn generate(&self, input: &SdkGeneratorInput) -> Result<SdkFiles, CompilerError> {
        let model = SdkModel::build(input, &JsTarget);
        let mut files = SdkFiles::default();
        if model.is_empty() {
            return Ok(files);
        }

        for class in &model.classes {
            let data = render("js", &ClassTemplate { class, url: &model.url })?;
            files.push(SdkFile::for_class(
                format!("{}.sdk.js", lower_first(&class.name)),
                data,
                &class.name,
            ));
        }
        files.push(SdkFile::new("remote.js", REMOTE));
        files.push(SdkFile::new("storage.js", STORAGE));
        files.push(SdkFile::new("index.js", render("js", &IndexTemplate { model: &model })?));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::fixtures;

    #[test]
    fn test_greeter_sdk() {
        let files = JsSdkGenerator.generate(&fixtures::greeter()).unwrap();
        let sdk = files.get("greeter.sdk.js").unwrap();

        assert!(sdk.contains("import { Remote } from \"./remote.js\";"));
        assert!(sdk.contains(" * @typedef {Object} User\n * @property {string} name\n * @property {Array<string>} tags\n * @property {Address} [address]\n */"));
        assert!(sdk.contains("     * @param {string} name\n     * @param {number} [times]\n     * @returns {Promise<string>}"));
        assert!(sdk.contains("static async hello(name, times) {"));
        assert!(sdk.contains("return await Greeter.remote.call(\"Greeter.hello\", name, times);"));
        assert!(sdk.contains("     * @returns {Promise<void>}\n     */\n    static async save(user) {"));
        assert!(!sdk.contains("tick"));

        let index = files.get("index.js").unwrap();
        assert!(index.contains("export { Greeter } from \"./greeter.sdk.js\";"));
    }

    #[test]
    fn test_map_type() {
        let ty = TypeNode::map(TypeNode::StringLiteral, TypeNode::AnyLiteral);
        assert_eq!(jsdoc_type(&ty), "Object<string, any>");
    }
}
