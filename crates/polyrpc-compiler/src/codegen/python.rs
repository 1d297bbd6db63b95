//! Python SDK. Records become keyword-only dataclasses.

use askama::Template;

use crate::diagnostic::CompilerError;
use crate::ir::TypeNode;
use super::model::{ClassModel, SdkModel, Target};
use super::naming::{escape_suffix, to_snake_case, PYTHON_RESERVED};
use super::{render, SdkFile, SdkFiles, SdkGenerator, SdkGeneratorInput};

const REMOTE: &str = include_str!("../../runtime/python/remote.py");
const STORAGE: &str = include_str!("../../runtime/python/storage.py");

#[derive(Template)]
#[template(path = "python/class.py", escape = "none")]
struct ClassTemplate<'a> {
    class: &'a ClassModel,
    url: &'a str,
}

#[derive(Template)]
#[template(path = "python/__init__.py", escape = "none")]
struct InitTemplate<'a> {
    model: &'a SdkModel,
}

struct PythonTarget;

impl Target for PythonTarget {
    fn type_name(&self, ty: &TypeNode) -> String {
        python_type(ty)
    }

    fn ident(&self, name: &str) -> String {
        escape_suffix(name, PYTHON_RESERVED)
    }

    fn context_arg(&self) -> String {
        r#"{"token": StorageManager.get_storage().get_item("token")}"#.to_string()
    }

    fn module_name(&self, class: &str) -> String {
        format!(".{}", to_snake_case(class))
    }
}

fn python_type(ty: &TypeNode) -> String {
    match ty {
        TypeNode::StringLiteral => "str".to_string(),
        TypeNode::DoubleLiteral => "float".to_string(),
        TypeNode::IntegerLiteral => "int".to_string(),
        TypeNode::BooleanLiteral => "bool".to_string(),
        TypeNode::AnyLiteral => "Any".to_string(),
        TypeNode::VoidLiteral => "None".to_string(),
        TypeNode::DateType => "datetime".to_string(),
        TypeNode::ArrayType { generic } => format!("List[{}]", python_type(generic)),
        TypeNode::MapType { generic_key, generic_value } => {
            format!("Dict[{}, {}]", python_type(generic_key), python_type(generic_value))
        }
        TypeNode::PromiseType { generic } => python_type(generic),
        TypeNode::CustomNodeLiteral { raw_value } => raw_value.clone(),
        TypeNode::StructLiteral(record) => record.name.clone(),
    }
}

pub struct PythonSdkGenerator;

impl SdkGenerator for PythonSdkGenerator {
    fn language(&self) -> &str {
        "python"
    }

    fn generate(&self, input: &SdkGeneratorInput) -> Result<SdkFiles, CompilerError> {
        let model = SdkModel::build(input, &PythonTarget);
        let mut files = SdkFiles::default();
        if model.is_empty() {
            return Ok(files);
        }

        for class in &model.classes {
            let data = render("python", &ClassTemplate { class, url: &model.url })?;
            files.push(SdkFile::for_class(
                format!("{}.py", to_snake_case(&class.name)),
                data,
                &class.name,
            ));
        }
        files.push(SdkFile::new("remote.py", REMOTE));
        files.push(SdkFile::new("storage.py", STORAGE));
        files.push(SdkFile::new("__init__.py", render("python", &InitTemplate { model: &model })?));
        Ok(files)
    }
}
