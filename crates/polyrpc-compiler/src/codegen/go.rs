//! Go SDK. Everything lands in one package, so records need no imports.

use askama::Template;

use crate::diagnostic::CompilerError;
use crate::ir::TypeNode;
use super::model::{ClassModel, SdkModel, Target};
use super::naming::{escape_prefix, to_pascal_case, to_snake_case, GO_RESERVED};
use super::{render, SdkFile, SdkFiles, SdkGenerator, SdkGeneratorInput};

const REMOTE: &str = include_str!("../../runtime/go/remote.go");
const STORAGE: &str = include_str!("../../runtime/go/storage.go");

#[derive(Template)]
#[template(path = "go/class.go", escape = "none")]
struct ClassTemplate<'a> {
    class: &'a ClassModel,
    url: &'a str,
    needs_time: bool,
}

#[derive(Template)]
#[template(path = "go/sdk.go", escape = "none")]
struct SdkTemplate<'a> {
    model: &'a SdkModel,
}

/// Names the method bodies declare themselves: the receiver and the result
/// locals.
const BODY_NAMES: &[&str] = &["c", "result", "err"];

struct GoTarget;

impl Target for GoTarget {
    fn type_name(&self, ty: &TypeNode) -> String {
        go_type(ty)
    }

    fn ident(&self, name: &str) -> String {
        if BODY_NAMES.contains(&name) {
            format!("_{}", name)
        } else {
            escape_prefix(name, GO_RESERVED)
        }
    }

    fn context_arg(&self) -> String {
        r#"map[string]interface{}{"token": GetStorage().GetItem("token")}"#.to_string()
    }

    fn method_name(&self, name: &str) -> String {
        to_pascal_case(name)
    }

    fn field_name(&self, name: &str) -> String {
        to_pascal_case(name)
    }
}

fn go_type(ty: &TypeNode) -> String {
    match ty {
        TypeNode::StringLiteral => "string".to_string(),
        TypeNode::DoubleLiteral => "float64".to_string(),
        TypeNode::IntegerLiteral => "int".to_string(),
        TypeNode::BooleanLiteral => "bool".to_string(),
        TypeNode::AnyLiteral => "interface{}".to_string(),
        TypeNode::VoidLiteral => String::new(),
        TypeNode::DateType => "time.Time".to_string(),
        TypeNode::ArrayType { generic } => format!("[]{}", go_type(generic)),
        TypeNode::MapType { generic_key, generic_value } => {
            format!("map[{}]{}", go_type(generic_key), go_type(generic_value))
        }
        TypeNode::PromiseType { generic } => go_type(generic),
        TypeNode::CustomNodeLiteral { raw_value } => raw_value.clone(),
        TypeNode::StructLiteral(record) => record.name.clone(),
    }
}

/// Whether a class file mentions `time.Time` and so imports `time`.
fn needs_time(class: &ClassModel) -> bool {
    let uses = |ty: &str| ty.contains("time.Time");
    class.structs.iter().flat_map(|s| &s.fields).any(|f| uses(&f.ty))
        || class
            .rpc_methods
            .iter()
            .any(|m| uses(&m.return_type) || m.params.iter().any(|p| uses(&p.ty)))
}

pub struct GoSdkGenerator;

impl SdkGenerator for GoSdkGenerator {
    fn language(&self) -> &str {
        "go"
    }

    fn generate(&self, input: &SdkGeneratorInput) -> Result<SdkFiles, CompilerError> {
        let model = SdkModel::build(input, &GoTarget);
        let mut files = SdkFiles::default();
        if model.is_empty() {
            return Ok(files);
        }

        for class in &model.classes {
            let template = ClassTemplate {
                class,
                url: &model.url,
                needs_time: needs_time(class),
            };
            files.push(SdkFile::for_class(
                format!("{}.sdk.go", to_snake_case(&class.name)),
                render("go", &template)?,
                &class.name,
            ));
        }
        files.push(SdkFile::new("remote.go", REMOTE));
        files.push(SdkFile::new("storage.go", STORAGE));
        files.push(SdkFile::new("sdk.go", render("go", &SdkTemplate { model: &model })?));
        Ok(files)
    }
}
