//! Dart SDK.

use askama::Template;

use crate::diagnostic::CompilerError;
use crate::ir::TypeNode;
use super::model::{ClassModel, SdkModel, Target};
use super::naming::{escape_suffix, to_snake_case, DART_RESERVED};
use super::{render, SdkFile, SdkFiles, SdkGenerator, SdkGeneratorInput};

const REMOTE: &str = include_str!("../../runtime/dart/remote.dart");
const STORAGE: &str = include_str!("../../runtime/dart/storage.dart");

#[derive(Template)]
#[template(path = "dart/class.dart", escape = "none")]
struct ClassTemplate<'a> {
    class: &'a ClassModel,
    url: &'a str,
}

#[derive(Template)]
#[template(path = "dart/index.dart", escape = "none")]
struct IndexTemplate<'a> {
    model: &'a SdkModel,
}

struct DartTarget;

impl Target for DartTarget {
    fn type_name(&self, ty: &TypeNode) -> String {
        dart_type(ty)
    }

    fn ident(&self, name: &str) -> String {
        escape_suffix(name, DART_RESERVED)
    }

    fn context_arg(&self) -> String {
        "{'token': StorageManager.getStorage().getItem('token')}".to_string()
    }

    fn module_name(&self, class: &str) -> String {
        format!("{}.dart", to_snake_case(class))
    }

    fn decode(&self, ty: &TypeNode, expr: &str, optional: bool) -> String {
        let value = dart_decode(ty, expr);
        if optional && value != expr {
            format!("{} == null ? null : {}", expr, value)
        } else {
            value
        }
    }

    fn encode(&self, ty: &TypeNode, expr: &str, optional: bool) -> String {
        dart_encode(ty, expr, if optional { "?." } else { "." })
    }
}

fn dart_type(ty: &TypeNode) -> String {
    match ty {
        TypeNode::StringLiteral => "String".to_string(),
        TypeNode::DoubleLiteral => "double".to_string(),
        TypeNode::IntegerLiteral => "int".to_string(),
        TypeNode::BooleanLiteral => "bool".to_string(),
        TypeNode::AnyLiteral => "dynamic".to_string(),
        TypeNode::VoidLiteral => "void".to_string(),
        TypeNode::DateType => "DateTime".to_string(),
        TypeNode::ArrayType { generic } => format!("List<{}>", dart_type(generic)),
        TypeNode::MapType { generic_key, generic_value } => {
            format!("Map<{}, {}>", dart_type(generic_key), dart_type(generic_value))
        }
        TypeNode::PromiseType { generic } => format!("Future<{}>", dart_type(generic)),
        TypeNode::CustomNodeLiteral { raw_value } => raw_value.clone(),
        TypeNode::StructLiteral(record) => record.name.clone(),
    }
}

/// `jsonDecode` yields plain maps, lists and primitives; records, dates and
/// typed collections are rebuilt from those.
fn dart_decode(ty: &TypeNode, expr: &str) -> String {
    match ty {
        TypeNode::StringLiteral => format!("{} as String", expr),
        TypeNode::BooleanLiteral => format!("{} as bool", expr),
        TypeNode::DoubleLiteral => format!("({} as num).toDouble()", expr),
        TypeNode::IntegerLiteral => format!("({} as num).toInt()", expr),
        TypeNode::DateType => format!("DateTime.parse({} as String)", expr),
        TypeNode::AnyLiteral | TypeNode::VoidLiteral => expr.to_string(),
        TypeNode::ArrayType { generic } => format!(
            "({} as List).map((e) => {}).toList()",
            expr,
            dart_decode(generic, "e")
        ),
        TypeNode::MapType { generic_key, generic_value } => format!(
            "({} as Map).map((k, v) => MapEntry({}, {}))",
            expr,
            dart_decode_key(generic_key),
            dart_decode(generic_value, "v")
        ),
        TypeNode::PromiseType { generic } => dart_decode(generic, expr),
        TypeNode::CustomNodeLiteral { raw_value } => {
            format!("{}.fromJson({} as Map<String, dynamic>)", raw_value, expr)
        }
        TypeNode::StructLiteral(record) => {
            format!("{}.fromJson({} as Map<String, dynamic>)", record.name, expr)
        }
    }
}

/// JSON object keys are always strings.
fn dart_decode_key(ty: &TypeNode) -> String {
    match ty {
        TypeNode::IntegerLiteral => "int.parse(k as String)".to_string(),
        TypeNode::DoubleLiteral => "double.parse(k as String)".to_string(),
        TypeNode::BooleanLiteral => "k == 'true'".to_string(),
        TypeNode::DateType => "DateTime.parse(k as String)".to_string(),
        _ => dart_decode(ty, "k"),
    }
}

/// `dot` is `?.` when `expr` may be null.
fn dart_encode(ty: &TypeNode, expr: &str, dot: &str) -> String {
    match ty {
        TypeNode::DateType => format!("{}{}toIso8601String()", expr, dot),
        TypeNode::CustomNodeLiteral { .. } | TypeNode::StructLiteral(_) => format!("{}{}toJson()", expr, dot),
        TypeNode::ArrayType { generic } => {
            let item = dart_encode(generic, "e", ".");
            if item == "e" {
                expr.to_string()
            } else {
                format!("{}{}map((e) => {}).toList()", expr, dot, item)
            }
        }
        TypeNode::MapType { generic_key, generic_value } => {
            let key = match generic_key.as_ref() {
                TypeNode::StringLiteral | TypeNode::AnyLiteral => "k".to_string(),
                TypeNode::DateType => "k.toIso8601String()".to_string(),
                _ => "k.toString()".to_string(),
            };
            let value = dart_encode(generic_value, "v", ".");
            if key == "k" && value == "v" {
                expr.to_string()
            } else {
                format!("{}{}map((k, v) => MapEntry({}, {}))", expr, dot, key, value)
            }
        }
        TypeNode::PromiseType { generic } => dart_encode(generic, expr, dot),
        _ => expr.to_string(),
    }
}

pub struct DartSdkGenerator;

impl SdkGenerator for DartSdkGenerator {
    fn language(&self) -> &str {
        "dart"
    }

    fn generate(&self, input: &SdkGeneratorInput) -> Result<SdkFiles, CompilerError> {
        let model = SdkModel::build(input, &DartTarget);
        let mut files = SdkFiles::default();
        if model.is_empty() {
            return Ok(files);
        }

        for class in &model.classes {
            let data = render("dart", &ClassTemplate { class, url: &model.url })?;
            files.push(SdkFile::for_class(class.module.clone(), data, &class.name));
        }
        files.push(SdkFile::new("remote.dart", REMOTE));
        files.push(SdkFile::new("storage.dart", STORAGE));
        files.push(SdkFile::new("index.dart", render("dart", &IndexTemplate { model: &model })?));
        Ok(files)
    }
}
