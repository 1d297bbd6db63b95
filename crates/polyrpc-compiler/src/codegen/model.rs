//! The view model every SDK template renders.
//!
//! Building the model is where the generation rules live:
//! - constructors and `cron` methods never reach a template
//! - `http` methods are kept apart from the JSON-RPC methods
//! - every list item knows whether it is the last one, so templates emit a
//!   separator only between items
//! - each record is declared once per SDK, by the first class that uses it;
//!   later classes import it from there
//! - records nobody declared degrade to the target's dynamic type

use std::collections::{HashMap, HashSet};

use crate::classify::TriggerType;
use crate::ir::{ClassDefinition, MethodDefinition, StructLiteral, TypeNode};
use super::{SdkGeneratorInput, CONTEXT_TYPE};

/// What a language contributes to the model.
pub trait Target {
    /// Renders a resolved type. Must handle every variant.
    fn type_name(&self, ty: &TypeNode) -> String;

    /// Escapes an identifier that collides with a reserved word.
    fn ident(&self, name: &str) -> String;

    /// Expression passed in place of a context parameter.
    fn context_arg(&self) -> String;

    /// How one class file refers to another class's file.
    fn module_name(&self, class: &str) -> String {
        class.to_string()
    }

    fn method_name(&self, name: &str) -> String {
        self.ident(name)
    }

    fn field_name(&self, name: &str) -> String {
        self.ident(name)
    }

    /// Expression turning decoded JSON `expr` into a value of `ty`.
    fn decode(&self, _ty: &TypeNode, expr: &str, _optional: bool) -> String {
        expr.to_string()
    }

    /// Expression turning `expr`, a value of `ty`, into something the JSON
    /// encoder accepts.
    fn encode(&self, _ty: &TypeNode, expr: &str, _optional: bool) -> String {
        expr.to_string()
    }
}

/// Items that know whether they close their list.
pub trait Last {
    fn set_last(&mut self, last: bool);
}

/// Marks the final item of a list.
pub fn tag_last<T: Last>(mut items: Vec<T>) -> Vec<T> {
    let count = items.len();
    for (i, item) in items.iter_mut().enumerate() {
        item.set_last(i + 1 == count);
    }
    items
}

macro_rules! impl_last {
    ($($ty:ty),*) => {
        $(impl Last for $ty {
            fn set_last(&mut self, last: bool) {
                self.last = last;
            }
        })*
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct SdkModel {
    pub classes: Vec<ClassModel>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassModel {
    pub name: String,
    /// The target's reference to this class's file.
    pub module: String,
    pub doc_lines: Vec<String>,
    pub rpc_methods: Vec<MethodModel>,
    pub http_methods: Vec<MethodModel>,
    /// Records declared in this class's file.
    pub structs: Vec<StructModel>,
    /// Records declared by earlier classes, grouped by declaring class.
    pub imports: Vec<ImportModel>,
    /// Whether some method sends the stored session token.
    pub uses_context: bool,
    pub last: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodModel {
    pub name: String,
    /// `Class.method`, the name the backend dispatches on.
    pub remote_name: String,
    pub doc_lines: Vec<String>,
    pub params: Vec<ParamModel>,
    /// Call arguments in declaration order, context parameters included.
    pub args: Vec<ArgModel>,
    /// The result type with any promise wrapper removed.
    pub return_type: String,
    /// Converts the raw `result` into `return_type`.
    pub decode: String,
    pub returns_void: bool,
    pub last: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamModel {
    pub name: String,
    pub ty: String,
    /// Optional and followed only by optional parameters.
    pub optional: bool,
    /// Opens the trailing run of optional parameters.
    pub first_optional: bool,
    pub last: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgModel {
    pub expr: String,
    pub last: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructModel {
    pub name: String,
    pub fields: Vec<FieldModel>,
    pub last: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldModel {
    pub name: String,
    /// Key used on the wire.
    pub key: String,
    pub ty: String,
    pub optional: bool,
    /// Reads the field out of the `json` map.
    pub decode: String,
    /// Writes the field back to JSON.
    pub encode: String,
    pub last: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportModel {
    /// Class whose file declares the names.
    pub from_class: String,
    pub module: String,
    pub names: Vec<NameModel>,
    pub last: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameModel {
    pub name: String,
    pub last: bool,
}

impl_last!(ClassModel, MethodModel, ParamModel, ArgModel, StructModel, FieldModel, ImportModel, NameModel);

impl SdkModel {
    pub fn build(input: &SdkGeneratorInput, target: &dyn Target) -> Self {
        let records = collect_records(input);
        let mut owners: HashMap<String, String> = HashMap::new();
        let mut seen_classes = HashSet::new();
        let mut classes = Vec::new();

        for info in &input.classes {
            let Some(class) = info.program.class() else { continue };
            if !seen_classes.insert(class.name.clone()) {
                tracing::warn!(class = %class.name, "class generated twice, keeping the first one");
                continue;
            }

            let mut rpc = Vec::new();
            let mut http = Vec::new();
            for method in class.callable_methods() {
                match info.triggers.trigger_of(&method.name) {
                    TriggerType::Jsonrpc => rpc.push(method),
                    TriggerType::Http => http.push(method),
                    TriggerType::Cron => {}
                }
            }
            if rpc.is_empty() && http.is_empty() {
                continue;
            }

            let referenced = referenced_records(rpc.iter().copied(), &records);
            let mut structs = Vec::new();
            let mut imports: Vec<(String, Vec<String>)> = Vec::new();
            for name in referenced {
                match owners.get(&name) {
                    None => {
                        owners.insert(name.clone(), class.name.clone());
                        if let Some(record) = records.get(&name) {
                            structs.push(struct_model(record, &records, target));
                        }
                    }
                    Some(owner) => match imports.iter_mut().find(|(o, _)| o == owner) {
                        Some((_, names)) => names.push(name),
                        None => imports.push((owner.clone(), vec![name])),
                    },
                }
            }

            let uses_context = rpc
                .iter()
                .any(|m| m.params.iter().any(|p| is_context(&p.param_type)));

            classes.push(ClassModel {
                name: class.name.clone(),
                module: target.module_name(&class.name),
                doc_lines: doc_lines(class.doc_string.as_deref()),
                rpc_methods: tag_last(rpc.iter().map(|m| method_model(class, m, &records, target)).collect()),
                http_methods: tag_last(http.iter().map(|m| http_model(class, m, target)).collect()),
                structs: tag_last(structs),
                imports: tag_last(
                    imports
                        .into_iter()
                        .map(|(from_class, names)| ImportModel {
                            module: target.module_name(&from_class),
                            from_class,
                            names: tag_last(names.into_iter().map(|name| NameModel { name, last: false }).collect()),
                            last: false,
                        })
                        .collect(),
                ),
                uses_context,
                last: false,
            });
        }

        Self {
            classes: tag_last(classes),
            url: input.options.url.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Whether any class sends the stored session token.
    pub fn uses_context(&self) -> bool {
        self.classes.iter().any(|c| c.uses_context)
    }
}

/// Every record declared in any program, first declaration wins.
fn collect_records(input: &SdkGeneratorInput) -> HashMap<String, StructLiteral> {
    let mut records: HashMap<String, StructLiteral> = HashMap::new();
    for info in &input.classes {
        for record in info.program.structs() {
            records.entry(record.name.clone()).or_insert_with(|| record.clone());
            for property in &record.type_literal.properties {
                collect_inline(&property.property_type, &mut records);
            }
        }
        if let Some(class) = info.program.class() {
            for method in class.callable_methods() {
                collect_inline(&method.return_type, &mut records);
                for param in &method.params {
                    collect_inline(&param.param_type, &mut records);
                }
            }
        }
    }
    records
}

fn collect_inline(ty: &TypeNode, records: &mut HashMap<String, StructLiteral>) {
    match ty {
        TypeNode::StructLiteral(record) => {
            for property in &record.type_literal.properties {
                collect_inline(&property.property_type, records);
            }
            records.entry(record.name.clone()).or_insert_with(|| record.clone());
        }
        TypeNode::ArrayType { generic } | TypeNode::PromiseType { generic } => collect_inline(generic, records),
        TypeNode::MapType { generic_key, generic_value } => {
            collect_inline(generic_key, records);
            collect_inline(generic_value, records);
        }
        _ => {}
    }
}

/// Records reachable from the signatures, in first-use order.
fn referenced_records<'a>(
    methods: impl Iterator<Item = &'a MethodDefinition>,
    records: &HashMap<String, StructLiteral>,
) -> Vec<String> {
    let mut names = Vec::new();
    for method in methods {
        for param in &method.params {
            if !is_context(&param.param_type) {
                param.param_type.referenced_names(&mut names);
            }
        }
        method.return_type.referenced_names(&mut names);
    }
    names.retain(|n| records.contains_key(n));

    let mut i = 0;
    while i < names.len() {
        if let Some(record) = records.get(&names[i]) {
            let mut nested = Vec::new();
            for property in &record.type_literal.properties {
                property.property_type.referenced_names(&mut nested);
            }
            for name in nested {
                if records.contains_key(&name) && !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        i += 1;
    }
    names
}

/// Replaces references the SDK cannot declare with `AnyLiteral`.
fn resolve(ty: &TypeNode, records: &HashMap<String, StructLiteral>) -> TypeNode {
    match ty {
        TypeNode::CustomNodeLiteral { raw_value } if records.contains_key(raw_value) => ty.clone(),
        TypeNode::CustomNodeLiteral { .. } => TypeNode::AnyLiteral,
        TypeNode::StructLiteral(record) => TypeNode::custom(&record.name),
        TypeNode::ArrayType { generic } => TypeNode::array(resolve(generic, records)),
        TypeNode::PromiseType { generic } => TypeNode::promise(resolve(generic, records)),
        TypeNode::MapType { generic_key, generic_value } => {
            TypeNode::map(resolve(generic_key, records), resolve(generic_value, records))
        }
        other => other.clone(),
    }
}

fn is_context(ty: &TypeNode) -> bool {
    matches!(ty, TypeNode::CustomNodeLiteral { raw_value } if raw_value == CONTEXT_TYPE)
}

fn method_model(
    class: &ClassDefinition,
    method: &MethodDefinition,
    records: &HashMap<String, StructLiteral>,
    target: &dyn Target,
) -> MethodModel {
    let visible: Vec<_> = method.params.iter().filter(|p| !is_context(&p.param_type)).collect();
    let trailing = visible.iter().rev().take_while(|p| p.optional).count();
    let first_optional = visible.len() - trailing;
    let params = visible
        .iter()
        .enumerate()
        .map(|(i, p)| ParamModel {
            name: target.ident(&p.name),
            ty: target.type_name(&resolve(&p.param_type, records)),
            optional: i >= first_optional,
            first_optional: i == first_optional,
            last: false,
        })
        .collect();
    let args = method
        .params
        .iter()
        .map(|p| ArgModel {
            expr: if is_context(&p.param_type) {
                target.context_arg()
            } else {
                let optional = visible.iter().position(|v| v.name == p.name).is_some_and(|i| i >= first_optional);
                target.encode(&resolve(&p.param_type, records), &target.ident(&p.name), optional)
            },
            last: false,
        })
        .collect();

    let result = resolve(method.return_type.unwrap_promise(), records);
    MethodModel {
        name: target.method_name(&method.name),
        remote_name: format!("{}.{}", class.name, method.name),
        doc_lines: doc_lines(method.doc_string.as_deref()),
        params: tag_last(params),
        args: tag_last(args),
        returns_void: result.is_void(),
        return_type: target.type_name(&result),
        decode: target.decode(&result, "result", false),
        last: false,
    }
}

/// `http` methods take one request object, so only names are needed.
fn http_model(class: &ClassDefinition, method: &MethodDefinition, target: &dyn Target) -> MethodModel {
    MethodModel {
        name: target.method_name(&method.name),
        remote_name: format!("{}.{}", class.name, method.name),
        doc_lines: doc_lines(method.doc_string.as_deref()),
        params: Vec::new(),
        args: Vec::new(),
        return_type: String::new(),
        decode: String::new(),
        returns_void: false,
        last: false,
    }
}

fn struct_model(record: &StructLiteral, records: &HashMap<String, StructLiteral>, target: &dyn Target) -> StructModel {
    let fields = record
        .type_literal
        .properties
        .iter()
        .map(|p| {
            let ty = resolve(&p.property_type, records);
            let name = target.field_name(&p.name);
            FieldModel {
                key: p.name.clone(),
                ty: target.type_name(&ty),
                optional: p.optional,
                decode: target.decode(&ty, &format!("json['{}']", p.name), p.optional),
                encode: target.encode(&ty, &name, p.optional),
                name,
                last: false,
            }
        })
        .collect();
    StructModel {
        name: record.name.clone(),
        fields: tag_last(fields),
        last: false,
    }
}

fn doc_lines(doc: Option<&str>) -> Vec<String> {
    doc.map(|d| d.lines().map(|l| l.trim_end().to_string()).collect())
        .unwrap_or_default()
}
