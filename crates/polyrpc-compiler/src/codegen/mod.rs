//! SDK generation from programs.
//!
//! Each target language has one [`SdkGenerator`]. Generators share a view
//! model ([`model`]) that decides which methods are exposed, which records a
//! class needs and where every separator goes; the per-language modules only
//! map types and feed askama templates.
//!
//! Output per language:
//! - One file per class with at least one `jsonrpc` or `http` method
//! - The remote client and the storage helper (static runtime files)
//! - An index file re-exporting every class and the storage helper
//!
//! A run where no class is callable produces no files at all.

pub mod dispatch;
pub mod model;
pub mod naming;

mod dart;
mod go;
mod javascript;
mod kotlin;
mod python;
mod swift;
mod typescript;

pub use dispatch::SdkDispatcher;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::classify::ClassTriggers;
use crate::diagnostic::CompilerError;
use crate::ir::Program;

/// Parameter type that carries the caller's session instead of a value.
pub const CONTEXT_TYPE: &str = "CallContext";

/// Placeholder written into the SDK when no backend URL is known yet.
pub const URL_PLACEHOLDER: &str = "%%%link_to_be_replaced%%%";

/// One class handed to the SDK generators.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    pub program: Arc<Program>,
    pub triggers: ClassTriggers,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkOptions {
    /// Backend URL baked into the generated clients.
    pub url: String,
}

impl Default for SdkOptions {
    fn default() -> Self {
        Self {
            url: URL_PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkGeneratorInput {
    pub classes: Vec<ClassInfo>,
    pub options: SdkOptions,
}

/// A generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkFile {
    /// Path relative to the language's output directory.
    pub path: String,
    pub data: String,
    /// The class the file was generated for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl SdkFile {
    pub fn new(path: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
            class_name: None,
        }
    }

    pub fn for_class(path: impl Into<String>, data: impl Into<String>, class: &str) -> Self {
        Self {
            class_name: Some(class.to_string()),
            ..Self::new(path, data)
        }
    }
}

/// The files one generator produced, in generation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkFiles {
    pub files: Vec<SdkFile>,
}

impl SdkFiles {
    pub fn push(&mut self, file: SdkFile) {
        self.files.push(file);
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.iter().find(|f| f.path == path).map(|f| f.data.as_str())
    }

    /// Path to content, ordered by path.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.files
            .iter()
            .map(|f| (f.path.clone(), f.data.clone()))
            .collect()
    }
}

/// Trait for SDK generators.
pub trait SdkGenerator: Send + Sync {
    /// Returns the language name (e.g., "ts", "python").
    fn language(&self) -> &str;

    fn generate(&self, input: &SdkGeneratorInput) -> Result<SdkFiles, CompilerError>;
}

/// The built-in generators.
pub fn builtin_generators() -> Vec<Box<dyn SdkGenerator>> {
    vec![
        Box::new(typescript::TsSdkGenerator),
        Box::new(javascript::JsSdkGenerator),
        Box::new(python::PythonSdkGenerator),
        Box::new(go::GoSdkGenerator),
        Box::new(kotlin::KotlinSdkGenerator),
        Box::new(dart::DartSdkGenerator),
        Box::new(swift::SwiftSdkGenerator),
    ]
}

/// Renders a template, ending the output with exactly one newline.
pub(crate) fn render<T: askama::Template>(language: &str, template: &T) -> Result<String, CompilerError> {
    let mut output = template.render().map_err(|e| CompilerError::Render {
        language: language.to_string(),
        message: e.to_string(),
    })?;
    output.truncate(output.trim_end().len());
    output.push('\n');
    Ok(output)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::classify::classify;
    use crate::ir::{
        ClassDefinition, MethodDefinition, ParameterDefinition, PropertyDefinition,
        SourceLanguage, StructLiteral, TriggerAnnotation, TypeNode,
    };
    use crate::classify::TriggerType;

    fn param(name: &str, ty: TypeNode, optional: bool) -> ParameterDefinition {
        let mut param = ParameterDefinition::new(name, "", ty);
        param.optional = optional;
        param
    }

    /// A class exercising every trigger, a context parameter and records.
    pub fn greeter() -> SdkGeneratorInput {
        let mut hello = MethodDefinition::new("hello", TypeNode::promise(TypeNode::StringLiteral));
        hello.doc_string = Some("Says hello.".to_string());
        hello.params = vec![
            param("name", TypeNode::StringLiteral, false),
            param("times", TypeNode::IntegerLiteral, true),
        ];

        let mut whoami = MethodDefinition::new("whoami", TypeNode::StringLiteral);
        whoami.params = vec![param("ctx", TypeNode::custom(CONTEXT_TYPE), false)];

        let mut save = MethodDefinition::new("save", TypeNode::promise(TypeNode::VoidLiteral));
        save.params = vec![param("user", TypeNode::custom("User"), false)];

        let mut tick = MethodDefinition::new("tick", TypeNode::VoidLiteral);
        tick.trigger = Some(TriggerAnnotation::cron("0 * * * *"));

        let mut hook = MethodDefinition::new("hook", TypeNode::AnyLiteral);
        hook.trigger = Some(TriggerAnnotation::new(TriggerType::Http));
        hook.params = vec![param("request", TypeNode::AnyLiteral, false)];

        let class = ClassDefinition {
            name: "Greeter".to_string(),
            path: "greeter.ts".to_string(),
            doc_string: Some("Greets people.".to_string()),
            methods: vec![hello, whoami, save, tick, hook],
            trigger: None,
        };
        let structs = vec![
            StructLiteral::new(
                "User",
                vec![
                    PropertyDefinition::new("name", TypeNode::StringLiteral, false),
                    PropertyDefinition::new("tags", TypeNode::array(TypeNode::StringLiteral), false),
                    PropertyDefinition::new("address", TypeNode::custom("Address"), true),
                ],
            ),
            StructLiteral::new(
                "Address",
                vec![PropertyDefinition::new("city", TypeNode::StringLiteral, false)],
            ),
        ];

        let triggers = classify(&class, None).unwrap();
        SdkGeneratorInput {
            classes: vec![ClassInfo {
                program: Arc::new(Program::new(SourceLanguage::Ts, class, structs)),
                triggers,
            }],
            options: SdkOptions {
                url: "https://api.example.com".to_string(),
            },
        }
    }

    /// A class whose only method is scheduled.
    pub fn cron_only() -> SdkGeneratorInput {
        let mut tick = MethodDefinition::new("tick", TypeNode::VoidLiteral);
        tick.trigger = Some(TriggerAnnotation::cron("*/5 * * * *"));
        let class = ClassDefinition {
            name: "Jobs".to_string(),
            path: "jobs.ts".to_string(),
            doc_string: None,
            methods: vec![tick],
            trigger: None,
        };
        let triggers = classify(&class, None).unwrap();
        SdkGeneratorInput {
            classes: vec![ClassInfo {
                program: Arc::new(Program::new(SourceLanguage::Ts, class, Vec::new())),
                triggers,
            }],
            options: SdkOptions::default(),
        }
    }

    /// Every type variant as a parameter, a record field and a result.
    pub fn every_type() -> SdkGeneratorInput {
        let inline = StructLiteral::new(
            "Inline",
            vec![PropertyDefinition::new("flag", TypeNode::BooleanLiteral, false)],
        );
        let types = vec![
            ("text", TypeNode::StringLiteral),
            ("ratio", TypeNode::DoubleLiteral),
            ("count", TypeNode::IntegerLiteral),
            ("flag", TypeNode::BooleanLiteral),
            ("whatever", TypeNode::AnyLiteral),
            ("at", TypeNode::DateType),
            ("days", TypeNode::array(TypeNode::DateType)),
            ("leaves", TypeNode::map(TypeNode::StringLiteral, TypeNode::custom("Leaf"))),
            ("ranks", TypeNode::map(TypeNode::IntegerLiteral, TypeNode::array(TypeNode::AnyLiteral))),
            ("leaf", TypeNode::custom("Leaf")),
            ("unknown", TypeNode::custom("Missing")),
            ("inline", TypeNode::StructLiteral(inline)),
        ];

        let mut methods = Vec::new();
        let mut take = MethodDefinition::new("take", TypeNode::promise(TypeNode::VoidLiteral));
        take.params = types
            .iter()
            .enumerate()
            .map(|(i, (name, ty))| param(name, ty.clone(), i + 1 == types.len()))
            .collect();
        methods.push(take);
        for (name, ty) in &types {
            methods.push(MethodDefinition::new(format!("get_{}", name), ty.clone()));
        }
        // Promises and void only make sense as results.
        methods.push(MethodDefinition::new("later", TypeNode::promise(TypeNode::IntegerLiteral)));
        methods.push(MethodDefinition::new("nothing", TypeNode::VoidLiteral));
        let mut echo = MethodDefinition::new("echo", TypeNode::custom("Everything"));
        echo.params = vec![param("value", TypeNode::custom("Everything"), false)];
        methods.push(echo);

        let class = ClassDefinition {
            name: "Kitchen".to_string(),
            path: "kitchen.ts".to_string(),
            doc_string: None,
            methods,
            trigger: None,
        };
        let structs = vec![
            StructLiteral::new(
                "Everything",
                types
                    .iter()
                    .enumerate()
                    .map(|(i, (name, ty))| PropertyDefinition::new(*name, ty.clone(), i % 2 == 1))
                    .collect(),
            ),
            StructLiteral::new("Leaf", vec![PropertyDefinition::new("id", TypeNode::IntegerLiteral, false)]),
        ];

        let triggers = classify(&class, None).unwrap();
        SdkGeneratorInput {
            classes: vec![ClassInfo {
                program: Arc::new(Program::new(SourceLanguage::Ts, class, structs)),
                triggers,
            }],
            options: SdkOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_renders_in_every_language() {
        let input = fixtures::every_type();
        for generator in builtin_generators() {
            let language = generator.language().to_string();
            let files = generator
                .generate(&input)
                .unwrap_or_else(|e| panic!("{}: {}", language, e));
            let class = files
                .files
                .iter()
                .find(|f| f.class_name.as_deref() == Some("Kitchen"))
                .unwrap_or_else(|| panic!("{}: no class file", language));
            let data = &class.data;

            assert!(data.contains("Kitchen.take"), "{}: take missing", language);
            assert!(data.contains("Inline"), "{}: inline record missing", language);
            assert!(!data.contains("Missing"), "{}: undeclared record named", language);
            for separator in [", )", ",)", ", ]", ",]", ", }", ": ,", ": )", "<>", "[]]"] {
                assert!(!data.contains(separator), "{}: {:?} in output", language, separator);
            }

            match language.as_str() {
                "swift" => {
                    assert!(!data.replace("AnyEncodable", "").contains("Any"), "swift: Any is not Codable");
                    assert!(data.contains("public var whatever: JSONValue?"));
                }
                "kotlin" => {
                    assert!(!data.contains("Any"), "kotlin: Any has no serializer");
                    assert!(!data.contains("java.util.Date"), "kotlin: Date has no serializer");
                    assert!(data.contains("val at: String"));
                }
                "dart" => {
                    assert!(data.contains("at: json['at'] == null ? null : DateTime.parse(json['at'] as String)"));
                    assert!(data.contains("'days': days.map((e) => e.toIso8601String()).toList()"));
                    assert!(data.contains("final result = await remote.call('Kitchen.later', []);\n    return (result as num).toInt();"));
                    assert!(data.contains("return Everything.fromJson(result as Map<String, dynamic>);"));
                    assert!(data.contains("leaves: json['leaves'] == null ? null : (json['leaves'] as Map).map((k, v) => MapEntry(k as String, Leaf.fromJson(v as Map<String, dynamic>)))"));
                }
                "go" => {
                    assert!(data.contains("import \"time\""));
                    assert!(data.contains("At time.Time"));
                }
                _ => {}
            }
        }
    }
}
