//! Declaration nodes.

use serde::{Deserialize, Serialize};

use super::TypeNode;
use crate::classify::TriggerType;

/// A trigger declared in the source through a comment directive or decorator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerAnnotation {
    #[serde(rename = "type")]
    pub trigger: TriggerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_string: Option<String>,
}

impl TriggerAnnotation {
    pub fn new(trigger: TriggerType) -> Self {
        Self { trigger, cron_string: None }
    }

    pub fn cron(schedule: impl Into<String>) -> Self {
        Self {
            trigger: TriggerType::Cron,
            cron_string: Some(schedule.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDefinition {
    pub name: String,
    /// Source file the class was found in.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_string: Option<String>,
    pub methods: Vec<MethodDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerAnnotation>,
}

impl ClassDefinition {
    /// Methods that can be exposed to an SDK, constructors excluded.
    pub fn callable_methods(&self) -> impl Iterator<Item = &MethodDefinition> {
        self.methods.iter().filter(|m| m.kind == MethodKind::Method)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Method,
    Constructor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDefinition {
    pub name: String,
    pub kind: MethodKind,
    #[serde(rename = "static")]
    pub is_static: bool,
    pub return_type: TypeNode,
    pub params: Vec<ParameterDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerAnnotation>,
}

impl MethodDefinition {
    pub fn new(name: impl Into<String>, return_type: TypeNode) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Method,
            is_static: false,
            return_type,
            params: Vec::new(),
            doc_string: None,
            trigger: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    pub name: String,
    /// The type as written in the source, for diagnostics only.
    pub raw_type: String,
    pub param_type: TypeNode,
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DefaultValue>,
}

impl ParameterDefinition {
    pub fn new(name: impl Into<String>, raw_type: impl Into<String>, param_type: TypeNode) -> Self {
        Self {
            name: name.into(),
            raw_type: raw_type.into(),
            param_type,
            optional: false,
            default_value: None,
        }
    }
}

/// A literal default value for a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum DefaultValue {
    StringLiteral(String),
    /// Any non-string literal, kept as written (`42`, `true`, `null`).
    Literal(String),
}
