//! Language-agnostic intermediate representation.
//!
//! Every frontend produces a [`Program`] and every SDK generator consumes one.
//! A program holds exactly one [`ClassDefinition`] plus the record types
//! ([`StructLiteral`]) that its method signatures reference.
//!
//! All IR types are serde-serializable; the JSON form (tagged by `type`) is the
//! exchange format with external plugins.

mod class;
mod types;

pub use class::{
    ClassDefinition, DefaultValue, MethodDefinition, MethodKind, ParameterDefinition,
    TriggerAnnotation,
};
pub use types::{PropertyDefinition, StructLiteral, TypeLiteral, TypeNode};

use std::fmt;

use serde::{Deserialize, Serialize};

/// The language a program was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    Js,
    Ts,
    Go,
    Python,
    Kotlin,
    Dart,
    /// Produced by an external plugin.
    External,
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceLanguage::Js => "js",
            SourceLanguage::Ts => "ts",
            SourceLanguage::Go => "go",
            SourceLanguage::Python => "python",
            SourceLanguage::Kotlin => "kotlin",
            SourceLanguage::Dart => "dart",
            SourceLanguage::External => "external",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Module,
    Script,
}

/// A top-level node of a program body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    ClassDefinition(ClassDefinition),
    StructLiteral(StructLiteral),
}

/// The IR produced from a single source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub original_language: SourceLanguage,
    pub source_type: SourceType,
    pub body: Vec<Node>,
}

impl Program {
    /// Builds a program from the deployable class and its auxiliary records.
    pub fn new(language: SourceLanguage, class: ClassDefinition, structs: Vec<StructLiteral>) -> Self {
        let mut body = Vec::with_capacity(structs.len() + 1);
        body.push(Node::ClassDefinition(class));
        body.extend(structs.into_iter().map(Node::StructLiteral));
        Self {
            original_language: language,
            source_type: SourceType::Module,
            body,
        }
    }

    /// Returns the first class in the body.
    pub fn class(&self) -> Option<&ClassDefinition> {
        self.body.iter().find_map(|node| match node {
            Node::ClassDefinition(class) => Some(class),
            Node::StructLiteral(_) => None,
        })
    }

    /// Returns the auxiliary record declarations in body order.
    pub fn structs(&self) -> impl Iterator<Item = &StructLiteral> {
        self.body.iter().filter_map(|node| match node {
            Node::StructLiteral(s) => Some(s),
            Node::ClassDefinition(_) => None,
        })
    }

    /// Finds a record declared in this program by name.
    pub fn find_struct(&self, name: &str) -> Option<&StructLiteral> {
        self.structs().find(|s| s.name == name)
    }
}
