//! Type nodes.

use serde::{Deserialize, Serialize};

/// The closed set of types a signature can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TypeNode {
    StringLiteral,
    DoubleLiteral,
    IntegerLiteral,
    BooleanLiteral,
    AnyLiteral,
    VoidLiteral,
    DateType,
    ArrayType {
        generic: Box<TypeNode>,
    },
    #[serde(rename_all = "camelCase")]
    MapType {
        generic_key: Box<TypeNode>,
        generic_value: Box<TypeNode>,
    },
    PromiseType {
        generic: Box<TypeNode>,
    },
    /// Opaque reference to a record declared elsewhere in the program.
    #[serde(rename_all = "camelCase")]
    CustomNodeLiteral {
        raw_value: String,
    },
    StructLiteral(StructLiteral),
}

impl TypeNode {
    pub fn array(inner: TypeNode) -> Self {
        TypeNode::ArrayType { generic: Box::new(inner) }
    }

    pub fn map(key: TypeNode, value: TypeNode) -> Self {
        TypeNode::MapType {
            generic_key: Box::new(key),
            generic_value: Box::new(value),
        }
    }

    pub fn promise(inner: TypeNode) -> Self {
        TypeNode::PromiseType { generic: Box::new(inner) }
    }

    pub fn custom(raw: impl Into<String>) -> Self {
        TypeNode::CustomNodeLiteral { raw_value: raw.into() }
    }

    /// Strips one level of promise wrapping.
    pub fn unwrap_promise(&self) -> &TypeNode {
        match self {
            TypeNode::PromiseType { generic } => generic,
            other => other,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.unwrap_promise(), TypeNode::VoidLiteral)
    }

    /// Names of records referenced anywhere inside this type.
    pub fn referenced_names(&self, out: &mut Vec<String>) {
        match self {
            TypeNode::ArrayType { generic } | TypeNode::PromiseType { generic } => {
                generic.referenced_names(out)
            }
            TypeNode::MapType { generic_key, generic_value } => {
                generic_key.referenced_names(out);
                generic_value.referenced_names(out);
            }
            TypeNode::CustomNodeLiteral { raw_value } => {
                if !out.contains(raw_value) {
                    out.push(raw_value.clone());
                }
            }
            TypeNode::StructLiteral(s) => {
                if !out.contains(&s.name) {
                    out.push(s.name.clone());
                }
            }
            _ => {}
        }
    }
}

/// A named record declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructLiteral {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub type_literal: TypeLiteral,
}

impl StructLiteral {
    pub fn new(name: impl Into<String>, properties: Vec<PropertyDefinition>) -> Self {
        Self {
            name: name.into(),
            path: None,
            type_literal: TypeLiteral { properties },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypeLiteral {
    pub properties: Vec<PropertyDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    pub optional: bool,
    #[serde(rename = "type")]
    pub property_type: TypeNode,
}

impl PropertyDefinition {
    pub fn new(name: impl Into<String>, property_type: TypeNode, optional: bool) -> Self {
        Self {
            name: name.into(),
            optional,
            property_type,
        }
    }
}
