//! TypeScript type rules shared by the tree-sitter walk and JSDoc text.

use crate::frontend::type_expr::TypeExpr;
use crate::ir::TypeNode;

/// Keyword types (`string`, `number`, ...).
pub fn predefined(name: &str) -> Option<TypeNode> {
    let ty = match name {
        "string" => TypeNode::StringLiteral,
        "number" => TypeNode::DoubleLiteral,
        "bigint" => TypeNode::IntegerLiteral,
        "boolean" => TypeNode::BooleanLiteral,
        "any" | "unknown" | "object" => TypeNode::AnyLiteral,
        "void" | "undefined" | "never" | "null" => TypeNode::VoidLiteral,
        _ => return None,
    };
    Some(ty)
}

/// A bare type reference. Never fails: unknown names are record references.
pub fn named(name: &str) -> TypeNode {
    match name {
        "Date" => TypeNode::DateType,
        "String" => TypeNode::StringLiteral,
        "Number" => TypeNode::DoubleLiteral,
        "Boolean" => TypeNode::BooleanLiteral,
        "Object" => TypeNode::AnyLiteral,
        "Array" => TypeNode::array(TypeNode::AnyLiteral),
        "Promise" => TypeNode::promise(TypeNode::AnyLiteral),
        other => predefined(other).unwrap_or_else(|| TypeNode::custom(other)),
    }
}

/// A generic reference such as `Promise<T>`. `None` means the caller degrades.
pub fn generic(name: &str, mut args: Vec<TypeNode>) -> Option<TypeNode> {
    match (name, args.len()) {
        ("Array" | "ReadonlyArray" | "Set", 1) => Some(TypeNode::array(args.remove(0))),
        ("Promise", 1) => Some(TypeNode::promise(args.remove(0))),
        ("Record" | "Map" | "Object", 2) => {
            let value = args.remove(1);
            Some(TypeNode::map(args.remove(0), value))
        }
        ("Partial" | "Readonly" | "Required", 1) => Some(args.remove(0)),
        _ => None,
    }
}

/// Applies the same rules to a type parsed from text.
pub fn from_expr(expr: &TypeExpr) -> Option<TypeNode> {
    match expr {
        TypeExpr::Named { name, args } if args.is_empty() => Some(named(name)),
        TypeExpr::Named { name, args } => {
            let args = args.iter().map(from_expr).collect::<Option<Vec<_>>>()?;
            generic(name, args)
        }
        TypeExpr::Literal(text) => Some(literal(text)),
        TypeExpr::Array(inner) => Some(TypeNode::array(from_expr(inner)?)),
        TypeExpr::Nullable(inner) => from_expr(inner),
        TypeExpr::Union(members) => {
            if let Some(single) = expr.without_null() {
                return from_expr(single);
            }
            let all_strings = members
                .iter()
                .filter(|m| !m.is_null())
                .all(|m| matches!(m, TypeExpr::Literal(text) if is_quoted(text)));
            all_strings.then_some(TypeNode::StringLiteral)
        }
        TypeExpr::Map(..) | TypeExpr::Pointer(_) | TypeExpr::Opaque(_) => None,
    }
}

fn literal(text: &str) -> TypeNode {
    if is_quoted(text) {
        TypeNode::StringLiteral
    } else {
        TypeNode::DoubleLiteral
    }
}

fn is_quoted(text: &str) -> bool {
    text.starts_with('"') || text.starts_with('\'')
}
