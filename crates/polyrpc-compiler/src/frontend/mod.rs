//! Language frontends ("AST generators") that turn one source file into a
//! [`Program`].
//!
//! Each frontend is responsible for:
//! 1. Parsing a source file in its language
//! 2. Picking the deployable class and the record types next to it
//! 3. Mapping every signature type through its language's rule set
//!
//! Frontends never fail on a type they do not understand. They degrade it and
//! record a [`TypeMappingWarning`] on the [`GenerationContext`].

pub mod dart;
pub mod dispatch;
pub mod go;
pub mod javascript;
pub mod kotlin;
pub mod python;
pub mod toolchain;
pub mod type_expr;
pub mod typescript;

pub use dispatch::AstDispatcher;

use std::path::{Path, PathBuf};

use crate::context::GenerationContext;
use crate::diagnostic::{CompilerError, TypeMappingWarning};
use crate::ir::{ClassDefinition, MethodDefinition, Program, TypeNode};

/// A source file handed to a frontend.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn read(path: &Path) -> Result<Self, CompilerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CompilerError::io(path, e.to_string()))?;
        Ok(Self::new(path, content))
    }

    /// Lowercased extension without the dot.
    pub fn extension(&self) -> String {
        extension_of(&self.path)
    }
}

pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Trait for language frontends.
pub trait AstGenerator: Send + Sync {
    /// Returns the language name (e.g., "ts", "python").
    fn language(&self) -> &str;

    /// Returns file extensions this frontend handles (e.g., ["ts", "tsx"]).
    fn extensions(&self) -> Vec<String>;

    /// Parses a single source file into a program.
    fn generate(&self, source: &SourceFile, ctx: &GenerationContext) -> Result<Program, CompilerError>;
}

/// The built-in frontends in dispatch order.
pub fn builtin_generators() -> Vec<Box<dyn AstGenerator>> {
    vec![
        Box::new(javascript::JsAstGenerator),
        Box::new(typescript::TsAstGenerator),
        Box::new(go::GoAstGenerator),
        Box::new(python::PythonAstGenerator),
        Box::new(kotlin::KotlinAstGenerator::new()),
        Box::new(dart::DartAstGenerator::new()),
    ]
}

/// Records degraded types for one file.
pub(crate) struct TypeFallback<'a> {
    pub file: &'a Path,
    pub ctx: &'a GenerationContext,
}

impl<'a> TypeFallback<'a> {
    pub fn new(file: &'a Path, ctx: &'a GenerationContext) -> Self {
        Self { file, ctx }
    }

    /// Falls back to `AnyLiteral` and records why.
    pub fn any(&self, context: &str, raw_type: &str) -> TypeNode {
        self.ctx.warn(TypeMappingWarning {
            file: self.file.to_path_buf(),
            context: context.to_string(),
            raw_type: raw_type.to_string(),
            fallback: "AnyLiteral".to_string(),
        });
        TypeNode::AnyLiteral
    }
}

/// Picks the deployable class: the first annotated one, else the first one.
pub(crate) fn select_class(mut candidates: Vec<ClassDefinition>) -> Option<ClassDefinition> {
    if candidates.is_empty() {
        return None;
    }
    let index = candidates
        .iter()
        .position(|c| c.trigger.is_some())
        .unwrap_or(0);
    Some(candidates.swap_remove(index))
}

/// Keeps the first declaration of each method name.
pub(crate) fn dedupe_methods(methods: &mut Vec<MethodDefinition>) {
    let mut seen = std::collections::HashSet::new();
    methods.retain(|m| {
        let fresh = seen.insert(m.name.clone());
        if !fresh {
            tracing::debug!(method = %m.name, "ignoring duplicate method declaration");
        }
        fresh
    });
}

/// Turns the first syntax error of a tree into a `ParseError`.
pub(crate) fn check_syntax(root: tree_sitter::Node, path: &Path) -> Result<(), CompilerError> {
    if !root.has_error() {
        return Ok(());
    }
    let mut cursor = root.walk();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let span = crate::diagnostic::Span::from_node(path, node);
            let message = if node.is_missing() {
                format!("missing {}", node.kind())
            } else {
                "unexpected syntax".to_string()
            };
            return Err(CompilerError::ParseError {
                message,
                file: span.file,
                line: span.start_line,
                column: span.start_col,
            });
        }
        if node.has_error() {
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    Err(CompilerError::ParseError {
        message: "unexpected syntax".to_string(),
        file: path.to_path_buf(),
        line: 1,
        column: 1,
    })
}

/// Cleans a `/** ... */`, `"""..."""` or `//` doc comment.
pub(crate) fn clean_doc(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_start_matches("/**")
        .trim_end_matches("*/")
        .trim_matches('"')
        .trim_matches('\'');
    let lines: Vec<&str> = trimmed
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix("///")
                .or_else(|| line.strip_prefix("//"))
                .or_else(|| line.strip_prefix('*'))
                .unwrap_or(line)
                .trim()
        })
        .filter(|line| !line.starts_with('@'))
        .collect();
    let doc = lines.join("\n").trim().to_string();
    if doc.is_empty() {
        None
    } else {
        Some(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TriggerType;
    use crate::ir::TriggerAnnotation;

    fn class(name: &str, annotated: bool) -> ClassDefinition {
        ClassDefinition {
            name: name.to_string(),
            path: "x".to_string(),
            doc_string: None,
            methods: Vec::new(),
            trigger: annotated.then(|| TriggerAnnotation::new(TriggerType::Jsonrpc)),
        }
    }

    #[test]
    fn test_select_class_prefers_annotated() {
        let picked = select_class(vec![class("A", false), class("B", true)]).unwrap();
        assert_eq!(picked.name, "B");
        let picked = select_class(vec![class("A", false), class("B", false)]).unwrap();
        assert_eq!(picked.name, "A");
        assert!(select_class(Vec::new()).is_none());
    }

    #[test]
    fn test_clean_doc() {
        assert_eq!(
            clean_doc("/**\n * Says hello.\n * @param name who\n */").as_deref(),
            Some("Says hello.")
        );
        assert_eq!(clean_doc("\"\"\"Adds numbers.\"\"\"").as_deref(), Some("Adds numbers."));
        assert_eq!(clean_doc("/** */"), None);
    }

    #[test]
    fn test_dedupe_methods() {
        let mut methods = vec![
            MethodDefinition::new("a", TypeNode::VoidLiteral),
            MethodDefinition::new("a", TypeNode::StringLiteral),
            MethodDefinition::new("b", TypeNode::VoidLiteral),
        ];
        dedupe_methods(&mut methods);
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].return_type, TypeNode::VoidLiteral);
    }
}
