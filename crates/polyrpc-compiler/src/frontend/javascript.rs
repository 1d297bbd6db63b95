//! JavaScript frontend.
//!
//! Shares the ECMAScript visitor with the TypeScript frontend. Signatures carry
//! no types in JavaScript, so parameters and results are `AnyLiteral` unless a
//! JSDoc tag says otherwise.

use crate::context::GenerationContext;
use crate::diagnostic::CompilerError;
use crate::ir::Program;
use super::typescript::parser::{self, Dialect};
use super::{AstGenerator, SourceFile};

pub struct JsAstGenerator;

impl AstGenerator for JsAstGenerator {
    fn language(&self) -> &str {
        "js"
    }

    fn extensions(&self) -> Vec<String> {
        ["js", "mjs", "cjs", "jsx"].iter().map(|e| e.to_string()).collect()
    }

    fn generate(&self, source: &SourceFile, ctx: &GenerationContext) -> Result<Program, CompilerError> {
        let program = parser::parse(Dialect::JavaScript, source, ctx)?;
        tracing::debug!(file = %source.path.display(), "parsed javascript");
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{SourceLanguage, TypeNode};

    #[test]
    fn test_parse_jsdoc_types() {
        let ctx = GenerationContext::new();
        let source = SourceFile::new(
            "calc.js",
            r#"
// polyrpc: deploy
class Calculator {
    /**
     * Adds two numbers.
     * @param {number} a
     * @param {number} b
     * @returns {Promise<number>}
     */
    async add(a, b = 2) {
        return a + b;
    }

    #hidden() {}

    raw(value, ...rest) {}
}
module.exports = { Calculator };
"#,
        );
        let program = JsAstGenerator.generate(&source, &ctx).unwrap();
        assert_eq!(program.original_language, SourceLanguage::Js);

        let class = program.class().unwrap();
        assert_eq!(class.name, "Calculator");
        assert!(class.trigger.is_some());
        assert_eq!(class.methods.len(), 2);

        let add = &class.methods[0];
        assert_eq!(add.doc_string.as_deref(), Some("Adds two numbers."));
        assert_eq!(add.params[0].param_type, TypeNode::DoubleLiteral);
        assert!(add.params[1].optional);
        assert_eq!(add.return_type, TypeNode::promise(TypeNode::DoubleLiteral));

        let raw = &class.methods[1];
        assert_eq!(raw.params[0].param_type, TypeNode::AnyLiteral);
        assert_eq!(raw.params[1].name, "rest");
        assert_eq!(raw.params[1].param_type, TypeNode::array(TypeNode::AnyLiteral));
        assert_eq!(raw.return_type, TypeNode::AnyLiteral);
        assert!(ctx.warnings.snapshot().is_empty());
    }
}
