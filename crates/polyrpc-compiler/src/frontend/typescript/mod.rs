//! TypeScript frontend.

mod jsdoc;
pub mod parser;
pub mod types;

use crate::context::GenerationContext;
use crate::diagnostic::CompilerError;
use crate::ir::Program;
use super::{AstGenerator, SourceFile};
use parser::Dialect;

/// Parses `.ts` and `.tsx` files. Declaration files (`.d.ts`) are skipped by
/// the file discovery, never by this generator.
pub struct TsAstGenerator;

impl AstGenerator for TsAstGenerator {
    fn language(&self) -> &str {
        "ts"
    }

    fn extensions(&self) -> Vec<String> {
        vec!["ts".to_string(), "tsx".to_string()]
    }

    fn generate(&self, source: &SourceFile, ctx: &GenerationContext) -> Result<Program, CompilerError> {
        let dialect = if source.extension() == "tsx" {
            Dialect::Tsx
        } else {
            Dialect::TypeScript
        };
        let program = parser::parse(dialect, source, ctx)?;
        tracing::debug!(file = %source.path.display(), class = ?program.class().map(|c| &c.name), "parsed typescript");
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TriggerType;
    use crate::ir::{DefaultValue, MethodKind, SourceLanguage, TypeNode};

    fn parse(source: &str) -> (Result<Program, CompilerError>, GenerationContext) {
        let ctx = GenerationContext::new();
        let result = TsAstGenerator.generate(&SourceFile::new("greeter.ts", source), &ctx);
        (result, ctx)
    }

    #[test]
    fn test_parse_greeter() {
        let (program, ctx) = parse(
            r#"
/** Says hello. */
export class Greeter {
    constructor(private prefix: string) {}

    /** Greets someone. */
    async hello(name: string, times: number = 1): Promise<string> {
        return `${this.prefix} ${name}`;
    }

    private secret(): void {}
}
"#,
        );
        let program = program.unwrap();
        assert_eq!(program.original_language, SourceLanguage::Ts);

        let class = program.class().unwrap();
        assert_eq!(class.name, "Greeter");
        assert_eq!(class.doc_string.as_deref(), Some("Says hello."));
        assert_eq!(class.methods.len(), 2);
        assert_eq!(class.methods[0].kind, MethodKind::Constructor);

        let hello = &class.methods[1];
        assert_eq!(hello.name, "hello");
        assert_eq!(hello.doc_string.as_deref(), Some("Greets someone."));
        assert_eq!(hello.return_type, TypeNode::promise(TypeNode::StringLiteral));
        assert_eq!(hello.params[0].param_type, TypeNode::StringLiteral);
        assert_eq!(hello.params[1].param_type, TypeNode::DoubleLiteral);
        assert!(hello.params[1].optional);
        assert_eq!(hello.params[1].default_value, Some(DefaultValue::Literal("1".to_string())));
        assert!(ctx.warnings.snapshot().is_empty());
    }

    #[test]
    fn test_parse_type_rules() {
        let (program, ctx) = parse(
            r#"
export type User = { id: number; name?: string; tags: string[] };
interface Page { items: Array<User>; }
export class Users {
    find(ids: Record<string, User>, when: Date | null, kind: "a" | "b"): Promise<Page> { return null as any; }
    mixed(value: string | number, extra: Pick<User, "id">): { [key: string]: boolean } { return {}; }
}
"#,
        );
        let program = program.unwrap();
        let structs: Vec<_> = program.structs().map(|s| s.name.clone()).collect();
        assert_eq!(structs, vec!["User", "Page"]);
        let user = program.find_struct("User").unwrap();
        assert!(user.type_literal.properties[1].optional);
        assert_eq!(
            user.type_literal.properties[2].property_type,
            TypeNode::array(TypeNode::StringLiteral)
        );

        let class = program.class().unwrap();
        let find = &class.methods[0];
        assert_eq!(
            find.params[0].param_type,
            TypeNode::map(TypeNode::StringLiteral, TypeNode::custom("User"))
        );
        assert_eq!(find.params[1].param_type, TypeNode::DateType);
        assert_eq!(find.params[2].param_type, TypeNode::StringLiteral);
        assert_eq!(find.return_type, TypeNode::promise(TypeNode::custom("Page")));

        let mixed = &class.methods[1];
        assert_eq!(mixed.params[0].param_type, TypeNode::AnyLiteral);
        assert_eq!(mixed.params[1].param_type, TypeNode::AnyLiteral);
        assert_eq!(
            mixed.return_type,
            TypeNode::map(TypeNode::StringLiteral, TypeNode::BooleanLiteral)
        );
        assert_eq!(ctx.warnings.snapshot().len(), 2);
    }

    #[test]
    fn test_inline_object_types_become_records() {
        let (program, ctx) = parse(
            r#"
export class Shop {
    buy(item: { sku: string; qty?: number; meta: { note: string } }): Promise<{ ok: boolean }> { return null as any; }
    empty(options: {}): void {}
}
"#,
        );
        let program = program.unwrap();
        let class = program.class().unwrap();

        let TypeNode::StructLiteral(item) = &class.methods[0].params[0].param_type else {
            panic!("item was not hoisted: {:?}", class.methods[0].params[0].param_type);
        };
        assert_eq!(item.name, "ShopBuyItem");
        let names: Vec<_> = item.type_literal.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["sku", "qty", "meta"]);
        assert!(item.type_literal.properties[1].optional);
        let TypeNode::StructLiteral(meta) = &item.type_literal.properties[2].property_type else {
            panic!("nested object was not hoisted");
        };
        assert_eq!(meta.name, "ShopBuyItemMeta");

        let TypeNode::PromiseType { generic } = &class.methods[0].return_type else { panic!("not a promise") };
        assert!(matches!(generic.as_ref(), TypeNode::StructLiteral(r) if r.name == "ShopBuyReturn"));

        // `{}` says nothing about its fields.
        assert_eq!(class.methods[1].params[0].param_type, TypeNode::AnyLiteral);
        assert_eq!(ctx.warnings.snapshot().len(), 1);
    }

    #[test]
    fn test_parse_annotations() {
        let (program, _) = parse(
            r#"
@PolyrpcDeploy({ type: "http" })
export class Hooks {
    @PolyrpcMethod({ type: "cron", cronString: "0 * * * *" })
    tick(): void {}

    // polyrpc: jsonrpc
    ping(): string { return "pong"; }
}

export class Plain {
    other(): void {}
}
"#,
        );
        let class = program.unwrap().class().cloned().unwrap();
        assert_eq!(class.name, "Hooks");
        assert_eq!(class.trigger.as_ref().map(|t| t.trigger), Some(TriggerType::Http));
        let tick = class.methods[0].trigger.clone().unwrap();
        assert_eq!(tick.trigger, TriggerType::Cron);
        assert_eq!(tick.cron_string.as_deref(), Some("0 * * * *"));
        assert_eq!(class.methods[1].trigger.as_ref().map(|t| t.trigger), Some(TriggerType::Jsonrpc));
    }

    #[test]
    fn test_parse_errors() {
        let (result, _) = parse("export class Broken { hello( {");
        assert!(matches!(result, Err(CompilerError::ParseError { .. })));

        let (result, _) = parse("export const x = 1;");
        assert!(matches!(result, Err(CompilerError::NoClassFound { .. })));
    }
}
