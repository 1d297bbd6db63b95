//! Source-level trigger directives.
//!
//! Classes and methods can carry a comment directive:
//!
//! ```text
//! // polyrpc: deploy http
//! // polyrpc: cron */5 * * * *
//! ```
//!
//! or, in TypeScript and JavaScript, a decorator:
//!
//! ```text
//! @PolyrpcDeploy({ type: "http" })
//! @PolyrpcMethod({ type: "cron", cronString: "0 * * * *" })
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use super::TriggerType;
use crate::ir::TriggerAnnotation;

pub const DIRECTIVE_PREFIX: &str = "polyrpc:";
pub const DEPLOY_DECORATOR: &str = "PolyrpcDeploy";
pub const METHOD_DECORATOR: &str = "PolyrpcMethod";

static DECORATOR_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"type\s*:\s*["'](\w+)["']"#).expect("decorator type pattern is valid")
});
static DECORATOR_CRON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"cronString\s*:\s*["']([^"']*)["']"#).expect("decorator cron pattern is valid")
});

/// Arguments following the directive prefix, if the comment carries one.
fn directive_args(comment: &str) -> Option<Vec<&str>> {
    let (_, rest) = comment.split_once(DIRECTIVE_PREFIX)?;
    let rest = rest.trim_end_matches("*/");
    Some(rest.split_whitespace().collect())
}

/// Parses a class-level directive such as `polyrpc: deploy cron`.
pub fn class_directive(comment: &str) -> Option<TriggerAnnotation> {
    let args = directive_args(comment)?;
    if args.first() != Some(&"deploy") {
        return None;
    }
    let trigger = match args.get(1) {
        Some(&"http") => TriggerType::Http,
        Some(&"cron") => TriggerType::Cron,
        _ => TriggerType::Jsonrpc,
    };
    Some(TriggerAnnotation::new(trigger))
}

/// Parses a method-level directive such as `polyrpc: cron 0 * * * *`.
pub fn method_directive(comment: &str) -> Option<TriggerAnnotation> {
    let args = directive_args(comment)?;
    let annotation = match args.first() {
        Some(&"http") => TriggerAnnotation::new(TriggerType::Http),
        Some(&"cron") => TriggerAnnotation::cron(args[1..].join(" ")),
        Some(&"deploy") => return None,
        _ => TriggerAnnotation::new(TriggerType::Jsonrpc),
    };
    Some(annotation)
}

/// Parses the text of a deploy or method decorator.
///
/// Returns `None` when the decorator is not one of ours.
pub fn decorator(text: &str) -> Option<TriggerAnnotation> {
    let body = text.trim_start_matches('@');
    let name_end = body
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(body.len());
    let name = &body[..name_end];
    if name != DEPLOY_DECORATOR && name != METHOD_DECORATOR {
        return None;
    }

    let trigger = DECORATOR_TYPE
        .captures(body)
        .and_then(|caps| TriggerType::parse(&caps[1]))
        .unwrap_or_default();
    let cron_string = match trigger {
        TriggerType::Cron => DECORATOR_CRON.captures(body).map(|caps| caps[1].to_string()),
        _ => None,
    };

    Some(TriggerAnnotation { trigger, cron_string })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_directive() {
        assert_eq!(
            class_directive("// polyrpc: deploy http"),
            Some(TriggerAnnotation::new(TriggerType::Http))
        );
        assert_eq!(
            class_directive("# polyrpc: deploy"),
            Some(TriggerAnnotation::new(TriggerType::Jsonrpc))
        );
        assert_eq!(class_directive("// just a comment"), None);
        assert_eq!(class_directive("// polyrpc: http"), None);
    }

    #[test]
    fn test_method_directive() {
        assert_eq!(
            method_directive("// polyrpc: cron */5 * * * *"),
            Some(TriggerAnnotation::cron("*/5 * * * *"))
        );
        assert_eq!(
            method_directive("/* polyrpc: http */"),
            Some(TriggerAnnotation::new(TriggerType::Http))
        );
        assert_eq!(method_directive("// polyrpc: deploy"), None);
    }

    #[test]
    fn test_decorator() {
        assert_eq!(
            decorator(r#"@PolyrpcMethod({ type: "cron", cronString: "0 * * * *" })"#),
            Some(TriggerAnnotation::cron("0 * * * *"))
        );
        assert_eq!(
            decorator("@PolyrpcDeploy({type: 'http'})"),
            Some(TriggerAnnotation::new(TriggerType::Http))
        );
        assert_eq!(
            decorator("@PolyrpcDeploy()"),
            Some(TriggerAnnotation::new(TriggerType::Jsonrpc))
        );
        assert_eq!(decorator("@Injectable()"), None);
    }
}
