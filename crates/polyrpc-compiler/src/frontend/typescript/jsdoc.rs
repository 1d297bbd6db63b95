//! JSDoc type tags.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static PARAM_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@param\s+\{([^}]*)\}\s+\[?([A-Za-z_$][\w$]*)").expect("param tag pattern is valid")
});

static RETURNS_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@returns?\s+\{([^}]*)\}").expect("returns tag pattern is valid")
});

/// Types declared by `@param {T} name` and `@returns {T}`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct JsDoc {
    pub params: HashMap<String, String>,
    pub returns: Option<String>,
}

impl JsDoc {
    pub fn parse(comment: &str) -> Self {
        let params = PARAM_TAG
            .captures_iter(comment)
            .map(|c| (c[2].to_string(), normalize(&c[1])))
            .collect();
        let returns = RETURNS_TAG.captures(comment).map(|c| normalize(&c[1]));
        Self { params, returns }
    }
}

/// Rewrites closure-compiler spellings into TypeScript ones.
fn normalize(raw: &str) -> String {
    let ty = raw.trim().trim_start_matches(['?', '!']).trim_end_matches('=');
    ty.replace(".<", "<").replace('*', "any")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        let doc = JsDoc::parse(
            "/**\n * Adds.\n * @param {number} a first\n * @param {Object.<string, *>} [opts]\n * @returns {Promise<number>}\n */",
        );
        assert_eq!(doc.params.get("a").map(String::as_str), Some("number"));
        assert_eq!(doc.params.get("opts").map(String::as_str), Some("Object<string, any>"));
        assert_eq!(doc.returns.as_deref(), Some("Promise<number>"));
    }

    #[test]
    fn test_parse_without_tags() {
        assert_eq!(JsDoc::parse("/** Nothing here. */"), JsDoc::default());
    }
}
