//! A loose parser for type annotations written as text.
//!
//! Python, Go, Kotlin, Dart and JSDoc types all reach the compiler as strings
//! (either from tree-sitter node text or from a helper toolchain). This parser
//! accepts the union of their syntaxes and never fails: anything it cannot
//! make sense of becomes [`TypeExpr::Opaque`].

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// `name` or `name<args>` / `name[args]`.
    Named { name: String, args: Vec<TypeExpr> },
    /// A string or numeric literal type.
    Literal(String),
    /// `T[]`, `[]T`, `[N]T`, `...T`.
    Array(Box<TypeExpr>),
    /// Go `map[K]V`.
    Map(Box<TypeExpr>, Box<TypeExpr>),
    /// `*T`.
    Pointer(Box<TypeExpr>),
    /// `T?`.
    Nullable(Box<TypeExpr>),
    /// `A | B`.
    Union(Vec<TypeExpr>),
    Opaque(String),
}

impl TypeExpr {
    pub fn named(name: &str) -> Self {
        TypeExpr::Named {
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    /// Drops `null`, `None`, `undefined` members from a union.
    pub fn without_null(&self) -> Option<&TypeExpr> {
        match self {
            TypeExpr::Union(members) => {
                let mut rest = members.iter().filter(|m| !m.is_null());
                let first = rest.next()?;
                if rest.next().is_none() {
                    Some(first)
                } else {
                    None
                }
            }
            other => Some(other),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TypeExpr::Named { name, args } if args.is_empty()
            && matches!(name.as_str(), "null" | "None" | "undefined" | "nil"))
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named { name, args } if args.is_empty() => f.write_str(name),
            TypeExpr::Named { name, args } => {
                let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "{}<{}>", name, args.join(", "))
            }
            TypeExpr::Literal(text) | TypeExpr::Opaque(text) => f.write_str(text),
            TypeExpr::Array(inner) => write!(f, "{}[]", inner),
            TypeExpr::Map(key, value) => write!(f, "map[{}]{}", key, value),
            TypeExpr::Pointer(inner) => write!(f, "*{}", inner),
            TypeExpr::Nullable(inner) => write!(f, "{}?", inner),
            TypeExpr::Union(members) => {
                let members: Vec<String> = members.iter().map(ToString::to_string).collect();
                f.write_str(&members.join(" | "))
            }
        }
    }
}

/// Parses a type annotation.
pub fn parse(text: &str) -> TypeExpr {
    let mut cursor = Cursor { src: text.trim(), pos: 0 };
    let expr = cursor.union();
    cursor.skip_ws();
    if cursor.pos < cursor.src.len() {
        return TypeExpr::Opaque(text.trim().to_string());
    }
    expr
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn union(&mut self) -> TypeExpr {
        let first = self.postfix();
        let mut members = vec![first];
        while self.eat("|") {
            members.push(self.postfix());
        }
        if members.len() == 1 {
            members.remove(0)
        } else {
            TypeExpr::Union(members)
        }
    }

    fn postfix(&mut self) -> TypeExpr {
        let mut expr = self.primary();
        loop {
            if self.eat("[]") {
                expr = TypeExpr::Array(Box::new(expr));
            } else if self.eat("?") {
                expr = TypeExpr::Nullable(Box::new(expr));
            } else {
                return expr;
            }
        }
    }

    fn primary(&mut self) -> TypeExpr {
        self.skip_ws();
        if self.eat("[]") || self.eat("...") {
            return TypeExpr::Array(Box::new(self.postfix()));
        }
        if self.eat("*") {
            return TypeExpr::Pointer(Box::new(self.postfix()));
        }
        if self.eat("map[") {
            let key = self.union();
            if !self.eat("]") {
                return self.opaque_rest();
            }
            let value = self.postfix();
            return TypeExpr::Map(Box::new(key), Box::new(value));
        }
        if self.eat("interface{}") {
            return TypeExpr::named("interface{}");
        }

        match self.peek() {
            Some('[') => {
                let group = self.balanced('[', ']');
                let inner = group.trim_start_matches('[').trim_end_matches(']');
                if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
                    TypeExpr::Array(Box::new(self.postfix()))
                } else {
                    TypeExpr::Opaque(group.to_string())
                }
            }
            Some('{') => TypeExpr::Opaque(self.balanced('{', '}').to_string()),
            Some('(') => {
                let group = self.balanced('(', ')');
                let inner = &group[1..group.len().saturating_sub(1).max(1)];
                match parse(inner) {
                    TypeExpr::Opaque(_) => TypeExpr::Opaque(group.to_string()),
                    expr => expr,
                }
            }
            Some(q @ ('"' | '\'')) => {
                let start = self.pos;
                self.pos += 1;
                while let Some(c) = self.peek() {
                    self.pos += c.len_utf8();
                    if c == q {
                        break;
                    }
                }
                TypeExpr::Literal(self.src[start..self.pos].to_string())
            }
            Some(c) if is_ident_char(c) => self.named(),
            _ => self.opaque_rest(),
        }
    }

    fn named(&mut self) -> TypeExpr {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !is_ident_char(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        let name = self.src[start..self.pos].to_string();
        if name.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return TypeExpr::Literal(name);
        }

        self.skip_ws();
        let close = if self.rest().starts_with('<') {
            '>'
        } else if self.rest().starts_with('[') && !self.rest().starts_with("[]") {
            ']'
        } else {
            return TypeExpr::Named { name, args: Vec::new() };
        };
        self.pos += 1;

        let mut args = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(&close.to_string()) {
                break;
            }
            if self.pos >= self.src.len() {
                return TypeExpr::Opaque(self.src[start..].to_string());
            }
            let before = self.pos;
            args.push(self.union());
            self.eat(",");
            if self.pos == before {
                return self.opaque_rest();
            }
        }
        TypeExpr::Named { name, args }
    }

    /// Consumes a bracketed group including nested brackets.
    fn balanced(&mut self, open: char, close: char) -> &'a str {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            if c == open {
                depth += 1;
            } else if c == close {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
        }
        &self.src[start..self.pos]
    }

    fn opaque_rest(&mut self) -> TypeExpr {
        let text = self.rest().to_string();
        self.pos = self.src.len();
        TypeExpr::Opaque(text)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, args: Vec<TypeExpr>) -> TypeExpr {
        TypeExpr::Named { name: name.to_string(), args }
    }

    #[test]
    fn test_parse_generics() {
        assert_eq!(
            parse("Map<String, List<Int>>"),
            named("Map", vec![named("String", vec![]), named("List", vec![named("Int", vec![])])])
        );
        assert_eq!(
            parse("Dict[str, List[int]]"),
            named("Dict", vec![named("str", vec![]), named("List", vec![named("int", vec![])])])
        );
    }

    #[test]
    fn test_parse_go_forms() {
        assert_eq!(parse("[]string"), TypeExpr::Array(Box::new(TypeExpr::named("string"))));
        assert_eq!(parse("*User"), TypeExpr::Pointer(Box::new(TypeExpr::named("User"))));
        assert_eq!(
            parse("map[string][]int"),
            TypeExpr::Map(
                Box::new(TypeExpr::named("string")),
                Box::new(TypeExpr::Array(Box::new(TypeExpr::named("int"))))
            )
        );
        assert_eq!(parse("interface{}"), TypeExpr::named("interface{}"));
        assert_eq!(parse("time.Time"), TypeExpr::named("time.Time"));
        assert_eq!(parse("[4]byte"), TypeExpr::Array(Box::new(TypeExpr::named("byte"))));
    }

    #[test]
    fn test_parse_suffixes_and_unions() {
        assert_eq!(parse("string[]"), TypeExpr::Array(Box::new(TypeExpr::named("string"))));
        assert_eq!(parse("String?"), TypeExpr::Nullable(Box::new(TypeExpr::named("String"))));
        let union = parse("str | None");
        assert_eq!(union.without_null(), Some(&TypeExpr::named("str")));
        assert!(parse("'a' | 'b'").without_null().is_none());
    }

    #[test]
    fn test_parse_opaque() {
        assert!(matches!(parse("{ a: string }"), TypeExpr::Opaque(_)));
        assert!(matches!(parse("List[str"), TypeExpr::Opaque(_)));
        assert_eq!(parse("(string)"), TypeExpr::named("string"));
    }
}
