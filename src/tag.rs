// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tags (`@name` or `@name=v1,v2`) and tag-expression evaluation.

/// A single `@tag` occurrence, with its `=value,value` suffix split out.
///
/// `@lock=shared` parses to `name = "lock"`, `values = ["shared"]`;
/// `@smoke` parses to `name = "smoke"`, `values = []`. Equality is by raw
/// text, matching spec.md §3.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub line: usize,
    pub raw_text: String,
    pub name: String,
    pub values: Vec<String>,
}

impl Tag {
    /// Parses a single `@...` token's text (including the leading `@`).
    #[must_use]
    pub fn parse(line: usize, raw_text: &str) -> Self {
        let body = raw_text.strip_prefix('@').unwrap_or(raw_text);
        let (name, values) = match body.split_once('=') {
            Some((n, rest)) => (n.to_string(), rest.split(',').map(str::to_string).collect()),
            None => (body.to_string(), Vec::new()),
        };
        Self { line, raw_text: raw_text.to_string(), name, values }
    }

    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    #[must_use]
    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

/// A boolean expression over tag names, e.g. `@smoke and not @slow`.
///
/// This is the minimal grammar the Scheduler needs to filter scenarios by
/// `effective_tags` (spec.md §4.H "Inputs"): AND/OR/NOT over bare tag names.
#[derive(Debug, Clone)]
pub enum TagExpr {
    And(Box<TagExpr>, Box<TagExpr>),
    Or(Box<TagExpr>, Box<TagExpr>),
    Not(Box<TagExpr>),
    Name(String),
}

impl TagExpr {
    /// Evaluates this expression against a scenario's effective tag names.
    #[must_use]
    pub fn eval(&self, tags: &[Tag]) -> bool {
        match self {
            Self::And(l, r) => l.eval(tags) && r.eval(tags),
            Self::Or(l, r) => l.eval(tags) || r.eval(tags),
            Self::Not(t) => !t.eval(tags),
            Self::Name(n) => tags.iter().any(|t| t.name == *n),
        }
    }

    /// Parses a tag expression of the form `tag (and|or) tag ...`, with
    /// optional leading `not`/`!`, left-associative, no parentheses. This
    /// covers the scenario-filtering needs of the Scheduler without pulling
    /// in a full boolean-expression grammar (out of scope per spec.md §1).
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let mut terms = input.split_whitespace().peekable();
        let mut expr = Self::parse_term(&mut terms)?;
        while let Some(op) = terms.next() {
            let rhs = Self::parse_term(&mut terms)?;
            expr = match op.to_ascii_lowercase().as_str() {
                "and" => Self::And(Box::new(expr), Box::new(rhs)),
                "or" => Self::Or(Box::new(expr), Box::new(rhs)),
                _ => return None,
            };
        }
        Some(expr)
    }

    fn parse_term<'a>(terms: &mut std::iter::Peekable<impl Iterator<Item = &'a str>>) -> Option<Self> {
        let mut negate = false;
        let mut tok = terms.next()?;
        while tok.eq_ignore_ascii_case("not") || tok == "!" {
            negate = !negate;
            tok = terms.next()?;
        }
        let name = tok.strip_prefix('@').unwrap_or(tok).to_string();
        let base = Self::Name(name);
        Some(if negate { Self::Not(Box::new(base)) } else { base })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_tag() {
        let t = Tag::parse(3, "@smoke");
        assert_eq!(t.name, "smoke");
        assert!(t.values.is_empty());
    }

    #[test]
    fn parses_keyed_tag_with_multiple_values() {
        let t = Tag::parse(1, "@name=v1,v2");
        assert_eq!(t.name, "name");
        assert_eq!(t.values, vec!["v1".to_string(), "v2".to_string()]);
    }

    #[test]
    fn lock_shared_tag() {
        let t = Tag::parse(1, "@lock=shared");
        assert_eq!(t.first_value(), Some("shared"));
    }

    #[test]
    fn tag_expr_and_or_not() {
        let tags = vec![Tag::parse(1, "@smoke")];
        assert!(TagExpr::parse("@smoke").unwrap().eval(&tags));
        assert!(!TagExpr::parse("not @smoke").unwrap().eval(&tags));
        assert!(TagExpr::parse("@smoke or @slow").unwrap().eval(&tags));
        assert!(!TagExpr::parse("@smoke and @slow").unwrap().eval(&tags));
    }
}
