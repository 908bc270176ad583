// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Schema tokens: `#string`, `#regex PATTERN`, `#(expr)`, and friends
//! (spec.md §4.D "Schema tokens").

use lazy_regex::regex;

use crate::value::Value;

/// A parsed schema token, or `None` if the text carried no `#` sigil (an
/// ordinary literal expected value).
#[derive(Debug, Clone)]
pub enum Schema {
    Type(&'static str),
    Null,
    NotNull,
    Present,
    NotPresent,
    Uuid,
    Regex(String),
    /// `#[]` (any length) or `#[N]` (exact length), optionally with an
    /// element schema (`#[] SCHEMA`).
    Array { exact_len: Option<usize>, element: Option<String> },
    /// `#(expr)`, `#(^expr)`, `#(^^expr)` — the inner expression text and
    /// the embed mode it should be matched with.
    Embed { expr: String, mode: EmbedMode },
    /// `##(expr)` — optional: matches if `expr` matches, or if the actual
    /// value is absent/null.
    OptionalEmbed { expr: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    Equals,
    Contains,
    ContainsDeep,
}

impl Schema {
    /// Parses `text` as a schema token. Returns `None` if `text` doesn't
    /// start with `#`, meaning the caller should treat it as a literal.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if !trimmed.starts_with('#') {
            return None;
        }

        if let Some(rest) = trimmed.strip_prefix("##(").and_then(|r| r.strip_suffix(')')) {
            return Some(Self::OptionalEmbed { expr: rest.to_string() });
        }
        if let Some(rest) = trimmed.strip_prefix("#(^^").and_then(|r| r.strip_suffix(')')) {
            return Some(Self::Embed { expr: rest.to_string(), mode: EmbedMode::ContainsDeep });
        }
        if let Some(rest) = trimmed.strip_prefix("#(^").and_then(|r| r.strip_suffix(')')) {
            return Some(Self::Embed { expr: rest.to_string(), mode: EmbedMode::Contains });
        }
        if let Some(rest) = trimmed.strip_prefix("#(").and_then(|r| r.strip_suffix(')')) {
            return Some(Self::Embed { expr: rest.to_string(), mode: EmbedMode::Equals });
        }
        if let Some(rest) = trimmed.strip_prefix("#regex ") {
            return Some(Self::Regex(rest.to_string()));
        }
        if let Some(rest) = trimmed.strip_prefix("#[") {
            let close = rest.find(']')?;
            let len_text = &rest[..close];
            let exact_len = if len_text.is_empty() { None } else { len_text.parse().ok() };
            let element = rest[close + 1..].trim();
            let element = if element.is_empty() { None } else { Some(element.to_string()) };
            return Some(Self::Array { exact_len, element });
        }

        Some(match trimmed {
            "#string" => Self::Type("string"),
            "#number" => Self::Type("number"),
            "#boolean" => Self::Type("boolean"),
            "#array" => Self::Type("array"),
            "#object" => Self::Type("object"),
            "#null" => Self::Null,
            "#notnull" => Self::NotNull,
            "#present" => Self::Present,
            "#notpresent" => Self::NotPresent,
            "#uuid" => Self::Uuid,
            _ => return None,
        })
    }

    /// Checks `actual` against this schema, independent of expression
    /// embeds (those are resolved by the caller, which has scope access;
    /// see [`crate::match_engine::do_match_with_schema_eval`]).
    #[must_use]
    pub fn matches_static(&self, actual: &Value) -> bool {
        match self {
            Self::Type(t) => actual.type_name() == *t,
            Self::Null => matches!(actual, Value::Null),
            Self::NotNull => !matches!(actual, Value::Null | Value::Undefined),
            Self::Present => !matches!(actual, Value::Undefined),
            Self::NotPresent => matches!(actual, Value::Undefined),
            Self::Uuid => matches!(actual, Value::Str(s) if uuid_regex().is_match(s)),
            Self::Regex(pattern) => {
                matches!(actual, Value::Str(s) if regex::Regex::new(pattern).is_ok_and(|re| re.is_match(s)))
            }
            Self::Array { exact_len, element: _ } => match actual {
                Value::List(l) => exact_len.is_none_or(|n| l.lock().unwrap().len() == n),
                _ => false,
            },
            // Embeds require expression evaluation; the caller resolves
            // these before calling this method and never reaches here for
            // an unresolved embed.
            Self::Embed { .. } | Self::OptionalEmbed { .. } => false,
        }
    }
}

fn uuid_regex() -> &'static regex::Regex {
    regex!(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_type_tokens() {
        assert!(matches!(Schema::parse("#string"), Some(Schema::Type("string"))));
        assert!(Schema::parse("not a schema").is_none());
    }

    #[test]
    fn parses_array_with_exact_length() {
        match Schema::parse("#[3]").unwrap() {
            Schema::Array { exact_len, element } => {
                assert_eq!(exact_len, Some(3));
                assert!(element.is_none());
            }
            other => panic!("expected Array, got {other:?}"),
        }
    }

    #[test]
    fn parses_embed_modes() {
        assert!(matches!(Schema::parse("#(foo)").unwrap(), Schema::Embed { mode: EmbedMode::Equals, .. }));
        assert!(matches!(Schema::parse("#(^foo)").unwrap(), Schema::Embed { mode: EmbedMode::Contains, .. }));
        assert!(matches!(Schema::parse("#(^^foo)").unwrap(), Schema::Embed { mode: EmbedMode::ContainsDeep, .. }));
    }

    #[test]
    fn uuid_schema_matches_canonical_form() {
        let schema = Schema::parse("#uuid").unwrap();
        assert!(schema.matches_static(&Value::Str("550e8400-e29b-41d4-a716-446655440000".into())));
        assert!(!schema.matches_static(&Value::Str("not-a-uuid".into())));
    }
}
