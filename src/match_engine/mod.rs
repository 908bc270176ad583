// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Structural comparison with a closed operator set and schema tokens
//! (spec.md §4.D).

pub mod schema;

use std::sync::Arc;

use crate::{
    error::MatchError,
    expr::Evaluator,
    match_engine::schema::{EmbedMode, Schema},
    scope::Scope,
    source::Source,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    ContainsOnly,
    ContainsAny,
    ContainsDeep,
    ContainsOnlyDeep,
    ContainsAnyDeep,
    EachEquals,
    EachContains,
    EachContainsDeep,
    EachContainsOnly,
    EachContainsAny,
}

impl MatchOperator {
    /// Parses the operator sequence recognised in `STEP_MATCH` mode
    /// (spec.md §4.A): `== | != | contains | !contains | within | !within`
    /// optionally followed by `only`/`any` and/or `deep`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let head = words.next()?;
        let rest: Vec<&str> = words.collect();
        let deep = rest.contains(&"deep");
        let only = rest.contains(&"only");
        let any = rest.contains(&"any");
        Some(match head {
            "==" => MatchOperator::Equals,
            "!=" => MatchOperator::NotEquals,
            "contains" | "within" if only => {
                if deep {
                    MatchOperator::ContainsOnlyDeep
                } else {
                    MatchOperator::ContainsOnly
                }
            }
            "contains" | "within" if any => {
                if deep {
                    MatchOperator::ContainsAnyDeep
                } else {
                    MatchOperator::ContainsAny
                }
            }
            "contains" | "within" => {
                if deep {
                    MatchOperator::ContainsDeep
                } else {
                    MatchOperator::Contains
                }
            }
            "!contains" | "!within" => MatchOperator::NotContains,
            _ => return None,
        })
    }
}

/// The result of one `do_match` call: whether it passed, and on failure the
/// JSON-pointer-like path to the first mismatch (spec.md §4.D).
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub pass: bool,
    pub path: String,
    pub expected: Value,
    pub actual: Value,
    pub message: Option<String>,
}

impl MatchResult {
    #[must_use]
    fn pass(expected: Value, actual: Value) -> Self {
        Self { pass: true, path: "$".into(), expected, actual, message: None }
    }

    #[must_use]
    fn fail(path: impl Into<String>, expected: Value, actual: Value, message: impl Into<String>) -> Self {
        Self { pass: false, path: path.into(), expected, actual, message: Some(message.into()) }
    }

    pub fn into_match_error(self) -> Option<MatchError> {
        if self.pass {
            None
        } else {
            Some(MatchError::new(self.path, self.actual, self.expected, self.message.unwrap_or_default()))
        }
    }
}

/// Evaluates `operator` between `actual` and `expected`. `expected` may
/// contain schema tokens (`#string`, `#(expr)`, ...), resolved against
/// `evaluator`/`scope`/`source` when present (spec.md §4.D "Schema
/// tokens"). The engine is a pure function of its three value/operator
/// inputs plus whatever the embedded expressions read from `scope`
/// (spec.md §8 invariant 9 "idempotent match" — re-running with the same
/// scope state yields the same result).
pub async fn do_match(
    operator: MatchOperator,
    actual: &Value,
    expected: &Value,
    evaluator: &Evaluator,
    scope: &Scope,
    source: &Arc<Source>,
) -> MatchResult {
    match_at("$", operator, actual, expected, evaluator, scope, source).await
}

fn match_at<'a>(
    path: &'a str,
    operator: MatchOperator,
    actual: &'a Value,
    expected: &'a Value,
    evaluator: &'a Evaluator,
    scope: &'a Scope,
    source: &'a Arc<Source>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = MatchResult> + 'a>> {
    Box::pin(async move {
        if let Value::Str(text) = expected {
            if let Some(schema) = Schema::parse(text) {
                return match_schema(path, &schema, actual, evaluator, scope, source).await;
            }
        }

        use MatchOperator::{
            Contains, ContainsAny, ContainsAnyDeep, ContainsDeep, ContainsOnly, ContainsOnlyDeep, EachContains,
            EachContainsAny, EachContainsDeep, EachContainsOnly, EachEquals, Equals, NotContains, NotEquals,
        };

        match operator {
            Equals => match_equals(path, actual, expected),
            NotEquals => {
                let r = match_equals(path, actual, expected);
                MatchResult { pass: !r.pass, ..r }
            }
            Contains | ContainsDeep => match_contains(path, actual, expected, matches!(operator, ContainsDeep)),
            ContainsOnly | ContainsOnlyDeep => match_contains_only(path, actual, expected),
            ContainsAny | ContainsAnyDeep => match_contains_any(path, actual, expected),
            NotContains => {
                let r = match_contains(path, actual, expected, false);
                MatchResult { pass: !r.pass, ..r }
            }
            EachEquals | EachContains | EachContainsDeep | EachContainsOnly | EachContainsAny => {
                match_each(path, operator, actual, expected, evaluator, scope, source).await
            }
        }
    })
}

async fn match_each(
    path: &str,
    operator: MatchOperator,
    actual: &Value,
    expected: &Value,
    evaluator: &Evaluator,
    scope: &Scope,
    source: &Arc<Source>,
) -> MatchResult {
    let Value::List(list) = actual else {
        return MatchResult::fail(path, expected.clone(), actual.clone(), "EACH_* requires actual to be a list");
    };
    let inner_op = match operator {
        MatchOperator::EachEquals => MatchOperator::Equals,
        MatchOperator::EachContains => MatchOperator::Contains,
        MatchOperator::EachContainsDeep => MatchOperator::ContainsDeep,
        MatchOperator::EachContainsOnly => MatchOperator::ContainsOnly,
        MatchOperator::EachContainsAny => MatchOperator::ContainsAny,
        _ => unreachable!(),
    };
    let items = list.lock().unwrap().clone();
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{path}[{i}]");
        let result = match_at(&item_path, inner_op, item, expected, evaluator, scope, source).await;
        if !result.pass {
            return result;
        }
    }
    MatchResult::pass(expected.clone(), actual.clone())
}

async fn match_schema(
    path: &str,
    schema: &Schema,
    actual: &Value,
    evaluator: &Evaluator,
    scope: &Scope,
    source: &Arc<Source>,
) -> MatchResult {
    match schema {
        Schema::Embed { expr, mode } => {
            let expected = match evaluator.eval(source.clone(), expr, 0, 0, scope).await {
                Ok(v) => v,
                Err(e) => return MatchResult::fail(path, Value::Undefined, actual.clone(), e.to_string()),
            };
            let op = match mode {
                EmbedMode::Equals => MatchOperator::Equals,
                EmbedMode::Contains => MatchOperator::Contains,
                EmbedMode::ContainsDeep => MatchOperator::ContainsDeep,
            };
            match_at(path, op, actual, &expected, evaluator, scope, source).await
        }
        Schema::OptionalEmbed { expr } => {
            if matches!(actual, Value::Undefined | Value::Null) {
                return MatchResult::pass(Value::Null, actual.clone());
            }
            let expected = match evaluator.eval(source.clone(), expr, 0, 0, scope).await {
                Ok(v) => v,
                Err(e) => return MatchResult::fail(path, Value::Undefined, actual.clone(), e.to_string()),
            };
            match_at(path, MatchOperator::Equals, actual, &expected, evaluator, scope, source).await
        }
        Schema::Array { element: Some(element_schema), .. } if matches!(actual, Value::List(_)) => {
            let expected_schema = Value::Str(element_schema.clone());
            let r = schema.matches_static(actual);
            if !r {
                return MatchResult::fail(path, Value::Str(format!("{schema:?}")), actual.clone(), "array schema mismatch");
            }
            match_each(path, MatchOperator::EachEquals, actual, &expected_schema, evaluator, scope, source).await
        }
        other => {
            if other.matches_static(actual) {
                MatchResult::pass(Value::Str(format!("{other:?}")), actual.clone())
            } else {
                MatchResult::fail(path, Value::Str(format!("{other:?}")), actual.clone(), "schema mismatch")
            }
        }
    }
}

fn match_equals(path: &str, actual: &Value, expected: &Value) -> MatchResult {
    if let Some(mismatch_path) = first_mismatch(path, actual, expected) {
        MatchResult::fail(
            mismatch_path,
            expected.clone(),
            actual.clone(),
            format!("actual={} expected={}", actual.display_string(), expected.display_string()),
        )
    } else {
        MatchResult::pass(expected.clone(), actual.clone())
    }
}

fn first_mismatch(path: &str, actual: &Value, expected: &Value) -> Option<String> {
    match (actual, expected) {
        (Value::List(a), Value::List(b)) => {
            let a = a.lock().unwrap();
            let b = b.lock().unwrap();
            if a.len() != b.len() {
                return Some(path.to_string());
            }
            a.iter().zip(b.iter()).enumerate().find_map(|(i, (x, y))| first_mismatch(&format!("{path}[{i}]"), x, y))
        }
        (Value::Map(a), Value::Map(b)) => {
            let a = a.lock().unwrap();
            let b = b.lock().unwrap();
            if a.len() != b.len() {
                return Some(path.to_string());
            }
            for (k, v) in a.iter() {
                match b.get(k) {
                    Some(bv) => {
                        if let Some(p) = first_mismatch(&format!("{path}.{k}"), v, bv) {
                            return Some(p);
                        }
                    }
                    None => return Some(format!("{path}.{k}")),
                }
            }
            None
        }
        _ => {
            if actual.deep_eq(expected) {
                None
            } else {
                Some(path.to_string())
            }
        }
    }
}

fn match_contains(path: &str, actual: &Value, expected: &Value, deep: bool) -> MatchResult {
    match (actual, expected) {
        (Value::Map(a), Value::Map(b)) => {
            let a = a.lock().unwrap();
            let b = b.lock().unwrap();
            for (k, v) in b.iter() {
                match a.get(k) {
                    Some(av) if deep => {
                        if !contains_value(av, v) {
                            return MatchResult::fail(format!("{path}.{k}"), v.clone(), av.clone(), "CONTAINS_DEEP mismatch");
                        }
                    }
                    Some(av) if av.deep_eq(v) => {}
                    Some(av) => return MatchResult::fail(format!("{path}.{k}"), v.clone(), av.clone(), "CONTAINS mismatch"),
                    None => return MatchResult::fail(format!("{path}.{k}"), v.clone(), Value::Undefined, "key missing"),
                }
            }
            MatchResult::pass(expected.clone(), actual.clone())
        }
        (Value::List(a), Value::List(b)) => {
            let a = a.lock().unwrap();
            let b = b.lock().unwrap();
            for item in b.iter() {
                if !a.iter().any(|x| if deep { contains_value(x, item) } else { x.deep_eq(item) }) {
                    return MatchResult::fail(path, item.clone(), actual.clone(), "CONTAINS: element not found");
                }
            }
            MatchResult::pass(expected.clone(), actual.clone())
        }
        _ => match_equals(path, actual, expected),
    }
}

fn contains_value(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Map(_), Value::Map(_)) | (Value::List(_), Value::List(_)) => {
            match_contains("$", actual, expected, true).pass
        }
        _ => actual.deep_eq(expected),
    }
}

fn match_contains_only(path: &str, actual: &Value, expected: &Value) -> MatchResult {
    let (Value::List(a), Value::List(b)) = (actual, expected) else {
        return match_equals(path, actual, expected);
    };
    let a = a.lock().unwrap();
    let b = b.lock().unwrap();
    if a.len() != b.len() {
        return MatchResult::fail(path, expected.clone(), actual.clone(), "CONTAINS_ONLY: length mismatch");
    }
    let mut remaining: Vec<Value> = b.clone();
    for item in a.iter() {
        if let Some(pos) = remaining.iter().position(|x| x.deep_eq(item)) {
            remaining.remove(pos);
        } else {
            return MatchResult::fail(path, expected.clone(), actual.clone(), "CONTAINS_ONLY: unexpected element");
        }
    }
    MatchResult::pass(expected.clone(), actual.clone())
}

fn match_contains_any(path: &str, actual: &Value, expected: &Value) -> MatchResult {
    let (Value::List(a), Value::List(b)) = (actual, expected) else {
        return match_equals(path, actual, expected);
    };
    let a = a.lock().unwrap();
    let b = b.lock().unwrap();
    if b.iter().any(|item| a.iter().any(|x| x.deep_eq(item))) {
        MatchResult::pass(expected.clone(), actual.clone())
    } else {
        MatchResult::fail(path, expected.clone(), actual.clone(), "CONTAINS_ANY: no element matched")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::host::UnsupportedHostResolver;
    use std::sync::Arc as StdArc;

    fn evaluator() -> Evaluator {
        Evaluator::new(StdArc::new(UnsupportedHostResolver))
    }

    fn source() -> Arc<Source> {
        Arc::new(Source::new("t.feature", ""))
    }

    #[tokio::test]
    async fn equals_passes_on_identical_scalars() {
        let scope = Scope::root();
        let result = do_match(MatchOperator::Equals, &Value::int(1), &Value::int(1), &evaluator(), &scope, &source()).await;
        assert!(result.pass);
    }

    #[tokio::test]
    async fn equals_fails_and_reports_path() {
        let scope = Scope::root();
        let mut map_a = linked_hash_map::LinkedHashMap::new();
        map_a.insert("x".to_string(), Value::int(1));
        let mut map_b = linked_hash_map::LinkedHashMap::new();
        map_b.insert("x".to_string(), Value::int(2));
        let result =
            do_match(MatchOperator::Equals, &Value::map(map_a), &Value::map(map_b), &evaluator(), &scope, &source()).await;
        assert!(!result.pass);
        assert_eq!(result.path, "$.x");
    }

    #[tokio::test]
    async fn contains_only_checks_every_rhs_key() {
        let scope = Scope::root();
        let mut actual = linked_hash_map::LinkedHashMap::new();
        actual.insert("a".to_string(), Value::int(1));
        actual.insert("b".to_string(), Value::int(2));
        let mut expected = linked_hash_map::LinkedHashMap::new();
        expected.insert("a".to_string(), Value::int(1));
        let result =
            do_match(MatchOperator::Contains, &Value::map(actual), &Value::map(expected), &evaluator(), &scope, &source())
                .await;
        assert!(result.pass);
    }

    #[tokio::test]
    async fn schema_string_token_matches_any_string() {
        let scope = Scope::root();
        let result = do_match(
            MatchOperator::Equals,
            &Value::Str("hello".into()),
            &Value::Str("#string".into()),
            &evaluator(),
            &scope,
            &source(),
        )
        .await;
        assert!(result.pass);
    }

    #[tokio::test]
    async fn each_equals_applies_operator_to_every_element() {
        let scope = Scope::root();
        let actual = Value::list(vec![Value::int(1), Value::int(1)]);
        let result =
            do_match(MatchOperator::EachEquals, &actual, &Value::int(1), &evaluator(), &scope, &source()).await;
        assert!(result.pass);
    }

    #[test]
    fn operator_parse_recognises_modifiers() {
        assert_eq!(MatchOperator::parse("contains only"), Some(MatchOperator::ContainsOnly));
        assert_eq!(MatchOperator::parse("within any deep"), Some(MatchOperator::ContainsAnyDeep));
        assert_eq!(MatchOperator::parse("!contains"), Some(MatchOperator::NotContains));
    }
}
