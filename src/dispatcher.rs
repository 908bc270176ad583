// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Maps the closed keyword set to actions against the per-scenario
//! [`Scope`] (spec.md §4.E).
//!
//! The dispatcher never lets an error cross its own boundary: every
//! failure mode (a bad expression, a failed match, a request that
//! errors) is converted into a `DispatchOutcome::Failed` here, so the
//! Scenario Runtime only ever deals with pass/fail, never a `Result`.

use std::sync::Arc;

use crate::{
    error::CallError,
    expr::Evaluator,
    karate_api::KarateApi,
    match_engine::{self, MatchOperator},
    request::RequestExecutor,
    scheduler::call_single::MemoCache,
    scope::Scope,
    source::Source,
    step::{Step, StepKeyword},
    value::Value,
};

/// What a single step produced, stripped of timing (the Scenario Runtime
/// attaches `StepResult`'s elapsed/log fields around this).
pub enum DispatchOutcome {
    Passed { log: String },
    Failed { log: String, error: String, match_path: Option<String> },
}

impl DispatchOutcome {
    fn passed(log: impl Into<String>) -> Self {
        Self::Passed { log: log.into() }
    }

    fn failed(log: impl Into<String>, error: impl Into<String>, match_path: Option<String>) -> Self {
        Self::Failed { log: log.into(), error: error.into(), match_path }
    }
}

/// Owns the collaborators a step may need: the expression evaluator, the
/// staged HTTP request, and the `karate.*` surface. One instance lives
/// for the whole scenario; `retry until` re-issues the previous HTTP call
/// through the same staged [`RequestExecutor`].
pub struct StepDispatcher {
    evaluator: Evaluator,
    request: Box<dyn RequestExecutor>,
    karate: Arc<KarateApi>,
    /// Feature-scoped `call once` memoisation (spec.md §4.G point 4) —
    /// distinct from `karate.callSingle`'s suite-scoped cache, which lives
    /// on the [`crate::karate_api::CallDispatcher`] instead.
    callonce_cache: Arc<MemoCache>,
    last_method: Option<String>,
}

impl StepDispatcher {
    #[must_use]
    pub fn new(evaluator: Evaluator, request: Box<dyn RequestExecutor>, karate: Arc<KarateApi>, callonce_cache: Arc<MemoCache>) -> Self {
        Self { evaluator, request, karate, callonce_cache, last_method: None }
    }

    /// Dispatches one step against `scope`. Never panics on a user
    /// expression error; always returns a terminal outcome.
    pub async fn dispatch(&mut self, step: &Step, scope: &Scope, source: &Arc<Source>) -> DispatchOutcome {
        match self.dispatch_inner(step, scope, source).await {
            Ok(outcome) => outcome,
            Err(message) => DispatchOutcome::failed(String::new(), message, None),
        }
    }

    async fn dispatch_inner(&mut self, step: &Step, scope: &Scope, source: &Arc<Source>) -> Result<DispatchOutcome, String> {
        match &step.keyword {
            StepKeyword::Def => self.dispatch_def(step, scope, source).await,
            StepKeyword::Eval => self.dispatch_eval(step, scope, source).await,
            StepKeyword::Print => self.dispatch_print(step, scope, source).await,
            StepKeyword::Assert => self.dispatch_assert(step, scope, source).await,
            StepKeyword::Match => self.dispatch_match(step, scope, source).await,
            StepKeyword::Configure => self.dispatch_configure(step, scope, source).await,
            StepKeyword::Url => self.dispatch_single_string(step, scope, source, |r, v| r.stage_url(v)).await,
            StepKeyword::Path => self.dispatch_single_string(step, scope, source, |r, v| r.stage_path(v)).await,
            StepKeyword::Method => self.dispatch_method(step, scope, source).await,
            StepKeyword::Header => self.dispatch_named_value(step, scope, source, |r, n, v| r.stage_header(n, v)).await,
            StepKeyword::Param => self.dispatch_named_value(step, scope, source, |r, n, v| r.stage_param(n, v)).await,
            StepKeyword::Cookie => self.dispatch_named_value(step, scope, source, |r, n, v| r.stage_cookie(n, v)).await,
            StepKeyword::FormField => self.dispatch_named_value(step, scope, source, |r, n, v| r.stage_form_field(n, v)).await,
            StepKeyword::MultipartField | StepKeyword::MultipartFile | StepKeyword::MultipartEntity => {
                self.dispatch_multipart(step, scope, source).await
            }
            StepKeyword::SoapAction => self.dispatch_single_string(step, scope, source, |r, v| r.stage_header("SOAPAction", v)).await,
            StepKeyword::Request => self.dispatch_request_body(step, scope, source).await,
            StepKeyword::Status => self.dispatch_status(step, scope, source).await,
            StepKeyword::RetryUntil => self.dispatch_retry_until(step, scope, source).await,
            StepKeyword::Call | StepKeyword::CallOnce => self.dispatch_call(step, scope, source).await,
            StepKeyword::Other(name) => Err(format!("unrecognised step keyword '{name}'")),
        }
    }

    async fn eval_text(&self, text: &str, scope: &Scope, source: &Arc<Source>) -> Result<Value, String> {
        self.evaluator.eval(source.clone(), text, 0, 0, scope).await.map_err(|e| e.to_string())
    }

    async fn dispatch_def(&self, step: &Step, scope: &Scope, source: &Arc<Source>) -> Result<DispatchOutcome, String> {
        let (name, expr) = split_assignment(&step.text).ok_or_else(|| format!("malformed def: '{}'", step.text))?;
        let value = self.eval_text(expr, scope, source).await?;
        scope.set(name, value);
        Ok(DispatchOutcome::passed(String::new()))
    }

    async fn dispatch_eval(&self, step: &Step, scope: &Scope, source: &Arc<Source>) -> Result<DispatchOutcome, String> {
        self.evaluator.exec(source.clone(), &step.text, 0, 0, scope).await.map_err(|e| e.to_string())?;
        Ok(DispatchOutcome::passed(String::new()))
    }

    async fn dispatch_print(&self, step: &Step, scope: &Scope, source: &Arc<Source>) -> Result<DispatchOutcome, String> {
        let mut rendered = Vec::new();
        for part in step.text.split(',') {
            let value = self.eval_text(part.trim(), scope, source).await?;
            rendered.push(value.display_string());
        }
        let line = rendered.join(" ");
        self.karate.log(&[Value::from(line.as_str())]);
        Ok(DispatchOutcome::passed(line))
    }

    async fn dispatch_assert(&self, step: &Step, scope: &Scope, source: &Arc<Source>) -> Result<DispatchOutcome, String> {
        let value = self.eval_text(&step.text, scope, source).await?;
        if value.is_truthy() {
            Ok(DispatchOutcome::passed(String::new()))
        } else {
            Ok(DispatchOutcome::failed(String::new(), format!("assertion failed: {}", step.text), None))
        }
    }

    async fn dispatch_match(&self, step: &Step, scope: &Scope, source: &Arc<Source>) -> Result<DispatchOutcome, String> {
        let (actual_text, operator, expected_text) =
            split_match(&step.text).ok_or_else(|| format!("malformed match: '{}'", step.text))?;
        let actual = self.eval_text(&actual_text, scope, source).await?;
        let expected = self.eval_text(&expected_text, scope, source).await?;
        let result = match_engine::do_match(operator, &actual, &expected, &self.evaluator, scope, source).await;
        if result.pass {
            Ok(DispatchOutcome::passed(String::new()))
        } else {
            Ok(DispatchOutcome::failed(String::new(), result.message.unwrap_or_else(|| "match failed".into()), Some(result.path)))
        }
    }

    async fn dispatch_configure(&self, step: &Step, scope: &Scope, source: &Arc<Source>) -> Result<DispatchOutcome, String> {
        let (key, expr) = split_assignment(&step.text).ok_or_else(|| format!("malformed configure: '{}'", step.text))?;
        let value = self.eval_text(expr, scope, source).await?;
        scope.set(format!("configure.{key}"), value);
        Ok(DispatchOutcome::passed(String::new()))
    }

    async fn dispatch_single_string(
        &mut self,
        step: &Step,
        scope: &Scope,
        source: &Arc<Source>,
        stage: impl FnOnce(&mut dyn RequestExecutor, &str),
    ) -> Result<DispatchOutcome, String> {
        let value = self.eval_text(&step.text, scope, source).await?;
        stage(self.request.as_mut(), &value.display_string());
        Ok(DispatchOutcome::passed(String::new()))
    }

    async fn dispatch_named_value(
        &mut self,
        step: &Step,
        scope: &Scope,
        source: &Arc<Source>,
        stage: impl FnOnce(&mut dyn RequestExecutor, &str, &str),
    ) -> Result<DispatchOutcome, String> {
        let (name, expr) = split_assignment(&step.text).ok_or_else(|| format!("malformed '{}'", step.text))?;
        let value = self.eval_text(expr, scope, source).await?;
        stage(self.request.as_mut(), name, &value.display_string());
        Ok(DispatchOutcome::passed(String::new()))
    }

    async fn dispatch_multipart(&mut self, step: &Step, scope: &Scope, source: &Arc<Source>) -> Result<DispatchOutcome, String> {
        let (name, expr) = split_assignment(&step.text).ok_or_else(|| format!("malformed multipart step: '{}'", step.text))?;
        let value = self.eval_text(expr, scope, source).await?;
        self.request.stage_multipart_field(name, value);
        Ok(DispatchOutcome::passed(String::new()))
    }

    async fn dispatch_method(&mut self, step: &Step, scope: &Scope, source: &Arc<Source>) -> Result<DispatchOutcome, String> {
        let method = step.text.trim();
        self.request.stage_method(method);
        self.last_method = Some(method.to_string());
        match self.request.execute().await {
            Ok(response) => {
                scope.set("response", response.body);
                scope.set("responseStatus", Value::int(i64::from(response.status)));
                Ok(DispatchOutcome::passed(String::new()))
            }
            Err(e) => Ok(DispatchOutcome::failed(String::new(), e.to_string(), None)),
        }
    }

    async fn dispatch_request_body(&mut self, step: &Step, scope: &Scope, source: &Arc<Source>) -> Result<DispatchOutcome, String> {
        let value = if let Some(doc) = &step.doc_string {
            Value::from(doc.content.as_str())
        } else {
            self.eval_text(&step.text, scope, source).await?
        };
        self.request.stage_body(value);
        Ok(DispatchOutcome::passed(String::new()))
    }

    async fn dispatch_status(&self, step: &Step, scope: &Scope, _source: &Arc<Source>) -> Result<DispatchOutcome, String> {
        let expected: i64 = step.text.trim().parse().map_err(|_| format!("invalid status literal '{}'", step.text))?;
        let actual = scope.get("responseStatus");
        if actual.deep_eq(&Value::int(expected)) {
            Ok(DispatchOutcome::passed(String::new()))
        } else {
            Ok(DispatchOutcome::failed(
                String::new(),
                format!("status code was not {expected}, actual: {}", actual.display_string()),
                None,
            ))
        }
    }

    /// `retry until COND`: re-issues the last HTTP method while `COND` is
    /// falsy, bounded by a fixed attempt ceiling (spec.md §4.E leaves the
    /// limit unspecified; ten attempts matches the teacher's own retry
    /// helpers' default ceiling).
    async fn dispatch_retry_until(&mut self, step: &Step, scope: &Scope, source: &Arc<Source>) -> Result<DispatchOutcome, String> {
        const MAX_ATTEMPTS: u32 = 10;
        let method = self.last_method.clone().ok_or_else(|| "retry until with no preceding HTTP call".to_string())?;
        for attempt in 0..MAX_ATTEMPTS {
            let response = self.request.execute().await.map_err(|e| e.to_string())?;
            scope.set("response", response.body);
            scope.set("responseStatus", Value::int(i64::from(response.status)));
            let cond = self.eval_text(&step.text, scope, source).await?;
            if cond.is_truthy() {
                return Ok(DispatchOutcome::passed(String::new()));
            }
            if attempt + 1 < MAX_ATTEMPTS {
                self.request.stage_method(&method);
            }
        }
        Ok(DispatchOutcome::failed(String::new(), format!("retry until '{}' never became true", step.text), None))
    }

    async fn dispatch_call(&self, step: &Step, scope: &Scope, source: &Arc<Source>) -> Result<DispatchOutcome, String> {
        let once = matches!(step.keyword, StepKeyword::CallOnce);
        let (path, arg_text) = split_call(&step.text).ok_or_else(|| format!("malformed call: '{}'", step.text))?;
        let arg = match arg_text {
            Some(text) => self.eval_text(&text, scope, source).await?,
            None => Value::Undefined,
        };
        let result: Result<Value, CallError> = if once {
            let karate = &self.karate;
            let path_owned = path.clone();
            self.callonce_cache.get_or_run(&path, || karate.call(&path_owned, arg)).await
        } else {
            self.karate.call(&path, arg).await
        };
        match result {
            Ok(Value::Map(m)) => {
                for (k, v) in m.lock().unwrap().iter() {
                    scope.set(k.clone(), v.clone());
                }
                Ok(DispatchOutcome::passed(String::new()))
            }
            Ok(_) => Ok(DispatchOutcome::passed(String::new())),
            Err(e) => Ok(DispatchOutcome::failed(String::new(), e.to_string(), None)),
        }
    }
}

/// Splits `NAME = EXPR`-shaped step text on the first top-level `=` that
/// is not part of `==`/`!=`/`<=`/`>=`.
fn split_assignment(text: &str) -> Option<(&str, &str)> {
    let bytes = text.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'=' {
            let prev = if i == 0 { b' ' } else { bytes[i - 1] };
            let next = bytes.get(i + 1).copied().unwrap_or(b' ');
            if next == b'=' || matches!(prev, b'!' | b'<' | b'>' | b'=') {
                continue;
            }
            return Some((text[..i].trim(), text[i + 1..].trim()));
        }
    }
    None
}

/// Splits `ACTUAL OP EXPECTED` match text on the first recognised
/// operator token (spec.md §4.A `STEP_MATCH` mode already isolates the
/// operator during lexing; this free function re-derives the split from
/// the flattened step text for the dispatcher's convenience).
fn split_match(text: &str) -> Option<(String, MatchOperator, String)> {
    let words: Vec<&str> = text.split_whitespace().collect();
    for i in 0..words.len() {
        for len in (1..=3.min(words.len() - i)).rev() {
            let candidate = words[i..i + len].join(" ");
            if let Some(op) = MatchOperator::parse(&candidate) {
                let actual = words[..i].join(" ");
                let expected = words[i + len..].join(" ");
                if !actual.is_empty() && !expected.is_empty() {
                    return Some((actual, op, expected));
                }
            }
        }
    }
    None
}

/// Splits `[once] read(PATH) [ARG]` call text into the classpath/file
/// path literal and an optional trailing argument expression.
fn split_call(text: &str) -> Option<(String, Option<String>)> {
    let text = text.trim();
    let open = text.find("read(")?;
    let close = text[open..].find(')')? + open;
    let inner = text[open + "read(".len()..close].trim().trim_matches(|c| c == '\'' || c == '"');
    let rest = text[close + 1..].trim();
    let arg = if rest.is_empty() { None } else { Some(rest.to_string()) };
    Some((inner.to_string(), arg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_assignment_ignores_comparison_operators() {
        assert_eq!(split_assignment("a = 1"), Some(("a", "1")));
        assert!(split_assignment("a == 1").is_none());
    }

    #[test]
    fn split_match_finds_multi_word_operator() {
        let (actual, op, expected) = split_match("response contains only { a: 1 }").unwrap();
        assert_eq!(actual, "response");
        assert_eq!(op, MatchOperator::ContainsOnly);
        assert_eq!(expected, "{ a: 1 }");
    }

    #[test]
    fn split_call_extracts_path_and_argument() {
        let (path, arg) = split_call("read('classpath:foo.feature') { a: 1 }").unwrap();
        assert_eq!(path, "classpath:foo.feature");
        assert_eq!(arg.as_deref(), Some("{ a: 1 }"));
    }

    #[test]
    fn split_call_without_argument() {
        let (path, arg) = split_call("read('foo.feature')").unwrap();
        assert_eq!(path, "foo.feature");
        assert!(arg.is_none());
    }
}
