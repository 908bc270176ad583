// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The HTTP collaborator seam (spec.md §6 "HTTP staging & execution").
//!
//! The Step Dispatcher stages a request onto a [`RequestExecutor`] one
//! call at a time (`url`, `path`, `method`, `header`, ...), then calls
//! [`RequestExecutor::execute`] once the `method` step commits it. The
//! engine is transport-agnostic; a real implementation plugs in
//! whatever HTTP client it likes behind this trait.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{error::HttpError, value::Value};

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, Vec<String>>,
    pub body: Value,
    pub cookies: HashMap<String, String>,
    pub timing: Duration,
}

impl Default for Response {
    fn default() -> Self {
        Self { status: 0, headers: HashMap::new(), body: Value::Null, cookies: HashMap::new(), timing: Duration::ZERO }
    }
}

impl Response {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

/// A single outgoing request under construction. Every `stage_*` call
/// is a pure accumulation; nothing goes over the wire until
/// [`RequestExecutor::execute`] (spec.md §4.E `method`).
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    fn stage_url(&mut self, url: &str);
    fn stage_path(&mut self, segment: &str);
    fn stage_method(&mut self, method: &str);
    fn stage_header(&mut self, name: &str, value: &str);
    fn stage_param(&mut self, name: &str, value: &str);
    fn stage_cookie(&mut self, name: &str, value: &str);
    fn stage_form_field(&mut self, name: &str, value: &str);
    fn stage_multipart_field(&mut self, name: &str, value: Value);
    fn stage_body(&mut self, body: Value);
    fn reset(&mut self);

    async fn execute(&mut self) -> Result<Response, HttpError>;
}

/// Produces a fresh, unstaged [`RequestExecutor`] for one scenario. A
/// factory rather than a shared instance because request staging
/// (`url`/`header`/... steps) is inherently per-scenario mutable state.
pub type RequestExecutorFactory = Arc<dyn Fn() -> Box<dyn RequestExecutor> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = Response {
            status: 200,
            headers: HashMap::from([("Content-Type".to_string(), vec!["application/json".to_string()])]),
            body: Value::Null,
            cookies: HashMap::new(),
            timing: Duration::ZERO,
        };
        assert_eq!(response.header("content-type"), Some("application/json"));
    }
}
