// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shared scaffolding for cross-module behavioural tests: a no-op HTTP
//! executor, an in-memory feature loader, and a recording listener.
//! Not a test binary itself — pulled in with `mod support;` (this file
//! lives under `tests/support/` specifically so cargo does not also
//! treat it as its own top-level integration-test crate).

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use karate_core::{
    config::RunConfig,
    error::{CallError, HttpError},
    expr::host::UnsupportedHostResolver,
    listener::ResultListener,
    loader::FeatureLoader,
    request::{RequestExecutor, RequestExecutorFactory, Response},
    result::{FeatureResult, ScenarioResult, StepResult, SuiteResult},
    scenario::Scenario,
    scheduler::{Scheduler, SuiteContext},
    source::Source,
    value::Value,
};

/// A `RequestExecutor` that stages everything and returns a canned
/// response; no scenario in these tests makes a real HTTP call, but the
/// Scheduler always needs a factory wired in.
#[derive(Default)]
pub struct NullExecutor {
    status: u16,
}

#[async_trait]
impl RequestExecutor for NullExecutor {
    fn stage_url(&mut self, _url: &str) {}
    fn stage_path(&mut self, _segment: &str) {}
    fn stage_method(&mut self, _method: &str) {}
    fn stage_header(&mut self, _name: &str, _value: &str) {}
    fn stage_param(&mut self, _name: &str, _value: &str) {}
    fn stage_cookie(&mut self, _name: &str, _value: &str) {}
    fn stage_form_field(&mut self, _name: &str, _value: &str) {}
    fn stage_multipart_field(&mut self, _name: &str, _value: Value) {}
    fn stage_body(&mut self, _body: Value) {}
    fn reset(&mut self) {}

    async fn execute(&mut self) -> Result<Response, HttpError> {
        Ok(Response { status: if self.status == 0 { 200 } else { self.status }, ..Response::default() })
    }
}

/// An in-memory `FeatureLoader`: maps a `read(...)` path literal straight
/// to feature text, standing in for real classpath/file resolution.
#[derive(Default)]
pub struct StaticLoader {
    pub files: HashMap<String, String>,
}

impl StaticLoader {
    pub fn with(path: impl Into<String>, text: impl Into<String>) -> Self {
        let mut loader = Self::default();
        loader.files.insert(path.into(), text.into());
        loader
    }

    pub fn insert(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.files.insert(path.into(), text.into());
        self
    }
}

#[async_trait]
impl FeatureLoader for StaticLoader {
    async fn load(&self, path: &str) -> Result<Arc<Source>, CallError> {
        match self.files.get(path) {
            Some(text) => Ok(Arc::new(Source::new(path, text.clone()))),
            None => Err(CallError::new(path, "no such feature in test loader")),
        }
    }
}

/// Tracks concurrency of scenarios in flight, for the `@lock` invariants
/// (spec.md §8 invariant 5): records the maximum number simultaneously
/// between `onScenarioStart` and `onScenarioEnd`.
#[derive(Default)]
pub struct ConcurrencyTracker {
    current: AtomicUsize,
    max_observed: AtomicUsize,
    ended_order: Mutex<Vec<String>>,
}

impl ConcurrencyTracker {
    pub fn max_observed(&self) -> usize {
        self.max_observed.load(Ordering::SeqCst)
    }

    pub fn ended_order(&self) -> Vec<String> {
        self.ended_order.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultListener for ConcurrencyTracker {
    async fn on_scenario_start(&self, _scenario: &Scenario) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_observed.fetch_max(now, Ordering::SeqCst);
    }

    async fn on_scenario_end(&self, result: &ScenarioResult) {
        self.current.fetch_sub(1, Ordering::SeqCst);
        self.ended_order.lock().unwrap().push(result.scenario.name.clone());
    }
}

/// Builds a `Scheduler` wired to an in-memory loader and a no-op
/// `RequestExecutor`, with the given worker count.
pub fn scheduler(worker_count: usize, loader: StaticLoader, listener: Arc<dyn ResultListener>) -> Arc<Scheduler> {
    let mut config = RunConfig::default();
    config.worker_count = worker_count;
    let factory: RequestExecutorFactory = Arc::new(|| Box::new(NullExecutor::default()) as Box<dyn RequestExecutor>);
    Scheduler::new(SuiteContext {
        config,
        host_resolver: Arc::new(UnsupportedHostResolver),
        request_factory: factory,
        loader: Arc::new(loader),
        listener,
        call_dispatcher: None,
    })
}

pub fn noop_listener() -> Arc<dyn ResultListener> {
    Arc::new(karate_core::listener::NoopListener)
}

pub fn feature_of(text: &str, name: &str) -> karate_core::Feature {
    karate_core::parse_feature(Arc::new(Source::new(name, text)))
}

pub fn scenario_named<'a>(result: &'a SuiteResult, name: &str) -> &'a ScenarioResult {
    result
        .feature_results
        .iter()
        .flat_map(|f: &FeatureResult| f.scenario_results.iter())
        .find(|s| s.scenario.name == name)
        .unwrap_or_else(|| panic!("no scenario named {name} in suite result"))
}

pub fn step_log(result: &ScenarioResult) -> Vec<&StepResult> {
    result.step_results.iter().collect()
}
