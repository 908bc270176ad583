// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! One scenario execution: `NEW -> RUNNING -> (PASSED | FAILED | SKIPPED)`
//! (spec.md §4.F).

use std::{sync::Arc, time::Instant};

use crate::{
    dispatcher::{DispatchOutcome, StepDispatcher},
    expr::Evaluator,
    karate_api::KarateApi,
    listener::run_hook,
    result::{ScenarioResult, Status, StepResult},
    scenario::Scenario,
    scheduler::{call_single::MemoCache, SuiteContext},
    tag::Tag,
    value::Value,
};

/// Runs a single [`Scenario`], producing its [`ScenarioResult`]. Stateless
/// across calls — one instance can run every scenario in a suite.
pub struct ScenarioRuntime<'a> {
    context: &'a SuiteContext,
}

impl<'a> ScenarioRuntime<'a> {
    #[must_use]
    pub fn new(context: &'a SuiteContext) -> Self {
        Self { context }
    }

    pub async fn run(
        &self,
        scenario: Scenario,
        feature_scope: &crate::scope::Scope,
        callonce_cache: &Arc<MemoCache>,
        suite_start: Instant,
    ) -> ScenarioResult {
        self.run_with_scope(scenario, feature_scope, callonce_cache, suite_start).await.0
    }

    /// Like [`Self::run`], but also hands back the scenario's own final
    /// scope — needed by `karate.call`/`karate.callSingle`, which must
    /// snapshot the *callee scenario's* bindings (its `def`s), not the
    /// feature scope it was parented on (spec.md §6 "returns its final
    /// feature-scope as a map value").
    pub async fn run_with_scope(
        &self,
        scenario: Scenario,
        feature_scope: &crate::scope::Scope,
        callonce_cache: &Arc<MemoCache>,
        suite_start: Instant,
    ) -> (ScenarioResult, crate::scope::Scope) {
        run_hook(self.context.listener.on_scenario_start(&scenario)).await;
        let (result, scope) = self.run_inner(scenario, feature_scope, callonce_cache, suite_start).await;
        run_hook(self.context.listener.on_scenario_end(&result)).await;
        (result, scope)
    }

    async fn run_inner(
        &self,
        scenario: Scenario,
        feature_scope: &crate::scope::Scope,
        callonce_cache: &Arc<MemoCache>,
        suite_start: Instant,
    ) -> (ScenarioResult, crate::scope::Scope) {
        let start = suite_start.elapsed();

        if let Some(reason) = self.skip_reason(&scenario) {
            let scenario_scope = feature_scope.child();
            return (
                ScenarioResult {
                    scenario,
                    step_results: Vec::new(),
                    status: Status::Skipped,
                    start,
                    end: suite_start.elapsed(),
                    error: Some(reason),
                    embeds: Vec::new(),
                },
                scenario_scope,
            );
        }

        if let Some(conflict) = lock_conflict(&scenario) {
            let scenario_scope = feature_scope.child();
            return (
                ScenarioResult {
                    scenario,
                    step_results: Vec::new(),
                    status: Status::Failed,
                    start,
                    end: suite_start.elapsed(),
                    error: Some(conflict),
                    embeds: Vec::new(),
                },
                scenario_scope,
            );
        }

        let scenario_scope = feature_scope.child();
        // Karate binds every Examples column as a scenario variable, not
        // just a `<token>` text substitution — `* match n == <n>` only
        // passes because the bare `n` on the left resolves through this
        // binding (spec.md §3 Example, §8 invariant 2).
        if let Some(row) = &scenario.example_data {
            for (key, cell) in row.iter() {
                scenario_scope.set(key.clone(), crate::value::coerce_cell(cell));
            }
        }
        let source = scenario.feature.source.clone();
        let steps = scenario.steps_including_background();

        let evaluator = Evaluator::new(self.context.host_resolver.clone());
        let request = (self.context.request_factory)();
        let mut karate = KarateApi::new(self.context.config.clone());
        if let Some(dispatcher) = &self.context.call_dispatcher {
            karate = karate.with_dispatcher(dispatcher.clone());
        }
        let karate = Arc::new(karate);
        // Bound into scope so embedded scripts can read `karate.properties`
        // and call `karate.log(...)`/`karate.callSingle(...)` directly
        // (spec.md §6), not just the Step Dispatcher's own internal uses.
        scenario_scope.set("karate", crate::value::Value::Karate(karate.clone()));
        // Kept alongside the dispatcher's own handle so `karate.log`/
        // `karate.embed` calls made from `def`/`eval`/`match` expressions
        // (spec.md §6) can be drained into the result objects below instead
        // of being silently discarded at scenario end.
        let karate_for_draining = karate.clone();
        let mut dispatcher = StepDispatcher::new(evaluator, request, karate, callonce_cache.clone());

        let mut step_results = Vec::with_capacity(steps.len());
        let mut failed = false;
        let mut failure_error = None;

        for step in &steps {
            if failed {
                let result = StepResult::skipped(step.clone());
                run_hook(self.context.listener.on_step_end(&result)).await;
                step_results.push(result);
                continue;
            }
            let step_started = Instant::now();
            let mut result = match dispatcher.dispatch(step, &scenario_scope, &source).await {
                DispatchOutcome::Passed { log } => StepResult::passed(step.clone(), step_started.elapsed(), log),
                DispatchOutcome::Failed { log, error, match_path } => {
                    failed = true;
                    failure_error = Some(error.clone());
                    StepResult::failed(step.clone(), step_started.elapsed(), log, error, match_path)
                }
            };
            let karate_log = karate_for_draining.take_log();
            if !karate_log.is_empty() {
                result.log = if result.log.is_empty() {
                    karate_log.join("\n")
                } else {
                    format!("{}\n{}", result.log, karate_log.join("\n"))
                };
            }
            run_hook(self.context.listener.on_step_end(&result)).await;
            step_results.push(result);
        }

        let result = ScenarioResult {
            scenario,
            step_results,
            status: if failed { Status::Failed } else { Status::Passed },
            start,
            end: suite_start.elapsed(),
            error: failure_error,
            embeds: karate_for_draining.take_embeds(),
        };
        (result, scenario_scope)
    }

    /// `SKIPPED` is entered when effective tags contain `@ignore` or don't
    /// match the suite's tag expression (spec.md §4.F); the name filter is
    /// applied earlier, at scheduling time, to exclude a scenario from the
    /// run list entirely rather than report it as skipped.
    fn skip_reason(&self, scenario: &Scenario) -> Option<String> {
        let tags = scenario.effective_tags();
        if tags.iter().any(|t| t.is("ignore")) {
            return Some("skipped: @ignore".to_string());
        }
        if let Some(expr) = self.context.config.parsed_tag_expression() {
            if !expr.eval(&tags) {
                return Some("skipped: does not match tag expression".to_string());
            }
        }
        None
    }
}

/// spec.md §9: "the exact semantics of a scenario tagged both `@lock=*`
/// and `@lock=shared` are unspecified in source; leave as explicit
/// error" — generalised here to any scenario carrying more than one
/// `@lock` tag with distinct values.
fn lock_conflict(scenario: &Scenario) -> Option<String> {
    let lock_tags: Vec<Tag> = scenario.effective_tags().into_iter().filter(|t| t.is("lock")).collect();
    let distinct_values: std::collections::HashSet<&str> =
        lock_tags.iter().map(|t| t.first_value().unwrap_or("*")).collect();
    if distinct_values.len() > 1 {
        Some(format!("conflicting @lock tags: {distinct_values:?}"))
    } else {
        None
    }
}
