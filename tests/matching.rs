// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-to-end step dispatch and the Match Engine (spec.md §8 invariant 9;
//! S1, S2).

mod support;

use karate_core::result::Status;

#[tokio::test(flavor = "multi_thread")]
async fn s1_basic_parse_and_run_passes() {
    let feature = support::feature_of("Feature: F\nScenario: hello\n* def a = 1\n* match a == 1\n", "t.feature");
    let sched = support::scheduler(1, support::StaticLoader::default(), support::noop_listener());
    let result = sched.run_suite(vec![feature]).await;

    assert_eq!(result.passed_count, 1);
    assert_eq!(result.failed_count, 0);
    let scenario_result = &result.feature_results[0].scenario_results[0];
    assert_eq!(scenario_result.scenario.name, "hello");
    assert_eq!(scenario_result.step_results.len(), 2);
    assert!(scenario_result.step_results.iter().all(|s| s.status == Status::Passed));
}

#[tokio::test(flavor = "multi_thread")]
async fn s2_match_failure_reports_path_and_message() {
    let feature = support::feature_of("Feature: F\nScenario: hello\n* def a = 1\n* match a == 2\n", "t.feature");
    let sched = support::scheduler(1, support::StaticLoader::default(), support::noop_listener());
    let result = sched.run_suite(vec![feature]).await;

    assert_eq!(result.failed_count, 1);
    let scenario_result = &result.feature_results[0].scenario_results[0];
    assert_eq!(scenario_result.status, Status::Failed);
    let failing_step = scenario_result.step_results.iter().find(|s| s.status == Status::Failed).unwrap();
    assert_eq!(failing_step.match_path.as_deref(), Some("$"));
    let message = failing_step.error.as_deref().unwrap();
    assert!(message.contains("actual=1"), "message was: {message}");
    assert!(message.contains("expected=2"), "message was: {message}");
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_step_skips_the_rest_of_the_scenario() {
    let feature = support::feature_of(
        "Feature: F\nScenario: hello\n* def a = 1\n* match a == 2\n* def b = 2\n* match b == 2\n",
        "t.feature",
    );
    let sched = support::scheduler(1, support::StaticLoader::default(), support::noop_listener());
    let result = sched.run_suite(vec![feature]).await;

    let scenario_result = &result.feature_results[0].scenario_results[0];
    let statuses: Vec<_> = scenario_result.step_results.iter().map(|s| s.status).collect();
    assert_eq!(statuses, vec![Status::Passed, Status::Failed, Status::Skipped, Status::Skipped]);
    assert_eq!(scenario_result.step_results.len(), 4, "every step still produces exactly one StepResult");
}

#[tokio::test(flavor = "multi_thread")]
async fn failure_message_has_feature_line_scenario_and_path() {
    let feature = support::feature_of("Feature: F\nScenario: hello\n* def a = 1\n* match a == 2\n", "t.feature");
    let sched = support::scheduler(1, support::StaticLoader::default(), support::noop_listener());
    let result = sched.run_suite(vec![feature]).await;
    let scenario_result = &result.feature_results[0].scenario_results[0];
    let message = scenario_result.failure_message().expect("failed scenario has a failure message");
    assert!(message.contains("hello"));
    assert!(message.contains("at $"));
}

#[tokio::test(flavor = "multi_thread")]
async fn match_is_a_pure_function_of_operator_actual_expected() {
    use karate_core::{
        expr::{host::UnsupportedHostResolver, Evaluator},
        match_engine::{do_match, MatchOperator},
        scope::Scope,
        source::Source,
        value::Value,
    };
    use std::sync::Arc;

    let evaluator = Evaluator::new(Arc::new(UnsupportedHostResolver));
    let scope = Scope::root();
    let source = Arc::new(Source::new("t.feature", ""));

    let a = Value::list(vec![Value::int(1), Value::int(2)]);
    let b = Value::list(vec![Value::int(1), Value::int(2)]);

    let r1 = do_match(MatchOperator::Equals, &a, &b, &evaluator, &scope, &source).await;
    let r2 = do_match(MatchOperator::Equals, &a, &b, &evaluator, &scope, &source).await;
    assert_eq!(r1.pass, r2.pass);
    assert_eq!(r1.path, r2.path);
}

#[tokio::test(flavor = "multi_thread")]
async fn contains_only_is_order_insensitive() {
    use karate_core::{
        expr::{host::UnsupportedHostResolver, Evaluator},
        match_engine::{do_match, MatchOperator},
        scope::Scope,
        source::Source,
        value::Value,
    };
    use std::sync::Arc;

    let evaluator = Evaluator::new(Arc::new(UnsupportedHostResolver));
    let scope = Scope::root();
    let source = Arc::new(Source::new("t.feature", ""));

    let actual = Value::list(vec![Value::int(2), Value::int(1), Value::int(3)]);
    let expected = Value::list(vec![Value::int(1), Value::int(2), Value::int(3)]);
    let result = do_match(MatchOperator::ContainsOnly, &actual, &expected, &evaluator, &scope, &source).await;
    assert!(result.pass);
}

#[tokio::test(flavor = "multi_thread")]
async fn schema_token_hash_string_matches_any_string_value() {
    let feature = support::feature_of(
        "Feature: F\nScenario: hello\n* def a = 'anything'\n* match a == '#string'\n",
        "t.feature",
    );
    let sched = support::scheduler(1, support::StaticLoader::default(), support::noop_listener());
    let result = sched.run_suite(vec![feature]).await;
    assert_eq!(result.passed_count, 1);
}
