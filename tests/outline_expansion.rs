// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `Scenario Outline` expansion, literal and dynamic (spec.md §8
//! invariant 2; S3).

mod support;

use std::sync::Arc;

use karate_core::source::Source;

#[tokio::test(flavor = "multi_thread")]
async fn literal_examples_expand_one_scenario_per_row_and_all_pass() {
    let feature = support::feature_of(
        "Feature: F\n\
         Scenario Outline: outline <n>\n\
         * match n == <n>\n\
         Examples:\n\
         | n |\n\
         | 1 |\n\
         | 2 |\n\
         | 3 |\n",
        "t.feature",
    );

    let sched = support::scheduler(2, support::StaticLoader::default(), support::noop_listener());
    let result = sched.run_suite(vec![feature]).await;

    assert_eq!(result.passed_count, 3);
    assert_eq!(result.failed_count, 0);
    let names: Vec<_> = result.feature_results[0].scenario_results.iter().map(|s| s.scenario.name.clone()).collect();
    assert_eq!(names, vec!["outline 1".to_string(), "outline 2".to_string(), "outline 3".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn examples_placeholders_substitute_into_name_and_table_cells() {
    let feature = support::feature_of(
        "Feature: F\n\
         Scenario Outline: scenario for <label>\n\
         * def label = '<label>'\n\
         * match label == '<label>'\n\
         Examples:\n\
         | label |\n\
         | alpha |\n\
         | beta  |\n",
        "t.feature",
    );
    let sched = support::scheduler(1, support::StaticLoader::default(), support::noop_listener());
    let result = sched.run_suite(vec![feature]).await;
    assert_eq!(result.passed_count, 2);
    let names: Vec<_> = result.feature_results[0].scenario_results.iter().map(|s| s.scenario.name.clone()).collect();
    assert_eq!(names, vec!["scenario for alpha".to_string(), "scenario for beta".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn dynamic_outline_expands_from_evaluated_expression() {
    // No literal `| header |` table follows `Examples:` — the single line
    // is the runtime expression (spec.md §3 "dynamic... Examples source is
    // a runtime expression, not a literal table").
    let feature = support::feature_of(
        "Feature: F\n\
         Scenario Outline: dyn <n>\n\
         * match n == <n>\n\
         Examples:\n\
         [{ n: 1 }, { n: 2 }]\n",
        "t.feature",
    );

    let sched = support::scheduler(1, support::StaticLoader::default(), support::noop_listener());
    let result = sched.run_suite(vec![feature]).await;

    assert_eq!(result.passed_count, 2);
    assert_eq!(result.failed_count, 0);
    assert!(result.feature_results[0].scenario_results.iter().all(|s| s.scenario.is_dynamic()));
}

#[tokio::test(flavor = "multi_thread")]
async fn dynamic_outline_expression_error_becomes_synthetic_failed_scenario() {
    // spec.md §9: "a dynamic outline expression that throws" reproduces
    // the source's synthetic error scenario, reported as a failed
    // `parse_or_setup_error` scenario rather than aborting the suite.
    let feature = support::feature_of(
        "Feature: F\n\
         Scenario Outline: dyn <n>\n\
         * match n == <n>\n\
         Examples:\n\
         \"not a list\"\n",
        "t.feature",
    );

    let sched = support::scheduler(1, support::StaticLoader::default(), support::noop_listener());
    let result = sched.run_suite(vec![feature]).await;

    assert_eq!(result.failed_count, 1);
    let scenario = &result.feature_results[0].scenario_results[0];
    assert!(scenario.scenario.name.starts_with("parse_or_setup_error"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unique_id_distinguishes_example_rows() {
    let source = Arc::new(Source::new(
        "demos/outline.feature",
        "Feature: F\nScenario Outline: o\n* match n == <n>\nExamples:\n| n |\n| 1 |\n| 2 |\n",
    ));
    let feature = karate_core::parse_feature(source);
    let sched = support::scheduler(1, support::StaticLoader::default(), support::noop_listener());
    let result = sched.run_suite(vec![feature]).await;
    let ids: Vec<_> =
        result.feature_results[0].scenario_results.iter().map(|s| s.scenario.unique_id()).collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
}
