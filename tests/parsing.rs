// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Parser/lexer round-trip and scenario-model invariants (spec.md §8
//! invariants 1, 3, 4; S1).

use std::sync::Arc;

use karate_core::{
    feature::FeatureSection,
    parser,
    source::Source,
    step::StepKeyword,
};

fn parse(text: &str) -> karate_core::Feature {
    parser::load(Arc::new(Source::new("t.feature", text)))
}

#[test]
fn basic_feature_has_one_scenario_two_steps() {
    let feature = parse("Feature: F\nScenario: hello\n* def a = 1\n* match a == 1\n");
    assert_eq!(feature.sections.len(), 1);
    let FeatureSection::Scenario(scenario) = &feature.sections[0] else {
        panic!("expected a plain scenario");
    };
    assert_eq!(scenario.name, "hello");
    assert_eq!(scenario.steps.len(), 2);
    assert_eq!(scenario.steps[0].keyword, StepKeyword::Def);
    assert_eq!(scenario.steps[1].keyword, StepKeyword::Match);
}

#[test]
fn reparsing_a_stable_ast_is_a_no_op() {
    let text = "Feature: F\n@smoke\nScenario: hello\n* def a = 1\n* match a == 1\n";
    let first = parse(text);
    let second = parse(text);
    assert_eq!(first.name, second.name);
    assert_eq!(first.sections.len(), second.sections.len());
    let (FeatureSection::Scenario(a), FeatureSection::Scenario(b)) = (&first.sections[0], &second.sections[0]) else {
        panic!("expected plain scenarios");
    };
    assert_eq!(a.name, b.name);
    assert_eq!(a.steps.len(), b.steps.len());
    assert_eq!(a.tags.len(), b.tags.len());
}

#[test]
fn effective_tags_is_feature_tags_then_scenario_tags() {
    let feature = parse("Feature: F\n@featuretag\nScenario: hello\n@own\n* def a = 1\n");
    let FeatureSection::Scenario(section_scenario) = &feature.sections[0] else {
        panic!("expected plain scenario");
    };
    let scenario = karate_core::Scenario { feature: Arc::new(feature.clone()), ..section_scenario.clone() };
    let names: Vec<_> = scenario.effective_tags().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["featuretag".to_string(), "own".to_string()]);
}

#[test]
fn background_steps_precede_scenario_steps_on_the_same_scope() {
    let feature = parse("Feature: F\nBackground:\n* def shared = 1\nScenario: hello\n* match shared == 1\n");
    let FeatureSection::Scenario(section_scenario) = &feature.sections[0] else {
        panic!("expected plain scenario");
    };
    let feature_arc = Arc::new(feature.clone());
    let scenario = karate_core::Scenario { feature: feature_arc, ..section_scenario.clone() };
    let all_steps = scenario.steps_including_background();
    assert_eq!(all_steps.len(), 2);
    assert_eq!(all_steps[0].keyword, StepKeyword::Def);
    assert_eq!(all_steps[1].keyword, StepKeyword::Match);
}

#[test]
fn an_unparseable_feature_becomes_a_single_failed_scenario() {
    let feature = parse("not a feature file at all\n");
    assert_eq!(feature.sections.len(), 1);
    let FeatureSection::Scenario(scenario) = &feature.sections[0] else {
        panic!("expected synthetic error scenario");
    };
    assert!(scenario.name.starts_with("parse_or_setup_error:"));
}
