// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Result objects streamed to a [`crate::listener::ResultListener`]
//! (spec.md §3 "Result objects").

use std::{sync::Arc, time::Duration};

use crate::{error::CoreError, feature::Feature, karate_api::Embed, scenario::Scenario, step::Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct StepResult {
    pub step: Step,
    pub status: Status,
    pub duration: Duration,
    pub log: String,
    pub error: Option<String>,
    pub match_path: Option<String>,
}

impl StepResult {
    #[must_use]
    pub fn passed(step: Step, duration: Duration, log: String) -> Self {
        Self { step, status: Status::Passed, duration, log, error: None, match_path: None }
    }

    #[must_use]
    pub fn failed(step: Step, duration: Duration, log: String, error: impl ToString, match_path: Option<String>) -> Self {
        Self { step, status: Status::Failed, duration, log, error: Some(error.to_string()), match_path }
    }

    #[must_use]
    pub fn skipped(step: Step) -> Self {
        Self { step, status: Status::Skipped, duration: Duration::ZERO, log: String::new(), error: None, match_path: None }
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    pub step_results: Vec<StepResult>,
    pub status: Status,
    pub start: Duration,
    pub end: Duration,
    pub error: Option<String>,
    /// `karate.embed(bytes, mimeType)` calls made anywhere during the
    /// scenario (spec.md §6), attached to the scenario's HTML report
    /// rather than to any one step.
    pub embeds: Vec<Embed>,
}

impl ScenarioResult {
    /// User-visible failure summary: `<feature>:<line> <scenario name> —
    /// <error class>: <message>[ at <path>]` (spec.md §7).
    #[must_use]
    pub fn failure_message(&self) -> Option<String> {
        let failing_step = self.step_results.iter().find(|s| s.status == Status::Failed)?;
        let path = failing_step.match_path.as_ref().map(|p| format!(" at {p}")).unwrap_or_default();
        Some(format!(
            "{}:{} {} — {}{}",
            self.scenario.feature.source.file_name_without_extension(),
            self.scenario.line,
            self.scenario.name,
            failing_step.error.as_deref().unwrap_or("step failed"),
            path,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct FeatureResult {
    pub feature: Arc<Feature>,
    pub scenario_results: Vec<ScenarioResult>,
    pub status: Status,
}

impl FeatureResult {
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.scenario_results.iter().filter(|s| s.status == Status::Passed).count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.scenario_results.iter().filter(|s| s.status == Status::Failed).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SuiteResult {
    pub feature_results: Vec<FeatureResult>,
    pub passed_count: usize,
    pub failed_count: usize,
    pub start: Duration,
    pub end: Duration,
    /// Set if suite-level setup (loading a `Source`, wiring collaborators)
    /// failed before any feature could run.
    pub setup_error: Option<CoreError>,
}

impl SuiteResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed_count == 0 && self.setup_error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{source::Source, step::StepKeyword, step::StepPrefix};

    fn bare_scenario() -> Scenario {
        let feature = Arc::new(Feature {
            source: Arc::new(Source::new("demos/x.feature", "")),
            line: 1,
            tags: Vec::new(),
            name: "x".into(),
            description: String::new(),
            background: None,
            sections: Vec::new(),
        });
        Scenario {
            feature,
            section_index: 0,
            example_index: -1,
            line: 5,
            tags: Vec::new(),
            name: "s".into(),
            description: String::new(),
            steps: Vec::new(),
            dynamic_expression: None,
            example_data: None,
        }
    }

    #[test]
    fn failure_message_includes_feature_line_and_scenario_name() {
        let scenario = bare_scenario();
        let step = Step::new(0, 6, StepPrefix::Star, StepKeyword::Match, "a == 1");
        let result = ScenarioResult {
            scenario,
            step_results: vec![StepResult::failed(step, Duration::ZERO, String::new(), "match failed", Some("$".into()))],
            status: Status::Failed,
            start: Duration::ZERO,
            end: Duration::ZERO,
            error: None,
            embeds: Vec::new(),
        };
        let message = result.failure_message().unwrap();
        assert!(message.contains("x:5"));
        assert!(message.contains("match failed"));
        assert!(message.contains("at $"));
    }

    #[test]
    fn suite_is_success_only_with_zero_failures_and_no_setup_error() {
        let mut suite = SuiteResult::default();
        assert!(suite.is_success());
        suite.failed_count = 1;
        assert!(!suite.is_success());
    }

    #[test]
    fn feature_result_counts_by_status() {
        let scenario = bare_scenario();
        let passed = ScenarioResult {
            scenario: scenario.clone(),
            step_results: Vec::new(),
            status: Status::Passed,
            start: Duration::ZERO,
            end: Duration::ZERO,
            error: None,
            embeds: Vec::new(),
        };
        let failed = ScenarioResult { status: Status::Failed, ..passed.clone() };
        let feature_result = FeatureResult {
            feature: scenario.feature.clone(),
            scenario_results: vec![passed, failed],
            status: Status::Failed,
        };
        assert_eq!(feature_result.passed_count(), 1);
        assert_eq!(feature_result.failed_count(), 1);
    }
}
