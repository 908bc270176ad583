// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Orchestrates a single feature: scope setup, section expansion into
//! concrete scenarios, and `callonce` memoisation (spec.md §4.G).

use std::sync::Arc;

use linked_hash_map::LinkedHashMap;

use crate::{
    expr::Evaluator,
    feature::{Feature, FeatureSection},
    outline::ScenarioOutline,
    result::{FeatureResult, ScenarioResult, Status},
    scenario::Scenario,
    scheduler::{call_single::MemoCache, SuiteContext},
    scope::Scope,
    step::{substitute, Step, StepKeyword, StepPrefix},
    value::Value,
};

/// Output of [`FeatureRuntime::prepare`]: everything the Scheduler needs
/// to run a feature's scenarios and later assemble its [`FeatureResult`].
pub struct PreparedFeature {
    pub feature: Arc<Feature>,
    pub feature_scope: Scope,
    pub scenarios: Vec<Scenario>,
    /// Fresh per feature — distinct from the suite-scoped `callSingle`
    /// cache (spec.md §4.G point 4).
    pub callonce_cache: Arc<MemoCache>,
}

pub struct FeatureRuntime<'a> {
    context: &'a SuiteContext,
}

impl<'a> FeatureRuntime<'a> {
    #[must_use]
    pub fn new(context: &'a SuiteContext) -> Self {
        Self { context }
    }

    /// Builds the feature scope, fixes up every scenario's `Arc<Feature>`
    /// back-pointer to the now-final `feature` (replacing the parser's
    /// placeholder), expands `Scenario Outline` sections into concrete
    /// scenarios, and applies the suite's scenario-name filter — a
    /// non-matching scenario is excluded from the run entirely rather
    /// than reported `Skipped` (that status is reserved for `@ignore`/tag
    /// mismatches, evaluated later by the Scenario Runtime).
    pub async fn prepare(&self, template: Feature, suite_scope: &Scope) -> PreparedFeature {
        let feature = Arc::new(template);
        let feature_scope = suite_scope.child();

        let mut scenarios = Vec::new();
        for (section_index, section) in feature.sections.iter().enumerate() {
            match section {
                FeatureSection::Scenario(s) => {
                    scenarios.push(Scenario { feature: feature.clone(), section_index, ..s.clone() });
                }
                FeatureSection::Outline(outline) => {
                    scenarios.extend(self.expand_outline(outline, section_index, &feature, &feature_scope).await);
                }
            }
        }

        let scenarios =
            scenarios.into_iter().filter(|s| self.context.config.matches_name_filter(&s.name)).collect();

        // Background `def`s intended as feature-scope state (those driven
        // through `callonce`) are populated lazily by the Step Dispatcher
        // the first time a scenario's background invokes `callonce`; the
        // scope is sealed now so that step only ever *reads* this tier,
        // never races another scenario writing to it (spec.md §9
        // "Background freezing").
        feature_scope.seal();

        PreparedFeature { feature, feature_scope, scenarios, callonce_cache: Arc::new(MemoCache::new()) }
    }

    async fn expand_outline(
        &self,
        outline: &ScenarioOutline,
        section_index: usize,
        feature: &Arc<Feature>,
        feature_scope: &Scope,
    ) -> Vec<Scenario> {
        if let Some(expr) = &outline.dynamic_expression {
            let evaluator = Evaluator::new(self.context.host_resolver.clone());
            match evaluator.eval(feature.source.clone(), expr, outline.line, 0, feature_scope).await {
                Ok(Value::List(items)) => {
                    let items = items.lock().unwrap().clone();
                    items
                        .into_iter()
                        .enumerate()
                        .map(|(i, item)| dynamic_outline_scenario(outline, feature.clone(), section_index, i as i64, &item))
                        .collect()
                }
                Ok(other) => {
                    vec![synthetic_outline_error_scenario(
                        outline,
                        feature.clone(),
                        section_index,
                        &format!("dynamic outline expression must evaluate to a list, got {}", other.type_name()),
                    )]
                }
                Err(e) => vec![synthetic_outline_error_scenario(outline, feature.clone(), section_index, &e.to_string())],
            }
        } else {
            let mut out = Vec::new();
            let mut index = 0i64;
            for table in &outline.examples {
                for row in table.table.rows_as_maps() {
                    out.push(literal_outline_scenario(outline, feature.clone(), section_index, index, row));
                    index += 1;
                }
            }
            out
        }
    }

    /// Aggregates a feature's scenario results into a [`FeatureResult`]
    /// (spec.md §4.G point 5).
    #[must_use]
    pub fn aggregate(feature: Arc<Feature>, scenario_results: Vec<ScenarioResult>) -> FeatureResult {
        let status = if scenario_results.iter().any(|r| r.status == Status::Failed) { Status::Failed } else { Status::Passed };
        FeatureResult { feature, scenario_results, status }
    }
}

fn literal_outline_scenario(
    outline: &ScenarioOutline,
    feature: Arc<Feature>,
    section_index: usize,
    example_index: i64,
    row: LinkedHashMap<String, String>,
) -> Scenario {
    let steps = outline.steps.iter().map(|s| s.with_substitutions(&row)).collect();
    Scenario {
        feature,
        section_index,
        example_index,
        line: outline.line,
        tags: outline.tags.clone(),
        name: substitute(&outline.name, &row),
        description: outline.description.clone(),
        steps,
        dynamic_expression: None,
        example_data: Some(row),
    }
}

/// Builds one scenario from a dynamic outline's evaluated list element.
/// Only a `Value::Map` element contributes `<token>` substitutions (its
/// entries rendered via [`Value::display_string`]); any other element
/// shape still produces a scenario — with no substitutions applied — so a
/// dynamic outline over scalars doesn't silently drop rows.
fn dynamic_outline_scenario(
    outline: &ScenarioOutline,
    feature: Arc<Feature>,
    section_index: usize,
    example_index: i64,
    item: &Value,
) -> Scenario {
    let row: LinkedHashMap<String, String> = match item {
        Value::Map(m) => m.lock().unwrap().iter().map(|(k, v)| (k.clone(), v.display_string())).collect(),
        _ => LinkedHashMap::new(),
    };
    let steps = outline.steps.iter().map(|s| s.with_substitutions(&row)).collect();
    Scenario {
        feature,
        section_index,
        example_index,
        line: outline.line,
        tags: outline.tags.clone(),
        name: substitute(&outline.name, &row),
        description: outline.description.clone(),
        steps,
        dynamic_expression: outline.dynamic_expression.clone(),
        example_data: Some(row),
    }
}

/// spec.md §9: a dynamic outline expression that throws reproduces the
/// source's synthetic error scenario, reported as `ScenarioResult.failed`
/// with a `parse_or_setup_error` kind (mirroring `parser::synthetic_error_feature`).
fn synthetic_outline_error_scenario(outline: &ScenarioOutline, feature: Arc<Feature>, section_index: usize, message: &str) -> Scenario {
    let step = Step::new(0, outline.line, StepPrefix::Star, StepKeyword::Assert, "false");
    Scenario {
        feature,
        section_index,
        example_index: -1,
        line: outline.line,
        tags: outline.tags.clone(),
        name: format!("parse_or_setup_error: {message}"),
        description: outline.description.clone(),
        steps: vec![step],
        dynamic_expression: outline.dynamic_expression.clone(),
        example_data: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RunConfig,
        expr::host::UnsupportedHostResolver,
        loader::test_support::StaticLoader,
        parser,
        request::RequestExecutor,
        source::Source,
    };
    use async_trait::async_trait;

    struct NullExecutor;

    #[async_trait]
    impl RequestExecutor for NullExecutor {
        fn stage_url(&mut self, _: &str) {}
        fn stage_path(&mut self, _: &str) {}
        fn stage_method(&mut self, _: &str) {}
        fn stage_header(&mut self, _: &str, _: &str) {}
        fn stage_param(&mut self, _: &str, _: &str) {}
        fn stage_cookie(&mut self, _: &str, _: &str) {}
        fn stage_form_field(&mut self, _: &str, _: &str) {}
        fn stage_multipart_field(&mut self, _: &str, _: Value) {}
        fn stage_body(&mut self, _: Value) {}
        fn reset(&mut self) {}
        async fn execute(&mut self) -> Result<crate::request::Response, crate::error::HttpError> {
            Ok(crate::request::Response::default())
        }
    }

    fn context() -> SuiteContext {
        SuiteContext {
            config: RunConfig::default(),
            host_resolver: Arc::new(UnsupportedHostResolver),
            request_factory: Arc::new(|| Box::new(NullExecutor) as Box<dyn RequestExecutor>),
            loader: Arc::new(StaticLoader::default()),
            listener: Arc::new(crate::listener::NoopListener),
            call_dispatcher: None,
        }
    }

    #[tokio::test]
    async fn outline_expands_one_scenario_per_example_row() {
        let source = Arc::new(Source::new(
            "t.feature",
            "Feature: F\nScenario Outline: o\n* match n == <n>\nExamples:\n| n |\n| 1 |\n| 2 |\n| 3 |\n",
        ));
        let feature = parser::load(source);
        let context = context();
        let runtime = FeatureRuntime::new(&context);
        let prepared = runtime.prepare(feature, &Scope::root()).await;
        assert_eq!(prepared.scenarios.len(), 3);
        assert_eq!(prepared.scenarios[1].example_index, 1);
        assert_eq!(prepared.scenarios[1].steps[0].text, "n == 2");
    }

    #[tokio::test]
    async fn name_filter_excludes_non_matching_scenarios() {
        let source = Arc::new(Source::new("t.feature", "Feature: F\nScenario: alpha\n* match 1 == 1\nScenario: beta\n* match 1 == 1\n"));
        let feature = parser::load(source);
        let mut context = context();
        context.config.scenario_name_filter = Some("alpha".to_string());
        let runtime = FeatureRuntime::new(&context);
        let prepared = runtime.prepare(feature, &Scope::root()).await;
        assert_eq!(prepared.scenarios.len(), 1);
        assert_eq!(prepared.scenarios[0].name, "alpha");
    }
}
