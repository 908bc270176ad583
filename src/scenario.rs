// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A single executable scenario, plus its background composition.

use std::sync::Arc;

use linked_hash_map::LinkedHashMap;

use crate::{feature::Feature, step::Step, tag::Tag};

/// Steps prepended to every scenario's steps in a feature (spec.md
/// GLOSSARY "Background").
#[derive(Debug, Clone, Default)]
pub struct Background {
    pub steps: Vec<Step>,
}

/// A scenario, either as written in the feature file (`example_index ==
/// -1`) or as one expanded clone of a `Scenario Outline` example row.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub feature: Arc<Feature>,
    /// Index of the owning `FeatureSection` within `feature.sections`.
    pub section_index: usize,
    /// `-1` for a scenario that is not an outline example; otherwise the
    /// 0-based index of the example row this clone was expanded from.
    pub example_index: i64,
    pub line: usize,
    pub tags: Vec<Tag>,
    pub name: String,
    pub description: String,
    pub steps: Vec<Step>,
    /// Set when this scenario's outline examples are computed at runtime
    /// rather than from a literal `Examples:` table (spec.md §3).
    pub dynamic_expression: Option<String>,
    /// The example row (if any) this scenario was expanded from.
    pub example_data: Option<LinkedHashMap<String, String>>,
}

impl Scenario {
    #[must_use]
    pub fn is_outline_example(&self) -> bool {
        self.example_index >= 0
    }

    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic_expression.is_some()
    }

    /// `package + "_" + (sectionIndex+1) + optional "_" + (exampleIndex+1)`.
    #[must_use]
    pub fn unique_id(&self) -> String {
        let package = self.feature.source.package_qualified_name();
        let mut id = format!("{package}_{}", self.section_index + 1);
        if self.example_index >= 0 {
            id.push_str(&format!("_{}", self.example_index + 1));
        }
        id
    }

    /// `feature.tags ∪ scenario.tags`, multiset union preserving order
    /// (spec.md §8 invariant 3).
    #[must_use]
    pub fn effective_tags(&self) -> Vec<Tag> {
        self.feature.tags.iter().cloned().chain(self.tags.iter().cloned()).collect()
    }

    #[must_use]
    pub fn has_tag(&self, name: &str) -> bool {
        self.effective_tags().iter().any(|t| t.is(name))
    }

    /// The scenario-scoped `@lock` value, if any: `Some("*")` for
    /// exclusive, `Some(key)` for a shared key, `None` if unlocked.
    #[must_use]
    pub fn lock_key(&self) -> Option<String> {
        self.effective_tags().iter().find(|t| t.is("lock")).map(|t| t.first_value().unwrap_or("*").to_string())
    }

    /// Background steps followed by the scenario's own steps, in execution
    /// order (spec.md §8 invariant 4).
    #[must_use]
    pub fn steps_including_background(&self) -> Vec<Step> {
        let mut all: Vec<Step> = self.feature.background.as_ref().map(|b| b.steps.clone()).unwrap_or_default();
        let offset = all.len();
        all.extend(self.steps.iter().cloned().enumerate().map(|(i, mut s)| {
            s.index = offset + i;
            s
        }));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{source::Source, step::StepPrefix, step::StepKeyword};

    fn bare_feature() -> Arc<Feature> {
        Arc::new(Feature {
            source: Arc::new(Source::new("demos/x.feature", "")),
            line: 1,
            tags: vec![Tag::parse(1, "@featuretag")],
            name: "x".into(),
            description: String::new(),
            background: Some(Background { steps: vec![Step::new(0, 2, StepPrefix::Star, StepKeyword::Def, "def a = 1")] }),
            sections: Vec::new(),
        })
    }

    #[test]
    fn unique_id_without_example() {
        let feature = bare_feature();
        let scenario = Scenario {
            feature,
            section_index: 0,
            example_index: -1,
            line: 3,
            tags: Vec::new(),
            name: "s".into(),
            description: String::new(),
            steps: Vec::new(),
            dynamic_expression: None,
            example_data: None,
        };
        assert_eq!(scenario.unique_id(), "demos.x_1");
    }

    #[test]
    fn unique_id_with_example_index() {
        let feature = bare_feature();
        let scenario = Scenario {
            feature,
            section_index: 1,
            example_index: 2,
            line: 3,
            tags: Vec::new(),
            name: "s".into(),
            description: String::new(),
            steps: Vec::new(),
            dynamic_expression: None,
            example_data: None,
        };
        assert_eq!(scenario.unique_id(), "demos.x_2_3");
    }

    #[test]
    fn effective_tags_prepends_feature_tags() {
        let feature = bare_feature();
        let scenario = Scenario {
            feature,
            section_index: 0,
            example_index: -1,
            line: 3,
            tags: vec![Tag::parse(3, "@own")],
            name: "s".into(),
            description: String::new(),
            steps: Vec::new(),
            dynamic_expression: None,
            example_data: None,
        };
        let names: Vec<_> = scenario.effective_tags().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["featuretag".to_string(), "own".to_string()]);
    }

    #[test]
    fn steps_including_background_prepends_background_steps() {
        let feature = bare_feature();
        let scenario = Scenario {
            feature,
            section_index: 0,
            example_index: -1,
            line: 3,
            tags: Vec::new(),
            name: "s".into(),
            description: String::new(),
            steps: vec![Step::new(0, 4, StepPrefix::Star, StepKeyword::Assert, "a == 1")],
            dynamic_expression: None,
            example_data: None,
        };
        let all = scenario.steps_including_background();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].keyword, StepKeyword::Def);
        assert_eq!(all[1].keyword, StepKeyword::Assert);
    }
}
