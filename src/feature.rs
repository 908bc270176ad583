// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The parsed representation of one feature file.

use std::sync::Arc;

use crate::{scenario::Background, source::Source, outline::ScenarioOutline, scenario::Scenario, tag::Tag};

/// A scenario, or a scenario outline template, indexed by its position
/// within the feature (spec.md §3 "FeatureSection").
#[derive(Debug, Clone)]
pub enum FeatureSection {
    Scenario(Scenario),
    Outline(ScenarioOutline),
}

impl FeatureSection {
    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        match self {
            Self::Scenario(s) => &s.tags,
            Self::Outline(o) => &o.tags,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Scenario(s) => &s.name,
            Self::Outline(o) => &o.name,
        }
    }

    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::Scenario(s) => s.line,
            Self::Outline(o) => o.line,
        }
    }
}

/// A parsed feature: a header, optional tags/background, and one or more
/// sections. Immutable after the Parser builds it; lives for the whole
/// suite (spec.md §3 "Lifecycle").
#[derive(Debug, Clone)]
pub struct Feature {
    pub source: Arc<Source>,
    pub line: usize,
    pub tags: Vec<Tag>,
    pub name: String,
    pub description: String,
    pub background: Option<Background>,
    /// Scenario/outline templates. Note these are *not* the runtime
    /// [`Scenario`] clones handed to the Scheduler — those are produced
    /// fresh per-run by the Feature Runtime from these templates, each
    /// holding an `Arc<Feature>` back-pointer to here (spec.md §9: indices
    /// avoid an ownership cycle; this crate uses a shared immutable `Arc`
    /// instead, since `Feature` never stores a reference back to a runtime
    /// scenario, so no cycle is formed).
    pub sections: Vec<FeatureSection>,
}

impl Feature {
    #[must_use]
    pub fn section(&self, index: usize) -> Option<&FeatureSection> {
        self.sections.get(index)
    }

    /// `true` if this feature's own scenarios must run one at a time
    /// (spec.md §4.H `parallel_ok`: "...or the feature is marked
    /// non-parallel"), via an `@parallel=false` tag. Consulted by the
    /// Scheduler to serialize a feature's own scenario tasks without
    /// blocking any other feature's.
    #[must_use]
    pub fn forces_serial_scenarios(&self) -> bool {
        self.tags.iter().any(|t| t.is("parallel") && t.first_value() == Some("false"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_lookup_by_index() {
        let feature = Feature {
            source: Arc::new(Source::new("a.feature", "")),
            line: 1,
            tags: Vec::new(),
            name: "f".into(),
            description: String::new(),
            background: None,
            sections: vec![FeatureSection::Outline(ScenarioOutline {
                line: 2,
                tags: Vec::new(),
                name: "o".into(),
                description: String::new(),
                steps: Vec::new(),
                examples: Vec::new(),
                dynamic_expression: None,
            })],
        };
        assert_eq!(feature.section(0).unwrap().name(), "o");
        assert!(feature.section(1).is_none());
    }
}
