// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Ambient configuration feeding the [`crate::scheduler::Scheduler`]
//! (spec.md §4.H "Inputs"; SPEC_FULL.md §C).

use std::{collections::HashMap, time::Duration};

use smart_default::SmartDefault;

use crate::tag::TagExpr;

/// A plain, owned configuration value — never global mutable state
/// (spec.md §9 "Avoiding global mutable state"). Lives as a field of
/// [`crate::scheduler::SuiteContext`], passed by reference into runtimes.
#[derive(Debug, Clone, SmartDefault)]
pub struct RunConfig {
    #[default(4)]
    pub worker_count: usize,
    pub tag_expression: Option<String>,
    pub scenario_name_filter: Option<String>,
    /// Scenario-level deadline; disabled by default (spec.md §4.H
    /// "Cancellation & timeouts").
    pub scenario_deadline: Option<Duration>,
    pub properties: HashMap<String, String>,
    #[default("default".to_string())]
    pub env: String,
    /// Classpath-style path to a `karate-config`-equivalent feature that
    /// `karate.setup()` (no name given) calls through `callSingle`
    /// (spec.md §6). `karate.setup(name)` calls `name` directly instead.
    pub setup_path: Option<String>,
}

impl RunConfig {
    #[must_use]
    pub fn parsed_tag_expression(&self) -> Option<TagExpr> {
        self.tag_expression.as_deref().and_then(TagExpr::parse)
    }

    #[must_use]
    pub fn matches_name_filter(&self, scenario_name: &str) -> bool {
        match &self.scenario_name_filter {
            Some(filter) => scenario_name.contains(filter.as_str()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = RunConfig::default();
        assert_eq!(config.worker_count, 4);
        assert!(config.scenario_deadline.is_none());
        assert_eq!(config.env, "default");
    }

    #[test]
    fn name_filter_defaults_to_matching_everything() {
        let config = RunConfig::default();
        assert!(config.matches_name_filter("anything"));
    }
}
