// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `Scenario Outline:` sections and their `Examples:` tables.
//!
//! Expansion into concrete [`Scenario`](crate::scenario::Scenario)s is
//! deferred to the Feature Runtime (spec.md §4.B, §4.G) so that dynamic
//! (runtime-computed) example sources can be supported uniformly with
//! literal ones.

use crate::{step::Step, table::Table, tag::Tag};

/// One `Examples:` table attached to a `Scenario Outline`.
#[derive(Debug, Clone)]
pub struct ExamplesTable {
    pub tags: Vec<Tag>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub table: Table,
}

/// A parameterised scenario template, expanded into one concrete scenario
/// per example row (or per element of a runtime-evaluated list, for a
/// dynamic outline).
#[derive(Debug, Clone)]
pub struct ScenarioOutline {
    pub line: usize,
    pub tags: Vec<Tag>,
    pub name: String,
    pub description: String,
    pub steps: Vec<Step>,
    pub examples: Vec<ExamplesTable>,
    /// Present iff this outline's examples come from a runtime expression
    /// rather than a literal table (spec.md §3 "dynamic" scenario).
    pub dynamic_expression: Option<String>,
}

impl ScenarioOutline {
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic_expression.is_some()
    }

    /// Total number of literal example rows across every `Examples:` table,
    /// in file order. Meaningless (0) for a dynamic outline.
    #[must_use]
    pub fn literal_row_count(&self) -> usize {
        self.examples.iter().map(|e| e.table.data_rows().len()).sum()
    }
}
