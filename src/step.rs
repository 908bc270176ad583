// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! One executable line of a scenario or background.

use crate::{docstring::DocString, table::Table};

/// The Gherkin step prefix a line started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPrefix {
    Given,
    When,
    Then,
    And,
    But,
    /// The `*` bullet, used by this dialect to de-emphasize step type.
    Star,
}

/// The closed set of step keywords the Step Dispatcher recognises
/// (spec.md §4.E). `Other` carries any keyword text the dispatcher doesn't
/// special-case, so a syntactically valid but unrecognised step still
/// parses — it simply fails at dispatch time rather than at parse time,
/// matching the "parse errors don't abort the suite" policy applied
/// consistently to keyword dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKeyword {
    Def,
    Eval,
    Print,
    Assert,
    Match,
    Configure,
    Url,
    Path,
    Method,
    Header,
    Param,
    Cookie,
    FormField,
    MultipartField,
    MultipartFile,
    MultipartEntity,
    SoapAction,
    Request,
    Status,
    RetryUntil,
    Call,
    CallOnce,
    Other(String),
}

impl StepKeyword {
    /// Classifies a keyword word (or space-joined multi-word keyword, e.g.
    /// `"form fields"`) into the closed set, per spec.md §4.A's list of
    /// allowed spaced keywords.
    #[must_use]
    pub fn classify(keyword: &str) -> Self {
        match keyword {
            "def" => Self::Def,
            "eval" => Self::Eval,
            "print" => Self::Print,
            "assert" => Self::Assert,
            "match" => Self::Match,
            "configure" => Self::Configure,
            "url" => Self::Url,
            "path" => Self::Path,
            "method" => Self::Method,
            "header" | "headers" => Self::Header,
            "param" | "params" => Self::Param,
            "cookie" | "cookies" => Self::Cookie,
            "form field" | "form fields" => Self::FormField,
            "multipart field" | "multipart fields" => Self::MultipartField,
            "multipart file" | "multipart files" => Self::MultipartFile,
            "multipart entity" => Self::MultipartEntity,
            "soap action" => Self::SoapAction,
            "request" => Self::Request,
            "status" => Self::Status,
            "retry until" => Self::RetryUntil,
            "call once" | "callonce" => Self::CallOnce,
            "call" => Self::Call,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One parsed `PREFIX keyword expression? (docstring | table)?` line.
#[derive(Debug, Clone)]
pub struct Step {
    /// Index within the owning scenario's/background's step list.
    pub index: usize,
    pub line: usize,
    pub end_line: usize,
    pub prefix: StepPrefix,
    pub keyword: StepKeyword,
    /// The raw RHS text: the expression (or sub-keyword argument) that
    /// follows the keyword, before embedded-expression evaluation.
    pub text: String,
    pub doc_string: Option<DocString>,
    pub table: Option<Table>,
    pub comments: Vec<String>,
}

impl Step {
    #[must_use]
    pub fn new(index: usize, line: usize, prefix: StepPrefix, keyword: StepKeyword, text: impl Into<String>) -> Self {
        Self {
            index,
            line,
            end_line: line,
            prefix,
            keyword,
            text: text.into(),
            doc_string: None,
            table: None,
            comments: Vec::new(),
        }
    }

    /// Returns the template-substituted step, used by outline expansion
    /// (spec.md §3 "FeatureSection"): `<token>` is replaced wherever it
    /// occurs in the step text, doc-string, and table cells.
    #[must_use]
    pub fn with_substitutions(&self, row: &linked_hash_map::LinkedHashMap<String, String>) -> Self {
        let mut out = self.clone();
        out.text = substitute(&self.text, row);
        out.doc_string = self.doc_string.as_ref().map(|d| DocString { content: substitute(&d.content, row) });
        out.table = self.table.as_ref().map(|t| {
            Table::new(t.raw().iter().map(|r| r.iter().map(|c| substitute(c, row)).collect()).collect())
        });
        out
    }
}

/// Replaces every `<key>` occurrence in `text` with `row[key]`.
#[must_use]
pub fn substitute(text: &str, row: &linked_hash_map::LinkedHashMap<String, String>) -> String {
    let mut out = text.to_string();
    for (key, value) in row {
        out = out.replace(&format!("<{key}>"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_recognises_spaced_keywords() {
        assert_eq!(StepKeyword::classify("form fields"), StepKeyword::FormField);
        assert_eq!(StepKeyword::classify("retry until"), StepKeyword::RetryUntil);
        assert_eq!(StepKeyword::classify("multipart file"), StepKeyword::MultipartFile);
    }

    #[test]
    fn classify_falls_back_to_other() {
        assert_eq!(StepKeyword::classify("frobnicate"), StepKeyword::Other("frobnicate".into()));
    }

    #[test]
    fn substitution_replaces_every_occurrence() {
        let mut row = linked_hash_map::LinkedHashMap::new();
        row.insert("n".to_string(), "5".to_string());
        let step = Step::new(0, 1, StepPrefix::Star, StepKeyword::Match, "n == <n>");
        let subbed = step.with_substitutions(&row);
        assert_eq!(subbed.text, "n == 5");
    }
}
