// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Triple-quoted doc-string literals attached to steps.

/// A `"""`-delimited multiline literal, with the common leading indentation
/// of its lines stripped (verbatim otherwise, newlines preserved).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocString {
    pub content: String,
}

impl DocString {
    /// Builds a [`DocString`] from the raw lines between the opening and
    /// closing `"""`, stripping the indentation shared by every non-blank
    /// line.
    #[must_use]
    pub fn from_lines(lines: &[&str]) -> Self {
        let indent = lines
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.len() - l.trim_start().len())
            .min()
            .unwrap_or(0);
        let content = lines
            .iter()
            .map(|l| if l.len() >= indent { &l[indent..] } else { l.trim_start() })
            .collect::<Vec<_>>()
            .join("\n");
        Self { content }
    }
}

impl std::fmt::Display for DocString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_common_indent() {
        let doc = DocString::from_lines(&["  { \"a\": 1 }", "  [1,2]"]);
        assert_eq!(doc.content, "{ \"a\": 1 }\n[1,2]");
    }

    #[test]
    fn ignores_blank_lines_when_computing_indent() {
        let doc = DocString::from_lines(&["    line1", "", "    line2"]);
        assert_eq!(doc.content, "line1\n\nline2");
    }
}
