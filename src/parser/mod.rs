// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Assembles a [`Feature`] from the lexer's token stream (spec.md §4.B).

use std::sync::Arc;

use crate::{
    docstring::DocString,
    error::{ParseError, ParseErrorKind},
    feature::{Feature, FeatureSection},
    lexer::Lexer,
    outline::{ExamplesTable, ScenarioOutline},
    scenario::{Background, Scenario},
    source::Source,
    step::{Step, StepKeyword, StepPrefix},
    table::Table,
    tag::Tag,
    token::{Token, TokenKind},
};

/// Loads `source` into a [`Feature`]. Never fails: a lexer or parser error
/// is converted into a single-scenario feature whose scenario is already
/// `FAILED` with a `parse_or_setup_error` message, per spec.md §4.B "Parse
/// errors do not abort the suite" and §9's open-question resolution for
/// the analogous dynamic-outline error path.
#[must_use]
pub fn load(source: Arc<Source>) -> Feature {
    match try_load(source.clone()) {
        Ok(feature) => feature,
        Err(err) => synthetic_error_feature(source, &err.to_string()),
    }
}

fn try_load(source: Arc<Source>) -> Result<Feature, ParseError> {
    let tokens = Lexer::new(source.clone())
        .tokenize()
        .map_err(|e| ParseError::new(e.line, e.col, ParseErrorKind::UnexpectedToken, e.message))?;
    Parser::new(source, tokens).parse_feature()
}

fn synthetic_error_feature(source: Arc<Source>, message: &str) -> Feature {
    let step = Step::new(0, 1, StepPrefix::Star, StepKeyword::Assert, "false");
    let scenario_name = format!("parse_or_setup_error: {message}");
    Feature {
        source: source.clone(),
        line: 1,
        tags: Vec::new(),
        name: source.file_name_without_extension(),
        description: String::new(),
        background: None,
        sections: vec![FeatureSection::Scenario(Scenario {
            feature: Arc::new(Feature {
                source,
                line: 1,
                tags: Vec::new(),
                name: scenario_name.clone(),
                description: String::new(),
                background: None,
                sections: Vec::new(),
            }),
            section_index: 0,
            example_index: -1,
            line: 1,
            tags: Vec::new(),
            name: scenario_name,
            description: String::new(),
            steps: vec![step],
            dynamic_expression: None,
            example_data: None,
        })],
    }
}

struct Parser {
    source: Arc<Source>,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(source: Arc<Source>, tokens: Vec<Token>) -> Self {
        Self { source, tokens, pos: 0 }
    }

    fn parse_feature(mut self) -> Result<Feature, ParseError> {
        let tags = self.consume_tags();
        let header = self.expect_kind(TokenKind::GFeature)?;
        let description = self.consume_descriptions();

        let mut background = None;
        let mut sections = Vec::new();

        loop {
            let pending_tags = self.consume_tags();
            if self.at_eof() {
                break;
            }
            match self.peek().kind {
                TokenKind::GBackground => {
                    self.pos += 1;
                    self.consume_descriptions();
                    background = Some(Background { steps: self.parse_steps()? });
                }
                TokenKind::GScenarioOutline => {
                    sections.push(FeatureSection::Outline(self.parse_outline(pending_tags)?));
                }
                TokenKind::GScenario => {
                    sections.push(FeatureSection::Scenario(self.parse_scenario_section(pending_tags)?));
                }
                other => {
                    return Err(ParseError::new(
                        header.line,
                        header.col,
                        ParseErrorKind::UnexpectedToken,
                        format!("unexpected token {other:?} at feature level"),
                    ));
                }
            }
        }

        if sections.is_empty() && background.is_none() {
            return Err(ParseError::new(header.line, header.col, ParseErrorKind::EmptyFeature, "feature has no sections"));
        }

        Ok(Feature {
            source: self.source.clone(),
            line: header.line,
            tags,
            name: header.text.clone(),
            description,
            background,
            sections,
        })
    }

    fn parse_scenario_section(&mut self, tags: Vec<Tag>) -> Result<Scenario, ParseError> {
        let header = self.expect_kind(TokenKind::GScenario)?;
        let name = self.take_header_name(&header);
        let description = self.consume_descriptions();
        let steps = self.parse_steps()?;
        Ok(Scenario {
            feature: placeholder_feature(&self.source),
            section_index: 0,
            example_index: -1,
            line: header.line,
            tags,
            name,
            description,
            steps,
            dynamic_expression: None,
            example_data: None,
        })
    }

    fn parse_outline(&mut self, tags: Vec<Tag>) -> Result<ScenarioOutline, ParseError> {
        let header = self.expect_kind(TokenKind::GScenarioOutline)?;
        let name = self.take_header_name(&header);
        let description = self.consume_descriptions();
        let steps = self.parse_steps()?;

        let mut examples = Vec::new();
        let mut dynamic_expression = None;
        loop {
            let example_tags = self.consume_tags();
            if self.peek().kind != TokenKind::GExamples {
                if !example_tags.is_empty() {
                    return Err(self.error_here(ParseErrorKind::UnexpectedToken, "tags with no following Examples:"));
                }
                break;
            }
            self.pos += 1;
            let examples_desc = self.consume_descriptions();
            if self.peek().kind == TokenKind::GExpr {
                dynamic_expression = Some(self.peek().text.clone());
                self.pos += 1;
                continue;
            }
            let table = self.parse_table()?;
            examples.push(ExamplesTable { tags: example_tags, name: None, description: Some(examples_desc), table });
        }

        if examples.is_empty() && dynamic_expression.is_none() {
            return Err(self.error_here(ParseErrorKind::UnexpectedToken, "Scenario Outline requires at least one Examples: table or a dynamic expression"));
        }

        Ok(ScenarioOutline { line: header.line, tags, name, description, steps, examples, dynamic_expression })
    }

    fn parse_steps(&mut self) -> Result<Vec<Step>, ParseError> {
        let mut steps = Vec::new();
        let mut index = 0;
        while self.peek().kind == TokenKind::GPrefix {
            let prefix_token = self.tokens[self.pos].clone();
            self.pos += 1;
            let prefix = parse_prefix(&prefix_token.text);
            let keyword_token = self.expect_kind(TokenKind::GKeyword)?;
            let keyword = StepKeyword::classify(&keyword_token.text);
            let text = if self.peek().kind == TokenKind::GExpr && !self.followed_by_doc_open() {
                let t = self.peek().text.clone();
                self.pos += 1;
                t
            } else {
                String::new()
            };

            let mut doc_string = None;
            let mut table = None;
            if self.peek().kind == TokenKind::GTripleQuote {
                self.pos += 1;
                if self.peek().kind == TokenKind::GExpr {
                    doc_string = Some(DocString { content: self.peek().text.clone() });
                    self.pos += 1;
                }
                if self.peek().kind == TokenKind::GTripleQuote {
                    self.pos += 1;
                }
            } else if self.peek().kind == TokenKind::GPipe {
                table = Some(self.parse_table()?);
            }

            let mut step = Step::new(index, prefix_token.line, prefix, keyword, text);
            step.doc_string = doc_string;
            step.table = table;
            steps.push(step);
            index += 1;
        }
        Ok(steps)
    }

    fn followed_by_doc_open(&self) -> bool {
        false
    }

    fn parse_table(&mut self) -> Result<Table, ParseError> {
        let mut rows = Vec::new();
        while self.peek().kind == TokenKind::GPipe {
            self.pos += 1;
            let mut row = Vec::new();
            while self.peek().kind == TokenKind::GTableCell {
                row.push(self.peek().text.clone());
                self.pos += 1;
            }
            if row.is_empty() {
                return Err(self.error_here(ParseErrorKind::MalformedTable, "empty table row"));
            }
            rows.push(row);
        }
        if rows.is_empty() {
            return Err(self.error_here(ParseErrorKind::MalformedTable, "expected at least one table row"));
        }
        let width = rows[0].len();
        if rows.iter().any(|r| r.len() != width) {
            return Err(self.error_here(ParseErrorKind::MalformedTable, "table rows have inconsistent width"));
        }
        Ok(Table::new(rows))
    }

    fn consume_tags(&mut self) -> Vec<Tag> {
        let mut tags = Vec::new();
        while self.peek().kind == TokenKind::GTag {
            tags.push(Tag::parse(self.peek().line, &self.peek().text));
            self.pos += 1;
        }
        tags
    }

    fn consume_descriptions(&mut self) -> String {
        let mut lines = Vec::new();
        while self.peek().kind == TokenKind::GDesc {
            lines.push(self.peek().text.clone());
            self.pos += 1;
        }
        lines.join("\n")
    }

    fn take_header_name(&mut self, header: &Token) -> String {
        let _ = header;
        if self.peek().kind == TokenKind::GDesc {
            let name = self.peek().text.clone();
            self.pos += 1;
            name
        } else {
            String::new()
        }
    }

    fn expect_kind(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.peek().kind != kind {
            return Err(self.error_here(ParseErrorKind::UnexpectedToken, format!("expected {kind:?}, found {:?}", self.peek().kind)));
        }
        let token = self.tokens[self.pos].clone();
        self.pos += 1;
        Ok(token)
    }

    fn error_here(&self, kind: ParseErrorKind, message: impl Into<String>) -> ParseError {
        let t = self.peek();
        ParseError::new(t.line, t.col, kind, message)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }
}

/// `Feature`'s own `Scenario` entries are filled in with a placeholder
/// back-reference during parsing, then corrected once the real `Feature`
/// is wrapped in an `Arc` (spec.md §9's index-avoidance adapted to an
/// `Arc` back-pointer — see [`Feature`] doc comment). The Feature Runtime
/// (not this module) is responsible for rebuilding each `Scenario` with
/// the final `Arc<Feature>` before scheduling it.
fn placeholder_feature(source: &Arc<Source>) -> Arc<Feature> {
    Arc::new(Feature {
        source: source.clone(),
        line: 0,
        tags: Vec::new(),
        name: String::new(),
        description: String::new(),
        background: None,
        sections: Vec::new(),
    })
}

fn parse_prefix(text: &str) -> StepPrefix {
    match text {
        "Given" => StepPrefix::Given,
        "When" => StepPrefix::When,
        "Then" => StepPrefix::Then,
        "And" => StepPrefix::And,
        "But" => StepPrefix::But,
        _ => StepPrefix::Star,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_s1_basic_feature() {
        let source = Arc::new(Source::new("t.feature", "Feature: F\nScenario: hello\n* def a = 1\n* match a == 1\n"));
        let feature = load(source);
        assert_eq!(feature.sections.len(), 1);
        let FeatureSection::Scenario(scenario) = &feature.sections[0] else { panic!("expected scenario") };
        assert_eq!(scenario.name, "hello");
        assert_eq!(scenario.steps.len(), 2);
    }

    #[test]
    fn parses_outline_with_examples_table() {
        let source = Arc::new(Source::new(
            "t.feature",
            "Feature: F\nScenario Outline: o\n* match n == <n>\nExamples:\n| n |\n| 1 |\n| 2 |\n| 3 |\n",
        ));
        let feature = load(source);
        let FeatureSection::Outline(outline) = &feature.sections[0] else { panic!("expected outline") };
        assert_eq!(outline.literal_row_count(), 3);
    }

    #[test]
    fn invalid_feature_becomes_synthetic_failing_scenario() {
        let source = Arc::new(Source::new("t.feature", "not a feature at all\n"));
        let feature = load(source);
        let FeatureSection::Scenario(scenario) = &feature.sections[0] else { panic!("expected scenario") };
        assert!(scenario.name.starts_with("parse_or_setup_error"));
    }
}
