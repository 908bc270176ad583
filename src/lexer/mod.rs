// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The Gherkin framing lexer (spec.md §4.A): a single-pass, stateful
//! tokenizer producing a lazy, restartable sequence of [`Token`]s ending
//! with `Eof`.

pub mod mode;

use std::sync::Arc;

use crate::{
    error::LexerError,
    source::Source,
    token::{Token, TokenKind},
};

use mode::Mode;

/// Tokenizes an entire [`Source`] eagerly into a `Vec<Token>`. "Lazy" in
/// spec.md §4.A's sense is satisfied by the [`Parser`](crate::parser::Parser)
/// consuming this vector through a cursor rather than re-running the
/// lexer; the lexer itself has no reason to stream one token at a time
/// once the whole file is already in memory.
pub struct Lexer {
    source: Arc<Source>,
}

impl Lexer {
    #[must_use]
    pub fn new(source: Arc<Source>) -> Self {
        Self { source }
    }

    pub fn tokenize(&self) -> Result<Vec<Token>, LexerError> {
        let text = self.source.text().to_string();
        let mut tokens = Vec::new();
        let mut mode = Mode::Gherkin;
        let mut lines = LineCursor::new(&text);

        while let Some(line) = lines.peek() {
            match mode {
                Mode::Gherkin => self.lex_gherkin_line(&mut lines, &mut tokens, &mut mode)?,
                Mode::Desc => self.lex_desc_line(&mut lines, &mut tokens, &mut mode),
                Mode::DocString => self.lex_doc_string(&mut lines, &mut tokens, &mut mode)?,
                Mode::Step | Mode::StepMatch | Mode::Rhs | Mode::Tags | Mode::TableRow | Mode::Comment => {
                    // These are entered and exited within lex_gherkin_line's
                    // per-line handling; reaching them here means a blank
                    // continuation line — fall back to Gherkin.
                    let _ = line;
                    mode = Mode::Gherkin;
                }
            }
        }

        tokens.push(Token::new(self.source.clone(), TokenKind::Eof, text.len(), lines.line_no(), 1, ""));
        Ok(tokens)
    }

    fn lex_gherkin_line(&self, lines: &mut LineCursor<'_>, tokens: &mut Vec<Token>, mode: &mut Mode) -> Result<(), LexerError> {
        let (line_no, start, raw) = lines.next().unwrap();
        let trimmed = raw.trim_start();
        let col = raw.len() - trimmed.len() + 1;
        let byte_col_start = start + (raw.len() - trimmed.len());

        if trimmed.is_empty() {
            return Ok(());
        }

        if let Some(rest) = trimmed.strip_prefix('#') {
            tokens.push(Token::new(self.source.clone(), TokenKind::GComment, byte_col_start, line_no, col, rest.trim()));
            return Ok(());
        }

        if trimmed.starts_with('@') {
            for tag in trimmed.split_whitespace() {
                tokens.push(Token::new(self.source.clone(), TokenKind::GTag, byte_col_start, line_no, col, tag));
            }
            return Ok(());
        }

        if trimmed.starts_with('|') {
            self.lex_table_row(line_no, byte_col_start, trimmed, tokens);
            return Ok(());
        }

        if trimmed.starts_with("\"\"\"") {
            tokens.push(Token::new(self.source.clone(), TokenKind::GTripleQuote, byte_col_start, line_no, col, "\"\"\""));
            *mode = Mode::DocString;
            return Ok(());
        }

        if let Some((kind, keyword_len)) = header_keyword(trimmed) {
            if trimmed.as_bytes().get(keyword_len) != Some(&b':') {
                return Err(LexerError::new(line_no, col, format!("expected ':' after '{}'", &trimmed[..keyword_len])));
            }
            tokens.push(Token::new(self.source.clone(), kind, byte_col_start, line_no, col, &trimmed[..keyword_len]));
            let desc_rest = trimmed[keyword_len + 1..].trim();
            if !desc_rest.is_empty() {
                tokens.push(Token::new(self.source.clone(), TokenKind::GDesc, byte_col_start, line_no, col, desc_rest));
            }

            // `Examples:` is the one header whose body is either a literal
            // table or a single dynamic-expression line (spec.md §3 "a
            // scenario is dynamic iff..."), never free-form prose, so its
            // look-ahead is resolved here rather than through `Mode::Desc`:
            // a non-blank, non-`|` line right after `Examples:` is the
            // runtime expression, tokenized directly as `G_EXPR`.
            if kind == TokenKind::GExamples {
                loop {
                    let Some((_, _, raw)) = lines.peek_parts() else {
                        *mode = Mode::Gherkin;
                        return Ok(());
                    };
                    let candidate = raw.trim();
                    if candidate.is_empty() {
                        lines.next();
                        continue;
                    }
                    if candidate.starts_with('|') {
                        *mode = Mode::Gherkin;
                        return Ok(());
                    }
                    let (expr_line, expr_start, expr_raw) = lines.next().unwrap();
                    let expr_col = expr_raw.len() - expr_raw.trim_start().len() + 1;
                    tokens.push(Token::new(self.source.clone(), TokenKind::GExpr, expr_start, expr_line, expr_col, candidate));
                    *mode = Mode::Gherkin;
                    return Ok(());
                }
            }

            *mode = Mode::Desc;
            return Ok(());
        }

        if let Some((prefix_text, rest)) = step_prefix(trimmed) {
            tokens.push(Token::new(self.source.clone(), TokenKind::GPrefix, byte_col_start, line_no, col, prefix_text));
            self.lex_step_rest(line_no, byte_col_start + prefix_text.len(), rest.trim_start(), tokens)?;
            return Ok(());
        }

        // An unrecognised non-blank line in GHERKIN mode is either a
        // continuation of a free-text description (common after a Feature:
        // header with no colon-adjacent summary) or a genuine error. Since
        // descriptions are only expected right after a header (handled via
        // Mode::Desc), treat this as the lexer error spec.md §4.A specifies.
        Err(LexerError::unexpected_char(line_no, col, trimmed.chars().next().unwrap_or(' ')))
    }

    fn lex_desc_line(&self, lines: &mut LineCursor<'_>, tokens: &mut Vec<Token>, mode: &mut Mode) {
        let Some((_, _, raw)) = lines.peek_parts() else {
            *mode = Mode::Gherkin;
            return;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() || looks_like_gherkin_token(trimmed) {
            *mode = Mode::Gherkin;
            return;
        }
        let (line_no, start, raw) = lines.next().unwrap();
        let col = raw.len() - raw.trim_start().len() + 1;
        tokens.push(Token::new(self.source.clone(), TokenKind::GDesc, start, line_no, col, trimmed));
    }

    fn lex_doc_string(&self, lines: &mut LineCursor<'_>, tokens: &mut Vec<Token>, mode: &mut Mode) -> Result<(), LexerError> {
        let mut body_lines = Vec::new();
        loop {
            let Some((line_no, start, raw)) = lines.next() else {
                let (line_no, col) = self.source.line_col_at(start_of_last(&body_lines));
                return Err(LexerError::unterminated_doc_string(line_no, col));
            };
            if raw.trim() == "\"\"\"" {
                let content = body_lines.iter().map(|(_, _, s): &(usize, usize, &str)| *s).collect::<Vec<_>>().join("\n");
                if let Some((l0, s0, _)) = body_lines.first() {
                    tokens.push(Token::new(self.source.clone(), TokenKind::GExpr, *s0, *l0, 1, content));
                } else {
                    tokens.push(Token::new(self.source.clone(), TokenKind::GExpr, start, line_no, 1, String::new()));
                }
                tokens.push(Token::new(self.source.clone(), TokenKind::GTripleQuote, start, line_no, 1, "\"\"\""));
                *mode = Mode::Gherkin;
                return Ok(());
            }
            body_lines.push((line_no, start, raw));
        }
    }

    fn lex_table_row(&self, line_no: usize, start: usize, trimmed: &str, tokens: &mut Vec<Token>) {
        let inner = trimmed.trim_start_matches('|').trim_end_matches('|');
        tokens.push(Token::new(self.source.clone(), TokenKind::GPipe, start, line_no, 1, "|"));
        for cell in inner.split('|') {
            tokens.push(Token::new(self.source.clone(), TokenKind::GTableCell, start, line_no, 1, cell.trim()));
        }
    }

    fn lex_step_rest(&self, line_no: usize, start: usize, rest: &str, tokens: &mut Vec<Token>) -> Result<(), LexerError> {
        if rest.starts_with('[') || rest.starts_with('(') {
            // Keyword-vs-expression ambiguity (spec.md §4.A "rewind"): the
            // whole rest-of-line is an expression, there is no keyword.
            tokens.push(Token::new(self.source.clone(), TokenKind::GKeyword, start, line_no, 1, ""));
            tokens.push(Token::new(self.source.clone(), TokenKind::GExpr, start, line_no, 1, rest));
            return Ok(());
        }

        let (keyword, tail) = split_step_keyword(rest);
        tokens.push(Token::new(self.source.clone(), TokenKind::GKeyword, start, line_no, 1, keyword));

        let tail = tail.trim_start();
        let tail = tail.strip_prefix('=').map(str::trim_start).unwrap_or(tail);
        if !tail.is_empty() {
            tokens.push(Token::new(self.source.clone(), TokenKind::GExpr, start, line_no, 1, tail));
        }
        Ok(())
    }
}

fn start_of_last(lines: &[(usize, usize, &str)]) -> usize {
    lines.last().map(|(_, s, _)| *s).unwrap_or(0)
}

fn header_keyword(trimmed: &str) -> Option<(TokenKind, usize)> {
    const HEADERS: &[(&str, TokenKind)] = &[
        ("Scenario Outline", TokenKind::GScenarioOutline),
        ("Scenario Template", TokenKind::GScenarioOutline),
        ("Feature", TokenKind::GFeature),
        ("Background", TokenKind::GBackground),
        ("Scenario", TokenKind::GScenario),
        ("Examples", TokenKind::GExamples),
        ("Scenarios", TokenKind::GExamples),
    ];
    HEADERS.iter().find(|(name, _)| trimmed.starts_with(name)).map(|(name, kind)| (*kind, name.len()))
}

fn step_prefix(trimmed: &str) -> Option<(&'static str, &str)> {
    const PREFIXES: &[&str] = &["Given", "When", "Then", "And", "But"];
    for prefix in PREFIXES {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            if rest.starts_with(char::is_whitespace) {
                return Some((prefix, rest));
            }
        }
    }
    if let Some(rest) = trimmed.strip_prefix('*') {
        return Some(("*", rest));
    }
    None
}

/// Splits the RHS text into a leading keyword word (possibly a known
/// multi-word keyword) and the remainder.
fn split_step_keyword(rest: &str) -> (&str, &str) {
    const SPACED_KEYWORDS: &[&str] = &[
        "form fields",
        "form field",
        "multipart fields",
        "multipart field",
        "multipart files",
        "multipart file",
        "multipart entity",
        "soap action",
        "retry until",
        "call once",
    ];
    for kw in SPACED_KEYWORDS {
        if let Some(tail) = rest.strip_prefix(kw) {
            return (kw, tail);
        }
    }
    match rest.find(char::is_whitespace) {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    }
}

fn looks_like_gherkin_token(trimmed: &str) -> bool {
    trimmed.starts_with('@')
        || trimmed.starts_with('|')
        || trimmed.starts_with('#')
        || trimmed.starts_with("\"\"\"")
        || header_keyword(trimmed).is_some()
        || step_prefix(trimmed).is_some()
}

/// A peekable cursor over `(line_number, byte_offset, line_text)` triples,
/// splitting on both `\n` and `\r\n` (spec.md §6 "UTF-8; LF or CRLF").
struct LineCursor<'a> {
    text: &'a str,
    offset: usize,
    line_no: usize,
}

impl<'a> LineCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, offset: 0, line_no: 1 }
    }

    fn peek(&self) -> Option<&'a str> {
        self.peek_parts().map(|(_, _, s)| s)
    }

    fn peek_parts(&self) -> Option<(usize, usize, &'a str)> {
        if self.offset >= self.text.len() {
            return None;
        }
        let rest = &self.text[self.offset..];
        let end = rest.find('\n').map(|i| self.offset + i).unwrap_or(self.text.len());
        let raw = self.text[self.offset..end].strip_suffix('\r').unwrap_or(&self.text[self.offset..end]);
        Some((self.line_no, self.offset, raw))
    }

    fn next(&mut self) -> Option<(usize, usize, &'a str)> {
        let parts = self.peek_parts()?;
        self.offset = match self.text[self.offset..].find('\n') {
            Some(i) => self.offset + i + 1,
            None => self.text.len(),
        };
        self.line_no += 1;
        Some(parts)
    }

    fn line_no(&self) -> usize {
        self.line_no
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(text: &str) -> Vec<Token> {
        let source = Arc::new(Source::new("t.feature", text));
        Lexer::new(source).tokenize().expect("lex ok")
    }

    #[test]
    fn tokenizes_minimal_feature() {
        let tokens = lex("Feature: F\nScenario: hello\n* def a = 1\n* match a == 1\n");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds.first(), Some(&TokenKind::GFeature));
        assert!(kinds.contains(&TokenKind::GScenario));
        assert!(kinds.contains(&TokenKind::GPrefix));
        assert!(kinds.contains(&TokenKind::GKeyword));
        assert_eq!(kinds.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn tags_become_individual_tokens() {
        let tokens = lex("@smoke @slow\nFeature: F\n");
        let tags: Vec<_> = tokens.iter().filter(|t| t.kind == TokenKind::GTag).map(|t| t.text.as_str()).collect();
        assert_eq!(tags, vec!["@smoke", "@slow"]);
    }

    #[test]
    fn table_rows_split_into_cells() {
        let tokens = lex("Feature: F\nScenario Outline: o\n* match n == <n>\nExamples:\n| n |\n| 1 |\n");
        let cells: Vec<_> = tokens.iter().filter(|t| t.kind == TokenKind::GTableCell).map(|t| t.text.as_str()).collect();
        assert_eq!(cells, vec!["n", "1"]);
    }

    #[test]
    fn unterminated_doc_string_is_an_error() {
        let source = Arc::new(Source::new("t.feature", "Feature: F\nScenario: s\n* def a =\n\"\"\"\nunterminated\n"));
        let result = Lexer::new(source).tokenize();
        assert!(result.is_err());
    }
}
