// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Re-tokenizes a step's RHS text (already carved out by
//! [`crate::lexer::Lexer`] as a single `G_EXPR` span) into expression
//! tokens, per spec.md §4.A "hands the right-hand side of steps to an
//! embedded expression grammar".

use std::sync::Arc;

use crate::{
    error::EvalError,
    source::Source,
    token::{Token, TokenKind},
};

/// Tokenizes `text` as a free-standing expression. `line`/`col` are the
/// position of `text`'s first character within `source`, so token
/// positions in error messages point at the original feature file.
pub fn tokenize(source: Arc<Source>, text: &str, line: usize, col: usize) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;
    let mut cur_line = line;
    let mut cur_col = col;

    let advance = |i: &mut usize, cur_line: &mut usize, cur_col: &mut usize, ch: char| {
        *i += 1;
        if ch == '\n' {
            *cur_line += 1;
            *cur_col = 1;
        } else {
            *cur_col += 1;
        }
    };

    while i < chars.len() {
        let ch = chars[i];
        if ch.is_whitespace() {
            advance(&mut i, &mut cur_line, &mut cur_col, ch);
            continue;
        }
        let (start_line, start_col, start) = (cur_line, cur_col, i);

        if ch.is_ascii_digit() || (ch == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let mut j = i;
            let mut seen_dot = false;
            while j < chars.len() && (chars[j].is_ascii_digit() || (chars[j] == '.' && !seen_dot)) {
                if chars[j] == '.' {
                    seen_dot = true;
                }
                j += 1;
            }
            let text: String = chars[i..j].iter().collect();
            while i < j {
                advance(&mut i, &mut cur_line, &mut cur_col, chars[i]);
            }
            tokens.push(Token::new(source.clone(), TokenKind::Number, start, start_line, start_col, text));
            continue;
        }

        if ch == '"' || ch == '\'' {
            let quote = ch;
            advance(&mut i, &mut cur_line, &mut cur_col, ch);
            let mut value = String::new();
            loop {
                let Some(&c) = chars.get(i) else {
                    return Err(EvalError::new(
                        crate::error::Span::new(start, i),
                        "unterminated string literal",
                    ));
                };
                if c == quote {
                    advance(&mut i, &mut cur_line, &mut cur_col, c);
                    break;
                }
                if c == '\\' {
                    advance(&mut i, &mut cur_line, &mut cur_col, c);
                    if let Some(&esc) = chars.get(i) {
                        value.push(match esc {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                        advance(&mut i, &mut cur_line, &mut cur_col, esc);
                    }
                    continue;
                }
                value.push(c);
                advance(&mut i, &mut cur_line, &mut cur_col, c);
            }
            tokens.push(Token::new(source.clone(), TokenKind::Str, start, start_line, start_col, value));
            continue;
        }

        if ch == '_' || ch == '$' || ch.is_alphabetic() {
            let mut j = i;
            while j < chars.len() && (chars[j] == '_' || chars[j] == '$' || chars[j].is_alphanumeric()) {
                j += 1;
            }
            let text: String = chars[i..j].iter().collect();
            while i < j {
                advance(&mut i, &mut cur_line, &mut cur_col, chars[i]);
            }
            tokens.push(Token::new(source.clone(), TokenKind::Ident, start, start_line, start_col, text));
            continue;
        }

        // Operators, longest-match first.
        const OPERATORS: &[&str] =
            &["===", "!==", "==", "!=", "<=", ">=", "&&", "||", "?.", "=>", "+", "-", "*", "/", "%", "<", ">", "!", "="];
        let rest: String = chars[i..].iter().collect();
        if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(*op)) {
            for _ in 0..op.chars().count() {
                advance(&mut i, &mut cur_line, &mut cur_col, chars[i]);
            }
            tokens.push(Token::new(source.clone(), TokenKind::Op, start, start_line, start_col, *op));
            continue;
        }

        // Punctuation: single character.
        advance(&mut i, &mut cur_line, &mut cur_col, ch);
        tokens.push(Token::new(source.clone(), TokenKind::Punct, start, start_line, start_col, ch.to_string()));
    }

    tokens.push(Token::new(source, TokenKind::Eof, chars.len(), cur_line, cur_col, ""));
    Ok(tokens)
}
