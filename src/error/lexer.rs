// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors raised while tokenizing a [`Source`](crate::source::Source).

use derive_more::{Display, Error};

/// A failure of the Gherkin/script lexer.
///
/// Raised when a triple-quoted doc-string is left unterminated, or an
/// unrecognised character is encountered while in `GHERKIN` mode.
#[derive(Debug, Clone, Display, Error, PartialEq, Eq)]
#[display("{line}:{col}: {message}")]
pub struct LexerError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl LexerError {
    #[must_use]
    pub fn new(line: usize, col: usize, message: impl Into<String>) -> Self {
        Self { line, col, message: message.into() }
    }

    #[must_use]
    pub fn unterminated_doc_string(line: usize, col: usize) -> Self {
        Self::new(line, col, "unterminated triple-quoted doc string")
    }

    #[must_use]
    pub fn unexpected_char(line: usize, col: usize, ch: char) -> Self {
        Self::new(line, col, format!("unexpected character '{ch}' in GHERKIN mode"))
    }
}

pub type LexerResult<T> = std::result::Result<T, LexerError>;
