// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors raised while assembling the [`Feature`](crate::feature::Feature) model.

use derive_more::{Display, Error};

/// The closed set of ways a feature file can fail to parse.
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[display("unexpected token")]
    UnexpectedToken,
    #[display("missing colon after header keyword")]
    MissingColon,
    #[display("unterminated doc string")]
    UnterminatedDocString,
    #[display("feature has no header")]
    EmptyFeature,
    #[display("malformed table")]
    MalformedTable,
}

/// A parse failure. Unlike most errors in this crate, a [`ParseError`] does
/// not abort the suite: the [`Parser`](crate::parser::Parser) converts it
/// into a synthetic failed [`Scenario`](crate::scenario::Scenario) so that
/// it surfaces exactly like any other scenario failure.
#[derive(Debug, Clone, Display, Error, PartialEq, Eq)]
#[display("{line}:{col}: {kind}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub col: usize,
    pub kind: ParseErrorKind,
    pub message: String,
}

impl ParseError {
    #[must_use]
    pub fn new(line: usize, col: usize, kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self { line, col, kind, message: message.into() }
    }
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;
