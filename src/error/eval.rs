// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors raised by the expression evaluator.

use derive_more::{Display, Error};

/// A source span, in byte offsets relative to the expression text that was
/// being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Failure to evaluate (or define, or call) an expression against a
/// [`Scope`](crate::scope::Scope).
#[derive(Debug, Clone, Display, Error, PartialEq, Eq)]
#[display("{message} (at {}..{})", span.start, span.end)]
pub struct EvalError {
    pub span: Span,
    pub message: String,
}

impl EvalError {
    #[must_use]
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self { span, message: message.into() }
    }

    #[must_use]
    pub fn at(message: impl Into<String>) -> Self {
        Self { span: Span::default(), message: message.into() }
    }
}

pub type EvalResult<T> = std::result::Result<T, EvalError>;
