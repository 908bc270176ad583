// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors (really: results) produced by the structural [`Match`](crate::match_engine) engine.

use derive_more::{Display, Error};

use crate::value::Value;

/// The outcome of a single match comparison.
///
/// Unlike the other error types in this crate, [`MatchError`] is usually
/// carried as data inside a passing `Result`, since a failed match is an
/// ordinary (expected) outcome of `match`/`assert` steps, not a bug. It is
/// still a real error type so it can be attached to [`StepResult::error`](
/// crate::result::StepResult::error) uniformly.
#[derive(Debug, Clone, Display, Error, PartialEq)]
#[display("match failed at {path}: actual={actual} expected={expected} ({message})")]
pub struct MatchError {
    /// JSON-pointer-like location of the first mismatch.
    pub path: String,
    pub expected: Value,
    pub actual: Value,
    pub message: String,
}

impl MatchError {
    #[must_use]
    pub fn new(path: impl Into<String>, actual: Value, expected: Value, message: impl Into<String>) -> Self {
        Self { path: path.into(), expected, actual, message: message.into() }
    }
}

pub type MatchEngineResult<T> = std::result::Result<T, MatchError>;
