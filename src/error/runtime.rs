// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors that terminate a step, a scenario, or a called feature.

use std::time::Duration;

use derive_more::{Display, Error};

/// Failure surfaced by the external [`RequestExecutor`](crate::request::RequestExecutor)
/// collaborator. The core never interprets the wire details; it only
/// propagates the message.
#[derive(Debug, Clone, Display, Error, PartialEq, Eq)]
#[display("HTTP request failed: {message}")]
pub struct HttpError {
    pub message: String,
}

impl HttpError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Failure of a `call`/`callonce`/`callSingle` invocation: the callee
/// feature itself failed.
#[derive(Debug, Clone, Display, Error, PartialEq, Eq)]
#[display("called feature '{path}' failed: {message}")]
pub struct CallError {
    pub path: String,
    pub message: String,
}

impl CallError {
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

/// A scenario exceeded its configured deadline.
#[derive(Debug, Clone, Copy, Display, Error, PartialEq, Eq)]
#[display("scenario timed out after {elapsed:?}")]
pub struct TimeoutError {
    pub elapsed: Duration,
}

/// A scenario's worker task was interrupted (suite-level cancellation, or an
/// I/O-bound step observing the cancellation signal).
#[derive(Debug, Clone, Display, Error, PartialEq, Eq)]
#[display("interrupted: {reason}")]
pub struct InterruptedError {
    pub reason: String,
}

impl InterruptedError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// A user-supplied [`ResultListener`](crate::listener::ResultListener) hook
/// raised. Always caught and logged; never fails the scenario it observed.
#[derive(Debug, Clone, Display, Error, PartialEq, Eq)]
#[display("hook raised: {message}")]
pub struct HookError {
    pub message: String,
}

impl HookError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
