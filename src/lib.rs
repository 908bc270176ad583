// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![deny(rust_2018_idioms)]

//! Feature execution core for a Gherkin + embedded-script API testing
//! framework.
//!
//! A suite run flows through five layers, each in its own module:
//!
//! - [`lexer`] / [`parser`] turn feature-file text into a [`feature::Feature`].
//! - [`expr`] is the embedded tree-walking expression language every
//!   `def`/`eval`/`match` right-hand side evaluates through.
//! - [`match_engine`] implements structural `match` comparisons.
//! - [`dispatcher`] maps the closed step-keyword set to actions against a
//!   scenario's [`scope::Scope`] and staged [`request::RequestExecutor`].
//! - [`runtime`] and [`scheduler`] turn parsed features into running
//!   scenarios: the Feature Runtime expands outlines and owns `callonce`
//!   memoisation, the Scenario Runtime drives one scenario's steps, and
//!   the Scheduler owns worker concurrency, `@lock` locking, and
//!   `callSingle` memoisation.
//!
//! Enable the `tracing` feature to have the Scheduler and hook-panic
//! paths emit [`tracing`] spans/events instead of doing nothing.

pub mod config;
pub mod dispatcher;
pub mod docstring;
pub mod error;
pub mod expr;
pub mod feature;
pub mod karate_api;
pub mod lexer;
pub mod listener;
pub mod loader;
pub mod match_engine;
pub mod outline;
pub mod parser;
pub mod request;
pub mod result;
pub mod runtime;
pub mod scenario;
pub mod scheduler;
pub mod scope;
pub mod source;
pub mod step;
pub mod table;
pub mod tag;
pub mod token;
pub mod value;

pub use config::RunConfig;
pub use dispatcher::{DispatchOutcome, StepDispatcher};
pub use error::{CallError, CoreError};
pub use feature::Feature;
pub use karate_api::{CallDispatcher, KarateApi};
pub use listener::{NoopListener, ResultListener};
pub use loader::FeatureLoader;
pub use parser::load as parse_feature;
pub use result::{FeatureResult, ScenarioResult, Status, StepResult, SuiteResult};
pub use scenario::Scenario;
pub use scheduler::{RequestExecutorFactory, Scheduler, SuiteContext};
pub use scope::Scope;
pub use source::Source;
pub use value::Value;
