// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The `karate.*` object every embedded expression evaluates against
//! (spec.md §6). Backed by the running scenario's [`Scope`] and
//! [`RunConfig`], this is a thin read/log surface — `call`/`callSingle`
//! dispatch is owned by the scheduler, which installs itself as this
//! object's [`CallDispatcher`].

use std::sync::Arc;

use async_trait::async_trait;
use linked_hash_map::LinkedHashMap;

use crate::{config::RunConfig, error::CallError, scope::Scope, value::Value};

/// The seam `karate.call`/`karate.callSingle` go through. The scheduler
/// implements this to route a call through feature loading, `callonce`
/// memoisation, and `callSingle` suite-scoped caching.
#[async_trait]
pub trait CallDispatcher: Send + Sync {
    async fn call(&self, path: &str, arg: Value) -> Result<Value, CallError>;
    async fn call_single(&self, path: &str, arg: Value) -> Result<Value, CallError>;
}

/// One embed attached to a scenario's HTML report (spec.md §6 `karate.embed`).
#[derive(Debug, Clone)]
pub struct Embed {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// The live `karate` object bound into a scenario's [`Scope`] under the
/// name `"karate"` as a [`Value::Karate`] sentinel; the evaluator's member
/// and call dispatch for that sentinel delegates here rather than through
/// the general `HostResolver` path, since this is a first-class API the
/// core owns (as opposed to arbitrary host-language reflection).
///
/// Deliberately holds no [`Scope`] of its own: a `karate` value lives
/// *inside* the very scope it would otherwise need to snapshot, and an
/// owned `Scope` field there would close a strong reference cycle the
/// scope chain's `Arc`s can never break (spec.md §9 "Avoiding global
/// mutable state" — no hidden self-reference, either). `config_snapshot`
/// instead takes the caller's current scope by reference.
pub struct KarateApi {
    config: RunConfig,
    dispatcher: Option<Arc<dyn CallDispatcher>>,
    log: std::sync::Mutex<Vec<String>>,
    embeds: std::sync::Mutex<Vec<Embed>>,
}

impl std::fmt::Debug for KarateApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KarateApi").finish_non_exhaustive()
    }
}

impl KarateApi {
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Self { config, dispatcher: None, log: std::sync::Mutex::new(Vec::new()), embeds: std::sync::Mutex::new(Vec::new()) }
    }

    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn CallDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    #[must_use]
    pub fn properties(&self) -> Value {
        let entries: LinkedHashMap<String, Value> =
            self.config.properties.iter().map(|(k, v)| (k.clone(), Value::from(v.as_str()))).collect();
        Value::map(entries)
    }

    #[must_use]
    pub fn env(&self) -> Value {
        Value::from(self.config.env.as_str())
    }

    /// A read-only shallow snapshot of `scope`, mirroring spec.md §6
    /// `karate.config`: top-level keys, not a live reference — mutating it
    /// back through `set` has no effect on the scope.
    #[must_use]
    pub fn config_snapshot(&self, scope: &Scope) -> Value {
        let entries: LinkedHashMap<String, Value> = scope.snapshot().into_iter().map(|(k, v)| (k, v.shallow_detach())).collect();
        Value::map(entries)
    }

    /// `karate.log(...)`: appends a line to this scenario's log, formatting
    /// each argument with [`Value::display_string`] and joining with a
    /// space, matching the Step Dispatcher's own `print` step formatting.
    pub fn log(&self, args: &[Value]) {
        let line = args.iter().map(Value::display_string).collect::<Vec<_>>().join(" ");
        self.log.lock().unwrap().push(line);
    }

    #[must_use]
    pub fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut self.log.lock().unwrap())
    }

    /// `karate.embed(bytes, mimeType)`.
    pub fn embed(&self, bytes: Vec<u8>, mime_type: impl Into<String>) {
        self.embeds.lock().unwrap().push(Embed { mime_type: mime_type.into(), bytes });
    }

    #[must_use]
    pub fn take_embeds(&self) -> Vec<Embed> {
        std::mem::take(&mut self.embeds.lock().unwrap())
    }

    pub async fn call(&self, path: &str, arg: Value) -> Result<Value, CallError> {
        match &self.dispatcher {
            Some(d) => d.call(path, arg).await,
            None => Err(CallError::new(path, "no call dispatcher installed")),
        }
    }

    pub async fn call_single(&self, path: &str, arg: Value) -> Result<Value, CallError> {
        match &self.dispatcher {
            Some(d) => d.call_single(path, arg).await,
            None => Err(CallError::new(path, "no call dispatcher installed")),
        }
    }

    /// `karate.setup()` / `karate.setup(name)` (spec.md §6): runs a
    /// one-time suite-wide initialization feature through the same
    /// `callSingle` memoisation `karate.callSingle` itself uses, so a
    /// scenario calling `setup()` more than once only pays for it once.
    /// `name` picks a specific setup feature; with no argument, the path
    /// configured as [`RunConfig::setup_path`] is used.
    pub async fn setup(&self, name: Option<&str>) -> Result<Value, CallError> {
        let path = match name.map(str::to_string).or_else(|| self.config.setup_path.clone()) {
            Some(path) => path,
            None => return Err(CallError::new("karate.setup", "no setup feature configured")),
        };
        self.call_single(&path, Value::Undefined).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_surfaces_run_config_values() {
        let mut config = RunConfig::default();
        config.properties.insert("region".to_string(), "us-east-1".to_string());
        let api = KarateApi::new(config);
        if let Value::Map(m) = api.properties() {
            assert_eq!(m.lock().unwrap().get("region"), Some(&Value::from("us-east-1")));
        } else {
            panic!("expected map");
        }
    }

    #[test]
    fn log_accumulates_formatted_lines() {
        let api = KarateApi::new(RunConfig::default());
        api.log(&[Value::from("status"), Value::int(200)]);
        assert_eq!(api.take_log(), vec!["status 200".to_string()]);
        assert!(api.take_log().is_empty());
    }

    #[test]
    fn config_snapshot_reflects_the_given_scope_not_a_stored_one() {
        let scope = Scope::root();
        scope.set("a", Value::int(1));
        let api = KarateApi::new(RunConfig::default());
        match api.config_snapshot(&scope) {
            Value::Map(m) => assert_eq!(m.lock().unwrap().get("a"), Some(&Value::int(1))),
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn call_without_dispatcher_is_an_error() {
        let api = KarateApi::new(RunConfig::default());
        let result = api.call("classpath:foo.feature", Value::Undefined).await;
        assert!(result.is_err());
    }
}
