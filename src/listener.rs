// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The push interface observing suite/feature/scenario lifecycle events
//! (spec.md §4.I).

use std::{future::Future, panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use futures::FutureExt as _;

use crate::{
    config::RunConfig,
    feature::Feature,
    result::{FeatureResult, ScenarioResult, StepResult, SuiteResult},
    scenario::Scenario,
};

/// Hooks are the same interface as user-supplied observers (spec.md
/// §4.I). Every method has a default no-op body so an embedder only
/// overrides what it needs. A raise from any method is caught by the
/// caller and logged, never failing the scenario it observed.
#[async_trait]
pub trait ResultListener: Send + Sync {
    async fn on_suite_start(&self, _config: &RunConfig) {}
    async fn on_feature_start(&self, _feature: &Arc<Feature>) {}
    async fn on_scenario_start(&self, _scenario: &Scenario) {}
    async fn on_step_end(&self, _result: &StepResult) {}
    async fn on_scenario_end(&self, _result: &ScenarioResult) {}
    async fn on_feature_end(&self, _result: &FeatureResult) {}
    async fn on_suite_end(&self, _result: &SuiteResult) {}
}

/// A listener that does nothing; the default when an embedder doesn't
/// need lifecycle events.
pub struct NoopListener;

#[async_trait]
impl ResultListener for NoopListener {}

/// Runs a hook invocation, catching a panic so a misbehaving observer can
/// never fail the scenario it is watching (spec.md §4.I). Mirrors the
/// `AssertUnwindSafe(...).catch_unwind().await` pattern used for user
/// hooks elsewhere in the ecosystem.
pub(crate) async fn run_hook(fut: impl Future<Output = ()>) {
    if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "listener hook panicked".to_string());
        #[cfg(feature = "tracing")]
        tracing::warn!(%message, "result listener hook raised");
        #[cfg(not(feature = "tracing"))]
        let _ = message;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_listener_accepts_every_hook_without_panicking() {
        let listener = NoopListener;
        listener.on_suite_start(&RunConfig::default()).await;
        listener.on_suite_end(&SuiteResult::default()).await;
    }
}
