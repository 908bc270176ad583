// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The central concurrency component (spec.md §4.H): owns the worker
//! pool, the `@lock` algorithm, `callSingle`'s suite-scoped memoisation,
//! and per-scenario deadlines.

pub mod call_single;
pub mod lock;

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, Weak,
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex as AsyncMutex, Semaphore};

use crate::{
    config::RunConfig,
    error::CallError,
    expr::host::HostResolver,
    feature::Feature,
    karate_api::CallDispatcher,
    listener::{run_hook, ResultListener},
    loader::FeatureLoader,
    parser,
    request::RequestExecutor,
    result::{FeatureResult, Status, SuiteResult},
    runtime::{FeatureRuntime, ScenarioRuntime},
    scope::Scope,
    value::Value,
};

use call_single::MemoCache;
use lock::LockManager;

pub use crate::request::RequestExecutorFactory;

/// The collaborators every runtime layer needs, assembled once per suite
/// run and shared by reference down through Feature Runtime and Scenario
/// Runtime (spec.md §9 "Avoiding global mutable state" — this is the
/// single explicit bundle instead of statics).
pub struct SuiteContext {
    pub config: RunConfig,
    pub host_resolver: Arc<dyn HostResolver>,
    pub request_factory: RequestExecutorFactory,
    pub loader: Arc<dyn FeatureLoader>,
    pub listener: Arc<dyn ResultListener>,
    /// Installed by [`Scheduler::new`] — the Scheduler is always the
    /// `karate.call`/`karate.callSingle` seam for scenarios it runs.
    pub call_dispatcher: Option<Arc<dyn CallDispatcher>>,
}

/// A weak handle to the owning [`Scheduler`], installed into
/// [`SuiteContext::call_dispatcher`] so scenarios can call back into the
/// scheduler without the context holding a strong, self-referential `Arc`.
struct SchedulerHandle(Weak<Scheduler>);

#[async_trait]
impl CallDispatcher for SchedulerHandle {
    async fn call(&self, path: &str, arg: Value) -> Result<Value, CallError> {
        let scheduler = self.0.upgrade().ok_or_else(|| CallError::new(path, "scheduler no longer running"))?;
        scheduler.run_called_feature(path, arg).await
    }

    async fn call_single(&self, path: &str, arg: Value) -> Result<Value, CallError> {
        let scheduler = self.0.upgrade().ok_or_else(|| CallError::new(path, "scheduler no longer running"))?;
        scheduler.call_single_cache.get_or_run(path, || scheduler.run_called_feature(path, arg)).await
    }
}

pub struct Scheduler {
    context: SuiteContext,
    suite_scope: Scope,
    lock_manager: LockManager,
    /// Suite-scoped `karate.callSingle` cache — distinct from each
    /// feature's own `callonce` cache (spec.md §4.H).
    call_single_cache: MemoCache,
    worker_permits: Semaphore,
    cancelled: AtomicBool,
}

impl Scheduler {
    /// Builds the scheduler and installs it as its own `call_dispatcher`
    /// via a weak self-reference (`Arc::new_cyclic`), so `context` never
    /// needs to be mutated again after construction.
    #[must_use]
    pub fn new(mut context: SuiteContext) -> Arc<Self> {
        let worker_count = context.config.worker_count.max(1);
        Arc::new_cyclic(|weak: &Weak<Self>| {
            context.call_dispatcher = Some(Arc::new(SchedulerHandle(weak.clone())));
            Self {
                context,
                suite_scope: Scope::root(),
                lock_manager: LockManager::new(),
                call_single_cache: MemoCache::new(),
                worker_permits: Semaphore::new(worker_count),
                cancelled: AtomicBool::new(false),
            }
        })
    }

    /// Suite-level cancellation (spec.md §4.H "Cancellation & timeouts"):
    /// no scenario not already running is started after this call.
    /// In-flight scenarios are not forcibly aborted — there is no safe
    /// preemption point inside a user expression evaluation — but none of
    /// their *results* are awaited past this point either; `run_suite`
    /// still joins them to avoid leaking tasks.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Runs every feature to completion, honouring the worker count, the
    /// `@lock` algorithm, and any configured scenario deadline.
    ///
    /// Scenario tasks from *every* feature are in flight at once, bounded
    /// only by `worker_permits` (spec.md §4.H: the worker pool is shared
    /// across the whole suite, not carved up per feature) — there is no
    /// barrier that drains one feature's scenarios before the next
    /// feature's are even spawned. Per-feature ordering guarantees still
    /// hold: `on_feature_start` fires before any of that feature's own
    /// scenarios are spawned, and `on_feature_end` fires only once every
    /// one of that feature's scenarios has completed, signalled by an
    /// `AtomicUsize` countdown rather than an `await` on that feature's
    /// handles alone.
    pub async fn run_suite(self: &Arc<Self>, features: Vec<Feature>) -> SuiteResult {
        let suite_start = Instant::now();
        run_hook(self.context.listener.on_suite_start(&self.context.config)).await;

        struct FeatureProgress {
            feature: Arc<Feature>,
            results: Arc<Mutex<Vec<Option<crate::result::ScenarioResult>>>>,
        }

        /// Decrements a feature's remaining-scenario count and reports the
        /// feature done the moment it reaches zero — via `Drop`, so a
        /// scenario task that panics mid-flight still counts down instead
        /// of leaving its feature's completion signal stuck forever.
        struct FeatureDoneGuard {
            feature_index: usize,
            remaining: Arc<AtomicUsize>,
            done_tx: mpsc::UnboundedSender<usize>,
        }

        impl Drop for FeatureDoneGuard {
            fn drop(&mut self) {
                if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                    let _ = self.done_tx.send(self.feature_index);
                }
            }
        }

        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<usize>();
        let mut progress = Vec::with_capacity(features.len());
        let mut handles = Vec::new();

        for template in features {
            let prepared = FeatureRuntime::new(&self.context).prepare(template, &self.suite_scope).await;
            run_hook(self.context.listener.on_feature_start(&prepared.feature)).await;

            let feature_index = progress.len();
            let scenario_count = prepared.scenarios.len();
            let remaining = Arc::new(AtomicUsize::new(scenario_count));
            let results = Arc::new(Mutex::new((0..scenario_count).map(|_| None).collect::<Vec<_>>()));
            progress.push(FeatureProgress { feature: prepared.feature.clone(), results: results.clone() });

            if scenario_count == 0 {
                let _ = done_tx.send(feature_index);
                continue;
            }

            // spec.md §4.H "`parallel_ok`: true unless... the feature is
            // marked non-parallel": scenarios of such a feature still share
            // the suite-wide worker pool and run concurrently with *other*
            // features' scenarios, but never with each other.
            let serial_lock =
                prepared.feature.forces_serial_scenarios().then(|| Arc::new(AsyncMutex::new(())));

            for (scenario_index, scenario) in prepared.scenarios.into_iter().enumerate() {
                let scheduler = self.clone();
                let feature_scope = prepared.feature_scope.clone();
                let callonce_cache = prepared.callonce_cache.clone();
                let remaining = remaining.clone();
                let results = results.clone();
                let done_tx = done_tx.clone();
                let serial_lock = serial_lock.clone();
                handles.push(tokio::spawn(async move {
                    let _guard = FeatureDoneGuard { feature_index, remaining, done_tx };
                    let _serial_permit = match &serial_lock {
                        Some(lock) => Some(lock.lock().await),
                        None => None,
                    };
                    let result = scheduler.run_one_scenario(scenario, feature_scope, callonce_cache, suite_start).await;
                    results.lock().unwrap()[scenario_index] = Some(result);
                }));
            }
        }
        drop(done_tx);

        let mut feature_results: Vec<Option<FeatureResult>> = (0..progress.len()).map(|_| None).collect();
        for _ in 0..progress.len() {
            let Some(feature_index) = done_rx.recv().await else { break };
            let prog = &progress[feature_index];
            let scenario_results: Vec<_> = prog.results.lock().unwrap().drain(..).flatten().collect();
            let feature_result = FeatureRuntime::aggregate(prog.feature.clone(), scenario_results);
            run_hook(self.context.listener.on_feature_end(&feature_result)).await;
            feature_results[feature_index] = Some(feature_result);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %e, "scenario task panicked");
                #[cfg(not(feature = "tracing"))]
                let _ = e;
            }
        }

        let feature_results: Vec<FeatureResult> = feature_results.into_iter().flatten().collect();
        let passed_count = feature_results.iter().map(FeatureResult::passed_count).sum();
        let failed_count = feature_results.iter().map(FeatureResult::failed_count).sum();
        let suite_result = SuiteResult {
            feature_results,
            passed_count,
            failed_count,
            start: Duration::ZERO,
            end: suite_start.elapsed(),
            setup_error: None,
        };
        run_hook(self.context.listener.on_suite_end(&suite_result)).await;
        suite_result
    }

    /// Backs both `karate.call` and `karate.callSingle` (spec.md §4.H
    /// "`call(path, arg)`... the core loads the referenced feature"): loads
    /// and parses the callee, injects `arg`'s entries (if it's a map) or
    /// `arg` itself (under `__arg`) into a scope parented on the suite
    /// scope, then runs its background plus its *first* scenario — callee
    /// features used as subroutines conventionally define exactly one —
    /// and returns the resulting scope as a map (spec.md §9).
    async fn run_called_feature(&self, path: &str, arg: Value) -> Result<Value, CallError> {
        let source = self.context.loader.load(path).await?;
        let template = parser::load(source);
        let call_scope = self.suite_scope.child();
        match &arg {
            Value::Map(entries) => {
                for (k, v) in entries.lock().unwrap().iter() {
                    call_scope.set(k.clone(), v.clone());
                }
            }
            Value::Undefined => {}
            other => call_scope.set("__arg", other.clone()),
        }

        let prepared = FeatureRuntime::new(&self.context).prepare(template, &call_scope).await;
        let Some(first) = prepared.scenarios.into_iter().next() else {
            return Err(CallError::new(path, "called feature has no scenarios"));
        };

        let runtime = ScenarioRuntime::new(&self.context);
        let (result, scenario_scope) =
            runtime.run_with_scope(first, &prepared.feature_scope, &prepared.callonce_cache, Instant::now()).await;
        if result.status == Status::Failed {
            return Err(CallError::new(path, result.error.unwrap_or_else(|| "called feature failed".to_string())));
        }

        Ok(Value::map(scenario_scope.snapshot()))
    }

    async fn run_one_scenario(
        &self,
        scenario: crate::scenario::Scenario,
        feature_scope: Scope,
        callonce_cache: Arc<MemoCache>,
        suite_start: Instant,
    ) -> crate::result::ScenarioResult {
        if self.cancelled.load(Ordering::SeqCst) {
            return interrupted_result(scenario, suite_start, "suite cancelled before this scenario started");
        }

        let _permit = self.worker_permits.acquire().await.expect("worker semaphore is never closed");
        let lock_key = scenario.lock_key();
        let runtime = ScenarioRuntime::new(&self.context);
        let deadline = self.context.config.scenario_deadline;
        let scenario_for_timeout = deadline.map(|_| scenario.clone());

        let run = self.lock_manager.run_locked(lock_key.as_deref(), async move {
            runtime.run(scenario, &feature_scope, &callonce_cache, suite_start).await
        });

        match deadline {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(result) => result,
                Err(_) => timeout_result(scenario_for_timeout.expect("set above when deadline is Some"), suite_start, limit),
            },
            None => run.await,
        }
    }
}

/// spec.md §4.H: "Suite-level cancellation propagates... no new ones are
/// started." — reported the same way a deadline is, via
/// [`InterruptedError`](crate::error::InterruptedError).
fn interrupted_result(scenario: crate::scenario::Scenario, suite_start: Instant, reason: &str) -> crate::result::ScenarioResult {
    let now = suite_start.elapsed();
    crate::result::ScenarioResult {
        scenario,
        step_results: Vec::new(),
        status: Status::Failed,
        start: now,
        end: now,
        error: Some(crate::error::InterruptedError::new(reason).to_string()),
        embeds: Vec::new(),
    }
}

fn timeout_result(scenario: crate::scenario::Scenario, suite_start: Instant, elapsed: Duration) -> crate::result::ScenarioResult {
    let now = suite_start.elapsed();
    crate::result::ScenarioResult {
        scenario,
        step_results: Vec::new(),
        status: Status::Failed,
        start: now,
        end: now,
        error: Some(crate::error::TimeoutError { elapsed }.to_string()),
        embeds: Vec::new(),
    }
}
