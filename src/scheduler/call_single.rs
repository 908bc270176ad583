// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A `path -> completion-future` map with double-checked initialisation
//! (spec.md §9 "`callSingle` future"). One instance, shared for the whole
//! suite, backs `karate.callSingle`; a fresh instance per feature backs
//! the `call once` step keyword, since the two memoisation scopes are
//! explicitly distinct (spec.md §4.G point 4).

use std::{collections::HashMap, future::Future, sync::Arc};

use tokio::sync::{Mutex, OnceCell};

use crate::{error::CallError, value::Value};

type Cell = Arc<OnceCell<Result<Value, CallError>>>;

#[derive(Default)]
pub struct MemoCache {
    cells: Mutex<HashMap<String, Cell>>,
}

impl MemoCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached result for `key` if another caller already ran
    /// `make`; otherwise runs it exactly once and caches the result.
    /// Concurrent callers racing on the same `key` all park on the same
    /// cell rather than each running `make`.
    pub async fn get_or_run<F, Fut>(&self, key: &str, make: F) -> Result<Value, CallError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, CallError>>,
    {
        let cell = {
            let mut cells = self.cells.lock().await;
            cells.entry(key.to_string()).or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };
        cell.get_or_init(make).await.clone()
    }
}
