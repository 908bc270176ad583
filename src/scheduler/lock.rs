// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Exclusive (`@lock=*`) and shared-key (`@lock=KEY`) scenario locking
//! (spec.md §4.H).
//!
//! An exclusive lock must run with no other scenario active, including
//! unlocked ones, so it is modelled as the writer side of an
//! [`tokio::sync::RwLock`]; every other scenario (unlocked, or holding a
//! shared key) takes the reader side, so they all run concurrently with
//! each other but never alongside an exclusive holder. A shared key
//! additionally serialises pairwise against other scenarios holding that
//! *same* key via a per-key mutex.

use std::{collections::HashMap, future::Future, sync::Arc};

use tokio::sync::{Mutex, RwLock};

#[derive(Default)]
pub struct LockManager {
    exclusive: RwLock<()>,
    shared_keys: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `body` holding whatever lock `lock_key` implies. `lock_key` is
    /// `Some("*")` for exclusive, `Some(key)` for a shared key, `None` for
    /// unlocked (spec.md `Scenario::lock_key`).
    pub async fn run_locked<T>(&self, lock_key: Option<&str>, body: impl Future<Output = T>) -> T {
        match lock_key {
            Some("*") => {
                let _exclusive = self.exclusive.write().await;
                body.await
            }
            Some(key) => {
                let key_lock = {
                    let mut keys = self.shared_keys.lock().await;
                    keys.entry(key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
                };
                let _shared = self.exclusive.read().await;
                let _key_guard = key_lock.lock().await;
                body.await
            }
            None => {
                let _shared = self.exclusive.read().await;
                body.await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn unlocked_scenarios_run_concurrently() {
        let manager = Arc::new(LockManager::new());
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_concurrent = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let manager = manager.clone();
            let concurrent = concurrent.clone();
            let max_concurrent = max_concurrent.clone();
            handles.push(tokio::spawn(async move {
                manager
                    .run_locked(None, async {
                        let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                        max_concurrent.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        concurrent.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(max_concurrent.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn exclusive_lock_excludes_everything_else() {
        let manager = Arc::new(LockManager::new());
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_concurrent = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..4 {
            let manager = manager.clone();
            let concurrent = concurrent.clone();
            let max_concurrent = max_concurrent.clone();
            let lock_key = if i == 0 { Some("*".to_string()) } else { None };
            handles.push(tokio::spawn(async move {
                manager
                    .run_locked(lock_key.as_deref(), async {
                        let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                        max_concurrent.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        concurrent.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(max_concurrent.load(Ordering::SeqCst), 1);
    }
}
