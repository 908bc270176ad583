// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The hierarchical variable bag: suite → feature → scenario, each tier
//! shadowing its parent.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{expr::host::HostResolver, value::Value};

#[derive(Default)]
struct ScopeInner {
    vars: HashMap<String, Value>,
    sealed: bool,
}

/// One tier of the scope chain. Cloning a [`Scope`] clones the handle (an
/// `Arc`), not the bindings — use [`Scope::child`] to create a new, nested
/// tier.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<Mutex<ScopeInner>>,
    parent: Option<Arc<Scope>>,
    host_resolver: Option<Arc<dyn HostResolver>>,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("Scope")
            .field("keys", &inner.vars.keys().collect::<Vec<_>>())
            .field("sealed", &inner.sealed)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl Scope {
    /// Creates a root (suite-level) scope.
    #[must_use]
    pub fn root() -> Self {
        Self { inner: Arc::new(Mutex::new(ScopeInner::default())), parent: None, host_resolver: None }
    }

    #[must_use]
    pub fn with_host_resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.host_resolver = Some(resolver);
        self
    }

    /// Creates a new scope tier nested under `self`.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScopeInner::default())),
            parent: Some(Arc::new(self.clone())),
            host_resolver: self.host_resolver.clone(),
        }
    }

    #[must_use]
    pub fn host_resolver(&self) -> Option<Arc<dyn HostResolver>> {
        self.host_resolver.clone()
    }

    /// Freezes this tier: further `set` calls panic. Used once feature-scope
    /// background/`callonce` evaluation completes (spec.md §9 "Background
    /// freezing") so scenarios cannot accidentally write through to it.
    pub fn seal(&self) {
        self.inner.lock().unwrap().sealed = true;
    }

    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.inner.lock().unwrap().sealed
    }

    /// Binds `name` in *this* tier. Never mutates an ancestor tier, even if
    /// `name` shadows a binding there.
    pub fn set(&self, name: impl Into<String>, value: Value) {
        let mut inner = self.inner.lock().unwrap();
        assert!(!inner.sealed, "attempted to write to a sealed scope");
        inner.vars.insert(name.into(), value);
    }

    /// Reads `name`, searching this tier then each ancestor in turn.
    ///
    /// A hit in `self`'s own tier returns the value unchanged (composite
    /// values keep their normal in-tier aliasing). A hit in an ancestor is
    /// copy-on-read: the composite value is shallow-detached and the
    /// detached copy is cached in `self`'s own tier before being returned,
    /// so a later mutation through this scope can never be observed by a
    /// sibling scope that read the same ancestor binding (spec.md §5, §9,
    /// §8 invariant 8).
    #[must_use]
    pub fn get(&self, name: &str) -> Value {
        {
            let inner = self.inner.lock().unwrap();
            if let Some(v) = inner.vars.get(name) {
                return v.clone();
            }
        }
        let mut scope = self.parent.as_deref();
        while let Some(p) = scope {
            let found = p.inner.lock().unwrap().vars.get(name).cloned();
            if let Some(v) = found {
                let detached = v.shallow_detach();
                if !self.is_sealed() {
                    self.inner.lock().unwrap().vars.insert(name.to_string(), detached.clone());
                }
                return detached;
            }
            scope = p.parent.as_deref();
        }
        Value::Undefined
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        !matches!(self.get(name), Value::Undefined)
    }

    /// A flat snapshot of every binding visible from this tier (own tier
    /// wins over ancestors), used by `karate.config` and by `call`'s
    /// "return the callee's final feature-scope as a map" contract.
    #[must_use]
    pub fn snapshot(&self) -> linked_hash_map::LinkedHashMap<String, Value> {
        let mut keys: Vec<String> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut scope = Some(self);
        let mut chain = Vec::new();
        while let Some(s) = scope {
            chain.push(s);
            scope = s.parent.as_deref();
        }
        for s in &chain {
            for k in s.inner.lock().unwrap().vars.keys() {
                if seen.insert(k.clone()) {
                    keys.push(k.clone());
                }
            }
        }
        keys.into_iter().map(|k| (k.clone(), self.get(&k))).collect()
    }
}
