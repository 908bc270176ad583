// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The external collaborator seam for `Java.type(...)` / `Host.lookup(...)`
//! reflective interop (spec.md §4.C, §1 "deliberately out of scope").

use async_trait::async_trait;

use crate::{error::EvalError, value::Value};

/// Resolves a host type name to a handle, and dispatches method calls on
/// handles it produced. The crate ships no implementation — a caller wires
/// in whatever reflection/FFI layer its embedding needs.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve_type(&self, type_name: &str) -> Result<Value, EvalError>;

    async fn invoke(&self, handle: &Value, method: &str, args: &[Value]) -> Result<Value, EvalError>;
}

/// A resolver that rejects every lookup; the default when an embedding
/// never wires one in, so `Java.type(...)` fails loudly instead of
/// silently returning `undefined`.
pub struct UnsupportedHostResolver;

#[async_trait]
impl HostResolver for UnsupportedHostResolver {
    async fn resolve_type(&self, type_name: &str) -> Result<Value, EvalError> {
        Err(EvalError::at(format!("no host resolver configured for type '{type_name}'")))
    }

    async fn invoke(&self, _handle: &Value, method: &str, _args: &[Value]) -> Result<Value, EvalError> {
        Err(EvalError::at(format!("no host resolver configured for method '{method}'")))
    }
}
