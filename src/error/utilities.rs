// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shared helpers for attaching context to errors, mirroring the teacher's
//! `error::utilities::ResultExt`.

use std::fmt::Display;

use super::core::CoreError;

/// Attaches a short human-readable context string to an error on its way
/// into a [`CoreError`].
pub trait ResultExt<T> {
    fn with_core_context(self, context: impl Display) -> Result<T, CoreError>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CoreError>,
{
    fn with_core_context(self, context: impl Display) -> Result<T, CoreError> {
        self.map_err(|e| {
            let inner: CoreError = e.into();
            CoreError::Context { context: context.to_string(), source: Box::new(inner) }
        })
    }
}
