// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The file-system/classpath collaborator seam behind `call`/`callonce`/
//! `callSingle` (spec.md §4.H "`call(path, arg)`... the core loads the
//! referenced feature"). Resolving a path string (`classpath:foo.feature`,
//! a relative path, ...) into feature text is environment-specific, so the
//! core only asks for text by the literal path a `read(...)` step named.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{error::CallError, source::Source};

#[async_trait]
pub trait FeatureLoader: Send + Sync {
    async fn load(&self, path: &str) -> Result<Arc<Source>, CallError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::{collections::HashMap, sync::Arc};

    use async_trait::async_trait;

    use super::FeatureLoader;
    use crate::{error::CallError, source::Source};

    /// An in-memory loader for tests: maps a path literal directly to
    /// feature text, skipping real file I/O.
    #[derive(Default)]
    pub struct StaticLoader {
        pub files: HashMap<String, String>,
    }

    #[async_trait]
    impl FeatureLoader for StaticLoader {
        async fn load(&self, path: &str) -> Result<Arc<Source>, CallError> {
            match self.files.get(path) {
                Some(text) => Ok(Arc::new(Source::new(path, text.clone()))),
                None => Err(CallError::new(path, "no such feature in test loader")),
            }
        }
    }
}
