// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Immutable record of a loaded feature file.

use std::path::{Path, PathBuf};

/// An immutable handle to the text of one feature file.
///
/// A [`Source`] is created by the loader and lives for the whole suite; it
/// is never mutated after construction. `line_offsets[i]` is the byte
/// offset of the start of line `i` (0-indexed), used to translate a byte
/// offset produced by the lexer back into `(line, col)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    path: PathBuf,
    text: String,
    line_offsets: Vec<usize>,
}

impl Source {
    /// Builds a [`Source`] from an already-read path and UTF-8 text.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_offsets = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_offsets.push(i + 1);
            }
        }
        Self { path: path.into(), text, line_offsets }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// `path` relative to `base`, falling back to `path` unchanged if it is
    /// not a descendant of `base`.
    #[must_use]
    pub fn relative_path(&self, base: &Path) -> PathBuf {
        self.path.strip_prefix(base).map(Path::to_path_buf).unwrap_or_else(|_| self.path.clone())
    }

    #[must_use]
    pub fn file_name_without_extension(&self) -> String {
        self.path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string()
    }

    /// A dotted, Java-package-like qualified name derived from the parent
    /// directory components and the file stem, e.g. `demos.login.basic` for
    /// `demos/login/basic.feature`. Used to build `Scenario::unique_id`.
    #[must_use]
    pub fn package_qualified_name(&self) -> String {
        let mut parts: Vec<String> = self
            .path
            .parent()
            .map(|dir| {
                dir.components()
                    .filter_map(|c| c.as_os_str().to_str())
                    .filter(|s| !s.is_empty() && *s != ".")
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        parts.push(self.file_name_without_extension());
        parts.join(".")
    }

    /// Translates a byte offset in [`Source::text`] into a 1-indexed
    /// `(line, col)` pair.
    #[must_use]
    pub fn line_col_at(&self, byte_offset: usize) -> (usize, usize) {
        let line_idx = match self.line_offsets.binary_search(&byte_offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_offsets.get(line_idx).copied().unwrap_or(0);
        let col = self.text[line_start..byte_offset.min(self.text.len())].chars().count();
        (line_idx + 1, col + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_qualified_name_joins_dirs_and_stem() {
        let src = Source::new("demos/login/basic.feature", "Feature: x\n");
        assert_eq!(src.package_qualified_name(), "demos.login.basic");
    }

    #[test]
    fn line_col_tracks_newlines() {
        let src = Source::new("a.feature", "one\ntwo\nthree");
        assert_eq!(src.line_col_at(0), (1, 1));
        assert_eq!(src.line_col_at(4), (2, 1));
        assert_eq!(src.line_col_at(9), (3, 1));
    }

    #[test]
    fn file_name_without_extension_strips_feature_suffix() {
        let src = Source::new("a/b/hello.feature", "");
        assert_eq!(src.file_name_without_extension(), "hello");
    }
}
