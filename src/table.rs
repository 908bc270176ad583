// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Gherkin data tables, attached to steps and to `Examples:` sections.

use linked_hash_map::LinkedHashMap;

/// A rectangular table of string cells, with the first row treated as the
/// header by [`Table::rows_as_maps`].
///
/// # Example
///
/// ```
/// use karate_core::table::Table;
///
/// let table = Table::new(vec![
///     vec!["name".into(), "age".into()],
///     vec!["Alice".into(), "30".into()],
/// ]);
/// assert_eq!(table.header(), &["name", "age"]);
/// assert_eq!(table.rows_as_maps()[0]["age"], "30");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    #[must_use]
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn header(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Data rows, excluding the header.
    #[must_use]
    pub fn data_rows(&self) -> &[Vec<String>] {
        if self.rows.is_empty() { &[] } else { &self.rows[1..] }
    }

    /// Every row including the header, in file order.
    #[must_use]
    pub fn raw(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Each data row as an ordered map keyed by the header cell, preserving
    /// column order (used by `Examples:` row expansion and by `table`
    /// values exposed to scripts).
    #[must_use]
    pub fn rows_as_maps(&self) -> Vec<LinkedHashMap<String, String>> {
        let header = self.header();
        self.data_rows()
            .iter()
            .map(|row| header.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
