// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Lookup of catalog entries (plans, machine types) by ID or by attributes
//!
//! Commands let users pick an entry either with an explicit ID flag or with
//! descriptive flags such as `--plan-name` or `--cpu/--ram`. Both paths go
//! through [`Catalog::resolve`].

use crate::shared::error::{CliError, Result};

pub trait CatalogEntry {
    fn id(&self) -> &str;

    /// Short description listed when nothing matches.
    fn describe(&self) -> String;
}

pub enum Selector<'q, T> {
    Id(&'q str),
    /// Description of the query for error messages, plus the predicate.
    Matching(String, Box<dyn Fn(&T) -> bool + 'q>),
}

pub struct Catalog<'a, T> {
    kind: &'static str,
    entries: &'a [T],
}

impl<'a, T: CatalogEntry> Catalog<'a, T> {
    pub fn new(kind: &'static str, entries: &'a [T]) -> Self {
        Self { kind, entries }
    }

    /// The first entry the selector matches. A miss is a configuration error
    /// listing what is available.
    pub fn resolve(&self, selector: &Selector<'_, T>) -> Result<&'a T> {
        let found = match selector {
            Selector::Id(id) => self.entries.iter().find(|e| e.id().eq_ignore_ascii_case(id)),
            Selector::Matching(_, predicate) => self.entries.iter().find(|e| predicate(e)),
        };
        found.ok_or_else(|| {
            let query = match selector {
                Selector::Id(id) => format!("ID \"{}\"", id),
                Selector::Matching(description, _) => description.clone(),
            };
            CliError::config_error(format!(
                "no {} found for {}, available: {}",
                self.kind,
                query,
                self.available()
            ))
        })
    }

    fn available(&self) -> String {
        if self.entries.is_empty() {
            return "none".to_string();
        }
        self.entries
            .iter()
            .map(|e| e.describe())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
