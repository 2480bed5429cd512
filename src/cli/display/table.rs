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

//! Table rendering for CLI output

use super::{ColorTheme, StatusIcon};
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
enum Row {
    Cells(Vec<String>),
    Separator,
}

/// Table with optional per-column merging of repeated values.
///
/// A merged column shows a value only where it differs from the row above.
/// Separators render as an empty row and restart merging.
pub struct TableRenderer {
    header: Vec<String>,
    rows: Vec<Row>,
    merge_columns: BTreeSet<usize>,
    state_column: Option<usize>,
    theme: ColorTheme,
}

impl TableRenderer {
    pub fn new<S: AsRef<str>>(header: &[S]) -> Self {
        Self {
            header: header.iter().map(|h| h.as_ref().to_string()).collect(),
            rows: Vec::new(),
            merge_columns: BTreeSet::new(),
            state_column: None,
            theme: ColorTheme::default(),
        }
    }

    pub fn enable_auto_merge(&mut self, columns: &[usize]) -> &mut Self {
        self.merge_columns.extend(columns.iter().copied());
        self
    }

    /// Colors and prefixes the given column with a lifecycle-state icon.
    pub fn set_state_column(&mut self, column: usize) -> &mut Self {
        self.state_column = Some(column);
        self
    }

    pub fn add_row<S: Into<String>>(&mut self, cells: Vec<S>) -> &mut Self {
        self.rows
            .push(Row::Cells(cells.into_iter().map(Into::into).collect()));
        self
    }

    pub fn add_separator(&mut self) -> &mut Self {
        self.rows.push(Row::Separator);
        self
    }

    pub fn is_empty(&self) -> bool {
        !self.rows.iter().any(|r| matches!(r, Row::Cells(_)))
    }

    pub fn render(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(
                self.header
                    .iter()
                    .map(|h| Cell::new(h).set_alignment(CellAlignment::Left)),
            );

        let mut previous: Option<&Vec<String>> = None;
        for row in &self.rows {
            match row {
                Row::Separator => {
                    table.add_row(self.header.iter().map(|_| Cell::new("")));
                    previous = None;
                }
                Row::Cells(cells) => {
                    table.add_row(cells.iter().enumerate().map(|(i, value)| {
                        let repeated = self.merge_columns.contains(&i)
                            && previous.and_then(|p| p.get(i)) == Some(value);
                        if repeated {
                            Cell::new("")
                        } else if self.state_column == Some(i) && !value.is_empty() {
                            Cell::new(format!("{} {}", StatusIcon::for_state(value), value))
                                .fg(self.theme.state_color(value))
                        } else {
                            Cell::new(value)
                        }
                    }));
                    previous = Some(cells);
                }
            }
        }

        let mut output = table.to_string();
        output.push('\n');
        output
    }
}

/// Human-readable binary size with one decimal, e.g. `1.5 GiB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
