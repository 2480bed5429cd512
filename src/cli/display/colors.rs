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

//! Color theme for CLI output

use comfy_table::Color as TableColor;

/// Color theme for terminal output
#[derive(Debug, Clone)]
pub struct ColorTheme {
    pub success: TableColor,
    pub warning: TableColor,
    pub error: TableColor,
    pub info: TableColor,
    pub muted: TableColor,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            success: TableColor::Green,
            warning: TableColor::Yellow,
            error: TableColor::Red,
            info: TableColor::Cyan,
            muted: TableColor::DarkGrey,
        }
    }
}

/// Coarse classification of the lifecycle states the APIs report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    Healthy,
    InProgress,
    Failed,
    Unknown,
}

impl StateClass {
    pub fn of(state: &str) -> Self {
        match state.to_ascii_uppercase().as_str() {
            "READY" | "ACTIVE" | "CREATED" | "RUNNING" | "SUCCEEDED" => StateClass::Healthy,
            "PENDING" | "PROGRESSING" | "CREATING" | "UPDATING" | "DELETING" | "STARTING"
            | "STOPPING" => StateClass::InProgress,
            "FAILED" | "FAILURE" | "ERROR" => StateClass::Failed,
            _ => StateClass::Unknown,
        }
    }
}

impl ColorTheme {
    /// Get color for a resource lifecycle state
    pub fn state_color(&self, state: &str) -> TableColor {
        match StateClass::of(state) {
            StateClass::Healthy => self.success,
            StateClass::InProgress => self.warning,
            StateClass::Failed => self.error,
            StateClass::Unknown => self.muted,
        }
    }
}
