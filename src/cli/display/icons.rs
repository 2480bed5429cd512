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

//! Status icons for CLI output

use super::colors::StateClass;

/// Status icons for different states
pub struct StatusIcon;

impl StatusIcon {
    /// Success icon (resource ready, operation finished)
    pub const SUCCESS: &'static str = "✓";

    /// Warning icon (operation in progress)
    pub const WARNING: &'static str = "⚠";

    /// Error icon (resource or operation failed)
    pub const ERROR: &'static str = "✗";

    /// Unknown icon
    pub const UNKNOWN: &'static str = "?";

    /// Get status icon for a lifecycle state
    pub fn for_state(state: &str) -> &'static str {
        match StateClass::of(state) {
            StateClass::Healthy => Self::SUCCESS,
            StateClass::InProgress => Self::WARNING,
            StateClass::Failed => Self::ERROR,
            StateClass::Unknown => Self::UNKNOWN,
        }
    }
}
