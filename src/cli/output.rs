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

//! Structured (JSON/YAML) rendering of command results

use super::globals::OutputFormat;
use crate::shared::error::{CliError, Result};
use serde::Serialize;

/// `None` for the default format, which each command renders itself.
pub fn render<T: Serialize + ?Sized>(format: OutputFormat, value: &T) -> Result<Option<String>> {
    if format == OutputFormat::Default {
        return Ok(None);
    }
    if serde_json::to_value(value)?.is_null() {
        return Err(CliError::internal("no value to render"));
    }

    let text = match format {
        OutputFormat::Json => {
            let mut text = serde_json::to_string_pretty(value)?;
            text.push('\n');
            text
        }
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Default => return Ok(None),
    };
    Ok(Some(text))
}
