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

//! Command-line surface: command tree, flag parsing, output and the commands themselves

pub mod app;
pub mod args;
pub mod commands;
pub mod display;
pub mod flags;
pub mod globals;
pub mod help;
pub mod input;
pub mod output;
pub mod parsers;
pub mod printer;
pub mod runtime;
pub mod spinner;
pub mod tree;

pub use app::run;
pub use printer::Printer;
pub use runtime::{Invocation, Runtime};
