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

//! Service-independent behaviour: waiting, catalog lookup, project naming and API types

pub mod catalog;
pub mod context;
pub mod project;
pub mod resources;
pub mod wait;

pub use context::CancelToken;
pub use wait::{wait_for, PollOutcome, ResourceWait, WaitHandler, WaitSettings};
