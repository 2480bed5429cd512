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

//! Process exit codes

/// Successful termination
pub const OK: i32 = 0;

/// Invariant violation inside the CLI itself
pub const INTERNAL: i32 = 1;

/// Unknown command or flag, bad value, missing or conflicting flags
pub const USAGE: i32 = 2;

/// Configuration or authentication problem
pub const CONFIG: i32 = 3;

/// The remote API answered with a non-2xx status or could not be reached
pub const REMOTE_API: i32 = 4;

/// An asynchronous operation did not finish in time
pub const TIMEOUT: i32 = 5;

/// The user declined a confirmation prompt
pub const DECLINED: i32 = 6;

/// Interrupted by SIGINT/SIGTERM
pub const INTERRUPTED: i32 = 130;
