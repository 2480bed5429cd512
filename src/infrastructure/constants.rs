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

/// Program identity
pub const PROGRAM_NAME: &str = "stackit";
pub const ENV_PREFIX: &str = "STACKIT_";

/// Configuration file location
pub const CONFIG_QUALIFIER: &str = "cloud";
pub const CONFIG_ORGANIZATION: &str = "stackit";
pub const CONFIG_APPLICATION: &str = "stackit";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const ENV_CONFIG_FILE: &str = "STACKIT_CONFIG_FILE";

/// Well-known config keys
pub const KEY_PROJECT_ID: &str = "project.id";
pub const KEY_PROJECT_NAME: &str = "project.name";
pub const KEY_REGION: &str = "region";
pub const KEY_OUTPUT_FORMAT: &str = "output-format";
pub const KEY_VERBOSITY: &str = "verbosity";
pub const KEY_ASYNC: &str = "async";
pub const KEY_ASSUME_YES: &str = "assume-yes";

/// Authentication keys (all under `auth.`)
pub const AUTH_KEY_PREFIX: &str = "auth.";
pub const KEY_ACCESS_TOKEN: &str = "auth.access-token";
pub const KEY_ACCESS_TOKEN_EXPIRES_AT: &str = "auth.access-token-expires-at";
pub const KEY_REFRESH_TOKEN: &str = "auth.refresh-token";
pub const KEY_SERVICE_ACCOUNT_TOKEN: &str = "auth.service-account-token";
pub const KEY_TOKEN_ENDPOINT: &str = "auth.token-endpoint";
pub const ENV_ACCESS_TOKEN: &str = "STACKIT_ACCESS_TOKEN";

/// Per-service endpoint override: `<service>.custom-endpoint`
pub const CUSTOM_ENDPOINT_SUFFIX: &str = "custom-endpoint";

/// REST transport
pub const API_DOMAIN: &str = "api.stackit.cloud";
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://service-account.api.stackit.cloud/token";
pub const HTTP_TIMEOUT_SECONDS: u64 = 30;
pub const USER_AGENT: &str = concat!("stackit-cli/", env!("CARGO_PKG_VERSION"));

/// Async driver
pub const WAIT_INITIAL_DELAY_SECONDS: u64 = 2;
pub const WAIT_MAX_INTERVAL_SECONDS: u64 = 30;
pub const WAIT_TIMEOUT_SECONDS: u64 = 30 * 60;
pub const WAIT_MAX_TRANSIENT_FAILURES: u32 = 3;

/// Spinner
pub const SPINNER_INTERVAL_MILLIS: u64 = 100;
pub const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

/// Dispatch
pub const SUGGESTION_MAX_DISTANCE: usize = 2;

/// Replacement for secret values in logs and listings
pub const REDACTED: &str = "***";

/// Default page size for list commands
pub const DEFAULT_LIST_LIMIT: i64 = 100;
