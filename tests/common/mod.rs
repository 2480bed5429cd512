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

//! Harness running the CLI in-process against a scripted API

#![allow(dead_code)]

use stackit_cli::cli::printer::Printer;
use stackit_cli::domain::WaitSettings;
use stackit_cli::infrastructure::auth::AuthResolver;
use stackit_cli::infrastructure::{ConfigStore, Env};
use stackit_cli::shared::testing::{SharedBuffer, StubApiClient};
use stackit_cli::{CancelToken, Runtime};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const PROJECT_ID: &str = "3b4c1e5a-1c4f-4db5-9b57-2a6d2b9e9b11";
pub const INSTANCE_ID: &str = "9f0c1c7e-2b7e-4b1a-8a55-6a1f4a1d2c33";
pub const PLAN_ID: &str = "5f2a8d3e-8a1b-4c7d-9e6f-0a1b2c3d4e5f";

pub struct Harness {
    pub dir: TempDir,
    pub stub: Arc<StubApiClient>,
    pub out: SharedBuffer,
    pub err: SharedBuffer,
    pub cancel: CancelToken,
    pub runtime: Runtime,
}

impl Harness {
    pub fn new(stub: StubApiClient) -> Self {
        Self::with_env(stub, &[])
    }

    pub fn with_env(stub: StubApiClient, env: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        let stub = Arc::new(stub);
        let (out, err) = (SharedBuffer::new(), SharedBuffer::new());
        let cancel = CancelToken::new();
        let runtime = build_runtime(&dir, env, &stub, &out, &err, &cancel);
        Self {
            dir,
            stub,
            out,
            err,
            cancel,
            runtime,
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    pub async fn run(&mut self, args: &[&str]) -> i32 {
        let argv: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        stackit_cli::run(&argv, &mut self.runtime).await
    }

    /// A fresh process against the same config file and API.
    pub fn restart(&mut self, env: &[(&str, &str)]) {
        self.out = SharedBuffer::new();
        self.err = SharedBuffer::new();
        self.runtime = build_runtime(&self.dir, env, &self.stub, &self.out, &self.err, &self.cancel);
    }

    pub fn stdout(&self) -> String {
        self.out.contents()
    }

    pub fn stderr(&self) -> String {
        self.err.contents()
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        ConfigStore::open(self.config_path(), Env::default())
            .stored_string(key)
            .unwrap()
    }
}

fn build_runtime(
    dir: &TempDir,
    env: &[(&str, &str)],
    stub: &Arc<StubApiClient>,
    out: &SharedBuffer,
    err: &SharedBuffer,
    cancel: &CancelToken,
) -> Runtime {
    let env = Env::from_pairs(env.iter().copied());
    let printer = Printer::new(
        Box::new(out.clone()),
        Box::new(err.clone()),
        Box::new(Cursor::new(Vec::new())),
    );
    let config = ConfigStore::open(dir.path().join("config.toml"), env.clone());
    let settings = WaitSettings {
        initial_delay: Duration::from_secs(1),
        max_interval: Duration::from_secs(5),
        timeout: Duration::from_secs(60),
        max_transient_failures: 3,
    };
    Runtime::new(config, printer, env, AuthResolver::http().unwrap())
        .with_client(stub.clone())
        .with_cancel(cancel.clone())
        .with_wait_settings(settings)
}
