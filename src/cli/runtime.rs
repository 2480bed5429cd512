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

//! Process-wide state shared by every command, and the per-call view of it

use super::flags::ParsedFlags;
use super::globals::GlobalFlagModel;
use super::printer::Printer;
use crate::domain::context::CancelToken;
use crate::domain::project;
use crate::domain::wait::{wait_for, WaitHandler, WaitSettings};
use crate::infrastructure::api::{ApiClient, HttpApiClient, Service};
use crate::infrastructure::auth::AuthResolver;
use crate::infrastructure::config_store::ConfigStore;
use crate::infrastructure::environment::Env;
use crate::shared::error::{CliError, Result};
use serde::Serialize;
use std::sync::Arc;

pub struct Runtime {
    pub config: ConfigStore,
    pub printer: Printer,
    pub env: Env,
    pub cancel: CancelToken,
    pub auth: AuthResolver,
    client: Option<Arc<dyn ApiClient>>,
    wait: WaitSettings,
}

impl Runtime {
    pub fn new(config: ConfigStore, printer: Printer, env: Env, auth: AuthResolver) -> Self {
        Self {
            config,
            printer,
            env,
            cancel: CancelToken::new(),
            auth,
            client: None,
            wait: WaitSettings::default(),
        }
    }

    /// Real stdio, process environment and the config file at its default location.
    pub fn from_process(cancel: CancelToken) -> Result<Self> {
        let env = Env::from_process();
        let path = ConfigStore::default_path(&env)?;
        let config = ConfigStore::open(path, env.clone());
        Ok(Self::new(config, Printer::stdio(), env, AuthResolver::http()?).with_cancel(cancel))
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Uses `client` instead of authenticating and building an HTTP client.
    pub fn with_client(mut self, client: Arc<dyn ApiClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_wait_settings(mut self, settings: WaitSettings) -> Self {
        self.wait = settings;
        self
    }

    pub fn wait_settings(&self) -> WaitSettings {
        self.wait
    }

    /// The REST client for this process, created on first use.
    ///
    /// Credentials are resolved lazily so that commands which never reach a
    /// remote API (config, help) work without being logged in.
    pub async fn api_client(&mut self, global: &GlobalFlagModel) -> Result<Arc<dyn ApiClient>> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }

        let interactive = self.printer.stdin_is_terminal() && !global.assume_yes;
        let credential = self
            .auth
            .resolve(&mut self.config, &self.env, &self.printer, interactive)
            .await?;

        let mut client = HttpApiClient::new(credential)?;
        for service in Service::all() {
            if let Some(url) = self.config.get_string(&service.custom_endpoint_key())? {
                tracing::debug!("using custom endpoint {} for {}", url, service.as_str());
                client = client.with_endpoint(service, url);
            }
        }

        let client: Arc<dyn ApiClient> = Arc::new(client);
        self.client = Some(client.clone());
        Ok(client)
    }
}

/// Everything a leaf action sees for one run.
pub struct Invocation<'a> {
    pub runtime: &'a mut Runtime,
    /// e.g. `stackit postgresql instance create`
    pub command_path: String,
    pub args: Vec<String>,
    pub flags: ParsedFlags,
    pub global: GlobalFlagModel,
}

impl Invocation<'_> {
    pub fn printer(&self) -> &Printer {
        &self.runtime.printer
    }

    pub fn config(&mut self) -> &mut ConfigStore {
        &mut self.runtime.config
    }

    pub async fn client(&mut self) -> Result<Arc<dyn ApiClient>> {
        self.runtime.api_client(&self.global).await
    }

    /// Error for a violated input rule; help of this command is shown with it.
    pub fn invariant(&self, message: impl Into<String>) -> CliError {
        CliError::invariant(self.command_path.clone(), message)
    }

    pub fn project_id(&self) -> Result<String> {
        self.global.require_project_id().map(str::to_string)
    }

    pub fn region(&self) -> Result<String> {
        self.global.require_region().map(str::to_string)
    }

    /// Project name for messages, or the id when the name cannot be fetched.
    pub async fn project_label(&mut self, client: Arc<dyn ApiClient>, project_id: &str) -> String {
        project::project_label(&mut self.runtime.config, client, project_id).await
    }

    pub async fn wait<H: WaitHandler>(&self, handler: &mut H, message: &str) -> Result<H::Output> {
        wait_for(
            handler,
            self.runtime.wait,
            &self.runtime.cancel,
            &self.runtime.printer,
            message,
        )
        .await
    }

    /// JSON/YAML when requested, otherwise whatever `fallback` prints.
    pub fn output_result<T, F>(&self, value: &T, fallback: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&Printer) -> Result<()>,
    {
        self.runtime
            .printer
            .output_result(self.global.output_format, value, fallback)
    }

    /// Asks before destructive operations; `--assume-yes` skips the prompt.
    pub fn confirm(&self, prompt: &str) -> Result<()> {
        self.runtime.printer.prompt_for_confirmation(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::api::Method;
    use crate::infrastructure::auth::{InteractiveLogin, TokenRefresher, TokenSet};
    use crate::shared::error::ErrorKind;
    use crate::shared::secret::Secret;
    use crate::shared::testing::{SharedBuffer, StubApiClient};
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;

    struct NoRefresh;

    #[async_trait]
    impl TokenRefresher for NoRefresh {
        async fn refresh(&self, _token: &Secret, _endpoint: &str) -> Result<TokenSet> {
            Err(CliError::auth("refresh disabled"))
        }
    }

    struct NoLogin;

    #[async_trait]
    impl InteractiveLogin for NoLogin {
        async fn login(&self, _printer: &Printer) -> Result<TokenSet> {
            Err(CliError::auth("login disabled"))
        }
    }

    fn runtime(dir: &TempDir, env: Env) -> Runtime {
        let printer = Printer::new(
            Box::new(SharedBuffer::new()),
            Box::new(SharedBuffer::new()),
            Box::new(std::io::Cursor::new(Vec::new())),
        );
        let config = ConfigStore::open(dir.path().join("config.toml"), env.clone());
        Runtime::new(
            config,
            printer,
            env,
            AuthResolver::new(Arc::new(NoRefresh), Arc::new(NoLogin)),
        )
    }

    #[tokio::test]
    async fn test_api_client_requires_credentials() {
        let dir = TempDir::new().unwrap();
        let mut rt = runtime(&dir, Env::default());
        let err = rt
            .api_client(&GlobalFlagModel::default())
            .await
            .err()
            .expect("no credentials");
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[tokio::test]
    async fn test_api_client_is_created_once() {
        let dir = TempDir::new().unwrap();
        let mut rt = runtime(&dir, Env::from_pairs([("STACKIT_ACCESS_TOKEN", "t")]));
        let a = rt.api_client(&GlobalFlagModel::default()).await.unwrap();
        let b = rt.api_client(&GlobalFlagModel::default()).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_injected_client_skips_auth() {
        let dir = TempDir::new().unwrap();
        let stub = Arc::new(StubApiClient::new().on(Method::Get, "/x", json!({})));
        let mut rt = runtime(&dir, Env::default()).with_client(stub);
        assert!(rt.api_client(&GlobalFlagModel::default()).await.is_ok());
    }
}
