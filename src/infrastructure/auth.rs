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

//! Credential resolution
//!
//! Credentials are looked up in this order:
//! 1. `STACKIT_ACCESS_TOKEN`
//! 2. `auth.access-token` from the config store, unless expired
//! 3. `auth.service-account-token`
//! 4. Refreshing with `auth.refresh-token`
//! 5. Interactive login, only when stdin is a terminal and `--assume-yes` is absent

use crate::cli::printer::Printer;
use crate::infrastructure::config_store::ConfigStore;
use crate::infrastructure::constants::{
    AUTH_KEY_PREFIX, DEFAULT_TOKEN_ENDPOINT, ENV_ACCESS_TOKEN, HTTP_TIMEOUT_SECONDS,
    KEY_ACCESS_TOKEN, KEY_ACCESS_TOKEN_EXPIRES_AT, KEY_REFRESH_TOKEN, KEY_SERVICE_ACCOUNT_TOKEN,
    KEY_TOKEN_ENDPOINT, USER_AGENT,
};
use crate::infrastructure::environment::Env;
use crate::shared::error::{CliError, Result};
use crate::shared::secret::Secret;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    AccessToken(Secret),
    ServiceAccountToken(Secret),
}

impl Credential {
    pub fn bearer(&self) -> &str {
        match self {
            Credential::AccessToken(token) | Credential::ServiceAccountToken(token) => {
                token.expose()
            }
        }
    }
}

/// Tokens obtained from a login or a refresh.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: Secret,
    pub refresh_token: Option<Secret>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenSet {
    pub fn access_only(token: impl Into<String>) -> Self {
        Self {
            access_token: Secret::new(token),
            refresh_token: None,
            expires_at: None,
        }
    }
}

#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &Secret, endpoint: &str) -> Result<TokenSet>;
}

#[async_trait]
pub trait InteractiveLogin: Send + Sync {
    async fn login(&self, printer: &Printer) -> Result<TokenSet>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// OAuth2 `refresh_token` grant against the token endpoint.
pub struct HttpTokenRefresher {
    client: reqwest::Client,
}

impl HttpTokenRefresher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECONDS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &Secret, endpoint: &str) -> Result<TokenSet> {
        tracing::debug!("refreshing access token at {}", endpoint);

        let response = self
            .client
            .post(endpoint)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CliError::auth(format!(
                "refresh access token: status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(TokenSet {
            access_token: Secret::new(token.access_token),
            refresh_token: token.refresh_token.map(Secret::new),
            expires_at: token
                .expires_in
                .map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
        })
    }
}

/// Asks the user to paste an access token obtained from the portal.
pub struct PasteTokenLogin;

#[async_trait]
impl InteractiveLogin for PasteTokenLogin {
    async fn login(&self, printer: &Printer) -> Result<TokenSet> {
        let token = printer.prompt_line("Paste your access token: ")?;
        if token.is_empty() {
            return Err(CliError::auth("no access token entered"));
        }
        Ok(TokenSet::access_only(token))
    }
}

pub struct AuthResolver {
    refresher: Arc<dyn TokenRefresher>,
    login: Arc<dyn InteractiveLogin>,
}

impl AuthResolver {
    pub fn new(refresher: Arc<dyn TokenRefresher>, login: Arc<dyn InteractiveLogin>) -> Self {
        Self { refresher, login }
    }

    pub fn http() -> Result<Self> {
        Ok(Self::new(
            Arc::new(HttpTokenRefresher::new()?),
            Arc::new(PasteTokenLogin),
        ))
    }

    pub async fn resolve(
        &self,
        config: &mut ConfigStore,
        env: &Env,
        printer: &Printer,
        interactive: bool,
    ) -> Result<Credential> {
        if let Some(token) = env.get(ENV_ACCESS_TOKEN) {
            tracing::debug!("using access token from {}", ENV_ACCESS_TOKEN);
            return Ok(Credential::AccessToken(Secret::new(token)));
        }

        if let Some(token) = config.stored_string(KEY_ACCESS_TOKEN)? {
            if !is_expired(config.stored_string(KEY_ACCESS_TOKEN_EXPIRES_AT)?.as_deref()) {
                return Ok(Credential::AccessToken(Secret::new(token)));
            }
            tracing::debug!("stored access token has expired");
        }

        if let Some(token) = config.stored_string(KEY_SERVICE_ACCOUNT_TOKEN)? {
            return Ok(Credential::ServiceAccountToken(Secret::new(token)));
        }

        if let Some(refresh) = config.stored_string(KEY_REFRESH_TOKEN)? {
            let endpoint = config
                .get_string(KEY_TOKEN_ENDPOINT)?
                .unwrap_or_else(|| DEFAULT_TOKEN_ENDPOINT.to_string());
            match self.refresher.refresh(&Secret::new(refresh), &endpoint).await {
                Ok(tokens) => {
                    store_tokens(config, &tokens)?;
                    return Ok(Credential::AccessToken(tokens.access_token));
                }
                Err(e) => tracing::debug!("token refresh failed: {}", e),
            }
        }

        if interactive {
            return self.login(config, printer).await;
        }

        Err(CliError::auth(
            "no credentials found, run \"stackit auth login\" or \"stackit auth activate-service-account\"",
        ))
    }

    /// Runs the interactive login and persists the obtained tokens.
    pub async fn login(&self, config: &mut ConfigStore, printer: &Printer) -> Result<Credential> {
        let tokens = self.login.login(printer).await?;
        store_tokens(config, &tokens)?;
        Ok(Credential::AccessToken(tokens.access_token))
    }
}

fn is_expired(expires_at: Option<&str>) -> bool {
    let Some(raw) = expires_at else {
        return false;
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(at) => at.with_timezone(&Utc) <= Utc::now(),
        // unreadable expiry: treat the token as stale
        Err(_) => true,
    }
}

/// Writes tokens to the config store and saves it.
pub fn store_tokens(config: &mut ConfigStore, tokens: &TokenSet) -> Result<()> {
    config.set(KEY_ACCESS_TOKEN, tokens.access_token.expose())?;
    match &tokens.expires_at {
        Some(at) => config.set(KEY_ACCESS_TOKEN_EXPIRES_AT, at.to_rfc3339())?,
        None => {
            config.delete(KEY_ACCESS_TOKEN_EXPIRES_AT)?;
        }
    }
    if let Some(refresh) = &tokens.refresh_token {
        config.set(KEY_REFRESH_TOKEN, refresh.expose())?;
    }
    config.save()
}

pub fn store_service_account_token(config: &mut ConfigStore, token: &Secret) -> Result<()> {
    config.set(KEY_SERVICE_ACCOUNT_TOKEN, token.expose())?;
    config.save()
}

/// Removes every `auth.*` key. Returns whether anything was stored.
pub fn logout(config: &mut ConfigStore) -> Result<bool> {
    let keys: Vec<String> = config
        .entries()?
        .into_iter()
        .map(|(k, _)| k)
        .filter(|k| k.starts_with(AUTH_KEY_PREFIX))
        .collect();
    for key in &keys {
        config.delete(key)?;
    }
    config.save_if_dirty()?;
    Ok(!keys.is_empty())
}
