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

use crate::infrastructure::api::client::ApiClient;
use crate::infrastructure::constants::CUSTOM_ENDPOINT_SUFFIX;
use crate::shared::error::{CliError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Remote services the CLI talks to. Each has its own base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Service {
    ResourceManager,
    PostgresFlex,
    Iaas,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::ResourceManager => "resource-manager",
            Service::PostgresFlex => "postgres-flex",
            Service::Iaas => "iaas",
        }
    }

    pub fn all() -> [Service; 3] {
        [Service::ResourceManager, Service::PostgresFlex, Service::Iaas]
    }

    /// Config key holding the base URL override, e.g. `iaas.custom-endpoint`.
    pub fn custom_endpoint_key(&self) -> String {
        format!("{}.{}", self.as_str(), CUSTOM_ENDPOINT_SUFFIX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// Plain description of one REST call. Building one performs no I/O.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiRequest {
    pub service: Service,
    pub method: Method,
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(service: Service, method: Method, path: impl Into<String>) -> Self {
        Self {
            service,
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(service: Service, path: impl Into<String>) -> Self {
        Self::new(service, Method::Get, path)
    }

    pub fn delete(service: Service, path: impl Into<String>) -> Self {
        Self::new(service, Method::Delete, path)
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
    /// Server-provided hint from a `Retry-After` header.
    pub retry_after: Option<Duration>,
}

impl ApiResponse {
    pub fn ok(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            body,
            retry_after: None,
        }
    }
}

/// A request bound to a client. Only [`execute`](Request::execute) does I/O.
pub struct Request<T> {
    client: Arc<dyn ApiClient>,
    api: ApiRequest,
    _response: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Request<T> {
    pub fn new(client: Arc<dyn ApiClient>, api: ApiRequest) -> Self {
        Self {
            client,
            api,
            _response: PhantomData,
        }
    }

    pub fn api(&self) -> &ApiRequest {
        &self.api
    }

    pub async fn execute(&self) -> Result<T> {
        let response = self.client.send(&self.api).await?;
        decode(response.body).map_err(|e| {
            e.context(format!(
                "decode response of {} {}",
                self.api.method.as_str(),
                self.api.path
            ))
        })
    }
}

pub fn decode<T: DeserializeOwned>(body: serde_json::Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| CliError::internal(e.to_string()))
}
