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

use crate::infrastructure::api::request::{ApiRequest, ApiResponse, Method, Service};
use crate::infrastructure::auth::Credential;
use crate::infrastructure::constants::{API_DOMAIN, HTTP_TIMEOUT_SECONDS, USER_AGENT};
use crate::shared::error::{CliError, Result};
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;

#[async_trait::async_trait]
pub trait ApiClient: Send + Sync {
    /// Performs one REST call. Non-2xx statuses come back as `CliError::RemoteApi`.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

pub struct HttpApiClient {
    client: Client,
    credential: Credential,
    endpoints: BTreeMap<Service, String>,
}

impl HttpApiClient {
    pub fn new(credential: Credential) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECONDS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            credential,
            endpoints: BTreeMap::new(),
        })
    }

    pub fn with_endpoint(mut self, service: Service, base_url: impl Into<String>) -> Self {
        self.endpoints
            .insert(service, base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn base_url(&self, service: Service) -> String {
        self.endpoints
            .get(&service)
            .cloned()
            .unwrap_or_else(|| format!("https://{}.{}", service.as_str(), API_DOMAIN))
    }
}

#[async_trait::async_trait]
impl ApiClient for HttpApiClient {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url(request.service), request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        tracing::debug!("{} {}", request.method.as_str(), url);

        let mut builder = self
            .client
            .request(method, &url)
            .bearer_auth(self.credential.bearer());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = response.text().await?;

        tracing::debug!("{} {} -> {}", request.method.as_str(), url, status.as_u16());

        if !status.is_success() {
            return Err(match retry_after {
                Some(delay) => CliError::throttled(status.as_u16(), text, delay),
                None => CliError::remote_api(status.as_u16(), text),
            });
        }

        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
        };

        Ok(ApiResponse {
            status: status.as_u16(),
            body,
            retry_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::secret::Secret;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpApiClient {
        HttpApiClient::new(Credential::AccessToken(Secret::new("tok")))
            .expect("client creation")
            .with_endpoint(Service::PostgresFlex, server.uri())
    }

    #[tokio::test]
    async fn test_get_with_bearer_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/projects/p/instances"))
            .and(query_param("limit", "5"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&server)
            .await;

        let request = ApiRequest::get(Service::PostgresFlex, "/v2/projects/p/instances")
            .with_query("limit", 5);
        let response = client_for(&server).send(&request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, json!({"items": []}));
    }

    #[tokio::test]
    async fn test_post_body_and_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/projects/p/instances"))
            .and(body_json(json!({"name": "n1"})))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("Retry-After", "7")
                    .set_body_json(json!({"id": "X"})),
            )
            .mount(&server)
            .await;

        let request = ApiRequest::new(Service::PostgresFlex, Method::Post, "/v2/projects/p/instances")
            .with_body(json!({"name": "n1"}));
        let response = client_for(&server).send(&request).await.unwrap();
        assert_eq!(response.body["id"], "X");
        assert_eq!(response.retry_after, Some(Duration::from_secs(7)));
    }

    #[tokio::test]
    async fn test_non_success_is_remote_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("instance not found"))
            .mount(&server)
            .await;

        let request = ApiRequest::get(Service::PostgresFlex, "/v2/projects/p/instances/x");
        let err = client_for(&server).send(&request).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("instance not found"));
    }

    #[tokio::test]
    async fn test_throttled_status_keeps_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("Retry-After", "7")
                    .set_body_string("too many requests"),
            )
            .mount(&server)
            .await;

        let request = ApiRequest::get(Service::PostgresFlex, "/v2/projects/p/instances/x");
        let err = client_for(&server).send(&request).await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let request = ApiRequest::delete(Service::PostgresFlex, "/v2/projects/p/instances/x");
        let response = client_for(&server).send(&request).await.unwrap();
        assert_eq!(response.body, serde_json::Value::Null);
    }

    #[test]
    fn test_default_base_url() {
        let client = HttpApiClient::new(Credential::AccessToken(Secret::new("t"))).unwrap();
        assert_eq!(
            client.base_url(Service::Iaas),
            "https://iaas.api.stackit.cloud"
        );
    }
}
