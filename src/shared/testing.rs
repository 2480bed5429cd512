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

//! Test doubles shared by unit and integration tests

use crate::infrastructure::api::{ApiClient, ApiRequest, ApiResponse, Method};
use crate::shared::error::{CliError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// In-memory sink that can be handed to a `Printer` and inspected afterwards.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&lock(&self.0)).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.0).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone)]
enum Reply {
    Ok(ApiResponse),
    Status(u16, String, Option<Duration>),
}

struct Route {
    method: Method,
    path_suffix: String,
    replies: VecDeque<Reply>,
}

/// Scripted [`ApiClient`]. Replies registered for the same route are handed
/// out in order; the last one repeats.
#[derive(Default)]
pub struct StubApiClient {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl StubApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, method: Method, path_suffix: &str, body: serde_json::Value) -> Self {
        self.push(method, path_suffix, Reply::Ok(ApiResponse::ok(body)))
    }

    pub fn on_response(self, method: Method, path_suffix: &str, response: ApiResponse) -> Self {
        self.push(method, path_suffix, Reply::Ok(response))
    }

    pub fn on_status(self, method: Method, path_suffix: &str, status: u16, body: &str) -> Self {
        self.push(method, path_suffix, Reply::Status(status, body.to_string(), None))
    }

    /// Error status carrying a `Retry-After` hint.
    pub fn on_throttled(self, method: Method, path_suffix: &str, status: u16, secs: u64) -> Self {
        let reply = Reply::Status(status, "slow down".to_string(), Some(Duration::from_secs(secs)));
        self.push(method, path_suffix, reply)
    }

    fn push(self, method: Method, path_suffix: &str, reply: Reply) -> Self {
        {
            let mut routes = lock(&self.routes);
            match routes
                .iter_mut()
                .find(|r| r.method == method && r.path_suffix == path_suffix)
            {
                Some(route) => route.replies.push_back(reply),
                None => routes.push(Route {
                    method,
                    path_suffix: path_suffix.to_string(),
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.requests).clone()
    }

    pub fn count(&self, method: Method, path_suffix: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| r.method == method && r.path.ends_with(path_suffix))
            .count()
    }
}

#[async_trait]
impl ApiClient for StubApiClient {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        lock(&self.requests).push(request.clone());

        let reply = {
            let mut routes = lock(&self.routes);
            let route = routes
                .iter_mut()
                .find(|r| r.method == request.method && request.path.ends_with(&r.path_suffix))
                .ok_or_else(|| {
                    CliError::internal(format!(
                        "no stub for {} {}",
                        request.method.as_str(),
                        request.path
                    ))
                })?;
            if route.replies.len() > 1 {
                route.replies.pop_front()
            } else {
                route.replies.front().cloned()
            }
        };

        match reply {
            Some(Reply::Ok(response)) => Ok(response),
            Some(Reply::Status(status, body, None)) => Err(CliError::remote_api(status, body)),
            Some(Reply::Status(status, body, Some(delay))) => {
                Err(CliError::throttled(status, body, delay))
            }
            None => Err(CliError::internal("stub route without replies")),
        }
    }
}
