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

//! Project lookup and the cached project name shown in messages

use crate::domain::resources::Project;
use crate::infrastructure::api::{ApiClient, ApiRequest, Request, Service};
use crate::infrastructure::config_store::ConfigStore;
use crate::infrastructure::constants::{KEY_PROJECT_ID, KEY_PROJECT_NAME};
use crate::shared::error::Result;
use std::sync::Arc;

pub fn get_project_request(client: Arc<dyn ApiClient>, project_id: &str) -> Request<Project> {
    Request::new(
        client,
        ApiRequest::get(
            Service::ResourceManager,
            format!("/v2/projects/{}", project_id),
        ),
    )
}

/// Name of `project_id`.
///
/// When the id is the one stored in the config file the name is served from
/// `project.name`, and fetched and cached there on a miss. Any other id is
/// looked up without touching the cache.
pub async fn project_name(
    config: &mut ConfigStore,
    client: Arc<dyn ApiClient>,
    project_id: &str,
) -> Result<String> {
    let from_store = config.stored_string(KEY_PROJECT_ID)?.as_deref() == Some(project_id);
    if from_store {
        if let Some(name) = config.stored_string(KEY_PROJECT_NAME)? {
            return Ok(name);
        }
    }

    let project = get_project_request(client, project_id).execute().await?;
    if from_store {
        config.set(KEY_PROJECT_NAME, project.name.as_str())?;
        config.save()?;
    }
    Ok(project.name)
}

/// Project name for messages, falling back to the id when it cannot be found.
pub async fn project_label(
    config: &mut ConfigStore,
    client: Arc<dyn ApiClient>,
    project_id: &str,
) -> String {
    match project_name(config, client, project_id).await {
        Ok(name) if !name.is_empty() => name,
        Ok(_) => project_id.to_string(),
        Err(e) => {
            tracing::debug!("get project name: {}", e);
            project_id.to_string()
        }
    }
}
