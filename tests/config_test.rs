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

//! Configuration precedence and persistence across invocations

mod common;

use common::{Harness, PROJECT_ID};
use serde_json::json;
use stackit_cli::infrastructure::api::Method;
use stackit_cli::infrastructure::{ConfigStore, Env};
use stackit_cli::shared::testing::StubApiClient;
use std::io::Write;

const OTHER_PROJECT_ID: &str = "00000000-0000-4000-8000-000000000000";

fn list_stub() -> StubApiClient {
    StubApiClient::new()
        .on(
            Method::Get,
            &format!("/v2/projects/{}", PROJECT_ID),
            json!({"projectId": PROJECT_ID, "name": "demo"}),
        )
        .on(
            Method::Get,
            &format!("/v2/projects/{}", OTHER_PROJECT_ID),
            json!({"projectId": OTHER_PROJECT_ID, "name": "other"}),
        )
        .on(Method::Get, "/instances", json!({"items": []}))
}

fn listed_region(h: &Harness) -> String {
    let request = h
        .stub
        .requests()
        .into_iter()
        .rev()
        .find(|r| r.path.ends_with("/instances"))
        .unwrap();
    request.path.split('/').nth(5).unwrap().to_string()
}

#[tokio::test]
async fn test_region_precedence() {
    let mut h = Harness::new(list_stub());
    let list = ["postgresql", "instance", "list", "--project-id", PROJECT_ID];

    assert_eq!(h.run(&list).await, 0, "{}", h.stderr());
    assert_eq!(listed_region(&h), "eu01");

    let mut store = ConfigStore::open(h.config_path(), Env::default());
    store.set("region", "eu02").unwrap();
    store.save().unwrap();
    h.restart(&[]);
    assert_eq!(h.run(&list).await, 0);
    assert_eq!(listed_region(&h), "eu02");

    h.restart(&[("STACKIT_REGION", "eu03")]);
    assert_eq!(h.run(&list).await, 0);
    assert_eq!(listed_region(&h), "eu03");

    let mut with_flag = list.to_vec();
    with_flag.extend(["--region", "eu04"]);
    assert_eq!(h.run(&with_flag).await, 0);
    assert_eq!(listed_region(&h), "eu04");

    // Command-line values are not written back.
    assert_eq!(h.stored("region").as_deref(), Some("eu02"));
}

#[tokio::test]
async fn test_invalid_environment_value_names_the_variable() {
    let mut h = Harness::with_env(list_stub(), &[("STACKIT_OUTPUT_FORMAT", "xml")]);
    let code = h
        .run(&["postgresql", "instance", "list", "--project-id", PROJECT_ID])
        .await;

    assert_eq!(code, 2);
    assert!(h.stderr().contains("STACKIT_OUTPUT_FORMAT"), "{}", h.stderr());
    assert!(h.stub.requests().is_empty());
}

#[tokio::test]
async fn test_config_set_and_unset_persist() {
    let mut h = Harness::new(StubApiClient::new());

    let code = h
        .run(&["config", "set", "--project-id", PROJECT_ID, "--region", "eu02"])
        .await;
    assert_eq!(code, 0, "{}", h.stderr());
    assert_eq!(h.stored("project.id").as_deref(), Some(PROJECT_ID));
    assert_eq!(h.stored("region").as_deref(), Some("eu02"));

    h.restart(&[]);
    assert_eq!(h.run(&["config", "unset", "region"]).await, 0);
    assert_eq!(h.stored("region"), None);
    assert_eq!(h.stored("project.id").as_deref(), Some(PROJECT_ID));

    h.restart(&[]);
    assert_eq!(h.run(&["config", "set"]).await, 2);
    assert!(h.stderr().contains("at least one configuration flag"));
}

#[tokio::test]
async fn test_project_name_is_cached_and_invalidated() {
    let mut h = Harness::new(list_stub());
    let project_path = format!("/v2/projects/{}", PROJECT_ID);

    assert_eq!(h.run(&["config", "set", "--project-id", PROJECT_ID]).await, 0);

    for _ in 0..2 {
        h.restart(&[]);
        assert_eq!(h.run(&["postgresql", "instance", "list"]).await, 0);
        assert!(h.stderr().contains("No instances found for project \"demo\""));
    }
    assert_eq!(h.stub.count(Method::Get, &project_path), 1);
    assert_eq!(h.stored("project.name").as_deref(), Some("demo"));

    // Another project given on the command line is looked up but not cached.
    h.restart(&[]);
    let code = h
        .run(&["postgresql", "instance", "list", "--project-id", OTHER_PROJECT_ID])
        .await;
    assert_eq!(code, 0);
    assert!(h.stderr().contains("\"other\""));
    assert_eq!(h.stored("project.name").as_deref(), Some("demo"));

    h.restart(&[]);
    assert_eq!(h.run(&["config", "set", "--project-id", OTHER_PROJECT_ID]).await, 0);
    assert_eq!(h.stored("project.name"), None);
}

#[tokio::test]
async fn test_service_account_token_is_never_listed() {
    let mut h = Harness::new(StubApiClient::new());
    let token_file = h.dir.path().join("token.txt");
    let mut file = std::fs::File::create(&token_file).unwrap();
    writeln!(file, "sa-secret-token").unwrap();

    let from_file = format!("@{}", token_file.display());
    let code = h
        .run(&["auth", "activate-service-account", "--service-account-token", &from_file])
        .await;
    assert_eq!(code, 0, "{}", h.stderr());
    assert_eq!(
        h.stored("auth.service-account-token").as_deref(),
        Some("sa-secret-token")
    );

    h.restart(&[]);
    assert_eq!(h.run(&["config", "list"]).await, 0);
    assert!(h.stdout().contains("auth.service-account-token"));
    assert!(h.stdout().contains("***"));
    assert!(!h.stdout().contains("sa-secret-token"));

    h.restart(&[]);
    assert_eq!(h.run(&["auth", "logout"]).await, 0);
    assert!(h.stdout().contains("Successfully logged out"));
    assert_eq!(h.stored("auth.service-account-token"), None);
}
