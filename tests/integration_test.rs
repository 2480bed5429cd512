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

//! End-to-end runs of `stackit` commands against a scripted API

mod common;

use common::{Harness, INSTANCE_ID, PLAN_ID, PROJECT_ID};
use serde_json::{json, Value};
use stackit_cli::infrastructure::api::Method;
use stackit_cli::shared::testing::StubApiClient;

fn instance_path() -> String {
    format!("/instances/{}", INSTANCE_ID)
}

fn instance(status: &str) -> Value {
    json!({"id": INSTANCE_ID, "name": "db", "status": status})
}

fn create_stub() -> StubApiClient {
    StubApiClient::new()
        .on(
            Method::Get,
            &format!("/v2/projects/{}", PROJECT_ID),
            json!({"projectId": PROJECT_ID, "name": "demo"}),
        )
        .on(
            Method::Get,
            "/plans",
            json!({"plans": [
                {"id": "00000000-0000-4000-8000-000000000001", "name": "Small", "cpu": 1, "memory": 4},
                {"id": PLAN_ID, "name": "Gold", "cpu": 4, "memory": 16}
            ]}),
        )
        .on(Method::Post, "/instances", json!({"id": INSTANCE_ID}))
}

#[tokio::test]
async fn test_invalid_uuid_is_rejected_before_any_request() {
    let mut h = Harness::new(create_stub());
    let code = h
        .run(&[
            "postgresql", "instance", "create",
            "--project-id", PROJECT_ID,
            "--name", "db",
            "--plan-id", "not-a-uuid",
        ])
        .await;

    assert_eq!(code, 2);
    let stderr = h.stderr();
    assert!(stderr.contains("\"--plan-id\""), "{}", stderr);
    assert!(stderr.contains("UUID"), "{}", stderr);
    assert!(h.stub.requests().is_empty());
    assert!(h.stdout().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_create_by_plan_name_waits_until_ready() {
    let stub = create_stub()
        .on(Method::Get, &instance_path(), instance("PENDING"))
        .on(Method::Get, &instance_path(), instance("PENDING"))
        .on(Method::Get, &instance_path(), instance("READY"));
    let mut h = Harness::new(stub);

    let code = h
        .run(&[
            "postgresql", "instance", "create",
            "--project-id", PROJECT_ID,
            "--name", "db",
            "--plan-name", "gold",
            "--acl", "10.0.0.0/8,192.168.0.0/16",
        ])
        .await;

    assert_eq!(code, 0, "{}", h.stderr());
    assert_eq!(
        h.stdout(),
        format!("Created instance for project \"demo\". Instance ID: {}\n", INSTANCE_ID)
    );
    assert_eq!(h.stub.count(Method::Get, &instance_path()), 3);

    let post = h
        .stub
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Post)
        .unwrap();
    assert_eq!(
        post.path,
        format!("/v2/projects/{}/regions/eu01/instances", PROJECT_ID)
    );
    let body = post.body.unwrap();
    assert_eq!(body["planId"], json!(PLAN_ID));
    assert_eq!(body["acl"], json!({"items": ["10.0.0.0/8", "192.168.0.0/16"]}));
    assert_eq!(body["storage"], json!({"class": "premium-perf2-stackit", "size": 10}));
}

#[tokio::test(start_paused = true)]
async fn test_create_uses_stored_project_id() {
    let stub = create_stub().on(Method::Get, &instance_path(), instance("READY"));
    let mut h = Harness::new(stub);
    assert_eq!(h.run(&["config", "set", "--project-id", PROJECT_ID]).await, 0);

    h.restart(&[]);
    let code = h
        .run(&[
            "postgresql", "instance", "create",
            "--name", "db",
            "--plan-name", "Gold",
        ])
        .await;

    assert_eq!(code, 0, "{}", h.stderr());
    assert_eq!(
        h.stdout(),
        format!("Created instance for project \"demo\". Instance ID: {}\n", INSTANCE_ID)
    );
    let post = h
        .stub
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Post)
        .unwrap();
    assert_eq!(
        post.path,
        format!("/v2/projects/{}/regions/eu01/instances", PROJECT_ID)
    );
    assert_eq!(h.stored("project.name").as_deref(), Some("demo"));
}

#[tokio::test(start_paused = true)]
async fn test_throttled_poll_honours_retry_after() {
    let stub = create_stub()
        .on_throttled(Method::Get, &instance_path(), 429, 7)
        .on(Method::Get, &instance_path(), instance("READY"));
    let mut h = Harness::new(stub);

    let started = tokio::time::Instant::now();
    let code = h
        .run(&[
            "postgresql", "instance", "create",
            "--project-id", PROJECT_ID,
            "--name", "db",
            "--plan-id", PLAN_ID,
        ])
        .await;

    assert_eq!(code, 0, "{}", h.stderr());
    assert_eq!(h.stub.count(Method::Get, &instance_path()), 2);
    let elapsed = started.elapsed();
    assert!(elapsed >= std::time::Duration::from_secs(7), "{:?}", elapsed);
    assert!(elapsed < std::time::Duration::from_secs(8), "{:?}", elapsed);
}

#[tokio::test]
async fn test_async_create_does_not_poll() {
    let mut h = Harness::new(create_stub());
    let code = h
        .run(&[
            "postgresql", "instance", "create",
            "--project-id", PROJECT_ID,
            "--name", "db",
            "--plan-id", PLAN_ID,
            "--async",
        ])
        .await;

    assert_eq!(code, 0, "{}", h.stderr());
    assert!(h.stdout().starts_with("Triggered creation of instance for project \"demo\""));
    assert_eq!(h.stub.count(Method::Get, &instance_path()), 0);
    assert_eq!(h.stub.count(Method::Get, "/plans"), 0);
}

#[tokio::test]
async fn test_update_without_changes_is_an_input_error() {
    let mut h = Harness::new(StubApiClient::new());
    let code = h
        .run(&[
            "postgresql", "instance", "update", INSTANCE_ID,
            "--project-id", PROJECT_ID,
        ])
        .await;

    assert_eq!(code, 2);
    assert!(h.stderr().contains("nothing to update"));
    assert!(h.stub.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_wait_times_out_with_last_state() {
    let stub = create_stub().on(Method::Get, &instance_path(), instance("PROGRESSING"));
    let mut h = Harness::new(stub);

    let code = h
        .run(&[
            "postgresql", "instance", "create",
            "--project-id", PROJECT_ID,
            "--name", "db",
            "--plan-id", PLAN_ID,
        ])
        .await;

    assert_eq!(code, 5);
    let stderr = h.stderr();
    assert!(stderr.contains("timeout"), "{}", stderr);
    assert!(stderr.contains("PROGRESSING"), "{}", stderr);
    assert!(h.stdout().is_empty());
}

#[tokio::test]
async fn test_json_output_is_a_single_document() {
    let stub = StubApiClient::new().on(
        Method::Get,
        &instance_path(),
        json!({
            "id": INSTANCE_ID,
            "name": "db",
            "status": "READY",
            "acl": {"items": ["10.0.0.0/8"]},
            "storage": {"class": "premium-perf2-stackit", "size": 10}
        }),
    );
    let mut h = Harness::new(stub);

    let code = h
        .run(&[
            "postgresql", "instance", "describe", INSTANCE_ID,
            "--project-id", PROJECT_ID,
            "--output-format", "json",
        ])
        .await;

    assert_eq!(code, 0, "{}", h.stderr());
    let stdout = h.stdout();
    assert!(stdout.ends_with("}\n") && !stdout.ends_with("\n\n"));
    let parsed: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["id"], json!(INSTANCE_ID));
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_during_wait_exits_130() {
    let stub = create_stub().on(Method::Get, &instance_path(), instance("PROGRESSING"));
    let mut h = Harness::new(stub);

    let cancel = h.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        cancel.cancel();
    });

    let code = h
        .run(&[
            "postgresql", "instance", "create",
            "--project-id", PROJECT_ID,
            "--name", "db",
            "--plan-id", PLAN_ID,
        ])
        .await;
    assert_eq!(code, 130);
}

#[tokio::test]
async fn test_delete_without_terminal_is_declined() {
    let stub = StubApiClient::new().on(Method::Get, &instance_path(), instance("READY"));
    let mut h = Harness::new(stub);

    let code = h
        .run(&[
            "postgresql", "instance", "delete", INSTANCE_ID,
            "--project-id", PROJECT_ID,
        ])
        .await;

    assert_eq!(code, 6);
    assert_eq!(h.stub.count(Method::Delete, &instance_path()), 0);
}

#[tokio::test(start_paused = true)]
async fn test_delete_waits_until_gone() {
    let stub = StubApiClient::new()
        .on(Method::Get, &instance_path(), instance("READY"))
        .on(Method::Get, &instance_path(), instance("DELETING"))
        .on_status(Method::Get, &instance_path(), 404, "not found")
        .on(Method::Delete, &instance_path(), json!({}));
    let mut h = Harness::new(stub);

    let code = h
        .run(&[
            "postgresql", "instance", "delete", INSTANCE_ID,
            "--project-id", PROJECT_ID,
            "-y",
        ])
        .await;

    assert_eq!(code, 0, "{}", h.stderr());
    assert!(h.stderr().contains("Deleted instance \"db\""));
    assert!(h.stdout().is_empty());
}

#[tokio::test]
async fn test_missing_project_id_hint() {
    let mut h = Harness::new(StubApiClient::new());
    let code = h.run(&["postgresql", "instance", "list"]).await;

    assert_eq!(code, 2);
    assert!(h.stderr().contains("stackit config set --project-id xxx"));
    assert!(h.stub.requests().is_empty());
}

#[tokio::test]
async fn test_unknown_command_suggests_closest() {
    let mut h = Harness::new(StubApiClient::new());
    let code = h.run(&["postgresql", "instnce", "list"]).await;

    assert_eq!(code, 2);
    assert!(h.stderr().contains("instance"), "{}", h.stderr());
}

#[tokio::test]
async fn test_group_prints_help_to_stdout() {
    let mut h = Harness::new(StubApiClient::new());
    let code = h.run(&["postgresql"]).await;

    assert_eq!(code, 0);
    let stdout = h.stdout();
    assert!(stdout.contains("instance"));
    assert!(stdout.contains("plans"));
}

#[tokio::test(start_paused = true)]
async fn test_network_create_with_nested_address_family() {
    let network_id = "7d4e2f10-3a2b-4c5d-8e9f-a0b1c2d3e4f5";
    let stub = StubApiClient::new()
        .on(
            Method::Get,
            &format!("/v2/projects/{}", PROJECT_ID),
            json!({"projectId": PROJECT_ID, "name": "demo"}),
        )
        .on(Method::Post, "/networks", json!({"networkId": network_id}))
        .on(
            Method::Get,
            &format!("/networks/{}", network_id),
            json!({"networkId": network_id, "name": "net", "state": "CREATED"}),
        );
    let mut h = Harness::new(stub);

    let code = h
        .run(&[
            "network", "create",
            "--project-id", PROJECT_ID,
            "--name", "net",
            "--ipv4-prefix", "10.1.2.0/24",
            "--ipv4-nameservers", "1.1.1.1",
            "--ipv4-nameservers", "8.8.8.8",
        ])
        .await;

    assert_eq!(code, 0, "{}", h.stderr());
    assert!(h.stdout().contains(network_id));
    let post = h
        .stub
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Post)
        .unwrap();
    assert_eq!(
        post.body.unwrap()["addressFamily"],
        json!({"ipv4": {"prefix": "10.1.2.0/24", "nameservers": ["1.1.1.1", "8.8.8.8"]}})
    );
}

#[tokio::test]
async fn test_server_create_rejects_machine_type_with_cpu() {
    let mut h = Harness::new(StubApiClient::new());
    let code = h
        .run(&[
            "server", "create",
            "--project-id", PROJECT_ID,
            "--name", "vm",
            "--image-id", PLAN_ID,
            "--machine-type", "c1.2",
            "--cpu", "2",
        ])
        .await;

    assert_eq!(code, 2);
    assert!(h.stderr().contains("[machine-type cpu]"), "{}", h.stderr());
    assert!(h.stub.requests().is_empty());
}

#[tokio::test]
async fn test_server_create_rejects_ram_with_machine_type() {
    let mut h = Harness::new(StubApiClient::new());
    let code = h
        .run(&[
            "server", "create",
            "--project-id", PROJECT_ID,
            "--name", "vm",
            "--image-id", PLAN_ID,
            "--machine-type", "c1.2",
            "--ram", "4",
        ])
        .await;

    assert_eq!(code, 2);
    assert!(h.stderr().contains("--ram can only be set together with --cpu"), "{}", h.stderr());
    assert!(h.stub.requests().is_empty());
}

#[tokio::test]
async fn test_server_create_ignores_leaf_flag_variables() {
    let stub = StubApiClient::new()
        .on(
            Method::Get,
            &format!("/v2/projects/{}", PROJECT_ID),
            json!({"projectId": PROJECT_ID, "name": "demo"}),
        )
        .on(
            Method::Get,
            "/machine-types",
            json!({"items": [{"name": "c1.2", "vcpus": 2, "ram": 4096}]}),
        )
        .on(Method::Post, "/servers", json!({"id": INSTANCE_ID}));
    let mut h = Harness::with_env(stub, &[("STACKIT_CPU", "2"), ("STACKIT_RAM", "4")]);

    let code = h
        .run(&[
            "server", "create",
            "--project-id", PROJECT_ID,
            "--name", "vm",
            "--image-id", PLAN_ID,
            "--machine-type", "c1.2",
            "--async",
        ])
        .await;

    assert_eq!(code, 0, "{}", h.stderr());
    let post = h
        .stub
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Post)
        .unwrap();
    assert_eq!(post.body.unwrap()["machineType"], json!("c1.2"));
}

#[tokio::test]
async fn test_server_create_unknown_size_is_a_config_error() {
    let stub = StubApiClient::new()
        .on(
            Method::Get,
            &format!("/v2/projects/{}", PROJECT_ID),
            json!({"projectId": PROJECT_ID, "name": "demo"}),
        )
        .on(
            Method::Get,
            "/machine-types",
            json!({"items": [{"name": "c1.2", "vcpus": 2, "ram": 4096}]}),
        );
    let mut h = Harness::new(stub);

    let code = h
        .run(&[
            "server", "create",
            "--project-id", PROJECT_ID,
            "--name", "vm",
            "--image-id", PLAN_ID,
            "--cpu", "16",
            "--ram", "64",
        ])
        .await;

    assert_eq!(code, 3);
    assert!(h.stderr().contains("c1.2 (2 vCPU"), "{}", h.stderr());
    assert_eq!(h.stub.count(Method::Post, "/servers"), 0);
}
