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

//! `stackit server create | describe | list`

use crate::cli::args::{PositionalArgs, Validator};
use crate::cli::display::TableRenderer;
use crate::cli::flags::{FlagKind, FlagSet};
use crate::cli::globals::OutputFormat;
use crate::cli::input::log_input;
use crate::cli::runtime::Invocation;
use crate::cli::tree::{Action, CommandNode};
use crate::domain::catalog::{Catalog, Selector};
use crate::domain::resources::{labels_cell, mib, CreatedServer, MachineType, MachineTypeList, Server, ServerList};
use crate::domain::wait::{classify_state, PollOutcome, ResourceWait};
use crate::infrastructure::api::{ApiClient, ApiRequest, Body, Method, Request, Service};
use crate::shared::error::{CliError, Result, ResultExt};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

const FLAG_NAME: &str = "name";
const FLAG_MACHINE_TYPE: &str = "machine-type";
const FLAG_CPU: &str = "cpu";
const FLAG_RAM: &str = "ram";
const FLAG_IMAGE_ID: &str = "image-id";
const FLAG_NETWORK_ID: &str = "network-id";
const FLAG_AVAILABILITY_ZONE: &str = "availability-zone";
const FLAG_USER_DATA: &str = "user-data";
const FLAG_LABELS: &str = "labels";
const FLAG_LIMIT: &str = "limit";

pub fn node() -> Result<CommandNode> {
    CommandNode::group("server", "Provides functionality for servers")
        .with_children(vec![create_node(), describe_node(), list_node()])
}

fn servers_path(project_id: &str) -> String {
    format!("/v1/projects/{}/servers", project_id)
}

fn server_api(project_id: &str, server_id: &str) -> ApiRequest {
    ApiRequest::get(
        Service::Iaas,
        format!("{}/{}", servers_path(project_id), server_id),
    )
}

pub fn list_machine_types_request(
    client: Arc<dyn ApiClient>,
    project_id: &str,
) -> Request<MachineTypeList> {
    Request::new(
        client,
        ApiRequest::get(
            Service::Iaas,
            format!("/v1/projects/{}/machine-types", project_id),
        ),
    )
}

fn server_ready(body: &Value) -> PollOutcome<Value> {
    classify_state(body, "status", &["ACTIVE"], &["ERROR"], "server creation")
}

/// How the user picked the machine type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MachineTypeChoice {
    Name(String),
    /// vCPUs and RAM in GB.
    Size { cpu: i64, ram: i64 },
}

/// Resolves the choice against the machine-type catalog.
pub fn pick_machine_type(types: &[MachineType], choice: &MachineTypeChoice) -> Result<String> {
    let catalog = Catalog::new("machine type", types);
    let found = match choice {
        MachineTypeChoice::Name(name) => catalog.resolve(&Selector::Id(name))?,
        MachineTypeChoice::Size { cpu, ram } => {
            let (cpu, ram_mib) = (*cpu, ram * 1024);
            catalog.resolve(&Selector::Matching(
                format!("{} vCPU and {} GB RAM", cpu, ram),
                Box::new(move |t: &MachineType| t.vcpus == cpu && t.ram == ram_mib),
            ))?
        }
    };
    Ok(found.name.clone())
}

// ============================================================================
// create
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateModel {
    pub project_id: String,
    pub name: String,
    pub machine_type: MachineTypeChoice,
    pub image_id: String,
    pub network_id: Option<String>,
    pub availability_zone: Option<String>,
    /// Raw contents, encoded when the request is built.
    pub user_data: Option<String>,
    pub labels: Option<BTreeMap<String, String>>,
}

fn create_node() -> CommandNode {
    CommandNode::leaf("create", "Creates a server", CreateAction)
        .long(
            "Creates a server.\n\
             The machine type is given by name or looked up from the project's machine types by --cpu and --ram.",
        )
        .example(
            "Create a server with a named machine type",
            "stackit server create --name vm-1 --machine-type c1.2 --image-id xxx",
        )
        .example(
            "Create a server with 4 vCPUs and 8 GB RAM and a cloud-init file",
            "stackit server create --name vm-1 --cpu 4 --ram 8 --image-id xxx --user-data @./cloud-init.yaml",
        )
        .flags(
            FlagSet::new()
                .string(FLAG_NAME, None, "Server name")
                .short('n')
                .string(FLAG_MACHINE_TYPE, None, "Name of the machine type")
                .int64(FLAG_CPU, None, "Number of vCPUs, used to look up the machine type")
                .int64(FLAG_RAM, None, "RAM in GB, used to look up the machine type")
                .flag(FLAG_IMAGE_ID, FlagKind::Uuid, "ID of the boot image")
                .flag(FLAG_NETWORK_ID, FlagKind::Uuid, "ID of the network the server is attached to")
                .string(FLAG_AVAILABILITY_ZONE, None, "Availability zone of the server")
                .flag(
                    FLAG_USER_DATA,
                    FlagKind::ReadFromFile,
                    "Cloud-init user data, or @path to a file containing it",
                )
                .string_map(FLAG_LABELS, "Labels as key=value pairs")
                .required(FLAG_NAME)
                .required(FLAG_IMAGE_ID)
                .mutually_exclusive(&[FLAG_MACHINE_TYPE, FLAG_CPU])
                .one_required(&[FLAG_MACHINE_TYPE, FLAG_CPU]),
        )
}

fn parse_create_input(inv: &Invocation<'_>) -> Result<CreateModel> {
    let machine_type = match inv.flags.string(FLAG_MACHINE_TYPE) {
        Some(_) if inv.flags.is_set(FLAG_RAM) => {
            return Err(inv.invariant("--ram can only be set together with --cpu"))
        }
        Some(name) => MachineTypeChoice::Name(name),
        None => {
            let (cpu, ram) = match (inv.flags.int(FLAG_CPU), inv.flags.int(FLAG_RAM)) {
                (Some(cpu), Some(ram)) => (cpu, ram),
                _ => return Err(inv.invariant("--cpu and --ram must be set together")),
            };
            if cpu < 1 || ram < 1 {
                return Err(inv.invariant("--cpu and --ram must be greater than 0"));
            }
            MachineTypeChoice::Size { cpu, ram }
        }
    };

    Ok(CreateModel {
        project_id: inv.project_id()?,
        name: inv.flags.string(FLAG_NAME).unwrap_or_default(),
        machine_type,
        image_id: inv.flags.string(FLAG_IMAGE_ID).unwrap_or_default(),
        network_id: inv.flags.string(FLAG_NETWORK_ID),
        availability_zone: inv.flags.string(FLAG_AVAILABILITY_ZONE),
        user_data: inv.flags.string(FLAG_USER_DATA),
        labels: inv.flags.map(FLAG_LABELS),
    })
}

pub fn build_create_request(
    model: &CreateModel,
    machine_type: &str,
    client: Arc<dyn ApiClient>,
) -> Request<CreatedServer> {
    let body = Body::new()
        .set("name", model.name.as_str())
        .set("machineType", machine_type)
        .set(
            "bootVolume",
            Body::new()
                .set("source", Body::new().set("id", model.image_id.as_str()).set("type", "image").into_value())
                .into_value(),
        )
        .set_nested(
            "networking",
            Body::new().set_opt("networkId", model.network_id.clone()),
        )
        .set_opt("availabilityZone", model.availability_zone.clone())
        .set_opt("userData", model.user_data.as_ref().map(|data| STANDARD.encode(data)))
        .set_map("labels", model.labels.as_ref());

    Request::new(
        client,
        ApiRequest::new(Service::Iaas, Method::Post, servers_path(&model.project_id))
            .with_body(body.into_value()),
    )
}

struct CreateAction;

#[async_trait]
impl Action for CreateAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let model = parse_create_input(inv)?;
        log_input(inv.printer(), &inv.command_path, &model);

        let client = inv.client().await?;
        let project_label = inv.project_label(client.clone(), &model.project_id).await;

        let types = list_machine_types_request(client.clone(), &model.project_id)
            .execute()
            .await
            .context("list machine types")?;
        let machine_type = pick_machine_type(&types.items, &model.machine_type)?;

        let created = build_create_request(&model, &machine_type, client.clone())
            .execute()
            .await
            .context("create server")?;

        let async_mode = inv.global.async_mode;
        if !async_mode {
            let mut wait = ResourceWait::new(
                client,
                server_api(&model.project_id, &created.id),
                format!("creation of server {}", created.id),
                server_ready,
            );
            inv.wait(&mut wait, "Creating server").await?;
        }

        let operation = if async_mode {
            "Triggered creation of"
        } else {
            "Created"
        };
        inv.output_result(&created, |printer| {
            printer.outputln(format!(
                "{} server for project \"{}\". Server ID: {}",
                operation, project_label, created.id
            ))
        })
    }
}

// ============================================================================
// describe
// ============================================================================

fn describe_node() -> CommandNode {
    CommandNode::leaf("describe", "Shows details of a server", DescribeAction)
        .args(PositionalArgs::Single("SERVER_ID", Validator::Uuid))
        .example("Get details of a server", "stackit server describe xxx")
        .example(
            "Get details of a server in JSON format",
            "stackit server describe xxx --output-format json",
        )
}

fn render_server(server: &Server, machine_type: Option<&MachineType>) -> String {
    let mut table = TableRenderer::new(&["FIELD", "VALUE"]);
    table
        .add_row(vec!["ID", server.id.as_str()])
        .add_row(vec!["NAME", server.name.as_str()])
        .add_row(vec!["STATUS", server.status.as_str()])
        .add_separator()
        .add_row(vec!["MACHINE TYPE", server.machine_type.as_str()]);
    if let Some(t) = machine_type {
        table
            .add_row(vec!["VCPUS".to_string(), t.vcpus.to_string()])
            .add_row(vec!["RAM".to_string(), mib(t.ram)]);
    }
    table
        .add_separator()
        .add_row(vec!["IMAGE ID", server.image_id.as_deref().unwrap_or("")])
        .add_row(vec![
            "AVAILABILITY ZONE",
            server.availability_zone.as_deref().unwrap_or(""),
        ])
        .add_row(vec!["LABELS".to_string(), labels_cell(&server.labels)]);
    table.render()
}

struct DescribeAction;

#[async_trait]
impl Action for DescribeAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let server_id = inv
            .args
            .first()
            .cloned()
            .ok_or_else(|| CliError::internal("missing SERVER_ID argument"))?;
        let project_id = inv.project_id()?;
        let client = inv.client().await?;

        let server = Request::<Server>::new(client.clone(), server_api(&project_id, &server_id))
            .execute()
            .await
            .context("get server details")?;

        if inv.global.output_format != OutputFormat::Default {
            return inv.output_result(&server, |_| Ok(()));
        }

        // Sizing is informative only; a failed lookup still shows the server.
        let types = match list_machine_types_request(client, &project_id).execute().await {
            Ok(list) => list.items,
            Err(e) => {
                tracing::debug!("list machine types: {}", e);
                Vec::new()
            }
        };
        let machine_type = types.iter().find(|t| t.name == server.machine_type);
        inv.printer().output(render_server(&server, machine_type))
    }
}

// ============================================================================
// list
// ============================================================================

fn list_node() -> CommandNode {
    CommandNode::leaf("list", "Lists all servers of a project", ListAction)
        .example("List all servers", "stackit server list")
        .example("List up to 10 servers", "stackit server list --limit 10")
        .flags(FlagSet::new().int64(FLAG_LIMIT, None, "Maximum number of entries to list"))
}

fn render_servers(servers: &[Server]) -> String {
    let mut table = TableRenderer::new(&["ID", "NAME", "STATUS", "MACHINE TYPE", "AVAILABILITY ZONE"]);
    table.set_state_column(2);
    for server in servers {
        table.add_row(vec![
            server.id.clone(),
            server.name.clone(),
            server.status.clone(),
            server.machine_type.clone(),
            server.availability_zone.clone().unwrap_or_default(),
        ]);
    }
    table.render()
}

struct ListAction;

#[async_trait]
impl Action for ListAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let limit = match inv.flags.int(FLAG_LIMIT) {
            Some(limit) if limit < 1 => {
                return Err(inv.invariant("the limit must be greater than 0"))
            }
            other => other.and_then(|l| usize::try_from(l).ok()),
        };
        let project_id = inv.project_id()?;
        let client = inv.client().await?;

        let mut servers = Request::<ServerList>::new(
            client.clone(),
            ApiRequest::get(Service::Iaas, servers_path(&project_id)),
        )
        .execute()
        .await
        .context("list servers")?
        .items;
        if let Some(limit) = limit {
            servers.truncate(limit);
        }

        if servers.is_empty() && inv.global.output_format == OutputFormat::Default {
            let label = inv.project_label(client, &project_id).await;
            inv.printer()
                .info(format!("No servers found for project \"{}\"", label));
            return Ok(());
        }
        inv.output_result(&servers, |printer| printer.output(render_servers(&servers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::ErrorKind;
    use crate::shared::testing::StubApiClient;
    use serde_json::json;

    fn machine_type(name: &str, vcpus: i64, ram: i64) -> MachineType {
        MachineType {
            name: name.into(),
            vcpus,
            ram,
            disk: 0,
            description: None,
        }
    }

    fn types() -> Vec<MachineType> {
        vec![
            machine_type("c1.2", 2, 4096),
            machine_type("g1.4", 4, 16384),
            machine_type("c1.4", 4, 8192),
        ]
    }

    fn model() -> CreateModel {
        CreateModel {
            project_id: "p".into(),
            name: "vm".into(),
            machine_type: MachineTypeChoice::Name("c1.2".into()),
            image_id: "img".into(),
            network_id: None,
            availability_zone: None,
            user_data: None,
            labels: None,
        }
    }

    #[test]
    fn test_pick_machine_type() {
        let types = types();
        assert_eq!(
            pick_machine_type(&types, &MachineTypeChoice::Size { cpu: 4, ram: 8 }).unwrap(),
            "c1.4"
        );
        assert_eq!(
            pick_machine_type(&types, &MachineTypeChoice::Name("C1.2".into())).unwrap(),
            "c1.2"
        );

        let err = pick_machine_type(&types, &MachineTypeChoice::Size { cpu: 8, ram: 8 }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("8 vCPU and 8 GB RAM"));
        assert!(err.to_string().contains("c1.2 (2 vCPU"));
    }

    #[test]
    fn test_create_body_encodes_user_data() {
        let model = CreateModel {
            user_data: Some("#cloud-config\n".into()),
            ..model()
        };
        let request = build_create_request(&model, "c1.2", Arc::new(StubApiClient::new()));
        let body = request.api().body.clone().unwrap();

        assert_eq!(body["userData"], json!("I2Nsb3VkLWNvbmZpZwo="));
        assert_eq!(body["machineType"], json!("c1.2"));
        assert_eq!(body["bootVolume"]["source"], json!({"id": "img", "type": "image"}));
        assert!(body.get("networking").is_none());
    }

    #[test]
    fn test_describe_table_shows_sizing() {
        let server = Server {
            id: "s-1".into(),
            name: "vm".into(),
            status: "ACTIVE".into(),
            machine_type: "c1.4".into(),
            image_id: None,
            availability_zone: Some("eu01-1".into()),
            labels: BTreeMap::new(),
        };
        let types = types();
        let text = render_server(&server, types.iter().find(|t| t.name == "c1.4"));
        assert!(text.contains("8.0 GiB"));
        assert!(text.contains("eu01-1"));
    }

    #[test]
    fn test_server_ready() {
        assert!(matches!(server_ready(&json!({"status": "ACTIVE"})), PollOutcome::Done(_)));
        assert!(matches!(server_ready(&json!({"status": "ERROR"})), PollOutcome::Failed(_)));
    }
}
