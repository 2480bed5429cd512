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

//! `stackit network create | list | delete`

use crate::cli::args::{PositionalArgs, Validator};
use crate::cli::display::TableRenderer;
use crate::cli::flags::{FlagKind, FlagSet};
use crate::cli::globals::OutputFormat;
use crate::cli::input::log_input;
use crate::cli::runtime::Invocation;
use crate::cli::tree::{Action, CommandNode};
use crate::domain::resources::{CreatedNetwork, Network, NetworkList};
use crate::domain::wait::{classify_state, PollOutcome, ResourceWait};
use crate::infrastructure::api::{ApiClient, ApiRequest, Body, Method, Request, Service};
use crate::shared::error::{CliError, Result, ResultExt};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

const FLAG_NAME: &str = "name";
const FLAG_IPV4_PREFIX: &str = "ipv4-prefix";
const FLAG_IPV4_PREFIX_LENGTH: &str = "ipv4-prefix-length";
const FLAG_IPV4_NAMESERVERS: &str = "ipv4-nameservers";
const FLAG_IPV4_GATEWAY: &str = "ipv4-gateway";
const FLAG_NON_ROUTED: &str = "non-routed";
const FLAG_LABELS: &str = "labels";
const FLAG_LIMIT: &str = "limit";
const FLAG_LABEL_SELECTOR: &str = "label-selector";

pub fn node() -> Result<CommandNode> {
    CommandNode::group("network", "Provides functionality for networks")
        .with_children(vec![create_node(), list_node(), delete_node()])
}

fn networks_path(project_id: &str) -> String {
    format!("/v1/projects/{}/networks", project_id)
}

fn network_api(project_id: &str, network_id: &str) -> ApiRequest {
    ApiRequest::get(
        Service::Iaas,
        format!("{}/{}", networks_path(project_id), network_id),
    )
}

fn network_ready(body: &Value) -> PollOutcome<Value> {
    classify_state(body, "state", &["CREATED"], &["FAILED", "ERROR"], "network creation")
}

fn network_gone(body: &Value) -> PollOutcome<Value> {
    classify_state(body, "state", &["DELETED"], &["FAILED", "ERROR"], "network deletion")
}

// ============================================================================
// create
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateModel {
    pub project_id: String,
    pub name: String,
    pub ipv4_prefix: Option<String>,
    pub ipv4_prefix_length: Option<i64>,
    pub ipv4_nameservers: Option<Vec<String>>,
    pub ipv4_gateway: Option<String>,
    pub non_routed: bool,
    pub labels: Option<BTreeMap<String, String>>,
}

fn create_node() -> CommandNode {
    CommandNode::leaf("create", "Creates a network", CreateAction)
        .example(
            "Create a network with a fixed IPv4 prefix",
            "stackit network create --name network-1 --ipv4-prefix 10.1.2.0/24",
        )
        .example(
            "Create a non-routed network with nameservers and labels",
            "stackit network create --name network-1 --non-routed --ipv4-nameservers 1.1.1.1,8.8.8.8 --labels env=dev",
        )
        .flags(
            FlagSet::new()
                .string(FLAG_NAME, None, "Network name")
                .short('n')
                .flag(FLAG_IPV4_PREFIX, FlagKind::Cidr, "IPv4 prefix of the network (CIDR)")
                .int64(
                    FLAG_IPV4_PREFIX_LENGTH,
                    None,
                    "Length of the IPv4 prefix picked from the organization's address pool",
                )
                .string_slice(FLAG_IPV4_NAMESERVERS, "IPv4 nameservers of the network")
                .string(FLAG_IPV4_GATEWAY, None, "IPv4 gateway of the network")
                .bool(FLAG_NON_ROUTED, false, "If set, the network is not routed")
                .string_map(FLAG_LABELS, "Labels as key=value pairs")
                .required(FLAG_NAME)
                .mutually_exclusive(&[FLAG_IPV4_PREFIX, FLAG_IPV4_PREFIX_LENGTH]),
        )
}

fn parse_create_input(inv: &Invocation<'_>) -> Result<CreateModel> {
    let model = CreateModel {
        project_id: inv.project_id()?,
        name: inv.flags.string(FLAG_NAME).unwrap_or_default(),
        ipv4_prefix: inv.flags.string(FLAG_IPV4_PREFIX),
        ipv4_prefix_length: inv.flags.int(FLAG_IPV4_PREFIX_LENGTH),
        ipv4_nameservers: inv.flags.list(FLAG_IPV4_NAMESERVERS),
        ipv4_gateway: inv.flags.string(FLAG_IPV4_GATEWAY),
        non_routed: inv.flags.bool(FLAG_NON_ROUTED),
        labels: inv.flags.map(FLAG_LABELS),
    };

    if model.ipv4_gateway.is_some() && model.ipv4_prefix.is_none() {
        return Err(inv.invariant("--ipv4-gateway can only be set together with --ipv4-prefix"));
    }
    if matches!(model.ipv4_prefix_length, Some(len) if !(8..=29).contains(&len)) {
        return Err(inv.invariant("--ipv4-prefix-length must be between 8 and 29"));
    }
    Ok(model)
}

pub fn build_create_request(model: &CreateModel, client: Arc<dyn ApiClient>) -> Request<CreatedNetwork> {
    let ipv4 = Body::new()
        .set_opt("prefix", model.ipv4_prefix.clone())
        .set_opt("prefixLength", model.ipv4_prefix_length)
        .set_opt("nameservers", model.ipv4_nameservers.clone())
        .set_opt("gateway", model.ipv4_gateway.clone());

    let body = Body::new()
        .set("name", model.name.as_str())
        .set_nested("addressFamily", Body::new().set_nested("ipv4", ipv4))
        .set_opt("routed", model.non_routed.then_some(false))
        .set_map("labels", model.labels.as_ref());

    Request::new(
        client,
        ApiRequest::new(Service::Iaas, Method::Post, networks_path(&model.project_id))
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

        let created = build_create_request(&model, client.clone())
            .execute()
            .await
            .context("create network")?;

        let async_mode = inv.global.async_mode;
        if !async_mode {
            let mut wait = ResourceWait::new(
                client,
                network_api(&model.project_id, &created.network_id),
                format!("creation of network {}", created.network_id),
                network_ready,
            );
            inv.wait(&mut wait, "Creating network").await?;
        }

        let operation = if async_mode {
            "Triggered creation of"
        } else {
            "Created"
        };
        inv.output_result(&created, |printer| {
            printer.outputln(format!(
                "{} network for project \"{}\". Network ID: {}",
                operation, project_label, created.network_id
            ))
        })
    }
}

// ============================================================================
// list
// ============================================================================

fn list_node() -> CommandNode {
    CommandNode::leaf("list", "Lists all networks of a project", ListAction)
        .example("List all networks", "stackit network list")
        .example(
            "List networks labelled env=dev",
            "stackit network list --label-selector env=dev",
        )
        .flags(
            FlagSet::new()
                .int64(FLAG_LIMIT, None, "Maximum number of entries to list")
                .string(FLAG_LABEL_SELECTOR, None, "Filter by label"),
        )
}

pub fn build_list_request(
    client: Arc<dyn ApiClient>,
    project_id: &str,
    label_selector: Option<&str>,
) -> Request<NetworkList> {
    let mut api = ApiRequest::get(Service::Iaas, networks_path(project_id));
    if let Some(selector) = label_selector {
        api = api.with_query("label_selector", selector);
    }
    Request::new(client, api)
}

fn render_networks(networks: &[Network]) -> String {
    let mut table = TableRenderer::new(&["ID", "NAME", "STATUS", "PREFIXES", "ROUTED"]);
    table.set_state_column(2);
    for network in networks {
        table.add_row(vec![
            network.network_id.clone(),
            network.name.clone(),
            network.state.clone(),
            network.prefixes.join(", "),
            network.routed.map(|r| r.to_string()).unwrap_or_default(),
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
        let selector = inv.flags.string(FLAG_LABEL_SELECTOR);
        let project_id = inv.project_id()?;
        let client = inv.client().await?;

        let mut networks = build_list_request(client.clone(), &project_id, selector.as_deref())
            .execute()
            .await
            .context("list networks")?
            .items;
        if let Some(limit) = limit {
            networks.truncate(limit);
        }

        if networks.is_empty() && inv.global.output_format == OutputFormat::Default {
            let label = inv.project_label(client, &project_id).await;
            inv.printer()
                .info(format!("No networks found for project \"{}\"", label));
            return Ok(());
        }
        inv.output_result(&networks, |printer| printer.output(render_networks(&networks)))
    }
}

// ============================================================================
// delete
// ============================================================================

fn delete_node() -> CommandNode {
    CommandNode::leaf("delete", "Deletes a network", DeleteAction)
        .args(PositionalArgs::Single("NETWORK_ID", Validator::Uuid))
        .example("Delete a network", "stackit network delete xxx")
}

struct DeleteAction;

#[async_trait]
impl Action for DeleteAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let network_id = inv
            .args
            .first()
            .cloned()
            .ok_or_else(|| CliError::internal("missing NETWORK_ID argument"))?;
        let project_id = inv.project_id()?;
        let client = inv.client().await?;

        let label = match Request::<Network>::new(client.clone(), network_api(&project_id, &network_id))
            .execute()
            .await
        {
            Ok(network) => network.name,
            Err(e) => {
                tracing::debug!("get network name: {}", e);
                network_id.clone()
            }
        };
        inv.confirm(&format!("Are you sure you want to delete network \"{}\"?", label))?;

        let api = network_api(&project_id, &network_id);
        Request::<Value>::new(client.clone(), ApiRequest::delete(Service::Iaas, api.path))
            .execute()
            .await
            .context("delete network")?;

        if inv.global.async_mode {
            inv.printer()
                .info(format!("Triggered deletion of network \"{}\"", label));
            return Ok(());
        }
        let mut wait = ResourceWait::until_deleted(
            client,
            network_api(&project_id, &network_id),
            format!("deletion of network {}", network_id),
            network_gone,
        );
        inv.wait(&mut wait, "Deleting network").await?;
        inv.printer().info(format!("Deleted network \"{}\"", label));
        Ok(())
    }
}
