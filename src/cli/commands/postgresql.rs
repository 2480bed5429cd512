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

//! `stackit postgresql instance ...` and `stackit postgresql plans`

use crate::cli::args::{PositionalArgs, Validator};
use crate::cli::display::TableRenderer;
use crate::cli::flags::{FlagKind, FlagSet};
use crate::cli::globals::OutputFormat;
use crate::cli::input::log_input;
use crate::cli::runtime::Invocation;
use crate::cli::tree::{Action, CommandNode};
use crate::domain::catalog::{Catalog, Selector};
use crate::domain::resources::{gib, labels_cell, Instance, InstanceList, InstanceRef, Plan, PlanList};
use crate::domain::wait::{classify_state, PollOutcome, ResourceWait};
use crate::infrastructure::api::{ApiClient, ApiRequest, Body, Method, Request, Service};
use crate::shared::error::{CliError, Result, ResultExt};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

const FLAG_NAME: &str = "name";
const FLAG_PLAN_ID: &str = "plan-id";
const FLAG_PLAN_NAME: &str = "plan-name";
const FLAG_ACL: &str = "acl";
const FLAG_LABELS: &str = "labels";
const FLAG_STORAGE_CLASS: &str = "storage-class";
const FLAG_STORAGE_SIZE: &str = "storage-size";
const FLAG_VERSION: &str = "version";
const FLAG_LIMIT: &str = "limit";

const DEFAULT_STORAGE_CLASS: &str = "premium-perf2-stackit";
const DEFAULT_STORAGE_SIZE: i64 = 10;
const DEFAULT_VERSION: &str = "16";

/// Flags `instance update` can change.
const UPDATABLE_FLAGS: [&str; 7] = [
    FLAG_NAME,
    FLAG_PLAN_ID,
    FLAG_PLAN_NAME,
    FLAG_ACL,
    FLAG_LABELS,
    FLAG_STORAGE_SIZE,
    FLAG_VERSION,
];

pub fn node() -> Result<CommandNode> {
    let instance = CommandNode::group(
        "instance",
        "Provides functionality for PostgreSQL Flex instances",
    )
    .with_children(vec![
        create_node(),
        update_node(),
        describe_node(),
        list_node(),
        delete_node(),
    ])?;

    CommandNode::group("postgresql", "Provides functionality for PostgreSQL Flex")
        .with_children(vec![instance, plans_node()])
}

fn instances_path(project_id: &str, region: &str) -> String {
    format!("/v2/projects/{}/regions/{}/instances", project_id, region)
}

fn instance_api(project_id: &str, region: &str, instance_id: &str) -> ApiRequest {
    ApiRequest::get(
        Service::PostgresFlex,
        format!("{}/{}", instances_path(project_id, region), instance_id),
    )
}

pub fn get_instance_request(
    client: Arc<dyn ApiClient>,
    project_id: &str,
    region: &str,
    instance_id: &str,
) -> Request<Instance> {
    Request::new(client, instance_api(project_id, region, instance_id))
}

pub fn list_instances_request(
    client: Arc<dyn ApiClient>,
    project_id: &str,
    region: &str,
) -> Request<InstanceList> {
    Request::new(
        client,
        ApiRequest::get(Service::PostgresFlex, instances_path(project_id, region)),
    )
}

pub fn list_plans_request(
    client: Arc<dyn ApiClient>,
    project_id: &str,
    region: &str,
) -> Request<PlanList> {
    Request::new(
        client,
        ApiRequest::get(
            Service::PostgresFlex,
            format!("/v2/projects/{}/regions/{}/plans", project_id, region),
        ),
    )
}

fn instance_ready(body: &Value) -> PollOutcome<Value> {
    classify_state(body, "status", &["READY"], &["FAILED"], "instance operation")
}

fn instance_gone(body: &Value) -> PollOutcome<Value> {
    classify_state(body, "status", &["DELETED"], &["FAILED"], "instance deletion")
}

/// Plan ID for a plan name, matched case-insensitively.
pub fn pick_plan(plans: &[Plan], name: &str) -> Result<String> {
    let wanted = name.to_string();
    let selector = Selector::Matching(
        format!("name \"{}\"", name),
        Box::new(move |plan: &Plan| plan.name.eq_ignore_ascii_case(&wanted)),
    );
    let plan = Catalog::new("plan", plans).resolve(&selector)?;
    Ok(plan.id.clone())
}

async fn resolve_plan_name(
    client: Arc<dyn ApiClient>,
    project_id: &str,
    region: &str,
    name: &str,
) -> Result<String> {
    let plans = list_plans_request(client, project_id, region)
        .execute()
        .await
        .context("list PostgreSQL Flex plans")?;
    pick_plan(&plans.plans, name)
}

fn instance_id_arg(inv: &Invocation<'_>) -> Result<String> {
    inv.args
        .first()
        .cloned()
        .ok_or_else(|| CliError::internal("missing INSTANCE_ID argument"))
}

fn positive_limit(inv: &Invocation<'_>) -> Result<Option<usize>> {
    match inv.flags.int(FLAG_LIMIT) {
        Some(limit) if limit < 1 => Err(inv.invariant("the limit must be greater than 0")),
        Some(limit) => Ok(usize::try_from(limit).ok()),
        None => Ok(None),
    }
}

// ============================================================================
// instance create
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateModel {
    pub project_id: String,
    pub region: String,
    pub name: String,
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
    pub acl: Option<Vec<String>>,
    pub labels: Option<BTreeMap<String, String>>,
    pub storage_class: Option<String>,
    pub storage_size: Option<i64>,
    pub version: Option<String>,
}

fn create_node() -> CommandNode {
    CommandNode::leaf("create", "Creates a PostgreSQL Flex instance", CreateAction)
        .example(
            "Create an instance with a plan chosen by name",
            "stackit postgresql instance create --name my-instance --plan-name stackit-postgresql-1.2.10-replica",
        )
        .example(
            "Create an instance reachable from one network and wait for it",
            "stackit postgresql instance create --name my-instance --plan-id xxx --acl 1.2.3.0/24",
        )
        .flags(
            FlagSet::new()
                .string(FLAG_NAME, None, "Instance name")
                .flag(FLAG_PLAN_ID, FlagKind::Uuid, "Plan ID")
                .string(FLAG_PLAN_NAME, None, "Plan name, resolved through the plan catalog")
                .flag(FLAG_ACL, FlagKind::CidrList, "List of IP networks in CIDR notation allowed to access the instance")
                .string_map(FLAG_LABELS, "Labels as key=value pairs")
                .string(FLAG_STORAGE_CLASS, Some(DEFAULT_STORAGE_CLASS), "Storage class")
                .int64(FLAG_STORAGE_SIZE, Some(DEFAULT_STORAGE_SIZE), "Storage size (in GB)")
                .string(FLAG_VERSION, Some(DEFAULT_VERSION), "PostgreSQL version")
                .required(FLAG_NAME)
                .mutually_exclusive(&[FLAG_PLAN_ID, FLAG_PLAN_NAME])
                .one_required(&[FLAG_PLAN_ID, FLAG_PLAN_NAME]),
        )
}

fn parse_create_input(inv: &Invocation<'_>) -> Result<CreateModel> {
    let model = CreateModel {
        project_id: inv.project_id()?,
        region: inv.region()?,
        name: inv.flags.string(FLAG_NAME).unwrap_or_default(),
        plan_id: inv.flags.string(FLAG_PLAN_ID),
        plan_name: inv.flags.string(FLAG_PLAN_NAME),
        acl: inv.flags.list(FLAG_ACL),
        labels: inv.flags.map(FLAG_LABELS),
        storage_class: inv.flags.string(FLAG_STORAGE_CLASS),
        storage_size: inv.flags.int(FLAG_STORAGE_SIZE),
        version: inv.flags.string(FLAG_VERSION),
    };
    if matches!(model.storage_size, Some(size) if size < 1) {
        return Err(inv.invariant("the storage size must be at least 1 GB"));
    }
    Ok(model)
}

pub fn build_create_request(model: &CreateModel, client: Arc<dyn ApiClient>) -> Request<InstanceRef> {
    let body = Body::new()
        .set("name", model.name.as_str())
        .set_opt("planId", model.plan_id.clone())
        .set_nested("acl", Body::new().set_opt("items", model.acl.clone()))
        .set_nested(
            "storage",
            Body::new()
                .set_opt("class", model.storage_class.clone())
                .set_opt("size", model.storage_size),
        )
        .set_opt("version", model.version.clone())
        .set_map("labels", model.labels.as_ref());

    Request::new(
        client,
        ApiRequest::new(
            Service::PostgresFlex,
            Method::Post,
            instances_path(&model.project_id, &model.region),
        )
        .with_body(body.into_value()),
    )
}

struct CreateAction;

#[async_trait]
impl Action for CreateAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let mut model = parse_create_input(inv)?;
        log_input(inv.printer(), &inv.command_path, &model);

        let client = inv.client().await?;
        if let Some(name) = model.plan_name.clone() {
            let id = resolve_plan_name(client.clone(), &model.project_id, &model.region, &name).await?;
            model.plan_id = Some(id);
        }
        let project_label = inv.project_label(client.clone(), &model.project_id).await;

        let created = build_create_request(&model, client.clone())
            .execute()
            .await
            .context("create PostgreSQL Flex instance")?;

        let async_mode = inv.global.async_mode;
        if !async_mode {
            let mut wait = ResourceWait::new(
                client,
                instance_api(&model.project_id, &model.region, &created.id),
                format!("creation of instance {}", created.id),
                instance_ready,
            );
            inv.wait(&mut wait, "Creating instance").await?;
        }

        let operation = if async_mode {
            "Triggered creation of"
        } else {
            "Created"
        };
        inv.output_result(&created, |printer| {
            printer.outputln(format!(
                "{} instance for project \"{}\". Instance ID: {}",
                operation, project_label, created.id
            ))
        })
    }
}

// ============================================================================
// instance update
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateModel {
    pub project_id: String,
    pub region: String,
    pub instance_id: String,
    pub name: Option<String>,
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
    pub acl: Option<Vec<String>>,
    pub labels: Option<BTreeMap<String, String>>,
    pub storage_size: Option<i64>,
    pub version: Option<String>,
}

fn update_node() -> CommandNode {
    CommandNode::leaf("update", "Updates a PostgreSQL Flex instance", UpdateAction)
        .args(PositionalArgs::Single("INSTANCE_ID", Validator::Uuid))
        .example(
            "Rename an instance",
            "stackit postgresql instance update xxx --name my-new-name",
        )
        .example(
            "Replace the ACL of an instance",
            "stackit postgresql instance update xxx --acl 1.2.3.0/24 --acl 10.0.0.0/8",
        )
        .flags(
            FlagSet::new()
                .string(FLAG_NAME, None, "Instance name")
                .flag(FLAG_PLAN_ID, FlagKind::Uuid, "Plan ID")
                .string(FLAG_PLAN_NAME, None, "Plan name, resolved through the plan catalog")
                .flag(FLAG_ACL, FlagKind::CidrList, "List of IP networks in CIDR notation allowed to access the instance")
                .string_map(FLAG_LABELS, "Labels as key=value pairs")
                .int64(FLAG_STORAGE_SIZE, None, "Storage size (in GB)")
                .string(FLAG_VERSION, None, "PostgreSQL version")
                .mutually_exclusive(&[FLAG_PLAN_ID, FLAG_PLAN_NAME]),
        )
}

fn parse_update_input(inv: &Invocation<'_>) -> Result<UpdateModel> {
    let instance_id = instance_id_arg(inv)?;
    if !UPDATABLE_FLAGS.iter().any(|f| inv.flags.is_set(f)) {
        return Err(inv.invariant(format!(
            "nothing to update, set at least one of: {}",
            UPDATABLE_FLAGS
                .iter()
                .map(|f| format!("--{}", f))
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let model = UpdateModel {
        project_id: inv.project_id()?,
        region: inv.region()?,
        instance_id,
        name: inv.flags.string(FLAG_NAME),
        plan_id: inv.flags.string(FLAG_PLAN_ID),
        plan_name: inv.flags.string(FLAG_PLAN_NAME),
        acl: inv.flags.list(FLAG_ACL),
        labels: inv.flags.map(FLAG_LABELS),
        storage_size: inv.flags.int(FLAG_STORAGE_SIZE),
        version: inv.flags.string(FLAG_VERSION),
    };
    if matches!(model.storage_size, Some(size) if size < 1) {
        return Err(inv.invariant("the storage size must be at least 1 GB"));
    }
    Ok(model)
}

/// PATCH carrying only the fields that were given.
pub fn build_update_request(model: &UpdateModel, client: Arc<dyn ApiClient>) -> Request<Value> {
    let body = Body::new()
        .set_opt("name", model.name.clone())
        .set_opt("planId", model.plan_id.clone())
        .set_nested("acl", Body::new().set_opt("items", model.acl.clone()))
        .set_nested("storage", Body::new().set_opt("size", model.storage_size))
        .set_opt("version", model.version.clone())
        .set_map("labels", model.labels.as_ref());

    let api = instance_api(&model.project_id, &model.region, &model.instance_id);
    Request::new(
        client,
        ApiRequest::new(Service::PostgresFlex, Method::Patch, api.path).with_body(body.into_value()),
    )
}

struct UpdateAction;

#[async_trait]
impl Action for UpdateAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let mut model = parse_update_input(inv)?;
        log_input(inv.printer(), &inv.command_path, &model);

        let client = inv.client().await?;
        if let Some(name) = model.plan_name.clone() {
            let id = resolve_plan_name(client.clone(), &model.project_id, &model.region, &name).await?;
            model.plan_id = Some(id);
        }

        build_update_request(&model, client.clone())
            .execute()
            .await
            .context("update PostgreSQL Flex instance")?;

        let async_mode = inv.global.async_mode;
        if !async_mode {
            let mut wait = ResourceWait::new(
                client,
                instance_api(&model.project_id, &model.region, &model.instance_id),
                format!("update of instance {}", model.instance_id),
                instance_ready,
            );
            inv.wait(&mut wait, "Updating instance").await?;
        }

        let updated = InstanceRef {
            id: model.instance_id.clone(),
        };
        let operation = if async_mode {
            "Triggered update of"
        } else {
            "Updated"
        };
        inv.output_result(&updated, |printer| {
            printer.outputln(format!("{} instance \"{}\"", operation, updated.id))
        })
    }
}

// ============================================================================
// instance describe
// ============================================================================

fn describe_node() -> CommandNode {
    CommandNode::leaf("describe", "Shows details of a PostgreSQL Flex instance", DescribeAction)
        .args(PositionalArgs::Single("INSTANCE_ID", Validator::Uuid))
        .example(
            "Get details of an instance",
            "stackit postgresql instance describe xxx",
        )
        .example(
            "Get details of an instance in JSON format",
            "stackit postgresql instance describe xxx --output-format json",
        )
}

fn render_instance(instance: &Instance) -> String {
    let storage = instance
        .storage
        .as_ref()
        .map(|s| {
            let size = s.size.map(|gb| format!("{} GB", gb)).unwrap_or_default();
            match &s.class {
                Some(class) => format!("{} ({})", size, class),
                None => size,
            }
        })
        .unwrap_or_default();
    let acl = instance
        .acl
        .as_ref()
        .map(|a| a.items.join(","))
        .unwrap_or_default();

    let mut table = TableRenderer::new(&["FIELD", "VALUE"]);
    table
        .add_row(vec!["ID".to_string(), instance.id.clone()])
        .add_row(vec!["NAME".to_string(), instance.name.clone()])
        .add_row(vec!["STATUS".to_string(), instance.status.clone()])
        .add_row(vec![
            "PLAN ID".to_string(),
            instance.plan_id.clone().unwrap_or_default(),
        ])
        .add_row(vec![
            "VERSION".to_string(),
            instance.version.clone().unwrap_or_default(),
        ])
        .add_row(vec!["STORAGE".to_string(), storage])
        .add_row(vec!["ACL".to_string(), acl])
        .add_row(vec!["LABELS".to_string(), labels_cell(&instance.labels)]);
    table.render()
}

struct DescribeAction;

#[async_trait]
impl Action for DescribeAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let instance_id = instance_id_arg(inv)?;
        let project_id = inv.project_id()?;
        let region = inv.region()?;
        let client = inv.client().await?;

        let instance = get_instance_request(client, &project_id, &region, &instance_id)
            .execute()
            .await
            .context("read PostgreSQL Flex instance")?;

        inv.output_result(&instance, |printer| printer.output(render_instance(&instance)))
    }
}

// ============================================================================
// instance list
// ============================================================================

fn list_node() -> CommandNode {
    CommandNode::leaf("list", "Lists all PostgreSQL Flex instances", ListAction)
        .example("List all instances", "stackit postgresql instance list")
        .example(
            "List up to 10 instances in YAML format",
            "stackit postgresql instance list --limit 10 --output-format yaml",
        )
        .flags(FlagSet::new().int64(FLAG_LIMIT, None, "Maximum number of entries to list"))
}

fn render_instances(instances: &[Instance]) -> String {
    let mut table = TableRenderer::new(&["ID", "NAME", "STATUS"]);
    table.set_state_column(2);
    for instance in instances {
        table.add_row(vec![
            instance.id.as_str(),
            instance.name.as_str(),
            instance.status.as_str(),
        ]);
    }
    table.render()
}

struct ListAction;

#[async_trait]
impl Action for ListAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let limit = positive_limit(inv)?;
        let project_id = inv.project_id()?;
        let region = inv.region()?;
        let client = inv.client().await?;

        let mut instances = list_instances_request(client.clone(), &project_id, &region)
            .execute()
            .await
            .context("list PostgreSQL Flex instances")?
            .items;
        if let Some(limit) = limit {
            instances.truncate(limit);
        }

        if instances.is_empty() && inv.global.output_format == OutputFormat::Default {
            let label = inv.project_label(client, &project_id).await;
            inv.printer()
                .info(format!("No instances found for project \"{}\"", label));
            return Ok(());
        }
        inv.output_result(&instances, |printer| printer.output(render_instances(&instances)))
    }
}

// ============================================================================
// instance delete
// ============================================================================

fn delete_node() -> CommandNode {
    CommandNode::leaf("delete", "Deletes a PostgreSQL Flex instance", DeleteAction)
        .args(PositionalArgs::Single("INSTANCE_ID", Validator::Uuid))
        .example("Delete an instance", "stackit postgresql instance delete xxx")
}

pub fn build_delete_request(
    client: Arc<dyn ApiClient>,
    project_id: &str,
    region: &str,
    instance_id: &str,
) -> Request<Value> {
    let api = instance_api(project_id, region, instance_id);
    Request::new(client, ApiRequest::delete(Service::PostgresFlex, api.path))
}

struct DeleteAction;

#[async_trait]
impl Action for DeleteAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let instance_id = instance_id_arg(inv)?;
        let project_id = inv.project_id()?;
        let region = inv.region()?;
        let client = inv.client().await?;

        let label = match get_instance_request(client.clone(), &project_id, &region, &instance_id)
            .execute()
            .await
        {
            Ok(instance) => instance.name,
            Err(e) => {
                tracing::debug!("get instance name: {}", e);
                instance_id.clone()
            }
        };
        inv.confirm(&format!("Are you sure you want to delete instance \"{}\"?", label))?;

        build_delete_request(client.clone(), &project_id, &region, &instance_id)
            .execute()
            .await
            .context("delete PostgreSQL Flex instance")?;

        if inv.global.async_mode {
            inv.printer()
                .info(format!("Triggered deletion of instance \"{}\"", label));
            return Ok(());
        }
        let mut wait = ResourceWait::until_deleted(
            client,
            instance_api(&project_id, &region, &instance_id),
            format!("deletion of instance {}", instance_id),
            instance_gone,
        );
        inv.wait(&mut wait, "Deleting instance").await?;
        inv.printer().info(format!("Deleted instance \"{}\"", label));
        Ok(())
    }
}

// ============================================================================
// plans
// ============================================================================

fn plans_node() -> CommandNode {
    CommandNode::leaf("plans", "Lists all PostgreSQL Flex instance plans", PlansAction)
        .example("List all plans", "stackit postgresql plans")
        .flags(FlagSet::new().int64(FLAG_LIMIT, None, "Maximum number of entries to list"))
}

/// Grouped by CPU count. The CPU column is shown once per group.
fn render_plans(plans: &[Plan]) -> String {
    let mut table = TableRenderer::new(&["CPU", "RAM", "ID", "NAME", "DESCRIPTION"]);
    table.enable_auto_merge(&[0]);
    let mut previous_cpu = None;
    for plan in plans {
        if previous_cpu.is_some() && previous_cpu != Some(plan.cpu) {
            table.add_separator();
        }
        previous_cpu = Some(plan.cpu);
        table.add_row(vec![
            plan.cpu.to_string(),
            gib(plan.memory),
            plan.id.clone(),
            plan.name.clone(),
            plan.description.clone().unwrap_or_default(),
        ]);
    }
    table.render()
}

struct PlansAction;

#[async_trait]
impl Action for PlansAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let limit = positive_limit(inv)?;
        let project_id = inv.project_id()?;
        let region = inv.region()?;
        let client = inv.client().await?;

        let mut plans = list_plans_request(client, &project_id, &region)
            .execute()
            .await
            .context("list PostgreSQL Flex plans")?
            .plans;
        plans.sort_by(|a, b| {
            (a.cpu, a.memory, &a.name).cmp(&(b.cpu, b.memory, &b.name))
        });
        if let Some(limit) = limit {
            plans.truncate(limit);
        }

        inv.output_result(&plans, |printer| {
            if plans.is_empty() {
                printer.info("No plans found");
                return Ok(());
            }
            printer.output(render_plans(&plans))
        })
    }
}
