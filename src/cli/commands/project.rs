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

//! `stackit project describe`

use crate::cli::display::TableRenderer;
use crate::cli::runtime::Invocation;
use crate::cli::tree::{Action, CommandNode};
use crate::domain::project::get_project_request;
use crate::domain::resources::{labels_cell, Project};
use crate::shared::error::{Result, ResultExt};
use async_trait::async_trait;

pub fn node() -> Result<CommandNode> {
    CommandNode::group("project", "Manages projects").with_children(vec![CommandNode::leaf(
        "describe",
        "Shows details of the current project",
        DescribeAction,
    )
    .example(
        "Get the details of the configured project",
        "stackit project describe",
    )
    .example(
        "Get the details of another project in YAML format",
        "stackit project describe --project-id xxx --output-format yaml",
    )])
}

fn render_table(project: &Project) -> String {
    let mut table = TableRenderer::new(&["FIELD", "VALUE"]);
    table
        .add_row(vec!["ID", project.project_id.as_str()])
        .add_row(vec!["NAME", project.name.as_str()])
        .add_row(vec![
            "STATE",
            project.lifecycle_state.as_deref().unwrap_or(""),
        ])
        .add_row(vec!["PARENT ID", project.parent_id.as_deref().unwrap_or("")]);
    table.add_row(vec!["LABELS".to_string(), labels_cell(&project.labels)]);
    table.render()
}

struct DescribeAction;

#[async_trait]
impl Action for DescribeAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let project_id = inv.project_id()?;
        let client = inv.client().await?;

        let project = get_project_request(client, &project_id)
            .execute()
            .await
            .context("get project details")?;

        inv.output_result(&project, |printer| printer.output(render_table(&project)))
    }
}
