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

//! `stackit auth login | activate-service-account | logout`

use crate::cli::flags::{FlagKind, FlagSet};
use crate::cli::input::log_input;
use crate::cli::runtime::Invocation;
use crate::cli::tree::{Action, CommandNode};
use crate::infrastructure::auth::{logout, store_service_account_token};
use crate::shared::error::Result;
use crate::shared::secret::Secret;
use async_trait::async_trait;
use serde::Serialize;

const FLAG_SERVICE_ACCOUNT_TOKEN: &str = "service-account-token";

pub fn node() -> Result<CommandNode> {
    CommandNode::group("auth", "Authenticates the STACKIT CLI")
        .category("Configuration")
        .with_children(vec![
            CommandNode::leaf("login", "Logs in to the STACKIT CLI", LoginAction)
                .long(
                    "Logs in to the STACKIT CLI.\n\
                     The access token is stored in the CLI configuration and used by later commands.",
                )
                .example("Log in to the STACKIT CLI", "stackit auth login"),
            activate_node(),
            CommandNode::leaf("logout", "Logs the user account out of the STACKIT CLI", LogoutAction)
                .example("Log out of the STACKIT CLI", "stackit auth logout"),
        ])
}

struct LoginAction;

#[async_trait]
impl Action for LoginAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let runtime = &mut *inv.runtime;
        runtime.auth.login(&mut runtime.config, &runtime.printer).await?;
        runtime
            .printer
            .outputln("Successfully logged into STACKIT CLI.")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateModel {
    pub service_account_token: Secret,
}

fn activate_node() -> CommandNode {
    CommandNode::leaf(
        "activate-service-account",
        "Authenticates using a service account",
        ActivateAction,
    )
    .long(
        "Authenticates using a long-lived service account token.\n\
         The token can be given inline or read from a file with the \"@\" prefix.",
    )
    .example(
        "Activate a service account with a token stored in a file",
        "stackit auth activate-service-account --service-account-token @./token.txt",
    )
    .flags(
        FlagSet::new()
            .flag(
                FLAG_SERVICE_ACCOUNT_TOKEN,
                FlagKind::ReadFromFile,
                "Service account long-lived access token, or @path to a file containing it",
            )
            .required(FLAG_SERVICE_ACCOUNT_TOKEN),
    )
}

fn parse_activate_input(inv: &Invocation<'_>) -> Result<ActivateModel> {
    let token = inv
        .flags
        .string(FLAG_SERVICE_ACCOUNT_TOKEN)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| inv.invariant("the service account token must not be empty"))?;
    Ok(ActivateModel {
        service_account_token: Secret::new(token),
    })
}

struct ActivateAction;

#[async_trait]
impl Action for ActivateAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let model = parse_activate_input(inv)?;
        log_input(inv.printer(), &inv.command_path, &model);

        store_service_account_token(inv.config(), &model.service_account_token)?;
        inv.printer()
            .outputln("You have been successfully authenticated to the STACKIT CLI!")
    }
}

struct LogoutAction;

#[async_trait]
impl Action for LogoutAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        if logout(inv.config())? {
            inv.printer()
                .outputln("Successfully logged out of the STACKIT CLI.")
        } else {
            inv.printer().info("No credentials were stored.");
            Ok(())
        }
    }
}
