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

//! Command tree of the `stackit` binary

pub mod auth;
pub mod config;
pub mod network;
pub mod postgresql;
pub mod project;
pub mod server;

use super::globals::global_flags;
use super::tree::CommandNode;
use crate::infrastructure::constants::PROGRAM_NAME;
use crate::shared::error::Result;

/// Builds and validates the full tree.
pub fn root() -> Result<CommandNode> {
    let root = CommandNode::group(PROGRAM_NAME, "Manage STACKIT cloud services")
        .long(
            "Manage STACKIT cloud services.\n\n\
             Commands talk to the STACKIT APIs on behalf of the logged-in user or service account.",
        )
        .flags(global_flags())
        .with_children(vec![
            auth::node()?,
            config::node()?,
            network::node()?,
            postgresql::node()?,
            project::node()?,
            server::node()?,
        ])?;
    root.validate()?;
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_is_valid() {
        let root = root().unwrap();
        for path in [
            &["config", "set"][..],
            &["auth", "login"],
            &["postgresql", "instance", "create"],
            &["postgresql", "plans"],
            &["network", "delete"],
            &["server", "create"],
        ] {
            let chain = root.find(path).unwrap_or_else(|| panic!("missing {:?}", path));
            assert!(chain.last().unwrap().is_leaf());
        }
    }
}
