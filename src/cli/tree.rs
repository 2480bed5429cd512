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

//! Declarative command tree and argv dispatch
//!
//! The root node carries the global flags; every node below inherits them.
//! Dispatch walks argv greedily: non-flag tokens select children until a leaf
//! is reached. Flags may appear anywhere, even before the leaf that declares
//! them, and are handed to the leaf parser with the remaining tokens.

use super::args::PositionalArgs;
use super::flags::{FlagKind, FlagSet};
use super::runtime::Invocation;
use crate::infrastructure::constants::SUGGESTION_MAX_DISTANCE;
use crate::shared::error::{CliError, Result, UsageError};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

#[async_trait]
pub trait Action: Send + Sync {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct Example {
    pub description: &'static str,
    pub command: &'static str,
}

pub struct CommandNode {
    pub name: &'static str,
    pub short: &'static str,
    pub long: &'static str,
    pub category: Option<&'static str>,
    pub examples: Vec<Example>,
    pub args: PositionalArgs,
    pub flags: FlagSet,
    action: Option<Arc<dyn Action>>,
    children: Vec<CommandNode>,
}

/// Outcome of walking argv through the tree.
pub enum Dispatched<'a> {
    Leaf {
        chain: Vec<&'a CommandNode>,
        /// Everything after command selection: flags, flag values, positionals.
        rest: Vec<String>,
    },
    Help {
        chain: Vec<&'a CommandNode>,
    },
}

impl CommandNode {
    fn new(name: &'static str, short: &'static str) -> Self {
        Self {
            name,
            short,
            long: "",
            category: None,
            examples: Vec::new(),
            args: PositionalArgs::None,
            flags: FlagSet::new(),
            action: None,
            children: Vec::new(),
        }
    }

    pub fn group(name: &'static str, short: &'static str) -> Self {
        Self::new(name, short)
    }

    pub fn leaf(name: &'static str, short: &'static str, action: impl Action + 'static) -> Self {
        Self {
            action: Some(Arc::new(action)),
            ..Self::new(name, short)
        }
    }

    pub fn long(mut self, long: &'static str) -> Self {
        self.long = long;
        self
    }

    pub fn category(mut self, category: &'static str) -> Self {
        self.category = Some(category);
        self
    }

    pub fn example(mut self, description: &'static str, command: &'static str) -> Self {
        self.examples.push(Example {
            description,
            command,
        });
        self
    }

    pub fn args(mut self, args: PositionalArgs) -> Self {
        self.args = args;
        self
    }

    pub fn flags(mut self, flags: FlagSet) -> Self {
        self.flags = flags;
        self
    }

    pub fn add_child(&mut self, child: CommandNode) -> Result<()> {
        if self.children.iter().any(|c| c.name == child.name) {
            return Err(CliError::DuplicateCommand {
                parent: self.name.to_string(),
                name: child.name.to_string(),
            });
        }
        self.children.push(child);
        Ok(())
    }

    pub fn with_children(mut self, children: Vec<CommandNode>) -> Result<Self> {
        for child in children {
            self.add_child(child)?;
        }
        Ok(self)
    }

    pub fn children(&self) -> &[CommandNode] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn action(&self) -> Option<Arc<dyn Action>> {
        self.action.clone()
    }

    pub fn child(&self, name: &str) -> Option<&CommandNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Nodes from the root along `path` (names below the root).
    pub fn find<'a>(&'a self, path: &[&str]) -> Option<Vec<&'a CommandNode>> {
        let mut chain = vec![self];
        let mut current = self;
        for name in path {
            current = current.child(name)?;
            chain.push(current);
        }
        Some(chain)
    }

    /// Every node has an action or children (not both), sibling names are
    /// unique, and no node redeclares a flag inherited from an ancestor.
    pub fn validate(&self) -> Result<()> {
        self.validate_under(&BTreeSet::new(), self.name)
    }

    fn validate_under(&self, inherited: &BTreeSet<&'static str>, path: &str) -> Result<()> {
        self.flags.validate(path)?;
        if self.action.is_some() == !self.children.is_empty() {
            return Err(CliError::internal(format!(
                "command \"{}\" must have either an action or subcommands",
                path
            )));
        }
        for def in self.flags.flags() {
            if inherited.contains(def.name) {
                return Err(CliError::internal(format!(
                    "command \"{}\" shadows inherited flag \"--{}\"",
                    path, def.name
                )));
            }
        }

        let mut names = BTreeSet::new();
        let mut scope = inherited.clone();
        scope.extend(self.flags.flags().iter().map(|f| f.name));
        for child in &self.children {
            if !names.insert(child.name) {
                return Err(CliError::DuplicateCommand {
                    parent: path.to_string(),
                    name: child.name.to_string(),
                });
            }
            child.validate_under(&scope, &format!("{} {}", path, child.name))?;
        }
        Ok(())
    }

    pub fn dispatch<'a>(&'a self, argv: &[String]) -> Result<Dispatched<'a>> {
        let mut chain: Vec<&'a CommandNode> = vec![self];
        let mut rest = Vec::new();
        let mut help = false;
        let mut tokens = argv.iter();

        while let Some(token) = tokens.next() {
            let current = chain[chain.len() - 1];

            if token == "--" {
                rest.push(token.clone());
                rest.extend(tokens.by_ref().cloned());
                break;
            }
            if token == "--help" || token == "-h" {
                help = true;
                continue;
            }
            if token.starts_with('-') && token.len() > 1 {
                rest.push(token.clone());
                if takes_separate_value(&chain, token) {
                    if let Some(value) = tokens.next() {
                        rest.push(value.clone());
                    }
                }
                continue;
            }
            if current.is_leaf() {
                rest.push(token.clone());
                continue;
            }

            match current.child(token) {
                Some(child) => chain.push(child),
                None => {
                    return Err(CliError::usage(
                        path_of(&chain),
                        UsageError::UnknownCommand {
                            parent: path_of(&chain),
                            name: token.clone(),
                            suggestion: current.suggest(token),
                        },
                    ))
                }
            }
        }

        let last = chain[chain.len() - 1];
        if help || !last.is_leaf() {
            return Ok(Dispatched::Help { chain });
        }
        Ok(Dispatched::Leaf { chain, rest })
    }

    fn suggest(&self, typo: &str) -> Option<String> {
        self.children
            .iter()
            .map(|c| (osa_distance(typo, c.name), c.name))
            .filter(|(d, _)| *d <= SUGGESTION_MAX_DISTANCE)
            .min_by_key(|(d, _)| *d)
            .map(|(_, name)| name.to_string())
    }
}

pub fn path_of(chain: &[&CommandNode]) -> String {
    chain.iter().map(|n| n.name).collect::<Vec<_>>().join(" ")
}

/// `--flag value` and `-f value` consume the next token unless the flag is a bool.
///
/// A flag not yet declared along the chain may belong to a leaf further down
/// (`network --name n1 create`). It consumes a value only if every node below
/// the current one that declares it takes a value.
fn takes_separate_value(chain: &[&CommandNode], token: &str) -> bool {
    if token.contains('=') {
        return false;
    }
    if let Some(kind) = chain.iter().find_map(|n| flag_kind(n, token)) {
        return kind != FlagKind::Bool;
    }

    let mut kinds = Vec::new();
    if let Some(current) = chain.last() {
        collect_below(current, token, &mut kinds);
    }
    !kinds.is_empty() && kinds.iter().all(|k| *k != FlagKind::Bool)
}

fn collect_below(node: &CommandNode, token: &str, kinds: &mut Vec<FlagKind>) {
    for child in &node.children {
        kinds.extend(flag_kind(child, token));
        collect_below(child, token, kinds);
    }
}

fn flag_kind(node: &CommandNode, token: &str) -> Option<FlagKind> {
    if let Some(long) = token.strip_prefix("--") {
        return node.flags.get(long).map(|f| f.kind);
    }
    let mut shorts = token[1..].chars();
    match (shorts.next(), shorts.next()) {
        (Some(c), None) => node.flags.find_short(c).map(|f| f.kind),
        _ => None,
    }
}

/// Optimal string alignment distance (Levenshtein plus adjacent transpositions).
fn osa_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut d = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in d.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        d[0][j] = j;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            d[i][j] = (d[i - 1][j] + 1)
                .min(d[i][j - 1] + 1)
                .min(d[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                d[i][j] = d[i][j].min(d[i - 2][j - 2] + 1);
            }
        }
    }
    d[a.len()][b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::ErrorKind;

    struct Noop;

    #[async_trait]
    impl Action for Noop {
        async fn run(&self, _inv: &mut Invocation<'_>) -> Result<()> {
            Ok(())
        }
    }

    fn tree() -> CommandNode {
        let create = CommandNode::leaf("create", "Creates a network", Noop).flags(
            FlagSet::new()
                .string("name", None, "Network name")
                .string_slice("ipv4-nameservers", "Nameservers"),
        );
        let list = CommandNode::leaf("list", "Lists networks", Noop);
        let network = CommandNode::group("network", "Manages networks")
            .with_children(vec![create, list])
            .unwrap();
        CommandNode::group("stackit", "STACKIT CLI")
            .flags(
                FlagSet::new()
                    .string("project-id", None, "Project ID")
                    .bool("assume-yes", false, "Skip prompts")
                    .short('y'),
            )
            .with_children(vec![network])
            .unwrap()
    }

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dispatch_leaf_with_interleaved_flags() {
        let root = tree();
        let dispatched = root
            .dispatch(&argv(&[
                "--project-id", "p", "network", "-y", "create", "--name", "n1",
            ]))
            .unwrap();
        match dispatched {
            Dispatched::Leaf { chain, rest } => {
                assert_eq!(path_of(&chain), "stackit network create");
                assert_eq!(rest, argv(&["--project-id", "p", "-y", "--name", "n1"]));
            }
            Dispatched::Help { .. } => panic!("expected leaf"),
        }
    }

    #[test]
    fn test_leaf_flag_before_leaf_name_keeps_its_value() {
        let root = tree();
        let dispatched = root
            .dispatch(&argv(&["network", "--name", "n1", "create", "--dry"]))
            .unwrap();
        match dispatched {
            Dispatched::Leaf { chain, rest } => {
                assert_eq!(path_of(&chain), "stackit network create");
                assert_eq!(rest, argv(&["--name", "n1", "--dry"]));
            }
            Dispatched::Help { .. } => panic!("expected leaf"),
        }
    }

    #[test]
    fn test_group_without_subcommand_shows_help() {
        let root = tree();
        assert!(matches!(
            root.dispatch(&argv(&["network"])).unwrap(),
            Dispatched::Help { chain } if chain.len() == 2
        ));
        assert!(matches!(
            root.dispatch(&argv(&["network", "create", "--help"])).unwrap(),
            Dispatched::Help { chain } if chain.len() == 3
        ));
        assert!(matches!(
            root.dispatch(&[]).unwrap(),
            Dispatched::Help { chain } if chain.len() == 1
        ));
    }

    #[test]
    fn test_unknown_command_suggests() {
        let root = tree();
        let err = root
            .dispatch(&argv(&["netwrok", "list"]))
            .err()
            .expect("unknown command");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(err.help_target(), Some("stackit"));
        assert!(err.to_string().contains("Did you mean this?\n\tnetwork"));

        let err = root.dispatch(&argv(&["zzz"])).err().expect("unknown command");
        assert!(!err.to_string().contains("Did you mean"));
    }

    #[test]
    fn test_leaf_keeps_positionals() {
        let root = tree();
        match root.dispatch(&argv(&["network", "list", "extra"])).unwrap() {
            Dispatched::Leaf { rest, .. } => assert_eq!(rest, argv(&["extra"])),
            Dispatched::Help { .. } => panic!("expected leaf"),
        }
    }

    #[test]
    fn test_duplicate_child_rejected() {
        let err = CommandNode::group("x", "")
            .with_children(vec![
                CommandNode::leaf("a", "", Noop),
                CommandNode::leaf("a", "", Noop),
            ])
            .err()
            .expect("duplicate");
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_validate() {
        assert!(tree().validate().is_ok());

        let shadowing = CommandNode::group("stackit", "")
            .flags(FlagSet::new().string("region", None, ""))
            .with_children(vec![CommandNode::leaf("x", "", Noop)
                .flags(FlagSet::new().string("region", None, ""))])
            .unwrap();
        assert!(shadowing.validate().is_err());

        assert!(CommandNode::group("empty", "").validate().is_err());
    }

    #[test]
    fn test_osa_distance() {
        assert_eq!(osa_distance("network", "network"), 0);
        assert_eq!(osa_distance("netwrok", "network"), 1);
        assert_eq!(osa_distance("serer", "server"), 1);
        assert_eq!(osa_distance("abc", "xyz"), 3);
    }
}
