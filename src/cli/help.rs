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

//! Help text for a command node

use super::flags::{FlagDef, FlagKind, FlagValue};
use super::tree::{path_of, CommandNode};
use std::fmt::Write;

/// Renders help for the last node of `chain`. Global flags (declared on the
/// root) come before the node's own flags.
pub fn render_help(chain: &[&CommandNode]) -> String {
    let Some(node) = chain.last() else {
        return String::new();
    };
    let path = path_of(chain);
    let mut out = String::new();

    let description = if node.long.is_empty() {
        node.short
    } else {
        node.long
    };
    if !description.is_empty() {
        let _ = writeln!(out, "{}\n", description);
    }

    let _ = writeln!(out, "Usage:");
    if node.is_leaf() {
        let _ = writeln!(out, "  {}{} [flags]", path, node.args.usage_suffix());
    } else {
        let _ = writeln!(out, "  {} [command]", path);
    }

    if !node.examples.is_empty() {
        let _ = writeln!(out, "\nExamples:");
        for example in &node.examples {
            let _ = writeln!(out, "  {}\n  $ {}\n", example.description, example.command);
        }
        out.pop();
    }

    if !node.is_leaf() {
        write_commands(&mut out, node);
    }

    let is_root = chain.len() == 1;
    let local: Vec<&FlagDef> = node.flags.flags().iter().collect();
    let inherited: Vec<&FlagDef> = chain[..chain.len() - 1]
        .iter()
        .flat_map(|n| n.flags.flags().iter())
        .collect();

    if is_root {
        // the root's own flags are the global flags
        write_flags(&mut out, "Global Flags:", &local, Some(path.as_str()));
    } else {
        write_flags(&mut out, "Global Flags:", &inherited, Some(path.as_str()));
        if !local.is_empty() {
            write_flags(&mut out, "Flags:", &local, None);
        }
    }

    if !node.is_leaf() {
        let _ = writeln!(
            out,
            "\nUse \"{} [command] --help\" for more information about a command.",
            path
        );
    }
    out
}

fn write_commands(out: &mut String, node: &CommandNode) {
    let width = node
        .children()
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0);

    let mut categories: Vec<Option<&str>> = Vec::new();
    for child in node.children() {
        if !categories.contains(&child.category) {
            categories.push(child.category);
        }
    }
    // uncategorised commands first
    categories.sort_by_key(|c| c.is_some());

    for category in categories {
        match category {
            Some(name) => {
                let _ = writeln!(out, "\n{} Commands:", name);
            }
            None => {
                let _ = writeln!(out, "\nAvailable Commands:");
            }
        }
        for child in node.children().iter().filter(|c| c.category == category) {
            let _ = writeln!(out, "  {:<width$}  {}", child.name, child.short, width = width);
        }
    }
}

fn write_flags(out: &mut String, title: &str, flags: &[&FlagDef], help_for: Option<&str>) {
    let mut lines: Vec<(String, String)> = flags.iter().map(|f| flag_line(f)).collect();
    if let Some(path) = help_for {
        lines.push(("  -h, --help".to_string(), format!("Help for \"{}\"", path)));
    }
    if lines.is_empty() {
        return;
    }

    let width = lines.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
    let _ = writeln!(out, "\n{}", title);
    for (left, help) in lines {
        let pad = width - left.chars().count();
        let _ = writeln!(out, "{}{}   {}", left, " ".repeat(pad), help);
    }
}

fn flag_line(def: &FlagDef) -> (String, String) {
    let mut left = match def.short {
        Some(c) => format!("  -{}, --{}", c, def.name),
        None => format!("      --{}", def.name),
    };
    let type_name = def.kind.type_name();
    if !type_name.is_empty() {
        left.push(' ');
        left.push_str(type_name);
    }

    let mut help = def.help.to_string();
    if let Some(default) = &def.default {
        match (def.kind, default) {
            (FlagKind::Bool, FlagValue::Bool(false)) => {}
            (_, FlagValue::String(s)) => {
                let _ = write!(help, " (default \"{}\")", s);
            }
            (_, FlagValue::Bool(b)) => {
                let _ = write!(help, " (default {})", b);
            }
            (_, FlagValue::Int(i)) => {
                let _ = write!(help, " (default {})", i);
            }
            _ => {}
        }
    }
    (left, help)
}
