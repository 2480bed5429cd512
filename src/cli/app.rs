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

//! One invocation from argv to exit code

use super::commands;
use super::flags::{FlagSet, ParsedFlags, ValueSource};
use super::globals::{GlobalFlagModel, Verbosity};
use super::help::render_help;
use super::input;
use super::runtime::{Invocation, Runtime};
use super::tree::{path_of, CommandNode, Dispatched};
use crate::shared::error::{CancelCause, CliError, ErrorKind, Result};
use crate::shared::exitcode;

/// Runs `argv` (without the program name) and returns the process exit code.
/// Errors are reported on stderr before returning.
pub async fn run(argv: &[String], runtime: &mut Runtime) -> i32 {
    let root = match commands::root() {
        Ok(root) => root,
        Err(err) => {
            runtime.printer.error(&err);
            return err.exit_code();
        }
    };

    match execute(&root, argv, runtime).await {
        Ok(()) => exitcode::OK,
        Err(err) => {
            report(&root, &err, runtime);
            err.exit_code()
        }
    }
}

async fn execute(root: &CommandNode, argv: &[String], runtime: &mut Runtime) -> Result<()> {
    let (chain, rest) = match root.dispatch(argv)? {
        Dispatched::Help { chain } => return runtime.printer.output(render_help(&chain)),
        Dispatched::Leaf { chain, rest } => (chain, rest),
    };
    let path = path_of(&chain);
    let leaf = chain
        .last()
        .copied()
        .ok_or_else(|| CliError::internal("empty command chain"))?;
    let sets: Vec<&FlagSet> = chain.iter().map(|node| &node.flags).collect();

    let line = input::parse_command_line(&path, &sets, &rest)?;
    leaf.args
        .validate(&line.positional)
        .map_err(|e| CliError::usage(path.clone(), e))?;
    let flags = input::resolve(&path, &sets, line.values, &runtime.env, &runtime.config)?;

    let global = GlobalFlagModel::from_flags(&flags);
    runtime.printer.configure(global.verbosity, global.assume_yes);
    init_logging(global.verbosity);

    input::check_constraints(&path, &sets, &flags)?;
    apply_overrides(&root.flags, &flags, runtime);

    let action = leaf
        .action()
        .ok_or_else(|| CliError::internal(format!("command \"{}\" has no action", path)))?;
    tracing::debug!("running \"{}\"", path);

    let cancel = runtime.cancel.clone();
    let result = {
        let mut inv = Invocation {
            runtime: &mut *runtime,
            command_path: path,
            args: line.positional,
            flags,
            global,
        };
        tokio::select! {
            result = action.run(&mut inv) => result,
            _ = cancel.cancelled() => Err(CliError::Canceled(CancelCause::Interrupted)),
        }
    };

    let saved = runtime.config.save_if_dirty();
    result?;
    saved
}

/// Global flags given on the command line shadow the config file for the rest
/// of the process without being written back.
fn apply_overrides(globals: &FlagSet, flags: &ParsedFlags, runtime: &mut Runtime) {
    for def in globals.flags() {
        if flags.source(def.name) != Some(ValueSource::CommandLine) {
            continue;
        }
        if let (Some(key), Some(value)) = (def.config_key, flags.get(def.name)) {
            runtime.config.set_override(key, value.to_toml());
        }
    }
}

fn report(root: &CommandNode, err: &CliError, runtime: &Runtime) {
    let printer = &runtime.printer;
    printer.error(err);

    match err.kind() {
        ErrorKind::MissingProjectId => printer.stderr_text(
            "Set a default with \"stackit config set --project-id xxx\" or pass \"--project-id\".\n",
        ),
        ErrorKind::Internal => printer.debug(format!("{:?}", err)),
        _ => {}
    }

    if let Some(target) = err.help_target() {
        let names: Vec<&str> = target.split_whitespace().skip(1).collect();
        if let Some(chain) = root.find(&names) {
            printer.stderr_text(format!("\n{}", render_help(&chain)));
        }
    }
}

/// Installs the tracing subscriber once per process. Diagnostics go to stderr
/// so stdout stays parseable.
pub fn init_logging(verbosity: Verbosity) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(verbosity.tracing_level())
        .with_target(false)
        .without_time()
        .try_init();
}
