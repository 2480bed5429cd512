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

//! Release and CI chores for `stackit`
//!
//! Usage: cargo xtask <task>

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use xshell::{cmd, Shell};

const BIN: &str = "stackit";
const PACKAGE: &str = "stackit-cli";

/// Integration suites under `tests/`.
const SUITES: [&str; 2] = ["integration_test", "config_test"];

#[derive(Parser)]
#[command(name = "xtask", about = "Release and CI chores for the stackit CLI")]
struct Cli {
    #[command(subcommand)]
    task: Task,
}

#[derive(Subcommand)]
enum Task {
    /// Run the test suites
    Test {
        #[arg(long, value_enum, default_value_t = Scope::All)]
        scope: Scope,
    },
    /// Formatting, clippy and every test suite, failing on the first error
    Ci,
    /// Build a release binary and pack it as stackit-<target>.tar.gz
    Dist {
        /// Target triple; the host target when omitted
        #[arg(long)]
        target: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scope {
    All,
    Unit,
    Integration,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;
    sh.change_dir(project_root());

    match cli.task {
        Task::Test { scope } => test(&sh, scope),
        Task::Ci => ci(&sh),
        Task::Dist { target } => dist(&sh, target.as_deref()),
    }
}

fn test(sh: &Shell, scope: Scope) -> Result<()> {
    if scope != Scope::Integration {
        cmd!(sh, "cargo test -p {PACKAGE} --lib").run()?;
    }
    if scope != Scope::Unit {
        for suite in SUITES {
            cmd!(sh, "cargo test -p {PACKAGE} --test {suite}")
                .run()
                .with_context(|| format!("suite {} failed", suite))?;
        }
    }
    Ok(())
}

fn ci(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo fmt --all -- --check").run()?;
    cmd!(sh, "cargo clippy --workspace --all-targets --all-features -- -D warnings").run()?;
    test(sh, Scope::All)?;
    println!("✅ CI checks passed");
    Ok(())
}

fn dist(sh: &Shell, target: Option<&str>) -> Result<()> {
    let (binary, label) = match target {
        Some(triple) => {
            cmd!(sh, "cargo build --release --bin {BIN} --target {triple}").run()?;
            (format!("target/{}/release/{}", triple, BIN), triple.to_string())
        }
        None => {
            cmd!(sh, "cargo build --release --bin {BIN}").run()?;
            (format!("target/release/{}", BIN), host_target(sh)?)
        }
    };

    let staging = project_root().join("dist");
    sh.remove_path(&staging)?;
    sh.create_dir(&staging)?;
    sh.copy_file(&binary, staging.join(BIN))?;

    // Name must match the cargo-binstall pkg-url in Cargo.toml.
    let archive = format!("{}-{}.tar.gz", BIN, label);
    cmd!(sh, "tar -czf {archive} -C dist {BIN}")
        .run()
        .context("creating release archive")?;

    println!("📦 {}", archive);
    Ok(())
}

fn host_target(sh: &Shell) -> Result<String> {
    let info = cmd!(sh, "rustc -vV").read()?;
    match info.lines().find_map(|l| l.strip_prefix("host: ")) {
        Some(host) => Ok(host.trim().to_string()),
        None => bail!("rustc -vV did not report a host target"),
    }
}

fn project_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .unwrap_or(manifest_dir)
        .to_path_buf()
}
