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

//! The single gateway to stdout, stderr and stdin
//!
//! Results go to stdout. Diagnostics, prompts and spinner frames go to stderr,
//! filtered by verbosity.

use super::globals::{OutputFormat, Verbosity};
use super::output;
use crate::shared::error::{CancelCause, CliError, Result};
use colored::Colorize;
use serde::Serialize;
use std::fmt::Display;
use std::io::{BufRead, IsTerminal, Write};
use std::sync::{Arc, Mutex, MutexGuard};

pub type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

pub struct Printer {
    out: Mutex<Box<dyn Write + Send>>,
    err: SharedWriter,
    input: Mutex<Box<dyn BufRead + Send>>,
    verbosity: Verbosity,
    assume_yes: bool,
    stdin_is_terminal: bool,
    stderr_is_terminal: bool,
}

impl Printer {
    /// Non-interactive printer over arbitrary handles.
    pub fn new(
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
        input: Box<dyn BufRead + Send>,
    ) -> Self {
        Self {
            out: Mutex::new(out),
            err: Arc::new(Mutex::new(err)),
            input: Mutex::new(input),
            verbosity: Verbosity::Info,
            assume_yes: false,
            stdin_is_terminal: false,
            stderr_is_terminal: false,
        }
    }

    pub fn stdio() -> Self {
        let stdin_is_terminal = std::io::stdin().is_terminal();
        let stderr_is_terminal = std::io::stderr().is_terminal();
        Self::new(
            Box::new(std::io::stdout()),
            Box::new(std::io::stderr()),
            Box::new(std::io::BufReader::new(std::io::stdin())),
        )
        .with_terminals(stdin_is_terminal, stderr_is_terminal)
    }

    pub fn with_terminals(mut self, stdin: bool, stderr: bool) -> Self {
        self.stdin_is_terminal = stdin;
        self.stderr_is_terminal = stderr;
        self
    }

    pub fn configure(&mut self, verbosity: Verbosity, assume_yes: bool) {
        self.verbosity = verbosity;
        self.assume_yes = assume_yes;
        if !self.stderr_is_terminal {
            colored::control::set_override(false);
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn stdin_is_terminal(&self) -> bool {
        self.stdin_is_terminal
    }

    pub fn stderr_is_terminal(&self) -> bool {
        self.stderr_is_terminal
    }

    pub fn stderr(&self) -> SharedWriter {
        self.err.clone()
    }

    /// Writes to stdout as-is.
    pub fn output(&self, text: impl Display) -> Result<()> {
        let mut out = lock(&self.out);
        write!(out, "{}", text)?;
        out.flush()?;
        Ok(())
    }

    pub fn outputln(&self, text: impl Display) -> Result<()> {
        self.output(format_args!("{}\n", text))
    }

    pub fn debug(&self, message: impl Display) {
        if self.verbosity >= Verbosity::Debug {
            self.diagnostic(format_args!("{} {}", "[DEBUG]".bright_black(), message));
        }
    }

    pub fn info(&self, message: impl Display) {
        if self.verbosity >= Verbosity::Info {
            self.diagnostic(message);
        }
    }

    pub fn warn(&self, message: impl Display) {
        if self.verbosity >= Verbosity::Warning {
            self.diagnostic(format_args!("{} {}", "Warning:".yellow(), message));
        }
    }

    /// Always printed, whatever the verbosity.
    pub fn error(&self, message: impl Display) {
        self.diagnostic(format_args!("{} {}", "Error:".red(), message));
    }

    /// Raw text on stderr, e.g. help shown next to a usage error.
    pub fn stderr_text(&self, text: impl Display) {
        let mut err = lock(&self.err);
        let _ = write!(err, "{}", text);
        let _ = err.flush();
    }

    fn diagnostic(&self, message: impl Display) {
        self.stderr_text(format_args!("{}\n", message));
    }

    /// Succeeds on "y"/"yes". Without a terminal the prompt cannot be shown,
    /// so anything short of `--assume-yes` counts as declined.
    pub fn prompt_for_confirmation(&self, prompt: &str) -> Result<()> {
        if self.assume_yes {
            return Ok(());
        }
        if !self.stdin_is_terminal {
            tracing::debug!("stdin is not a terminal, declining \"{}\"", prompt);
            return Err(CliError::Canceled(CancelCause::Declined));
        }

        let answer = self.prompt_line(&format!("{} [y/N] ", prompt))?;
        match answer.to_ascii_lowercase().as_str() {
            "y" | "yes" => Ok(()),
            _ => Err(CliError::Canceled(CancelCause::Declined)),
        }
    }

    /// Shows `prompt` on stderr and reads one trimmed line from stdin.
    pub fn prompt_line(&self, prompt: &str) -> Result<String> {
        self.stderr_text(prompt);
        let mut line = String::new();
        lock(&self.input).read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    /// JSON or YAML for structured formats; `fallback` renders the human form.
    pub fn output_result<T, F>(&self, format: OutputFormat, value: &T, fallback: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&Printer) -> Result<()>,
    {
        match output::render(format, value)? {
            Some(text) => self.output(text),
            None => fallback(self),
        }
    }
}

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn lock_writer(w: &SharedWriter) -> MutexGuard<'_, Box<dyn Write + Send>> {
    lock(w)
}
