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

use crate::shared::exitcode;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

/// Discriminant the top-level handler routes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Usage,
    InputInvariant,
    MissingProjectId,
    Config,
    Auth,
    RemoteApi,
    Timeout,
    Canceled,
    Output,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    /// The user answered "no" (or could not be asked).
    Declined,
    /// SIGINT/SIGTERM
    Interrupted,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelCause::Declined => write!(f, "operation canceled"),
            CancelCause::Interrupted => write!(f, "operation canceled: interrupted"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("unknown command \"{name}\" for \"{parent}\"{}", did_you_mean(.suggestion))]
    UnknownCommand {
        parent: String,
        name: String,
        suggestion: Option<String>,
    },

    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("invalid argument \"{raw}\" for \"--{flag}\" flag: {reason}")]
    BadValue {
        flag: String,
        raw: String,
        reason: String,
    },

    #[error("required flag \"--{0}\" not set")]
    MissingRequired(String),

    #[error("if any flags in the group [{}] are set none of the others can be; more than one were set", .0.join(" "))]
    MutuallyExclusive(Vec<String>),

    #[error("at least one of the flags in the group [{}] is required", .0.join(" "))]
    OneRequired(Vec<String>),

    #[error("{0}")]
    InvalidArgs(String),
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!("\n\nDid you mean this?\n\t{}", s),
        None => String::new(),
    }
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{error}")]
    Usage { command: String, error: UsageError },

    #[error("{message}")]
    InputInvariant { command: String, message: String },

    #[error("project ID is not set")]
    MissingProjectId,

    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Auth(String),

    #[error("API request failed with status {status}: {body}")]
    RemoteApi {
        status: u16,
        body: String,
        /// Server `Retry-After` hint, usually sent with 429 and 503.
        retry_after: Option<Duration>,
    },

    #[error("{operation} failed: resource reached state {state}")]
    OperationFailed { operation: String, state: String },

    #[error("timeout waiting for {operation} (last state: {last_state})")]
    Timeout {
        operation: String,
        last_state: String,
    },

    #[error("{0}")]
    Canceled(CancelCause),

    #[error("render output: {0}")]
    Output(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("duplicate command \"{name}\" under \"{parent}\"")]
    DuplicateCommand { parent: String, name: String },

    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<CliError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl CliError {
    pub fn usage(command: impl Into<String>, error: UsageError) -> Self {
        Self::Usage {
            command: command.into(),
            error,
        }
    }

    pub fn invariant(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InputInvariant {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn config_error(context: impl Into<String>) -> Self {
        Self::Config(context.into())
    }

    pub fn auth(context: impl Into<String>) -> Self {
        Self::Auth(context.into())
    }

    pub fn remote_api(status: u16, body: impl Into<String>) -> Self {
        Self::RemoteApi {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    pub fn throttled(status: u16, body: impl Into<String>, retry_after: Duration) -> Self {
        Self::RemoteApi {
            status,
            body: body.into(),
            retry_after: Some(retry_after),
        }
    }

    pub fn internal(context: impl Into<String>) -> Self {
        Self::Internal(context.into())
    }

    /// Wraps the error with a context string while keeping its discriminant.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error below any context layers.
    pub fn root(&self) -> &CliError {
        match self {
            CliError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            CliError::Usage { .. } => ErrorKind::Usage,
            CliError::InputInvariant { .. } => ErrorKind::InputInvariant,
            CliError::MissingProjectId => ErrorKind::MissingProjectId,
            CliError::Config(_) | CliError::TomlParse(_) | CliError::TomlEncode(_) => {
                ErrorKind::Config
            }
            CliError::Auth(_) => ErrorKind::Auth,
            CliError::RemoteApi { .. }
            | CliError::OperationFailed { .. }
            | CliError::Transport(_) => ErrorKind::RemoteApi,
            CliError::Timeout { .. } => ErrorKind::Timeout,
            CliError::Canceled(_) => ErrorKind::Canceled,
            CliError::Output(_) | CliError::Json(_) | CliError::Yaml(_) => ErrorKind::Output,
            CliError::Internal(_) | CliError::DuplicateCommand { .. } | CliError::Io(_) => {
                ErrorKind::Internal
            }
            CliError::Context { .. } => ErrorKind::Internal,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Usage | ErrorKind::InputInvariant | ErrorKind::MissingProjectId => {
                exitcode::USAGE
            }
            ErrorKind::Config | ErrorKind::Auth => exitcode::CONFIG,
            ErrorKind::RemoteApi => exitcode::REMOTE_API,
            ErrorKind::Timeout => exitcode::TIMEOUT,
            ErrorKind::Canceled => match self.root() {
                CliError::Canceled(CancelCause::Interrupted) => exitcode::INTERRUPTED,
                _ => exitcode::DECLINED,
            },
            ErrorKind::Output | ErrorKind::Internal => exitcode::INTERNAL,
        }
    }

    /// Command path whose help should accompany the error, if any.
    pub fn help_target(&self) -> Option<&str> {
        match self.root() {
            CliError::Usage { command, .. } | CliError::InputInvariant { command, .. } => {
                Some(command.as_str())
            }
            _ => None,
        }
    }

    /// Server hint for when to retry a remote failure.
    pub fn retry_after(&self) -> Option<Duration> {
        match self.root() {
            CliError::RemoteApi { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status of a remote failure.
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            CliError::RemoteApi { status, .. } => Some(*status),
            CliError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_preserves_kind() {
        let err = CliError::remote_api(404, "not found")
            .context("get instance")
            .context("describe");
        assert_eq!(err.kind(), ErrorKind::RemoteApi);
        assert_eq!(err.exit_code(), exitcode::REMOTE_API);
        assert_eq!(
            err.to_string(),
            "describe: get instance: API request failed with status 404: not found"
        );
    }

    #[test]
    fn test_retry_after_survives_context() {
        let err = CliError::throttled(429, "slow down", Duration::from_secs(7)).context("poll");
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(CliError::remote_api(503, "busy").retry_after(), None);
    }

    #[test]
    fn test_exit_codes() {
        let usage = CliError::usage("stackit", UsageError::UnknownFlag("--foo".into()));
        assert_eq!(usage.exit_code(), 2);
        assert_eq!(CliError::MissingProjectId.exit_code(), 2);
        assert_eq!(CliError::auth("no credentials").exit_code(), 3);
        assert_eq!(
            CliError::Timeout {
                operation: "x".into(),
                last_state: "PENDING".into()
            }
            .exit_code(),
            5
        );
        assert_eq!(CliError::Canceled(CancelCause::Declined).exit_code(), 6);
        assert_eq!(CliError::Canceled(CancelCause::Interrupted).exit_code(), 130);
        assert_eq!(CliError::internal("boom").exit_code(), 1);
    }

    #[test]
    fn test_unknown_command_suggestion() {
        let err = UsageError::UnknownCommand {
            parent: "stackit".into(),
            name: "netwrok".into(),
            suggestion: Some("network".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("unknown command \"netwrok\""));
        assert!(msg.contains("Did you mean this?"));
        assert!(msg.contains("network"));
    }

    #[test]
    fn test_help_target_through_context() {
        let err = CliError::invariant("stackit postgresql instance update", "nothing to update")
            .context("update instance");
        assert_eq!(err.help_target(), Some("stackit postgresql instance update"));
    }
}
