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

//! Positional argument specifications

use super::parsers;
use crate::shared::error::UsageError;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    Any,
    Uuid,
    /// Lowercase RFC 1123 label, at most 63 characters.
    DnsLabel,
}

impl Validator {
    pub fn check(&self, raw: &str) -> Result<(), String> {
        match self {
            Validator::Any => Ok(()),
            Validator::Uuid => parsers::parse_uuid(raw).map(|_| ()),
            Validator::DnsLabel => {
                static LABEL: OnceLock<Option<Regex>> = OnceLock::new();
                let re = LABEL
                    .get_or_init(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").ok())
                    .as_ref()
                    .ok_or_else(|| "label pattern failed to compile".to_string())?;
                if raw.len() <= 63 && re.is_match(raw) {
                    Ok(())
                } else {
                    Err(format!(
                        "value \"{}\" must consist of lowercase alphanumeric characters or '-', \
                         start and end with an alphanumeric character and be at most 63 characters",
                        raw
                    ))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionalArgs {
    None,
    /// One named validator per position, in order.
    ExactlyN(&'static [(&'static str, Validator)]),
    Single(&'static str, Validator),
}

impl PositionalArgs {
    pub fn validate(&self, args: &[String]) -> Result<(), UsageError> {
        match self {
            PositionalArgs::None => {
                if let Some(first) = args.first() {
                    return Err(UsageError::InvalidArgs(format!(
                        "unexpected argument \"{}\", this command accepts no arguments",
                        first
                    )));
                }
                Ok(())
            }
            PositionalArgs::ExactlyN(positions) => {
                if args.len() != positions.len() {
                    return Err(UsageError::InvalidArgs(format!(
                        "accepts {} arg(s), received {}",
                        positions.len(),
                        args.len()
                    )));
                }
                for (arg, (name, validator)) in args.iter().zip(positions.iter()) {
                    check(arg, name, *validator)?;
                }
                Ok(())
            }
            PositionalArgs::Single(name, validator) => {
                if args.len() != 1 {
                    return Err(UsageError::InvalidArgs(format!(
                        "expected exactly one {} argument, received {}",
                        name,
                        args.len()
                    )));
                }
                check(&args[0], name, *validator)
            }
        }
    }

    /// Suffix for the usage line, e.g. ` INSTANCE_ID`.
    pub fn usage_suffix(&self) -> String {
        match self {
            PositionalArgs::None => String::new(),
            PositionalArgs::ExactlyN(positions) => positions
                .iter()
                .map(|(name, _)| format!(" {}", name))
                .collect(),
            PositionalArgs::Single(name, _) => format!(" {}", name),
        }
    }
}

fn check(arg: &str, name: &str, validator: Validator) -> Result<(), UsageError> {
    validator
        .check(arg)
        .map_err(|reason| UsageError::InvalidArgs(format!("invalid {} \"{}\": {}", name, arg, reason)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_none() {
        assert!(PositionalArgs::None.validate(&[]).is_ok());
        assert!(PositionalArgs::None.validate(&owned(&["x"])).is_err());
    }

    #[test]
    fn test_single_uuid() {
        let spec = PositionalArgs::Single("INSTANCE_ID", Validator::Uuid);
        assert!(spec
            .validate(&owned(&["3b4c1e5a-1c4f-4db5-9b57-2a6d2b9e9b11"]))
            .is_ok());
        let err = spec.validate(&owned(&["nope"])).unwrap_err();
        assert!(err.to_string().contains("INSTANCE_ID"));
        assert!(spec.validate(&[]).is_err());
        assert_eq!(spec.usage_suffix(), " INSTANCE_ID");
    }

    #[test]
    fn test_exactly_n_validates_each_position() {
        let spec = PositionalArgs::ExactlyN(&[
            ("INSTANCE_ID", Validator::Uuid),
            ("USERNAME", Validator::DnsLabel),
        ]);
        assert!(spec
            .validate(&owned(&["3b4c1e5a-1c4f-4db5-9b57-2a6d2b9e9b11", "app-user"]))
            .is_ok());

        let err = spec.validate(&owned(&["app-user", "app-user"])).unwrap_err();
        assert!(err.to_string().contains("INSTANCE_ID"), "{}", err);

        let err = spec
            .validate(&owned(&["3b4c1e5a-1c4f-4db5-9b57-2a6d2b9e9b11", "-web"]))
            .unwrap_err();
        assert!(err.to_string().contains("USERNAME"), "{}", err);

        assert!(spec.validate(&owned(&["app-user"])).is_err());
        assert_eq!(spec.usage_suffix(), " INSTANCE_ID USERNAME");
        assert!(Validator::DnsLabel.check(&"a".repeat(64)).is_err());
    }
}
