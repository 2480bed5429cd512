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

//! Value parsers shared by flags, environment variables and config values

use std::collections::BTreeMap;
use std::net::IpAddr;

pub fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Ok(true),
        "false" | "f" | "0" => Ok(false),
        _ => Err(format!("value \"{}\" is not a boolean", raw)),
    }
}

pub fn parse_int64(raw: &str) -> Result<i64, String> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| format!("value \"{}\" is not a valid integer", raw))
}

/// RFC 4122 textual form (`8-4-4-4-12`), case-insensitive. Returns the lowercase form.
pub fn parse_uuid(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("value cannot be empty, expected a UUID".to_string());
    }
    match uuid::Uuid::parse_str(raw) {
        Ok(id) if raw.len() == 36 => Ok(id.hyphenated().to_string()),
        _ => Err(format!("value \"{}\" is not a valid UUID", raw)),
    }
}

/// `address/prefix-length` for IPv4 or IPv6.
pub fn parse_cidr(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    let invalid = || format!("value \"{}\" is not a valid CIDR", raw);

    let (addr, prefix) = raw.split_once('/').ok_or_else(invalid)?;
    let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
    let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    if prefix > max {
        return Err(invalid());
    }
    Ok(raw.to_string())
}

/// Case-insensitive membership; returns the canonical spelling from `allowed`.
pub fn parse_enum(raw: &str, allowed: &[&str]) -> Result<String, String> {
    allowed
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(raw.trim()))
        .map(|c| c.to_string())
        .ok_or_else(|| {
            format!(
                "value \"{}\" is invalid, allowed values are: {}",
                raw,
                allowed.join(", ")
            )
        })
}

/// `@path` is replaced by the file's contents, anything else is kept as given.
pub fn read_from_file(raw: &str) -> Result<String, String> {
    match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("read file \"{}\": {}", path, e)),
        None => Ok(raw.to_string()),
    }
}

/// Parse one `key=value` pair.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid format \"{}\", expected key=value", raw))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in \"{}\"", raw));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Parse comma-separated `key=value` pairs into a map. Later keys win.
pub fn parse_key_values(raw: &str) -> Result<BTreeMap<String, String>, String> {
    let mut map = BTreeMap::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let (k, v) = parse_key_value(part)?;
        map.insert(k, v);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid() {
        assert_eq!(
            parse_uuid("3B4C1E5A-1C4F-4DB5-9B57-2A6D2B9E9B11").unwrap(),
            "3b4c1e5a-1c4f-4db5-9b57-2a6d2b9e9b11"
        );
        assert!(parse_uuid("").unwrap_err().contains("empty"));
        assert!(parse_uuid("not-a-uuid").unwrap_err().contains("UUID"));
        // simple (unhyphenated) form is not the textual form
        assert!(parse_uuid("3b4c1e5a1c4f4db59b572a6d2b9e9b11").is_err());
    }

    #[test]
    fn test_cidr() {
        assert!(parse_cidr("10.0.0.0/16").is_ok());
        assert!(parse_cidr("2001:db8::/32").is_ok());
        assert!(parse_cidr("10.0.0.0").is_err());
        assert!(parse_cidr("10.0.0.0/33").is_err());
        assert!(parse_cidr("10.0.0/8").is_err());
    }

    #[test]
    fn test_enum() {
        let allowed = ["default", "json", "yaml"];
        assert_eq!(parse_enum("JSON", &allowed).unwrap(), "json");
        let err = parse_enum("xml", &allowed).unwrap_err();
        assert!(err.contains("default, json, yaml"));
    }

    #[test]
    fn test_read_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("user-data.sh");
        std::fs::write(&path, "#!/bin/sh\necho hi\n").unwrap();

        let raw = format!("@{}", path.display());
        assert_eq!(read_from_file(&raw).unwrap(), "#!/bin/sh\necho hi\n");
        assert_eq!(read_from_file("inline").unwrap(), "inline");
        assert!(read_from_file("@/definitely/missing").is_err());
    }

    #[test]
    fn test_key_values() {
        let map = parse_key_values("env=prod, team = db").unwrap();
        assert_eq!(map.get("env").map(String::as_str), Some("prod"));
        assert_eq!(map.get("team").map(String::as_str), Some("db"));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_bool_and_int() {
        assert_eq!(parse_bool("TRUE"), Ok(true));
        assert_eq!(parse_bool("0"), Ok(false));
        assert!(parse_bool("yes").is_err());
        assert_eq!(parse_int64("-5"), Ok(-5));
        assert!(parse_int64("5GB").is_err());
    }
}
