// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::fs;
use yare::parameterized;

#[parameterized(
    numeric_api = { "0", None, json!([0, "m", []]) },
    named_api = { "database", None, json!(["database", "m", []]) },
    with_args = { "2", Some("[1, \"two\", {\"three\": 3}]"), json!([2, "m", [1, "two", {"three": 3}]]) },
    empty_args = { "1", Some("[]"), json!([1, "m", []]) },
)]
fn test_call_params(api: &str, args: Option<&str>, expected: Value) {
    assert_eq!(call_params(api, "m", args).unwrap(), expected);
}

#[parameterized(
    object = { "{}" },
    scalar = { "42" },
    not_json = { "[1," },
)]
fn test_call_params_rejects(args: &str) {
    let err = call_params("0", "m", Some(args)).unwrap_err();
    assert!(matches!(err, Error::InvalidArgs(_)));
}

#[test]
fn test_action_from_command() {
    let action = Action::from_command(&Command::Api {
        name: "database".to_string(),
    })
    .unwrap();
    assert_eq!(action, Action::ApiLookup("database".to_string()));

    let action = Action::from_command(&Command::Call {
        api: "0".to_string(),
        method: "get_block".to_string(),
        args: Some("[7]".to_string()),
    })
    .unwrap();
    assert_eq!(action, Action::Call(json!([0, "get_block", [7]])));
}

#[test]
fn test_resolve_config_from_file_with_url_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "url = \"ws://file.example:1\"\nreconnect_interval_ms = 500\n",
    )
    .unwrap();

    let config = resolve_config(None, Some(&path)).unwrap();
    assert_eq!(config.url, "ws://file.example:1");
    assert_eq!(config.reconnect_interval_ms, 500);

    let config = resolve_config(Some("wss://override.example"), Some(&path)).unwrap();
    assert_eq!(config.url, "wss://override.example");
    assert_eq!(config.reconnect_interval_ms, 500);
}

#[test]
fn test_resolve_config_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"url": "ws://json.example:2", "timeout_interval_ms": 100}"#).unwrap();

    let config = resolve_config(None, Some(&path)).unwrap();
    assert_eq!(config.url, "ws://json.example:2");
    assert_eq!(config.timeout_interval_ms, 100);
}

#[test]
fn test_resolve_config_rejects_bad_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "").unwrap();

    let err = resolve_config(Some("localhost:8090"), Some(&path)).unwrap_err();
    assert!(matches!(err, Error::Rpc(wsrpc_core::Error::Config(_))));
}

#[test]
fn test_default_config_path_is_under_wsrpc() {
    if let Some(path) = default_config_path() {
        assert!(path.ends_with("wsrpc/config.toml"));
    }
}
