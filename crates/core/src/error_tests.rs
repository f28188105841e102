// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    remote = { CallError::Remote(json!("bad sig")), "bad sig" },
    closed = { CallError::ConnectionClosed, "connection closed" },
    transport = { CallError::Transport("reset by peer".into()), "reset by peer" },
)]
fn call_error_display_contains(err: CallError, expected: &str) {
    assert!(err.to_string().contains(expected));
}

#[test]
fn connection_closed_has_fixed_reason() {
    assert_eq!(CallError::ConnectionClosed.to_string(), "connection closed");
}

#[test]
fn error_no_callback_rule_names_method() {
    let err = Error::NoCallbackRule("broadcast_later".into());
    let msg = err.to_string();
    assert!(msg.contains("broadcast_later"));
    assert!(msg.contains("hint"));
}

#[test]
fn error_from_call_error_is_transparent() {
    let err: Error = CallError::ConnectionClosed.into();
    assert!(matches!(err, Error::Call(CallError::ConnectionClosed)));
    assert_eq!(err.to_string(), "connection closed");
}

#[test]
fn error_from_json() {
    let json_err = serde_json::from_str::<()>("invalid").unwrap_err();
    let err: Error = json_err.into();
    assert!(matches!(err, Error::Json(_)));
}

#[test]
fn error_from_toml() {
    let toml_err = toml::from_str::<toml::Table>("= nope").unwrap_err();
    let err: Error = toml_err.into();
    assert!(matches!(err, Error::Toml(_)));
}
