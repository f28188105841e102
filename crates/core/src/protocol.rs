// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC wire messages.
//!
//! The protocol is one JSON object per transport message:
//! - Client sends `{"method":"call","params":[api, method, args],"id":N}`
//! - Server answers `{"id":N,"result":...}` or `{"id":N,"error":...}`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope method used for every outgoing request.
pub const CALL_METHOD: &str = "call";

/// A request sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    /// Always [`CALL_METHOD`].
    pub method: String,
    /// Opaque parameter list understood by the peer.
    pub params: Value,
    /// Correlation id, unique among outstanding requests.
    pub id: u64,
}

impl Request {
    /// Creates a `call` request.
    pub fn call(id: u64, params: Value) -> Self {
        Request {
            method: CALL_METHOD.to_string(),
            params,
            id,
        }
    }

    /// Serializes the request to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a request from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Outcome carried by a response, decided once when the message is decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The `result` field (`null` when absent).
    Success(Value),
    /// The `error` field. Takes precedence over any `result`.
    Failure(Value),
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Correlation id, `None` when missing or not an unsigned integer.
    pub id: Option<u64>,
    pub reply: Reply,
}

impl Response {
    /// Creates a successful response.
    pub fn success(id: u64, result: Value) -> Self {
        Response {
            id: Some(id),
            reply: Reply::Success(result),
        }
    }

    /// Creates a failed response.
    pub fn failure(id: u64, error: Value) -> Self {
        Response {
            id: Some(id),
            reply: Reply::Failure(error),
        }
    }

    /// Decodes an inbound message.
    ///
    /// Never fails: text that is not a JSON object becomes an unroutable
    /// diagnostic carrying only an error, which dispatch drops.
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(fields)) => Self::from_fields(fields),
            Ok(_) => Self::unparsable(text, "not a JSON object"),
            Err(e) => Self::unparsable(text, &e.to_string()),
        }
    }

    fn from_fields(mut fields: Map<String, Value>) -> Self {
        let id = fields.get("id").and_then(Value::as_u64);
        let reply = match fields.remove("error") {
            Some(error) => Reply::Failure(error),
            None => Reply::Success(fields.remove("result").unwrap_or(Value::Null)),
        };
        Response { id, reply }
    }

    fn unparsable(text: &str, reason: &str) -> Self {
        tracing::warn!("Unable to parse API response: {}", reason);
        Response {
            id: None,
            reply: Reply::Failure(Value::String(format!(
                "Unable to parse response {}",
                text
            ))),
        }
    }

    /// Returns true if this response carries an error.
    pub fn is_failure(&self) -> bool {
        matches!(self.reply, Reply::Failure(_))
    }

    /// Serializes the response to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut fields = Map::new();
        if let Some(id) = self.id {
            fields.insert("id".to_string(), Value::from(id));
        }
        match &self.reply {
            Reply::Success(result) => fields.insert("result".to_string(), result.clone()),
            Reply::Failure(error) => fields.insert("error".to_string(), error.clone()),
        };
        serde_json::to_string(&Value::Object(fields))
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
