// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors reported by the wsrpc command line.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid arguments: {0}\n  hint: arguments must be a JSON array, e.g. '[1, \"two\"]'")]
    InvalidArgs(String),

    #[error("timed out after {0}s waiting for a reply")]
    Timeout(u64),

    #[error(transparent)]
    Rpc(#[from] wsrpc_core::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<wsrpc_core::CallError> for Error {
    fn from(err: wsrpc_core::CallError) -> Self {
        Error::Rpc(err.into())
    }
}

/// A specialized Result type for the wsrpc command line.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
