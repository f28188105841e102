// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command execution.
//!
//! Arguments are turned into an [`Action`] and the config is resolved
//! before any connection is attempted, so bad input never touches the
//! network.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info};
use wsrpc_core::{ClientConfig, RpcClient};

use crate::cli::Command;
use crate::error::{Error, Result};

/// What a command will do once connected.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Raw call with `[api, method, args]` params.
    Call(Value),
    ApiLookup(String),
    Login { user: String, password: String },
    Watch,
}

impl Action {
    pub fn from_command(command: &Command) -> Result<Self> {
        Ok(match command {
            Command::Call { api, method, args } => {
                Action::Call(call_params(api, method, args.as_deref())?)
            }
            Command::Api { name } => Action::ApiLookup(name.clone()),
            Command::Login { user, password } => Action::Login {
                user: user.clone(),
                password: password.clone(),
            },
            Command::Watch => Action::Watch,
        })
    }
}

/// Build `[api, method, args]`. The api is taken as JSON when it parses
/// (`0` is a number) and as a string otherwise.
pub fn call_params(api: &str, method: &str, args: Option<&str>) -> Result<Value> {
    let api = serde_json::from_str(api).unwrap_or_else(|_| Value::String(api.to_string()));
    let args = match args {
        None => json!([]),
        Some(raw) => {
            let parsed: Value =
                serde_json::from_str(raw).map_err(|e| Error::InvalidArgs(e.to_string()))?;
            if !parsed.is_array() {
                return Err(Error::InvalidArgs(format!("expected a JSON array, got {}", raw)));
            }
            parsed
        }
    };
    Ok(json!([api, method, args]))
}

/// Default config location: `<config_dir>/wsrpc/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("wsrpc").join("config.toml"))
}

/// Load the explicit config file, or the default one if it exists, then
/// apply the `--url` override.
pub fn resolve_config(url: Option<&str>, path: Option<&Path>) -> Result<ClientConfig> {
    let mut config = match path {
        Some(path) => ClientConfig::load(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => {
                debug!("using config {}", path.display());
                ClientConfig::load(&path)?
            }
            _ => ClientConfig::default(),
        },
    };
    if let Some(url) = url {
        config.url = url.to_string();
    }
    config.validate()?;
    Ok(config)
}

/// Connect, perform the action, and print the result as pretty JSON.
pub async fn execute(config: ClientConfig, action: Action, timeout: Duration) -> Result<()> {
    if action == Action::Watch {
        return watch(config).await;
    }

    let client = RpcClient::connect(config)?;
    let result = with_timeout(timeout, perform(&client, action)).await;
    client.close();

    let value = result?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn perform(client: &RpcClient, action: Action) -> Result<Value> {
    client.ready().await?;
    let value = match action {
        Action::Call(params) => client.call(params)?.await?,
        Action::ApiLookup(name) => client.get_api_by_name(&name)?.await?,
        Action::Login { user, password } => client.login(&user, &password).await?,
        Action::Watch => Value::Null,
    };
    Ok(value)
}

async fn with_timeout<T>(timeout: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| Error::Timeout(timeout.as_secs()))?
}

/// Print status notifications until Ctrl-C.
async fn watch(config: ClientConfig) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let reconnect_tx = tx.clone();

    let client = RpcClient::builder(config)
        .on_status(move |status| {
            let _ = tx.send(status.to_string());
        })
        .on_reconnect(move || {
            let _ = reconnect_tx.send("reconnected".to_string());
        })
        .connect()?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(line) = rx.recv() => println!("{}", line),
        }
    }

    info!("interrupted, closing");
    client.close();
    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
