// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! wsrpc_cli - command line front end for wsrpc-core.
//!
//! Parses arguments with [`Cli`], resolves the client config (explicit
//! file, default file, `--url` override), and runs one command against the
//! server.

mod cli;
pub mod commands;
pub mod error;

pub use cli::{Cli, Command};
pub use commands::Action;
pub use error::{Error, Result};

use std::time::Duration;

/// Run a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let action = Action::from_command(&cli.command)?;
    let config = commands::resolve_config(cli.url.as_deref(), cli.config.as_deref())?;
    commands::execute(config, action, Duration::from_secs(cli.timeout)).await
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
