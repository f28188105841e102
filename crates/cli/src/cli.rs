// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};

const QUICKSTART_HELP: &str = "\
Get started:
  wsrpc api database                      Look up the database api id
  wsrpc call 0 get_objects '[[\"2.1.0\"]]'  Call a method on api 0
  wsrpc login alice secret                Log in
  wsrpc watch                             Print connection status changes";

#[derive(Parser)]
#[command(name = "wsrpc")]
#[command(about = "Issue JSON-RPC calls over a reconnecting WebSocket")]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Server URL (overrides the config file)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Config file (TOML, or JSON with a .json extension)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Seconds to wait for each reply
    #[arg(
        long,
        global = true,
        default_value = "30",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Call a method on an api
    #[command(after_help = "Examples:\n  \
        wsrpc call 0 get_chain_id                Call without arguments\n  \
        wsrpc call 0 get_block '[42]'            Call with positional arguments\n  \
        wsrpc call database get_objects '[[]]'   Address the api by name")]
    Call {
        /// Api id (JSON when it parses, a string otherwise)
        api: String,

        /// Method name
        method: String,

        /// Arguments as a JSON array
        args: Option<String>,
    },

    /// Look up an api id by name
    Api {
        /// Api name (e.g. database, network_broadcast)
        name: String,
    },

    /// Log in once the connection is ready
    Login { user: String, password: String },

    /// Print connection status changes until interrupted
    Watch,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
