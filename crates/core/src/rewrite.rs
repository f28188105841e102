// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Outgoing payload rewrites for calls that carry a method callback.
//!
//! Some remote methods accept a callback reference inside their arguments
//! and later answer through the same request id. A [`CallbackRule`] names
//! such a method and knows where the reference goes in its params; the
//! engine registers the callback locally and the rule writes the token the
//! peer sees.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::error::{Error, Result};

/// Method that broadcasts a transaction and signals confirmation later.
pub const BROADCAST_WITH_CALLBACK: &str = "broadcast_transaction_with_callback";

/// Extract the remote method name from a `[api, method, args]` param list.
pub fn method_name(params: &Value) -> Option<&str> {
    params.get(1).and_then(Value::as_str)
}

/// A payload rewrite keyed by remote method name.
pub trait CallbackRule: Send + Sync {
    /// The remote method this rule applies to.
    fn method(&self) -> &str;

    /// Write `token` into the outgoing params in place of the callback.
    fn substitute(&self, params: &mut Value, token: Value) -> Result<()>;
}

/// Rule for [`BROADCAST_WITH_CALLBACK`]: the token is the first element of
/// the argument list (`params[2][0]`).
#[derive(Debug, Clone, Copy, Default)]
pub struct BroadcastWithCallback;

impl CallbackRule for BroadcastWithCallback {
    fn method(&self) -> &str {
        BROADCAST_WITH_CALLBACK
    }

    fn substitute(&self, params: &mut Value, token: Value) -> Result<()> {
        let args = params
            .get_mut(2)
            .and_then(Value::as_array_mut)
            .ok_or_else(|| {
                Error::InvalidParams(format!("{} expects an argument list", BROADCAST_WITH_CALLBACK))
            })?;
        match args.first_mut() {
            Some(slot) => *slot = token,
            None => args.push(token),
        }
        Ok(())
    }
}

/// Registered rules, keyed by method name.
pub struct CallbackRules {
    rules: HashMap<String, Box<dyn CallbackRule>>,
}

impl CallbackRules {
    /// A rule set with no rules at all.
    pub fn empty() -> Self {
        CallbackRules {
            rules: HashMap::new(),
        }
    }

    /// Register a rule, replacing any rule for the same method.
    pub fn register(&mut self, rule: impl CallbackRule + 'static) {
        self.rules.insert(rule.method().to_string(), Box::new(rule));
    }

    /// Find the rule for the method named in `params`.
    pub fn find(&self, params: &Value) -> Option<&dyn CallbackRule> {
        let method = method_name(params)?;
        self.rules.get(method).map(|rule| rule.as_ref())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for CallbackRules {
    fn default() -> Self {
        let mut rules = Self::empty();
        rules.register(BroadcastWithCallback);
        rules
    }
}

impl fmt::Debug for CallbackRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self.rules.keys().collect();
        methods.sort();
        f.debug_struct("CallbackRules")
            .field("methods", &methods)
            .finish()
    }
}

#[cfg(test)]
#[path = "rewrite_tests.rs"]
mod tests;
