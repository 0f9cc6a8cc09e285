// Copyright © 2025 Stephan Kunz

//! The Script Host: a per-bot embedded script evaluator.
//!
//! Wraps [`tinyscript`] against the contract §4.B calls for — `{load_prelude, eval, set,
//! dump}` — and nothing more, so a differently engined implementation could be swapped
//! in behind the same four operations.

pub mod error;

use std::sync::Arc;

use parking_lot::Mutex;
use tinyscript::{Runtime, ScriptingValue, SharedRuntime};

use crate::ConstString;
use crate::blackboard::Blackboard;

pub use error::Error;

/// Per-bot script evaluator: one embedded runtime plus one exclusively-owned
/// [`Blackboard`].
pub struct ScriptHost {
    runtime: SharedRuntime,
    blackboard: Blackboard,
}

impl ScriptHost {
    /// A fresh host with an empty blackboard.
    ///
    /// `SharedRuntime` is `tinyscript`'s own `Arc<Mutex<Runtime>>` alias; which `Mutex`
    /// that resolves to depends on `tinyscript`'s `std` feature, which this crate's
    /// `Cargo.toml` enables explicitly (disabling `tinyscript`'s default features
    /// first), exactly as the teacher's `tree.rs` builds its runtime under its own
    /// `std` feature — giving `parking_lot::Mutex` here, not the `no_std` `spin::Mutex`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            runtime: Arc::new(Mutex::new(Runtime::default())),
            blackboard: Blackboard::new(),
        }
    }

    /// Runs the global define once, at bot construction. Errors here fail bot creation.
    pub fn load_prelude(&mut self, code: &str) -> Result<(), Error> {
        if code.is_empty() {
            return Ok(());
        }
        self.runtime.lock().run(code, &mut self.blackboard)?;
        Ok(())
    }

    /// Evaluates a node's script with the blackboard visible as `meta`.
    pub fn eval(&mut self, snippet: &str) -> Result<ScriptingValue, Error> {
        Ok(self.runtime.lock().run(snippet, &mut self.blackboard)?)
    }

    /// A pretty-printed dump of the blackboard, used by the debug UI.
    #[must_use]
    pub fn dump(&self) -> String {
        self.blackboard.dump()
    }

    /// Injects a value into the blackboard directly, bypassing the script engine.
    ///
    /// Used by the interpreter to write decoded HTTP response fields.
    pub fn set(&mut self, key: impl Into<ConstString>, value: ScriptingValue) {
        self.blackboard.set(key, value);
    }

    /// Shared read access to the blackboard, e.g. for response field lookups.
    #[must_use]
    pub const fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }
}

impl Default for ScriptHost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_eval_round_trips() {
        let mut host = ScriptHost::new();
        host.set("v", ScriptingValue::Int64(41));
        let result = host.eval("meta.v + 1").expect("eval succeeds");
        assert_eq!(result, ScriptingValue::Int64(42));
    }

    #[test]
    fn prelude_seeds_blackboard() {
        let mut host = ScriptHost::new();
        host.load_prelude("meta.seeded = true").expect("prelude runs");
        assert_eq!(host.blackboard().get("seeded"), Some(&ScriptingValue::Boolean(true)));
    }
}
