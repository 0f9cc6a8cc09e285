// Copyright © 2025 Stephan Kunz

//! Per-bot blackboard: a flat `meta` table visible to every script a bot runs.

pub mod error;

use std::collections::HashMap;

use tinyscript::{Environment, ScriptingValue, environment};

use crate::ConstString;

pub use error::Error;

/// A per-bot key→value scratchpad.
///
/// Owned exclusively by one [`crate::bot::Bot`]; mutating one bot's blackboard never
/// affects another's, even when both bots share the same [`crate::tree::Tree`].
#[derive(Clone, Debug, Default)]
pub struct Blackboard {
    entries: HashMap<ConstString, ScriptingValue>,
}

impl Blackboard {
    /// An empty blackboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a value by key, without going through the scripting engine.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ScriptingValue> {
        self.entries.get(key)
    }

    /// Write a value by key, without going through the scripting engine.
    ///
    /// Used by the Bot Interpreter to inject HTTP response fields after a call
    /// completes.
    pub fn set(&mut self, key: impl Into<ConstString>, value: ScriptingValue) {
        self.entries.insert(key.into(), value);
    }

    /// Remove a key, returning its previous value if present.
    pub fn remove(&mut self, key: &str) -> Option<ScriptingValue> {
        self.entries.remove(key)
    }

    /// Whether `key` currently holds a value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// A pretty-printed dump of every entry, sorted by key for determinism.
    ///
    /// This is the debug UI's view of a bot's script state (`get_blackboard`).
    #[must_use]
    pub fn dump(&self) -> String {
        let mut keys: Vec<&ConstString> = self.entries.keys().collect();
        keys.sort();
        let mut out = String::from("{\n");
        for key in keys {
            let value = &self.entries[key];
            out.push_str(&format!("  {key}: {},\n", format_value(value)));
        }
        out.push('}');
        out
    }
}

fn format_value(value: &ScriptingValue) -> String {
    match value {
        ScriptingValue::Nil() => "nil".to_string(),
        ScriptingValue::Boolean(b) => b.to_string(),
        ScriptingValue::Float64(f) => f.to_string(),
        ScriptingValue::Int64(i) => i.to_string(),
        ScriptingValue::String(s) => format!("{s:?}"),
    }
}

impl Environment for Blackboard {
    fn define_env(&mut self, key: &str, value: ScriptingValue) -> Result<(), environment::Error> {
        self.entries.insert(key.into(), value);
        Ok(())
    }

    fn get_env(&self, name: &str) -> Result<ScriptingValue, environment::Error> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| environment::Error::EnvVarNotDefined { name: name.into() })
    }

    fn set_env(&mut self, name: &str, value: ScriptingValue) -> Result<(), environment::Error> {
        if !self.entries.contains_key(name) {
            return Err(environment::Error::EnvVarNotDefined { name: name.into() });
        }
        self.entries.insert(name.into(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_between_instances() {
        let mut a = Blackboard::new();
        let mut b = Blackboard::new();
        a.set("v", ScriptingValue::Int64(1));
        b.set("v", ScriptingValue::Int64(2));
        assert_eq!(a.get("v"), Some(&ScriptingValue::Int64(1)));
        assert_eq!(b.get("v"), Some(&ScriptingValue::Int64(2)));
    }

    #[test]
    fn dump_is_sorted_and_readable() {
        let mut bb = Blackboard::new();
        bb.set("b", ScriptingValue::Boolean(true));
        bb.set("a", ScriptingValue::String("x".into()));
        let dump = bb.dump();
        assert!(dump.find("a:").unwrap() < dump.find("b:").unwrap());
    }
}
