// Copyright © 2025 Stephan Kunz

//! Script Host errors.

use thiserror::Error;

/// Errors produced while loading the prelude or evaluating a node script.
#[derive(Error, Debug)]
pub enum Error {
    /// Pass through from the embedded scripting engine.
    #[error("{0}")]
    Scripting(#[from] tinyscript::Error),
    /// Pass through from the engine's environment (blackboard) access.
    #[error("{0}")]
    Environment(#[from] tinyscript::environment::Error),
}
