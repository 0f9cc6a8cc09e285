// Copyright © 2025 Stephan Kunz

//! Debug Interpreter errors.

use thiserror::Error;

use uuid::Uuid;

/// `debug` error type.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// Pass through from a single-step call.
    #[error("{0}")]
    Bot(#[from] crate::bot::Error),
    /// `/debug.step` was called for a bot id the Factory no longer holds — either it
    /// never existed, or a prior step already reached a terminal state and removed it.
    #[error("no debug bot [{0}]")]
    CantFindBot(Uuid),
}
