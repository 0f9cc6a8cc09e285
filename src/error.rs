// Copyright © 2025 Stephan Kunz

//! `botswarm` errors.

use thiserror::Error;

/// Result type definition used throughout this crate.
pub type BotswarmResult<Output> = Result<Output, Error>;

/// Aggregated `botswarm` error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Pass through from `crate::tree::Error`
    #[error("{0}")]
    Tree(#[from] crate::tree::Error),
    /// Pass through from `crate::blackboard::Error`
    #[error("{0}")]
    Blackboard(#[from] crate::blackboard::Error),
    /// Pass through from `crate::script::Error`
    #[error("{0}")]
    Script(#[from] crate::script::Error),
    /// Pass through from `crate::bot::Error`
    #[error("{0}")]
    Bot(#[from] crate::bot::Error),
    /// Pass through from `crate::batch::Error`
    #[error("{0}")]
    Batch(#[from] crate::batch::Error),
    /// Pass through from `crate::factory::Error`
    #[error("{0}")]
    Factory(#[from] crate::factory::Error),
    /// Pass through from `crate::storage::Error`
    #[error("{0}")]
    Storage(#[from] crate::storage::Error),
    /// Pass through from `crate::debug::Error`
    #[error("{0}")]
    Debug(#[from] crate::debug::Error),
}
