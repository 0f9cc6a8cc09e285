// Copyright © 2025 Stephan Kunz

//! Factory errors.

use thiserror::Error;

use crate::ConstString;

/// `factory` error type.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// `add_batch`/`run_once` named a tree with no matching Behavior row.
    #[error("unknown tree [{0}]")]
    UnknownTree(ConstString),
    /// Pass through from tree parsing (§4.A: rejected at upload/run time, never while
    /// a batch is already running).
    #[error("{0}")]
    Tree(#[from] crate::tree::Error),
    /// A second `add_batch` was attempted for a tree name with an active batch.
    #[error("batch already in progress for [{0}]")]
    BatchInProgress(ConstString),
    /// Pass through from batch construction.
    #[error("{0}")]
    Batch(#[from] crate::batch::Error),
    /// Pass through from a single synchronous `/bot.run`.
    #[error("{0}")]
    Bot(#[from] crate::bot::Error),
    /// Pass through from a debug bot operation.
    #[error("{0}")]
    Debug(#[from] crate::debug::Error),
    /// Pass through from the storage layer.
    #[error("{0}")]
    Storage(#[from] crate::storage::Error),
}
