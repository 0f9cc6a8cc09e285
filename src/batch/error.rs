// Copyright © 2025 Stephan Kunz

//! Batch Scheduler errors.

use thiserror::Error;

use crate::ConstString;

/// `batch` error type.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// Bot construction failed before the batch could even enqueue it.
    #[error("{0}")]
    Bot(#[from] crate::bot::Error),
    /// A second `AddBatch` was attempted for a tree name already running.
    #[error("batch already in progress for [{0}]")]
    InProgress(ConstString),
}
