// Copyright © 2025 Stephan Kunz

//! Storage errors.

use thiserror::Error;

use crate::ConstString;

/// `storage` error type.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// No row for this name.
    #[error("unknown entry [{0}]")]
    NotFound(ConstString),
    /// The underlying store rejected a write (e.g. report finalization).
    #[error("storage write failed: {0}")]
    Write(ConstString),
}
