// Copyright © 2025 Stephan Kunz

//! Blackboard errors.

use crate::ConstString;
use thiserror::Error;

/// `blackboard` error type
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// Entry is not present in the blackboard.
    #[error("couldn't find entry [{0}] in blackboard")]
    NotFound(ConstString),
}
