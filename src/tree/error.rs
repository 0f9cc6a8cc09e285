// Copyright © 2025 Stephan Kunz

//! Tree Model errors.

use crate::ConstString;
use thiserror::Error;

/// Errors produced while parsing or querying a [`crate::tree::Tree`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// The serialized tree was rejected: unknown kind, forbidden children, missing
    /// required field on an Action node, or any other structural defect.
    #[error("invalid tree: {0}")]
    InvalidTree(ConstString),
    /// Underlying XML could not even be parsed as well-formed XML.
    #[error("{0}")]
    Xml(#[from] roxmltree::Error),
}
