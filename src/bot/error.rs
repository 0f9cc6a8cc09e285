// Copyright © 2025 Stephan Kunz

//! Bot Interpreter errors.

use thiserror::Error;

use crate::ConstString;

/// Errors surfaced while constructing or stepping a [`crate::bot::Bot`].
///
/// Per §4.C, none of these are allowed past the owning bot: a step error always
/// resolves to that bot terminating in `SError`, never to a propagated `Result::Err`
/// out of the batch.
#[derive(Error, Debug)]
pub enum Error {
    /// Pass through from the Script Host.
    #[error("{0}")]
    Script(#[from] crate::script::Error),
    /// The node the execution stack points at does not exist in the tree.
    #[error("dangling node id [{0}]")]
    DanglingNode(crate::tree::NodeId),
    /// An `Action` descriptor's `method` template did not evaluate to a known verb.
    #[error("invalid HTTP method [{0}]")]
    InvalidMethod(ConstString),
    /// The HTTP call did not complete within its per-action timeout.
    #[error("timeout")]
    Timeout,
    /// Transport-level failure (connection refused, DNS failure, TLS error, ...).
    #[error("{0}")]
    Transport(ConstString),
    /// `step()` was called after the bot already reached a terminal state.
    #[error("bot already terminated")]
    AlreadyTerminal,
    /// A `Condition`/`Assert` script (or an `Action`'s post-response script) did not
    /// evaluate to a boolean.
    #[error("script result is not boolean")]
    NotBoolean,
}
