// Copyright © 2025 Stephan Kunz

//! The Tree Model: an immutable parsed behavior tree, safely shared across bots.

pub mod error;
pub mod model;
pub mod parser;

pub use error::Error;
pub use model::{ActionDescriptor, Node, NodeId, NodeKind, SharedTree, Tree, TreeMode};
pub use parser::parse;
