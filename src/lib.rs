// Copyright © 2025 Stephan Kunz

//! `botswarm`: a behavior-tree-driven HTTP load testing bot runner.
//!
//! A user uploads a behavior tree plus a global script prelude, then asks for a
//! *batch* of N independent bots to walk that tree concurrently. Each bot issues the
//! HTTP calls its `Action` nodes describe, recording per-API latency/size/error
//! statistics; the [`batch`] scheduler aggregates those into a [`report::ReportDetail`]
//! once every bot has finished. A [`debug`] bot shares the same tree semantics but is
//! driven one `step()` at a time, for interactive tree authoring.
//!
//! [`factory::Factory`] is the single entry point an HTTP layer built on top of this
//! crate would call into: it owns every active [`batch::Batch`] and [`debug::DebugBot`]
//! and proxies the [`storage::Storage`] trait for behavior/prefab/config/report CRUD.
//! This crate has no transport of its own — routing, multipart upload and JSON
//! envelope shaping are left to that layer.

pub mod batch;
pub mod blackboard;
pub mod bot;
pub mod config;
pub mod debug;
mod error;
pub mod factory;
pub mod prelude;
pub mod report;
pub mod script;
pub mod storage;
pub mod tree;

// flatten
pub use batch::{Batch, BatchConfig, BatchInfo};
pub use blackboard::Blackboard;
pub use bot::{ApiCall, Bot, BotState, HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use config::Config;
pub use debug::DebugBot;
pub use error::{BotswarmResult, Error};
pub use factory::{DebugInfo, Factory};
pub use report::{ApiDetail, ReportDetail};
pub use script::ScriptHost;
pub use storage::{BehaviorRow, PrefabRow, Storage};
pub use tree::{ActionDescriptor, Node, NodeId, NodeKind, SharedTree, Tree, TreeMode, parse};

use std::sync::Arc;

/// An immutable, thread-safe `String` type, used throughout for names, ids and keys
/// that are cloned across bot/batch boundaries but never mutated in place.
///
/// see: [Logan Smith](https://www.youtube.com/watch?v=A4cKi7PTJSs).
pub type ConstString = Arc<str>;

/// Initializes a `tracing-subscriber` `EnvFilter` subscriber from `RUST_LOG`.
///
/// Opt-in: never called implicitly by library code, so an embedding application's own
/// subscriber setup is never clobbered. Intended for binaries and examples built on
/// top of this crate.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}
