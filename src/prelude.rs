// Copyright © 2025 Stephan Kunz

//! Most commonly used interface of `botswarm`.
//!
//! Typically it is sufficient to include the prelude with
//!
//! ```
//! use botswarm::prelude::*;
//! ```

// error handling
pub use crate::error::{BotswarmResult, Error};

// tree model
pub use crate::tree::{NodeId, NodeKind, SharedTree, Tree, TreeMode};

// script host + blackboard
pub use crate::blackboard::Blackboard;
pub use crate::script::ScriptHost;

// bot interpreter
pub use crate::bot::{ApiCall, Bot, BotState, HttpClient, HttpRequest, HttpResponse};

// batch scheduler + report aggregator
pub use crate::batch::{Batch, BatchConfig, BatchInfo};
pub use crate::report::{ApiDetail, ReportDetail};

// debug interpreter
pub use crate::debug::DebugBot;

// factory
pub use crate::factory::{DebugInfo, Factory};

// storage + config
pub use crate::config::Config;
pub use crate::storage::{BehaviorRow, PrefabRow, Storage};
