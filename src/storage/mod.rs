// Copyright © 2025 Stephan Kunz

//! The storage layer: out-of-scope-by-spec, but modeled as the black-box trait the
//! core consumes (§1: "storage ... treated as a black box with per-call failure
//! surfaces"), plus an in-memory reference implementation.

pub mod error;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::ConstString;
use crate::config::Config;
use crate::report::ReportDetail;

pub use error::Error;
pub use memory::InMemoryStorage;

/// One row of the Behavior table (§6 persisted state).
#[derive(Clone, Debug)]
pub struct BehaviorRow {
    /// Unique name, the key `AddBatch`/`bot.run` look trees up by.
    pub name: ConstString,
    /// The serialized tree blob, opaque to storage.
    pub file: Bytes,
    /// Free-form tags, settable via `/file.setTags`.
    pub tags: Vec<String>,
    /// Free-form status string (e.g. `"active"`).
    pub status: String,
    /// Last write time; `list()` orders newest-first by this.
    pub update_time: DateTime<Utc>,
}

/// One row of the Prefab table.
#[derive(Clone, Debug)]
pub struct PrefabRow {
    /// Unique name.
    pub name: ConstString,
    /// Prefab script source.
    pub code: String,
    /// Free-form tags, settable via `/prefab.setTags`.
    pub tags: Vec<String>,
    /// Last write time; `list()` orders newest-first by this.
    pub update_time: DateTime<Utc>,
}

/// The four logical tables (§6 "Persisted state"), behind one async trait so a real
/// backend can replace [`InMemoryStorage`] without touching the core.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Inserts or overwrites a Behavior row.
    async fn add_behavior(&self, name: ConstString, file: Bytes) -> Result<(), Error>;
    /// Removes a Behavior row.
    async fn rmv_behavior(&self, name: &str) -> Result<(), Error>;
    /// Reads one Behavior row.
    async fn get_behavior(&self, name: &str) -> Result<BehaviorRow, Error>;
    /// Every Behavior row, newest-first by `update_time`.
    async fn list_behaviors(&self) -> Result<Vec<BehaviorRow>, Error>;
    /// Overwrites a Behavior row's tags.
    async fn set_behavior_tags(&self, name: &str, tags: Vec<String>) -> Result<(), Error>;

    /// Inserts or overwrites a Prefab row.
    async fn add_prefab(&self, name: ConstString, code: String) -> Result<(), Error>;
    /// Removes a Prefab row.
    async fn rmv_prefab(&self, name: &str) -> Result<(), Error>;
    /// Reads one Prefab row.
    async fn get_prefab(&self, name: &str) -> Result<PrefabRow, Error>;
    /// Every Prefab row, newest-first by `update_time`.
    async fn list_prefabs(&self) -> Result<Vec<PrefabRow>, Error>;
    /// Overwrites a Prefab row's tags.
    async fn set_prefab_tags(&self, name: &str, tags: Vec<String>) -> Result<(), Error>;

    /// Reads the single Config row.
    async fn get_config(&self) -> Result<Config, Error>;
    /// Overwrites the single Config row.
    async fn set_config(&self, config: Config) -> Result<(), Error>;

    /// Persists a finalized batch report.
    async fn put_report(&self, report: ReportDetail) -> Result<(), Error>;
    /// Every persisted report, newest-first by `begin_time`.
    async fn list_reports(&self) -> Result<Vec<ReportDetail>, Error>;
}
