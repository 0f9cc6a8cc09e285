// Copyright © 2025 Stephan Kunz

//! `InMemoryStorage`: a `parking_lot`-guarded reference [`super::Storage`], used by
//! tests and by any caller with no durable store configured.
//!
//! Shape grounded on the table layouts in `examples/original_source/server/
//! server.go`, translated to owned Rust structs with `chrono::DateTime<Utc>`
//! timestamps in place of Go's `time.Time`.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::Mutex;

use crate::ConstString;
use crate::config::Config;
use crate::report::ReportDetail;

use super::error::Error;
use super::{BehaviorRow, PrefabRow, Storage};

#[derive(Default)]
struct Tables {
    behaviors: HashMap<String, BehaviorRow>,
    prefabs: HashMap<String, PrefabRow>,
    config: Config,
    reports: Vec<ReportDetail>,
}

/// An in-memory [`Storage`], safe for concurrent use across batches/handlers.
#[derive(Default)]
pub struct InMemoryStorage {
    tables: Mutex<Tables>,
}

impl InMemoryStorage {
    /// An empty store with a default [`Config`] row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn add_behavior(&self, name: ConstString, file: Bytes) -> Result<(), Error> {
        let mut tables = self.tables.lock();
        let row = BehaviorRow {
            name: name.clone(),
            file,
            tags: Vec::new(),
            status: "active".to_string(),
            update_time: Utc::now(),
        };
        tables.behaviors.insert(name.to_string(), row);
        Ok(())
    }

    async fn rmv_behavior(&self, name: &str) -> Result<(), Error> {
        self.tables
            .lock()
            .behaviors
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(name.into()))
    }

    async fn get_behavior(&self, name: &str) -> Result<BehaviorRow, Error> {
        self.tables
            .lock()
            .behaviors
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.into()))
    }

    async fn list_behaviors(&self) -> Result<Vec<BehaviorRow>, Error> {
        let tables = self.tables.lock();
        let mut rows: Vec<BehaviorRow> = tables.behaviors.values().cloned().collect();
        rows.sort_by(|a, b| b.update_time.cmp(&a.update_time));
        Ok(rows)
    }

    async fn set_behavior_tags(&self, name: &str, tags: Vec<String>) -> Result<(), Error> {
        let mut tables = self.tables.lock();
        let row = tables.behaviors.get_mut(name).ok_or_else(|| Error::NotFound(name.into()))?;
        row.tags = tags;
        row.update_time = Utc::now();
        Ok(())
    }

    async fn add_prefab(&self, name: ConstString, code: String) -> Result<(), Error> {
        let mut tables = self.tables.lock();
        let row = PrefabRow {
            name: name.clone(),
            code,
            tags: Vec::new(),
            update_time: Utc::now(),
        };
        tables.prefabs.insert(name.to_string(), row);
        Ok(())
    }

    async fn rmv_prefab(&self, name: &str) -> Result<(), Error> {
        self.tables
            .lock()
            .prefabs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(name.into()))
    }

    async fn get_prefab(&self, name: &str) -> Result<PrefabRow, Error> {
        self.tables
            .lock()
            .prefabs
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.into()))
    }

    async fn list_prefabs(&self) -> Result<Vec<PrefabRow>, Error> {
        let tables = self.tables.lock();
        let mut rows: Vec<PrefabRow> = tables.prefabs.values().cloned().collect();
        rows.sort_by(|a, b| b.update_time.cmp(&a.update_time));
        Ok(rows)
    }

    async fn set_prefab_tags(&self, name: &str, tags: Vec<String>) -> Result<(), Error> {
        let mut tables = self.tables.lock();
        let row = tables.prefabs.get_mut(name).ok_or_else(|| Error::NotFound(name.into()))?;
        row.tags = tags;
        row.update_time = Utc::now();
        Ok(())
    }

    async fn get_config(&self) -> Result<Config, Error> {
        Ok(self.tables.lock().config.clone())
    }

    async fn set_config(&self, config: Config) -> Result<(), Error> {
        self.tables.lock().config = config;
        Ok(())
    }

    async fn put_report(&self, report: ReportDetail) -> Result<(), Error> {
        self.tables.lock().reports.push(report);
        Ok(())
    }

    async fn list_reports(&self) -> Result<Vec<ReportDetail>, Error> {
        let tables = self.tables.lock();
        let mut rows = tables.reports.clone();
        rows.sort_by(|a, b| b.begin_time.cmp(&a.begin_time));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn behavior_round_trips_and_lists_newest_first() {
        let storage = InMemoryStorage::new();
        storage.add_behavior("a".into(), Bytes::from_static(b"<Root/>")).await.expect("insert a");
        storage.add_behavior("b".into(), Bytes::from_static(b"<Root/>")).await.expect("insert b");

        let rows = storage.list_behaviors().await.expect("list");
        assert_eq!(rows.len(), 2);
        assert_eq!(&*rows[0].name, "b");

        storage.set_behavior_tags("a", vec!["smoke".to_string()]).await.expect("tag a");
        let row = storage.get_behavior("a").await.expect("get a");
        assert_eq!(row.tags, vec!["smoke".to_string()]);
    }

    #[tokio::test]
    async fn rmv_unknown_behavior_errors() {
        let storage = InMemoryStorage::new();
        let err = storage.rmv_behavior("ghost").await.expect_err("should error");
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn reports_list_newest_first() {
        let storage = InMemoryStorage::new();
        let older = ReportDetail::new("r1".into(), "t".into(), Utc::now() - chrono::Duration::seconds(10));
        let newer = ReportDetail::new("r2".into(), "t".into(), Utc::now());
        storage.put_report(older).await.expect("put older");
        storage.put_report(newer).await.expect("put newer");

        let rows = storage.list_reports().await.expect("list");
        assert_eq!(&*rows[0].id, "r2");
    }
}
