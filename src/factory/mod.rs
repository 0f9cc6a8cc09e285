// Copyright © 2025 Stephan Kunz

//! The Factory: a process-wide registry owning active batches and debug bots.
//!
//! §4.F: "single entry point for create/list/find/remove", re-architected per §9's
//! design note as an explicit struct (`Factory::new(storage)`), never a process-wide
//! `static`, so handlers built on top can be tested deterministically. All operations
//! are safe to call concurrently: the two registries are each guarded by one
//! `parking_lot::Mutex`.

pub mod error;

use std::collections::HashMap;
use std::str;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{Level, event, instrument};
use uuid::Uuid;

pub use error::Error;

use crate::ConstString;
use crate::batch::{Batch, BatchConfig, BatchInfo};
use crate::bot::{self, ApiCall, Bot, BotState, HttpClient, ReqwestHttpClient};
use crate::config::Config;
use crate::debug::{self, DebugBot};
use crate::report::ReportDetail;
use crate::storage::{BehaviorRow, PrefabRow, Storage};
use crate::tree::{self, NodeId, TreeMode};

/// A point-in-time view of one registered debug bot, returned by `/debug.step` and
/// `/debug.create`'s analogues (§4.G).
#[derive(Clone, Debug)]
pub struct DebugInfo {
    /// The debug bot's id.
    pub id: Uuid,
    /// Current interpreter state.
    pub state: BotState,
    /// Node id the previous step left, if any.
    pub prev_node_id: Option<NodeId>,
    /// Node id the next step will act on, if not yet terminal.
    pub cur_node_id: Option<NodeId>,
    /// Pretty-printed blackboard dump.
    pub blackboard: String,
}

/// Process-wide owner of every active [`Batch`] and [`DebugBot`].
///
/// At most one active batch exists per tree name at a time (§4.D "Admission"); a
/// batch is removed from the registry the moment its report has been persisted.
pub struct Factory {
    storage: Arc<dyn Storage>,
    http: Arc<dyn HttpClient>,
    batches: Arc<Mutex<HashMap<ConstString, Batch>>>,
    debug_bots: Arc<Mutex<HashMap<Uuid, DebugBot>>>,
}

impl Factory {
    /// A factory over `storage`, issuing HTTP via [`ReqwestHttpClient`].
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_http_client(storage, Arc::new(ReqwestHttpClient::default()))
    }

    /// A factory over `storage`, issuing HTTP via a caller-supplied client — used by
    /// tests to substitute a mock transport.
    #[must_use]
    pub fn with_http_client(storage: Arc<dyn Storage>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            storage,
            http,
            batches: Arc::new(Mutex::new(HashMap::new())),
            debug_bots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // region: --- behavior/prefab/config (thin proxies to storage, §4.F)

    /// Stores (or overwrites) a behavior-tree blob.
    pub async fn add_behavior(&self, name: ConstString, file: Bytes) -> Result<(), Error> {
        Ok(self.storage.add_behavior(name, file).await?)
    }

    /// Removes a behavior-tree blob.
    pub async fn rmv_behavior(&self, name: &str) -> Result<(), Error> {
        Ok(self.storage.rmv_behavior(name).await?)
    }

    /// Every registered behavior, newest-first.
    pub async fn list_behaviors(&self) -> Result<Vec<BehaviorRow>, Error> {
        Ok(self.storage.list_behaviors().await?)
    }

    /// Overwrites a behavior's tags.
    pub async fn set_behavior_tags(&self, name: &str, tags: Vec<String>) -> Result<(), Error> {
        Ok(self.storage.set_behavior_tags(name, tags).await?)
    }

    /// Stores (or overwrites) a prefab subtree.
    pub async fn add_prefab(&self, name: ConstString, code: String) -> Result<(), Error> {
        Ok(self.storage.add_prefab(name, code).await?)
    }

    /// Removes a prefab subtree.
    pub async fn rmv_prefab(&self, name: &str) -> Result<(), Error> {
        Ok(self.storage.rmv_prefab(name).await?)
    }

    /// Every registered prefab, newest-first.
    pub async fn list_prefabs(&self) -> Result<Vec<PrefabRow>, Error> {
        Ok(self.storage.list_prefabs().await?)
    }

    /// Overwrites a prefab's tags.
    pub async fn set_prefab_tags(&self, name: &str, tags: Vec<String>) -> Result<(), Error> {
        Ok(self.storage.set_prefab_tags(name, tags).await?)
    }

    /// Reads the process-wide configuration row.
    pub async fn get_config(&self) -> Result<Config, Error> {
        Ok(self.storage.get_config().await?)
    }

    /// Overwrites the process-wide configuration row.
    pub async fn set_config(&self, config: Config) -> Result<(), Error> {
        Ok(self.storage.set_config(config).await?)
    }

    /// Every persisted batch report, newest-first.
    pub async fn get_report(&self) -> Result<Vec<ReportDetail>, Error> {
        Ok(self.storage.list_reports().await?)
    }

    // endregion

    // region: --- batches (§4.D, §4.F)

    /// Runs `name`'s tree once, synchronously, to completion (`/bot.run`), outside of
    /// any batch bookkeeping.
    #[instrument(level = Level::DEBUG, skip(self))]
    pub async fn run_once(&self, name: &str) -> Result<(BotState, Vec<ApiCall>), Error> {
        let tree = self.load_tree(name, TreeMode::Block).await?;
        let config = self.storage.get_config().await.unwrap_or_default();
        let mut bot = Bot::new(Arc::new(tree), &config.global_code).map_err(bot::Error::from)?;
        let state = bot::run_to_completion(&mut bot, self.http.as_ref()).await;
        Ok((state, bot.report().to_vec()))
    }

    /// Loads `name`'s tree, constructs a batch of `total` bots, and launches its
    /// scheduler loop. Fails with [`Error::BatchInProgress`] if `name` already has an
    /// active batch.
    #[instrument(level = Level::DEBUG, skip(self))]
    pub async fn add_batch(&self, name: ConstString, total: u32) -> Result<ConstString, Error> {
        if self.batches.lock().contains_key(&name) {
            return Err(Error::BatchInProgress(name));
        }

        let tree = self.load_tree(&name, TreeMode::Thread).await?;
        let config = self.storage.get_config().await.unwrap_or_default();
        let batch_cfg = BatchConfig {
            batch_size: u32::try_from(config.channel_size).unwrap_or(u32::MAX).max(1),
            enqueue_delay_ms: config.enqueue_delay_ms,
            life_time: Duration::from_secs(60),
            global_code: ConstString::from(config.global_code.as_str()),
        };

        let batch = Batch::spawn(name.clone(), Arc::new(tree), 0, total, batch_cfg, self.http.clone());
        let id = batch.id();
        let watcher = batch.watcher();

        // A second caller could have raced us between the first check above and
        // here; re-check admission under the same lock the insert uses.
        let mut batches = self.batches.lock();
        if batches.contains_key(&name) {
            return Err(Error::BatchInProgress(name));
        }
        batches.insert(name.clone(), batch);
        drop(batches);

        let storage = self.storage.clone();
        let batches = self.batches.clone();
        tokio::spawn(async move {
            watcher.wait_done().await;
            let report = watcher.report();
            if let Err(err) = storage.put_report(report).await {
                event!(Level::ERROR, batch = %name, error = %err, "failed to persist batch report");
            }
            batches.lock().remove(&name);
        });

        Ok(id)
    }

    /// A snapshot of every currently active batch (`/bot.list`).
    #[must_use]
    pub fn batch_info(&self) -> Vec<BatchInfo> {
        self.batches.lock().values().map(Batch::info).collect()
    }

    async fn load_tree(&self, name: &str, mode: TreeMode) -> Result<tree::Tree, Error> {
        let behavior = self
            .storage
            .get_behavior(name)
            .await
            .map_err(|_| Error::UnknownTree(name.into()))?;
        let xml = str::from_utf8(&behavior.file)
            .map_err(|_| tree::Error::InvalidTree("tree blob is not valid utf-8".into()))?;
        Ok(tree::parse(name, xml, mode)?)
    }

    // endregion

    // region: --- debug bots (§4.G)

    /// Parses `tree_bytes` directly in Step mode and registers a fresh debug bot.
    #[instrument(level = Level::DEBUG, skip(self, tree_bytes))]
    pub async fn create_debug_bot(&self, tree_bytes: &[u8]) -> Result<Uuid, Error> {
        let xml = str::from_utf8(tree_bytes)
            .map_err(|_| tree::Error::InvalidTree("tree bytes are not valid utf-8".into()))?;
        let tree = tree::parse("debug", xml, TreeMode::Step)?;
        let config = self.storage.get_config().await.unwrap_or_default();
        let debug_bot = DebugBot::new(Arc::new(tree), &config.global_code).map_err(bot::Error::from)?;
        let id = debug_bot.id();
        self.debug_bots.lock().insert(id, debug_bot);
        Ok(id)
    }

    /// Advances `id`'s debug bot by exactly one step. Removes the bot from the
    /// registry once it reaches a terminal state, so a subsequent step for the same
    /// id fails with [`debug::Error::CantFindBot`].
    pub async fn step_debug_bot(&self, id: Uuid) -> Result<DebugInfo, Error> {
        let mut bot = self
            .debug_bots
            .lock()
            .remove(&id)
            .ok_or(debug::Error::CantFindBot(id))?;

        let state = bot.step(self.http.as_ref()).await?;
        let info = DebugInfo {
            id,
            state,
            prev_node_id: bot.prev_node_id(),
            cur_node_id: bot.cur_node_id(),
            blackboard: bot.blackboard_dump(),
        };
        if !state.is_terminal() {
            self.debug_bots.lock().insert(id, bot);
        }
        Ok(info)
    }

    /// A snapshot of `id`'s debug bot, without stepping it.
    pub fn find_bot(&self, id: Uuid) -> Result<DebugInfo, Error> {
        let bots = self.debug_bots.lock();
        let bot = bots.get(&id).ok_or(debug::Error::CantFindBot(id))?;
        Ok(DebugInfo {
            id,
            state: bot.state(),
            prev_node_id: bot.prev_node_id(),
            cur_node_id: bot.cur_node_id(),
            blackboard: bot.blackboard_dump(),
        })
    }

    /// Explicitly removes `id`'s debug bot, e.g. when an authoring session ends early.
    pub fn rmv_bot(&self, id: Uuid) -> Result<(), Error> {
        self.debug_bots
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::Debug(debug::Error::CantFindBot(id)))
    }

    // endregion
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{HttpRequest, HttpResponse};
    use crate::storage::InMemoryStorage;
    use async_trait::async_trait;

    struct MockHttp;

    #[async_trait]
    impl HttpClient for MockHttp {
        async fn call(&self, _request: HttpRequest) -> Result<HttpResponse, bot::Error> {
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: Bytes::from_static(b"{\"v\":1}"),
            })
        }
    }

    fn factory() -> Factory {
        Factory::with_http_client(Arc::new(InMemoryStorage::new()), Arc::new(MockHttp))
    }

    #[tokio::test]
    async fn add_batch_rejects_unknown_tree() {
        let factory = factory();
        let err = factory
            .add_batch(ConstString::from("missing"), 3)
            .await
            .expect_err("no such behavior registered");
        assert!(matches!(err, Error::UnknownTree(_)));
    }

    #[tokio::test]
    async fn add_batch_rejects_concurrent_batches_for_same_name() {
        let factory = factory();
        let xml = br#"<Root><Action method="\"GET\"" url="\"http://mock/ok\""/></Root>"#;
        factory
            .add_behavior(ConstString::from("t1"), Bytes::from_static(xml))
            .await
            .expect("behavior stored");

        factory.add_batch(ConstString::from("t1"), 5).await.expect("first batch starts");
        let err = factory
            .add_batch(ConstString::from("t1"), 5)
            .await
            .expect_err("second concurrent batch for same name rejected");
        assert!(matches!(err, Error::BatchInProgress(_)));
    }

    #[tokio::test]
    async fn debug_bot_lifecycle_removes_on_terminal_step() {
        let factory = factory();
        let xml = br#"<Root><Action method="\"GET\"" url="\"http://mock/ok\""/></Root>"#;
        let id = factory.create_debug_bot(xml).await.expect("debug bot created");

        let step1 = factory.step_debug_bot(id).await.expect("step 1");
        assert_eq!(step1.state, BotState::Running);
        let step2 = factory.step_debug_bot(id).await.expect("step 2");
        assert_eq!(step2.state, BotState::Running);
        let step3 = factory.step_debug_bot(id).await.expect("step 3");
        assert_eq!(step3.state, BotState::End);

        let err = factory
            .step_debug_bot(id)
            .await
            .expect_err("bot was removed after reaching a terminal state");
        assert!(matches!(err, Error::Debug(debug::Error::CantFindBot(_))));
    }
}
