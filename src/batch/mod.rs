// Copyright © 2025 Stephan Kunz

//! The Batch Scheduler: a bounded-concurrency pipeline driving `total` bots through
//! one shared [`crate::tree::Tree`], in waves of at most `batch_size`.
//!
//! Grounded on `examples/original_source/factory/batch.go`'s `run()`/`loop()` pair.
//! The Go original keeps two separate goroutines talking over `pipeline`/`done_ch`/
//! `err_ch`; here the producer and the wave-drain wait fold into a single task, since
//! waiting for exactly `wave` outcomes on one channel before starting the next wave
//! gives the same "strictly sequential waves, full concurrency within one" guarantee
//! without a second task or a semaphore to keep in sync with it.

pub mod error;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Level, event, instrument};
use uuid::Uuid;

use crate::ConstString;
use crate::bot::{self, Bot, BotState, HttpClient};
use crate::report::ReportDetail;
use crate::tree::SharedTree;

pub use error::Error;

/// Knobs read from the Factory's config row on every new batch (§3 "Process-wide
/// state").
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Wave width: at most this many bots run concurrently.
    pub batch_size: u32,
    /// Pause between enqueuing consecutive bots within one wave.
    pub enqueue_delay_ms: u64,
    /// Soft drain deadline; no new wave starts once this elapses.
    pub life_time: Duration,
    /// Global script prelude, run once per bot at construction.
    pub global_code: ConstString,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            enqueue_delay_ms: 0,
            life_time: Duration::from_secs(60),
            global_code: ConstString::from(""),
        }
    }
}

/// A point-in-time snapshot of one batch's progress, for `/bot.list`.
#[derive(Clone, Debug)]
pub struct BatchInfo {
    /// Batch id.
    pub id: ConstString,
    /// Tree/batch name.
    pub name: ConstString,
    /// Bots completed so far.
    pub cur: u32,
    /// Total bots this batch will run.
    pub max: u32,
    /// Bots that finished in `SError`.
    pub errors: u32,
}

struct BotOutcome {
    report: Vec<bot::ApiCall>,
    state: BotState,
}

struct Shared {
    id: ConstString,
    name: ConstString,
    total: u32,
    cursor_num: AtomicU32,
    cur_num: AtomicU32,
    errors: AtomicU32,
    report: Mutex<ReportDetail>,
    done: Notify,
    is_done: std::sync::atomic::AtomicBool,
}

/// One running (or finished) batch.
pub struct Batch {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Batch {
    /// Constructs a batch and immediately spawns its scheduler task.
    ///
    /// `cur` is the starting completion count (normally `0`; nonzero only if a caller
    /// is resuming bookkeeping across a restart — no durable resume is implemented,
    /// per the Non-goals, so this is accepted purely to mirror `CreateBatch`'s
    /// signature).
    #[instrument(level = Level::DEBUG, skip(tree, http, cfg), fields(name = %name, total))]
    #[must_use]
    pub fn spawn(name: ConstString, tree: SharedTree, cur: u32, total: u32, cfg: BatchConfig, http: Arc<dyn HttpClient>) -> Self {
        let id = ConstString::from(Uuid::new_v4().to_string());
        let shared = Arc::new(Shared {
            id: id.clone(),
            name: name.clone(),
            total,
            cursor_num: AtomicU32::new(cur),
            cur_num: AtomicU32::new(cur),
            errors: AtomicU32::new(0),
            report: Mutex::new(ReportDetail::new(id, name, Utc::now())),
            done: Notify::new(),
            is_done: std::sync::atomic::AtomicBool::new(false),
        });

        let task_shared = shared.clone();
        let handle = tokio::spawn(async move {
            run(task_shared, tree, cfg, total, http).await;
        });

        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// This batch's id.
    #[must_use]
    pub fn id(&self) -> ConstString {
        self.shared.id.clone()
    }

    /// A consistent snapshot of this batch's progress.
    #[must_use]
    pub fn info(&self) -> BatchInfo {
        BatchInfo {
            id: self.shared.id.clone(),
            name: self.shared.name.clone(),
            cur: self.shared.cur_num.load(Ordering::Relaxed),
            max: self.shared.total,
            errors: self.shared.errors.load(Ordering::Relaxed),
        }
    }

    /// Whether `cur_num == total` and finalization has completed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.shared.is_done.load(Ordering::Relaxed)
    }

    /// A clone of the (possibly still-accumulating) report.
    #[must_use]
    pub fn report(&self) -> ReportDetail {
        self.shared.report.lock().clone()
    }

    /// Waits for the batch's scheduler task to finish, i.e. for `batch_done_ch`.
    pub async fn join(&mut self) {
        // The `Notified` future must be constructed before the flag is checked: a
        // `notify_waiters()` landing between the check and the `notified()` call would
        // otherwise be missed, hanging this wait forever. Once the future exists,
        // `tokio::sync::Notify` guarantees a notification after this point is observed.
        let notified = self.shared.done.notified();
        if !self.shared.is_done.load(Ordering::Relaxed) {
            notified.await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    /// A cloneable, lock-free-to-hold handle a caller can await without borrowing this
    /// `Batch` (and so without blocking e.g. a registry mutex across the wait).
    #[must_use]
    pub fn watcher(&self) -> BatchWatcher {
        BatchWatcher(self.shared.clone())
    }
}

/// Detached completion signal for one [`Batch`], for callers (the Factory) that need
/// to wait for `batch_done_ch` without holding the `Batch` itself.
#[derive(Clone)]
pub struct BatchWatcher(Arc<Shared>);

impl BatchWatcher {
    /// Waits for `batch_done_ch`, i.e. for finalization to have completed.
    pub async fn wait_done(&self) {
        // See the identical ordering in `Batch::join`: the future must exist before
        // the flag is checked, or a notification racing the check is lost forever.
        let notified = self.0.done.notified();
        if !self.0.is_done.load(Ordering::Relaxed) {
            notified.await;
        }
    }

    /// The finalized (or still-accumulating) report.
    #[must_use]
    pub fn report(&self) -> ReportDetail {
        self.0.report.lock().clone()
    }
}

#[instrument(level = Level::DEBUG, skip(shared, tree, cfg, http))]
async fn run(shared: Arc<Shared>, tree: SharedTree, cfg: BatchConfig, total: u32, http: Arc<dyn HttpClient>) {
    let deadline = Instant::now() + cfg.life_time;
    let (tx, mut rx) = mpsc::channel::<BotOutcome>(cfg.batch_size.max(1) as usize);

    loop {
        let cur = shared.cur_num.load(Ordering::Relaxed);
        if cur >= total {
            break;
        }
        if Instant::now() >= deadline {
            event!(Level::WARN, batch = %shared.id, "life_time elapsed, draining without starting a new wave");
            break;
        }

        let cursor = shared.cursor_num.load(Ordering::Relaxed);
        let remaining = total - cursor;
        let wave = remaining.min(cfg.batch_size);
        if wave == 0 {
            break;
        }

        for _ in 0..wave {
            shared.cursor_num.fetch_add(1, Ordering::Relaxed);
            let bot_result = Bot::new(tree.clone(), &cfg.global_code);
            let tx = tx.clone();
            let http = http.clone();
            match bot_result {
                Ok(mut new_bot) => {
                    tokio::spawn(async move {
                        let state = bot::run_to_completion(&mut new_bot, http.as_ref()).await;
                        let _ = tx
                            .send(BotOutcome {
                                report: new_bot.report().to_vec(),
                                state,
                            })
                            .await;
                    });
                }
                Err(_) => {
                    let _ = tx
                        .send(BotOutcome {
                            report: Vec::new(),
                            state: BotState::Error,
                        })
                        .await;
                }
            }
            if cfg.enqueue_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(cfg.enqueue_delay_ms)).await;
            }
        }

        for _ in 0..wave {
            let Some(outcome) = rx.recv().await else {
                break;
            };
            shared.report.lock().fold(&outcome.report);
            shared.cur_num.fetch_add(1, Ordering::Relaxed);
            if outcome.state == BotState::Error {
                shared.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    shared.report.lock().finalize(Utc::now());
    shared.is_done.store(true, Ordering::Relaxed);
    shared.done.notify_waiters();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{HttpRequest, HttpResponse};
    use crate::tree::{TreeMode, parse};
    use async_trait::async_trait;
    use bytes::Bytes;

    struct MockHttp;

    #[async_trait]
    impl HttpClient for MockHttp {
        async fn call(&self, _request: HttpRequest) -> Result<HttpResponse, bot::Error> {
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: Bytes::from_static(b"{}"),
            })
        }
    }

    #[tokio::test]
    async fn drives_every_bot_to_completion_across_waves() {
        let xml = r#"<Root><Action method="\"GET\"" url="\"http://mock/ok\""/></Root>"#;
        let tree: SharedTree = Arc::new(parse("t", xml, TreeMode::Thread).expect("valid tree"));
        let cfg = BatchConfig {
            batch_size: 2,
            enqueue_delay_ms: 0,
            life_time: Duration::from_secs(60),
            global_code: ConstString::from(""),
        };
        let mut batch = Batch::spawn(ConstString::from("t"), tree, 0, 5, cfg, Arc::new(MockHttp));
        batch.join().await;

        assert!(batch.is_done());
        let info = batch.info();
        assert_eq!(info.cur, 5);
        assert_eq!(info.errors, 0);
        assert_eq!(batch.report().bot_num, 5);
    }
}
