// Copyright © 2025 Stephan Kunz

//! The Debug Interpreter: a bot identical to a Thread-mode one, except its `step()` is
//! driven externally, one call at a time, by `/debug.step` (§4.G).

pub mod error;

use tracing::{Level, instrument};
use uuid::Uuid;

use crate::bot::{self, Bot, BotState, HttpClient};
use crate::tree::{NodeId, SharedTree};

pub use error::Error;

/// A single-stepped bot plus the observability `/debug.step` exposes after each call.
pub struct DebugBot {
    bot: Bot,
}

impl DebugBot {
    /// Parses `tree` is the caller's job (Step mode); this just wraps an already
    /// constructed bot.
    ///
    /// Grounded on how `src/tree/tree.rs::tick_once` is a thin wrapper over the same
    /// per-node `tick()` the run-to-completion loop uses — `DebugBot` is the same
    /// relationship, one layer up, over [`bot::step`].
    pub fn new(tree: SharedTree, global_code: &str) -> Result<Self, Error> {
        Ok(Self {
            bot: Bot::new(tree, global_code).map_err(bot::Error::from)?,
        })
    }

    /// This bot's id, as returned by `/debug.create`.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.bot.id()
    }

    /// Advances the underlying bot by exactly one [`bot::step`] call.
    #[instrument(level = Level::DEBUG, skip(self, http), fields(bot = %self.id()))]
    pub async fn step(&mut self, http: &dyn HttpClient) -> Result<BotState, Error> {
        Ok(bot::step(&mut self.bot, http).await?)
    }

    /// Node id the previous step left.
    #[must_use]
    pub const fn prev_node_id(&self) -> Option<NodeId> {
        self.bot.prev_node_id()
    }

    /// Node id the next step will act on, if not yet terminal.
    #[must_use]
    pub const fn cur_node_id(&self) -> Option<NodeId> {
        self.bot.cur_node_id()
    }

    /// Current interpreter state.
    #[must_use]
    pub const fn state(&self) -> BotState {
        self.bot.state()
    }

    /// The serialized blackboard, for the debug UI.
    #[must_use]
    pub fn blackboard_dump(&self) -> String {
        self.bot.blackboard_dump()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{HttpRequest, HttpResponse};
    use crate::tree::{TreeMode, parse};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Arc;

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

    #[tokio::test]
    async fn three_steps_reach_terminal_then_further_steps_error() {
        let xml = r#"<Root><Action method="\"GET\"" url="\"http://mock/ok\""/></Root>"#;
        let tree: SharedTree = Arc::new(parse("t", xml, TreeMode::Step).expect("valid tree"));
        let mut debug_bot = DebugBot::new(tree, "").expect("bot constructs");
        let http = MockHttp;

        assert_eq!(debug_bot.step(&http).await.expect("step 1"), BotState::Running);
        assert_eq!(debug_bot.step(&http).await.expect("step 2"), BotState::Running);
        assert_eq!(debug_bot.step(&http).await.expect("step 3"), BotState::End);

        let err = debug_bot.step(&http).await.expect_err("terminal bot cannot step again");
        assert!(matches!(err, Error::Bot(bot::Error::AlreadyTerminal)));
    }
}
