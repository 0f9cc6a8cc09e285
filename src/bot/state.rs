// Copyright © 2025 Stephan Kunz

//! The per-bot execution stack and associated record types.

use uuid::Uuid;

use crate::ConstString;
use crate::script::ScriptHost;
use crate::tree::{NodeId, SharedTree};

/// Terminal/running state of a [`Bot`]'s interpreter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BotState {
    /// Still walking the tree.
    Running,
    /// The root completed; an ordinary, successful end of the tree walk.
    End,
    /// An `Assert` node (or break-configured `Condition`) failed.
    Break,
    /// A tree-fatal fault: a script error, or an `Action`'s HTTP call failing.
    Error,
}

impl BotState {
    /// Whether this state is one of the three terminal states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Boolean-ish outcome a child frame hands back to its parent when it is popped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Condition/Assert true, Action succeeded, control node's aggregate succeeded.
    Success,
    /// Condition/Assert false, control node's aggregate failed.
    Failure,
}

impl Outcome {
    /// Maps a boolean scripting result onto an [`Outcome`].
    #[must_use]
    pub const fn from_bool(value: bool) -> Self {
        if value { Self::Success } else { Self::Failure }
    }

    /// Whether this outcome is [`Outcome::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// One HTTP call performed by an `Action` node, appended to the bot's private report
/// buffer in tree-traversal order.
#[derive(Clone, Debug)]
pub struct ApiCall {
    /// The URL the call was made against (the key used by the per-api aggregation).
    pub api: ConstString,
    /// Wall-clock duration of the call, in milliseconds.
    pub consume_ms: i64,
    /// Size of the serialized request body, in bytes.
    pub req_bytes: i64,
    /// Size of the serialized response body, in bytes.
    pub res_bytes: i64,
    /// Short error description; empty means the call succeeded.
    pub err: ConstString,
}

/// Per-node-kind state that does not fit in `child_cursor` alone.
#[derive(Clone, Copy, Debug)]
pub enum FrameLocals {
    /// `Sequence`, `Selector`, `Root`: no extra state needed.
    Plain,
    /// `Loop`: how many successful iterations of the child have completed so far.
    Loop {
        /// Completed iteration count.
        iterations: u32,
    },
    /// `Parallel`: whether every child ticked so far has succeeded.
    Parallel {
        /// `true` iff every child outcome folded in so far was [`Outcome::Success`].
        all_success: bool,
    },
}

/// One open node on a bot's traversal path.
#[derive(Clone, Copy, Debug)]
pub struct Frame {
    /// The node this frame represents.
    pub node_id: NodeId,
    /// Index of the next not-yet-visited child, for control nodes.
    pub child_cursor: usize,
    /// Node-kind-specific accumulator.
    pub locals: FrameLocals,
    /// Set once this frame's own aggregate outcome is known; only then may it be
    /// popped and folded into its parent, on a subsequent `step`.
    pub completed: Option<Outcome>,
}

impl Frame {
    pub(crate) const fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            child_cursor: 0,
            locals: FrameLocals::Plain,
            completed: None,
        }
    }
}

/// One bot: a fresh script host, a private execution stack, and a report buffer,
/// walking a shared [`crate::tree::Tree`].
pub struct Bot {
    id: Uuid,
    /// Index of this bot within its batch, `0`-based.
    cursor: u32,
    tree: SharedTree,
    pub(crate) script: ScriptHost,
    pub(crate) stack: Vec<Frame>,
    pub(crate) report: Vec<ApiCall>,
    pub(crate) state: BotState,
    prev_node_id: Option<NodeId>,
    cur_node_id: Option<NodeId>,
}

impl Bot {
    /// Constructs a bot over `tree`, running `global_code` once against its blackboard.
    ///
    /// Fails the bot's construction (per §4.B) if the prelude itself errors.
    pub fn new(tree: SharedTree, global_code: &str) -> Result<Self, super::Error> {
        let mut script = ScriptHost::new();
        script.load_prelude(global_code)?;
        let root = tree.root();
        Ok(Self {
            id: Uuid::new_v4(),
            cursor: 0,
            tree,
            script,
            stack: vec![Frame::new(root)],
            report: Vec::new(),
            state: BotState::Running,
            prev_node_id: None,
            cur_node_id: Some(root),
        })
    }

    /// This bot's identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// This bot's index within its batch.
    #[must_use]
    pub const fn cursor(&self) -> u32 {
        self.cursor
    }

    pub(crate) fn set_cursor(&mut self, cursor: u32) {
        self.cursor = cursor;
    }

    /// The shared tree this bot is walking.
    #[must_use]
    pub fn tree(&self) -> &SharedTree {
        &self.tree
    }

    /// Current interpreter state.
    #[must_use]
    pub const fn state(&self) -> BotState {
        self.state
    }

    /// Node id the previous `step()` call left, if any.
    #[must_use]
    pub const fn prev_node_id(&self) -> Option<NodeId> {
        self.prev_node_id
    }

    /// Node id the next `step()` call will act on, if the bot has not terminated.
    #[must_use]
    pub const fn cur_node_id(&self) -> Option<NodeId> {
        self.cur_node_id
    }

    pub(crate) fn advance_cursor(&mut self, from: Option<NodeId>, to: Option<NodeId>) {
        self.prev_node_id = from;
        self.cur_node_id = to;
    }

    /// The bot's private report buffer, in tree-traversal order.
    #[must_use]
    pub fn report(&self) -> &[ApiCall] {
        &self.report
    }

    /// A pretty-printed dump of the bot's blackboard.
    #[must_use]
    pub fn blackboard_dump(&self) -> String {
        self.script.dump()
    }
}
