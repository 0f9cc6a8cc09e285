// Copyright © 2025 Stephan Kunz

//! Immutable in-memory behavior tree.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::ConstString;

/// Stable identifier of a node within one [`Tree`].
pub type NodeId = u32;

/// The closed set of node kinds a [`Tree`] may contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The single entry point of a tree; exactly one child.
    Root,
    /// Children in order; first failure short-circuits to failure.
    Sequence,
    /// Children in order; first success short-circuits to success.
    Selector,
    /// Children ticked left-to-right, one per `step`; success iff all succeed.
    Parallel,
    /// Repeats its one child up to `count` times or until it fails.
    Loop,
    /// Evaluates a script; transparent to its parent on either outcome.
    Condition,
    /// Evaluates a script and, for leaves, issues an HTTP call.
    Action,
    /// Like [`NodeKind::Condition`] but a falsy result promotes the bot to `SBreak`.
    Assert,
    /// Suspends the bot for a fixed duration.
    Wait,
}

impl NodeKind {
    /// Whether this kind is allowed to carry children.
    #[must_use]
    pub const fn allows_children(self) -> bool {
        matches!(
            self,
            Self::Root | Self::Sequence | Self::Selector | Self::Parallel | Self::Loop
        )
    }

    /// Whether this kind is a leaf that an interpreter executes directly (no children).
    #[must_use]
    pub const fn is_leaf(self) -> bool {
        matches!(
            self,
            Self::Condition | Self::Action | Self::Assert | Self::Wait
        )
    }
}

/// The HTTP descriptor template carried by an [`NodeKind::Action`] node.
///
/// Every field is a script expression, evaluated against the bot's blackboard at
/// execution time — none of this is resolved at parse time.
#[derive(Clone, Debug, Default)]
pub struct ActionDescriptor {
    /// Script expression evaluating to the HTTP method, e.g. `"GET"`.
    pub method: ConstString,
    /// Script expression evaluating to the request URL.
    pub url: ConstString,
    /// `(header name, script expression)` pairs; each evaluated independently.
    pub headers: Vec<(ConstString, ConstString)>,
    /// Script expression evaluating to the request body, or empty for none.
    pub body: ConstString,
    /// Per-action timeout, in milliseconds. `0` means "no explicit timeout".
    pub timeout_ms: u64,
}

/// One node of a [`Tree`].
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    children: Vec<NodeId>,
    script: Option<ConstString>,
    action: Option<ActionDescriptor>,
    /// `count` parameter of a [`NodeKind::Loop`] node; unused otherwise.
    loop_count: u32,
    /// `duration_ms` parameter of a [`NodeKind::Wait`] node; unused otherwise.
    wait_ms: u64,
}

impl Node {
    /// Stable id of this node, unique within its tree.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// The node's kind tag.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Ordered ids of this node's children.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The node's script body, if any.
    #[must_use]
    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    /// The action descriptor of an [`NodeKind::Action`] node.
    #[must_use]
    pub const fn action(&self) -> Option<&ActionDescriptor> {
        self.action.as_ref()
    }

    /// `count` for a [`NodeKind::Loop`] node.
    #[must_use]
    pub const fn loop_count(&self) -> u32 {
        self.loop_count
    }

    /// `duration_ms` for a [`NodeKind::Wait`] node.
    #[must_use]
    pub const fn wait_ms(&self) -> u64 {
        self.wait_ms
    }
}

/// How a [`Tree`] was loaded, which only constrains who is allowed to drive it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeMode {
    /// Driven one `step()` at a time by the debug endpoints.
    Step,
    /// Driven synchronously to completion by `/bot.run`.
    Block,
    /// Driven by a batch's per-bot task, run to completion.
    Thread,
}

/// An immutable, parsed behavior tree.
///
/// Safe to share across every bot of a batch via `Arc<Tree>`: nothing here is ever
/// mutated after [`crate::tree::parse`] returns.
#[derive(Debug)]
pub struct Tree {
    uuid: Uuid,
    name: ConstString,
    mode: TreeMode,
    root: NodeId,
    nodes: HashMap<NodeId, Node>,
}

impl Tree {
    pub(crate) fn new(name: ConstString, mode: TreeMode, root: NodeId, nodes: HashMap<NodeId, Node>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name,
            mode,
            root,
            nodes,
        }
    }

    /// Unique id assigned to this parsed instance.
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// The name this tree was registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The mode this tree was parsed in.
    #[must_use]
    pub const fn mode(&self) -> TreeMode {
        self.mode
    }

    /// Id of the (single) root node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Ordered child ids of `id`, or an empty slice if `id` is a leaf.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], Node::children)
    }

    /// Script body attached to `id`, if any.
    #[must_use]
    pub fn script_of(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(Node::script)
    }

    /// HTTP descriptor attached to `id`, if it is an [`NodeKind::Action`] node.
    #[must_use]
    pub fn action_descriptor(&self, id: NodeId) -> Option<&ActionDescriptor> {
        self.node(id).and_then(Node::action)
    }

    /// Total number of nodes in the tree, used by tests asserting a round-trip parse.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes at all (never true for a successfully parsed tree).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Builder used only by [`crate::tree::parse`] to assemble a [`Tree`] node by node.
pub(crate) struct NodeBuilder {
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind,
    pub(crate) children: Vec<NodeId>,
    pub(crate) script: Option<ConstString>,
    pub(crate) action: Option<ActionDescriptor>,
    pub(crate) loop_count: u32,
    pub(crate) wait_ms: u64,
}

impl NodeBuilder {
    pub(crate) fn build(self) -> Node {
        Node {
            id: self.id,
            kind: self.kind,
            children: self.children,
            script: self.script,
            action: self.action,
            loop_count: self.loop_count,
            wait_ms: self.wait_ms,
        }
    }
}

/// A shared, reference-counted handle to a [`Tree`].
pub type SharedTree = Arc<Tree>;
