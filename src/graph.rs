//! Scene-graph boundary between the simulation and whatever draws it.
//!
//! Components never look nodes up by name. Each one is handed a
//! [`NodeHandle`] when it is created, keeps it, and uses it to attach and
//! detach itself through the [`SceneGraph`] trait. The renderer implements
//! the trait to know what to draw; [`SceneNodes`] implements it in memory
//! for headless runs and tests.

use std::collections::HashMap;
use std::fmt;

/// Opaque identifier of one scene-graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(u64);

impl NodeHandle {
    /// Raw id, for logging.
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out unique node handles.
#[derive(Debug, Default)]
pub struct NodeAllocator {
    next: u64,
}

impl NodeAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused handle. Handles are never reused.
    pub fn allocate(&mut self) -> NodeHandle {
        let handle = NodeHandle(self.next);
        self.next += 1;
        handle
    }
}

/// What a node is. Each kind has a stable label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The tree particle population.
    TreeParticles,
    /// The emblem mesh on top of the tree.
    Emblem,
    /// The burst field around the emblem.
    BurstParticles,
    /// One falling star.
    FallingStar,
}

impl NodeKind {
    /// Stable logical name of the node.
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::TreeParticles => "treeParticles",
            NodeKind::Emblem => "star",
            NodeKind::BurstParticles => "starParticles",
            NodeKind::FallingStar => "fallingStar",
        }
    }
}

/// Attach/detach interface implemented by rendering collaborators.
///
/// Both operations are idempotent: attaching an attached node or detaching
/// a detached one changes nothing.
pub trait SceneGraph {
    /// Make `node` visible.
    fn attach(&mut self, node: NodeHandle, kind: NodeKind);

    /// Remove `node`. Resources held for it may be released.
    fn detach(&mut self, node: NodeHandle);

    /// Whether `node` is currently attached.
    fn is_attached(&self, node: NodeHandle) -> bool;
}

/// In-memory scene graph: the set of attached nodes and their kinds.
#[derive(Debug, Default, Clone)]
pub struct SceneNodes {
    nodes: HashMap<NodeHandle, NodeKind>,
}

impl SceneNodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attached nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of attached nodes of `kind`.
    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.values().filter(|k| **k == kind).count()
    }

    /// Kind of an attached node.
    pub fn kind_of(&self, node: NodeHandle) -> Option<NodeKind> {
        self.nodes.get(&node).copied()
    }

    /// Attached handles of `kind`, in allocation order.
    pub fn handles(&self, kind: NodeKind) -> Vec<NodeHandle> {
        let mut handles: Vec<NodeHandle> = self
            .nodes
            .iter()
            .filter(|(_, k)| **k == kind)
            .map(|(h, _)| *h)
            .collect();
        handles.sort();
        handles
    }
}

impl SceneGraph for SceneNodes {
    fn attach(&mut self, node: NodeHandle, kind: NodeKind) {
        self.nodes.insert(node, kind);
    }

    fn detach(&mut self, node: NodeHandle) {
        self.nodes.remove(&node);
    }

    fn is_attached(&self, node: NodeHandle) -> bool {
        self.nodes.contains_key(&node)
    }
}
