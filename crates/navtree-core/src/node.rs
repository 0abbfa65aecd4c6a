//! Node storage.
//!
//! Nodes live in a [`SlotMap`] arena owned by the model. A node refers to its
//! parent by [`NodeId`] and to its cached children by a list of ids it is
//! responsible for disposing. Disposed nodes are removed from the arena, so a
//! stale id never resolves to a different node.

use std::sync::Arc;

use slotmap::{Key, SlotMap, new_key_type};

use crate::domain::ObjectRef;
use crate::error::{NavigatorError, Result};
use crate::logging::targets;
use crate::shape::Shape;

new_key_type! {
    /// Handle to a node of a [`NavigatorModel`](crate::NavigatorModel).
    pub struct NodeId;
}

/// The node variants.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// The tree root; its children are the connection nodes.
    Root,
    /// Top-level container bound to one backend connection.
    Connection { handle: ObjectRef, shape: Arc<Shape> },
    /// Pure grouping node.
    Folder { shape: Arc<Shape> },
    /// Node bound one-to-one to a domain object.
    Item { object: ObjectRef, shape: Arc<Shape> },
    /// Synthetic leaf declared by a terminal object slot.
    Object { shape: Arc<Shape> },
}

impl NodeKind {
    /// Short lowercase name of the variant.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Connection { .. } => "connection",
            Self::Folder { .. } => "folder",
            Self::Item { .. } => "item",
            Self::Object { .. } => "object",
        }
    }

    /// Shape descriptor of the node. The root has none.
    pub fn shape(&self) -> Option<&Arc<Shape>> {
        match self {
            Self::Root => None,
            Self::Connection { shape, .. }
            | Self::Folder { shape }
            | Self::Item { shape, .. }
            | Self::Object { shape } => Some(shape),
        }
    }

    /// Domain object the node is bound to (connection handle or item object).
    pub fn bound_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Connection { handle, .. } => Some(handle),
            Self::Item { object, .. } => Some(object),
            _ => None,
        }
    }

    /// Whether the node may have children at all.
    pub fn is_container(&self) -> bool {
        match self {
            Self::Root => true,
            Self::Object { .. } => false,
            Self::Connection { shape, .. } | Self::Folder { shape } | Self::Item { shape, .. } => {
                shape.has_children()
            }
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder { .. })
    }
}

/// Per-node record stored in the arena.
#[derive(Debug)]
pub(crate) struct NodeData {
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
    /// `None` until loaded; `Some(empty)` is a loaded, empty container.
    pub(crate) children: Option<Vec<NodeId>>,
    pub(crate) locked: bool,
    pub(crate) filtered: bool,
    /// Bumped whenever the children cache is reset, so stale loads can be detected.
    pub(crate) generation: u64,
}

impl NodeData {
    fn new(parent: Option<NodeId>, kind: NodeKind) -> Self {
        let children = matches!(kind, NodeKind::Root).then(Vec::new);
        Self {
            parent,
            kind,
            children,
            locked: false,
            filtered: false,
            generation: 0,
        }
    }

    pub(crate) fn view(&self, id: NodeId) -> NodeView<'_> {
        NodeView { id, data: self }
    }
}

/// Read-only view of one node.
#[derive(Clone, Copy)]
pub struct NodeView<'a> {
    id: NodeId,
    data: &'a NodeData,
}

impl<'a> NodeView<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Parent node. `None` only for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.data.parent
    }

    pub fn kind(&self) -> &'a NodeKind {
        &self.data.kind
    }

    pub fn shape(&self) -> Option<&'a Arc<Shape>> {
        self.data.kind.shape()
    }

    /// Bound domain object (Item and Connection nodes).
    pub fn object(&self) -> Option<&'a ObjectRef> {
        self.data.kind.bound_object()
    }

    /// Cached children, without loading.
    pub fn children(&self) -> Option<&'a [NodeId]> {
        self.data.children.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.data.children.is_some()
    }

    /// Whether the node is refreshing itself.
    pub fn is_locked(&self) -> bool {
        self.data.locked
    }

    /// Whether the last children load applied a name filter.
    pub fn is_filtered(&self) -> bool {
        self.data.filtered
    }

    /// Display name: the bound object's name or the slot label.
    pub fn name(&self) -> String {
        match &self.data.kind {
            NodeKind::Root => "Root".to_string(),
            NodeKind::Connection { handle: object, .. } | NodeKind::Item { object, .. } => {
                object.display_name()
            }
            NodeKind::Folder { shape } | NodeKind::Object { shape } => shape.label().to_string(),
        }
    }
}

impl std::fmt::Debug for NodeView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeView")
            .field("id", &self.id)
            .field("kind", &self.data.kind.kind_name())
            .field("name", &self.name())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Arena of nodes with parent links and children caches.
pub(crate) struct NodeTree {
    nodes: SlotMap<NodeId, NodeData>,
    root: NodeId,
}

impl NodeTree {
    pub(crate) fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(NodeData::new(None, NodeKind::Root));
        Self { nodes, root }
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Insert a detached node under `parent`. The caller places it in the parent's cache.
    pub(crate) fn insert(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let kind_name = kind.kind_name();
        let id = self.nodes.insert(NodeData::new(Some(parent), kind));
        tracing::trace!(target: targets::MODEL, ?id, ?parent, kind = kind_name, "created node");
        id
    }

    pub(crate) fn get(&self, id: NodeId) -> Result<&NodeData> {
        self.nodes.get(id).ok_or_else(|| missing(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        self.nodes.get_mut(id).ok_or_else(|| missing(id))
    }

    pub(crate) fn view(&self, id: NodeId) -> Result<NodeView<'_>> {
        Ok(self.get(id)?.view(id))
    }

    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|data| data.parent)
    }

    /// Cached children of `id`, if loaded.
    pub(crate) fn children(&self, id: NodeId) -> Option<&[NodeId]> {
        self.nodes.get(id).and_then(|data| data.children.as_deref())
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub(crate) fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    /// Collect `id` and its cached descendants, children before parents.
    pub(crate) fn collect_subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        self.collect_subtree_recursive(id, &mut result);
        result
    }

    fn collect_subtree_recursive(&self, id: NodeId, result: &mut Vec<NodeId>) {
        if let Some(children) = self.children(id) {
            for &child in children {
                self.collect_subtree_recursive(child, result);
            }
        }
        if self.contains(id) {
            result.push(id);
        }
    }

    /// Remove `child` from the children cache of its parent.
    pub(crate) fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        if let Some(children) = self.nodes.get_mut(parent).and_then(|data| data.children.as_mut()) {
            children.retain(|&other| other != child);
        }
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> Option<NodeData> {
        let removed = self.nodes.remove(id);
        if removed.is_some() {
            tracing::trace!(target: targets::MODEL, ?id, "removed node");
        }
        removed
    }
}

fn missing(id: NodeId) -> NavigatorError {
    if id.is_null() {
        NavigatorError::InvalidNode(id)
    } else {
        NavigatorError::Disposed(id)
    }
}
