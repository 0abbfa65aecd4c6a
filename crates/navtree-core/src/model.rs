//! The navigator model.
//!
//! [`NavigatorModel`] owns the node arena, the identity registry, the listener
//! list and the property registry. It is the only event source. Mutating
//! operations take `&mut self`; wrap the model in a [`SharedNavigatorModel`]
//! to use it from several threads.
//!
//! # Example
//!
//! ```
//! use navtree_core::domain::{DomainObject, ObjectRef};
//! use navtree_core::progress::VoidProgress;
//! use navtree_core::shape::Shape;
//! use navtree_core::value::{PropertyRegistry, PropertyTable, Value};
//! use navtree_core::NavigatorModel;
//!
//! struct Database {
//!     schemas: Vec<ObjectRef>,
//! }
//!
//! impl DomainObject for Database {
//!     fn name(&self) -> String {
//!         "warehouse".into()
//!     }
//! }
//!
//! struct Schema(&'static str);
//!
//! impl DomainObject for Schema {
//!     fn name(&self) -> String {
//!         self.0.into()
//!     }
//! }
//!
//! let mut properties = PropertyRegistry::new();
//! properties.register(
//!     PropertyTable::<Database>::new()
//!         .with("schemas", |db, _| Ok(Value::objects(db.schemas.clone()))),
//! );
//!
//! let shape = Shape::container("postgres")
//!     .child(Shape::folder("Schemas").child(Shape::item("Schema", "schemas")))
//!     .into_shared();
//!
//! let mut model = NavigatorModel::new(properties);
//! let database = ObjectRef::new(Database {
//!     schemas: vec![ObjectRef::new(Schema("public"))],
//! });
//! let connection = model.add_connection(database, shape).unwrap();
//!
//! let folders = model.children(connection, &VoidProgress).unwrap().into_loaded().unwrap();
//! let schemas = model.children(folders[0], &VoidProgress).unwrap().into_loaded().unwrap();
//! assert_eq!(model.node_name(schemas[0]).unwrap(), "public");
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::NavigatorConfig;
use crate::domain::ObjectRef;
use crate::error::{NavigatorError, Result};
use crate::event::{
    self, EventAction, EventBus, ListenerId, NavigatorEvent, NavigatorListener, NodeChange,
    SharedListener,
};
use crate::filter::ObjectFilter;
use crate::loader::{ChildrenOutcome, LoadPlan};
use crate::logging::targets;
use crate::node::{NodeData, NodeId, NodeKind, NodeTree, NodeView};
use crate::progress::ProgressMonitor;
use crate::registry::{IdentityRegistry, Unregistered};
use crate::shape::Shape;
use crate::value::PropertyRegistry;

/// Scope of an object filter: the parent value object (or every parent) and the item property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct FilterKey {
    parent: Option<ObjectRef>,
    property: String,
}

impl FilterKey {
    pub(crate) fn new(parent: Option<ObjectRef>, property: &str) -> Self {
        Self {
            parent,
            property: property.to_string(),
        }
    }
}

pub(crate) type FilterMap = HashMap<FilterKey, ObjectFilter>;

/// Something [`NavigatorModel::find_node`] can resolve.
#[derive(Debug, Clone, Copy)]
pub enum NodeTarget<'a> {
    Node(NodeId),
    Object(&'a ObjectRef),
}

impl From<NodeId> for NodeTarget<'_> {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

impl<'a> From<&'a ObjectRef> for NodeTarget<'a> {
    fn from(object: &'a ObjectRef) -> Self {
        Self::Object(object)
    }
}

/// Owner of a navigator tree.
pub struct NavigatorModel {
    pub(crate) tree: NodeTree,
    pub(crate) identity: IdentityRegistry,
    pub(crate) events: EventBus,
    pub(crate) properties: Arc<PropertyRegistry>,
    pub(crate) filters: Arc<FilterMap>,
    pub(crate) config: NavigatorConfig,
    disposed: bool,
}

impl NavigatorModel {
    /// Create a model with the default configuration.
    pub fn new(properties: PropertyRegistry) -> Self {
        Self::with_config(properties, NavigatorConfig::default())
    }

    /// Create a model with a custom configuration.
    pub fn with_config(properties: PropertyRegistry, config: NavigatorConfig) -> Self {
        tracing::debug!(target: targets::MODEL, ?config, "creating navigator model");
        Self {
            tree: NodeTree::new(),
            identity: IdentityRegistry::new(config.warn_on_duplicate_registration),
            events: EventBus::new(config.event_delivery),
            properties: Arc::new(properties),
            filters: Arc::new(FilterMap::new()),
            config,
            disposed: false,
        }
    }

    // =========================================================================
    // Tree queries
    // =========================================================================

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn properties(&self) -> &PropertyRegistry {
        &self.properties
    }

    /// Read-only view of a node.
    pub fn node(&self, node: NodeId) -> Result<NodeView<'_>> {
        self.tree.view(node)
    }

    /// Number of live nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.tree.len()
    }

    /// Whether `node` has been disposed (or never belonged to this model).
    pub fn is_node_disposed(&self, node: NodeId) -> bool {
        !self.tree.contains(node)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.parent(node)
    }

    /// Cached children of `node`. Never loads.
    pub fn cached_children(&self, node: NodeId) -> Option<&[NodeId]> {
        self.tree.children(node)
    }

    /// Connection nodes, in the order they were added.
    pub fn connections(&self) -> &[NodeId] {
        self.tree.children(self.tree.root()).unwrap_or_default()
    }

    /// The object item slots read from: the bound object of the nearest
    /// Item or Connection node, starting at `node`.
    pub fn value_object(&self, node: NodeId) -> Option<ObjectRef> {
        std::iter::once(node)
            .chain(self.tree.ancestors(node))
            .find_map(|id| {
                let data = self.tree.get(id).ok()?;
                match &data.kind {
                    NodeKind::Root => Some(None),
                    NodeKind::Folder { .. } | NodeKind::Object { .. } => None,
                    NodeKind::Connection { handle: object, .. } | NodeKind::Item { object, .. } => {
                        Some(Some(object.clone()))
                    }
                }
            })
            .flatten()
    }

    /// Display name of a node.
    pub fn node_name(&self, node: NodeId) -> Result<String> {
        Ok(self.tree.view(node)?.name())
    }

    /// Description of the bound object, or of the slot for folders and terminal objects.
    pub fn node_description(&self, node: NodeId) -> Result<Option<String>> {
        let data = self.tree.get(node)?;
        Ok(match &data.kind {
            NodeKind::Root => None,
            NodeKind::Connection { handle: object, .. } | NodeKind::Item { object, .. } => {
                object.description()
            }
            NodeKind::Folder { shape } | NodeKind::Object { shape } => {
                shape.description_text().map(str::to_string)
            }
        })
    }

    /// Fully qualified name of the bound object, or the display name.
    pub fn node_full_name(&self, node: NodeId) -> Result<String> {
        let view = self.tree.view(node)?;
        Ok(match view.object() {
            Some(object) => object.full_name(),
            None => view.name(),
        })
    }

    // =========================================================================
    // Identity registry
    // =========================================================================

    /// Node bound to `object`, if any. Never loads.
    pub fn lookup(&self, object: &ObjectRef) -> Option<NodeId> {
        self.identity.lookup(object)
    }

    /// Resolve a node handle or a domain object to a live node.
    pub fn find_node<'a>(&self, target: impl Into<NodeTarget<'a>>) -> Option<NodeId> {
        match target.into() {
            NodeTarget::Node(node) => self.tree.contains(node).then_some(node),
            NodeTarget::Object(object) => self.identity.lookup(object),
        }
    }

    /// Number of registered domain objects.
    pub fn registered_count(&self) -> usize {
        self.identity.len()
    }

    pub(crate) fn register_node(&mut self, object: ObjectRef, node: NodeId) {
        self.identity.register(object, node);
        self.fire(node, EventAction::Added, NodeChange::Loaded);
    }

    fn unregister_node(&mut self, node: NodeId, data: &NodeData) {
        let Some(object) = data.kind.bound_object() else {
            return;
        };
        if self.identity.unregister(object, node) == Unregistered::Removed {
            self.drop_scoped_filters(object);
            self.events
                .emit(make_event(node, data, EventAction::Removed, NodeChange::Unloaded));
        }
    }

    // =========================================================================
    // Connections
    // =========================================================================

    /// Add a connection node under the root.
    pub fn add_connection(&mut self, handle: ObjectRef, shape: Arc<Shape>) -> Result<NodeId> {
        self.ensure_live()?;
        let root = self.tree.root();
        if self.connection_node(&handle).is_some() {
            return Err(NavigatorError::ConnectionExists(handle.display_name()));
        }

        let node = self.tree.insert(
            root,
            NodeKind::Connection {
                handle: handle.clone(),
                shape,
            },
        );
        if let Some(connections) = self.tree.get_mut(root)?.children.as_mut() {
            connections.push(node);
        }
        self.register_node(handle, node);
        Ok(node)
    }

    /// Dispose the connection node bound to `handle`. Returns `false` if there is none.
    pub fn remove_connection(&mut self, handle: &ObjectRef) -> Result<bool> {
        self.ensure_live()?;
        match self.connection_node(handle) {
            Some(node) => {
                self.dispose_node(node)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn connection_node(&self, handle: &ObjectRef) -> Option<NodeId> {
        self.connections().iter().copied().find(|&node| {
            self.tree
                .get(node)
                .ok()
                .and_then(|data| data.kind.bound_object())
                .is_some_and(|bound| bound.ptr_eq(handle))
        })
    }

    // =========================================================================
    // Disposal
    // =========================================================================

    /// Dispose `node` and everything below it. Disposing a disposed node is a no-op.
    #[tracing::instrument(skip(self), target = "navtree_core::model", level = "trace")]
    pub fn dispose_node(&mut self, node: NodeId) -> Result<()> {
        if !self.tree.contains(node) {
            return Ok(());
        }
        if node == self.tree.root() {
            return Err(NavigatorError::shape_mismatch(
                node,
                "the root is disposed with the model",
            ));
        }
        self.tree.detach(node);
        self.dispose_subtree(node);
        Ok(())
    }

    /// Dispose the cached children of `node` and reset it to "not loaded".
    pub fn clear_children(&mut self, node: NodeId) -> Result<()> {
        if node == self.tree.root() {
            return Err(NavigatorError::shape_mismatch(
                node,
                "connections are managed with add_connection and remove_connection",
            ));
        }
        let data = self.tree.get_mut(node)?;
        data.generation += 1;
        data.filtered = false;
        let children = data.children.take().unwrap_or_default();
        for child in children {
            self.dispose_subtree(child);
        }
        Ok(())
    }

    /// Remove `node` and its cached descendants, children first, unregistering bound objects.
    fn dispose_subtree(&mut self, node: NodeId) {
        let order = self.tree.collect_subtree(node);
        tracing::trace!(target: targets::MODEL, ?node, count = order.len(), "disposing subtree");
        for id in order {
            if let Some(data) = self.tree.remove(id) {
                self.unregister_node(id, &data);
            }
        }
    }

    /// Dispose the whole tree and detach every listener.
    ///
    /// With queued delivery, events still pending (the removals included) are
    /// delivered before the listeners are detached. Later mutations fail with
    /// [`NavigatorError::ModelDisposed`].
    #[tracing::instrument(skip(self), target = "navtree_core::model", level = "debug")]
    pub fn dispose(&mut self) {
        let (listeners, pending) = self.dispose_detached();
        for queued in &pending {
            event::deliver(&listeners, queued);
        }
    }

    /// Dispose the tree, returning the listeners and the queued events that
    /// still have to be delivered.
    fn dispose_detached(&mut self) -> (Vec<SharedListener>, Vec<NavigatorEvent>) {
        if self.disposed {
            return (Vec::new(), Vec::new());
        }
        if self.events.len() > 0 {
            tracing::warn!(
                target: targets::MODEL,
                listeners = self.events.len(),
                "listeners are not unregistered from navigator model"
            );
        }

        let connections = self.connections().to_vec();
        for connection in connections {
            self.tree.detach(connection);
            self.dispose_subtree(connection);
        }
        if !self.identity.is_empty() {
            tracing::warn!(
                target: targets::REGISTRY,
                remaining = self.identity.len(),
                "registry not empty after disposal"
            );
            self.identity.clear();
        }
        let listeners = self.events.snapshot();
        let pending = self.events.drain();
        self.events.clear();
        Arc::make_mut(&mut self.filters).clear();
        self.disposed = true;
        (listeners, pending)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            Err(NavigatorError::ModelDisposed)
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Refresh `node`, bubbling up to the first ancestor whose object refreshes itself.
    ///
    /// Returns the node that actually refreshed, which may be an ancestor of
    /// `node`, or `None` when the bubble reached the root.
    #[tracing::instrument(skip(self, monitor), target = "navtree_core::model", level = "debug")]
    pub fn refresh(&mut self, node: NodeId, monitor: &dyn ProgressMonitor) -> Result<Option<NodeId>> {
        self.ensure_live()?;
        let mut current = node;
        loop {
            let data = self.tree.get(current)?;
            let parent = data.parent;
            match &data.kind {
                NodeKind::Root => return Ok(None),
                NodeKind::Folder { .. } | NodeKind::Object { .. } => {}
                NodeKind::Connection { handle: object, .. } | NodeKind::Item { object, .. } => {
                    // `locked` is only set while `refresh_content` runs; this
                    // catches a refresh re-entered from inside it.
                    if data.locked {
                        tracing::warn!(target: targets::MODEL, node = ?current, "attempt to refresh locked node");
                        return Ok(None);
                    }
                    let object = object.clone();
                    if object.refresh_object(monitor) {
                        self.refresh_content(current)?;
                        return Ok(Some(current));
                    }
                }
            }
            match parent {
                Some(parent) => current = parent,
                None => return Ok(None),
            }
        }
    }

    fn refresh_content(&mut self, node: NodeId) -> Result<()> {
        self.tree.get_mut(node)?.locked = true;
        self.fire(node, EventAction::Refreshed, NodeChange::Locked);

        let cleared = self.clear_children(node);
        self.fire(node, EventAction::Refreshed, NodeChange::Changed);

        self.tree.get_mut(node)?.locked = false;
        self.fire(node, EventAction::Refreshed, NodeChange::Unlocked);
        cleared
    }

    // =========================================================================
    // Out-of-band children
    // =========================================================================

    /// Append an Item node for `object` to a loaded container with a single item slot.
    pub fn add_child_item(&mut self, parent: NodeId, object: ObjectRef) -> Result<NodeId> {
        self.ensure_live()?;
        let data = self.tree.get(parent)?;
        if !data.kind.is_container() || matches!(data.kind, NodeKind::Root) {
            return Err(NavigatorError::NotContainer(parent));
        }
        if data.children.is_none() {
            return Err(NavigatorError::ChildrenNotLoaded(parent));
        }
        let slot = data
            .kind
            .shape()
            .and_then(|shape| shape.single_item_slot())
            .cloned()
            .ok_or_else(|| NavigatorError::shape_mismatch(parent, "no single item slot"))?;

        let node = self.tree.insert(
            parent,
            NodeKind::Item {
                object: object.clone(),
                shape: slot,
            },
        );
        if let Some(children) = self.tree.get_mut(parent)?.children.as_mut() {
            children.push(node);
        }
        self.register_node(object, node);
        Ok(node)
    }

    /// Dispose the cached child of `parent` bound to `object`. Returns `false` if there is none.
    pub fn remove_child_item(&mut self, parent: NodeId, object: &ObjectRef) -> Result<bool> {
        self.ensure_live()?;
        let child = self.tree.get(parent)?.children.as_ref().and_then(|children| {
            children.iter().copied().find(|&child| {
                self.tree
                    .get(child)
                    .ok()
                    .and_then(|data| data.kind.bound_object())
                    .is_some_and(|bound| bound.ptr_eq(object))
            })
        });
        match child {
            Some(child) => {
                self.dispose_node(child)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // =========================================================================
    // Filters
    // =========================================================================

    /// Set or clear the name filter for item property `property`.
    ///
    /// With `parent` the filter applies to children read from that object only;
    /// without it, to every parent. Takes effect on the next load. A
    /// parent-scoped filter is dropped when the node bound to its parent is
    /// disposed, so it does not outlive a refresh of an ancestor.
    pub fn set_filter(
        &mut self,
        parent: Option<&ObjectRef>,
        property: &str,
        filter: Option<ObjectFilter>,
    ) -> Result<()> {
        self.ensure_live()?;
        let key = FilterKey::new(parent.cloned(), property);
        let filters = Arc::make_mut(&mut self.filters);
        match filter {
            Some(filter) => {
                filters.insert(key, filter);
            }
            None => {
                filters.remove(&key);
            }
        }
        Ok(())
    }

    /// The filter set for exactly this scope.
    pub fn filter(&self, parent: Option<&ObjectRef>, property: &str) -> Option<&ObjectFilter> {
        self.filters.get(&FilterKey::new(parent.cloned(), property))
    }

    /// Number of filters set, model wide and parent scoped.
    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    fn drop_scoped_filters(&mut self, parent: &ObjectRef) {
        let scoped = |key: &FilterKey| key.parent.as_ref() == Some(parent);
        if !self.filters.keys().any(scoped) {
            return;
        }
        Arc::make_mut(&mut self.filters).retain(|key, _| !scoped(key));
        tracing::debug!(target: targets::MODEL, object = ?parent, "dropped filters of disposed parent");
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Add a listener. Adding the same listener twice is logged and returns its existing id.
    pub fn add_listener(&mut self, listener: Arc<dyn NavigatorListener>) -> ListenerId {
        self.events.add(listener)
    }

    /// Remove a listener. Returns `false` (and logs) if it was not added.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.events.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.events.len()
    }

    /// Number of events waiting for [`dispatch_events`](Self::dispatch_events).
    pub fn pending_events(&self) -> usize {
        self.events.pending()
    }

    /// Deliver queued events. Returns how many were delivered.
    pub fn dispatch_events(&self) -> usize {
        let listeners = self.events.snapshot();
        let pending = self.events.drain();
        for queued in &pending {
            event::deliver(&listeners, queued);
        }
        pending.len()
    }

    pub(crate) fn fire(&self, node: NodeId, action: EventAction, change: NodeChange) {
        if let Ok(data) = self.tree.get(node) {
            self.events.emit(make_event(node, data, action, change));
        }
    }
}

impl std::fmt::Debug for NavigatorModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigatorModel")
            .field("nodes", &self.tree.len())
            .field("registered", &self.identity.len())
            .field("listeners", &self.events.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

fn make_event(node: NodeId, data: &NodeData, action: EventAction, change: NodeChange) -> NavigatorEvent {
    NavigatorEvent {
        action,
        change,
        node,
        kind: data.kind.kind_name(),
        name: data.view(node).name(),
        object: data.kind.bound_object().cloned(),
    }
}

/// A thread-safe wrapper around [`NavigatorModel`].
///
/// Provides concurrent read access with exclusive write access via `RwLock`.
/// [`children`](Self::children) fetches without holding the lock, so other
/// threads can use the model while a slow load runs; a node disposed in the
/// meantime yields [`ChildrenOutcome::Discarded`].
///
/// Only one load per node should be in flight at a time; a second concurrent
/// load of the same node is harmless but wasted work.
#[derive(Clone)]
pub struct SharedNavigatorModel {
    inner: Arc<RwLock<NavigatorModel>>,
}

impl SharedNavigatorModel {
    pub fn new(model: NavigatorModel) -> Self {
        Self {
            inner: Arc::new(RwLock::new(model)),
        }
    }

    /// Children of `node`, loading them without holding the lock.
    pub fn children(&self, node: NodeId, monitor: &dyn ProgressMonitor) -> Result<ChildrenOutcome> {
        let plan = self.with_read(|model| model.prepare_load(node))?;
        match plan {
            LoadPlan::Ready(outcome) => Ok(outcome),
            LoadPlan::Fetch(request) => {
                let fetched = request.fetch(monitor)?;
                self.with_write(|model| model.commit_load(fetched))
            }
        }
    }

    /// Refresh `node` under the write lock.
    pub fn refresh(&self, node: NodeId, monitor: &dyn ProgressMonitor) -> Result<Option<NodeId>> {
        self.with_write(|model| model.refresh(node, monitor))
    }

    /// Deliver queued events with no lock held, so listeners may use the model.
    pub fn dispatch_events(&self) -> usize {
        let (listeners, pending) =
            self.with_read(|model| (model.events.snapshot(), model.events.drain()));
        for queued in &pending {
            event::deliver(&listeners, queued);
        }
        pending.len()
    }

    /// Dispose the model, delivering the last queued events with no lock held.
    pub fn dispose(&self) {
        let (listeners, pending) = self.with_write(|model| model.dispose_detached());
        for queued in &pending {
            event::deliver(&listeners, queued);
        }
    }

    /// Access the model with a read lock for complex operations.
    pub fn with_read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&NavigatorModel) -> R,
    {
        f(&self.inner.read())
    }

    /// Access the model with a write lock for complex operations.
    pub fn with_write<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut NavigatorModel) -> R,
    {
        f(&mut self.inner.write())
    }
}

static_assertions::assert_impl_all!(NavigatorModel: Send, Sync);
static_assertions::assert_impl_all!(SharedNavigatorModel: Send, Sync, Clone);
