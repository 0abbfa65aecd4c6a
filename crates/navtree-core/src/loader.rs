//! Lazy children loading.
//!
//! A load runs in three phases so the slow middle part never needs the model:
//!
//! 1. [`NavigatorModel::prepare_load`] either answers immediately (leaf, cached,
//!    childless shape) or captures a [`LoadRequest`].
//! 2. [`LoadRequest::fetch`] runs the node's initialize hook and walks the shape
//!    slots, reading item collections through the property registry.
//! 3. [`NavigatorModel::commit_load`] materializes and registers the children,
//!    unless the node was disposed or its cache reset in the meantime.
//!
//! Nodes are only created at commit, so a cancelled or failed fetch leaves no
//! trace in the tree or the identity registry.
//!
//! ```
//! use navtree_core::{ChildrenOutcome, LoadPlan, NavigatorModel};
//! use navtree_core::progress::VoidProgress;
//! use navtree_core::value::PropertyRegistry;
//!
//! let mut model = NavigatorModel::new(PropertyRegistry::new());
//! let root = model.root();
//! let outcome = match model.prepare_load(root).unwrap() {
//!     LoadPlan::Ready(outcome) => outcome,
//!     LoadPlan::Fetch(request) => {
//!         let fetched = request.fetch(&VoidProgress).unwrap();
//!         model.commit_load(fetched).unwrap()
//!     }
//! };
//! assert_eq!(outcome, ChildrenOutcome::Loaded(Vec::new()));
//! ```

use std::sync::Arc;

use crate::domain::ObjectRef;
use crate::error::{NavigatorError, Result};
use crate::event::{EventAction, NodeChange};
use crate::filter::ObjectFilter;
use crate::logging::targets;
use crate::model::{FilterKey, FilterMap, NavigatorModel};
use crate::node::{NodeId, NodeKind};
use crate::progress::ProgressMonitor;
use crate::shape::{Shape, SlotKind};
use crate::value::{PropertyRegistry, Value};

/// Result of asking a node for its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildrenOutcome {
    /// The children, in slot declaration order then discovery order.
    Loaded(Vec<NodeId>),
    /// The initialize hook reported the node unavailable; nothing was cached.
    NotAvailable,
    /// The load was cancelled; nothing was cached.
    Cancelled,
    /// The node was disposed or reset while loading; the result was dropped.
    Discarded,
}

impl ChildrenOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Loaded children, if any.
    pub fn loaded(&self) -> Option<&[NodeId]> {
        match self {
            Self::Loaded(children) => Some(children),
            _ => None,
        }
    }

    pub fn into_loaded(self) -> Option<Vec<NodeId>> {
        match self {
            Self::Loaded(children) => Some(children),
            _ => None,
        }
    }
}

/// What [`NavigatorModel::prepare_load`] decided.
#[derive(Debug)]
pub enum LoadPlan {
    /// No fetch needed.
    Ready(ChildrenOutcome),
    /// Run [`LoadRequest::fetch`], then [`NavigatorModel::commit_load`].
    Fetch(LoadRequest),
}

/// A pending children load, detached from the model.
pub struct LoadRequest {
    node: NodeId,
    generation: u64,
    label: String,
    shape: Arc<Shape>,
    value_object: Option<ObjectRef>,
    init_object: Option<ObjectRef>,
    properties: Arc<PropertyRegistry>,
    filters: Arc<FilterMap>,
    show_system: bool,
}

/// Children fetched by a [`LoadRequest`], ready to be committed.
#[derive(Debug)]
pub struct FetchedChildren {
    node: NodeId,
    generation: u64,
    status: FetchStatus,
}

impl FetchedChildren {
    /// Node the children were fetched for.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Number of children that a commit would create.
    pub fn len(&self) -> usize {
        match &self.status {
            FetchStatus::Complete { children, .. } => children.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
enum FetchStatus {
    NotAvailable,
    Cancelled,
    Complete {
        children: Vec<PlannedChild>,
        filtered: bool,
    },
}

#[derive(Debug)]
enum PlannedChild {
    Folder(Arc<Shape>),
    Object(Arc<Shape>),
    Item { object: ObjectRef, shape: Arc<Shape> },
}

/// Outcome of reading one item slot's collection.
enum SlotRead {
    Objects(Vec<ObjectRef>),
    /// Null or empty collection; optional slots inline their own sub-slots.
    Empty,
    /// Unreadable or badly shaped value; the slot yields nothing.
    Rejected,
}

#[derive(Default)]
struct Collected {
    children: Vec<PlannedChild>,
    filtered: bool,
}

impl LoadRequest {
    /// Node being loaded.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Run the initialize hook and enumerate the shape's child slots.
    ///
    /// Touches no model state and may run without any lock held.
    #[tracing::instrument(skip_all, target = "navtree_core::loader", level = "debug", fields(node = ?self.node))]
    pub fn fetch(self, monitor: &dyn ProgressMonitor) -> Result<FetchedChildren> {
        if let Some(object) = &self.init_object {
            match object.initialize(monitor) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(target: targets::LOADER, node = ?self.node, "node is not available");
                    return Ok(self.finish(FetchStatus::NotAvailable));
                }
                Err(source) => return Err(NavigatorError::initialization(self.node, source)),
            }
        }

        let slots = self.shape.children();
        monitor.begin(&format!("Load {} items", self.label), slots.len());
        let mut collected = Collected::default();
        let cancelled = self.walk_slots(slots, monitor, 0, &mut collected) || monitor.is_cancelled();
        monitor.end();

        if cancelled {
            tracing::debug!(
                target: targets::LOADER,
                node = ?self.node,
                discarded = collected.children.len(),
                "children load cancelled"
            );
            return Ok(self.finish(FetchStatus::Cancelled));
        }

        tracing::debug!(
            target: targets::LOADER,
            node = ?self.node,
            count = collected.children.len(),
            "fetched children"
        );
        Ok(self.finish(FetchStatus::Complete {
            children: collected.children,
            filtered: collected.filtered,
        }))
    }

    fn finish(&self, status: FetchStatus) -> FetchedChildren {
        FetchedChildren {
            node: self.node,
            generation: self.generation,
            status,
        }
    }

    /// Walk `slots` in order. Returns `true` when cancelled.
    fn walk_slots(
        &self,
        slots: &[Arc<Shape>],
        monitor: &dyn ProgressMonitor,
        depth: usize,
        collected: &mut Collected,
    ) -> bool {
        for slot in slots {
            if monitor.is_cancelled() {
                return true;
            }
            monitor.sub_task(&format!("Load {}", slot.label()));

            match slot.kind() {
                SlotKind::Folder { .. } => collected.children.push(PlannedChild::Folder(slot.clone())),
                SlotKind::Object { .. } => collected.children.push(PlannedChild::Object(slot.clone())),
                SlotKind::Item { property, optional } => {
                    match self.read_slot(property, monitor) {
                        SlotRead::Objects(objects) => {
                            self.collect_items(slot, property, objects, collected);
                        }
                        SlotRead::Empty if *optional => {
                            if self.walk_slots(slot.children(), monitor, depth + 1, collected) {
                                return true;
                            }
                        }
                        SlotRead::Empty | SlotRead::Rejected => {}
                    }
                }
                SlotKind::Container => {
                    tracing::warn!(
                        target: targets::LOADER,
                        node = ?self.node,
                        slot = slot.label(),
                        "unsupported container slot"
                    );
                }
            }

            if depth == 0 {
                monitor.step();
            }
        }
        false
    }

    fn read_slot(&self, property: &str, monitor: &dyn ProgressMonitor) -> SlotRead {
        let Some(object) = &self.value_object else {
            tracing::warn!(target: targets::LOADER, node = ?self.node, property, "no value object to read items from");
            return SlotRead::Rejected;
        };

        let value = match self.properties.read_named_property(object, property, monitor) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(target: targets::LOADER, node = ?self.node, ?object, error = %err, "can't read child collection");
                return SlotRead::Rejected;
            }
        };
        if let Value::Null = value {
            return SlotRead::Empty;
        }

        match value.into_object_collection(property) {
            Ok(objects) if objects.is_empty() => SlotRead::Empty,
            Ok(objects) => SlotRead::Objects(objects),
            Err(err) => {
                tracing::warn!(target: targets::LOADER, node = ?self.node, ?object, error = %err, "bad child collection");
                SlotRead::Rejected
            }
        }
    }

    fn collect_items(
        &self,
        slot: &Arc<Shape>,
        property: &str,
        objects: Vec<ObjectRef>,
        collected: &mut Collected,
    ) {
        let filter = self.filter_for(property);
        collected.filtered |= filter.is_some();

        for object in objects {
            if object.is_hidden() {
                continue;
            }
            if !self.show_system && object.is_system() {
                continue;
            }
            if filter.is_some_and(|filter| !filter.matches(&object.name())) {
                continue;
            }
            collected.children.push(PlannedChild::Item {
                object,
                shape: slot.clone(),
            });
        }
    }

    /// Effective non-empty filter for `property`: parent specific first, then model wide.
    fn filter_for(&self, property: &str) -> Option<&ObjectFilter> {
        let scoped = FilterKey::new(self.value_object.clone(), property);
        self.filters
            .get(&scoped)
            .or_else(|| self.filters.get(&FilterKey::new(None, property)))
            .filter(|filter| !filter.is_empty())
    }
}

impl std::fmt::Debug for LoadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadRequest")
            .field("node", &self.node)
            .field("generation", &self.generation)
            .field("shape", &self.shape.label())
            .field("value_object", &self.value_object)
            .finish_non_exhaustive()
    }
}

impl NavigatorModel {
    /// First load phase: answer from the cache or capture a [`LoadRequest`].
    pub fn prepare_load(&self, node: NodeId) -> Result<LoadPlan> {
        self.ensure_live()?;
        let data = self.tree.get(node)?;

        let (shape, init_object) = match &data.kind {
            NodeKind::Root => {
                let connections = data.children.clone().unwrap_or_default();
                return Ok(LoadPlan::Ready(ChildrenOutcome::Loaded(connections)));
            }
            NodeKind::Object { .. } => return Ok(LoadPlan::Ready(ChildrenOutcome::Loaded(Vec::new()))),
            NodeKind::Folder { shape } => (shape.clone(), None),
            NodeKind::Connection { handle: object, shape } | NodeKind::Item { object, shape } => {
                (shape.clone(), Some(object.clone()))
            }
        };

        if !shape.has_children() {
            return Ok(LoadPlan::Ready(ChildrenOutcome::Loaded(Vec::new())));
        }
        if let Some(children) = &data.children {
            return Ok(LoadPlan::Ready(ChildrenOutcome::Loaded(children.clone())));
        }

        tracing::debug!(target: targets::LOADER, ?node, "loading children");
        Ok(LoadPlan::Fetch(LoadRequest {
            node,
            generation: data.generation,
            label: self.tree.view(node)?.name(),
            shape,
            value_object: self.value_object(node),
            init_object,
            properties: Arc::clone(&self.properties),
            filters: Arc::clone(&self.filters),
            show_system: self.config.show_system_objects,
        }))
    }

    /// Last load phase: materialize fetched children into the tree.
    pub fn commit_load(&mut self, fetched: FetchedChildren) -> Result<ChildrenOutcome> {
        self.ensure_live()?;
        let FetchedChildren {
            node,
            generation,
            status,
        } = fetched;

        let (planned, filtered) = match status {
            FetchStatus::NotAvailable => return Ok(ChildrenOutcome::NotAvailable),
            FetchStatus::Cancelled => return Ok(ChildrenOutcome::Cancelled),
            FetchStatus::Complete { children, filtered } => (children, filtered),
        };

        let Ok(data) = self.tree.get(node) else {
            tracing::debug!(target: targets::LOADER, ?node, "node disposed during load, discarding children");
            return Ok(ChildrenOutcome::Discarded);
        };
        if data.generation != generation {
            tracing::debug!(target: targets::LOADER, ?node, "children reset during load, discarding");
            return Ok(ChildrenOutcome::Discarded);
        }
        if let Some(existing) = &data.children {
            return Ok(ChildrenOutcome::Loaded(existing.clone()));
        }

        let mut children = Vec::with_capacity(planned.len());
        let mut items = Vec::new();
        for child in planned {
            let kind = match child {
                PlannedChild::Folder(shape) => NodeKind::Folder { shape },
                PlannedChild::Object(shape) => NodeKind::Object { shape },
                PlannedChild::Item { object, shape } => NodeKind::Item { object, shape },
            };
            let object = kind.bound_object().cloned();
            let id = self.tree.insert(node, kind);
            if let Some(object) = object {
                items.push((object, id));
            }
            children.push(id);
        }

        let data = self.tree.get_mut(node)?;
        data.children = Some(children.clone());
        data.filtered = filtered;

        for (object, id) in items {
            self.register_node(object, id);
        }
        tracing::debug!(target: targets::LOADER, ?node, count = children.len(), "children loaded");

        if filtered {
            self.fire(node, EventAction::Refreshed, NodeChange::Changed);
        }
        Ok(ChildrenOutcome::Loaded(children))
    }

    /// Children of `node`, loading them on first access.
    ///
    /// Blocks for the duration of the load. Initialization failures are
    /// returned as errors; cancellation and unavailability are outcomes.
    #[tracing::instrument(skip(self, monitor), target = "navtree_core::loader", level = "debug")]
    pub fn children(&mut self, node: NodeId, monitor: &dyn ProgressMonitor) -> Result<ChildrenOutcome> {
        match self.prepare_load(node)? {
            LoadPlan::Ready(outcome) => Ok(outcome),
            LoadPlan::Fetch(request) => {
                let fetched = request.fetch(monitor)?;
                self.commit_load(fetched)
            }
        }
    }

    /// Whether `node` has children: the loaded list when available, the shape otherwise.
    pub fn has_children(&self, node: NodeId) -> Result<bool> {
        let data = self.tree.get(node)?;
        if let Some(children) = &data.children {
            return Ok(!children.is_empty());
        }
        Ok(data.kind.is_container())
    }

    /// Whether `node` can have children at all.
    pub fn allows_children(&self, node: NodeId) -> Result<bool> {
        Ok(self.tree.get(node)?.kind.is_container())
    }

    /// Whether a container's children still have to be loaded.
    pub fn needs_initialization(&self, node: NodeId) -> Result<bool> {
        let data = self.tree.get(node)?;
        Ok(data.kind.is_container() && data.children.is_none())
    }

    /// Whether `node` has a child created from slot `shape`. Loads children if needed.
    pub fn has_children_of_shape(
        &mut self,
        node: NodeId,
        shape: &Arc<Shape>,
        monitor: &dyn ProgressMonitor,
    ) -> Result<bool> {
        if !self.allows_children(node)? {
            return Ok(false);
        }
        let ChildrenOutcome::Loaded(children) = self.children(node, monitor)? else {
            return Ok(false);
        };
        Ok(children.into_iter().any(|child| {
            self.tree
                .get(child)
                .ok()
                .and_then(|data| data.kind.shape())
                .is_some_and(|child_shape| Arc::ptr_eq(child_shape, shape))
        }))
    }
}
