//! Path naming and path-based lookups.
//!
//! Two kinds of path exist:
//!
//! - [`NavigatorModel::path_name`]: the dotted object path shown to users
//!   (`public.orders`). Folders are skipped and the connection is excluded.
//! - [`NavigatorModel::node_path`]: a `/`-separated path that identifies a node
//!   across sessions (`warehouse/schemas/public/tables/orders`). Folder segments
//!   use the folder's type tag; [`NavigatorModel::find_node_by_path`] resolves
//!   it back, loading children on the way.

use crate::domain::{ObjectRef, ancestor_chain};
use crate::error::Result;
use crate::loader::ChildrenOutcome;
use crate::logging::targets;
use crate::model::NavigatorModel;
use crate::node::{NodeId, NodeKind};
use crate::progress::ProgressMonitor;

/// Separator of [`NavigatorModel::node_path`] segments.
pub const NODE_PATH_SEPARATOR: &str = "/";

impl NavigatorModel {
    /// Name of `node` prefixed with its non-folder ancestors up to (excluding) the connection.
    pub fn path_name(&self, node: NodeId) -> Result<String> {
        let mut segments = vec![self.tree.view(node)?.name()];
        for ancestor in self.tree.ancestors(node) {
            let data = self.tree.get(ancestor)?;
            match &data.kind {
                NodeKind::Root | NodeKind::Connection { .. } => break,
                NodeKind::Folder { .. } => continue,
                NodeKind::Item { .. } | NodeKind::Object { .. } => {
                    segments.push(data.view(ancestor).name());
                }
            }
        }
        segments.reverse();
        Ok(segments.join(self.config.path_separator.as_str()))
    }

    /// Stable `/`-separated path of `node`, starting with its connection name.
    ///
    /// The root has an empty path.
    pub fn node_path(&self, node: NodeId) -> Result<String> {
        let mut segments = Vec::new();
        for id in std::iter::once(node).chain(self.tree.ancestors(node)) {
            let data = self.tree.get(id)?;
            match &data.kind {
                NodeKind::Root => break,
                NodeKind::Folder { shape } => segments.push(shape.path_tag().to_string()),
                _ => segments.push(data.view(id).name()),
            }
        }
        segments.reverse();
        Ok(segments.join(NODE_PATH_SEPARATOR))
    }

    /// Resolve a [`node_path`](Self::node_path) string, loading children as needed.
    pub fn find_node_by_path(
        &mut self,
        path: &str,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Option<NodeId>> {
        self.ensure_live()?;
        let segments: Vec<&str> = path
            .split(NODE_PATH_SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .collect();
        let Some((first, rest)) = segments.split_first() else {
            return Ok(None);
        };

        let candidates: Vec<NodeId> = self
            .connections()
            .iter()
            .copied()
            .filter(|&node| self.tree.view(node).is_ok_and(|view| view.name() == *first))
            .collect();
        if candidates.is_empty() {
            tracing::debug!(target: targets::PATH, connection = *first, "connection node not found");
            return Ok(None);
        }
        for connection in candidates {
            if let Some(found) = self.descend_path(connection, rest, monitor)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Match `segments` below `node`, backtracking over same-named siblings.
    fn descend_path(
        &mut self,
        node: NodeId,
        segments: &[&str],
        monitor: &dyn ProgressMonitor,
    ) -> Result<Option<NodeId>> {
        let Some((segment, rest)) = segments.split_first() else {
            return Ok(Some(node));
        };
        let ChildrenOutcome::Loaded(children) = self.children(node, monitor)? else {
            return Ok(None);
        };

        for child in children {
            let matches = {
                let view = self.tree.view(child)?;
                let tag_matches = match view.kind() {
                    NodeKind::Folder { shape } => shape.path_tag() == *segment,
                    _ => false,
                };
                tag_matches || view.name() == *segment
            };
            if !matches {
                continue;
            }
            if let Some(found) = self.descend_path(child, rest, monitor)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Resolve `object` to its node, expanding the tree along its ancestor chain.
    ///
    /// Every ancestor must already be reachable: the walk starts from the
    /// topmost ancestor (normally a connection handle) and fails with a warning
    /// as soon as an ancestor has no node. With `load == false` this is a plain
    /// [`lookup`](Self::lookup).
    pub fn lookup_by_path(
        &mut self,
        object: &ObjectRef,
        load: bool,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Option<NodeId>> {
        self.resolve_object(object, load, false, monitor)
    }

    /// Like [`lookup_by_path`](Self::lookup_by_path), but an object hidden by a
    /// name filter is added to its filtered parent instead of being reported missing.
    pub fn reveal_object(
        &mut self,
        object: &ObjectRef,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Option<NodeId>> {
        self.resolve_object(object, true, true, monitor)
    }

    fn resolve_object(
        &mut self,
        object: &ObjectRef,
        load: bool,
        add_filtered: bool,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Option<NodeId>> {
        if let Some(node) = self.lookup(object) {
            return Ok(Some(node));
        }
        if !load {
            return Ok(None);
        }
        self.ensure_live()?;

        let mut chain = ancestor_chain(object);
        chain.push(object.clone());
        for pair in chain.windows(2) {
            let (ancestor, next) = (&pair[0], &pair[1]);
            let Some(node) = self.lookup(ancestor) else {
                tracing::warn!(target: targets::PATH, object = ?ancestor, "can't find tree node for object");
                return Ok(None);
            };
            if self.lookup(next).is_none() {
                self.expand_towards(node, next, add_filtered, monitor)?;
            }
        }
        Ok(self.lookup(object))
    }

    /// Load `node` and its folders until an item bound to `target` exists.
    fn expand_towards(
        &mut self,
        node: NodeId,
        target: &ObjectRef,
        add_filtered: bool,
        monitor: &dyn ProgressMonitor,
    ) -> Result<bool> {
        let ChildrenOutcome::Loaded(children) = self.children(node, monitor)? else {
            return Ok(false);
        };
        if self.lookup(target).is_some() {
            return Ok(true);
        }

        for child in children {
            let is_folder = self.tree.get(child)?.kind.is_folder();
            if is_folder && self.expand_towards(child, target, add_filtered, monitor)? {
                return Ok(true);
            }
        }

        if add_filtered && self.filtered_slot_lists(node, target, monitor)? {
            tracing::debug!(target: targets::PATH, ?node, object = ?target, "adding filtered object");
            self.add_child_item(node, target.clone())?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Whether `node` was loaded through a name filter and its single item
    /// slot's collection contains `target`.
    fn filtered_slot_lists(
        &self,
        node: NodeId,
        target: &ObjectRef,
        monitor: &dyn ProgressMonitor,
    ) -> Result<bool> {
        let view = self.tree.view(node)?;
        if !view.is_filtered() {
            return Ok(false);
        }
        let Some(property) = view
            .shape()
            .and_then(|shape| shape.single_item_slot())
            .and_then(|slot| slot.item_property())
        else {
            return Ok(false);
        };
        let Some(object) = self.value_object(node) else {
            return Ok(false);
        };

        let listed = self
            .properties
            .read_named_property(&object, property, monitor)
            .and_then(|value| value.into_object_collection(property));
        match listed {
            Ok(objects) => Ok(objects.iter().any(|candidate| candidate.ptr_eq(target))),
            Err(err) => {
                tracing::warn!(target: targets::PATH, ?node, error = %err, "can't read filtered collection");
                Ok(false)
            }
        }
    }
}
