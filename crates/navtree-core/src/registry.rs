//! Identity registry: at most one node per live domain object.
//!
//! Keys compare by reference identity of the domain object (see
//! [`ObjectRef`]). The registry only keeps the mapping and reports
//! inconsistencies; the model turns successful changes into events.

use std::collections::HashMap;

use crate::domain::ObjectRef;
use crate::logging::targets;
use crate::node::NodeId;

/// Outcome of [`IdentityRegistry::unregister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unregistered {
    /// The mapping existed and was removed.
    Removed,
    /// No mapping existed for the object.
    Missing,
    /// The object is mapped to a different node; the mapping was kept.
    Foreign(NodeId),
}

/// Map from domain object to the node bound to it.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    nodes: HashMap<ObjectRef, NodeId>,
    warn_on_overwrite: bool,
}

impl IdentityRegistry {
    pub fn new(warn_on_overwrite: bool) -> Self {
        Self {
            nodes: HashMap::new(),
            warn_on_overwrite,
        }
    }

    /// Map `object` to `node`. Returns the previously mapped node, if any.
    ///
    /// An existing mapping is overwritten; this is logged unless disabled.
    pub fn register(&mut self, object: ObjectRef, node: NodeId) -> Option<NodeId> {
        let previous = self.nodes.insert(object.clone(), node);
        match previous {
            Some(previous) if previous != node && self.warn_on_overwrite => {
                tracing::warn!(
                    target: targets::REGISTRY,
                    ?object,
                    ?previous,
                    ?node,
                    "object is already registered, overwriting"
                );
            }
            _ => {
                tracing::trace!(target: targets::REGISTRY, ?object, ?node, "registered object");
            }
        }
        previous
    }

    /// Remove the mapping of `object` if it points at `node`.
    pub fn unregister(&mut self, object: &ObjectRef, node: NodeId) -> Unregistered {
        match self.nodes.get(object).copied() {
            None => {
                tracing::warn!(
                    target: targets::REGISTRY,
                    ?object,
                    ?node,
                    "object is not registered"
                );
                Unregistered::Missing
            }
            Some(current) if current != node => {
                // Overwritten by a later registration; the newer node owns the entry.
                tracing::warn!(
                    target: targets::REGISTRY,
                    ?object,
                    ?node,
                    ?current,
                    "object is registered to another node"
                );
                Unregistered::Foreign(current)
            }
            Some(_) => {
                self.nodes.remove(object);
                tracing::trace!(target: targets::REGISTRY, ?object, ?node, "unregistered object");
                Unregistered::Removed
            }
        }
    }

    /// Node bound to `object`.
    pub fn lookup(&self, object: &ObjectRef) -> Option<NodeId> {
        self.nodes.get(object).copied()
    }

    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.nodes.contains_key(object)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
    }
}
