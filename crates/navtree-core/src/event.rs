//! Navigator events and listener bookkeeping.
//!
//! Listeners are called in the order they were added. With
//! [`EventDelivery::Direct`] they run inside the mutating model call, so they
//! must not call back into the model; use [`EventDelivery::Queued`] and
//! [`NavigatorModel::dispatch_events`](crate::NavigatorModel::dispatch_events)
//! when a listener needs to.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use slotmap::{SlotMap, new_key_type};

use crate::config::EventDelivery;
use crate::domain::ObjectRef;
use crate::logging::targets;
use crate::node::NodeId;

/// What happened to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventAction {
    Added,
    Removed,
    Refreshed,
}

/// Secondary classification of a node change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeChange {
    /// The node was materialized.
    Loaded,
    /// The node was disposed.
    Unloaded,
    /// The node's content or children changed.
    Changed,
    /// The node started refreshing itself.
    Locked,
    /// The node finished refreshing itself.
    Unlocked,
}

/// A change notification.
///
/// The node may already be gone when a `Removed` event is delivered; the
/// event carries its kind, name and bound object for that reason.
#[derive(Debug, Clone)]
pub struct NavigatorEvent {
    pub action: EventAction,
    pub change: NodeChange,
    pub node: NodeId,
    /// Node kind name (`"item"`, `"connection"`, ...).
    pub kind: &'static str,
    /// Node display name at the time of the event.
    pub name: String,
    /// Bound domain object of Item and Connection nodes.
    pub object: Option<ObjectRef>,
}

impl NavigatorEvent {
    /// Whether this is an `action` × `change` event.
    pub fn is(&self, action: EventAction, change: NodeChange) -> bool {
        self.action == action && self.change == change
    }
}

/// Receives navigator events.
pub trait NavigatorListener: Send + Sync {
    fn on_event(&self, event: &NavigatorEvent);
}

impl<F> NavigatorListener for F
where
    F: Fn(&NavigatorEvent) + Send + Sync,
{
    fn on_event(&self, event: &NavigatorEvent) {
        self(event)
    }
}

new_key_type! {
    /// Identifies a listener added to a model.
    pub struct ListenerId;
}

pub(crate) type SharedListener = Arc<dyn NavigatorListener>;

/// Ordered listener list plus the pending queue for queued delivery.
pub(crate) struct EventBus {
    listeners: SlotMap<ListenerId, SharedListener>,
    order: Vec<ListenerId>,
    delivery: EventDelivery,
    sender: Sender<NavigatorEvent>,
    receiver: Receiver<NavigatorEvent>,
}

impl EventBus {
    pub(crate) fn new(delivery: EventDelivery) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            listeners: SlotMap::with_key(),
            order: Vec::new(),
            delivery,
            sender,
            receiver,
        }
    }

    /// Add a listener. Adding the same listener twice is logged and returns the existing id.
    pub(crate) fn add(&mut self, listener: SharedListener) -> ListenerId {
        let address = listener_address(&listener);
        if let Some((id, _)) = self
            .listeners
            .iter()
            .find(|(_, existing)| listener_address(existing) == address)
        {
            tracing::warn!(target: targets::EVENT, ?id, "listener is already registered in model");
            return id;
        }
        let id = self.listeners.insert(listener);
        self.order.push(id);
        tracing::trace!(target: targets::EVENT, ?id, "added listener");
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        if self.listeners.remove(id).is_some() {
            self.order.retain(|&other| other != id);
            tracing::trace!(target: targets::EVENT, ?id, "removed listener");
            true
        } else {
            tracing::warn!(target: targets::EVENT, ?id, "listener wasn't registered in model");
            false
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn clear(&mut self) {
        self.listeners.clear();
        self.order.clear();
        while self.receiver.try_recv().is_ok() {}
    }

    /// Publish an event according to the delivery mode.
    pub(crate) fn emit(&self, event: NavigatorEvent) {
        tracing::trace!(
            target: targets::EVENT,
            action = ?event.action,
            change = ?event.change,
            node = ?event.node,
            "navigator event"
        );
        match self.delivery {
            EventDelivery::Direct => deliver(&self.snapshot(), &event),
            EventDelivery::Queued => {
                // The bus owns the receiver, so sending cannot fail.
                let _ = self.sender.send(event);
            }
        }
    }

    /// Listeners in delivery order.
    pub(crate) fn snapshot(&self) -> Vec<SharedListener> {
        self.order
            .iter()
            .filter_map(|id| self.listeners.get(*id).cloned())
            .collect()
    }

    /// Take every queued event.
    pub(crate) fn drain(&self) -> Vec<NavigatorEvent> {
        self.receiver.try_iter().collect()
    }

    pub(crate) fn pending(&self) -> usize {
        self.receiver.len()
    }
}

/// Deliver `event` to `listeners` in order.
pub(crate) fn deliver(listeners: &[SharedListener], event: &NavigatorEvent) {
    for listener in listeners {
        listener.on_event(event);
    }
}

fn listener_address(listener: &SharedListener) -> *const () {
    Arc::as_ptr(listener) as *const ()
}
