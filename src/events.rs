use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::NodeId;
use crate::{Document, Result};

/// Callback run when a listener fires. It receives the document so it can
/// read and annotate the target.
pub type Handler = Rc<dyn Fn(&mut Document, &EventState) -> Result<()>>;

/// Identity of a registered listener, used to remove exactly that listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    pub capture: bool,
    /// Remove the listener right before its first invocation.
    pub once: bool,
}

impl ListenerOptions {
    pub fn once() -> Self {
        Self {
            once: true,
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) options: ListenerOptions,
    pub(crate) handler: Handler,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<Listener>>>,
    next_id: u64,
}

impl ListenerStore {
    pub(crate) fn add(
        &mut self,
        node_id: NodeId,
        event: &str,
        options: ListenerOptions,
        handler: Handler,
    ) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.map
            .entry(node_id)
            .or_default()
            .entry(event.to_string())
            .or_default()
            .push(Listener {
                id,
                options,
                handler,
            });
        id
    }

    pub(crate) fn remove(&mut self, node_id: NodeId, event: &str, id: ListenerId) -> bool {
        let Some(events) = self.map.get_mut(&node_id) else {
            return false;
        };
        let Some(listeners) = events.get_mut(event) else {
            return false;
        };
        let Some(pos) = listeners.iter().position(|listener| listener.id == id) else {
            return false;
        };

        listeners.remove(pos);
        if listeners.is_empty() {
            events.remove(event);
        }
        if events.is_empty() {
            self.map.remove(&node_id);
        }
        true
    }

    pub(crate) fn contains(&self, node_id: NodeId, event: &str, id: ListenerId) -> bool {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .is_some_and(|listeners| listeners.iter().any(|listener| listener.id == id))
    }

    pub(crate) fn get(&self, node_id: NodeId, event: &str, capture: bool) -> Vec<Listener> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|listener| listener.options.capture == capture)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, node_id: NodeId, event: &str) -> usize {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map_or(0, Vec::len)
    }
}

/// The event being dispatched, as seen by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventState {
    pub event_type: String,
    pub target: NodeId,
    pub current_target: NodeId,
}

impl EventState {
    pub(crate) fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Handler {
        Rc::new(|_: &mut Document, _: &EventState| -> Result<()> { Ok(()) })
    }

    #[test]
    fn listeners_are_removed_by_identity() {
        let mut store = ListenerStore::default();
        let node = NodeId(1);
        let first = store.add(node, "input", ListenerOptions::default(), noop());
        let second = store.add(node, "input", ListenerOptions::default(), noop());
        assert_ne!(first, second);
        assert_eq!(store.count(node, "input"), 2);

        assert!(store.remove(node, "input", first));
        assert!(!store.remove(node, "input", first));
        assert!(!store.remove(node, "change", second));
        assert!(store.contains(node, "input", second));
        assert_eq!(store.count(node, "input"), 1);

        assert!(store.remove(node, "input", second));
        assert_eq!(store.count(node, "input"), 0);
        assert!(store.map.is_empty());
    }

    #[test]
    fn get_filters_by_phase() {
        let mut store = ListenerStore::default();
        let node = NodeId(2);
        let capture = ListenerOptions {
            capture: true,
            ..ListenerOptions::default()
        };
        let captured = store.add(node, "change", capture, noop());
        let bubbled = store.add(node, "change", ListenerOptions::once(), noop());

        let ids = |capture| {
            store
                .get(node, "change", capture)
                .iter()
                .map(|listener| listener.id)
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(true), vec![captured]);
        assert_eq!(ids(false), vec![bubbled]);
    }
}
