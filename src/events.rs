//! A minimal listener registry for the editor client's events.

use std::fmt;

/// Events the editor client emits toward the embedding application.
#[derive(Debug, Clone)]
pub enum Event {
    /// Whether the client is in sync with the coordinator after the latest
    /// acknowledgement or remote operation.
    Synced(bool),
    /// An undo was replayed; carries a description of the applied operation.
    Undo(String),
    /// A redo was replayed.
    Redo(String),
    /// Something went wrong handling an adapter callback. The session should be
    /// treated as corrupt; the payload carries enough context to reproduce.
    Error(String),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EventKind {
    Synced,
    Undo,
    Redo,
    Error,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Synced(_) => EventKind::Synced,
            Event::Undo(_) => EventKind::Undo,
            Event::Redo(_) => EventKind::Redo,
            Event::Error(_) => EventKind::Error,
        }
    }
}

/// Handle returned from `on`, used to unregister the listener again.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&Event)>;

#[derive(Default)]
pub(crate) struct EventEmitter {
    next_id: u64,
    listeners: Vec<(ListenerId, EventKind, Listener)>,
}

impl EventEmitter {
    pub(crate) fn on(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, kind, listener));
        id
    }

    pub(crate) fn off(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _, _)| *lid != id);
    }

    pub(crate) fn emit(&mut self, event: &Event) {
        let kind = event.kind();
        for (_, k, listener) in &mut self.listeners {
            if *k == kind {
                listener(event);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
