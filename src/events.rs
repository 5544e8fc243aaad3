//! Ordered listener list the host subscribes to instead of wrapping callbacks.
use crate::history::HistoryAction;
use crate::notification::Notice;
use crate::scene::ObjectId;
use crate::tools::ToolKind;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    SelectionChanged { ids: Vec<ObjectId> },
    /// A committed mutation changed the persistent scene.
    SceneChanged,
    /// Emitted exactly once per successful restore.
    SceneRestored { object_count: usize },
    HistoryApplied(HistoryAction),
    ToolChanged(ToolKind),
    Saved { at_ms: u64 },
    Notice(Notice),
}

pub type ListenerId = u64;

type Listener = Box<dyn FnMut(&EditorEvent)>;

#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: ListenerId,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&EditorEvent) + 'static) -> ListenerId {
        self.next_id += 1;
        let id = self.next_id;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.listeners.len()
    }

    /// Invokes listeners in subscription order.
    pub fn emit(&mut self, event: &EditorEvent) {
        tracing::trace!(?event, "emit editor event");
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}
