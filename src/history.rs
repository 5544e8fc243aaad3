//! Bounded undo/redo over full scene snapshots.
use std::collections::VecDeque;

use crate::scene::SceneObject;

#[derive(Debug, Clone, PartialEq)]
pub struct HistorySnapshot {
    /// Persistent objects only; ephemeral ones never enter history.
    pub objects: Vec<SceneObject>,
    pub taken_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
}

impl HistoryAction {
    pub const fn applied_message(self) -> &'static str {
        match self {
            Self::Undo => "undo applied",
            Self::Redo => "redo applied",
        }
    }

    pub const fn empty_message(self) -> &'static str {
        match self {
            Self::Undo => "undo stack empty",
            Self::Redo => "redo stack empty",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplayState {
    Idle,
    /// A snapshot is being swapped into the live graph.
    Replaying,
}

#[derive(Debug, Clone)]
pub struct HistoryManager {
    undo: VecDeque<HistorySnapshot>,
    redo: VecDeque<HistorySnapshot>,
    capacity: usize,
    state: ReplayState,
}

impl HistoryManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo: VecDeque::with_capacity(capacity.min(64)),
            redo: VecDeque::new(),
            capacity: capacity.max(1),
            state: ReplayState::Idle,
        }
    }

    pub fn is_replaying(&self) -> bool {
        self.state == ReplayState::Replaying
    }

    pub fn begin_replay(&mut self) {
        self.state = ReplayState::Replaying;
    }

    pub fn end_replay(&mut self) {
        self.state = ReplayState::Idle;
    }

    /// Pushes the pre-mutation snapshot and drops the redo branch.
    /// Returns `false` when suppressed by a replay or de-duplicated.
    pub fn record(&mut self, before: Vec<SceneObject>, now_ms: u64) -> bool {
        if self.is_replaying() {
            return false;
        }
        self.redo.clear();
        if self
            .undo
            .back()
            .is_some_and(|last| last.objects == before)
        {
            tracing::trace!("identical history snapshot skipped");
            return false;
        }
        push_bounded(
            &mut self.undo,
            HistorySnapshot {
                objects: before,
                taken_at: now_ms,
            },
            self.capacity,
        );
        true
    }

    /// Pops the snapshot to restore for `action`, parking `current` on the
    /// opposite stack. `None` when the source stack is empty.
    pub fn step(
        &mut self,
        action: HistoryAction,
        current: Vec<SceneObject>,
        now_ms: u64,
    ) -> Option<HistorySnapshot> {
        let (source, target) = match action {
            HistoryAction::Undo => (&mut self.undo, &mut self.redo),
            HistoryAction::Redo => (&mut self.redo, &mut self.undo),
        };
        let snapshot = source.pop_back()?;
        push_bounded(
            target,
            HistorySnapshot {
                objects: current,
                taken_at: now_ms,
            },
            self.capacity,
        );
        Some(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Every stored snapshot, undo side first.
    pub fn snapshots(&self) -> impl Iterator<Item = &HistorySnapshot> {
        self.undo.iter().chain(self.redo.iter())
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

fn push_bounded(stack: &mut VecDeque<HistorySnapshot>, snapshot: HistorySnapshot, capacity: usize) {
    stack.push_back(snapshot);
    while stack.len() > capacity {
        stack.pop_front();
    }
}
