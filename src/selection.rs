//! Active selection over live, non-locked scene objects.
use std::collections::BTreeSet;

use crate::scene::{ObjectId, SceneGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    /// Selection becomes exactly the given ids.
    Replace,
    /// Flips membership per id; the modifier-click contract.
    Toggle,
    Add,
    Remove,
}

/// Tracks selected ids. Every mutating call returns `Some(ids)` only when the
/// resulting set differs, so callers can emit one change notification.
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    selected: BTreeSet<ObjectId>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(
        &mut self,
        ids: &[ObjectId],
        mode: SelectMode,
        graph: &SceneGraph,
    ) -> Option<Vec<ObjectId>> {
        let before = self.selected.clone();
        match mode {
            SelectMode::Replace => {
                self.selected = eligible(ids, graph).collect();
            }
            SelectMode::Toggle => {
                for id in eligible(ids, graph) {
                    if !self.selected.remove(&id) {
                        self.selected.insert(id);
                    }
                }
            }
            SelectMode::Add => {
                self.selected.extend(eligible(ids, graph));
            }
            SelectMode::Remove => {
                for id in ids {
                    self.selected.remove(id);
                }
            }
        }
        self.changed_since(&before)
    }

    pub fn clear(&mut self) -> Option<Vec<ObjectId>> {
        if self.selected.is_empty() {
            return None;
        }
        self.selected.clear();
        Some(Vec::new())
    }

    /// Drops ids that are gone, locked, or ephemeral.
    pub fn retain_live(&mut self, graph: &SceneGraph) -> Option<Vec<ObjectId>> {
        let before = self.selected.clone();
        self.selected.retain(|id| {
            graph
                .get(*id)
                .is_some_and(|object| object.is_interactive())
        });
        self.changed_since(&before)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.selected.contains(&id)
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.selected.iter().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    fn changed_since(&self, before: &BTreeSet<ObjectId>) -> Option<Vec<ObjectId>> {
        (before != &self.selected).then(|| self.ids())
    }
}

fn eligible<'a>(ids: &'a [ObjectId], graph: &'a SceneGraph) -> impl Iterator<Item = ObjectId> + 'a {
    ids.iter().copied().filter(move |id| match graph.get(*id) {
        Some(object) if object.is_interactive() => true,
        Some(_) => {
            tracing::debug!(id, "locked or ephemeral object is not selectable");
            false
        }
        None => {
            tracing::warn!(id, "selection references unknown object; ignored");
            false
        }
    })
}
