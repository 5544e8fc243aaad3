use super::{Editor, EditorTask};
use crate::error::{EditorError, EditorResult};
use crate::events::EditorEvent;
use crate::history::HistoryAction;
use crate::scene::SceneGraph;

impl Editor {
    pub fn undo(&mut self) -> bool {
        self.step_history(HistoryAction::Undo)
    }

    pub fn redo(&mut self) -> bool {
        self.step_history(HistoryAction::Redo)
    }

    fn step_history(&mut self, action: HistoryAction) -> bool {
        self.cancel_gesture();
        let now = self.clock.now_ms();
        let current = self.graph.persistent_objects();
        let Some(snapshot) = self.history.step(action, current, now) else {
            tracing::debug!("{}", action.empty_message());
            return false;
        };

        self.history.begin_replay();
        self.graph.replace_objects(snapshot.objects);
        self.graph
            .rebuild_crop_overlays(self.config.crop_overlay_opacity);
        self.history.end_replay();

        // One save for the replayed state, outside the replay guard.
        self.schedule_autosave(now);
        self.sync_selection();
        self.prune_rasters();
        tracing::info!("{}", action.applied_message());
        self.events.emit(&EditorEvent::HistoryApplied(action));
        self.events.emit(&EditorEvent::SceneChanged);
        true
    }

    /// Loads the persisted scene, replacing the live graph. Emits exactly one
    /// `SceneRestored`; history and selection start empty.
    pub fn restore(&mut self) -> EditorResult<usize> {
        let blob = match self.store.load() {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                tracing::info!("no persisted scene to restore");
                return Ok(0);
            }
            Err(source) => {
                return Err(self.report(EditorError::Persistence {
                    operation: "restore",
                    source,
                }))
            }
        };
        let (graph, canvas) = match SceneGraph::deserialize(&blob) {
            Ok(restored) => restored,
            Err(source) => {
                return Err(self.report(EditorError::Persistence {
                    operation: "restore",
                    source,
                }))
            }
        };

        // The live gesture is abandoned rather than committed; the restored
        // scene replaces whatever it touched.
        let _ = self.tools.cancel();
        if self.transform_origin.take().is_some() {
            tracing::debug!("live transform dropped by restore");
        }
        let now = self.clock.now_ms();
        let _ = self.autosave.end_transform(now);
        self.history.begin_replay();
        self.graph = graph;
        self.graph
            .rebuild_crop_overlays(self.config.crop_overlay_opacity);
        self.history.end_replay();
        self.history.clear();
        self.prune_rasters();
        self.selection.clear();
        self.canvas = canvas;
        self.scheduler.cancel(&EditorTask::Autosave);
        self.autosave.mark_saved(now);

        let object_count = self.graph.len();
        tracing::info!(
            object_count,
            locked = self.graph.persistent().filter(|object| object.locked).count(),
            "scene restored"
        );
        self.events
            .emit(&EditorEvent::SceneRestored { object_count });
        Ok(object_count)
    }

    /// Saves immediately, dropping any pending debounced save.
    pub fn save_now(&mut self) -> EditorResult<()> {
        self.scheduler.cancel(&EditorTask::Autosave);
        self.perform_save()
    }

    fn perform_save(&mut self) -> EditorResult<()> {
        let now = self.clock.now_ms();
        let saved = self
            .graph
            .serialize(self.canvas)
            .and_then(|blob| self.store.save(&blob));
        match saved {
            Ok(()) => {
                self.autosave.mark_saved(now);
                tracing::debug!(objects = self.graph.len(), "scene saved");
                self.events.emit(&EditorEvent::Saved { at_ms: now });
                Ok(())
            }
            Err(source) => {
                // Stays dirty; the next mutation reschedules the save.
                self.autosave.mark_failed();
                Err(self.report(EditorError::Persistence {
                    operation: "save",
                    source,
                }))
            }
        }
    }

    /// Runs due scheduler tasks and expires notices. Returns the number of
    /// tasks executed.
    pub fn tick(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired = self.notices.expire(now);
        if expired > 0 {
            tracing::trace!(expired, "notices expired");
        }
        let due = self.scheduler.take_due(now);
        let executed = due.len();
        for task in due {
            match task {
                EditorTask::Autosave => {
                    if self.autosave.is_transform_active() {
                        tracing::debug!("autosave deferred while transforming");
                        continue;
                    }
                    let _ = self.perform_save();
                }
                EditorTask::ResolveImage(request) => {
                    self.resolve_image(request);
                }
            }
        }
        executed
    }
}
