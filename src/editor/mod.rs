//! The explicit context object every host entry point goes through.
//!
//! `Editor` owns the scene graph, selection, tool controller, history,
//! autosave policy and scheduler. Each public operation completes within one
//! call; committed mutations funnel through [`Editor::commit`] so history,
//! crop overlays, selection pruning, autosave and events stay in lockstep.
mod input;
mod operations;
mod sync;

use std::collections::HashMap;
use std::rc::Rc;

use image::RgbaImage;

use crate::assets::ImageProvider;
use crate::config::{load_editor_config, EditorConfig};
use crate::crop::RasterStore;
use crate::error::EditorError;
use crate::events::{EditorEvent, EventBus, ListenerId};
use crate::geometry::Point;
use crate::history::HistoryManager;
use crate::notification::{Notice, NoticeBoard, NoticeLevel};
use crate::persistence::{AutosaveController, CanvasSize, SceneStore};
use crate::scene::{ObjectId, ObjectType, SceneGraph, SceneObject, Shape};
use crate::scheduler::{Clock, Scheduler, SystemClock};
use crate::selection::SelectionManager;
use crate::tools::{InteractionPhase, ToolController, ToolKind, ToolOptions};
use crate::viewport::Viewport;

pub use operations::ImageRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EditorTask {
    Autosave,
    ResolveImage(ImageRequest),
}

#[derive(Debug, Clone, PartialEq)]
struct PendingImage {
    reference: String,
    at: Point,
}

/// Row of the layer list, top of the paint order first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerEntry {
    pub id: ObjectId,
    pub object_type: ObjectType,
    pub locked: bool,
    pub selected: bool,
    pub crop_masks: usize,
}

pub struct Editor {
    config: EditorConfig,
    graph: SceneGraph,
    selection: SelectionManager,
    tools: ToolController,
    history: HistoryManager,
    autosave: AutosaveController,
    scheduler: Scheduler<EditorTask>,
    /// Pre-gesture snapshot while a live transform is running.
    transform_origin: Option<Vec<SceneObject>>,
    pending_images: HashMap<ImageRequest, PendingImage>,
    next_request: ImageRequest,
    rasters: RasterStore,
    images: Box<dyn ImageProvider>,
    store: Box<dyn SceneStore>,
    clock: Rc<dyn Clock>,
    events: EventBus,
    notices: NoticeBoard,
    viewport: Viewport,
    canvas: CanvasSize,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("objects", &self.graph.len())
            .field("selection", &self.selection.ids())
            .field("tool", &self.tools.active())
            .field("phase", &self.tools.phase())
            .field("undo", &self.history.undo_len())
            .field("redo", &self.history.redo_len())
            .finish_non_exhaustive()
    }
}

impl Editor {
    pub fn new(
        config: EditorConfig,
        store: impl SceneStore + 'static,
        images: impl ImageProvider + 'static,
        clock: Rc<dyn Clock>,
    ) -> Self {
        tracing::debug!(?config, "editor created");
        Self {
            graph: SceneGraph::new(),
            selection: SelectionManager::new(),
            tools: ToolController::new(config.min_shape_size),
            history: HistoryManager::new(config.history_capacity),
            autosave: AutosaveController::new(config.autosave),
            scheduler: Scheduler::new(),
            transform_origin: None,
            pending_images: HashMap::new(),
            next_request: 1,
            rasters: RasterStore::new(),
            images: Box::new(images),
            store: Box::new(store),
            clock,
            events: EventBus::new(),
            notices: NoticeBoard::new(config.notice_ttl_ms),
            viewport: Viewport::new(),
            canvas: CanvasSize::new(config.canvas_width, config.canvas_height),
            config,
        }
    }

    /// Reads `config.json` and uses the system clock.
    pub fn with_defaults(
        store: impl SceneStore + 'static,
        images: impl ImageProvider + 'static,
    ) -> Self {
        Self::new(load_editor_config(), store, images, Rc::new(SystemClock))
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&EditorEvent) + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.graph.get(id).filter(|object| !object.is_ephemeral())
    }

    pub fn selection(&self) -> Vec<ObjectId> {
        self.selection.ids()
    }

    pub fn active_tool(&self) -> ToolKind {
        self.tools.active()
    }

    pub fn phase(&self) -> InteractionPhase {
        self.tools.phase()
    }

    pub fn tool_options(&self) -> &ToolOptions {
        self.tools.options()
    }

    pub fn tool_options_mut(&mut self) -> &mut ToolOptions {
        self.tools.options_mut()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn canvas_size(&self) -> CanvasSize {
        self.canvas
    }

    pub fn set_canvas_size(&mut self, canvas: CanvasSize) {
        if self.canvas != canvas {
            self.canvas = canvas;
            let now = self.clock.now_ms();
            self.schedule_autosave(now);
        }
    }

    pub fn notices(&self) -> &[Notice] {
        self.notices.active()
    }

    pub fn dismiss_notice(&mut self, id: u64) -> bool {
        self.notices.dismiss(id)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn is_dirty(&self) -> bool {
        self.autosave.is_dirty()
    }

    pub fn autosave_due_at(&self) -> Option<u64> {
        self.scheduler.due_at(&EditorTask::Autosave)
    }

    /// Earliest moment `tick` has work to do.
    pub fn next_deadline(&self) -> Option<u64> {
        let notice = self
            .notices
            .active()
            .iter()
            .map(|notice| notice.expires_at)
            .min();
        match (self.scheduler.next_deadline(), notice) {
            (Some(task), Some(notice)) => Some(task.min(notice)),
            (task, notice) => task.or(notice),
        }
    }

    /// Raster shown by an image object, if its source has been decoded.
    pub fn raster(&self, id: ObjectId) -> Option<Rc<RgbaImage>> {
        let image = self.graph.get(id)?.shape.as_image()?;
        self.rasters.cached(image)
    }

    pub fn layers(&self) -> Vec<LayerEntry> {
        self.graph
            .persistent()
            .rev()
            .map(|object| LayerEntry {
                id: object.id,
                object_type: object.object_type(),
                locked: object.locked,
                selected: self.selection.contains(object.id),
                crop_masks: object.crop_masks().count(),
            })
            .collect()
    }

    /// Runs `mutate` as one committed mutation. History, overlays, selection
    /// pruning, autosave and `SceneChanged` only follow a real change.
    fn commit<R>(&mut self, operation: &'static str, mutate: impl FnOnce(&mut SceneGraph) -> R) -> R {
        self.settle_transform();
        let before = self.graph.persistent_objects();
        let result = mutate(&mut self.graph);
        if self.graph.persistent().ne(before.iter()) {
            self.after_commit(operation, before);
        } else {
            tracing::trace!(operation, "mutation left scene unchanged");
        }
        result
    }

    fn after_commit(&mut self, operation: &'static str, before: Vec<SceneObject>) {
        let now = self.clock.now_ms();
        self.history.record(before, now);
        self.graph
            .rebuild_crop_overlays(self.config.crop_overlay_opacity);
        self.schedule_autosave(now);
        self.sync_selection();
        self.prune_rasters();
        tracing::debug!(operation, objects = self.graph.len(), "scene mutation committed");
        self.events.emit(&EditorEvent::SceneChanged);
    }

    /// Closes a live transform so its frames land as one history entry
    /// before anything else is recorded.
    fn settle_transform(&mut self) {
        if self.transform_origin.is_some() {
            tracing::debug!("closing live transform before commit");
            self.cancel_gesture();
            self.end_transform();
        }
    }

    /// Replay-triggered mutations never schedule saves.
    fn schedule_autosave(&mut self, now_ms: u64) {
        if self.history.is_replaying() {
            return;
        }
        match self.autosave.on_mutation(now_ms) {
            Some(delay) => {
                self.scheduler.schedule(EditorTask::Autosave, now_ms, delay);
            }
            None => {
                self.scheduler.cancel(&EditorTask::Autosave);
            }
        }
    }

    /// Releases decoded rasters that neither the scene nor history shows.
    fn prune_rasters(&mut self) {
        let live = self.graph.persistent().map(|object| &object.shape);
        let stored = self
            .history
            .snapshots()
            .flat_map(|snapshot| snapshot.objects.iter().map(|object| &object.shape));
        let in_use = live.chain(stored).flat_map(Shape::images);
        let released = self.rasters.retain_used(in_use);
        if released > 0 {
            tracing::debug!(released, "unused rasters released");
        }
    }

    fn sync_selection(&mut self) {
        if let Some(ids) = self.selection.retain_live(&self.graph) {
            self.events.emit(&EditorEvent::SelectionChanged { ids });
        }
    }

    /// Logs a failure and surfaces a notice unless it is silent or defensive.
    fn report(&mut self, err: EditorError) -> EditorError {
        let level = match &err {
            EditorError::UserInputRejected(reason) => {
                tracing::debug!(%reason, "input rejected");
                return err;
            }
            EditorError::UnknownObject(id) => {
                tracing::warn!(id, "operation references unknown object; ignored");
                return err;
            }
            EditorError::Persistence { .. } => NoticeLevel::Warning,
            EditorError::ResourceUnavailable { .. } | EditorError::State(_) => NoticeLevel::Error,
        };
        tracing::warn!(?err, "editor operation failed");
        let now = self.clock.now_ms();
        let notice = self.notices.push(level, err.to_string(), now);
        self.events.emit(&EditorEvent::Notice(notice));
        err
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::Editor;
    use crate::assets::MemoryImageProvider;
    use crate::config::EditorConfig;
    use crate::events::EditorEvent;
    use crate::geometry::Point;
    use crate::input::Modifiers;
    use crate::persistence::MemorySceneStore;
    use crate::scene::{BoxGeometry, ObjectId, SceneObject, Shape, Style};
    use crate::scheduler::ManualClock;
    use crate::tools::PointerButton;

    pub(crate) struct Harness {
        pub editor: Editor,
        pub clock: Rc<ManualClock>,
        pub store: MemorySceneStore,
        pub images: MemoryImageProvider,
        pub events: Rc<RefCell<Vec<EditorEvent>>>,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_store(MemorySceneStore::new())
        }

        pub fn with_store(store: MemorySceneStore) -> Self {
            let clock = Rc::new(ManualClock::new(1_000));
            let images = MemoryImageProvider::new();
            let mut editor = Editor::new(
                EditorConfig::default(),
                store.clone(),
                images.clone(),
                clock.clone(),
            );
            let events = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&events);
            editor.subscribe(move |event| sink.borrow_mut().push(event.clone()));
            Self {
                editor,
                clock,
                store,
                images,
                events,
            }
        }

        pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> ObjectId {
            self.editor.add_object(SceneObject::new(
                Shape::Rectangle(BoxGeometry::new(x, y, width, height)),
                Style::default(),
            ))
        }

        pub fn drag(&mut self, from: Point, to: Point, modifiers: Modifiers) {
            self.editor
                .pointer_down(from, PointerButton::Primary, modifiers);
            self.editor.pointer_move(to, modifiers);
            self.editor
                .pointer_up(to, PointerButton::Primary, modifiers);
        }

        pub fn click(&mut self, at: Point, modifiers: Modifiers) {
            self.editor
                .pointer_down(at, PointerButton::Primary, modifiers);
            self.editor
                .pointer_up(at, PointerButton::Primary, modifiers);
        }

        pub fn take_events(&self) -> Vec<EditorEvent> {
            std::mem::take(&mut *self.events.borrow_mut())
        }

        /// Advances the clock and runs whatever came due.
        pub fn advance(&mut self, delta_ms: u64) -> usize {
            self.clock.advance(delta_ms);
            self.editor.tick()
        }
    }
}
