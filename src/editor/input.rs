use super::Editor;
use crate::events::EditorEvent;
use crate::geometry::Point;
use crate::input::{resolve_shortcut, EditorCommand, InputContext, Modifiers, ShortcutKey};
use crate::scene::EphemeralRole;
use crate::selection::SelectMode;
use crate::tools::{InteractionPhase, PointerButton, PointerInput, ToolAction, ToolKind};

impl Editor {
    fn pointer(&self, raw: Point, button: PointerButton, modifiers: Modifiers) -> PointerInput {
        PointerInput {
            raw,
            scene: self.viewport.to_scene(raw),
            button,
            modifiers,
        }
    }

    /// `raw` is a surface position; the editor maps it through its viewport.
    pub fn pointer_down(&mut self, raw: Point, button: PointerButton, modifiers: Modifiers) {
        let input = self.pointer(raw, button, modifiers);
        let padding = self.config.hit_padding / self.viewport.scale();
        let hit = self.graph.top_object_at(input.scene, padding);
        let hit_selected = hit.is_some_and(|id| self.selection.contains(id));
        let actions = self.tools.press(input, hit, hit_selected);
        self.apply_tool_actions(actions);
    }

    pub fn pointer_move(&mut self, raw: Point, modifiers: Modifiers) {
        let input = self.pointer(raw, PointerButton::Primary, modifiers);
        let actions = self.tools.drag(input);
        self.apply_tool_actions(actions);
    }

    pub fn pointer_up(&mut self, raw: Point, button: PointerButton, modifiers: Modifiers) {
        let input = self.pointer(raw, button, modifiers);
        let actions = self.tools.release(input);
        self.apply_tool_actions(actions);
    }

    pub fn wheel(&mut self, raw: Point, delta_x: f64, delta_y: f64, modifiers: Modifiers) {
        self.viewport.apply_wheel(raw, delta_x, delta_y, modifiers);
    }

    /// Resolves and runs a keyboard shortcut, returning the command it mapped to.
    pub fn key(&mut self, key: ShortcutKey, modifiers: Modifiers) -> Option<EditorCommand> {
        let phase = self.tools.phase();
        let context = InputContext {
            collecting_path: phase == InteractionPhase::MultiPointCollecting,
            gesture_active: phase != InteractionPhase::Idle,
            has_selection: !self.selection.is_empty(),
        };
        let command = resolve_shortcut(key, modifiers, context)?;
        tracing::debug!(?key, ?command, "shortcut resolved");
        self.handle_command(command);
        Some(command)
    }

    pub fn handle_command(&mut self, command: EditorCommand) {
        match command {
            EditorCommand::Undo => {
                self.undo();
            }
            EditorCommand::Redo => {
                self.redo();
            }
            EditorCommand::DeleteSelection => {
                self.delete_selection();
            }
            EditorCommand::FinishPath => self.finish_path(),
            EditorCommand::CancelGesture => self.cancel_gesture(),
            EditorCommand::ClearSelection => {
                self.clear_selection();
            }
            EditorCommand::SaveNow => {
                // Failures are already logged and surfaced as a notice.
                let _ = self.save_now();
            }
            EditorCommand::SelectTool(tool) => self.select_tool(tool),
        }
    }

    pub fn select_tool(&mut self, tool: ToolKind) {
        let previous = self.tools.active();
        let actions = self.tools.select_tool(tool);
        self.apply_tool_actions(actions);
        if previous != tool {
            self.events.emit(&EditorEvent::ToolChanged(tool));
        }
    }

    /// Explicit "finish" for the polygon and crop tools.
    pub fn finish_path(&mut self) {
        let actions = self.tools.finish();
        self.apply_tool_actions(actions);
    }

    pub fn cancel_gesture(&mut self) {
        let actions = self.tools.cancel();
        self.apply_tool_actions(actions);
    }

    fn apply_tool_actions(&mut self, actions: Vec<ToolAction>) {
        for action in actions {
            match action {
                ToolAction::Preview { role, shape, style } => {
                    self.graph.upsert_ephemeral(role, shape, style);
                }
                ToolAction::ClearPreviews => self.graph.remove_ephemeral_where(|role| {
                    !matches!(role, EphemeralRole::CropOverlay { .. })
                }),
                ToolAction::Commit(object) => {
                    let id = self.add_object(object);
                    self.select(&[id], SelectMode::Replace);
                }
                ToolAction::CommitCrop(path) => {
                    // Rejections and load failures are reported inside.
                    let _ = self.commit_crop(path);
                }
                ToolAction::Select { ids, mode } => {
                    self.select(&ids, mode);
                }
                ToolAction::ClearSelection => {
                    self.clear_selection();
                }
                ToolAction::Marquee { area, additive } => {
                    let ids = self.graph.ids_intersecting(&area);
                    let mode = if additive {
                        SelectMode::Add
                    } else {
                        SelectMode::Replace
                    };
                    self.select(&ids, mode);
                }
                ToolAction::BeginTransform => {
                    self.begin_transform();
                }
                ToolAction::TransformBy { dx, dy } => self.update_transform(dx, dy),
                ToolAction::EndTransform => self.end_transform(),
                ToolAction::PanBy { dx, dy } => self.viewport.pan_by(dx, dy),
                ToolAction::Rejected(reason) => {
                    tracing::debug!(%reason, tool = self.tools.active().label(), "tool input rejected");
                }
            }
        }
    }
}
