use crate::tools::ToolKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutKey {
    Character(char),
    Enter,
    Escape,
    Delete,
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const fn new(ctrl: bool, shift: bool) -> Self {
        Self {
            ctrl,
            shift,
            alt: false,
        }
    }

    /// Modifier-click flips selection membership instead of replacing it.
    pub const fn toggles_selection(self) -> bool {
        self.shift || self.ctrl
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputContext {
    pub collecting_path: bool,
    pub gesture_active: bool,
    pub has_selection: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorCommand {
    Undo,
    Redo,
    DeleteSelection,
    FinishPath,
    CancelGesture,
    ClearSelection,
    SaveNow,
    SelectTool(ToolKind),
}

fn resolve_path_shortcut(key: ShortcutKey) -> Option<EditorCommand> {
    match key {
        ShortcutKey::Enter => Some(EditorCommand::FinishPath),
        ShortcutKey::Escape => Some(EditorCommand::CancelGesture),
        _ => None,
    }
}

fn resolve_tool_shortcut(key: ShortcutKey) -> Option<EditorCommand> {
    let ShortcutKey::Character(character) = key else {
        return None;
    };
    let tool = match character.to_ascii_lowercase() {
        'v' => ToolKind::Select,
        'h' => ToolKind::Pan,
        'r' => ToolKind::Rectangle,
        'e' => ToolKind::Ellipse,
        'g' => ToolKind::Polygon,
        'p' => ToolKind::Pen,
        't' => ToolKind::Text,
        'c' => ToolKind::Crop,
        _ => return None,
    };
    Some(EditorCommand::SelectTool(tool))
}

fn resolve_editor_shortcut(
    key: ShortcutKey,
    modifiers: Modifiers,
    context: InputContext,
) -> Option<EditorCommand> {
    let key = match key {
        ShortcutKey::Character(character) => ShortcutKey::Character(character.to_ascii_lowercase()),
        other => other,
    };
    match (key, modifiers.ctrl, modifiers.shift) {
        (ShortcutKey::Character('z'), true, false) => Some(EditorCommand::Undo),
        (ShortcutKey::Character('z'), true, true) | (ShortcutKey::Character('y'), true, false) => {
            Some(EditorCommand::Redo)
        }
        (ShortcutKey::Character('s'), true, _) => Some(EditorCommand::SaveNow),
        (ShortcutKey::Delete | ShortcutKey::Backspace, false, false) if context.has_selection => {
            Some(EditorCommand::DeleteSelection)
        }
        (ShortcutKey::Escape, _, _) => {
            if context.gesture_active {
                Some(EditorCommand::CancelGesture)
            } else if context.has_selection {
                Some(EditorCommand::ClearSelection)
            } else {
                Some(EditorCommand::SelectTool(ToolKind::Select))
            }
        }
        (_, false, false) => resolve_tool_shortcut(key),
        _ => None,
    }
}

pub fn resolve_shortcut(
    key: ShortcutKey,
    modifiers: Modifiers,
    context: InputContext,
) -> Option<EditorCommand> {
    if context.collecting_path {
        if let Some(command) = resolve_path_shortcut(key) {
            return Some(command);
        }
    }
    resolve_editor_shortcut(key, modifiers, context)
}
