mod shortcut;

pub use shortcut::{resolve_shortcut, EditorCommand, InputContext, Modifiers, ShortcutKey};
