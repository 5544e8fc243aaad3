//! Scene graph and transform-first editing engine for image annotation
//! surfaces.
//!
//! The host owns rendering, windows and the event loop. It feeds pointer,
//! wheel and key input into an [`Editor`], calls [`Editor::tick`] when
//! [`Editor::next_deadline`] passes, and draws [`Editor::graph`] in paint
//! order.
pub mod assets;
pub mod config;
pub mod crop;
pub mod editor;
pub mod error;
pub mod events;
pub mod geometry;
pub mod history;
pub mod input;
pub mod logging;
pub mod notification;
pub mod persistence;
pub mod scene;
pub mod scheduler;
pub mod selection;
pub mod tools;
pub mod viewport;

pub use assets::{FileImageProvider, ImageLoadError, ImageProvider, MemoryImageProvider};
pub use config::{AutosaveConfig, EditorConfig};
pub use editor::{Editor, ImageRequest, LayerEntry};
pub use error::{EditorError, EditorResult, RejectReason};
pub use events::EditorEvent;
pub use geometry::{Bounds, Color, Point};
pub use persistence::{CanvasSize, FileSceneStore, MemorySceneStore, SceneStore, StoreError};
pub use scene::{ObjectId, SceneGraph, SceneObject, StylePatch};
pub use scheduler::{Clock, ManualClock, SystemClock};
pub use selection::SelectMode;
pub use tools::{PointerButton, ToolKind};
