//! Per-tool pointer protocol.
//!
//! The controller owns gesture state only. It never touches the scene graph;
//! every press, drag and release yields [`ToolAction`]s the editor applies in
//! order, so tool logic stays testable without a graph.
mod phase;

pub use phase::{
    InteractionPhase, PhaseEvent, PhaseMachine, PhaseTransition, StateError, StateResult,
};

use crate::error::RejectReason;
use crate::geometry::{Bounds, Color, Point};
use crate::input::Modifiers;
use crate::scene::{
    BoxGeometry, EphemeralRole, ObjectId, PointsGeometry, SceneObject, Shape, Style, TextGeometry,
};
use crate::selection::SelectMode;

pub const MIN_PATH_POINTS: usize = 3;
const PEN_SAMPLE_SPACING: f64 = 1.0;
const VERTEX_MARKER_RADIUS: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Select,
    Pan,
    Rectangle,
    Ellipse,
    Polygon,
    Pen,
    Text,
    Crop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolInteraction {
    /// Drag on empty space draws a marquee.
    Select,
    Pan,
    /// Press, drag, release commits one shape.
    Drag,
    /// Each click appends a vertex until finished.
    MultiPoint,
    /// A single click places an object.
    Click,
}

impl ToolKind {
    pub const fn interaction(self) -> ToolInteraction {
        match self {
            Self::Select => ToolInteraction::Select,
            Self::Pan => ToolInteraction::Pan,
            Self::Rectangle | Self::Ellipse | Self::Pen => ToolInteraction::Drag,
            Self::Polygon | Self::Crop => ToolInteraction::MultiPoint,
            Self::Text => ToolInteraction::Click,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Pan => "pan",
            Self::Rectangle => "rectangle",
            Self::Ellipse => "ellipse",
            Self::Polygon => "polygon",
            Self::Pen => "pen",
            Self::Text => "text",
            Self::Crop => "crop",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Pointer sample carrying both the raw surface position and its scene mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub raw: Point,
    pub scene: Point,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolOptions {
    rectangle: Style,
    ellipse: Style,
    polygon: Style,
    pen: Style,
    text: Style,
    font_size: f64,
    text_placeholder: String,
}

impl Default for ToolOptions {
    fn default() -> Self {
        let text = Style {
            fill: Some(Color::new(0, 0, 0)),
            stroke: None,
            ..Style::default()
        };
        Self {
            rectangle: Style::default(),
            ellipse: Style::default(),
            polygon: Style::default(),
            pen: Style::default(),
            text,
            font_size: 18.0,
            text_placeholder: "Text".to_string(),
        }
    }
}

impl ToolOptions {
    pub fn style_for(&self, tool: ToolKind) -> Option<&Style> {
        match tool {
            ToolKind::Rectangle => Some(&self.rectangle),
            ToolKind::Ellipse => Some(&self.ellipse),
            ToolKind::Polygon => Some(&self.polygon),
            ToolKind::Pen => Some(&self.pen),
            ToolKind::Text => Some(&self.text),
            ToolKind::Select | ToolKind::Pan | ToolKind::Crop => None,
        }
    }

    pub fn style_mut(&mut self, tool: ToolKind) -> Option<&mut Style> {
        match tool {
            ToolKind::Rectangle => Some(&mut self.rectangle),
            ToolKind::Ellipse => Some(&mut self.ellipse),
            ToolKind::Polygon => Some(&mut self.polygon),
            ToolKind::Pen => Some(&mut self.pen),
            ToolKind::Text => Some(&mut self.text),
            ToolKind::Select | ToolKind::Pan | ToolKind::Crop => None,
        }
    }

    fn shape_styles_mut(&mut self) -> [&mut Style; 4] {
        [
            &mut self.rectangle,
            &mut self.ellipse,
            &mut self.polygon,
            &mut self.pen,
        ]
    }

    pub fn set_shared_stroke_color(&mut self, color: Color) {
        for style in self.shape_styles_mut() {
            style.stroke = Some(color);
        }
        self.text.fill = Some(color);
    }

    pub fn set_shared_stroke_width(&mut self, width: f64) {
        for style in self.shape_styles_mut() {
            style.set_stroke_width(width);
        }
    }

    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    pub fn set_font_size(&mut self, size: f64) {
        self.font_size = size.clamp(6.0, 512.0);
    }

    pub fn text_placeholder(&self) -> &str {
        &self.text_placeholder
    }

    pub fn set_text_placeholder(&mut self, placeholder: impl Into<String>) {
        self.text_placeholder = placeholder.into();
    }
}

/// Instruction for the editor produced by a pointer gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolAction {
    Preview {
        role: EphemeralRole,
        shape: Shape,
        style: Style,
    },
    ClearPreviews,
    Commit(SceneObject),
    CommitCrop(Vec<Point>),
    Select {
        ids: Vec<ObjectId>,
        mode: SelectMode,
    },
    ClearSelection,
    Marquee {
        area: Bounds,
        additive: bool,
    },
    BeginTransform,
    TransformBy {
        dx: f64,
        dy: f64,
    },
    EndTransform,
    PanBy {
        dx: f64,
        dy: f64,
    },
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    None,
    Drawing {
        tool: ToolKind,
        start: Point,
        current: Point,
        points: Vec<Point>,
        additive: bool,
    },
    Collecting {
        tool: ToolKind,
        points: Vec<Point>,
    },
    Panning {
        last_raw: Point,
    },
    Transforming {
        last: Point,
    },
}

#[derive(Debug)]
pub struct ToolController {
    active: ToolKind,
    options: ToolOptions,
    machine: PhaseMachine,
    gesture: Gesture,
    min_shape_size: f64,
}

impl ToolController {
    pub fn new(min_shape_size: f64) -> Self {
        Self {
            active: ToolKind::Select,
            options: ToolOptions::default(),
            machine: PhaseMachine::new(),
            gesture: Gesture::None,
            min_shape_size: min_shape_size.max(0.0),
        }
    }

    pub fn active(&self) -> ToolKind {
        self.active
    }

    pub fn phase(&self) -> InteractionPhase {
        self.machine.phase()
    }

    pub fn options(&self) -> &ToolOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ToolOptions {
        &mut self.options
    }

    /// Vertices of the multi-point path being collected.
    pub fn collected_points(&self) -> Option<&[Point]> {
        match &self.gesture {
            Gesture::Collecting { points, .. } => Some(points),
            _ => None,
        }
    }

    /// Switching tools cancels whatever gesture is in flight.
    pub fn select_tool(&mut self, tool: ToolKind) -> Vec<ToolAction> {
        let actions = self.cancel();
        if self.active != tool {
            tracing::debug!(from = self.active.label(), to = tool.label(), "tool switched");
            self.active = tool;
        }
        actions
    }

    /// `hit` is the topmost interactive object under the pointer and
    /// `hit_selected` whether it is already selected.
    pub fn press(
        &mut self,
        input: PointerInput,
        hit: Option<ObjectId>,
        hit_selected: bool,
    ) -> Vec<ToolAction> {
        match self.machine.phase() {
            InteractionPhase::Idle => {}
            InteractionPhase::MultiPointCollecting => {
                return match input.button {
                    PointerButton::Primary => self.append_vertex(input.scene),
                    PointerButton::Secondary => self.finish(),
                    PointerButton::Middle => Vec::new(),
                };
            }
            phase => {
                tracing::debug!(?phase, "press ignored while a gesture is active");
                return Vec::new();
            }
        }

        match input.button {
            PointerButton::Middle => self.begin_pan(input.raw),
            PointerButton::Secondary => Vec::new(),
            PointerButton::Primary => self.press_primary(input, hit, hit_selected),
        }
    }

    fn press_primary(
        &mut self,
        input: PointerInput,
        hit: Option<ObjectId>,
        hit_selected: bool,
    ) -> Vec<ToolAction> {
        let interaction = self.active.interaction();
        match (interaction, hit) {
            (ToolInteraction::Pan, _) => self.begin_pan(input.raw),
            (ToolInteraction::MultiPoint, _) => self.begin_collect(input.scene),
            (_, Some(id)) if input.modifiers.toggles_selection() => vec![ToolAction::Select {
                ids: vec![id],
                mode: SelectMode::Toggle,
            }],
            (_, Some(id)) => {
                let mut actions = Vec::new();
                if !hit_selected {
                    actions.push(ToolAction::Select {
                        ids: vec![id],
                        mode: SelectMode::Replace,
                    });
                }
                if self.enter(PhaseEvent::BeginTransform) {
                    self.gesture = Gesture::Transforming { last: input.scene };
                    actions.push(ToolAction::BeginTransform);
                }
                actions
            }
            (ToolInteraction::Click, None) => self.place_text(input.scene),
            (ToolInteraction::Select | ToolInteraction::Drag, None) => self.begin_draw(input),
        }
    }

    pub fn drag(&mut self, input: PointerInput) -> Vec<ToolAction> {
        match &mut self.gesture {
            Gesture::None => Vec::new(),
            Gesture::Drawing {
                tool,
                start,
                current,
                points,
                ..
            } => {
                *current = input.scene;
                if *tool == ToolKind::Pen
                    && points
                        .last()
                        .is_none_or(|last| distance(*last, input.scene) >= PEN_SAMPLE_SPACING)
                {
                    points.push(input.scene);
                }
                let (tool, start, current) = (*tool, *start, *current);
                let preview = self.drawing_preview(tool, start, current);
                preview.into_iter().collect()
            }
            Gesture::Collecting { tool, points } => {
                let mut path = points.clone();
                path.push(input.scene);
                let tool = *tool;
                vec![self.collect_preview(tool, path)]
            }
            Gesture::Panning { last_raw } => {
                let dx = input.raw.x - last_raw.x;
                let dy = input.raw.y - last_raw.y;
                *last_raw = input.raw;
                vec![ToolAction::PanBy { dx, dy }]
            }
            Gesture::Transforming { last } => {
                let dx = input.scene.x - last.x;
                let dy = input.scene.y - last.y;
                *last = input.scene;
                if dx == 0.0 && dy == 0.0 {
                    return Vec::new();
                }
                vec![ToolAction::TransformBy { dx, dy }]
            }
        }
    }

    pub fn release(&mut self, input: PointerInput) -> Vec<ToolAction> {
        match std::mem::take(&mut self.gesture) {
            Gesture::None => Vec::new(),
            collecting @ Gesture::Collecting { .. } => {
                self.gesture = collecting;
                Vec::new()
            }
            Gesture::Drawing {
                tool,
                start,
                points,
                additive,
                ..
            } => {
                self.enter(PhaseEvent::Release);
                let mut actions = vec![ToolAction::ClearPreviews];
                actions.extend(self.complete_drawing(tool, start, input.scene, points, additive));
                actions
            }
            Gesture::Panning { .. } => {
                self.enter(PhaseEvent::Release);
                Vec::new()
            }
            Gesture::Transforming { last } => {
                self.enter(PhaseEvent::Release);
                let mut actions = Vec::new();
                let (dx, dy) = (input.scene.x - last.x, input.scene.y - last.y);
                if dx != 0.0 || dy != 0.0 {
                    actions.push(ToolAction::TransformBy { dx, dy });
                }
                actions.push(ToolAction::EndTransform);
                actions
            }
        }
    }

    /// Commits the multi-point path when it has enough vertices.
    pub fn finish(&mut self) -> Vec<ToolAction> {
        if self.machine.phase() != InteractionPhase::MultiPointCollecting {
            return Vec::new();
        }
        let Gesture::Collecting { tool, points } = std::mem::take(&mut self.gesture) else {
            return Vec::new();
        };
        self.enter(PhaseEvent::Finish);
        let mut actions = vec![ToolAction::ClearPreviews];
        if points.len() < MIN_PATH_POINTS {
            tracing::debug!(points = points.len(), "path discarded below vertex minimum");
            actions.push(ToolAction::Rejected(RejectReason::TooFewPoints {
                required: MIN_PATH_POINTS,
                got: points.len(),
            }));
            return actions;
        }
        match tool {
            ToolKind::Crop => actions.push(ToolAction::CommitCrop(points)),
            _ => actions.push(ToolAction::Commit(SceneObject::new(
                Shape::Polygon(PointsGeometry::new(points)),
                self.style_for(tool),
            ))),
        }
        actions
    }

    /// Drops any in-flight gesture and its previews without committing.
    pub fn cancel(&mut self) -> Vec<ToolAction> {
        if self.machine.phase() == InteractionPhase::Idle {
            return Vec::new();
        }
        let gesture = std::mem::take(&mut self.gesture);
        self.enter(PhaseEvent::Cancel);
        let mut actions = vec![ToolAction::ClearPreviews];
        if matches!(gesture, Gesture::Transforming { .. }) {
            actions.push(ToolAction::EndTransform);
        }
        actions
    }

    fn enter(&mut self, event: PhaseEvent) -> bool {
        self.machine.transition(event).is_ok()
    }

    fn begin_pan(&mut self, raw: Point) -> Vec<ToolAction> {
        if self.enter(PhaseEvent::BeginPan) {
            self.gesture = Gesture::Panning { last_raw: raw };
        }
        Vec::new()
    }

    fn begin_draw(&mut self, input: PointerInput) -> Vec<ToolAction> {
        if !self.enter(PhaseEvent::BeginDraw) {
            return Vec::new();
        }
        let additive = input.modifiers.toggles_selection();
        self.gesture = Gesture::Drawing {
            tool: self.active,
            start: input.scene,
            current: input.scene,
            points: vec![input.scene],
            additive,
        };
        if self.active == ToolKind::Select && !additive {
            vec![ToolAction::ClearSelection]
        } else {
            Vec::new()
        }
    }

    fn begin_collect(&mut self, start: Point) -> Vec<ToolAction> {
        if !self.enter(PhaseEvent::BeginCollect) {
            return Vec::new();
        }
        let tool = self.active;
        self.gesture = Gesture::Collecting {
            tool,
            points: vec![start],
        };
        vec![
            self.collect_preview(tool, vec![start]),
            vertex_marker(start),
        ]
    }

    fn append_vertex(&mut self, point: Point) -> Vec<ToolAction> {
        let Gesture::Collecting { tool, points } = &mut self.gesture else {
            return Vec::new();
        };
        if points.last() == Some(&point) {
            return Vec::new();
        }
        points.push(point);
        let (tool, path) = (*tool, points.clone());
        self.enter(PhaseEvent::AppendVertex);
        vec![self.collect_preview(tool, path)]
    }

    fn place_text(&self, at: Point) -> Vec<ToolAction> {
        let geometry = TextGeometry::new(
            at,
            self.options.text_placeholder.clone(),
            self.options.font_size,
        );
        vec![ToolAction::Commit(SceneObject::new(
            Shape::Text(geometry),
            self.style_for(ToolKind::Text),
        ))]
    }

    fn complete_drawing(
        &self,
        tool: ToolKind,
        start: Point,
        end: Point,
        mut points: Vec<Point>,
        additive: bool,
    ) -> Option<ToolAction> {
        let area = Bounds::from_corners(start, end);
        match tool {
            ToolKind::Select => (area.width >= self.min_shape_size
                || area.height >= self.min_shape_size)
                .then_some(ToolAction::Marquee { area, additive }),
            ToolKind::Rectangle | ToolKind::Ellipse => {
                if area.width < self.min_shape_size || area.height < self.min_shape_size {
                    tracing::debug!(
                        width = area.width,
                        height = area.height,
                        "shape discarded below minimum size"
                    );
                    return Some(ToolAction::Rejected(RejectReason::ShapeTooSmall));
                }
                let geometry = BoxGeometry::from_bounds(area);
                let shape = if tool == ToolKind::Rectangle {
                    Shape::Rectangle(geometry)
                } else {
                    Shape::Ellipse(geometry)
                };
                Some(ToolAction::Commit(SceneObject::new(
                    shape,
                    self.style_for(tool),
                )))
            }
            ToolKind::Pen => {
                if points.last() != Some(&end) {
                    points.push(end);
                }
                let extent = Bounds::from_points(&points).unwrap_or_default();
                if points.len() < 2
                    || (extent.width < self.min_shape_size && extent.height < self.min_shape_size)
                {
                    tracing::debug!(points = points.len(), "stroke discarded below minimum size");
                    return Some(ToolAction::Rejected(RejectReason::ShapeTooSmall));
                }
                Some(ToolAction::Commit(SceneObject::new(
                    Shape::Path(PointsGeometry::new(points)),
                    self.style_for(tool),
                )))
            }
            ToolKind::Pan | ToolKind::Polygon | ToolKind::Text | ToolKind::Crop => None,
        }
    }

    fn style_for(&self, tool: ToolKind) -> Style {
        self.options.style_for(tool).cloned().unwrap_or_default()
    }

    fn drawing_preview(&self, tool: ToolKind, start: Point, current: Point) -> Option<ToolAction> {
        let area = Bounds::from_corners(start, current);
        let (role, shape, style) = match tool {
            ToolKind::Select => (
                EphemeralRole::Marquee,
                Shape::Rectangle(BoxGeometry::from_bounds(area)),
                guide_style(Color::new(64, 156, 255)),
            ),
            ToolKind::Rectangle => (
                EphemeralRole::Preview,
                Shape::Rectangle(BoxGeometry::from_bounds(area)),
                self.style_for(tool),
            ),
            ToolKind::Ellipse => (
                EphemeralRole::Preview,
                Shape::Ellipse(BoxGeometry::from_bounds(area)),
                self.style_for(tool),
            ),
            ToolKind::Pen => {
                let Gesture::Drawing { points, .. } = &self.gesture else {
                    return None;
                };
                (
                    EphemeralRole::Preview,
                    Shape::Path(PointsGeometry::new(points.clone())),
                    self.style_for(tool),
                )
            }
            ToolKind::Pan | ToolKind::Polygon | ToolKind::Text | ToolKind::Crop => return None,
        };
        Some(ToolAction::Preview { role, shape, style })
    }

    fn collect_preview(&self, tool: ToolKind, path: Vec<Point>) -> ToolAction {
        let color = match tool {
            ToolKind::Crop => Color::new(64, 156, 255),
            _ => self
                .options
                .style_for(tool)
                .and_then(|style| style.stroke)
                .unwrap_or(Color::new(0, 0, 0)),
        };
        ToolAction::Preview {
            role: EphemeralRole::Preview,
            shape: Shape::Path(PointsGeometry::new(path)),
            style: guide_style(color),
        }
    }
}

fn guide_style(color: Color) -> Style {
    Style {
        fill: None,
        stroke: Some(color),
        stroke_width: 1.5,
        opacity: 1.0,
        dashed: true,
    }
}

fn vertex_marker(at: Point) -> ToolAction {
    ToolAction::Preview {
        role: EphemeralRole::VertexMarker,
        shape: Shape::Ellipse(BoxGeometry::new(
            at.x - VERTEX_MARKER_RADIUS,
            at.y - VERTEX_MARKER_RADIUS,
            VERTEX_MARKER_RADIUS * 2.0,
            VERTEX_MARKER_RADIUS * 2.0,
        )),
        style: guide_style(Color::new(64, 156, 255)),
    }
}

fn distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary(x: f64, y: f64) -> PointerInput {
        PointerInput {
            raw: Point::new(x, y),
            scene: Point::new(x, y),
            button: PointerButton::Primary,
            modifiers: Modifiers::default(),
        }
    }

    fn with_button(mut input: PointerInput, button: PointerButton) -> PointerInput {
        input.button = button;
        input
    }

    fn committed(actions: &[ToolAction]) -> Option<&SceneObject> {
        actions.iter().find_map(|action| match action {
            ToolAction::Commit(object) => Some(object),
            _ => None,
        })
    }

    #[test]
    fn rectangle_drag_commits_normalised_box() {
        let mut tools = ToolController::new(5.0);
        tools.select_tool(ToolKind::Rectangle);
        tools.press(primary(100.0, 80.0), None, false);
        assert_eq!(tools.phase(), InteractionPhase::Drawing);
        let preview = tools.drag(primary(10.0, 10.0));
        assert!(matches!(
            preview.as_slice(),
            [ToolAction::Preview {
                role: EphemeralRole::Preview,
                ..
            }]
        ));
        let actions = tools.release(primary(10.0, 10.0));
        assert_eq!(tools.phase(), InteractionPhase::Idle);
        let object = committed(&actions).expect("rectangle should commit");
        assert_eq!(
            object.shape,
            Shape::Rectangle(BoxGeometry::new(10.0, 10.0, 90.0, 70.0))
        );
    }

    #[test]
    fn undersized_drag_is_rejected() {
        let mut tools = ToolController::new(5.0);
        tools.select_tool(ToolKind::Ellipse);
        tools.press(primary(0.0, 0.0), None, false);
        let actions = tools.release(primary(40.0, 4.0));
        assert!(committed(&actions).is_none());
        assert!(actions.contains(&ToolAction::Rejected(RejectReason::ShapeTooSmall)));
        assert!(actions.contains(&ToolAction::ClearPreviews));
    }

    #[test]
    fn pen_samples_points_while_dragging() {
        let mut tools = ToolController::new(5.0);
        tools.select_tool(ToolKind::Pen);
        tools.press(primary(0.0, 0.0), None, false);
        tools.drag(primary(0.2, 0.0));
        tools.drag(primary(3.0, 4.0));
        tools.drag(primary(10.0, 4.0));
        let actions = tools.release(primary(10.0, 4.0));
        let object = committed(&actions).expect("stroke should commit");
        let Shape::Path(path) = &object.shape else {
            panic!("pen should commit a path");
        };
        assert_eq!(
            path.points,
            vec![
                Point::new(0.0, 0.0),
                Point::new(3.0, 4.0),
                Point::new(10.0, 4.0)
            ]
        );
    }

    #[test]
    fn press_on_object_starts_transform_instead_of_drawing() {
        let mut tools = ToolController::new(5.0);
        tools.select_tool(ToolKind::Rectangle);
        let actions = tools.press(primary(5.0, 5.0), Some(7), false);
        assert_eq!(tools.phase(), InteractionPhase::Transforming);
        assert_eq!(
            actions,
            vec![
                ToolAction::Select {
                    ids: vec![7],
                    mode: SelectMode::Replace
                },
                ToolAction::BeginTransform
            ]
        );
        assert_eq!(
            tools.drag(primary(8.0, 9.0)),
            vec![ToolAction::TransformBy { dx: 3.0, dy: 4.0 }]
        );
        assert_eq!(
            tools.release(primary(8.0, 9.0)),
            vec![ToolAction::EndTransform]
        );
    }

    #[test]
    fn modifier_press_toggles_without_transform() {
        let mut tools = ToolController::new(5.0);
        let mut input = primary(5.0, 5.0);
        input.modifiers.shift = true;
        let actions = tools.press(input, Some(3), true);
        assert_eq!(
            actions,
            vec![ToolAction::Select {
                ids: vec![3],
                mode: SelectMode::Toggle
            }]
        );
        assert_eq!(tools.phase(), InteractionPhase::Idle);
    }

    #[test]
    fn polygon_needs_three_vertices() {
        let mut tools = ToolController::new(5.0);
        tools.select_tool(ToolKind::Polygon);
        tools.press(primary(0.0, 0.0), Some(1), false);
        assert_eq!(tools.phase(), InteractionPhase::MultiPointCollecting);
        tools.press(primary(10.0, 0.0), None, false);
        let actions = tools.press(with_button(primary(0.0, 0.0), PointerButton::Secondary), None, false);
        assert_eq!(tools.phase(), InteractionPhase::Idle);
        assert!(committed(&actions).is_none());
        assert!(actions.contains(&ToolAction::Rejected(RejectReason::TooFewPoints {
            required: 3,
            got: 2
        })));
    }

    #[test]
    fn crop_finish_emits_path() {
        let mut tools = ToolController::new(5.0);
        tools.select_tool(ToolKind::Crop);
        for (x, y) in [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (10.0, 10.0), (0.0, 10.0)] {
            tools.press(primary(x, y), None, false);
        }
        assert_eq!(tools.collected_points().map(<[Point]>::len), Some(4));
        let actions = tools.finish();
        assert!(matches!(
            actions.last(),
            Some(ToolAction::CommitCrop(points)) if points.len() == 4
        ));
    }

    #[test]
    fn switching_tools_discards_collection_and_previews() {
        let mut tools = ToolController::new(5.0);
        tools.select_tool(ToolKind::Crop);
        tools.press(primary(0.0, 0.0), None, false);
        tools.press(primary(10.0, 0.0), None, false);
        let actions = tools.select_tool(ToolKind::Select);
        assert_eq!(actions, vec![ToolAction::ClearPreviews]);
        assert_eq!(tools.phase(), InteractionPhase::Idle);
        assert!(tools.collected_points().is_none());
        assert!(tools.finish().is_empty());
    }

    #[test]
    fn marquee_on_empty_space_replaces_selection() {
        let mut tools = ToolController::new(5.0);
        assert_eq!(
            tools.press(primary(0.0, 0.0), None, false),
            vec![ToolAction::ClearSelection]
        );
        tools.drag(primary(30.0, 20.0));
        let actions = tools.release(primary(30.0, 20.0));
        assert_eq!(
            actions,
            vec![
                ToolAction::ClearPreviews,
                ToolAction::Marquee {
                    area: Bounds::new(0.0, 0.0, 30.0, 20.0),
                    additive: false
                }
            ]
        );
    }

    #[test]
    fn middle_button_pans_in_raw_space() {
        let mut tools = ToolController::new(5.0);
        tools.select_tool(ToolKind::Rectangle);
        tools.press(with_button(primary(10.0, 10.0), PointerButton::Middle), None, false);
        assert_eq!(tools.phase(), InteractionPhase::Panning);
        assert_eq!(
            tools.drag(primary(15.0, 7.0)),
            vec![ToolAction::PanBy { dx: 5.0, dy: -3.0 }]
        );
        tools.release(primary(15.0, 7.0));
        assert_eq!(tools.phase(), InteractionPhase::Idle);
    }

    #[test]
    fn text_tool_places_on_click() {
        let mut tools = ToolController::new(5.0);
        tools.select_tool(ToolKind::Text);
        let actions = tools.press(primary(40.0, 50.0), None, false);
        let object = committed(&actions).expect("text should be placed");
        assert!(matches!(&object.shape, Shape::Text(text) if text.content == "Text"));
        assert_eq!(tools.phase(), InteractionPhase::Idle);
    }
}
